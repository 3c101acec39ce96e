use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// Slot row as persisted in slots.csv
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotRecord {
    pub id: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub capacity: u32,
    pub created_at: DateTime<Utc>,
}

/// Admin request to create a slot. All fields are defaulted so a missing
/// field reaches validation instead of failing JSON extraction.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct CreateSlotRequest {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub capacity: Option<u32>,
}

// Slot as exposed over the API
#[derive(Debug, Serialize)]
pub struct SlotView {
    pub id: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl From<&SlotRecord> for SlotView {
    fn from(record: &SlotRecord) -> Self {
        Self {
            id: record.id.clone(),
            start: record.start_time,
            end: record.end_time,
        }
    }
}
