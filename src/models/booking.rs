use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// Booking row as persisted in bookings.csv.
//
// `phone` and `external_event_ref` are plain strings, empty until set, so
// the row shape stays stable in the file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingRecord {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub external_event_ref: String,
}

// Validated booking data handed to the store for the conditional insert
#[derive(Debug, Clone)]
pub struct NewBooking {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

/// Client request to book a slot. All fields are defaulted so missing ones
/// reach validation instead of failing JSON extraction.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct BookingRequest {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}
