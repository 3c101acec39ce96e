use chrono::{DateTime, Utc};
use csv::{ReaderBuilder, WriterBuilder};
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{error, info};
use uuid::Uuid;

use crate::errors::BookingError;
use crate::models::booking::{BookingRecord, NewBooking};
use crate::models::slot::SlotRecord;

const SLOT_HEADERS: [&str; 5] = ["id", "start_time", "end_time", "capacity", "created_at"];

const BOOKING_HEADERS: [&str; 8] = [
    "id",
    "name",
    "email",
    "phone",
    "start_time",
    "end_time",
    "created_at",
    "external_event_ref",
];

// Reserved schema; no operation reads or writes client rows yet.
const CLIENT_HEADERS: [&str; 8] = [
    "id",
    "booking_id",
    "name",
    "email",
    "phone",
    "date_of_birth",
    "address",
    "notes",
];

/// Durable record store for slots and bookings.
///
/// Single-row reads and writes are atomic on their own. The two compound
/// operations - the duplicate check inside `create_slot` and the
/// availability check inside `create_booking` - must not interleave with
/// concurrent writes, so implementations serialize them.
#[cfg_attr(test, mockall::automock)]
pub trait BookingStore: Send + Sync {
    /// Insert a slot, rejecting a duplicate (start, end) pair.
    fn create_slot(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        capacity: u32,
    ) -> Result<SlotRecord, BookingError>;

    /// Remove a slot by id. Bookings against its time range are kept.
    fn delete_slot(&self, id: &str) -> Result<(), BookingError>;

    /// Slots whose end time is after `after`, ascending by start time.
    fn list_slots(&self, after: DateTime<Utc>) -> Result<Vec<SlotRecord>, BookingError>;

    /// The slot matching exactly (start, end), if any.
    fn find_slot(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Option<SlotRecord>, BookingError>;

    /// Occupancy of the (start, end) time range.
    fn count_bookings(&self, start: DateTime<Utc>, end: DateTime<Utc>)
        -> Result<usize, BookingError>;

    /// Conditionally insert a booking: the matching slot must exist
    /// (`SlotUnavailable`) and have spare capacity (`SlotFull`). The check
    /// and the insert run as one atomic step.
    fn create_booking(&self, booking: NewBooking) -> Result<BookingRecord, BookingError>;

    /// The most recent `limit` bookings, descending by start time.
    fn list_bookings(&self, limit: usize) -> Result<Vec<BookingRecord>, BookingError>;

    /// Attach the external calendar event reference to a stored booking.
    fn attach_calendar_reference(&self, booking_id: &str, event_ref: &str)
        -> Result<(), BookingError>;
}

// CSV-file implementation of the booking store
pub struct DatabaseService {
    slots_path: PathBuf,
    bookings_path: PathBuf,
    file_mutex: Mutex<()>,
}

impl DatabaseService {
    /// Open the store at `data_dir`, creating the directory and the CSV
    /// files (with headers) on first use.
    pub fn new(data_dir: &str) -> Self {
        let dir = Path::new(data_dir);
        if let Err(e) = std::fs::create_dir_all(dir) {
            error!("Failed to create data directory {}: {}", data_dir, e);
            panic!("Failed to create data directory: {}", e);
        }

        let slots_path = dir.join("slots.csv");
        let bookings_path = dir.join("bookings.csv");
        let clients_path = dir.join("clients.csv");

        bootstrap_file(&slots_path, &SLOT_HEADERS);
        bootstrap_file(&bookings_path, &BOOKING_HEADERS);
        bootstrap_file(&clients_path, &CLIENT_HEADERS);

        Self {
            slots_path,
            bookings_path,
            file_mutex: Mutex::new(()),
        }
    }

    // Read all slot rows. Callers must hold the file mutex.
    fn read_slots(&self) -> Result<Vec<SlotRecord>, BookingError> {
        read_records(&self.slots_path, "slots")
    }

    // Read all booking rows. Callers must hold the file mutex.
    fn read_bookings(&self) -> Result<Vec<BookingRecord>, BookingError> {
        read_records(&self.bookings_path, "bookings")
    }
}

impl BookingStore for DatabaseService {
    fn create_slot(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        capacity: u32,
    ) -> Result<SlotRecord, BookingError> {
        let _lock = lock(&self.file_mutex)?;

        // Duplicate check and insert under one lock hold, so two concurrent
        // creators cannot both pass the check.
        let slots = self.read_slots()?;
        if slots
            .iter()
            .any(|slot| slot.start_time == start && slot.end_time == end)
        {
            info!(
                "Rejected duplicate slot for time range {} - {}",
                start, end
            );
            return Err(BookingError::DuplicateSlot);
        }

        let record = SlotRecord {
            id: Uuid::new_v4().to_string(),
            start_time: start,
            end_time: end,
            capacity,
            created_at: Utc::now(),
        };

        append_record(&self.slots_path, &record, "slots")?;
        info!("Stored slot {} for {} - {}", record.id, start, end);
        Ok(record)
    }

    fn delete_slot(&self, id: &str) -> Result<(), BookingError> {
        let _lock = lock(&self.file_mutex)?;

        let slots = self.read_slots()?;
        if !slots.iter().any(|slot| slot.id == id) {
            return Err(BookingError::SlotNotFound);
        }

        let remaining: Vec<SlotRecord> = slots.into_iter().filter(|slot| slot.id != id).collect();
        rewrite_records(&self.slots_path, &SLOT_HEADERS, &remaining, "slots")?;

        info!("Deleted slot {}", id);
        Ok(())
    }

    fn list_slots(&self, after: DateTime<Utc>) -> Result<Vec<SlotRecord>, BookingError> {
        let _lock = lock(&self.file_mutex)?;

        let mut slots: Vec<SlotRecord> = self
            .read_slots()?
            .into_iter()
            .filter(|slot| slot.end_time > after)
            .collect();
        slots.sort_by_key(|slot| slot.start_time);
        Ok(slots)
    }

    fn find_slot(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Option<SlotRecord>, BookingError> {
        let _lock = lock(&self.file_mutex)?;

        Ok(self
            .read_slots()?
            .into_iter()
            .find(|slot| slot.start_time == start && slot.end_time == end))
    }

    fn count_bookings(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<usize, BookingError> {
        let _lock = lock(&self.file_mutex)?;

        Ok(self
            .read_bookings()?
            .iter()
            .filter(|booking| booking.start_time == start && booking.end_time == end)
            .count())
    }

    fn create_booking(&self, booking: NewBooking) -> Result<BookingRecord, BookingError> {
        let _lock = lock(&self.file_mutex)?;

        // Slot lookup, occupancy count, and insert all happen inside this
        // critical section; concurrent admissions for the last seat cannot
        // both pass the occupancy check.
        let slot = self
            .read_slots()?
            .into_iter()
            .find(|slot| {
                slot.start_time == booking.start_time && slot.end_time == booking.end_time
            })
            .ok_or(BookingError::SlotUnavailable)?;

        let occupancy = self
            .read_bookings()?
            .iter()
            .filter(|existing| {
                existing.start_time == booking.start_time && existing.end_time == booking.end_time
            })
            .count();

        if occupancy >= slot.capacity as usize {
            info!(
                "Rejected booking for full slot {} ({}/{})",
                slot.id, occupancy, slot.capacity
            );
            return Err(BookingError::SlotFull);
        }

        let record = BookingRecord {
            id: Uuid::new_v4().to_string(),
            name: booking.name,
            email: booking.email,
            phone: booking.phone,
            start_time: booking.start_time,
            end_time: booking.end_time,
            created_at: Utc::now(),
            external_event_ref: String::new(),
        };

        append_record(&self.bookings_path, &record, "bookings")?;
        info!(
            "Stored booking {} for {} ({} - {})",
            record.id, record.email, record.start_time, record.end_time
        );
        Ok(record)
    }

    fn list_bookings(&self, limit: usize) -> Result<Vec<BookingRecord>, BookingError> {
        let _lock = lock(&self.file_mutex)?;

        let mut bookings = self.read_bookings()?;
        bookings.sort_by_key(|booking| std::cmp::Reverse(booking.start_time));
        bookings.truncate(limit);
        Ok(bookings)
    }

    fn attach_calendar_reference(
        &self,
        booking_id: &str,
        event_ref: &str,
    ) -> Result<(), BookingError> {
        let _lock = lock(&self.file_mutex)?;

        let mut bookings = self.read_bookings()?;
        let target = bookings
            .iter_mut()
            .find(|booking| booking.id == booking_id)
            .ok_or_else(|| {
                BookingError::Storage(format!("booking {} not found for event reference", booking_id))
            })?;
        target.external_event_ref = event_ref.to_string();

        rewrite_records(&self.bookings_path, &BOOKING_HEADERS, &bookings, "bookings")?;
        info!(
            "Attached calendar event {} to booking {}",
            event_ref, booking_id
        );
        Ok(())
    }
}

// Acquire the store lock, surfacing poisoning as a storage fault
fn lock(mutex: &Mutex<()>) -> Result<std::sync::MutexGuard<'_, ()>, BookingError> {
    mutex
        .lock()
        .map_err(|e| BookingError::Storage(format!("failed to acquire store lock: {}", e)))
}

// Create a CSV file with headers if it does not exist yet
fn bootstrap_file(path: &Path, headers: &[&str]) {
    if path.exists() {
        return;
    }

    info!("Creating store file at {}", path.display());

    let file = File::create(path).unwrap_or_else(|e| {
        error!("Failed to create store file {}: {}", path.display(), e);
        panic!("Failed to create store file: {}", e)
    });

    let mut writer = WriterBuilder::new().has_headers(false).from_writer(file);
    if let Err(e) = writer.write_record(headers) {
        error!("Failed to write headers to {}: {}", path.display(), e);
        panic!("Failed to write headers: {}", e);
    }
    if let Err(e) = writer.flush() {
        error!("Failed to flush headers to {}: {}", path.display(), e);
        panic!("Failed to flush headers: {}", e);
    }
}

// Deserialize every row of a CSV file
fn read_records<T>(path: &Path, what: &str) -> Result<Vec<T>, BookingError>
where
    T: serde::de::DeserializeOwned,
{
    let file = File::open(path)
        .map_err(|e| BookingError::Storage(format!("failed to open {} file: {}", what, e)))?;

    let mut reader = ReaderBuilder::new().has_headers(true).from_reader(file);
    let mut records = Vec::new();
    for result in reader.deserialize() {
        let record: T = result
            .map_err(|e| BookingError::Storage(format!("failed to read {} record: {}", what, e)))?;
        records.push(record);
    }
    Ok(records)
}

// Append a single serialized row
fn append_record<T: serde::Serialize>(path: &Path, record: &T, what: &str) -> Result<(), BookingError> {
    let file = OpenOptions::new()
        .append(true)
        .open(path)
        .map_err(|e| BookingError::Storage(format!("failed to open {} file: {}", what, e)))?;

    let mut writer = WriterBuilder::new().has_headers(false).from_writer(file);
    writer
        .serialize(record)
        .map_err(|e| BookingError::Storage(format!("failed to serialize {} record: {}", what, e)))?;
    writer
        .flush()
        .map_err(|e| BookingError::Storage(format!("failed to flush {} file: {}", what, e)))
}

// Overwrite a file with headers plus the given rows
fn rewrite_records<T: serde::Serialize>(
    path: &Path,
    headers: &[&str],
    records: &[T],
    what: &str,
) -> Result<(), BookingError> {
    let file = OpenOptions::new()
        .write(true)
        .truncate(true)
        .open(path)
        .map_err(|e| BookingError::Storage(format!("failed to open {} file for writing: {}", what, e)))?;

    let mut writer = WriterBuilder::new().has_headers(false).from_writer(file);
    writer
        .write_record(headers)
        .map_err(|e| BookingError::Storage(format!("failed to write {} headers: {}", what, e)))?;
    for record in records {
        writer.serialize(record).map_err(|e| {
            BookingError::Storage(format!("failed to serialize {} record: {}", what, e))
        })?;
    }
    writer
        .flush()
        .map_err(|e| BookingError::Storage(format!("failed to flush {} file: {}", what, e)))
}
