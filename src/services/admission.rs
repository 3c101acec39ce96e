use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{error, info};

use crate::calendar::CalendarSync;
use crate::errors::BookingError;
use crate::mail::Notifier;
use crate::models::booking::{BookingRecord, BookingRequest, NewBooking};
use crate::models::slot::{CreateSlotRequest, SlotRecord};
use crate::services::database::BookingStore;

// Admin booking listing depth
const RECENT_BOOKINGS_LIMIT: usize = 50;

/// Decides whether bookings are admitted and owns the post-commit side
/// effects.
///
/// All collaborators are injected at construction: the store is required,
/// mail and calendar are optional capabilities that are simply skipped when
/// absent.
#[derive(Clone)]
pub struct AdmissionEngine {
    store: Arc<dyn BookingStore>,
    notifier: Option<Arc<dyn Notifier>>,
    calendar: Option<Arc<dyn CalendarSync>>,
}

impl AdmissionEngine {
    pub fn new(
        store: Arc<dyn BookingStore>,
        notifier: Option<Arc<dyn Notifier>>,
        calendar: Option<Arc<dyn CalendarSync>>,
    ) -> Self {
        Self {
            store,
            notifier,
            calendar,
        }
    }

    pub fn mail_enabled(&self) -> bool {
        self.notifier.is_some()
    }

    pub fn calendar_enabled(&self) -> bool {
        self.calendar.is_some()
    }

    /// Slots that can still be booked: end time in the future, occupancy
    /// below capacity. Ascending by start time.
    pub fn list_available_slots(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<SlotRecord>, BookingError> {
        let mut available = Vec::new();
        for slot in self.store.list_slots(now)? {
            let occupancy = self.store.count_bookings(slot.start_time, slot.end_time)?;
            if occupancy < slot.capacity as usize {
                available.push(slot);
            }
        }
        Ok(available)
    }

    /// Every slot, full and past ones included, for the admin view.
    pub fn list_all_slots(&self) -> Result<Vec<SlotRecord>, BookingError> {
        self.store.list_slots(DateTime::<Utc>::MIN_UTC)
    }

    pub fn create_slot(&self, request: CreateSlotRequest) -> Result<SlotRecord, BookingError> {
        let start = request.start.ok_or(BookingError::Validation("start"))?;
        let end = request.end.ok_or(BookingError::Validation("end"))?;

        let capacity = request.capacity.unwrap_or(1);
        if capacity == 0 {
            return Err(BookingError::Validation("capacity"));
        }

        self.store.create_slot(start, end, capacity)
    }

    pub fn delete_slot(&self, id: &str) -> Result<(), BookingError> {
        // Bookings against the slot's time range stay untouched; they
        // remain valid history.
        self.store.delete_slot(id)
    }

    /// Validate and admit a booking request.
    ///
    /// The availability check and the insert are one atomic store operation,
    /// so concurrent admissions against the last seat cannot both succeed.
    /// Side effects run after the booking is durable and never influence
    /// the result.
    pub fn admit_booking(&self, request: BookingRequest) -> Result<BookingRecord, BookingError> {
        require_text(&request.name, "name")?;
        require_text(&request.email, "email")?;
        let start = request.start.ok_or(BookingError::Validation("start"))?;
        let end = request.end.ok_or(BookingError::Validation("end"))?;

        let booking = NewBooking {
            name: request.name,
            email: request.email,
            phone: request.phone.unwrap_or_default(),
            start_time: start,
            end_time: end,
        };

        let record = self.store.create_booking(booking)?;
        info!(
            "Admitted booking {} for {} - {}",
            record.id, record.start_time, record.end_time
        );

        self.dispatch_side_effects(record.clone());
        Ok(record)
    }

    /// The most recent bookings for the admin view, newest start time first.
    pub fn list_bookings(&self) -> Result<Vec<BookingRecord>, BookingError> {
        self.store.list_bookings(RECENT_BOOKINGS_LIMIT)
    }

    // Fire-and-forget dispatch; the request path never waits on these.
    fn dispatch_side_effects(&self, booking: BookingRecord) {
        if self.notifier.is_none() && self.calendar.is_none() {
            return;
        }

        let engine = self.clone();
        tokio::spawn(async move {
            engine.run_side_effects(booking).await;
        });
    }

    /// Calendar sync and notifications for an admitted booking. Every
    /// failure is logged and swallowed; the booking stays valid.
    pub(crate) async fn run_side_effects(&self, booking: BookingRecord) {
        if let Some(calendar) = &self.calendar {
            match calendar.create_event(&booking).await {
                Ok(event_ref) => {
                    if let Err(e) = self
                        .store
                        .attach_calendar_reference(&booking.id, &event_ref)
                    {
                        error!(
                            "Failed to record calendar event {} on booking {}: {}",
                            event_ref, booking.id, e
                        );
                    }
                }
                Err(e) => {
                    error!("Calendar sync failed for booking {}: {}", booking.id, e);
                }
            }
        }

        if let Some(notifier) = &self.notifier {
            if let Err(e) = notifier.notify(&booking).await {
                error!("Notification failed for booking {}: {}", booking.id, e);
            }
        }
    }
}

fn require_text(value: &str, field: &'static str) -> Result<(), BookingError> {
    if value.trim().is_empty() {
        return Err(BookingError::Validation(field));
    }
    Ok(())
}
