#[cfg(test)]
mod admission_tests {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use tempfile::tempdir;

    use crate::calendar::{CalendarError, CalendarSync};
    use crate::errors::BookingError;
    use crate::mail::{MailError, Notifier};
    use crate::models::booking::{BookingRecord, BookingRequest};
    use crate::models::slot::CreateSlotRequest;
    use crate::services::admission::AdmissionEngine;
    use crate::services::database::{BookingStore, DatabaseService, MockBookingStore};

    // Notifier fake recording every call, optionally failing
    struct RecordingNotifier {
        notified: Mutex<Vec<String>>,
        fail: bool,
    }

    impl RecordingNotifier {
        fn new(fail: bool) -> Self {
            Self {
                notified: Mutex::new(Vec::new()),
                fail,
            }
        }
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn notify(&self, booking: &BookingRecord) -> Result<(), MailError> {
            self.notified.lock().unwrap().push(booking.id.clone());
            if self.fail {
                return Err(MailError::Api(reqwest::StatusCode::INTERNAL_SERVER_ERROR));
            }
            Ok(())
        }
    }

    // Calendar fake recording every call, optionally failing
    struct RecordingCalendar {
        synced: Mutex<Vec<String>>,
        fail: bool,
    }

    impl RecordingCalendar {
        fn new(fail: bool) -> Self {
            Self {
                synced: Mutex::new(Vec::new()),
                fail,
            }
        }
    }

    #[async_trait]
    impl CalendarSync for RecordingCalendar {
        async fn create_event(&self, booking: &BookingRecord) -> Result<String, CalendarError> {
            self.synced.lock().unwrap().push(booking.id.clone());
            if self.fail {
                return Err(CalendarError::MissingEventId);
            }
            Ok(format!("evt-{}", booking.id))
        }
    }

    fn slot_times() -> (DateTime<Utc>, DateTime<Utc>) {
        let start = Utc.with_ymd_and_hms(2035, 4, 1, 9, 0, 0).unwrap();
        (start, start + Duration::hours(1))
    }

    fn booking_request(start: DateTime<Utc>, end: DateTime<Utc>) -> BookingRequest {
        BookingRequest {
            name: "Jamie Doe".to_string(),
            email: "jamie@example.com".to_string(),
            phone: Some("+41 79 000 00 00".to_string()),
            start: Some(start),
            end: Some(end),
        }
    }

    // Engine over a real store in a temp directory, no integrations
    fn engine_with_store() -> (AdmissionEngine, Arc<DatabaseService>, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db = Arc::new(DatabaseService::new(dir.path().to_str().unwrap()));
        let engine = AdmissionEngine::new(db.clone(), None, None);
        (engine, db, dir)
    }

    #[test]
    fn test_validation_rejects_missing_fields() {
        // A mock with no expectations doubles as proof the store is never
        // touched when validation fails.
        let store = MockBookingStore::new();
        let engine = AdmissionEngine::new(Arc::new(store), None, None);

        let (start, end) = slot_times();

        let mut request = booking_request(start, end);
        request.name = "".to_string();
        assert!(matches!(
            engine.admit_booking(request),
            Err(BookingError::Validation("name"))
        ));

        let mut request = booking_request(start, end);
        request.email = "   ".to_string();
        assert!(matches!(
            engine.admit_booking(request),
            Err(BookingError::Validation("email"))
        ));

        let mut request = booking_request(start, end);
        request.start = None;
        assert!(matches!(
            engine.admit_booking(request),
            Err(BookingError::Validation("start"))
        ));

        let mut request = booking_request(start, end);
        request.end = None;
        assert!(matches!(
            engine.admit_booking(request),
            Err(BookingError::Validation("end"))
        ));
    }

    #[test]
    fn test_create_slot_validation() {
        let store = MockBookingStore::new();
        let engine = AdmissionEngine::new(Arc::new(store), None, None);

        let (start, end) = slot_times();

        let missing_end = CreateSlotRequest {
            start: Some(start),
            end: None,
            capacity: None,
        };
        assert!(matches!(
            engine.create_slot(missing_end),
            Err(BookingError::Validation("end"))
        ));

        let zero_capacity = CreateSlotRequest {
            start: Some(start),
            end: Some(end),
            capacity: Some(0),
        };
        assert!(matches!(
            engine.create_slot(zero_capacity),
            Err(BookingError::Validation("capacity"))
        ));
    }

    #[test]
    fn test_create_slot_defaults_capacity_to_one() {
        let (engine, _db, dir) = engine_with_store();
        let (start, end) = slot_times();

        let slot = engine
            .create_slot(CreateSlotRequest {
                start: Some(start),
                end: Some(end),
                capacity: None,
            })
            .unwrap();
        assert_eq!(slot.capacity, 1);

        dir.close().unwrap();
    }

    #[test]
    fn test_admit_booking_without_integrations() {
        let (engine, db, dir) = engine_with_store();
        let (start, end) = slot_times();

        engine
            .create_slot(CreateSlotRequest {
                start: Some(start),
                end: Some(end),
                capacity: Some(1),
            })
            .unwrap();

        let booking = engine.admit_booking(booking_request(start, end)).unwrap();
        assert_eq!(booking.phone, "+41 79 000 00 00");
        assert!(booking.external_event_ref.is_empty());
        assert_eq!(db.count_bookings(start, end).unwrap(), 1);

        // The slot is now full
        let second = engine.admit_booking(booking_request(start, end));
        assert!(matches!(second, Err(BookingError::SlotFull)));
        assert_eq!(db.count_bookings(start, end).unwrap(), 1);

        dir.close().unwrap();
    }

    #[test]
    fn test_admit_booking_unknown_range() {
        let (engine, _db, dir) = engine_with_store();
        let (start, end) = slot_times();

        let result = engine.admit_booking(booking_request(start, end));
        assert!(matches!(result, Err(BookingError::SlotUnavailable)));

        dir.close().unwrap();
    }

    #[test]
    fn test_available_slots_hide_full_and_past() {
        let (engine, _db, dir) = engine_with_store();

        let now = Utc.with_ymd_and_hms(2035, 4, 1, 12, 0, 0).unwrap();

        // Past slot
        let past_start = now - Duration::hours(3);
        engine
            .create_slot(CreateSlotRequest {
                start: Some(past_start),
                end: Some(past_start + Duration::hours(1)),
                capacity: Some(1),
            })
            .unwrap();

        // Future slot that will fill up
        let full_start = now + Duration::hours(1);
        engine
            .create_slot(CreateSlotRequest {
                start: Some(full_start),
                end: Some(full_start + Duration::hours(1)),
                capacity: Some(1),
            })
            .unwrap();
        engine
            .admit_booking(booking_request(full_start, full_start + Duration::hours(1)))
            .unwrap();

        // Future open slot
        let open_start = now + Duration::hours(3);
        let open = engine
            .create_slot(CreateSlotRequest {
                start: Some(open_start),
                end: Some(open_start + Duration::hours(1)),
                capacity: Some(2),
            })
            .unwrap();

        let available = engine.list_available_slots(now).unwrap();
        assert_eq!(available.len(), 1);
        assert_eq!(available[0].id, open.id);

        // The admin view still sees all three
        let all = engine.list_all_slots().unwrap();
        assert_eq!(all.len(), 3);

        dir.close().unwrap();
    }

    #[tokio::test]
    async fn test_concurrent_admissions_never_overbook() {
        let (engine, db, dir) = engine_with_store();
        let (start, end) = slot_times();

        engine
            .create_slot(CreateSlotRequest {
                start: Some(start),
                end: Some(end),
                capacity: Some(1),
            })
            .unwrap();

        // Two admissions race for the last (only) seat
        let engine_a = engine.clone();
        let engine_b = engine.clone();
        let task_a =
            tokio::task::spawn_blocking(move || engine_a.admit_booking(booking_request(start, end)));
        let task_b =
            tokio::task::spawn_blocking(move || engine_b.admit_booking(booking_request(start, end)));

        let result_a = task_a.await.unwrap();
        let result_b = task_b.await.unwrap();

        let successes = [&result_a, &result_b]
            .iter()
            .filter(|result| result.is_ok())
            .count();
        assert_eq!(successes, 1);
        assert!(
            matches!(result_a, Err(BookingError::SlotFull)) || matches!(result_b, Err(BookingError::SlotFull))
        );
        assert_eq!(db.count_bookings(start, end).unwrap(), 1);

        dir.close().unwrap();
    }

    #[tokio::test]
    async fn test_side_effects_sync_and_notify() {
        let dir = tempdir().unwrap();
        let db = Arc::new(DatabaseService::new(dir.path().to_str().unwrap()));
        let notifier = Arc::new(RecordingNotifier::new(false));
        let calendar = Arc::new(RecordingCalendar::new(false));
        let engine = AdmissionEngine::new(db.clone(), Some(notifier.clone()), Some(calendar.clone()));

        let (start, end) = slot_times();
        engine
            .create_slot(CreateSlotRequest {
                start: Some(start),
                end: Some(end),
                capacity: Some(1),
            })
            .unwrap();

        let booking = db
            .create_booking(crate::models::booking::NewBooking {
                name: "Jamie Doe".to_string(),
                email: "jamie@example.com".to_string(),
                phone: "".to_string(),
                start_time: start,
                end_time: end,
            })
            .unwrap();

        engine.run_side_effects(booking.clone()).await;

        assert_eq!(*calendar.synced.lock().unwrap(), vec![booking.id.clone()]);
        assert_eq!(*notifier.notified.lock().unwrap(), vec![booking.id.clone()]);

        // The event reference landed on the stored row
        let stored = db.list_bookings(50).unwrap();
        assert_eq!(stored[0].external_event_ref, format!("evt-{}", booking.id));

        dir.close().unwrap();
    }

    #[tokio::test]
    async fn test_side_effect_failures_leave_booking_valid() {
        let dir = tempdir().unwrap();
        let db = Arc::new(DatabaseService::new(dir.path().to_str().unwrap()));
        let notifier = Arc::new(RecordingNotifier::new(true));
        let calendar = Arc::new(RecordingCalendar::new(true));
        let engine = AdmissionEngine::new(db.clone(), Some(notifier.clone()), Some(calendar.clone()));

        let (start, end) = slot_times();
        engine
            .create_slot(CreateSlotRequest {
                start: Some(start),
                end: Some(end),
                capacity: Some(1),
            })
            .unwrap();

        let booking = db
            .create_booking(crate::models::booking::NewBooking {
                name: "Jamie Doe".to_string(),
                email: "jamie@example.com".to_string(),
                phone: "".to_string(),
                start_time: start,
                end_time: end,
            })
            .unwrap();

        // Run the side effects directly; both fail, nothing propagates
        engine.run_side_effects(booking.clone()).await;

        assert_eq!(calendar.synced.lock().unwrap().len(), 1);
        assert_eq!(notifier.notified.lock().unwrap().len(), 1);

        let stored = db.list_bookings(50).unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].id, booking.id);
        assert!(stored[0].external_event_ref.is_empty());

        dir.close().unwrap();
    }

    #[test]
    fn test_capability_flags() {
        let store = MockBookingStore::new();
        let engine = AdmissionEngine::new(
            Arc::new(store),
            Some(Arc::new(RecordingNotifier::new(false))),
            None,
        );
        assert!(engine.mail_enabled());
        assert!(!engine.calendar_enabled());
    }
}
