use axum::{
    extract::{Json as ExtractJson, Path, State},
    http::StatusCode,
    response::Json,
};
use chrono::Utc;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::errors::BookingError;
use crate::models::booking::{BookingRecord, BookingRequest};
use crate::models::common::{CreatedResponse, ErrorResponse};
use crate::models::slot::{CreateSlotRequest, SlotView};
use crate::services::admission::AdmissionEngine;

// AppState struct containing shared resources
pub struct AppState {
    pub engine: AdmissionEngine,
}

// Translate a domain error into the response the API promises. Storage
// detail is logged here and replaced with a generic body.
fn error_response(err: &BookingError) -> (StatusCode, Json<ErrorResponse>) {
    match err {
        BookingError::Storage(detail) => error!("Storage failure: {}", detail),
        other => warn!("Request rejected: {}", other),
    }

    (
        err.status(),
        Json(ErrorResponse {
            error: err.public_message(),
        }),
    )
}

// List available slots endpoint
pub async fn list_available_slots(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<SlotView>>, (StatusCode, Json<ErrorResponse>)> {
    match state.engine.list_available_slots(Utc::now()) {
        Ok(slots) => {
            info!("Listed {} available slots", slots.len());
            Ok(Json(slots.iter().map(SlotView::from).collect()))
        }
        Err(err) => Err(error_response(&err)),
    }
}

// Admin slot listing endpoint; full and past slots included
pub async fn list_all_slots(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<SlotView>>, (StatusCode, Json<ErrorResponse>)> {
    match state.engine.list_all_slots() {
        Ok(slots) => {
            info!("Listed {} slots for admin", slots.len());
            Ok(Json(slots.iter().map(SlotView::from).collect()))
        }
        Err(err) => Err(error_response(&err)),
    }
}

// Create slot endpoint
pub async fn create_slot(
    State(state): State<Arc<AppState>>,
    ExtractJson(request): ExtractJson<CreateSlotRequest>,
) -> Result<(StatusCode, Json<CreatedResponse>), (StatusCode, Json<ErrorResponse>)> {
    info!(
        "Received request to create slot: {:?} - {:?}",
        request.start, request.end
    );

    match state.engine.create_slot(request) {
        Ok(slot) => {
            info!("Created slot {}", slot.id);
            Ok((StatusCode::CREATED, Json(CreatedResponse { id: slot.id })))
        }
        Err(err) => Err(error_response(&err)),
    }
}

// Delete slot endpoint
pub async fn delete_slot(
    State(state): State<Arc<AppState>>,
    Path(slot_id): Path<String>,
) -> Result<StatusCode, (StatusCode, Json<ErrorResponse>)> {
    info!("Received request to delete slot {}", slot_id);

    match state.engine.delete_slot(&slot_id) {
        Ok(()) => Ok(StatusCode::OK),
        Err(err) => Err(error_response(&err)),
    }
}

// Booking endpoint
pub async fn create_booking(
    State(state): State<Arc<AppState>>,
    ExtractJson(request): ExtractJson<BookingRequest>,
) -> Result<(StatusCode, Json<CreatedResponse>), (StatusCode, Json<ErrorResponse>)> {
    info!(
        "Received booking request for {:?} - {:?}",
        request.start, request.end
    );

    match state.engine.admit_booking(request) {
        Ok(booking) => Ok((
            StatusCode::CREATED,
            Json(CreatedResponse { id: booking.id }),
        )),
        Err(err) => Err(error_response(&err)),
    }
}

// Admin booking listing endpoint; latest 50, most recent first
pub async fn list_bookings(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<BookingRecord>>, (StatusCode, Json<ErrorResponse>)> {
    match state.engine.list_bookings() {
        Ok(bookings) => {
            info!("Listed {} bookings for admin", bookings.len());
            Ok(Json(bookings))
        }
        Err(err) => Err(error_response(&err)),
    }
}
