use axum::{
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;

use crate::handlers::api::{
    create_booking, create_slot, delete_slot, list_all_slots, list_available_slots, list_bookings,
    AppState,
};
use crate::handlers::health::health_check;

pub fn create_router(app_state: Arc<AppState>) -> Router {
    let health_route = Router::new().route("/health", get(health_check));

    let api_routes = Router::new()
        .route("/api/slots", get(list_available_slots))
        .route("/api/slots/admin", get(list_all_slots))
        .route("/api/admin/slots", post(create_slot))
        .route("/api/admin/slots/:slot_id", delete(delete_slot))
        .route("/api/bookings", post(create_booking))
        .route("/api/admin/bookings", get(list_bookings));

    Router::new()
        .merge(health_route)
        .merge(api_routes)
        .with_state(app_state)
}
