use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};

use crate::handlers::{admin, reservations, tickets, trips};
use crate::middleware::auth::{auth_middleware, require_admin};
use crate::middleware::rate_limit::{create_public_governor, log_request};
use crate::AppState;

/// Booking and admin routes without the per-IP limiter, which needs the
/// peer address that only the real server provides.
pub fn api_routes(state: AppState) -> Router {
    let booking_routes = Router::new()
        // Seat inventory
        .route("/trips/{id}/seats", get(trips::get_seat_map))
        .route("/trips/{id}/seats/hold", post(trips::hold_seats))
        .route("/trips/{id}/price", post(trips::price))
        // Reservations
        .route("/reservations/{id}", delete(reservations::release))
        .route("/reservations/{id}/commit", post(reservations::commit))
        .route("/reservations/{id}/extend", post(reservations::extend))
        .route("/sessions/{session_id}/extend", post(reservations::extend_session))
        .route("/sessions/{session_id}/release", post(reservations::release_session))
        // Orders and tickets
        .route("/orders/{id}", get(tickets::get_order))
        .route("/tickets/check-in", post(tickets::check_in))
        .route("/tickets/{id}", get(tickets::get_ticket))
        .route("/tickets/{id}/refund-quote", get(tickets::refund_quote))
        .route("/tickets/{id}/cancel", post(tickets::cancel));

    let admin_routes = Router::new()
        .route("/bus-types/{id}/layout", post(admin::generate_layout))
        .route("/trips", post(admin::create_trip))
        .route("/holds/sweep", post(admin::sweep_holds))
        .layer(middleware::from_fn(require_admin))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .nest("/api", booking_routes)
        .nest("/api/admin", admin_routes)
        .with_state(state)
}

pub fn create_router(state: AppState) -> Router {
    api_routes(state)
        .layer(create_public_governor())
        .layer(middleware::from_fn(log_request))
}
