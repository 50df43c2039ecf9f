use axum::{
    extract::{Path, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::domain::pricing::PricingResult;
use crate::error::AppResult;
use crate::services::inventory::{self, SeatMap};
use crate::services::pricing::{self, PriceQuery};
use crate::services::reservation::{self, HoldRequest};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct HoldResponse {
    pub reservation_id: Uuid,
    pub expires_at: DateTime<Utc>,
    pub seat_codes: Vec<String>,
}

/// Seat map of a trip
pub async fn get_seat_map(
    State(state): State<AppState>,
    Path(trip_id): Path<Uuid>,
) -> AppResult<Json<SeatMap>> {
    let map = inventory::seat_map(&state, trip_id, Utc::now()).await?;
    Ok(Json(map))
}

/// Hold seats for a checkout session
pub async fn hold_seats(
    State(state): State<AppState>,
    Path(trip_id): Path<Uuid>,
    Json(payload): Json<HoldRequest>,
) -> AppResult<Json<HoldResponse>> {
    let held = reservation::hold(&state, trip_id, payload, Utc::now()).await?;

    Ok(Json(HoldResponse {
        reservation_id: held.id,
        expires_at: held.expires_at.with_timezone(&Utc),
        seat_codes: held.seat_codes.0,
    }))
}

/// Price preview, coupon included
pub async fn price(
    State(state): State<AppState>,
    Path(trip_id): Path<Uuid>,
    Json(payload): Json<PriceQuery>,
) -> AppResult<Json<PricingResult>> {
    let result = pricing::preview(&state, trip_id, payload, Utc::now()).await?;
    Ok(Json(result))
}
