use axum::{
    extract::{Path, State},
    Json,
};
use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use crate::entities::{seat, trip};
use crate::error::AppResult;
use crate::services::inventory::{self, SweepReport};
use crate::services::layout::{self, NewTrip};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct LayoutResponse {
    pub bus_type_id: Uuid,
    pub total_seats: usize,
    pub seats: Vec<seat::Model>,
}

/// (Re)generate the seat grid of a bus type
pub async fn generate_layout(
    State(state): State<AppState>,
    Path(bus_type_id): Path<Uuid>,
) -> AppResult<Json<LayoutResponse>> {
    let seats = layout::generate_bus_type_layout(&state, bus_type_id).await?;
    Ok(Json(LayoutResponse {
        bus_type_id,
        total_seats: seats.len(),
        seats,
    }))
}

pub async fn create_trip(
    State(state): State<AppState>,
    Json(payload): Json<NewTrip>,
) -> AppResult<Json<trip::Model>> {
    let trip = layout::create_trip(&state, payload, Utc::now()).await?;
    Ok(Json(trip))
}

/// Run the expired-hold sweep now
pub async fn sweep_holds(State(state): State<AppState>) -> AppResult<Json<SweepReport>> {
    let report = inventory::sweep_expired_holds(&state, Utc::now()).await?;
    Ok(Json(report))
}
