use axum::{
    extract::{Path, State},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::reservation;
use crate::error::AppResult;
use crate::services::issuance::{self, CommitRequest, OrderDetails};
use crate::services::reservation::{self as holds, ReleaseSummary};
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ExtendRequest {
    pub ttl_seconds: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct ReleasedSeats {
    pub reservation_id: Uuid,
    pub released: Vec<String>,
}

/// Pay for a reservation and issue its tickets
pub async fn commit(
    State(state): State<AppState>,
    Path(reservation_id): Path<Uuid>,
    Json(payload): Json<CommitRequest>,
) -> AppResult<Json<OrderDetails>> {
    let details = issuance::commit(&state, reservation_id, payload, Utc::now()).await?;
    Ok(Json(details))
}

pub async fn extend(
    State(state): State<AppState>,
    Path(reservation_id): Path<Uuid>,
    Json(payload): Json<ExtendRequest>,
) -> AppResult<Json<reservation::Model>> {
    let extended =
        holds::extend_reservation(&state, reservation_id, payload.ttl_seconds, Utc::now()).await?;
    Ok(Json(extended))
}

/// Extend every active hold of a checkout session
pub async fn extend_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(payload): Json<ExtendRequest>,
) -> AppResult<Json<Vec<reservation::Model>>> {
    let extended =
        holds::extend_session(&state, &session_id, payload.ttl_seconds, Utc::now()).await?;
    Ok(Json(extended))
}

pub async fn release(
    State(state): State<AppState>,
    Path(reservation_id): Path<Uuid>,
) -> AppResult<Json<ReleasedSeats>> {
    let released = holds::release_reservation(&state, reservation_id, Utc::now()).await?;
    Ok(Json(ReleasedSeats {
        reservation_id,
        released,
    }))
}

/// Drop every hold of a checkout session
pub async fn release_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> AppResult<Json<ReleaseSummary>> {
    let summary = holds::release_session(&state, &session_id, Utc::now()).await?;
    Ok(Json(summary))
}
