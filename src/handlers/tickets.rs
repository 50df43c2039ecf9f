use axum::{
    extract::{Path, State},
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::domain::refund::RefundQuote;
use crate::entities::ticket;
use crate::error::AppResult;
use crate::services::cancellation::{self, CancellationResult};
use crate::services::issuance::{self, OrderDetails};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CheckInRequest {
    pub qr_payload: String,
}

pub async fn get_order(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
) -> AppResult<Json<OrderDetails>> {
    Ok(Json(issuance::get_order(&state, order_id).await?))
}

/// Ticket by id or by ticket code
pub async fn get_ticket(
    State(state): State<AppState>,
    Path(id_or_code): Path<String>,
) -> AppResult<Json<ticket::Model>> {
    Ok(Json(issuance::get_ticket(&state, &id_or_code).await?))
}

pub async fn refund_quote(
    State(state): State<AppState>,
    Path(ticket_id): Path<Uuid>,
) -> AppResult<Json<RefundQuote>> {
    let quote = cancellation::quote_refund(&state, ticket_id, Utc::now()).await?;
    Ok(Json(quote))
}

pub async fn cancel(
    State(state): State<AppState>,
    Path(ticket_id): Path<Uuid>,
) -> AppResult<Json<CancellationResult>> {
    let result = cancellation::cancel_ticket(&state, ticket_id, Utc::now()).await?;
    Ok(Json(result))
}

pub async fn check_in(
    State(state): State<AppState>,
    Json(payload): Json<CheckInRequest>,
) -> AppResult<Json<ticket::Model>> {
    let ticket = issuance::check_in(&state, &payload.qr_payload).await?;
    Ok(Json(ticket))
}
