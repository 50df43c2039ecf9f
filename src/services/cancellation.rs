use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveEnum, ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait,
    QueryFilter, QuerySelect, Set, TransactionTrait,
};
use serde::Serialize;
use uuid::Uuid;

use crate::domain::refund::{compute_refund, RefundQuote};
use crate::domain::BookingError;
use crate::entities::cancellation_rule;
use crate::entities::order::{self, OrderStatus};
use crate::entities::ticket::{self, TicketStatus};
use crate::entities::transaction::{self, TransactionKind, TransactionStatus};
use crate::entities::trip;
use crate::error::{AppError, AppResult};
use crate::services::inventory::LockedTrip;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct CancellationResult {
    pub ticket_id: Uuid,
    pub refund_amount: i64,
    pub refund_percentage: i32,
    pub fee_amount: i64,
}

async fn find_ticket<C: ConnectionTrait>(db: &C, ticket_id: Uuid) -> AppResult<ticket::Model> {
    ticket::Entity::find_by_id(ticket_id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Ticket not found".to_string()))
}

fn not_cancellable(status: &TicketStatus) -> BookingError {
    BookingError::InvalidTicketState(format!(
        "only confirmed tickets can be cancelled, ticket is {}",
        status.to_value()
    ))
}

fn ensure_cancellable(ticket: &ticket::Model) -> Result<(), BookingError> {
    if ticket.status != TicketStatus::Confirmed {
        return Err(not_cancellable(&ticket.status));
    }
    Ok(())
}

async fn quote_for<C: ConnectionTrait>(
    db: &C,
    ticket: &ticket::Model,
    trip: &trip::Model,
    now: DateTime<Utc>,
) -> AppResult<RefundQuote> {
    let rules = cancellation_rule::Entity::find()
        .filter(cancellation_rule::Column::CompanyId.eq(trip.company_id))
        .all(db)
        .await?;

    Ok(compute_refund(
        ticket.price,
        trip.departure_time.with_timezone(&Utc),
        now,
        &rules,
    )?)
}

/// What cancelling the ticket now would refund. Changes nothing.
pub async fn quote_refund(
    state: &AppState,
    ticket_id: Uuid,
    now: DateTime<Utc>,
) -> AppResult<RefundQuote> {
    let ticket = find_ticket(&state.db, ticket_id).await?;
    ensure_cancellable(&ticket)?;

    let trip = trip::Entity::find_by_id(ticket.trip_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Trip not found".to_string()))?;

    quote_for(&state.db, &ticket, &trip, now).await
}

/// Cancel a confirmed ticket, refund it per the company's rules and put
/// its seat back on sale.
pub async fn cancel_ticket(
    state: &AppState,
    ticket_id: Uuid,
    now: DateTime<Utc>,
) -> AppResult<CancellationResult> {
    let trip_id = find_ticket(&state.db, ticket_id).await?.trip_id;

    let _guard = state.trip_locks.lock(trip_id).await?;
    let txn = state.db.begin().await?;
    let mut locked = LockedTrip::load(&txn, trip_id, now).await?;

    // Check-in does not take the trip lock, so the row lock is what keeps
    // the status stable until the conditional update below.
    let ticket = ticket::Entity::find_by_id(ticket_id)
        .lock_exclusive()
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::NotFound("Ticket not found".to_string()))?;
    if let Err(err) = ensure_cancellable(&ticket) {
        locked.commit_expiry(txn).await?;
        return Err(err.into());
    }

    let quote = match quote_for(&txn, &ticket, &locked.trip, now).await {
        Ok(quote) => quote,
        Err(err) => {
            locked.commit_expiry(txn).await?;
            return Err(err);
        }
    };

    locked.inventory.free_sold(&ticket.seat_code, ticket.id)?;

    let order_id = ticket.order_id;
    let ticket_code = ticket.ticket_code.clone();
    let seat_code = ticket.seat_code.clone();

    let result = ticket::Entity::update_many()
        .set(ticket::ActiveModel {
            status: Set(TicketStatus::Cancelled),
            refund_amount: Set(Some(quote.refund_amount)),
            cancelled_at: Set(Some(now.into())),
            ..Default::default()
        })
        .filter(ticket::Column::Id.eq(ticket_id))
        .filter(ticket::Column::Status.eq(TicketStatus::Confirmed))
        .exec(&txn)
        .await?;
    if result.rows_affected == 0 {
        // Nothing is saved yet; returning drops and rolls back `txn`.
        let current = find_ticket(&txn, ticket_id).await?;
        return Err(not_cancellable(&current.status).into());
    }

    if quote.refund_amount > 0 {
        let payment_method = transaction::Entity::find()
            .filter(transaction::Column::OrderId.eq(order_id))
            .filter(transaction::Column::Kind.eq(TransactionKind::Payment))
            .one(&txn)
            .await?
            .map(|t| t.payment_method)
            .unwrap_or_else(|| "online".to_string());

        transaction::ActiveModel {
            id: Set(Uuid::new_v4()),
            order_id: Set(order_id),
            amount: Set(quote.refund_amount),
            payment_method: Set(payment_method),
            payment_ref: Set(format!("refund:{}", ticket_code)),
            kind: Set(TransactionKind::Refund),
            status: Set(TransactionStatus::Success),
            created_at: Set(now.into()),
        }
        .insert(&txn)
        .await?;
    }

    let still_active = ticket::Entity::find()
        .filter(ticket::Column::OrderId.eq(order_id))
        .filter(ticket::Column::Status.ne(TicketStatus::Cancelled))
        .count(&txn)
        .await?;
    if still_active == 0 {
        order::Entity::update_many()
            .set(order::ActiveModel {
                status: Set(OrderStatus::Refunded),
                ..Default::default()
            })
            .filter(order::Column::Id.eq(order_id))
            .exec(&txn)
            .await?;
    }

    locked.save(&txn).await?;
    txn.commit().await?;

    tracing::info!(
        ticket_id = %ticket_id,
        trip_id = %trip_id,
        seat = %seat_code,
        refund_amount = quote.refund_amount,
        refund_percentage = quote.refund_percentage,
        "Ticket cancelled"
    );

    Ok(CancellationResult {
        ticket_id,
        refund_amount: quote.refund_amount,
        refund_percentage: quote.refund_percentage,
        fee_amount: quote.fee_amount,
    })
}
