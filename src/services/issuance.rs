use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveEnum, ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseTransaction, EntityTrait,
    IntoActiveModel, PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::pricing::{self, PriceRequest};
use crate::domain::tickets::{generate_ticket_code, qr_payload, split_amount, verify_qr_payload};
use crate::domain::BookingError;
use crate::entities::order::{self, OrderStatus};
use crate::entities::point;
use crate::entities::reservation::{self, ReservationStatus};
use crate::entities::ticket::{self, TicketStatus};
use crate::entities::transaction::{self, TransactionKind, TransactionStatus};
use crate::entities::trip::TripStatus;
use crate::error::{AppError, AppResult};
use crate::services::inventory::LockedTrip;
use crate::services::pricing::{as_lookup, fetch_coupon, redeem_coupon};
use crate::AppState;

const TICKET_CODE_ATTEMPTS: usize = 5;
const DEFAULT_PAYMENT_METHOD: &str = "online";

#[derive(Debug, Clone, Deserialize)]
pub struct CommitRequest {
    pub user_id: Uuid,
    pub coupon_code: Option<String>,
    pub payment_ref: String,
    pub payment_method: Option<String>,
    pub pickup_point_id: Option<Uuid>,
    pub dropoff_point_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct OrderDetails {
    pub order_id: Uuid,
    pub order: order::Model,
    pub tickets: Vec<ticket::Model>,
}

async fn load_order_details<C: ConnectionTrait>(db: &C, order: order::Model) -> AppResult<OrderDetails> {
    let tickets = ticket::Entity::find()
        .filter(ticket::Column::OrderId.eq(order.id))
        .order_by_asc(ticket::Column::SeatCode)
        .all(db)
        .await?;
    Ok(OrderDetails {
        order_id: order.id,
        order,
        tickets,
    })
}

/// The order already created for a committed reservation, if it was paid
/// with `payment_ref`.
async fn find_committed_order(
    txn: &DatabaseTransaction,
    reservation_id: Uuid,
    payment_ref: &str,
) -> AppResult<Option<order::Model>> {
    let Some(order) = order::Entity::find()
        .filter(order::Column::ReservationId.eq(reservation_id))
        .one(txn)
        .await?
    else {
        return Ok(None);
    };

    let paid_with_ref = transaction::Entity::find()
        .filter(transaction::Column::OrderId.eq(order.id))
        .filter(transaction::Column::Kind.eq(TransactionKind::Payment))
        .filter(transaction::Column::PaymentRef.eq(payment_ref))
        .count(txn)
        .await?
        > 0;

    Ok(paid_with_ref.then_some(order))
}

async fn unique_ticket_code(txn: &DatabaseTransaction) -> AppResult<String> {
    for _ in 0..TICKET_CODE_ATTEMPTS {
        let code = generate_ticket_code(&mut rand::thread_rng());
        let taken = ticket::Entity::find()
            .filter(ticket::Column::TicketCode.eq(code.as_str()))
            .count(txn)
            .await?
            > 0;
        if !taken {
            return Ok(code);
        }
        tracing::debug!(code = %code, "Ticket code collision, regenerating");
    }
    Err(AppError::Internal("Could not allocate a unique ticket code".to_string()))
}

/// Turn a paid reservation into an order with one ticket per seat.
///
/// Runs under the trip lock in a single transaction: any failure after the
/// reservation checks rolls everything back and leaves the hold active.
/// Repeating the call with the same `payment_ref` returns the existing order.
pub async fn commit(
    state: &AppState,
    reservation_id: Uuid,
    req: CommitRequest,
    now: DateTime<Utc>,
) -> AppResult<OrderDetails> {
    let payment_ref = req.payment_ref.trim().to_string();
    if payment_ref.is_empty() {
        return Err(AppError::BadRequest("payment_ref is required".to_string()));
    }

    for point_id in [req.pickup_point_id, req.dropoff_point_id].into_iter().flatten() {
        if point::Entity::find_by_id(point_id).one(&state.db).await?.is_none() {
            return Err(AppError::BadRequest(format!("Unknown point {}", point_id)));
        }
    }

    let trip_id = reservation::Entity::find_by_id(reservation_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Reservation not found".to_string()))?
        .trip_id;

    let _guard = state.trip_locks.lock(trip_id).await?;
    let txn = state.db.begin().await?;
    let mut locked = LockedTrip::load(&txn, trip_id, now).await?;

    let reservation = reservation::Entity::find_by_id(reservation_id)
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::NotFound("Reservation not found".to_string()))?;

    if reservation.status == ReservationStatus::Committed {
        let existing = find_committed_order(&txn, reservation_id, &payment_ref).await?;
        let details = match existing {
            Some(order) => Some(load_order_details(&txn, order).await?),
            None => None,
        };
        locked.commit_expiry(txn).await?;
        return match details {
            Some(details) => {
                tracing::info!(order_id = %details.order_id, "Commit replayed for paid reservation");
                Ok(details)
            }
            None => Err(BookingError::ReservationExpired.into()),
        };
    }

    if reservation.status != ReservationStatus::Active
        || reservation.expires_at.with_timezone(&Utc) <= now
    {
        locked.commit_expiry(txn).await?;
        return Err(BookingError::ReservationExpired.into());
    }

    if locked.trip.status != TripStatus::Scheduled
        || locked.trip.departure_time.with_timezone(&Utc) <= now
    {
        locked.commit_expiry(txn).await?;
        return Err(BookingError::TripNotBookable.into());
    }

    let seat_codes = reservation.seat_codes.0.clone();
    let session_id = reservation.session_id.clone();
    if let Err(err) = locked.inventory.verify_held(&seat_codes, &session_id, now) {
        locked.commit_expiry(txn).await?;
        return Err(err.into());
    }

    // From here on any error drops `txn` and rolls back.
    let fetched = fetch_coupon(&txn, req.coupon_code.as_deref()).await?;
    let priced = pricing::price(&PriceRequest {
        trip_price: locked.trip.price,
        seat_count: seat_codes.len(),
        trip_company_id: locked.trip.company_id,
        coupon: as_lookup(&fetched),
        best_effort: false,
        now,
    })?;
    if let Some(coupon_id) = priced.coupon_id {
        redeem_coupon(&txn, coupon_id).await?;
    }

    let order = order::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(req.user_id),
        reservation_id: Set(reservation_id),
        trip_id: Set(trip_id),
        coupon_id: Set(priced.coupon_id),
        origin_amount: Set(priced.origin_amount),
        discount_amount: Set(priced.discount),
        final_amount: Set(priced.final_amount),
        status: Set(OrderStatus::Pending),
        created_at: Set(now.into()),
    }
    .insert(&txn)
    .await?;

    let shares = split_amount(priced.final_amount, seat_codes.len());
    let mut tickets = Vec::with_capacity(seat_codes.len());
    for (seat_code, share) in seat_codes.iter().zip(shares) {
        let ticket_id = Uuid::new_v4();
        let ticket_code = unique_ticket_code(&txn).await?;
        let payload = qr_payload(&state.config.ticket_secret, &ticket_code, trip_id, seat_code);

        let ticket = ticket::ActiveModel {
            id: Set(ticket_id),
            ticket_code: Set(ticket_code),
            order_id: Set(order.id),
            trip_id: Set(trip_id),
            seat_code: Set(seat_code.clone()),
            price: Set(share),
            qr_payload: Set(payload),
            status: Set(TicketStatus::Confirmed),
            pickup_point_id: Set(req.pickup_point_id),
            dropoff_point_id: Set(req.dropoff_point_id),
            refund_amount: Set(None),
            cancelled_at: Set(None),
            created_at: Set(now.into()),
        }
        .insert(&txn)
        .await?;

        locked
            .inventory
            .mark_sold(seat_code, &session_id, ticket_id, now)?;
        tickets.push(ticket);
    }

    transaction::ActiveModel {
        id: Set(Uuid::new_v4()),
        order_id: Set(order.id),
        amount: Set(priced.final_amount),
        payment_method: Set(req
            .payment_method
            .clone()
            .unwrap_or_else(|| DEFAULT_PAYMENT_METHOD.to_string())),
        payment_ref: Set(payment_ref),
        kind: Set(TransactionKind::Payment),
        status: Set(TransactionStatus::Success),
        created_at: Set(now.into()),
    }
    .insert(&txn)
    .await?;

    let mut paid = order.into_active_model();
    paid.status = Set(OrderStatus::Paid);
    let order = paid.update(&txn).await?;

    let mut committed = reservation.into_active_model();
    committed.status = Set(ReservationStatus::Committed);
    committed.update(&txn).await?;

    locked.save(&txn).await?;
    txn.commit().await?;

    tracing::info!(
        order_id = %order.id,
        reservation_id = %reservation_id,
        trip_id = %trip_id,
        seats = ?seat_codes,
        final_amount = order.final_amount,
        "Order committed"
    );

    Ok(OrderDetails {
        order_id: order.id,
        order,
        tickets,
    })
}

pub async fn get_order(state: &AppState, order_id: Uuid) -> AppResult<OrderDetails> {
    let order = order::Entity::find_by_id(order_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Order not found".to_string()))?;
    load_order_details(&state.db, order).await
}

/// Look a ticket up by id or by its printed code.
pub async fn get_ticket(state: &AppState, id_or_code: &str) -> AppResult<ticket::Model> {
    let query = match Uuid::parse_str(id_or_code) {
        Ok(id) => ticket::Entity::find_by_id(id),
        Err(_) => ticket::Entity::find().filter(ticket::Column::TicketCode.eq(id_or_code.trim())),
    };
    query
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Ticket not found".to_string()))
}

/// Board a passenger from a scanned QR payload.
pub async fn check_in(state: &AppState, payload: &str) -> AppResult<ticket::Model> {
    let scanned = verify_qr_payload(&state.config.ticket_secret, payload)
        .ok_or_else(|| AppError::BadRequest("Invalid ticket QR code".to_string()))?;

    let ticket = ticket::Entity::find()
        .filter(ticket::Column::TicketCode.eq(scanned.ticket_code.as_str()))
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Ticket not found".to_string()))?;

    if ticket.trip_id != scanned.trip_id || ticket.seat_code != scanned.seat_code {
        return Err(AppError::BadRequest("QR code does not match the ticket".to_string()));
    }

    let result = ticket::Entity::update_many()
        .set(ticket::ActiveModel {
            status: Set(TicketStatus::CheckedIn),
            ..Default::default()
        })
        .filter(ticket::Column::Id.eq(ticket.id))
        .filter(ticket::Column::Status.eq(TicketStatus::Confirmed))
        .exec(&state.db)
        .await?;

    if result.rows_affected == 0 {
        return Err(BookingError::InvalidTicketState(format!(
            "ticket is {}",
            ticket.status.to_value()
        ))
        .into());
    }

    tracing::info!(ticket_code = %ticket.ticket_code, trip_id = %ticket.trip_id, "Ticket checked in");

    Ok(ticket::Model {
        status: TicketStatus::CheckedIn,
        ..ticket
    })
}
