use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, IntoActiveModel, QueryFilter,
    Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::Config;
use crate::domain::layout::parse_seat_code;
use crate::domain::BookingError;
use crate::entities::reservation::{self, ReservationStatus, SeatCodes};
use crate::entities::trip::TripStatus;
use crate::error::{AppError, AppResult};
use crate::services::inventory::LockedTrip;
use crate::AppState;

#[derive(Debug, Clone, Deserialize)]
pub struct HoldRequest {
    pub seat_codes: Vec<String>,
    pub session_id: String,
    pub ttl_seconds: Option<i64>,
}

#[derive(Debug, Default, Serialize)]
pub struct ReleaseSummary {
    pub reservations: usize,
    pub released: usize,
}

/// Hold time for a request, bounded by the configured maximum.
pub fn resolve_ttl(config: &Config, ttl_seconds: Option<i64>) -> AppResult<Duration> {
    let ttl = ttl_seconds.unwrap_or(config.hold_ttl_seconds);
    if ttl <= 0 || ttl > config.max_hold_ttl_seconds {
        return Err(AppError::BadRequest(format!(
            "ttl_seconds must be between 1 and {}",
            config.max_hold_ttl_seconds
        )));
    }
    Ok(Duration::seconds(ttl))
}

fn normalize_seat_codes(config: &Config, codes: &[String]) -> AppResult<Vec<String>> {
    let mut codes: Vec<String> = codes.iter().map(|c| c.trim().to_uppercase()).collect();
    codes.sort();
    codes.dedup();

    if codes.is_empty() || codes.iter().any(|c| c.is_empty()) {
        return Err(AppError::BadRequest("seat_codes must not be empty".to_string()));
    }
    if codes.len() > config.max_seats_per_hold {
        return Err(AppError::BadRequest(format!(
            "At most {} seats can be held at once",
            config.max_seats_per_hold
        )));
    }

    let malformed: Vec<String> = codes
        .iter()
        .filter(|c| parse_seat_code(c).is_none())
        .cloned()
        .collect();
    if !malformed.is_empty() {
        return Err(BookingError::InvalidSeat { seats: malformed }.into());
    }
    Ok(codes)
}

async fn find_reservation<C: ConnectionTrait>(db: &C, id: Uuid) -> AppResult<reservation::Model> {
    reservation::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Reservation not found".to_string()))
}

/// Hold `seat_codes` on a trip for one checkout session, all or nothing.
///
/// A session re-holding on the same trip replaces its earlier reservation:
/// seats it keeps move to the new reservation and the rest are freed.
pub async fn hold(
    state: &AppState,
    trip_id: Uuid,
    req: HoldRequest,
    now: DateTime<Utc>,
) -> AppResult<reservation::Model> {
    let session_id = req.session_id.trim().to_string();
    if session_id.is_empty() {
        return Err(AppError::BadRequest("session_id is required".to_string()));
    }
    let codes = normalize_seat_codes(&state.config, &req.seat_codes)?;
    let ttl = resolve_ttl(&state.config, req.ttl_seconds)?;

    let _guard = state.trip_locks.lock(trip_id).await?;
    let txn = state.db.begin().await?;
    let mut locked = LockedTrip::load(&txn, trip_id, now).await?;

    if locked.trip.status != TripStatus::Scheduled
        || locked.trip.departure_time.with_timezone(&Utc) <= now
    {
        locked.commit_expiry(txn).await?;
        return Err(BookingError::TripNotBookable.into());
    }

    let previous = reservation::Entity::find()
        .filter(reservation::Column::SessionId.eq(session_id.as_str()))
        .filter(reservation::Column::TripId.eq(trip_id))
        .filter(reservation::Column::Status.eq(ReservationStatus::Active))
        .all(&txn)
        .await?;

    let reservation_id = Uuid::new_v4();
    let expires_at = now + ttl;

    if let Err(err) = locked
        .inventory
        .hold(&codes, &session_id, reservation_id, expires_at, now)
    {
        tracing::info!(trip_id = %trip_id, session_id = %session_id, error = %err, "Hold rejected");
        locked.commit_expiry(txn).await?;
        return Err(err.into());
    }

    for prev in previous {
        let freed = locked.inventory.release_reservation(prev.id);
        tracing::debug!(reservation_id = %prev.id, freed = ?freed, "Replaced by new hold");
        let mut active = prev.into_active_model();
        active.status = Set(ReservationStatus::Released);
        active.update(&txn).await?;
    }

    let reservation = reservation::ActiveModel {
        id: Set(reservation_id),
        session_id: Set(session_id.clone()),
        trip_id: Set(trip_id),
        seat_codes: Set(SeatCodes(codes.clone())),
        created_at: Set(now.into()),
        expires_at: Set(expires_at.into()),
        status: Set(ReservationStatus::Active),
    }
    .insert(&txn)
    .await?;

    locked.save(&txn).await?;
    txn.commit().await?;

    tracing::info!(
        trip_id = %trip_id,
        reservation_id = %reservation_id,
        seats = ?codes,
        "Seats held"
    );

    Ok(reservation)
}

/// Release one active reservation. Returns the freed seat codes.
pub async fn release_reservation(
    state: &AppState,
    reservation_id: Uuid,
    now: DateTime<Utc>,
) -> AppResult<Vec<String>> {
    let trip_id = find_reservation(&state.db, reservation_id).await?.trip_id;

    let _guard = state.trip_locks.lock(trip_id).await?;
    let txn = state.db.begin().await?;
    let mut locked = LockedTrip::load(&txn, trip_id, now).await?;

    let reservation = find_reservation(&txn, reservation_id).await?;
    if reservation.status != ReservationStatus::Active {
        locked.commit_expiry(txn).await?;
        return Err(BookingError::ReservationExpired.into());
    }

    let freed = locked.inventory.release_reservation(reservation_id);
    let mut active = reservation.into_active_model();
    active.status = Set(ReservationStatus::Released);
    active.update(&txn).await?;

    locked.save(&txn).await?;
    txn.commit().await?;

    tracing::info!(reservation_id = %reservation_id, seats = ?freed, "Reservation released");
    Ok(freed)
}

/// Release every active hold of a session, across all trips.
pub async fn release_session(
    state: &AppState,
    session_id: &str,
    now: DateTime<Utc>,
) -> AppResult<ReleaseSummary> {
    let active = reservation::Entity::find()
        .filter(reservation::Column::SessionId.eq(session_id))
        .filter(reservation::Column::Status.eq(ReservationStatus::Active))
        .all(&state.db)
        .await?;

    let mut by_trip: BTreeMap<Uuid, Vec<Uuid>> = BTreeMap::new();
    for r in active {
        by_trip.entry(r.trip_id).or_default().push(r.id);
    }

    let mut summary = ReleaseSummary::default();
    for (trip_id, ids) in by_trip {
        let _guard = state.trip_locks.lock(trip_id).await?;
        let txn = state.db.begin().await?;
        let mut locked = LockedTrip::load(&txn, trip_id, now).await?;

        for id in ids {
            let reservation = find_reservation(&txn, id).await?;
            if reservation.status != ReservationStatus::Active {
                continue;
            }
            summary.released += locked.inventory.release_reservation(id).len();
            summary.reservations += 1;

            let mut active = reservation.into_active_model();
            active.status = Set(ReservationStatus::Released);
            active.update(&txn).await?;
        }

        locked.save(&txn).await?;
        txn.commit().await?;
    }

    tracing::info!(
        session_id = %session_id,
        reservations = summary.reservations,
        seats = summary.released,
        "Session released"
    );
    Ok(summary)
}

/// Push an active reservation's deadline to `now + ttl`.
pub async fn extend_reservation(
    state: &AppState,
    reservation_id: Uuid,
    ttl_seconds: Option<i64>,
    now: DateTime<Utc>,
) -> AppResult<reservation::Model> {
    let ttl = resolve_ttl(&state.config, ttl_seconds)?;
    let trip_id = find_reservation(&state.db, reservation_id).await?.trip_id;

    let _guard = state.trip_locks.lock(trip_id).await?;
    let txn = state.db.begin().await?;
    let mut locked = LockedTrip::load(&txn, trip_id, now).await?;

    let reservation = find_reservation(&txn, reservation_id).await?;
    if reservation.status != ReservationStatus::Active
        || reservation.expires_at.with_timezone(&Utc) <= now
    {
        locked.commit_expiry(txn).await?;
        return Err(BookingError::ReservationExpired.into());
    }

    let expires_at = now + ttl;
    locked.inventory.extend(reservation_id, expires_at);

    let mut active = reservation.into_active_model();
    active.expires_at = Set(expires_at.into());
    let reservation = active.update(&txn).await?;

    locked.save(&txn).await?;
    txn.commit().await?;

    tracing::debug!(reservation_id = %reservation_id, expires_at = %expires_at, "Reservation extended");
    Ok(reservation)
}

/// Extend every active reservation of a session.
pub async fn extend_session(
    state: &AppState,
    session_id: &str,
    ttl_seconds: Option<i64>,
    now: DateTime<Utc>,
) -> AppResult<Vec<reservation::Model>> {
    let active = reservation::Entity::find()
        .filter(reservation::Column::SessionId.eq(session_id))
        .filter(reservation::Column::Status.eq(ReservationStatus::Active))
        .all(&state.db)
        .await?;

    if active.is_empty() {
        return Err(BookingError::ReservationExpired.into());
    }

    let mut extended = Vec::with_capacity(active.len());
    for r in active {
        extended.push(extend_reservation(state, r.id, ttl_seconds, now).await?);
    }
    Ok(extended)
}
