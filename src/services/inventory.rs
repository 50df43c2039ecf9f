use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseTransaction, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait, Unchanged,
};
use serde::Serialize;
use uuid::Uuid;

use crate::domain::inventory::{SeatState, TripInventory};
use crate::entities::reservation::{self, ReservationStatus};
use crate::entities::trip;
use crate::entities::trip_seat::{self, SeatStatus};
use crate::error::{AppError, AppResult};
use crate::AppState;

/// A trip's seat rows loaded `FOR UPDATE` inside a transaction, with
/// expired holds already released in memory.
pub struct LockedTrip {
    pub trip: trip::Model,
    pub inventory: TripInventory,
    rows: HashMap<String, Uuid>,
    pub expired_seats: Vec<String>,
    pub expired_reservations: Vec<Uuid>,
}

impl LockedTrip {
    /// Load and lock the trip's seat rows. Callers must hold the trip's
    /// [`TripLocks`](crate::services::locks::TripLocks) guard.
    pub async fn load(
        txn: &DatabaseTransaction,
        trip_id: Uuid,
        now: DateTime<Utc>,
    ) -> AppResult<Self> {
        let trip = trip::Entity::find_by_id(trip_id)
            .lock_exclusive()
            .one(txn)
            .await?
            .ok_or_else(|| AppError::NotFound("Trip not found".to_string()))?;

        let seat_rows = trip_seat::Entity::find()
            .filter(trip_seat::Column::TripId.eq(trip_id))
            .order_by_asc(trip_seat::Column::SeatCode)
            .lock_exclusive()
            .all(txn)
            .await?;

        let mut rows = HashMap::with_capacity(seat_rows.len());
        let mut seats = Vec::with_capacity(seat_rows.len());
        for row in seat_rows {
            rows.insert(row.seat_code.clone(), row.id);
            seats.push((
                row.seat_code,
                SeatState {
                    status: row.status,
                    floor: row.floor,
                    hold_expires_at: row.hold_expires_at.map(|at| at.with_timezone(&Utc)),
                    held_by_session: row.held_by_session,
                    reservation_id: row.reservation_id,
                    ticket_id: row.ticket_id,
                },
            ));
        }

        let mut locked = Self {
            trip,
            inventory: TripInventory::new(trip_id, seats),
            rows,
            expired_seats: Vec::new(),
            expired_reservations: Vec::new(),
        };
        locked.expired_seats = locked.inventory.release_expired(now);
        locked.expired_reservations = expire_reservations(txn, trip_id, now).await?;

        if !locked.expired_seats.is_empty() || !locked.expired_reservations.is_empty() {
            tracing::info!(
                trip_id = %trip_id,
                seats = ?locked.expired_seats,
                reservations = locked.expired_reservations.len(),
                "Released expired holds"
            );
        }

        Ok(locked)
    }

    /// Write every seat touched since load back to its row.
    pub async fn save(&mut self, txn: &DatabaseTransaction) -> AppResult<()> {
        for code in self.inventory.take_dirty() {
            let (Some(id), Some(state)) = (self.rows.get(&code), self.inventory.get(&code)) else {
                continue;
            };
            trip_seat::ActiveModel {
                id: Unchanged(*id),
                status: Set(state.status),
                hold_expires_at: Set(state.hold_expires_at.map(Into::into)),
                held_by_session: Set(state.held_by_session.clone()),
                reservation_id: Set(state.reservation_id),
                ticket_id: Set(state.ticket_id),
                ..Default::default()
            }
            .update(txn)
            .await?;
        }
        Ok(())
    }

    /// Persist whatever lazy expiry happened during load and commit. Used on
    /// error paths so a rejected request still frees stale holds.
    pub async fn commit_expiry(mut self, txn: DatabaseTransaction) -> AppResult<()> {
        self.save(&txn).await?;
        txn.commit().await?;
        Ok(())
    }
}

/// Mark every active reservation of the trip whose deadline passed as
/// expired. Returns the affected ids.
async fn expire_reservations<C: ConnectionTrait>(
    db: &C,
    trip_id: Uuid,
    now: DateTime<Utc>,
) -> AppResult<Vec<Uuid>> {
    let expired: Vec<Uuid> = reservation::Entity::find()
        .filter(reservation::Column::TripId.eq(trip_id))
        .filter(reservation::Column::Status.eq(ReservationStatus::Active))
        .all(db)
        .await?
        .into_iter()
        .filter(|r| r.expires_at.with_timezone(&Utc) <= now)
        .map(|r| r.id)
        .collect();

    if !expired.is_empty() {
        reservation::Entity::update_many()
            .set(reservation::ActiveModel {
                status: Set(ReservationStatus::Expired),
                ..Default::default()
            })
            .filter(reservation::Column::Id.is_in(expired.clone()))
            .exec(db)
            .await?;
    }

    Ok(expired)
}

#[derive(Debug, Serialize)]
pub struct SeatMap {
    pub trip_id: Uuid,
    pub seats: BTreeMap<String, SeatState>,
}

/// Current seat map of a trip, after releasing expired holds.
pub async fn seat_map(state: &AppState, trip_id: Uuid, now: DateTime<Utc>) -> AppResult<SeatMap> {
    let _guard = state.trip_locks.lock(trip_id).await?;
    let txn = state.db.begin().await?;
    let mut locked = LockedTrip::load(&txn, trip_id, now).await?;
    locked.save(&txn).await?;
    txn.commit().await?;

    Ok(SeatMap {
        trip_id,
        seats: locked.inventory.seats().clone(),
    })
}

/// Sell one held seat to `ticket_id`. Returns `false` when the seat was
/// already sold to that ticket.
pub async fn mark_sold(
    state: &AppState,
    trip_id: Uuid,
    seat_code: &str,
    session_id: &str,
    ticket_id: Uuid,
    now: DateTime<Utc>,
) -> AppResult<bool> {
    let _guard = state.trip_locks.lock(trip_id).await?;
    let txn = state.db.begin().await?;
    let mut locked = LockedTrip::load(&txn, trip_id, now).await?;

    match locked.inventory.mark_sold(seat_code, session_id, ticket_id, now) {
        Ok(changed) => {
            locked.save(&txn).await?;
            txn.commit().await?;
            Ok(changed)
        }
        Err(err) => {
            locked.commit_expiry(txn).await?;
            Err(err.into())
        }
    }
}

/// Release every expired hold of one trip. Returns the freed seat codes.
pub async fn release_expired_holds(
    state: &AppState,
    trip_id: Uuid,
    now: DateTime<Utc>,
) -> AppResult<Vec<String>> {
    let _guard = state.trip_locks.lock(trip_id).await?;
    let txn = state.db.begin().await?;
    let mut locked = LockedTrip::load(&txn, trip_id, now).await?;
    locked.save(&txn).await?;
    txn.commit().await?;
    Ok(locked.expired_seats)
}

#[derive(Debug, Default, Serialize)]
pub struct SweepReport {
    pub trips: usize,
    pub seats_released: usize,
    pub reservations_expired: usize,
    pub trips_failed: usize,
}

async fn sweep_trip(state: &AppState, trip_id: Uuid, now: DateTime<Utc>) -> AppResult<(usize, usize)> {
    let _guard = state.trip_locks.lock(trip_id).await?;
    let txn = state.db.begin().await?;
    let mut locked = LockedTrip::load(&txn, trip_id, now).await?;
    locked.save(&txn).await?;
    txn.commit().await?;
    Ok((locked.expired_seats.len(), locked.expired_reservations.len()))
}

/// Release expired holds across every trip, one trip lock at a time.
pub async fn sweep_expired_holds(state: &AppState, now: DateTime<Utc>) -> AppResult<SweepReport> {
    let mut trip_ids: BTreeSet<Uuid> = trip_seat::Entity::find()
        .filter(trip_seat::Column::Status.eq(SeatStatus::Held))
        .all(&state.db)
        .await?
        .into_iter()
        .filter(|row| row.hold_expires_at.is_none_or(|at| at.with_timezone(&Utc) <= now))
        .map(|row| row.trip_id)
        .collect();

    trip_ids.extend(
        reservation::Entity::find()
            .filter(reservation::Column::Status.eq(ReservationStatus::Active))
            .all(&state.db)
            .await?
            .into_iter()
            .filter(|r| r.expires_at.with_timezone(&Utc) <= now)
            .map(|r| r.trip_id),
    );

    let mut report = SweepReport::default();
    for trip_id in trip_ids {
        match sweep_trip(state, trip_id, now).await {
            Ok((seats, reservations)) => {
                report.trips += 1;
                report.seats_released += seats;
                report.reservations_expired += reservations;
            }
            Err(err) => {
                tracing::warn!(trip_id = %trip_id, error = %err, "Hold sweep skipped trip");
                report.trips_failed += 1;
            }
        }
    }

    if report.trips > 0 || report.trips_failed > 0 {
        tracing::info!(
            trips = report.trips,
            seats = report.seats_released,
            reservations = report.reservations_expired,
            failed = report.trips_failed,
            "Expired hold sweep finished"
        );
    }

    Ok(report)
}
