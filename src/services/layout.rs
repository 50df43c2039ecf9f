use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseTransaction, EntityTrait,
    IntoActiveModel, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::domain::layout::generate_layout;
use crate::domain::BookingError;
use crate::entities::trip::TripStatus;
use crate::entities::trip_seat::SeatStatus;
use crate::entities::{bus, bus_type, seat, trip, trip_seat};
use crate::error::{AppError, AppResult};
use crate::AppState;

/// Whether any trip already runs on a bus of this type.
pub async fn is_layout_locked<C: ConnectionTrait>(db: &C, bus_type_id: Uuid) -> AppResult<bool> {
    let bus_ids: Vec<Uuid> = bus::Entity::find()
        .filter(bus::Column::BusTypeId.eq(bus_type_id))
        .all(db)
        .await?
        .into_iter()
        .map(|b| b.id)
        .collect();

    if bus_ids.is_empty() {
        return Ok(false);
    }

    let trips = trip::Entity::find()
        .filter(trip::Column::BusId.is_in(bus_ids))
        .count(db)
        .await?;
    Ok(trips > 0)
}

/// Bus type row locked for the rest of the transaction. Layout regeneration
/// and trip creation both take it before reading seats or trips.
async fn lock_bus_type(txn: &DatabaseTransaction, bus_type_id: Uuid) -> AppResult<bus_type::Model> {
    bus_type::Entity::find_by_id(bus_type_id)
        .lock_exclusive()
        .one(txn)
        .await?
        .ok_or_else(|| AppError::NotFound("Bus type not found".to_string()))
}

/// Generate and store the seat grid of a bus type, replacing any previous
/// grid. Refused once trips use the bus type.
pub async fn generate_bus_type_layout(
    state: &AppState,
    bus_type_id: Uuid,
) -> AppResult<Vec<seat::Model>> {
    let txn = state.db.begin().await?;
    let bus_type = lock_bus_type(&txn, bus_type_id).await?;

    if is_layout_locked(&txn, bus_type_id).await? {
        return Err(BookingError::LayoutLocked.into());
    }

    let seats: Vec<seat::Model> = generate_layout(&bus_type)?
        .into_iter()
        .map(|pos| seat::Model {
            id: Uuid::new_v4(),
            bus_type_id,
            code: pos.code,
            row_index: pos.row_index,
            col_index: pos.col_index,
            floor: pos.floor,
        })
        .collect();

    seat::Entity::delete_many()
        .filter(seat::Column::BusTypeId.eq(bus_type_id))
        .exec(&txn)
        .await?;
    seat::Entity::insert_many(seats.iter().cloned().map(IntoActiveModel::into_active_model))
        .exec(&txn)
        .await?;
    txn.commit().await?;

    tracing::info!(bus_type_id = %bus_type_id, seats = seats.len(), "Bus type layout generated");
    Ok(seats)
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewTrip {
    pub bus_id: Uuid,
    pub bus_route_id: Uuid,
    pub departure_time: DateTime<Utc>,
    pub arrival_time: DateTime<Utc>,
    pub price: i64,
}

/// Schedule a trip and snapshot its bus type's seats as free trip seats.
pub async fn create_trip(state: &AppState, new: NewTrip, now: DateTime<Utc>) -> AppResult<trip::Model> {
    if new.arrival_time <= new.departure_time {
        return Err(AppError::BadRequest(
            "arrival_time must be after departure_time".to_string(),
        ));
    }
    if new.departure_time <= now {
        return Err(AppError::BadRequest("departure_time must be in the future".to_string()));
    }
    if new.price < 0 {
        return Err(AppError::BadRequest("price must not be negative".to_string()));
    }

    let bus = bus::Entity::find_by_id(new.bus_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Bus not found".to_string()))?;

    let txn = state.db.begin().await?;
    lock_bus_type(&txn, bus.bus_type_id).await?;

    let seats = seat::Entity::find()
        .filter(seat::Column::BusTypeId.eq(bus.bus_type_id))
        .order_by_asc(seat::Column::Floor)
        .order_by_asc(seat::Column::RowIndex)
        .order_by_asc(seat::Column::ColIndex)
        .all(&txn)
        .await?;
    if seats.is_empty() {
        return Err(AppError::BadRequest(
            "Bus type has no seat layout yet".to_string(),
        ));
    }

    let trip = trip::ActiveModel {
        id: Set(Uuid::new_v4()),
        bus_route_id: Set(new.bus_route_id),
        bus_id: Set(bus.id),
        company_id: Set(bus.company_id),
        departure_time: Set(new.departure_time.into()),
        arrival_time: Set(new.arrival_time.into()),
        price: Set(new.price),
        status: Set(TripStatus::Scheduled),
        created_at: Set(now.into()),
    }
    .insert(&txn)
    .await?;

    let trip_seats = seats.iter().map(|s| trip_seat::ActiveModel {
        id: Set(Uuid::new_v4()),
        trip_id: Set(trip.id),
        seat_code: Set(s.code.clone()),
        floor: Set(s.floor),
        status: Set(SeatStatus::Free),
        hold_expires_at: Set(None),
        held_by_session: Set(None),
        reservation_id: Set(None),
        ticket_id: Set(None),
    });
    trip_seat::Entity::insert_many(trip_seats).exec(&txn).await?;
    txn.commit().await?;

    tracing::info!(trip_id = %trip.id, bus_id = %bus.id, seats = seats.len(), "Trip created");
    Ok(trip)
}
