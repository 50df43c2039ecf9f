use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::domain::BookingError;
use crate::entities::trip_seat::SeatStatus;

/// State of one seat on one trip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeatState {
    pub status: SeatStatus,
    pub floor: i32,
    pub hold_expires_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing)]
    pub held_by_session: Option<String>,
    pub reservation_id: Option<Uuid>,
    pub ticket_id: Option<Uuid>,
}

impl SeatState {
    pub fn free(floor: i32) -> Self {
        Self {
            status: SeatStatus::Free,
            floor,
            hold_expires_at: None,
            held_by_session: None,
            reservation_id: None,
            ticket_id: None,
        }
    }

    pub fn is_hold_expired(&self, now: DateTime<Utc>) -> bool {
        self.status == SeatStatus::Held && self.hold_expires_at.is_none_or(|at| at <= now)
    }

    fn is_held_by(&self, session_id: &str, now: DateTime<Utc>) -> bool {
        self.status == SeatStatus::Held
            && self.held_by_session.as_deref() == Some(session_id)
            && !self.is_hold_expired(now)
    }

    fn clear(&mut self) {
        *self = Self::free(self.floor);
    }
}

/// Seat map of a single trip with its transitions.
///
/// Every mutation records the touched seat codes so that the caller can
/// write back only the rows that changed. The inventory is only ever
/// mutated while the trip's serialization point is held.
#[derive(Debug, Clone)]
pub struct TripInventory {
    trip_id: Uuid,
    seats: BTreeMap<String, SeatState>,
    dirty: BTreeSet<String>,
}

impl TripInventory {
    pub fn new(trip_id: Uuid, seats: impl IntoIterator<Item = (String, SeatState)>) -> Self {
        Self {
            trip_id,
            seats: seats.into_iter().collect(),
            dirty: BTreeSet::new(),
        }
    }

    pub fn trip_id(&self) -> Uuid {
        self.trip_id
    }

    pub fn seats(&self) -> &BTreeMap<String, SeatState> {
        &self.seats
    }

    pub fn get(&self, code: &str) -> Option<&SeatState> {
        self.seats.get(code)
    }

    pub fn count(&self, status: SeatStatus) -> usize {
        self.seats.values().filter(|s| s.status == status).count()
    }

    /// Revert every hold whose deadline has passed. Returns the freed codes.
    pub fn release_expired(&mut self, now: DateTime<Utc>) -> Vec<String> {
        let expired: Vec<String> = self
            .seats
            .iter()
            .filter(|(_, state)| state.is_hold_expired(now))
            .map(|(code, _)| code.clone())
            .collect();

        for code in &expired {
            if let Some(state) = self.seats.get_mut(code) {
                state.clear();
            }
            self.dirty.insert(code.clone());
        }

        expired
    }

    /// Hold every seat in `codes` for `session_id`, or none of them.
    ///
    /// Seats already held by the same session count as available so that a
    /// session can change its selection without releasing first.
    pub fn hold(
        &mut self,
        codes: &[String],
        session_id: &str,
        reservation_id: Uuid,
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<(), BookingError> {
        let unknown: Vec<String> = codes
            .iter()
            .filter(|code| !self.seats.contains_key(code.as_str()))
            .cloned()
            .collect();
        if !unknown.is_empty() {
            return Err(BookingError::InvalidSeat { seats: unknown });
        }

        let mut unavailable: Vec<String> = codes
            .iter()
            .filter(|code| {
                let state = &self.seats[code.as_str()];
                match state.status {
                    SeatStatus::Free => false,
                    SeatStatus::Held => {
                        !state.is_hold_expired(now) && !state.is_held_by(session_id, now)
                    }
                    SeatStatus::Sold => true,
                }
            })
            .cloned()
            .collect();
        if !unavailable.is_empty() {
            unavailable.sort();
            unavailable.dedup();
            return Err(BookingError::SeatUnavailable { seats: unavailable });
        }

        for code in codes {
            if let Some(state) = self.seats.get_mut(code) {
                state.status = SeatStatus::Held;
                state.hold_expires_at = Some(expires_at);
                state.held_by_session = Some(session_id.to_string());
                state.reservation_id = Some(reservation_id);
                state.ticket_id = None;
            }
            self.dirty.insert(code.clone());
        }

        Ok(())
    }

    /// Free every seat still held under `reservation_id`.
    pub fn release_reservation(&mut self, reservation_id: Uuid) -> Vec<String> {
        let held: Vec<String> = self
            .seats
            .iter()
            .filter(|(_, s)| s.status == SeatStatus::Held && s.reservation_id == Some(reservation_id))
            .map(|(code, _)| code.clone())
            .collect();

        for code in &held {
            if let Some(state) = self.seats.get_mut(code) {
                state.clear();
            }
            self.dirty.insert(code.clone());
        }

        held
    }

    /// Move the deadline of every seat held under `reservation_id`.
    pub fn extend(&mut self, reservation_id: Uuid, expires_at: DateTime<Utc>) -> usize {
        let mut extended = 0;
        for (code, state) in self.seats.iter_mut() {
            if state.status == SeatStatus::Held && state.reservation_id == Some(reservation_id) {
                state.hold_expires_at = Some(expires_at);
                self.dirty.insert(code.clone());
                extended += 1;
            }
        }
        extended
    }

    /// Check that every code is currently held by `session_id`.
    pub fn verify_held(
        &self,
        codes: &[String],
        session_id: &str,
        now: DateTime<Utc>,
    ) -> Result<(), BookingError> {
        for code in codes {
            let held = self
                .seats
                .get(code)
                .is_some_and(|state| state.is_held_by(session_id, now));
            if !held {
                return Err(BookingError::SeatNotHeld { seat: code.clone() });
            }
        }
        Ok(())
    }

    /// Sell a seat held by `session_id` to `ticket_id`.
    ///
    /// Selling an already sold seat to the same ticket is a no-op and
    /// returns `Ok(false)`.
    pub fn mark_sold(
        &mut self,
        code: &str,
        session_id: &str,
        ticket_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<bool, BookingError> {
        let state = self.seats.get_mut(code).ok_or_else(|| BookingError::InvalidSeat {
            seats: vec![code.to_string()],
        })?;

        match state.status {
            SeatStatus::Sold if state.ticket_id == Some(ticket_id) => return Ok(false),
            SeatStatus::Sold => {
                return Err(BookingError::SeatAlreadySold {
                    seat: code.to_string(),
                });
            }
            _ if !state.is_held_by(session_id, now) => {
                return Err(BookingError::SeatNotHeld {
                    seat: code.to_string(),
                });
            }
            _ => {}
        }

        state.status = SeatStatus::Sold;
        state.hold_expires_at = None;
        state.held_by_session = None;
        state.reservation_id = None;
        state.ticket_id = Some(ticket_id);
        self.dirty.insert(code.to_string());

        Ok(true)
    }

    /// Return a sold seat to the free pool after its ticket was cancelled.
    pub fn free_sold(&mut self, code: &str, ticket_id: Uuid) -> Result<(), BookingError> {
        let state = self.seats.get_mut(code).ok_or_else(|| BookingError::InvalidSeat {
            seats: vec![code.to_string()],
        })?;

        if state.status != SeatStatus::Sold || state.ticket_id != Some(ticket_id) {
            return Err(BookingError::InvalidTicketState(format!(
                "seat {} is not sold to ticket {}",
                code, ticket_id
            )));
        }

        state.clear();
        self.dirty.insert(code.to_string());
        Ok(())
    }

    pub fn is_dirty(&self) -> bool {
        !self.dirty.is_empty()
    }

    /// Drain the codes touched since the last call.
    pub fn take_dirty(&mut self) -> Vec<String> {
        std::mem::take(&mut self.dirty).into_iter().collect()
    }
}
