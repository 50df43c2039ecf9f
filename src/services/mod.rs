//! Database-backed booking operations. Each seat-changing operation takes
//! the trip's lock, opens a transaction, loads the trip with
//! [`inventory::LockedTrip`], applies domain transitions and commits.
//!
//! Every operation takes `now` explicitly so callers control the clock.

pub mod cancellation;
pub mod inventory;
pub mod issuance;
pub mod layout;
pub mod locks;
pub mod pricing;
pub mod reservation;
