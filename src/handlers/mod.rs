pub mod admin;
pub mod reservations;
pub mod tickets;
pub mod trips;
