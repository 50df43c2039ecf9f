//! Pure booking rules: seat layouts, per-trip seat state, pricing, refunds
//! and ticket codes. Nothing in here touches the database; the `services`
//! layer loads state, applies these transitions and persists the result.

pub mod error;
pub mod inventory;
pub mod layout;
pub mod pricing;
pub mod refund;
pub mod tickets;

pub use error::BookingError;
