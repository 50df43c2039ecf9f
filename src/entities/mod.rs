pub mod bus;
pub mod bus_type;
pub mod cancellation_rule;
pub mod company;
pub mod coupon;
pub mod order;
pub mod point;
pub mod reservation;
pub mod seat;
pub mod ticket;
pub mod transaction;
pub mod trip;
pub mod trip_seat;
