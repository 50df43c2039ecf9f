/// Failures of the booking core. Every variant maps to a stable error code
/// that clients can branch on.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BookingError {
    #[error("Invalid layout: {0}")]
    InvalidLayout(String),

    #[error("Bus type layout is locked because trips already use it")]
    LayoutLocked,

    #[error("Unknown seats: {}", .seats.join(", "))]
    InvalidSeat { seats: Vec<String> },

    #[error("Seats unavailable: {}", .seats.join(", "))]
    SeatUnavailable { seats: Vec<String> },

    #[error("Seat {seat} is not held by this session")]
    SeatNotHeld { seat: String },

    #[error("Seat {seat} is already sold")]
    SeatAlreadySold { seat: String },

    #[error("Reservation is no longer active")]
    ReservationExpired,

    #[error("Coupon not found")]
    CouponNotFound,

    #[error("Coupon is not valid at this time")]
    CouponExpired,

    #[error("Coupon usage limit reached")]
    CouponExhausted,

    #[error("Coupon does not apply to this trip")]
    CouponNotApplicable,

    #[error("No cancellation policy applies to this ticket")]
    NoCancellationPolicy,

    #[error("Trip is not open for booking")]
    TripNotBookable,

    #[error("Invalid ticket state: {0}")]
    InvalidTicketState(String),

    #[error("Seat inventory is busy, retry the request")]
    ConcurrencyConflict,
}

impl BookingError {
    pub fn code(&self) -> &'static str {
        match self {
            BookingError::InvalidLayout(_) => "INVALID_LAYOUT",
            BookingError::LayoutLocked => "LAYOUT_LOCKED",
            BookingError::InvalidSeat { .. } => "INVALID_SEAT",
            BookingError::SeatUnavailable { .. } => "SEAT_UNAVAILABLE",
            BookingError::SeatNotHeld { .. } => "SEAT_NOT_HELD",
            BookingError::SeatAlreadySold { .. } => "SEAT_ALREADY_SOLD",
            BookingError::ReservationExpired => "RESERVATION_EXPIRED",
            BookingError::CouponNotFound => "COUPON_NOT_FOUND",
            BookingError::CouponExpired => "COUPON_EXPIRED",
            BookingError::CouponExhausted => "COUPON_EXHAUSTED",
            BookingError::CouponNotApplicable => "COUPON_NOT_APPLICABLE",
            BookingError::NoCancellationPolicy => "NO_CANCELLATION_POLICY",
            BookingError::TripNotBookable => "TRIP_NOT_BOOKABLE",
            BookingError::InvalidTicketState(_) => "INVALID_TICKET_STATE",
            BookingError::ConcurrencyConflict => "CONCURRENCY_CONFLICT",
        }
    }

    /// Only lock contention is worth retrying verbatim; everything else
    /// needs a different request.
    pub fn is_retryable(&self) -> bool {
        matches!(self, BookingError::ConcurrencyConflict)
    }

    pub fn seats(&self) -> Option<&[String]> {
        match self {
            BookingError::InvalidSeat { seats } | BookingError::SeatUnavailable { seats } => {
                Some(seats)
            }
            _ => None,
        }
    }
}
