use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sea_orm::{sqlx, DbErr, RuntimeErr};
use serde_json::json;

use crate::domain::BookingError;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Booking(#[from] BookingError),

    #[error("Database error: {0}")]
    Database(DbErr),
}

/// Postgres serialization failure, deadlock and lock-not-available, plus
/// SQLite busy/locked.
const CONTENTION_CODES: &[&str] = &["40001", "40P01", "55P03", "5", "6"];

fn is_contention(err: &DbErr) -> bool {
    match err {
        DbErr::ConnectionAcquire(_) => true,
        DbErr::Exec(RuntimeErr::SqlxError(sqlx::Error::Database(db)))
        | DbErr::Query(RuntimeErr::SqlxError(sqlx::Error::Database(db))) => db
            .code()
            .is_some_and(|code| CONTENTION_CODES.contains(&code.as_ref())),
        _ => false,
    }
}

impl From<DbErr> for AppError {
    fn from(err: DbErr) -> Self {
        if is_contention(&err) {
            tracing::warn!(error = %err, "Database contention");
            return AppError::Booking(BookingError::ConcurrencyConflict);
        }
        AppError::Database(err)
    }
}

impl AppError {
    pub fn code(&self) -> &'static str {
        match self {
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::BadRequest(_) => "BAD_REQUEST",
            AppError::Unauthorized(_) => "UNAUTHORIZED",
            AppError::Forbidden(_) => "FORBIDDEN",
            AppError::Internal(_) | AppError::Database(_) => "INTERNAL_ERROR",
            AppError::Booking(err) => err.code(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Internal(_) | AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Booking(err) => booking_status(err),
        }
    }
}

fn booking_status(err: &BookingError) -> StatusCode {
    match err {
        BookingError::InvalidLayout(_) | BookingError::InvalidSeat { .. } => {
            StatusCode::BAD_REQUEST
        }
        BookingError::LayoutLocked
        | BookingError::SeatUnavailable { .. }
        | BookingError::SeatNotHeld { .. }
        | BookingError::SeatAlreadySold { .. }
        | BookingError::TripNotBookable
        | BookingError::InvalidTicketState(_) => StatusCode::CONFLICT,
        BookingError::ReservationExpired => StatusCode::GONE,
        BookingError::CouponNotFound
        | BookingError::CouponExpired
        | BookingError::CouponExhausted
        | BookingError::CouponNotApplicable
        | BookingError::NoCancellationPolicy => StatusCode::UNPROCESSABLE_ENTITY,
        BookingError::ConcurrencyConflict => StatusCode::SERVICE_UNAVAILABLE,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                "Internal server error".to_string()
            }
            AppError::Database(err) => {
                tracing::error!("Database error: {:?}", err);
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        let mut body = json!({
            "error": self.code(),
            "message": message,
            "retryable": matches!(&self, AppError::Booking(err) if err.is_retryable()),
        });
        if let AppError::Booking(err) = &self {
            if let Some(seats) = err.seats() {
                body["seats"] = json!(seats);
            }
        }

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_booking_status_mapping() {
        let status = |err: BookingError| AppError::from(err).status();
        assert_eq!(status(BookingError::ReservationExpired), StatusCode::GONE);
        assert_eq!(status(BookingError::CouponExhausted), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            status(BookingError::SeatUnavailable { seats: vec!["A1".into()] }),
            StatusCode::CONFLICT
        );
        assert_eq!(status(BookingError::ConcurrencyConflict), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn test_connection_acquire_is_contention() {
        let err = AppError::from(DbErr::ConnectionAcquire(sea_orm::ConnAcquireErr::Timeout));
        assert!(matches!(err, AppError::Booking(BookingError::ConcurrencyConflict)));

        let err = AppError::from(DbErr::RecordNotFound("trip".into()));
        assert!(matches!(err, AppError::Database(_)));
    }
}
