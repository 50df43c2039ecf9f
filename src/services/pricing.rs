use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter};
use serde::Deserialize;
use uuid::Uuid;

use crate::domain::pricing::{self, CouponLookup, PriceRequest, PricingResult};
use crate::domain::BookingError;
use crate::entities::{coupon, trip};
use crate::error::{AppError, AppResult};
use crate::AppState;

#[derive(Debug, Clone, Deserialize)]
pub struct PriceQuery {
    pub seat_count: usize,
    pub coupon_code: Option<String>,
    #[serde(default)]
    pub best_effort: bool,
}

/// Result of looking a coupon code up: `None` when no code was given,
/// `Some(None)` when the code matched nothing.
pub type FetchedCoupon = Option<Option<coupon::Model>>;

pub async fn fetch_coupon<C: ConnectionTrait>(
    db: &C,
    code: Option<&str>,
) -> AppResult<FetchedCoupon> {
    let Some(code) = code.map(str::trim).filter(|c| !c.is_empty()) else {
        return Ok(None);
    };
    let found = coupon::Entity::find()
        .filter(coupon::Column::Code.eq(code))
        .one(db)
        .await?;
    Ok(Some(found))
}

pub fn as_lookup(fetched: &FetchedCoupon) -> CouponLookup<'_> {
    match fetched {
        None => CouponLookup::NotRequested,
        Some(None) => CouponLookup::NotFound,
        Some(Some(coupon)) => CouponLookup::Found(coupon),
    }
}

/// Count one use of a coupon. The increment only applies while
/// `used_count < max_uses`, so concurrent redemptions never push a coupon
/// past its limit whatever they read beforehand.
pub async fn redeem_coupon<C: ConnectionTrait>(db: &C, coupon_id: Uuid) -> AppResult<()> {
    let result = coupon::Entity::update_many()
        .col_expr(
            coupon::Column::UsedCount,
            Expr::col(coupon::Column::UsedCount).add(1),
        )
        .filter(coupon::Column::Id.eq(coupon_id))
        .filter(Expr::col(coupon::Column::UsedCount).lt(Expr::col(coupon::Column::MaxUses)))
        .exec(db)
        .await?;

    if result.rows_affected == 0 {
        return Err(BookingError::CouponExhausted.into());
    }
    Ok(())
}

/// Price preview for a trip. Nothing is redeemed.
pub async fn preview(
    state: &AppState,
    trip_id: Uuid,
    query: PriceQuery,
    now: DateTime<Utc>,
) -> AppResult<PricingResult> {
    if query.seat_count == 0 || query.seat_count > state.config.max_seats_per_hold {
        return Err(AppError::BadRequest(format!(
            "seat_count must be between 1 and {}",
            state.config.max_seats_per_hold
        )));
    }

    let trip = trip::Entity::find_by_id(trip_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Trip not found".to_string()))?;

    let fetched = fetch_coupon(&state.db, query.coupon_code.as_deref()).await?;

    let result = pricing::price(&PriceRequest {
        trip_price: trip.price,
        seat_count: query.seat_count,
        trip_company_id: trip.company_id,
        coupon: as_lookup(&fetched),
        best_effort: query.best_effort,
        now,
    })?;

    Ok(result)
}
