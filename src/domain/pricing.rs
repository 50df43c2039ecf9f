use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::domain::BookingError;
use crate::entities::coupon::{self, CouponStatus, DiscountType};

/// Outcome of a coupon lookup, resolved by the caller before pricing.
#[derive(Debug, Clone, Copy)]
pub enum CouponLookup<'a> {
    NotRequested,
    NotFound,
    Found(&'a coupon::Model),
}

#[derive(Debug, Clone, Copy)]
pub struct PriceRequest<'a> {
    pub trip_price: i64,
    pub seat_count: usize,
    pub trip_company_id: Uuid,
    pub coupon: CouponLookup<'a>,
    /// Fall back to no discount instead of failing on a bad coupon
    pub best_effort: bool,
    pub now: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PricingResult {
    pub origin_amount: i64,
    pub discount: i64,
    pub final_amount: i64,
    pub coupon_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coupon_error: Option<String>,
}

/// Price `seat_count` seats of a trip, applying the coupon if one was given.
pub fn price(req: &PriceRequest<'_>) -> Result<PricingResult, BookingError> {
    let seat_count = i64::try_from(req.seat_count).unwrap_or(i64::MAX);
    let origin_amount = req.trip_price.max(0).saturating_mul(seat_count);

    let applied = match req.coupon {
        CouponLookup::NotRequested => Ok(None),
        CouponLookup::NotFound => Err(BookingError::CouponNotFound),
        CouponLookup::Found(coupon) => {
            validate_coupon(coupon, req.trip_company_id, req.now).map(|()| Some(coupon))
        }
    };

    let (coupon, coupon_error) = match applied {
        Ok(coupon) => (coupon, None),
        Err(err) if req.best_effort => (None, Some(err.code().to_string())),
        Err(err) => return Err(err),
    };

    let discount = coupon.map_or(0, |c| discount_for(c, origin_amount));

    Ok(PricingResult {
        origin_amount,
        discount,
        final_amount: (origin_amount - discount).max(0),
        coupon_id: coupon.map(|c| c.id),
        coupon_error,
    })
}

/// Check a coupon against the trip's company and the current time.
pub fn validate_coupon(
    coupon: &coupon::Model,
    trip_company_id: Uuid,
    now: DateTime<Utc>,
) -> Result<(), BookingError> {
    match coupon.status {
        CouponStatus::Disabled => return Err(BookingError::CouponNotFound),
        CouponStatus::Expired => return Err(BookingError::CouponExpired),
        CouponStatus::Active => {}
    }

    if now < coupon.valid_from.with_timezone(&Utc) || now > coupon.valid_to.with_timezone(&Utc) {
        return Err(BookingError::CouponExpired);
    }

    if coupon.used_count >= coupon.max_uses {
        return Err(BookingError::CouponExhausted);
    }

    if coupon.company_id.is_some_and(|id| id != trip_company_id) {
        return Err(BookingError::CouponNotApplicable);
    }

    Ok(())
}

/// Discount granted by `coupon` on `origin_amount`, clamped to
/// `[0, origin_amount]`. The cap only bounds percent coupons.
pub fn discount_for(coupon: &coupon::Model, origin_amount: i64) -> i64 {
    let raw = match coupon.discount_type {
        DiscountType::Percent => {
            let pct = i128::from(origin_amount) * i128::from(coupon.discount_value) / 100;
            let pct = i64::try_from(pct).unwrap_or(i64::MAX);
            coupon
                .max_discount_value
                .map_or(pct, |cap| pct.min(cap))
        }
        DiscountType::Fixed => coupon.discount_value.min(origin_amount),
    };
    raw.clamp(0, origin_amount.max(0))
}
