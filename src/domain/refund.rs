use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::BookingError;
use crate::entities::cancellation_rule;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RefundQuote {
    pub refund_percentage: i32,
    pub fee_amount: i64,
    pub refund_amount: i64,
    pub hours_until_departure: f64,
}

/// Pick the band the cancellation time falls into: the rule with the
/// greatest threshold that is still `<= hours_until_departure`.
///
/// A threshold equal to the remaining time belongs to that band, so
/// cancelling exactly 24h out matches a `24` rule rather than a `0` rule.
pub fn select_rule(
    rules: &[cancellation_rule::Model],
    hours_until_departure: f64,
) -> Option<&cancellation_rule::Model> {
    rules
        .iter()
        .filter(|rule| f64::from(rule.time_before_departure_hours) <= hours_until_departure)
        .max_by_key(|rule| rule.time_before_departure_hours)
}

/// Refund owed for a ticket of `ticket_price` cancelled at `now`.
pub fn compute_refund(
    ticket_price: i64,
    departure_time: DateTime<Utc>,
    now: DateTime<Utc>,
    rules: &[cancellation_rule::Model],
) -> Result<RefundQuote, BookingError> {
    let remaining = departure_time - now;
    let hours_until_departure = remaining.num_seconds() as f64 / 3600.0;
    if hours_until_departure < 0.0 {
        return Err(BookingError::NoCancellationPolicy);
    }

    let rule = select_rule(rules, hours_until_departure).ok_or(BookingError::NoCancellationPolicy)?;

    let refund_percentage = rule.refund_percentage.clamp(0, 100);
    let gross = i128::from(ticket_price.max(0)) * i128::from(refund_percentage) / 100;
    let refund_amount = (i64::try_from(gross).unwrap_or(i64::MAX) - rule.fee_amount.max(0)).max(0);

    Ok(RefundQuote {
        refund_percentage,
        fee_amount: rule.fee_amount,
        refund_amount,
        hours_until_departure,
    })
}
