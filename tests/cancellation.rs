mod common;

use chrono::Duration;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};

use common::{commit_request, fixture_departing_in, hold_request, insert_rules, Fixture, TRIP_PRICE};
use seat_booking::domain::BookingError;
use seat_booking::entities::order::{self, OrderStatus};
use seat_booking::entities::ticket::{self, TicketStatus};
use seat_booking::entities::transaction::{self, TransactionKind};
use seat_booking::entities::trip_seat::SeatStatus;
use seat_booking::services::issuance::OrderDetails;
use seat_booking::services::{cancellation, inventory, issuance, reservation as holds};
use seat_booking::AppError;

const BANDS: &[(i32, i32, i64)] = &[(72, 100, 5_000), (24, 50, 5_000), (0, 0, 0)];

fn booking_err(err: AppError) -> BookingError {
    match err {
        AppError::Booking(err) => err,
        other => panic!("expected a booking error, got {other:?}"),
    }
}

async fn buy(fx: &Fixture, seats: &[&str]) -> OrderDetails {
    let held = holds::hold(&fx.state, fx.trip_id, hold_request(seats, "buyer"), fx.now)
        .await
        .unwrap();
    issuance::commit(&fx.state, held.id, commit_request("PAY-1", None), fx.now)
        .await
        .unwrap()
}

async fn refunds_for(fx: &Fixture, order_id: uuid::Uuid) -> Vec<transaction::Model> {
    transaction::Entity::find()
        .filter(transaction::Column::OrderId.eq(order_id))
        .filter(transaction::Column::Kind.eq(TransactionKind::Refund))
        .all(&fx.state.db)
        .await
        .unwrap()
}

#[tokio::test]
async fn test_cancel_refunds_by_band_and_frees_seat() {
    let fx = fixture_departing_in(Duration::hours(30)).await;
    insert_rules(&fx.state, fx.company_id, BANDS).await;
    let details = buy(&fx, &["A1"]).await;
    let ticket_id = details.tickets[0].id;

    let quote = cancellation::quote_refund(&fx.state, ticket_id, fx.now).await.unwrap();
    assert_eq!(quote.refund_percentage, 50);
    assert_eq!(quote.refund_amount, TRIP_PRICE / 2 - 5_000);
    assert!((quote.hours_until_departure - 30.0).abs() < 1e-9);

    let result = cancellation::cancel_ticket(&fx.state, ticket_id, fx.now).await.unwrap();
    assert_eq!(result.refund_amount, 45_000);
    assert_eq!(result.refund_percentage, 50);
    assert_eq!(result.fee_amount, 5_000);

    let stored = ticket::Entity::find_by_id(ticket_id).one(&fx.state.db).await.unwrap().unwrap();
    assert_eq!(stored.status, TicketStatus::Cancelled);
    assert_eq!(stored.refund_amount, Some(45_000));
    assert!(stored.cancelled_at.is_some());

    let order = order::Entity::find_by_id(details.order_id).one(&fx.state.db).await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatus::Refunded);

    let refunds = refunds_for(&fx, details.order_id).await;
    assert_eq!(refunds.len(), 1);
    assert_eq!(refunds[0].amount, 45_000);

    let map = inventory::seat_map(&fx.state, fx.trip_id, fx.now).await.unwrap();
    assert_eq!(map.seats["A1"].status, SeatStatus::Free);
    assert_eq!(map.seats["A1"].ticket_id, None);

    // The seat is back on sale
    holds::hold(&fx.state, fx.trip_id, hold_request(&["A1"], "next"), fx.now)
        .await
        .unwrap();

    let err = cancellation::cancel_ticket(&fx.state, ticket_id, fx.now).await.unwrap_err();
    assert!(matches!(booking_err(err), BookingError::InvalidTicketState(_)));
}

#[tokio::test]
async fn test_partial_cancel_keeps_order_paid() {
    let fx = fixture_departing_in(Duration::hours(100)).await;
    insert_rules(&fx.state, fx.company_id, BANDS).await;
    let details = buy(&fx, &["A1", "A2"]).await;

    let result = cancellation::cancel_ticket(&fx.state, details.tickets[0].id, fx.now)
        .await
        .unwrap();
    assert_eq!(result.refund_percentage, 100);
    assert_eq!(result.refund_amount, TRIP_PRICE - 5_000);

    let order = order::Entity::find_by_id(details.order_id).one(&fx.state.db).await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatus::Paid);

    cancellation::cancel_ticket(&fx.state, details.tickets[1].id, fx.now)
        .await
        .unwrap();
    let order = order::Entity::find_by_id(details.order_id).one(&fx.state.db).await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatus::Refunded);
}

#[tokio::test]
async fn test_no_policy_leaves_ticket_untouched() {
    let fx = fixture_departing_in(Duration::hours(30)).await;
    let details = buy(&fx, &["B2"]).await;
    let ticket_id = details.tickets[0].id;

    let err = cancellation::cancel_ticket(&fx.state, ticket_id, fx.now).await.unwrap_err();
    assert_eq!(booking_err(err), BookingError::NoCancellationPolicy);

    insert_rules(&fx.state, fx.company_id, BANDS).await;
    let after_departure = fx.now + Duration::hours(31);
    let err = cancellation::cancel_ticket(&fx.state, ticket_id, after_departure)
        .await
        .unwrap_err();
    assert_eq!(booking_err(err), BookingError::NoCancellationPolicy);

    let stored = ticket::Entity::find_by_id(ticket_id).one(&fx.state.db).await.unwrap().unwrap();
    assert_eq!(stored.status, TicketStatus::Confirmed);
    let map = inventory::seat_map(&fx.state, fx.trip_id, fx.now).await.unwrap();
    assert_eq!(map.seats["B2"].status, SeatStatus::Sold);
}

#[tokio::test]
async fn test_zero_refund_records_no_transaction() {
    let fx = fixture_departing_in(Duration::hours(30)).await;
    insert_rules(&fx.state, fx.company_id, BANDS).await;
    let details = buy(&fx, &["C1"]).await;

    // Ten hours out falls into the 0% band
    let result = cancellation::cancel_ticket(&fx.state, details.tickets[0].id, fx.now + Duration::hours(20))
        .await
        .unwrap();
    assert_eq!(result.refund_amount, 0);
    assert!(refunds_for(&fx, details.order_id).await.is_empty());
}

#[tokio::test]
async fn test_check_in_with_signed_qr() {
    let fx = fixture_departing_in(Duration::hours(30)).await;
    insert_rules(&fx.state, fx.company_id, BANDS).await;
    let details = buy(&fx, &["A2"]).await;
    let issued = &details.tickets[0];

    let err = issuance::check_in(&fx.state, &issued.qr_payload.replace("seat=A2", "seat=A1"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    let boarded = issuance::check_in(&fx.state, &issued.qr_payload).await.unwrap();
    assert_eq!(boarded.status, TicketStatus::CheckedIn);

    let err = issuance::check_in(&fx.state, &issued.qr_payload).await.unwrap_err();
    assert!(matches!(booking_err(err), BookingError::InvalidTicketState(_)));

    let err = cancellation::cancel_ticket(&fx.state, issued.id, fx.now).await.unwrap_err();
    assert!(matches!(booking_err(err), BookingError::InvalidTicketState(_)));
}

#[tokio::test]
async fn test_boarding_after_quote_blocks_cancel() {
    let fx = fixture_departing_in(Duration::hours(30)).await;
    insert_rules(&fx.state, fx.company_id, BANDS).await;
    let details = buy(&fx, &["B1"]).await;
    let issued = &details.tickets[0];

    let quote = cancellation::quote_refund(&fx.state, issued.id, fx.now).await.unwrap();
    assert_eq!(quote.refund_amount, 45_000);

    issuance::check_in(&fx.state, &issued.qr_payload).await.unwrap();

    let err = cancellation::cancel_ticket(&fx.state, issued.id, fx.now).await.unwrap_err();
    assert!(matches!(booking_err(err), BookingError::InvalidTicketState(_)));

    let stored = ticket::Entity::find_by_id(issued.id).one(&fx.state.db).await.unwrap().unwrap();
    assert_eq!(stored.status, TicketStatus::CheckedIn);
    assert_eq!(stored.refund_amount, None);
    assert!(refunds_for(&fx, details.order_id).await.is_empty());

    let order = order::Entity::find_by_id(details.order_id).one(&fx.state.db).await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatus::Paid);
    let map = inventory::seat_map(&fx.state, fx.trip_id, fx.now).await.unwrap();
    assert_eq!(map.seats["B1"].status, SeatStatus::Sold);
}
