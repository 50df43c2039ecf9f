mod common;

use chrono::Duration;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, IntoActiveModel, PaginatorTrait, QueryFilter, Set};
use uuid::Uuid;

use common::{commit_request, fixture, hold_request, insert_coupon, TICKET_SECRET, TRIP_PRICE};
use seat_booking::domain::tickets::verify_qr_payload;
use seat_booking::domain::BookingError;
use seat_booking::entities::coupon::{self, DiscountType};
use seat_booking::entities::order::OrderStatus;
use seat_booking::entities::reservation::{self, ReservationStatus};
use seat_booking::entities::ticket::{self, TicketStatus};
use seat_booking::entities::transaction::{self, TransactionKind};
use seat_booking::entities::trip::{self, TripStatus};
use seat_booking::entities::trip_seat::SeatStatus;
use seat_booking::services::{inventory, issuance, pricing, reservation as holds};
use seat_booking::AppError;

fn booking_err(err: AppError) -> BookingError {
    match err {
        AppError::Booking(err) => err,
        other => panic!("expected a booking error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_commit_issues_tickets_and_sells_seats() {
    let fx = fixture().await;
    let held = holds::hold(&fx.state, fx.trip_id, hold_request(&["B1", "A1"], "s1"), fx.now)
        .await
        .unwrap();

    let details = issuance::commit(&fx.state, held.id, commit_request("PAY-1", None), fx.now)
        .await
        .unwrap();

    assert_eq!(details.order.status, OrderStatus::Paid);
    assert_eq!(details.order.origin_amount, 2 * TRIP_PRICE);
    assert_eq!(details.order.final_amount, 2 * TRIP_PRICE);
    assert_eq!(details.tickets.len(), 2);
    assert_eq!(details.tickets.iter().map(|t| t.price).sum::<i64>(), 2 * TRIP_PRICE);

    for t in &details.tickets {
        assert_eq!(t.status, TicketStatus::Confirmed);
        assert!(t.ticket_code.starts_with("TK-"));
        let qr = verify_qr_payload(TICKET_SECRET, &t.qr_payload).unwrap();
        assert_eq!(qr.ticket_code, t.ticket_code);
        assert_eq!(qr.trip_id, fx.trip_id);
        assert_eq!(qr.seat_code, t.seat_code);
    }

    let map = inventory::seat_map(&fx.state, fx.trip_id, fx.now).await.unwrap();
    assert_eq!(map.seats["A1"].status, SeatStatus::Sold);
    assert_eq!(map.seats["B1"].status, SeatStatus::Sold);
    assert_eq!(map.seats["A1"].hold_expires_at, None);

    let stored = reservation::Entity::find_by_id(held.id)
        .one(&fx.state.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.status, ReservationStatus::Committed);

    let payments = transaction::Entity::find()
        .filter(transaction::Column::OrderId.eq(details.order_id))
        .filter(transaction::Column::Kind.eq(TransactionKind::Payment))
        .count(&fx.state.db)
        .await
        .unwrap();
    assert_eq!(payments, 1);

    // Sold seats never come back through expiry
    let map = inventory::seat_map(&fx.state, fx.trip_id, fx.now + Duration::days(1))
        .await
        .unwrap();
    assert_eq!(map.seats["A1"].status, SeatStatus::Sold);
}

#[tokio::test]
async fn test_commit_after_expiry_fails_and_frees_seats() {
    let fx = fixture().await;
    let held = holds::hold(&fx.state, fx.trip_id, hold_request(&["A1"], "s1"), fx.now)
        .await
        .unwrap();

    let late = fx.now + Duration::seconds(301);
    let err = issuance::commit(&fx.state, held.id, commit_request("PAY-1", None), late)
        .await
        .unwrap_err();
    assert_eq!(booking_err(err), BookingError::ReservationExpired);

    let orders = seat_booking::entities::order::Entity::find()
        .count(&fx.state.db)
        .await
        .unwrap();
    assert_eq!(orders, 0);

    let map = inventory::seat_map(&fx.state, fx.trip_id, late).await.unwrap();
    assert_eq!(map.seats["A1"].status, SeatStatus::Free);
}

#[tokio::test]
async fn test_commit_is_idempotent_per_payment_ref() {
    let fx = fixture().await;
    let held = holds::hold(&fx.state, fx.trip_id, hold_request(&["C2"], "s1"), fx.now)
        .await
        .unwrap();

    let first = issuance::commit(&fx.state, held.id, commit_request("PAY-7", None), fx.now)
        .await
        .unwrap();
    let replay = issuance::commit(&fx.state, held.id, commit_request("PAY-7", None), fx.now)
        .await
        .unwrap();
    assert_eq!(first.order_id, replay.order_id);
    assert_eq!(first.tickets[0].id, replay.tickets[0].id);

    let err = issuance::commit(&fx.state, held.id, commit_request("PAY-8", None), fx.now)
        .await
        .unwrap_err();
    assert_eq!(booking_err(err), BookingError::ReservationExpired);

    let tickets = ticket::Entity::find().count(&fx.state.db).await.unwrap();
    assert_eq!(tickets, 1);
}

#[tokio::test]
async fn test_mark_sold_idempotent_for_same_ticket() {
    let fx = fixture().await;
    holds::hold(&fx.state, fx.trip_id, hold_request(&["A1"], "s1"), fx.now)
        .await
        .unwrap();

    let ticket = Uuid::new_v4();
    assert!(inventory::mark_sold(&fx.state, fx.trip_id, "A1", "s1", ticket, fx.now).await.unwrap());
    assert!(!inventory::mark_sold(&fx.state, fx.trip_id, "A1", "s1", ticket, fx.now).await.unwrap());

    let err = inventory::mark_sold(&fx.state, fx.trip_id, "A1", "s1", Uuid::new_v4(), fx.now)
        .await
        .unwrap_err();
    assert_eq!(booking_err(err), BookingError::SeatAlreadySold { seat: "A1".to_string() });

    let err = inventory::mark_sold(&fx.state, fx.trip_id, "A2", "s1", Uuid::new_v4(), fx.now)
        .await
        .unwrap_err();
    assert_eq!(booking_err(err), BookingError::SeatNotHeld { seat: "A2".to_string() });
}

#[tokio::test]
async fn test_coupon_applied_and_counted() {
    let fx = fixture().await;
    let c = insert_coupon(&fx.state, "SAVE20K", DiscountType::Fixed, 20_000, 5, fx.now).await;
    let held = holds::hold(&fx.state, fx.trip_id, hold_request(&["A1", "A2", "B1"], "s1"), fx.now)
        .await
        .unwrap();

    let details = issuance::commit(&fx.state, held.id, commit_request("PAY-1", Some("SAVE20K")), fx.now)
        .await
        .unwrap();
    assert_eq!(details.order.discount_amount, 20_000);
    assert_eq!(details.order.final_amount, 280_000);
    assert_eq!(details.order.coupon_id, Some(c.id));

    // 280000 / 3 leaves a remainder of 1 on the first ticket
    let prices: Vec<i64> = details.tickets.iter().map(|t| t.price).collect();
    assert_eq!(prices, vec![93_334, 93_333, 93_333]);

    let stored = coupon::Entity::find_by_id(c.id).one(&fx.state.db).await.unwrap().unwrap();
    assert_eq!(stored.used_count, 1);
}

#[tokio::test]
async fn test_coupon_never_over_redeemed() {
    let fx = fixture().await;
    let c = insert_coupon(&fx.state, "ONCE", DiscountType::Percent, 10, 1, fx.now).await;

    let first = holds::hold(&fx.state, fx.trip_id, hold_request(&["A1"], "s1"), fx.now)
        .await
        .unwrap();
    let second = holds::hold(&fx.state, fx.trip_id, hold_request(&["B1"], "s2"), fx.now)
        .await
        .unwrap();

    let (a, b) = tokio::join!(
        issuance::commit(&fx.state, first.id, commit_request("PAY-A", Some("ONCE")), fx.now),
        issuance::commit(&fx.state, second.id, commit_request("PAY-B", Some("ONCE")), fx.now),
    );

    let failures: Vec<BookingError> = [a, b]
        .into_iter()
        .filter_map(Result::err)
        .map(booking_err)
        .collect();
    assert_eq!(failures, vec![BookingError::CouponExhausted]);

    let stored = coupon::Entity::find_by_id(c.id).one(&fx.state.db).await.unwrap().unwrap();
    assert_eq!(stored.used_count, 1);

    // The losing reservation is still active and can pay without the coupon
    let loser = reservation::Entity::find()
        .filter(reservation::Column::Status.eq(ReservationStatus::Active))
        .one(&fx.state.db)
        .await
        .unwrap()
        .unwrap();
    issuance::commit(&fx.state, loser.id, commit_request("PAY-C", None), fx.now)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_failed_commit_leaves_hold_active() {
    let fx = fixture().await;
    let held = holds::hold(&fx.state, fx.trip_id, hold_request(&["A1"], "s1"), fx.now)
        .await
        .unwrap();

    let err = issuance::commit(&fx.state, held.id, commit_request("PAY-1", Some("NOPE")), fx.now)
        .await
        .unwrap_err();
    assert_eq!(booking_err(err), BookingError::CouponNotFound);

    let map = inventory::seat_map(&fx.state, fx.trip_id, fx.now).await.unwrap();
    assert_eq!(map.seats["A1"].status, SeatStatus::Held);
    assert_eq!(map.seats["A1"].reservation_id, Some(held.id));

    issuance::commit(&fx.state, held.id, commit_request("PAY-1", None), fx.now)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_no_seat_sold_twice() {
    let fx = fixture().await;
    let held = holds::hold(&fx.state, fx.trip_id, hold_request(&["A1"], "s1"), fx.now)
        .await
        .unwrap();
    issuance::commit(&fx.state, held.id, commit_request("PAY-1", None), fx.now)
        .await
        .unwrap();

    let err = holds::hold(&fx.state, fx.trip_id, hold_request(&["A1"], "s2"), fx.now)
        .await
        .unwrap_err();
    assert_eq!(
        booking_err(err),
        BookingError::SeatUnavailable { seats: vec!["A1".to_string()] }
    );

    let sold = ticket::Entity::find()
        .filter(ticket::Column::SeatCode.eq("A1"))
        .filter(ticket::Column::Status.ne(TicketStatus::Cancelled))
        .count(&fx.state.db)
        .await
        .unwrap();
    assert_eq!(sold, 1);
}

#[tokio::test]
async fn test_lookups_by_id_and_code() {
    let fx = fixture().await;
    let held = holds::hold(&fx.state, fx.trip_id, hold_request(&["A1"], "s1"), fx.now)
        .await
        .unwrap();
    let details = issuance::commit(&fx.state, held.id, commit_request("PAY-1", None), fx.now)
        .await
        .unwrap();
    let issued = &details.tickets[0];

    let order = issuance::get_order(&fx.state, details.order_id).await.unwrap();
    assert_eq!(order.tickets.len(), 1);

    let by_id = issuance::get_ticket(&fx.state, &issued.id.to_string()).await.unwrap();
    let by_code = issuance::get_ticket(&fx.state, &issued.ticket_code).await.unwrap();
    assert_eq!(by_id.id, by_code.id);

    let err = issuance::get_ticket(&fx.state, "TK-MISSING").await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn test_redeem_stops_at_max_uses() {
    let fx = fixture().await;
    let c = insert_coupon(&fx.state, "THREE", DiscountType::Fixed, 5_000, 3, fx.now).await;

    let attempts = redeem_concurrently(&fx, c.id, 5).await;
    let exhausted = attempts
        .into_iter()
        .filter_map(Result::err)
        .map(booking_err)
        .collect::<Vec<_>>();
    assert_eq!(exhausted, vec![BookingError::CouponExhausted; 2]);

    let stored = coupon::Entity::find_by_id(c.id).one(&fx.state.db).await.unwrap().unwrap();
    assert_eq!(stored.used_count, 3);

    // Later redemptions keep failing
    let err = pricing::redeem_coupon(&fx.state.db, c.id).await.unwrap_err();
    assert_eq!(booking_err(err), BookingError::CouponExhausted);
}

async fn redeem_concurrently(
    fx: &common::Fixture,
    coupon_id: Uuid,
    n: usize,
) -> Vec<Result<(), AppError>> {
    let mut set = tokio::task::JoinSet::new();
    for _ in 0..n {
        let db = fx.state.db.clone();
        set.spawn(async move { pricing::redeem_coupon(&db, coupon_id).await });
    }
    let mut results = Vec::with_capacity(n);
    while let Some(joined) = set.join_next().await {
        results.push(joined.unwrap());
    }
    results
}

#[tokio::test]
async fn test_commit_refused_once_trip_cancelled() {
    let fx = fixture().await;
    let held = holds::hold(&fx.state, fx.trip_id, hold_request(&["A1"], "s1"), fx.now)
        .await
        .unwrap();

    let stored = trip::Entity::find_by_id(fx.trip_id).one(&fx.state.db).await.unwrap().unwrap();
    let mut cancelled = stored.into_active_model();
    cancelled.status = Set(TripStatus::Cancelled);
    cancelled.update(&fx.state.db).await.unwrap();

    let err = issuance::commit(&fx.state, held.id, commit_request("PAY-1", None), fx.now)
        .await
        .unwrap_err();
    assert_eq!(booking_err(err), BookingError::TripNotBookable);

    let tickets = ticket::Entity::find().count(&fx.state.db).await.unwrap();
    assert_eq!(tickets, 0);
    let map = inventory::seat_map(&fx.state, fx.trip_id, fx.now).await.unwrap();
    assert_eq!(map.seats["A1"].status, SeatStatus::Held);
}
