#![allow(dead_code)]

use chrono::{DateTime, Duration, Utc};
use sea_orm::{ActiveModelTrait, ConnectOptions, Database, Set};
use sea_orm_migration::MigratorTrait;
use uuid::Uuid;

use seat_booking::entities::coupon::{self, CouponStatus, DiscountType};
use seat_booking::entities::{bus, bus_type, cancellation_rule, company};
use seat_booking::services::issuance::CommitRequest;
use seat_booking::services::layout::{self, NewTrip};
use seat_booking::services::reservation::HoldRequest;
use seat_booking::{AppState, Config};

pub const JWT_SECRET: &str = "test-jwt-secret";
pub const TICKET_SECRET: &str = "test-ticket-secret";
pub const TRIP_PRICE: i64 = 100_000;

pub struct Fixture {
    pub state: AppState,
    pub company_id: Uuid,
    pub bus_type_id: Uuid,
    pub bus_id: Uuid,
    pub trip_id: Uuid,
    pub now: DateTime<Utc>,
}

/// Whole-second "now" so timestamps survive the database round trip intact.
pub fn now() -> DateTime<Utc> {
    DateTime::from_timestamp(Utc::now().timestamp(), 0).unwrap()
}

pub async fn state() -> AppState {
    let mut options = ConnectOptions::new("sqlite::memory:");
    options.max_connections(1).sqlx_logging(false);
    let db = Database::connect(options).await.expect("connect in-memory sqlite");
    migration::Migrator::up(&db, None).await.expect("run migrations");

    AppState::new(db, Config::with_secrets("sqlite::memory:", JWT_SECRET, TICKET_SECRET))
}

/// Company with a 3x2 single-floor bus (seats A1..C2) and one trip
/// departing in 48 hours.
pub async fn fixture() -> Fixture {
    fixture_departing_in(Duration::hours(48)).await
}

pub async fn fixture_departing_in(departs_in: Duration) -> Fixture {
    let state = state().await;
    let now = now();

    let company = company::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set("Phuong Trang".to_string()),
        created_at: Set(now.into()),
    }
    .insert(&state.db)
    .await
    .unwrap();

    let bus_type = bus_type::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set("Limousine 6".to_string()),
        total_seats: Set(6),
        rows: Set(3),
        cols: Set(2),
        has_second_floor: Set(false),
        floor_rows: Set(0),
        floor_cols: Set(0),
    }
    .insert(&state.db)
    .await
    .unwrap();
    layout::generate_bus_type_layout(&state, bus_type.id).await.unwrap();

    let bus = bus::ActiveModel {
        id: Set(Uuid::new_v4()),
        company_id: Set(company.id),
        bus_type_id: Set(bus_type.id),
        plate_number: Set(format!("51B-{}", &Uuid::new_v4().simple().to_string()[..6])),
    }
    .insert(&state.db)
    .await
    .unwrap();

    let trip = layout::create_trip(
        &state,
        NewTrip {
            bus_id: bus.id,
            bus_route_id: Uuid::new_v4(),
            departure_time: now + departs_in,
            arrival_time: now + departs_in + Duration::hours(6),
            price: TRIP_PRICE,
        },
        now,
    )
    .await
    .unwrap();

    Fixture {
        state,
        company_id: company.id,
        bus_type_id: bus_type.id,
        bus_id: bus.id,
        trip_id: trip.id,
        now,
    }
}

pub fn codes(list: &[&str]) -> Vec<String> {
    list.iter().map(|c| c.to_string()).collect()
}

pub fn hold_request(seats: &[&str], session_id: &str) -> HoldRequest {
    HoldRequest {
        seat_codes: codes(seats),
        session_id: session_id.to_string(),
        ttl_seconds: None,
    }
}

pub fn commit_request(payment_ref: &str, coupon_code: Option<&str>) -> CommitRequest {
    CommitRequest {
        user_id: Uuid::new_v4(),
        coupon_code: coupon_code.map(str::to_string),
        payment_ref: payment_ref.to_string(),
        payment_method: Some("card".to_string()),
        pickup_point_id: None,
        dropoff_point_id: None,
    }
}

pub async fn insert_coupon(
    state: &AppState,
    code: &str,
    discount_type: DiscountType,
    value: i64,
    max_uses: i32,
    now: DateTime<Utc>,
) -> coupon::Model {
    coupon::ActiveModel {
        id: Set(Uuid::new_v4()),
        code: Set(code.to_string()),
        discount_type: Set(discount_type),
        discount_value: Set(value),
        max_discount_value: Set(None),
        max_uses: Set(max_uses),
        used_count: Set(0),
        valid_from: Set((now - Duration::days(1)).into()),
        valid_to: Set((now + Duration::days(30)).into()),
        status: Set(CouponStatus::Active),
        company_id: Set(None),
    }
    .insert(&state.db)
    .await
    .unwrap()
}

/// Insert `(hours_before_departure, refund_percentage, fee)` bands.
pub async fn insert_rules(state: &AppState, company_id: Uuid, bands: &[(i32, i32, i64)]) {
    for &(hours, pct, fee) in bands {
        cancellation_rule::ActiveModel {
            id: Set(Uuid::new_v4()),
            company_id: Set(company_id),
            time_before_departure_hours: Set(hours),
            refund_percentage: Set(pct),
            fee_amount: Set(fee),
        }
        .insert(&state.db)
        .await
        .unwrap();
    }
}
