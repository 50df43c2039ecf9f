use sea_orm_migration::{prelude::*, schema::*};

use super::m20250301_000001_create_companies::Point;
use super::m20250301_000004_create_trips::Trip;
use super::m20250301_000005_create_coupons::Coupon;
use super::m20250301_000006_create_reservations::Reservation;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Order::Table)
                    .if_not_exists()
                    .col(uuid(Order::Id).primary_key())
                    .col(uuid(Order::UserId).not_null())
                    .col(uuid(Order::ReservationId).not_null().unique_key())
                    .col(uuid(Order::TripId).not_null())
                    .col(uuid_null(Order::CouponId))
                    .col(big_integer(Order::OriginAmount).not_null())
                    .col(big_integer(Order::DiscountAmount).not_null())
                    .col(big_integer(Order::FinalAmount).not_null())
                    .col(string_len(Order::Status, 16).not_null().default("pending"))
                    .col(
                        timestamp_with_time_zone(Order::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_order_reservation")
                            .from(Order::Table, Order::ReservationId)
                            .to(Reservation::Table, Reservation::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_order_trip")
                            .from(Order::Table, Order::TripId)
                            .to(Trip::Table, Trip::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_order_coupon")
                            .from(Order::Table, Order::CouponId)
                            .to(Coupon::Table, Coupon::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Ticket::Table)
                    .if_not_exists()
                    .col(uuid(Ticket::Id).primary_key())
                    .col(string_len(Ticket::TicketCode, 32).not_null().unique_key())
                    .col(uuid(Ticket::OrderId).not_null())
                    .col(uuid(Ticket::TripId).not_null())
                    .col(string_len(Ticket::SeatCode, 16).not_null())
                    .col(big_integer(Ticket::Price).not_null())
                    .col(text(Ticket::QrPayload).not_null())
                    .col(string_len(Ticket::Status, 16).not_null().default("confirmed"))
                    .col(uuid_null(Ticket::PickupPointId))
                    .col(uuid_null(Ticket::DropoffPointId))
                    .col(big_integer_null(Ticket::RefundAmount))
                    .col(timestamp_with_time_zone_null(Ticket::CancelledAt))
                    .col(
                        timestamp_with_time_zone(Ticket::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_ticket_order")
                            .from(Ticket::Table, Ticket::OrderId)
                            .to(Order::Table, Order::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_ticket_pickup_point")
                            .from(Ticket::Table, Ticket::PickupPointId)
                            .to(Point::Table, Point::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_ticket_dropoff_point")
                            .from(Ticket::Table, Ticket::DropoffPointId)
                            .to(Point::Table, Point::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_ticket_trip_seat")
                    .table(Ticket::Table)
                    .col(Ticket::TripId)
                    .col(Ticket::SeatCode)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(PaymentTransaction::Table)
                    .if_not_exists()
                    .col(uuid(PaymentTransaction::Id).primary_key())
                    .col(uuid(PaymentTransaction::OrderId).not_null())
                    .col(big_integer(PaymentTransaction::Amount).not_null())
                    .col(string_len(PaymentTransaction::PaymentMethod, 32).not_null())
                    .col(string_len(PaymentTransaction::PaymentRef, 128).not_null())
                    .col(string_len(PaymentTransaction::Kind, 16).not_null())
                    .col(string_len(PaymentTransaction::Status, 16).not_null())
                    .col(
                        timestamp_with_time_zone(PaymentTransaction::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_payment_transaction_order")
                            .from(PaymentTransaction::Table, PaymentTransaction::OrderId)
                            .to(Order::Table, Order::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(PaymentTransaction::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Ticket::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Order::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Order {
    Table,
    Id,
    UserId,
    ReservationId,
    TripId,
    CouponId,
    OriginAmount,
    DiscountAmount,
    FinalAmount,
    Status,
    CreatedAt,
}

#[derive(DeriveIden)]
pub enum Ticket {
    Table,
    Id,
    TicketCode,
    OrderId,
    TripId,
    SeatCode,
    Price,
    QrPayload,
    Status,
    PickupPointId,
    DropoffPointId,
    RefundAmount,
    CancelledAt,
    CreatedAt,
}

#[derive(DeriveIden)]
pub enum PaymentTransaction {
    Table,
    Id,
    OrderId,
    Amount,
    PaymentMethod,
    PaymentRef,
    Kind,
    Status,
    CreatedAt,
}
