use sea_orm_migration::{prelude::*, schema::*};

use super::m20250301_000001_create_companies::Company;
use super::m20250301_000003_create_buses::Bus;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Trip::Table)
                    .if_not_exists()
                    .col(uuid(Trip::Id).primary_key())
                    .col(uuid(Trip::BusRouteId).not_null())
                    .col(uuid(Trip::BusId).not_null())
                    .col(uuid(Trip::CompanyId).not_null())
                    .col(timestamp_with_time_zone(Trip::DepartureTime).not_null())
                    .col(timestamp_with_time_zone(Trip::ArrivalTime).not_null())
                    .col(big_integer(Trip::Price).not_null())
                    .col(string_len(Trip::Status, 16).not_null().default("scheduled"))
                    .col(
                        timestamp_with_time_zone(Trip::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_trip_bus")
                            .from(Trip::Table, Trip::BusId)
                            .to(Bus::Table, Bus::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_trip_company")
                            .from(Trip::Table, Trip::CompanyId)
                            .to(Company::Table, Company::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        // Seat state snapshot, one row per seat of the trip's bus type
        manager
            .create_table(
                Table::create()
                    .table(TripSeat::Table)
                    .if_not_exists()
                    .col(uuid(TripSeat::Id).primary_key())
                    .col(uuid(TripSeat::TripId).not_null())
                    .col(string_len(TripSeat::SeatCode, 16).not_null())
                    .col(integer(TripSeat::Floor).not_null())
                    .col(string_len(TripSeat::Status, 16).not_null().default("free"))
                    .col(timestamp_with_time_zone_null(TripSeat::HoldExpiresAt))
                    .col(string_len_null(TripSeat::HeldBySession, 128))
                    .col(uuid_null(TripSeat::ReservationId))
                    .col(uuid_null(TripSeat::TicketId))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_trip_seat_trip")
                            .from(TripSeat::Table, TripSeat::TripId)
                            .to(Trip::Table, Trip::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_trip_seat_trip_code")
                    .table(TripSeat::Table)
                    .col(TripSeat::TripId)
                    .col(TripSeat::SeatCode)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_trip_seat_status")
                    .table(TripSeat::Table)
                    .col(TripSeat::Status)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(TripSeat::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Trip::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Trip {
    Table,
    Id,
    BusRouteId,
    BusId,
    CompanyId,
    DepartureTime,
    ArrivalTime,
    Price,
    Status,
    CreatedAt,
}

#[derive(DeriveIden)]
pub enum TripSeat {
    Table,
    Id,
    TripId,
    SeatCode,
    Floor,
    Status,
    HoldExpiresAt,
    HeldBySession,
    ReservationId,
    TicketId,
}
