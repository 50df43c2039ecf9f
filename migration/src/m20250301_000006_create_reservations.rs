use sea_orm_migration::{prelude::*, schema::*};

use super::m20250301_000004_create_trips::Trip;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Reservation::Table)
                    .if_not_exists()
                    .col(uuid(Reservation::Id).primary_key())
                    .col(string_len(Reservation::SessionId, 128).not_null())
                    .col(uuid(Reservation::TripId).not_null())
                    .col(json(Reservation::SeatCodes).not_null())
                    .col(timestamp_with_time_zone(Reservation::CreatedAt).not_null())
                    .col(timestamp_with_time_zone(Reservation::ExpiresAt).not_null())
                    .col(string_len(Reservation::Status, 16).not_null().default("active"))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_reservation_trip")
                            .from(Reservation::Table, Reservation::TripId)
                            .to(Trip::Table, Trip::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_reservation_session")
                    .table(Reservation::Table)
                    .col(Reservation::SessionId)
                    .col(Reservation::Status)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Reservation::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Reservation {
    Table,
    Id,
    SessionId,
    TripId,
    SeatCodes,
    CreatedAt,
    ExpiresAt,
    Status,
}
