use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(BusType::Table)
                    .if_not_exists()
                    .col(uuid(BusType::Id).primary_key())
                    .col(string_len(BusType::Name, 100).not_null())
                    .col(integer(BusType::TotalSeats).not_null())
                    .col(integer(BusType::Rows).not_null())
                    .col(integer(BusType::Cols).not_null())
                    .col(boolean(BusType::HasSecondFloor).not_null().default(false))
                    .col(integer(BusType::FloorRows).not_null().default(0))
                    .col(integer(BusType::FloorCols).not_null().default(0))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Seat::Table)
                    .if_not_exists()
                    .col(uuid(Seat::Id).primary_key())
                    .col(uuid(Seat::BusTypeId).not_null())
                    .col(string_len(Seat::Code, 16).not_null())
                    .col(integer(Seat::RowIndex).not_null())
                    .col(integer(Seat::ColIndex).not_null())
                    .col(integer(Seat::Floor).not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_seat_bus_type")
                            .from(Seat::Table, Seat::BusTypeId)
                            .to(BusType::Table, BusType::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_seat_bus_type_code")
                    .table(Seat::Table)
                    .col(Seat::BusTypeId)
                    .col(Seat::Code)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Seat::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(BusType::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum BusType {
    Table,
    Id,
    Name,
    TotalSeats,
    Rows,
    Cols,
    HasSecondFloor,
    FloorRows,
    FloorCols,
}

#[derive(DeriveIden)]
pub enum Seat {
    Table,
    Id,
    BusTypeId,
    Code,
    RowIndex,
    ColIndex,
    Floor,
}
