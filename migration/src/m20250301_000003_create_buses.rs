use sea_orm_migration::{prelude::*, schema::*};

use super::m20250301_000001_create_companies::Company;
use super::m20250301_000002_create_bus_types::BusType;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Bus::Table)
                    .if_not_exists()
                    .col(uuid(Bus::Id).primary_key())
                    .col(uuid(Bus::CompanyId).not_null())
                    .col(uuid(Bus::BusTypeId).not_null())
                    .col(string_len(Bus::PlateNumber, 20).not_null().unique_key())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_bus_company")
                            .from(Bus::Table, Bus::CompanyId)
                            .to(Company::Table, Company::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_bus_bus_type")
                            .from(Bus::Table, Bus::BusTypeId)
                            .to(BusType::Table, BusType::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Bus::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Bus {
    Table,
    Id,
    CompanyId,
    BusTypeId,
    PlateNumber,
}
