use sea_orm_migration::{prelude::*, schema::*};

use super::m20250301_000001_create_companies::Company;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Coupon::Table)
                    .if_not_exists()
                    .col(uuid(Coupon::Id).primary_key())
                    .col(string_len(Coupon::Code, 50).not_null().unique_key())
                    .col(string_len(Coupon::DiscountType, 16).not_null())
                    .col(big_integer(Coupon::DiscountValue).not_null())
                    .col(big_integer_null(Coupon::MaxDiscountValue))
                    .col(integer(Coupon::MaxUses).not_null())
                    .col(integer(Coupon::UsedCount).not_null().default(0))
                    .col(timestamp_with_time_zone(Coupon::ValidFrom).not_null())
                    .col(timestamp_with_time_zone(Coupon::ValidTo).not_null())
                    .col(string_len(Coupon::Status, 16).not_null().default("active"))
                    .col(uuid_null(Coupon::CompanyId))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_coupon_company")
                            .from(Coupon::Table, Coupon::CompanyId)
                            .to(Company::Table, Company::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(CancellationRule::Table)
                    .if_not_exists()
                    .col(uuid(CancellationRule::Id).primary_key())
                    .col(uuid(CancellationRule::CompanyId).not_null())
                    .col(integer(CancellationRule::TimeBeforeDepartureHours).not_null())
                    .col(integer(CancellationRule::RefundPercentage).not_null())
                    .col(big_integer(CancellationRule::FeeAmount).not_null().default(0))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_cancellation_rule_company")
                            .from(CancellationRule::Table, CancellationRule::CompanyId)
                            .to(Company::Table, Company::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(CancellationRule::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Coupon::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Coupon {
    Table,
    Id,
    Code,
    DiscountType,
    DiscountValue,
    MaxDiscountValue,
    MaxUses,
    UsedCount,
    ValidFrom,
    ValidTo,
    Status,
    CompanyId,
}

#[derive(DeriveIden)]
pub enum CancellationRule {
    Table,
    Id,
    CompanyId,
    TimeBeforeDepartureHours,
    RefundPercentage,
    FeeAmount,
}
