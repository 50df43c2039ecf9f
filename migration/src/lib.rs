pub use sea_orm_migration::prelude::*;

mod m20250301_000001_create_companies;
mod m20250301_000002_create_bus_types;
mod m20250301_000003_create_buses;
mod m20250301_000004_create_trips;
mod m20250301_000005_create_coupons;
mod m20250301_000006_create_reservations;
mod m20250301_000007_create_orders;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250301_000001_create_companies::Migration),
            Box::new(m20250301_000002_create_bus_types::Migration),
            Box::new(m20250301_000003_create_buses::Migration),
            Box::new(m20250301_000004_create_trips::Migration),
            Box::new(m20250301_000005_create_coupons::Migration),
            Box::new(m20250301_000006_create_reservations::Migration),
            Box::new(m20250301_000007_create_orders::Migration),
        ]
    }
}
