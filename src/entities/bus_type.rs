use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A seating configuration shared by many physical buses.
///
/// `total_seats` must equal `rows * cols` plus `floor_rows * floor_cols`
/// when the bus has a second floor.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "bus_type")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    pub total_seats: i32,
    pub rows: i32,
    pub cols: i32,
    pub has_second_floor: bool,
    pub floor_rows: i32,
    pub floor_cols: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::seat::Entity")]
    Seats,
    #[sea_orm(has_many = "super::bus::Entity")]
    Buses,
}

impl Related<super::seat::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Seats.def()
    }
}

impl Related<super::bus::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Buses.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
