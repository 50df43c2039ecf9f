use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "seat")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub bus_type_id: Uuid,
    pub code: String,
    pub row_index: i32,
    pub col_index: i32,
    pub floor: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::bus_type::Entity",
        from = "Column::BusTypeId",
        to = "super::bus_type::Column::Id"
    )]
    BusType,
}

impl Related<super::bus_type::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::BusType.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
