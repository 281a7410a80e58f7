use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stored in `location_key` for warehouse-level rows that have no bin.
pub const WAREHOUSE_LEVEL_KEY: &str = "-";

/// Renders the slot key used by the `(sku_id, warehouse_id, location_key)`
/// unique index.
pub fn location_key(location_id: Option<Uuid>) -> String {
    match location_id {
        Some(id) => id.to_string(),
        None => WAREHOUSE_LEVEL_KEY.to_string(),
    }
}

/// Current on-hand and reserved quantity for one (sku, warehouse, location) slot.
///
/// Rows are created on first stock-in and never deleted; a zero quantity
/// row is still history. `version` is bumped on every update.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "inventory_balances")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub sku_id: Uuid,
    pub warehouse_id: Uuid,
    pub location_id: Option<Uuid>,
    #[serde(skip)]
    pub location_key: String,
    pub quantity: i32,
    pub reserved: i32,
    pub version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Model {
    pub fn available(&self) -> i32 {
        self.quantity - self.reserved
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::sku::Entity",
        from = "Column::SkuId",
        to = "super::sku::Column::Id"
    )]
    Sku,
    #[sea_orm(
        belongs_to = "super::warehouse::Entity",
        from = "Column::WarehouseId",
        to = "super::warehouse::Column::Id"
    )]
    Warehouse,
    #[sea_orm(
        belongs_to = "super::location::Entity",
        from = "Column::LocationId",
        to = "super::location::Column::Id"
    )]
    Location,
}

impl Related<super::sku::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Sku.def()
    }
}

impl Related<super::warehouse::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Warehouse.def()
    }
}

impl Related<super::location::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Location.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
