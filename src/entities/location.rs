use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Role of a bin inside the warehouse flow.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, strum::Display,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
pub enum LocationType {
    #[sea_orm(string_value = "Pick")]
    Pick,
    #[sea_orm(string_value = "Reserve")]
    Reserve,
    #[sea_orm(string_value = "Staging")]
    Staging,
    #[sea_orm(string_value = "Dock")]
    Dock,
    #[sea_orm(string_value = "Damaged")]
    Damaged,
}

impl LocationType {
    /// Staging and dock bins are transit areas: stock may leave them on
    /// put-away but is never put away into them.
    pub fn is_putaway_destination(&self) -> bool {
        !matches!(self, LocationType::Staging | LocationType::Dock)
    }

    /// Damaged stock is never offered to pickers.
    pub fn is_pickable(&self) -> bool {
        !matches!(self, LocationType::Damaged)
    }

    /// Lower ranks are suggested first when picking.
    pub fn pick_rank(&self) -> u8 {
        match self {
            LocationType::Pick => 0,
            LocationType::Reserve => 1,
            LocationType::Staging => 2,
            LocationType::Dock => 3,
            LocationType::Damaged => u8::MAX,
        }
    }
}

/// The `locations` table. Zone/aisle/rack/shelf/bin are descriptive only.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "locations")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub warehouse_id: Uuid,
    pub code: String,
    pub location_type: LocationType,
    pub zone: Option<String>,
    pub aisle: Option<String>,
    pub rack: Option<String>,
    pub shelf: Option<String>,
    pub bin: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::warehouse::Entity",
        from = "Column::WarehouseId",
        to = "super::warehouse::Column::Id"
    )]
    Warehouse,
}

impl Related<super::warehouse::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Warehouse.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
