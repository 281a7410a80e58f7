use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
    strum::Display,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum MovementType {
    #[sea_orm(string_value = "IN")]
    #[strum(serialize = "IN")]
    In,
    #[sea_orm(string_value = "OUT")]
    #[strum(serialize = "OUT")]
    Out,
    #[sea_orm(string_value = "ADJUST")]
    #[strum(serialize = "ADJUST")]
    Adjust,
    #[sea_orm(string_value = "TRANSFER")]
    #[strum(serialize = "TRANSFER")]
    Transfer,
}

impl MovementType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementType::In => "IN",
            MovementType::Out => "OUT",
            MovementType::Adjust => "ADJUST",
            MovementType::Transfer => "TRANSFER",
        }
    }
}

/// What caused a movement.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
    strum::Display,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
pub enum SourceType {
    #[sea_orm(string_value = "MANUAL")]
    Manual,
    #[sea_orm(string_value = "PURCHASE_ORDER")]
    PurchaseOrder,
    #[sea_orm(string_value = "SALES_ORDER")]
    SalesOrder,
    #[sea_orm(string_value = "TRANSFER")]
    Transfer,
}

/// One immutable ledger entry. Rows are inserted once and never updated.
///
/// IN and OUT rows store the magnitude and carry their sign in the type;
/// ADJUST and TRANSFER rows store the signed delta.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "stock_movements")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub sku_id: Uuid,
    pub warehouse_id: Uuid,
    pub location_id: Option<Uuid>,
    #[serde(skip)]
    pub location_key: String,
    pub movement_type: MovementType,
    pub quantity: i32,
    pub reason: Option<String>,
    pub source_type: SourceType,
    pub source_id: Option<String>,
    pub actor: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Model {
    /// Signed effect of this entry on the slot's on-hand quantity.
    pub fn delta(&self) -> i64 {
        signed_delta(self.movement_type, self.quantity)
    }
}

/// Sign rule shared by `Model::delta` and the ledger sum query.
pub fn signed_delta(movement_type: MovementType, quantity: i32) -> i64 {
    match movement_type {
        MovementType::Out => -(quantity as i64),
        MovementType::In | MovementType::Adjust | MovementType::Transfer => quantity as i64,
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
}

impl Related<super::sku::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Sku.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
