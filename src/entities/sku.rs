use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle of a stock-keeping unit.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, strum::Display,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
pub enum SkuStatus {
    #[sea_orm(string_value = "Active")]
    Active,
    #[sea_orm(string_value = "Discontinued")]
    Discontinued,
    #[sea_orm(string_value = "Blocked")]
    Blocked,
}

impl SkuStatus {
    /// Whether new stock may be received (Stock-In, PO receipt).
    pub fn accepts_inbound(&self) -> bool {
        matches!(self, SkuStatus::Active)
    }

    /// Whether stock may leave or move between slots.
    pub fn accepts_outbound(&self) -> bool {
        !matches!(self, SkuStatus::Blocked)
    }
}

/// The `skus` table. Code, barcode and product link are fixed at creation.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "skus")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub code: String,
    #[sea_orm(unique)]
    pub barcode: Option<String>,
    pub product_id: Option<Uuid>,
    /// Free-form variant attributes such as size or color.
    #[sea_orm(column_type = "Json")]
    pub attributes: Json,
    pub unit_of_measure: String,
    pub minimum_stock_level: i32,
    pub reorder_quantity: i32,
    pub status: SkuStatus,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))", nullable)]
    pub cost: Option<Decimal>,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))", nullable)]
    pub weight_kg: Option<Decimal>,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))", nullable)]
    pub length_cm: Option<Decimal>,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))", nullable)]
    pub width_cm: Option<Decimal>,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))", nullable)]
    pub height_cm: Option<Decimal>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::product::Entity",
        from = "Column::ProductId",
        to = "super::product::Column::Id"
    )]
    Product,
    #[sea_orm(has_many = "super::inventory_balance::Entity")]
    InventoryBalances,
}

impl Related<super::product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Product.def()
    }
}

impl Related<super::inventory_balance::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::InventoryBalances.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
