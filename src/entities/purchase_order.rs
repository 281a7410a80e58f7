use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
    strum::Display,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
pub enum PurchaseOrderStatus {
    #[sea_orm(string_value = "Created")]
    Created,
    #[sea_orm(string_value = "PartiallyReceived")]
    #[strum(serialize = "Partially Received")]
    PartiallyReceived,
    #[sea_orm(string_value = "Received")]
    Received,
    #[sea_orm(string_value = "Cancelled")]
    Cancelled,
}

impl PurchaseOrderStatus {
    /// Derives the receipt status from `(received, expected)` per line.
    pub fn from_lines<I>(lines: I) -> Self
    where
        I: IntoIterator<Item = (i32, i32)>,
    {
        let mut any_received = false;
        let mut all_received = true;
        for (received, expected) in lines {
            any_received |= received > 0;
            all_received &= received >= expected;
        }
        if all_received {
            PurchaseOrderStatus::Received
        } else if any_received {
            PurchaseOrderStatus::PartiallyReceived
        } else {
            PurchaseOrderStatus::Created
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "purchase_orders")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub po_number: String,
    pub supplier: String,
    pub warehouse_id: Uuid,
    pub status: PurchaseOrderStatus,
    pub version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::purchase_order_item::Entity")]
    Items,
    #[sea_orm(
        belongs_to = "super::warehouse::Entity",
        from = "Column::WarehouseId",
        to = "super::warehouse::Column::Id"
    )]
    Warehouse,
}

impl Related<super::purchase_order_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Items.def()
    }
}

impl Related<super::warehouse::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Warehouse.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_follows_line_progress() {
        assert_eq!(
            PurchaseOrderStatus::from_lines([(0, 10), (0, 5)]),
            PurchaseOrderStatus::Created
        );
        assert_eq!(
            PurchaseOrderStatus::from_lines([(10, 10), (2, 5)]),
            PurchaseOrderStatus::PartiallyReceived
        );
        assert_eq!(
            PurchaseOrderStatus::from_lines([(12, 10), (5, 5)]),
            PurchaseOrderStatus::Received
        );
    }
}
