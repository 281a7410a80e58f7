use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use std::collections::HashMap;
use uuid::Uuid;

use crate::entities::inventory_balance::{self, location_key, Column, Entity as InventoryBalance};
use crate::errors::ServiceError;

/// Identifies one balance slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotKey {
    pub sku_id: Uuid,
    pub warehouse_id: Uuid,
    pub location_id: Option<Uuid>,
}

impl SlotKey {
    pub fn new(sku_id: Uuid, warehouse_id: Uuid, location_id: Option<Uuid>) -> Self {
        Self {
            sku_id,
            warehouse_id,
            location_id,
        }
    }
}

pub async fn find_by_id<C: ConnectionTrait>(
    conn: &C,
    balance_id: Uuid,
) -> Result<Option<inventory_balance::Model>, ServiceError> {
    InventoryBalance::find_by_id(balance_id)
        .one(conn)
        .await
        .map_err(ServiceError::db_error)
}

pub async fn find_slot<C: ConnectionTrait>(
    conn: &C,
    key: SlotKey,
) -> Result<Option<inventory_balance::Model>, ServiceError> {
    InventoryBalance::find()
        .filter(Column::SkuId.eq(key.sku_id))
        .filter(Column::WarehouseId.eq(key.warehouse_id))
        .filter(Column::LocationKey.eq(location_key(key.location_id)))
        .one(conn)
        .await
        .map_err(ServiceError::db_error)
}

/// Returns the slot's row, inserting an empty one on first use.
///
/// Two writers racing to create the same slot hit the unique index; the
/// loser's error is a conflict and its transaction is retried.
pub async fn find_or_create_slot<C: ConnectionTrait>(
    conn: &C,
    key: SlotKey,
) -> Result<inventory_balance::Model, ServiceError> {
    if let Some(existing) = find_slot(conn, key).await? {
        return Ok(existing);
    }

    let now = Utc::now();
    let balance = inventory_balance::ActiveModel {
        id: Set(Uuid::new_v4()),
        sku_id: Set(key.sku_id),
        warehouse_id: Set(key.warehouse_id),
        location_id: Set(key.location_id),
        location_key: Set(location_key(key.location_id)),
        quantity: Set(0),
        reserved: Set(0),
        version: Set(0),
        created_at: Set(now),
        updated_at: Set(now),
    };
    balance.insert(conn).await.map_err(ServiceError::db_error)
}

/// Writes new quantity/reserved values if nobody else has touched the row
/// since `current` was read. Bumps `version` on success.
pub async fn apply<C: ConnectionTrait>(
    conn: &C,
    current: &inventory_balance::Model,
    quantity: i32,
    reserved: i32,
) -> Result<inventory_balance::Model, ServiceError> {
    if quantity < 0 || reserved < 0 || reserved > quantity {
        return Err(ServiceError::InternalError(format!(
            "refusing to write balance {} with quantity {} and reserved {}",
            current.id, quantity, reserved
        )));
    }

    let now = Utc::now();
    let result = InventoryBalance::update_many()
        .col_expr(Column::Quantity, Expr::value(quantity))
        .col_expr(Column::Reserved, Expr::value(reserved))
        .col_expr(Column::Version, Expr::value(current.version + 1))
        .col_expr(Column::UpdatedAt, Expr::value(now))
        .filter(Column::Id.eq(current.id))
        .filter(Column::Version.eq(current.version))
        .exec(conn)
        .await
        .map_err(ServiceError::db_error)?;

    if result.rows_affected == 0 {
        return Err(ServiceError::ConcurrentModification(current.id));
    }

    Ok(inventory_balance::Model {
        quantity,
        reserved,
        version: current.version + 1,
        updated_at: now,
        ..current.clone()
    })
}

pub async fn list_for_sku<C: ConnectionTrait>(
    conn: &C,
    sku_id: Uuid,
) -> Result<Vec<inventory_balance::Model>, ServiceError> {
    InventoryBalance::find()
        .filter(Column::SkuId.eq(sku_id))
        .order_by_asc(Column::WarehouseId)
        .order_by_asc(Column::LocationKey)
        .all(conn)
        .await
        .map_err(ServiceError::db_error)
}

/// Summed on-hand quantity across every slot of the given SKUs.
pub async fn total_on_hand<C: ConnectionTrait>(
    conn: &C,
    sku_ids: &[Uuid],
) -> Result<i64, ServiceError> {
    if sku_ids.is_empty() {
        return Ok(0);
    }
    let total: Option<Option<i64>> = InventoryBalance::find()
        .select_only()
        .column_as(Column::Quantity.sum(), "total")
        .filter(Column::SkuId.is_in(sku_ids.iter().copied()))
        .into_tuple()
        .one(conn)
        .await
        .map_err(ServiceError::db_error)?;
    Ok(total.flatten().unwrap_or(0))
}

/// On-hand quantity per SKU, for every SKU that has at least one slot.
pub async fn on_hand_by_sku<C: ConnectionTrait>(
    conn: &C,
) -> Result<HashMap<Uuid, i64>, ServiceError> {
    let rows: Vec<(Uuid, Option<i64>)> = InventoryBalance::find()
        .select_only()
        .column(Column::SkuId)
        .column_as(Column::Quantity.sum(), "total")
        .group_by(Column::SkuId)
        .into_tuple()
        .all(conn)
        .await
        .map_err(ServiceError::db_error)?;
    Ok(rows
        .into_iter()
        .map(|(sku_id, total)| (sku_id, total.unwrap_or(0)))
        .collect())
}
