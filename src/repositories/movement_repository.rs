use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use uuid::Uuid;

use super::balance_repository::SlotKey;
use crate::entities::inventory_balance::location_key;
use crate::entities::stock_movement::{
    self, Column, Entity as StockMovement, MovementType, SourceType,
};
use crate::errors::ServiceError;
use crate::metrics;

/// Signed ledger sum, mirroring `stock_movement::signed_delta`.
const SIGNED_SUM_SQL: &str =
    "SUM(CASE WHEN movement_type = 'OUT' THEN -quantity ELSE quantity END)";

/// A ledger entry about to be appended.
#[derive(Debug, Clone)]
pub struct NewMovement {
    pub slot: SlotKey,
    pub movement_type: MovementType,
    /// Magnitude for IN/OUT, signed delta for ADJUST/TRANSFER
    pub quantity: i32,
    pub reason: Option<String>,
    pub source_type: SourceType,
    pub source_id: Option<String>,
    pub actor: Option<String>,
}

/// Appends one immutable row. There is no update or delete counterpart.
pub async fn append<C: ConnectionTrait>(
    conn: &C,
    movement: NewMovement,
) -> Result<stock_movement::Model, ServiceError> {
    let row = stock_movement::ActiveModel {
        id: Set(Uuid::new_v4()),
        sku_id: Set(movement.slot.sku_id),
        warehouse_id: Set(movement.slot.warehouse_id),
        location_id: Set(movement.slot.location_id),
        location_key: Set(location_key(movement.slot.location_id)),
        movement_type: Set(movement.movement_type),
        quantity: Set(movement.quantity),
        reason: Set(movement.reason),
        source_type: Set(movement.source_type),
        source_id: Set(movement.source_id),
        actor: Set(movement.actor),
        created_at: Set(Utc::now()),
    };
    let inserted = row.insert(conn).await.map_err(ServiceError::db_error)?;
    metrics::record_movement(inserted.movement_type.as_str());
    Ok(inserted)
}

/// Sum of signed deltas for one slot.
pub async fn ledger_sum<C: ConnectionTrait>(conn: &C, slot: SlotKey) -> Result<i64, ServiceError> {
    let total: Option<Option<i64>> = StockMovement::find()
        .select_only()
        .column_as(Expr::cust(SIGNED_SUM_SQL), "total")
        .filter(Column::SkuId.eq(slot.sku_id))
        .filter(Column::WarehouseId.eq(slot.warehouse_id))
        .filter(Column::LocationKey.eq(location_key(slot.location_id)))
        .into_tuple()
        .one(conn)
        .await
        .map_err(ServiceError::db_error)?;
    Ok(total.flatten().unwrap_or(0))
}

/// Signed ledger sums for every slot that has ledger history, keyed by
/// `(sku_id, warehouse_id, location_key)`.
pub async fn ledger_sums_by_slot<C: ConnectionTrait>(
    conn: &C,
) -> Result<Vec<(Uuid, Uuid, String, i64)>, ServiceError> {
    let rows: Vec<(Uuid, Uuid, String, Option<i64>)> = StockMovement::find()
        .select_only()
        .column(Column::SkuId)
        .column(Column::WarehouseId)
        .column(Column::LocationKey)
        .column_as(Expr::cust(SIGNED_SUM_SQL), "total")
        .group_by(Column::SkuId)
        .group_by(Column::WarehouseId)
        .group_by(Column::LocationKey)
        .into_tuple()
        .all(conn)
        .await
        .map_err(ServiceError::db_error)?;
    Ok(rows
        .into_iter()
        .map(|(sku, wh, key, total)| (sku, wh, key, total.unwrap_or(0)))
        .collect())
}

/// Newest entries first.
pub async fn recent_for_sku<C: ConnectionTrait>(
    conn: &C,
    sku_id: Uuid,
    limit: u64,
) -> Result<Vec<stock_movement::Model>, ServiceError> {
    StockMovement::find()
        .filter(Column::SkuId.eq(sku_id))
        .order_by_desc(Column::CreatedAt)
        .order_by_desc(Column::Id)
        .limit(limit)
        .all(conn)
        .await
        .map_err(ServiceError::db_error)
}

pub async fn list_for_slot<C: ConnectionTrait>(
    conn: &C,
    slot: SlotKey,
) -> Result<Vec<stock_movement::Model>, ServiceError> {
    StockMovement::find()
        .filter(Column::SkuId.eq(slot.sku_id))
        .filter(Column::WarehouseId.eq(slot.warehouse_id))
        .filter(Column::LocationKey.eq(location_key(slot.location_id)))
        .order_by_asc(Column::CreatedAt)
        .all(conn)
        .await
        .map_err(ServiceError::db_error)
}
