use sea_orm::sea_query::{Expr, Func, LikeExpr};
use sea_orm::{
    ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, QuerySelect,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::{
    entities::{
        inventory_balance::{self, Entity as InventoryBalance},
        product::{self, Entity as ProductEntity},
        sku::{self, Entity as SkuEntity, SkuStatus},
        stock_movement,
    },
    errors::ServiceError,
    repositories::{balance_repository, movement_repository},
    services::registry,
};

/// Filters for `query_inventory`. Every field is optional and all supplied
/// filters must hold at once.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InventoryFilter {
    pub warehouse_id: Option<Uuid>,
    pub location_id: Option<Uuid>,
    pub sku_id: Option<Uuid>,
    /// Case-insensitive match on SKU code, barcode or product name
    pub search_text: Option<String>,
    #[serde(default)]
    pub low_stock_only: bool,
    /// Only rows with something reserved
    #[serde(default)]
    pub reserved_only: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotStats {
    pub total: i64,
    pub reserved: i64,
    pub available: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkuSnapshot {
    pub sku: sku::Model,
    pub balances: Vec<inventory_balance::Model>,
    pub stats: SnapshotStats,
    pub recent_movements: Vec<stock_movement::Model>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LowStockItem {
    pub sku_id: Uuid,
    pub sku_code: String,
    pub product_id: Option<Uuid>,
    pub on_hand: i64,
    pub minimum_stock_level: i32,
    pub reorder_quantity: i32,
}

/// Read-only inventory queries.
#[derive(Clone)]
pub struct InventoryQueryService {
    db: Arc<DatabaseConnection>,
    recent_movements_limit: u64,
}

impl InventoryQueryService {
    pub fn new(db: Arc<DatabaseConnection>, recent_movements_limit: u64) -> Self {
        Self {
            db,
            recent_movements_limit,
        }
    }

    /// SKU-level filters each produce a candidate id set and the sets are
    /// intersected; row-level filters then narrow the balance query.
    #[instrument(skip(self))]
    pub async fn query_inventory(
        &self,
        filter: &InventoryFilter,
    ) -> Result<Vec<inventory_balance::Model>, ServiceError> {
        let mut candidate_sets: Vec<HashSet<Uuid>> = Vec::new();
        if let Some(sku_id) = filter.sku_id {
            candidate_sets.push(HashSet::from([sku_id]));
        }
        if let Some(text) = filter.search_text.as_deref().map(str::trim) {
            if !text.is_empty() {
                candidate_sets.push(self.search_sku_ids(text).await?);
            }
        }
        if filter.low_stock_only {
            candidate_sets.push(
                self.list_low_stock()
                    .await?
                    .into_iter()
                    .map(|item| item.sku_id)
                    .collect(),
            );
        }

        let candidates = intersect(candidate_sets);
        if let Some(ids) = &candidates {
            debug!(candidates = ids.len(), "SKU filters applied");
            if ids.is_empty() {
                return Ok(Vec::new());
            }
        }

        let mut query = InventoryBalance::find();
        if let Some(ids) = candidates {
            query = query.filter(inventory_balance::Column::SkuId.is_in(ids));
        }
        if let Some(warehouse_id) = filter.warehouse_id {
            query = query.filter(inventory_balance::Column::WarehouseId.eq(warehouse_id));
        }
        if let Some(location_id) = filter.location_id {
            query = query.filter(inventory_balance::Column::LocationId.eq(location_id));
        }
        if filter.reserved_only {
            query = query.filter(inventory_balance::Column::Reserved.gt(0));
        }

        query
            .order_by_asc(inventory_balance::Column::SkuId)
            .order_by_asc(inventory_balance::Column::WarehouseId)
            .order_by_asc(inventory_balance::Column::LocationKey)
            .all(&*self.db)
            .await
            .map_err(ServiceError::db_error)
    }

    #[instrument(skip(self))]
    pub async fn get_sku_snapshot(&self, sku_id: Uuid) -> Result<SkuSnapshot, ServiceError> {
        let db = &*self.db;
        let sku = registry::find_sku(db, sku_id).await?;
        let balances = balance_repository::list_for_sku(db, sku_id).await?;
        let recent_movements =
            movement_repository::recent_for_sku(db, sku_id, self.recent_movements_limit).await?;

        let total: i64 = balances.iter().map(|b| i64::from(b.quantity)).sum();
        let reserved: i64 = balances.iter().map(|b| i64::from(b.reserved)).sum();

        Ok(SkuSnapshot {
            sku,
            balances,
            stats: SnapshotStats {
                total,
                reserved,
                available: total - reserved,
            },
            recent_movements,
        })
    }

    /// Active SKUs with a minimum level whose summed on-hand is at or
    /// below it. SKUs that never had stock count as zero.
    #[instrument(skip(self))]
    pub async fn list_low_stock(&self) -> Result<Vec<LowStockItem>, ServiceError> {
        let db = &*self.db;
        let skus = SkuEntity::find()
            .filter(sku::Column::Status.eq(SkuStatus::Active))
            .filter(sku::Column::MinimumStockLevel.gt(0))
            .order_by_asc(sku::Column::Code)
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;
        let on_hand = balance_repository::on_hand_by_sku(db).await?;

        Ok(skus
            .into_iter()
            .filter_map(|sku| {
                let total = on_hand.get(&sku.id).copied().unwrap_or(0);
                (total <= i64::from(sku.minimum_stock_level)).then(|| LowStockItem {
                    sku_id: sku.id,
                    sku_code: sku.code,
                    product_id: sku.product_id,
                    on_hand: total,
                    minimum_stock_level: sku.minimum_stock_level,
                    reorder_quantity: sku.reorder_quantity,
                })
            })
            .collect())
    }

    async fn search_sku_ids(&self, text: &str) -> Result<HashSet<Uuid>, ServiceError> {
        let db = &*self.db;
        let pattern = contains_pattern(text);

        let mut ids: HashSet<Uuid> = SkuEntity::find()
            .select_only()
            .column(sku::Column::Id)
            .filter(
                Condition::any()
                    .add(Expr::expr(Func::lower(Expr::col(sku::Column::Code))).like(pattern.clone()))
                    .add(
                        Expr::expr(Func::lower(Expr::col(sku::Column::Barcode)))
                            .like(pattern.clone()),
                    ),
            )
            .into_tuple::<Uuid>()
            .all(db)
            .await
            .map_err(ServiceError::db_error)?
            .into_iter()
            .collect();

        let product_ids: Vec<Uuid> = ProductEntity::find()
            .select_only()
            .column(product::Column::Id)
            .filter(Expr::expr(Func::lower(Expr::col(product::Column::Name))).like(pattern))
            .into_tuple()
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;
        if !product_ids.is_empty() {
            let by_product: Vec<Uuid> = SkuEntity::find()
                .select_only()
                .column(sku::Column::Id)
                .filter(sku::Column::ProductId.is_in(product_ids))
                .into_tuple()
                .all(db)
                .await
                .map_err(ServiceError::db_error)?;
            ids.extend(by_product);
        }

        Ok(ids)
    }
}

/// `None` when no set was supplied, meaning "no SKU restriction".
fn intersect(sets: Vec<HashSet<Uuid>>) -> Option<HashSet<Uuid>> {
    let mut sets = sets.into_iter();
    let first = sets.next()?;
    Some(sets.fold(first, |acc, set| acc.intersection(&set).copied().collect()))
}

/// A case-insensitive substring LIKE pattern. Wildcards typed by the caller
/// match literally.
fn contains_pattern(text: &str) -> LikeExpr {
    let mut escaped = String::with_capacity(text.len() + 2);
    escaped.push('%');
    for c in text.to_lowercase().chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    LikeExpr::new(escaped).escape('\\')
}
