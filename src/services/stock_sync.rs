use async_trait::async_trait;
use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QuerySelect};
use std::sync::Arc;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use crate::{
    entities::{
        product::{self, Entity as ProductEntity},
        sku::{self, Entity as SkuEntity, SkuStatus},
    },
    errors::ServiceError,
    events::{Event, EventSender},
    metrics,
    repositories::balance_repository,
    services::registry,
};

/// Writes the denormalized stock total back to the catalog.
///
/// The engine is the only writer of this field. Implementations may be
/// synchronous database writes or hand-offs to an asynchronous channel.
#[async_trait]
pub trait CatalogStockWriter: Send + Sync {
    async fn write_stock_total(&self, product_id: Uuid, total: i64) -> Result<(), ServiceError>;
}

/// Updates `products.stock` and `products.count_in_stock` in place.
pub struct SeaOrmCatalogWriter {
    db: Arc<DatabaseConnection>,
}

impl SeaOrmCatalogWriter {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl CatalogStockWriter for SeaOrmCatalogWriter {
    async fn write_stock_total(&self, product_id: Uuid, total: i64) -> Result<(), ServiceError> {
        let total = i32::try_from(total).map_err(|_| {
            ServiceError::InternalError(format!("stock total {} does not fit the catalog", total))
        })?;
        let result = ProductEntity::update_many()
            .col_expr(product::Column::Stock, Expr::value(total))
            .col_expr(product::Column::CountInStock, Expr::value(total))
            .col_expr(product::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(product::Column::Id.eq(product_id))
            .exec(&*self.db)
            .await
            .map_err(ServiceError::db_error)?;
        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound(format!(
                "Product {} not found",
                product_id
            )));
        }
        Ok(())
    }
}

/// Re-publishes a SKU's product total after a committed mutation.
///
/// Best effort: any failure is logged, counted and published as
/// `StockSyncFailed`, never returned to the caller.
#[derive(Clone)]
pub struct StockSyncService {
    db: Arc<DatabaseConnection>,
    writer: Arc<dyn CatalogStockWriter>,
    event_sender: EventSender,
}

impl StockSyncService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        writer: Arc<dyn CatalogStockWriter>,
        event_sender: EventSender,
    ) -> Self {
        Self {
            db,
            writer,
            event_sender,
        }
    }

    #[instrument(skip(self))]
    pub async fn sync_sku(&self, sku_id: Uuid) {
        let sku = match registry::find_sku(&*self.db, sku_id).await {
            Ok(sku) => sku,
            Err(e) => {
                warn!("Stock sync could not load SKU: {}", e);
                metrics::record_sync_failure();
                return;
            }
        };

        self.check_low_stock(&sku).await;

        let Some(product_id) = sku.product_id else {
            debug!("SKU has no catalog product; nothing to mirror");
            return;
        };

        if let Err(e) = self.mirror_product_total(product_id).await {
            warn!(%product_id, "Catalog stock sync failed: {}", e);
            metrics::record_sync_failure();
            self.event_sender.send_or_log(Event::StockSyncFailed {
                sku_id,
                product_id,
                error: e.to_string(),
            });
        }
    }

    /// Sums on-hand across every SKU of the product and writes it out.
    async fn mirror_product_total(&self, product_id: Uuid) -> Result<i64, ServiceError> {
        let sku_ids: Vec<Uuid> = SkuEntity::find()
            .select_only()
            .column(sku::Column::Id)
            .filter(sku::Column::ProductId.eq(product_id))
            .into_tuple()
            .all(&*self.db)
            .await
            .map_err(ServiceError::db_error)?;

        let total = balance_repository::total_on_hand(&*self.db, &sku_ids).await?;
        self.writer.write_stock_total(product_id, total).await?;
        debug!(%product_id, total, "Catalog stock mirrored");
        Ok(total)
    }

    async fn check_low_stock(&self, sku: &sku::Model) {
        if sku.status != SkuStatus::Active || sku.minimum_stock_level <= 0 {
            return;
        }
        match balance_repository::total_on_hand(&*self.db, &[sku.id]).await {
            Ok(on_hand) if on_hand <= i64::from(sku.minimum_stock_level) => {
                self.event_sender.send_or_log(Event::LowStockDetected {
                    sku_id: sku.id,
                    sku_code: sku.code.clone(),
                    on_hand,
                    minimum_stock_level: sku.minimum_stock_level,
                    detected_at: Utc::now(),
                });
            }
            Ok(_) => {}
            Err(e) => warn!("Low stock check failed: {}", e),
        }
    }
}
