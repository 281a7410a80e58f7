use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::{
    commands::Command, entities::inventory_balance, errors::ServiceError, InventoryEngine,
};

/// Receives stock into a slot. `sku_or_barcode` is matched against SKU id,
/// code and barcode in that order; when nothing matches and `product_id` is
/// supplied, a minimal SKU is registered on the fly.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct StockInCommand {
    #[validate(length(min = 1, max = 100, message = "SKU or barcode is required"))]
    pub sku_or_barcode: String,
    pub product_id: Option<Uuid>,
    pub warehouse_id: Uuid,
    pub location_id: Option<Uuid>,
    #[validate(range(min = 1, message = "Quantity must be positive"))]
    pub quantity: i32,
    #[validate(length(max = 500))]
    pub reason: Option<String>,
    pub actor: Option<String>,
}

#[async_trait]
impl Command for StockInCommand {
    type Result = inventory_balance::Model;

    async fn execute(&self, engine: &InventoryEngine) -> Result<Self::Result, ServiceError> {
        engine.stock.stock_in(self).await
    }
}
