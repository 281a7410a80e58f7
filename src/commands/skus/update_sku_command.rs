use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::{
    commands::Command,
    entities::sku::{self, SkuStatus},
    errors::ServiceError,
    InventoryEngine,
};

/// Changes operational fields only. Code, barcode and product link are
/// fixed once the SKU exists.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdateSkuCommand {
    pub sku_id: Uuid,
    #[validate(range(min = 0))]
    pub minimum_stock_level: Option<i32>,
    #[validate(range(min = 0))]
    pub reorder_quantity: Option<i32>,
    pub status: Option<SkuStatus>,
    pub cost: Option<Decimal>,
    pub weight_kg: Option<Decimal>,
}

#[async_trait]
impl Command for UpdateSkuCommand {
    type Result = sku::Model;

    async fn execute(&self, engine: &InventoryEngine) -> Result<Self::Result, ServiceError> {
        engine.registry.update_sku_operational_fields(self).await
    }
}
