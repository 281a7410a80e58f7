use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::{
    commands::Command, entities::inventory_balance, errors::ServiceError, InventoryEngine,
};

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct StockOutCommand {
    pub sku_id: Uuid,
    pub warehouse_id: Uuid,
    pub location_id: Option<Uuid>,
    #[validate(range(min = 1, message = "Quantity must be positive"))]
    pub quantity: i32,
    #[validate(length(max = 500))]
    pub reason: Option<String>,
    /// Order the stock leaves for. Releases up to `quantity` of the
    /// slot's reservation.
    #[validate(length(min = 1, max = 64))]
    pub order_ref: Option<String>,
    pub actor: Option<String>,
}

#[async_trait]
impl Command for StockOutCommand {
    type Result = inventory_balance::Model;

    async fn execute(&self, engine: &InventoryEngine) -> Result<Self::Result, ServiceError> {
        engine.stock.stock_out(self).await
    }
}
