use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::{
    commands::Command, entities::inventory_balance, errors::ServiceError, InventoryEngine,
};

/// Earmarks stock for a newly placed order.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ReserveStockCommand {
    pub order_id: Uuid,
    pub sku_id: Uuid,
    #[validate(range(min = 1, message = "Quantity must be positive"))]
    pub quantity: i32,
}

#[async_trait]
impl Command for ReserveStockCommand {
    type Result = inventory_balance::Model;

    async fn execute(&self, engine: &InventoryEngine) -> Result<Self::Result, ServiceError> {
        engine.reservations.reserve_for_order(self).await
    }
}
