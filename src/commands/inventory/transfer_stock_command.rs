use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::{
    commands::Command, errors::ServiceError, services::stock::TransferResult, InventoryEngine,
};

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct TransferStockCommand {
    pub sku_id: Uuid,
    pub from_warehouse_id: Uuid,
    pub from_location_id: Option<Uuid>,
    pub to_warehouse_id: Uuid,
    pub to_location_id: Option<Uuid>,
    #[validate(range(min = 1, message = "Quantity must be positive"))]
    pub quantity: i32,
    #[validate(length(max = 500))]
    pub reason: Option<String>,
    pub actor: Option<String>,
}

impl TransferStockCommand {
    pub fn is_same_slot(&self) -> bool {
        self.from_warehouse_id == self.to_warehouse_id && self.from_location_id == self.to_location_id
    }
}

#[async_trait]
impl Command for TransferStockCommand {
    type Result = TransferResult;

    async fn execute(&self, engine: &InventoryEngine) -> Result<Self::Result, ServiceError> {
        engine.stock.transfer(self).await
    }
}
