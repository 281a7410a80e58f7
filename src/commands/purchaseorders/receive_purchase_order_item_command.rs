use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::{
    commands::Command, errors::ServiceError, services::receiving::ReceiptResult,
    InventoryEngine,
};

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ReceivePurchaseOrderItemCommand {
    pub purchase_order_id: Uuid,
    pub sku_id: Uuid,
    #[validate(range(min = 1, message = "Quantity must be positive"))]
    pub quantity: i32,
    pub warehouse_id: Uuid,
    pub location_id: Option<Uuid>,
    pub actor: Option<String>,
}

#[async_trait]
impl Command for ReceivePurchaseOrderItemCommand {
    type Result = ReceiptResult;

    async fn execute(&self, engine: &InventoryEngine) -> Result<Self::Result, ServiceError> {
        engine.receiving.receive_po_item(self).await
    }
}
