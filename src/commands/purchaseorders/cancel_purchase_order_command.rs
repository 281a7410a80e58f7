use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    commands::Command, entities::purchase_order, errors::ServiceError, InventoryEngine,
};

/// Cancels a purchase order that has not received anything yet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelPurchaseOrderCommand {
    pub purchase_order_id: Uuid,
}

#[async_trait]
impl Command for CancelPurchaseOrderCommand {
    type Result = purchase_order::Model;

    async fn execute(&self, engine: &InventoryEngine) -> Result<Self::Result, ServiceError> {
        engine
            .receiving
            .cancel_purchase_order(self.purchase_order_id)
            .await
    }
}
