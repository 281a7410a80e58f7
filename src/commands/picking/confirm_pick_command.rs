use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::{
    commands::Command, errors::ServiceError, services::picking::PickConfirmation,
    InventoryEngine,
};

/// Confirms that `quantity` units of an order line were taken from a slot.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ConfirmPickCommand {
    pub order_id: Uuid,
    pub order_item_id: Uuid,
    pub warehouse_id: Uuid,
    pub location_id: Option<Uuid>,
    #[validate(range(min = 1, message = "Quantity must be positive"))]
    pub quantity: i32,
    pub actor: Option<String>,
}

#[async_trait]
impl Command for ConfirmPickCommand {
    type Result = PickConfirmation;

    async fn execute(&self, engine: &InventoryEngine) -> Result<Self::Result, ServiceError> {
        engine.picking.confirm_pick(self).await
    }
}
