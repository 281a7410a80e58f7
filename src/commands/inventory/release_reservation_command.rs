use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::{
    commands::Command, entities::inventory_balance, errors::ServiceError, InventoryEngine,
};

/// Gives back reserved stock, e.g. when an order is cancelled.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ReleaseReservationCommand {
    pub balance_id: Uuid,
    #[validate(range(min = 1, message = "Quantity must be positive"))]
    pub quantity: i32,
    #[validate(length(min = 1, max = 64))]
    pub order_ref: String,
}

#[async_trait]
impl Command for ReleaseReservationCommand {
    type Result = inventory_balance::Model;

    async fn execute(&self, engine: &InventoryEngine) -> Result<Self::Result, ServiceError> {
        engine.reservations.release_reservation(self).await
    }
}
