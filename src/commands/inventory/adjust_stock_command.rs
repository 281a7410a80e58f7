use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::{
    commands::Command, entities::inventory_balance, errors::ServiceError, InventoryEngine,
};

/// Signed correction to on-hand stock (cycle count, damage write-off).
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AdjustStockCommand {
    pub sku_id: Uuid,
    pub warehouse_id: Uuid,
    pub location_id: Option<Uuid>,
    #[validate(custom = "validate_non_zero")]
    pub delta: i32,
    #[validate(length(min = 1, max = 500, message = "Adjustment reason is required"))]
    pub reason: String,
    pub actor: Option<String>,
}

fn validate_non_zero(delta: i32) -> Result<(), ValidationError> {
    if delta == 0 {
        let mut err = ValidationError::new("delta");
        err.message = Some("Adjustment delta cannot be zero".into());
        return Err(err);
    }
    Ok(())
}

#[async_trait]
impl Command for AdjustStockCommand {
    type Result = inventory_balance::Model;

    async fn execute(&self, engine: &InventoryEngine) -> Result<Self::Result, ServiceError> {
        engine.stock.adjust(self).await
    }
}
