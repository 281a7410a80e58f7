use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{commands::Command, entities::warehouse, errors::ServiceError, InventoryEngine};

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateWarehouseCommand {
    #[validate(length(min = 1, max = 32))]
    pub code: String,
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(length(max = 1000))]
    pub address: Option<String>,
}

#[async_trait]
impl Command for CreateWarehouseCommand {
    type Result = warehouse::Model;

    async fn execute(&self, engine: &InventoryEngine) -> Result<Self::Result, ServiceError> {
        engine.registry.create_warehouse(self).await
    }
}
