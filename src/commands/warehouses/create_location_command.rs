use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::{
    commands::Command,
    entities::location::{self, LocationType},
    errors::ServiceError,
    InventoryEngine,
};

/// Adds a bin to a warehouse. The hierarchy fields are descriptive only.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateLocationCommand {
    pub warehouse_id: Uuid,
    #[validate(length(min = 1, max = 64))]
    pub code: String,
    pub location_type: LocationType,
    pub zone: Option<String>,
    pub aisle: Option<String>,
    pub rack: Option<String>,
    pub shelf: Option<String>,
    pub bin: Option<String>,
}

#[async_trait]
impl Command for CreateLocationCommand {
    type Result = location::Model;

    async fn execute(&self, engine: &InventoryEngine) -> Result<Self::Result, ServiceError> {
        engine.registry.create_location(self).await
    }
}
