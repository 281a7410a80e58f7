use crate::{errors::ServiceError, InventoryEngine};
use async_trait::async_trait;

/// Command trait for implementing the Command Pattern
///
/// A command is a validated request object. Executing it dispatches to the
/// owning engine service, which runs the operation inside its own
/// transaction and publishes events after commit.
#[async_trait]
pub trait Command: Send + Sync {
    /// The return type of the command when executed successfully
    type Result;

    async fn execute(&self, engine: &InventoryEngine) -> Result<Self::Result, ServiceError>;
}

pub mod inventory;
pub mod picking;
pub mod purchaseorders;
pub mod skus;
pub mod warehouses;
