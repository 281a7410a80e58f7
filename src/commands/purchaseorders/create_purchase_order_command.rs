use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;
use validator::Validate;

use crate::{
    commands::Command, errors::ServiceError, services::receiving::PurchaseOrderView,
    InventoryEngine,
};

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreatePurchaseOrderCommand {
    #[validate(length(min = 1, max = 64, message = "PO number is required"))]
    pub po_number: String,
    #[validate(length(min = 1, max = 255, message = "Supplier is required"))]
    pub supplier: String,
    pub warehouse_id: Uuid,
    #[validate(length(min = 1, message = "At least one line is required"))]
    pub lines: Vec<PurchaseOrderLineRequest>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct PurchaseOrderLineRequest {
    pub sku_id: Uuid,
    #[validate(range(min = 1, message = "Expected quantity must be positive"))]
    pub expected_quantity: i32,
    pub unit_cost: Option<Decimal>,
}

impl CreatePurchaseOrderCommand {
    /// Validates the header, every line, and that no SKU appears twice.
    pub fn validate_all(&self) -> Result<(), ServiceError> {
        self.validate()?;
        let mut seen = HashSet::new();
        for line in &self.lines {
            line.validate()?;
            if !seen.insert(line.sku_id) {
                return Err(ServiceError::ValidationError(format!(
                    "SKU {} appears on more than one line",
                    line.sku_id
                )));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Command for CreatePurchaseOrderCommand {
    type Result = PurchaseOrderView;

    async fn execute(&self, engine: &InventoryEngine) -> Result<Self::Result, ServiceError> {
        engine.receiving.create_purchase_order(self).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(sku_id: Uuid) -> PurchaseOrderLineRequest {
        PurchaseOrderLineRequest {
            sku_id,
            expected_quantity: 5,
            unit_cost: None,
        }
    }

    #[test]
    fn duplicate_sku_lines_are_rejected() {
        let sku = Uuid::new_v4();
        let cmd = CreatePurchaseOrderCommand {
            po_number: "PO-1".into(),
            supplier: "Acme".into(),
            warehouse_id: Uuid::new_v4(),
            lines: vec![line(sku), line(sku)],
        };
        assert!(matches!(
            cmd.validate_all(),
            Err(ServiceError::ValidationError(_))
        ));
    }

    #[test]
    fn empty_order_is_rejected() {
        let cmd = CreatePurchaseOrderCommand {
            po_number: "PO-1".into(),
            supplier: "Acme".into(),
            warehouse_id: Uuid::new_v4(),
            lines: vec![],
        };
        assert!(cmd.validate_all().is_err());
    }
}
