use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::{commands::Command, entities::sku, errors::ServiceError, InventoryEngine};

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateSkuCommand {
    #[validate(length(min = 1, max = 100, message = "SKU code must be between 1 and 100 characters"))]
    pub code: String,
    #[validate(length(min = 1, max = 100))]
    pub barcode: Option<String>,
    pub product_id: Option<Uuid>,
    /// Variant attributes such as size or color
    #[serde(default)]
    pub attributes: serde_json::Map<String, serde_json::Value>,
    #[validate(length(min = 1, max = 16))]
    pub unit_of_measure: String,
    #[validate(range(min = 0))]
    pub minimum_stock_level: i32,
    #[validate(range(min = 0))]
    pub reorder_quantity: i32,
    pub cost: Option<Decimal>,
    pub weight_kg: Option<Decimal>,
    pub length_cm: Option<Decimal>,
    pub width_cm: Option<Decimal>,
    pub height_cm: Option<Decimal>,
}

impl CreateSkuCommand {
    /// Minimal command with defaults for every operational field.
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            barcode: None,
            product_id: None,
            attributes: serde_json::Map::new(),
            unit_of_measure: "EA".to_string(),
            minimum_stock_level: 0,
            reorder_quantity: 0,
            cost: None,
            weight_kg: None,
            length_cm: None,
            width_cm: None,
            height_cm: None,
        }
    }
}

#[async_trait]
impl Command for CreateSkuCommand {
    type Result = sku::Model;

    async fn execute(&self, engine: &InventoryEngine) -> Result<Self::Result, ServiceError> {
        engine.registry.create_sku(self).await
    }
}
