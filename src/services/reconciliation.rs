use sea_orm::{DatabaseConnection, EntityTrait, QueryOrder};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info, instrument};
use uuid::Uuid;

use crate::{
    entities::inventory_balance::{self, location_key, Entity as InventoryBalance},
    errors::ServiceError,
    repositories::{
        balance_repository::{self, SlotKey},
        movement_repository,
    },
};

/// A slot whose cached balance disagrees with its ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerMismatch {
    /// `None` for ledger history with no balance row at all
    pub balance_id: Option<Uuid>,
    pub sku_id: Uuid,
    pub warehouse_id: Uuid,
    pub location_id: Option<Uuid>,
    pub balance_quantity: i64,
    pub ledger_sum: i64,
}

/// Verifies balances against the ledger. Mismatches are reported, never
/// repaired.
#[derive(Clone)]
pub struct ReconciliationService {
    db: Arc<DatabaseConnection>,
}

impl ReconciliationService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    #[instrument(skip(self))]
    pub async fn verify_balance(
        &self,
        sku_id: Uuid,
        warehouse_id: Uuid,
        location_id: Option<Uuid>,
    ) -> Result<inventory_balance::Model, ServiceError> {
        let db = &*self.db;
        let slot = SlotKey::new(sku_id, warehouse_id, location_id);
        let balance = balance_repository::find_slot(db, slot)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound("No balance for the requested slot".to_string())
            })?;

        let ledger_sum = movement_repository::ledger_sum(db, slot).await?;
        if ledger_sum != i64::from(balance.quantity) {
            error!(
                balance_id = %balance.id,
                balance_quantity = balance.quantity,
                ledger_sum,
                "Balance diverges from ledger"
            );
            return Err(ServiceError::ReconciliationError(format!(
                "Balance {} holds {} but its ledger sums to {}",
                balance.id, balance.quantity, ledger_sum
            )));
        }
        Ok(balance)
    }

    /// Compares every balance row with its ledger sum, and flags ledger
    /// history whose balance row is missing.
    #[instrument(skip(self))]
    pub async fn audit_ledger(&self) -> Result<Vec<LedgerMismatch>, ServiceError> {
        let db = &*self.db;
        let mut ledger: HashMap<(Uuid, Uuid, String), i64> =
            movement_repository::ledger_sums_by_slot(db)
                .await?
                .into_iter()
                .map(|(sku, warehouse, key, sum)| ((sku, warehouse, key), sum))
                .collect();

        let balances = InventoryBalance::find()
            .order_by_asc(inventory_balance::Column::SkuId)
            .order_by_asc(inventory_balance::Column::WarehouseId)
            .order_by_asc(inventory_balance::Column::LocationKey)
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;

        let checked = balances.len();
        let mut mismatches = Vec::new();
        for balance in balances {
            let key = (
                balance.sku_id,
                balance.warehouse_id,
                location_key(balance.location_id),
            );
            let ledger_sum = ledger.remove(&key).unwrap_or(0);
            if ledger_sum != i64::from(balance.quantity) {
                mismatches.push(LedgerMismatch {
                    balance_id: Some(balance.id),
                    sku_id: balance.sku_id,
                    warehouse_id: balance.warehouse_id,
                    location_id: balance.location_id,
                    balance_quantity: i64::from(balance.quantity),
                    ledger_sum,
                });
            }
        }

        // a slot whose history nets to zero needs no row
        let orphans = ledger.into_iter().filter(|(_, sum)| *sum != 0);
        for ((sku_id, warehouse_id, key), ledger_sum) in orphans {
            mismatches.push(LedgerMismatch {
                balance_id: None,
                sku_id,
                warehouse_id,
                location_id: Uuid::parse_str(&key).ok(),
                balance_quantity: 0,
                ledger_sum,
            });
        }

        for mismatch in &mismatches {
            error!(
                sku_id = %mismatch.sku_id,
                warehouse_id = %mismatch.warehouse_id,
                balance_quantity = mismatch.balance_quantity,
                ledger_sum = mismatch.ledger_sum,
                "Ledger mismatch"
            );
        }
        info!(checked, mismatches = mismatches.len(), "Ledger audit finished");
        Ok(mismatches)
    }
}
