use sea_orm::{DatabaseConnection, DatabaseTransaction, TransactionTrait};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

use crate::{
    commands::inventory::{
        AdjustStockCommand, StockInCommand, StockOutCommand, TransferStockCommand,
    },
    db::retry_on_conflict,
    entities::{
        inventory_balance,
        sku,
        stock_movement::{MovementType, SourceType},
    },
    errors::ServiceError,
    events::{Event, EventSender},
    repositories::{
        balance_repository::{self, SlotKey},
        movement_repository::{self, NewMovement},
    },
    services::{registry, stock_sync::StockSyncService},
};

/// Both sides of a committed transfer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferResult {
    /// Shared `source_id` of the two TRANSFER ledger rows
    pub transfer_id: Uuid,
    pub source: inventory_balance::Model,
    pub destination: inventory_balance::Model,
}

/// Result of a stock-out performed inside a caller's transaction.
#[derive(Debug, Clone)]
pub(crate) struct IssuedStock {
    pub balance: inventory_balance::Model,
    pub released: i32,
}

/// Ledger attribution for an inbound movement.
#[derive(Debug, Clone)]
pub(crate) struct Inbound {
    pub source_type: SourceType,
    pub source_id: Option<String>,
    pub reason: Option<String>,
    pub actor: Option<String>,
}

/// Direct stock operations: Stock-In, Stock-Out, Adjust and Transfer.
///
/// Each operation runs in its own transaction that updates the balance
/// projection and appends the ledger together. Lost version races re-run
/// the whole transaction; the catalog mirror is refreshed after commit.
#[derive(Clone)]
pub struct StockService {
    db: Arc<DatabaseConnection>,
    sync: StockSyncService,
    event_sender: EventSender,
    retry_limit: u32,
}

impl StockService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        sync: StockSyncService,
        event_sender: EventSender,
        retry_limit: u32,
    ) -> Self {
        Self {
            db,
            sync,
            event_sender,
            retry_limit,
        }
    }

    #[instrument(skip(self, command), fields(sku = %command.sku_or_barcode, warehouse_id = %command.warehouse_id, quantity = command.quantity))]
    pub async fn stock_in(
        &self,
        command: &StockInCommand,
    ) -> Result<inventory_balance::Model, ServiceError> {
        command.validate()?;

        let balance =
            retry_on_conflict("stock_in", self.retry_limit, move || self.stock_in_once(command))
                .await?;

        info!(new_quantity = balance.quantity, "Stock received");
        self.sync.sync_sku(balance.sku_id).await;
        self.event_sender.send_or_log(Event::StockReceived {
            sku_id: balance.sku_id,
            warehouse_id: balance.warehouse_id,
            location_id: balance.location_id,
            quantity: command.quantity,
            new_quantity: balance.quantity,
        });
        Ok(balance)
    }

    async fn stock_in_once(
        &self,
        command: &StockInCommand,
    ) -> Result<inventory_balance::Model, ServiceError> {
        let txn = self.db.begin().await.map_err(ServiceError::db_error)?;

        let sku = self.resolve_inbound_sku(&txn, command).await?;
        let warehouse = registry::find_warehouse(&txn, command.warehouse_id)
            .await?
            .ok_or_else(|| {
                ServiceError::ValidationError(format!(
                    "Warehouse {} could not be resolved",
                    command.warehouse_id
                ))
            })?;
        if !warehouse.is_active {
            return Err(ServiceError::ValidationError(format!(
                "Warehouse {} is inactive",
                warehouse.code
            )));
        }
        registry::require_location(&txn, warehouse.id, command.location_id).await?;

        let balance = receive_into_slot(
            &txn,
            &sku,
            SlotKey::new(sku.id, warehouse.id, command.location_id),
            command.quantity,
            Inbound {
                source_type: SourceType::Manual,
                source_id: None,
                reason: command.reason.clone(),
                actor: command.actor.clone(),
            },
        )
        .await?;

        txn.commit().await.map_err(ServiceError::db_error)?;
        Ok(balance)
    }

    /// Matches the token against SKU id, code and barcode. Registers a
    /// minimal SKU when nothing matches and a product link is supplied.
    async fn resolve_inbound_sku(
        &self,
        txn: &DatabaseTransaction,
        command: &StockInCommand,
    ) -> Result<sku::Model, ServiceError> {
        let token = command.sku_or_barcode.trim();

        if let Ok(sku_id) = Uuid::parse_str(token) {
            if let Some(sku) = not_found_as_none(registry::find_sku(txn, sku_id).await)? {
                return Ok(sku);
            }
        }
        if let Some(sku) = registry::find_sku_by_code(txn, token).await? {
            return Ok(sku);
        }
        if let Some(sku) = registry::find_sku_by_barcode(txn, token).await? {
            return Ok(sku);
        }

        match command.product_id {
            Some(product_id) => {
                registry::ensure_product_exists(txn, product_id).await?;
                let sku = registry::insert_minimal_sku(txn, token, product_id).await?;
                info!(sku_id = %sku.id, %product_id, "Registered SKU on first receipt");
                Ok(sku)
            }
            None => Err(ServiceError::ValidationError(format!(
                "SKU or barcode {} could not be resolved",
                token
            ))),
        }
    }

    #[instrument(skip(self, command), fields(sku_id = %command.sku_id, warehouse_id = %command.warehouse_id, quantity = command.quantity))]
    pub async fn stock_out(
        &self,
        command: &StockOutCommand,
    ) -> Result<inventory_balance::Model, ServiceError> {
        command.validate()?;

        let issued = retry_on_conflict("stock_out", self.retry_limit, move || async move {
            let txn = self.db.begin().await.map_err(ServiceError::db_error)?;
            let issued = self.stock_out_in_txn(&txn, command).await?;
            txn.commit().await.map_err(ServiceError::db_error)?;
            Ok(issued)
        })
        .await?;

        info!(
            new_quantity = issued.balance.quantity,
            released = issued.released,
            "Stock issued"
        );
        self.sync.sync_sku(command.sku_id).await;
        self.event_sender.send_or_log(Event::StockIssued {
            sku_id: command.sku_id,
            warehouse_id: command.warehouse_id,
            location_id: command.location_id,
            quantity: command.quantity,
            released_reservation: issued.released,
            order_ref: command.order_ref.clone(),
        });
        Ok(issued.balance)
    }

    /// Stock-Out against an open transaction; the caller commits.
    ///
    /// With an order reference the row's reservation is consumed first, so
    /// the request gates on on-hand quantity and releases
    /// `min(reserved, quantity)`. Without one, only unreserved stock may
    /// leave.
    pub(crate) async fn stock_out_in_txn(
        &self,
        txn: &DatabaseTransaction,
        command: &StockOutCommand,
    ) -> Result<IssuedStock, ServiceError> {
        let sku = registry::find_sku(txn, command.sku_id).await?;
        if !sku.status.accepts_outbound() {
            return Err(ServiceError::ValidationError(format!(
                "SKU {} is {} and cannot be issued",
                sku.code, sku.status
            )));
        }
        registry::require_active_warehouse(txn, command.warehouse_id).await?;
        registry::require_location(txn, command.warehouse_id, command.location_id).await?;

        let key = SlotKey::new(sku.id, command.warehouse_id, command.location_id);
        let balance = balance_repository::find_slot(txn, key)
            .await?
            .ok_or_else(|| {
                ServiceError::InsufficientStock(format!(
                    "SKU {} has no stock at the requested location",
                    sku.code
                ))
            })?;

        let issuable = if command.order_ref.is_some() {
            balance.quantity
        } else {
            balance.available()
        };
        if issuable < command.quantity {
            return Err(ServiceError::InsufficientStock(format!(
                "SKU {}: requested {}, available {}",
                sku.code, command.quantity, issuable
            )));
        }

        let released = if command.order_ref.is_some() {
            balance.reserved.min(command.quantity)
        } else {
            0
        };
        let updated = balance_repository::apply(
            txn,
            &balance,
            balance.quantity - command.quantity,
            balance.reserved - released,
        )
        .await?;

        let source_type = if command.order_ref.is_some() {
            SourceType::SalesOrder
        } else {
            SourceType::Manual
        };
        movement_repository::append(
            txn,
            NewMovement {
                slot: key,
                movement_type: MovementType::Out,
                quantity: command.quantity,
                reason: command.reason.clone(),
                source_type,
                source_id: command.order_ref.clone(),
                actor: command.actor.clone(),
            },
        )
        .await?;

        Ok(IssuedStock {
            balance: updated,
            released,
        })
    }

    #[instrument(skip(self, command), fields(sku_id = %command.sku_id, warehouse_id = %command.warehouse_id, delta = command.delta))]
    pub async fn adjust(
        &self,
        command: &AdjustStockCommand,
    ) -> Result<inventory_balance::Model, ServiceError> {
        command.validate()?;

        let balance =
            retry_on_conflict("adjust", self.retry_limit, move || self.adjust_once(command))
                .await?;

        info!(new_quantity = balance.quantity, "Stock adjusted");
        self.sync.sync_sku(command.sku_id).await;
        self.event_sender.send_or_log(Event::StockAdjusted {
            sku_id: command.sku_id,
            warehouse_id: command.warehouse_id,
            location_id: command.location_id,
            delta: command.delta,
            new_quantity: balance.quantity,
            reason: command.reason.clone(),
        });
        Ok(balance)
    }

    async fn adjust_once(
        &self,
        command: &AdjustStockCommand,
    ) -> Result<inventory_balance::Model, ServiceError> {
        let txn = self.db.begin().await.map_err(ServiceError::db_error)?;

        let sku = registry::find_sku(&txn, command.sku_id).await?;
        registry::require_active_warehouse(&txn, command.warehouse_id).await?;
        registry::require_location(&txn, command.warehouse_id, command.location_id).await?;

        let key = SlotKey::new(sku.id, command.warehouse_id, command.location_id);
        let balance = match balance_repository::find_slot(&txn, key).await? {
            Some(existing) => existing,
            None if command.delta > 0 => balance_repository::find_or_create_slot(&txn, key).await?,
            None => {
                return Err(ServiceError::NotFound(format!(
                    "No balance for SKU {} at the requested location",
                    sku.code
                )))
            }
        };

        let new_quantity = balance.quantity.checked_add(command.delta).ok_or_else(|| {
            ServiceError::ValidationError("Adjustment overflows the balance".to_string())
        })?;
        if new_quantity < 0 {
            return Err(ServiceError::NegativeStock(format!(
                "Adjusting SKU {} by {} would leave {} on hand",
                sku.code, command.delta, new_quantity
            )));
        }
        let new_reserved = balance.reserved.min(new_quantity);
        if new_reserved < balance.reserved {
            warn!(
                balance_id = %balance.id,
                reserved = balance.reserved,
                new_quantity,
                "Adjustment leaves less stock than reserved; clamping reservation"
            );
        }

        let updated = balance_repository::apply(&txn, &balance, new_quantity, new_reserved).await?;
        movement_repository::append(
            &txn,
            NewMovement {
                slot: key,
                movement_type: MovementType::Adjust,
                quantity: command.delta,
                reason: Some(command.reason.clone()),
                source_type: SourceType::Manual,
                source_id: None,
                actor: command.actor.clone(),
            },
        )
        .await?;

        txn.commit().await.map_err(ServiceError::db_error)?;
        Ok(updated)
    }

    #[instrument(skip(self, command), fields(sku_id = %command.sku_id, quantity = command.quantity))]
    pub async fn transfer(
        &self,
        command: &TransferStockCommand,
    ) -> Result<TransferResult, ServiceError> {
        command.validate()?;
        if command.is_same_slot() {
            return Err(ServiceError::ValidationError(
                "Transfer source and destination are the same slot".to_string(),
            ));
        }

        let result =
            retry_on_conflict("transfer", self.retry_limit, move || self.transfer_once(command))
                .await?;

        info!(transfer_id = %result.transfer_id, "Stock transferred");
        self.sync.sync_sku(command.sku_id).await;
        self.event_sender.send_or_log(Event::StockTransferred {
            sku_id: command.sku_id,
            from_warehouse_id: command.from_warehouse_id,
            from_location_id: command.from_location_id,
            to_warehouse_id: command.to_warehouse_id,
            to_location_id: command.to_location_id,
            quantity: command.quantity,
        });
        Ok(result)
    }

    /// Decrement source, upsert-and-increment destination, two ledger rows,
    /// one commit. Any error drops the transaction and nothing is visible.
    async fn transfer_once(
        &self,
        command: &TransferStockCommand,
    ) -> Result<TransferResult, ServiceError> {
        let txn = self.db.begin().await.map_err(ServiceError::db_error)?;

        let sku = registry::find_sku(&txn, command.sku_id).await?;
        if !sku.status.accepts_outbound() {
            return Err(ServiceError::ValidationError(format!(
                "SKU {} is {} and cannot be moved",
                sku.code, sku.status
            )));
        }
        registry::require_active_warehouse(&txn, command.from_warehouse_id).await?;
        registry::require_location(&txn, command.from_warehouse_id, command.from_location_id)
            .await?;
        registry::require_active_warehouse(&txn, command.to_warehouse_id).await?;
        let destination =
            registry::require_location(&txn, command.to_warehouse_id, command.to_location_id)
                .await?;
        if let Some(location) = &destination {
            if !location.location_type.is_putaway_destination() {
                return Err(ServiceError::ValidationError(format!(
                    "Location {} is a {} location and cannot receive put-away",
                    location.code, location.location_type
                )));
            }
        }

        let from_key = SlotKey::new(sku.id, command.from_warehouse_id, command.from_location_id);
        let to_key = SlotKey::new(sku.id, command.to_warehouse_id, command.to_location_id);

        let source = balance_repository::find_slot(&txn, from_key)
            .await?
            .ok_or_else(|| {
                ServiceError::InsufficientStock(format!(
                    "SKU {} has no stock at the transfer source",
                    sku.code
                ))
            })?;
        if source.available() < command.quantity {
            return Err(ServiceError::InsufficientStock(format!(
                "SKU {}: requested {}, available {} at source",
                sku.code,
                command.quantity,
                source.available()
            )));
        }
        let source = balance_repository::apply(
            &txn,
            &source,
            source.quantity - command.quantity,
            source.reserved,
        )
        .await?;

        let target = balance_repository::find_or_create_slot(&txn, to_key).await?;
        let target_quantity = target.quantity.checked_add(command.quantity).ok_or_else(|| {
            ServiceError::ValidationError("Transfer overflows the destination".to_string())
        })?;
        let destination =
            balance_repository::apply(&txn, &target, target_quantity, target.reserved).await?;

        let transfer_id = Uuid::new_v4();
        for (slot, quantity) in [(from_key, -command.quantity), (to_key, command.quantity)] {
            movement_repository::append(
                &txn,
                NewMovement {
                    slot,
                    movement_type: MovementType::Transfer,
                    quantity,
                    reason: command.reason.clone(),
                    source_type: SourceType::Transfer,
                    source_id: Some(transfer_id.to_string()),
                    actor: command.actor.clone(),
                },
            )
            .await?;
        }

        txn.commit().await.map_err(ServiceError::db_error)?;
        Ok(TransferResult {
            transfer_id,
            source,
            destination,
        })
    }
}

/// Upserts the slot, adds `quantity` and appends the matching IN row.
/// Shared by Stock-In and purchase-order receipt.
pub(crate) async fn receive_into_slot(
    txn: &DatabaseTransaction,
    sku: &sku::Model,
    key: SlotKey,
    quantity: i32,
    inbound: Inbound,
) -> Result<inventory_balance::Model, ServiceError> {
    if !sku.status.accepts_inbound() {
        return Err(ServiceError::ValidationError(format!(
            "SKU {} is {} and cannot receive stock",
            sku.code, sku.status
        )));
    }

    let balance = balance_repository::find_or_create_slot(txn, key).await?;
    let new_quantity = balance.quantity.checked_add(quantity).ok_or_else(|| {
        ServiceError::ValidationError("Receipt overflows the balance".to_string())
    })?;
    let updated = balance_repository::apply(txn, &balance, new_quantity, balance.reserved).await?;

    movement_repository::append(
        txn,
        NewMovement {
            slot: key,
            movement_type: MovementType::In,
            quantity,
            reason: inbound.reason,
            source_type: inbound.source_type,
            source_id: inbound.source_id,
            actor: inbound.actor,
        },
    )
    .await?;

    Ok(updated)
}

/// Treats a missing row as "keep looking"; any other failure propagates.
fn not_found_as_none<T>(result: Result<T, ServiceError>) -> Result<Option<T>, ServiceError> {
    match result {
        Ok(found) => Ok(Some(found)),
        Err(ServiceError::NotFound(_)) => Ok(None),
        Err(err) => Err(err),
    }
}
