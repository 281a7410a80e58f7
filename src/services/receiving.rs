use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    IntoActiveModel, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

use crate::{
    commands::purchaseorders::{CreatePurchaseOrderCommand, ReceivePurchaseOrderItemCommand},
    db::retry_on_conflict,
    entities::{
        inventory_balance,
        purchase_order::{self, Entity as PurchaseOrderEntity, PurchaseOrderStatus},
        purchase_order_item::{self, Entity as PurchaseOrderItemEntity},
        stock_movement::SourceType,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    repositories::balance_repository::SlotKey,
    services::{
        registry,
        stock::{receive_into_slot, Inbound},
        stock_sync::StockSyncService,
    },
};

/// A purchase order with its lines.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchaseOrderView {
    pub purchase_order: purchase_order::Model,
    pub items: Vec<purchase_order_item::Model>,
}

/// Everything a PO receipt touched, as committed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiptResult {
    pub purchase_order: purchase_order::Model,
    pub line: purchase_order_item::Model,
    pub balance: inventory_balance::Model,
}

/// Purchase-order lifecycle and receipt.
///
/// A receipt updates the PO line, the PO status and the destination
/// balance, and appends the IN ledger row, all in one transaction.
#[derive(Clone)]
pub struct PurchaseOrderService {
    db: Arc<DatabaseConnection>,
    sync: StockSyncService,
    event_sender: EventSender,
    retry_limit: u32,
}

impl PurchaseOrderService {
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

    #[instrument(skip(self, command), fields(po_number = %command.po_number))]
    pub async fn create_purchase_order(
        &self,
        command: &CreatePurchaseOrderCommand,
    ) -> Result<PurchaseOrderView, ServiceError> {
        command.validate_all()?;
        let txn = self.db.begin().await.map_err(ServiceError::db_error)?;

        registry::require_active_warehouse(&txn, command.warehouse_id).await?;
        let duplicate = PurchaseOrderEntity::find()
            .filter(purchase_order::Column::PoNumber.eq(command.po_number.as_str()))
            .one(&txn)
            .await
            .map_err(ServiceError::db_error)?;
        if duplicate.is_some() {
            return Err(ServiceError::ValidationError(format!(
                "Purchase order {} already exists",
                command.po_number
            )));
        }

        let now = Utc::now();
        let purchase_order = purchase_order::ActiveModel {
            id: Set(Uuid::new_v4()),
            po_number: Set(command.po_number.clone()),
            supplier: Set(command.supplier.clone()),
            warehouse_id: Set(command.warehouse_id),
            status: Set(PurchaseOrderStatus::Created),
            version: Set(0),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await
        .map_err(ServiceError::db_error)?;

        let mut items = Vec::with_capacity(command.lines.len());
        for line in &command.lines {
            registry::find_sku(&txn, line.sku_id).await?;
            let item = purchase_order_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                purchase_order_id: Set(purchase_order.id),
                sku_id: Set(line.sku_id),
                expected_quantity: Set(line.expected_quantity),
                received_quantity: Set(0),
                unit_cost: Set(line.unit_cost),
            }
            .insert(&txn)
            .await
            .map_err(ServiceError::db_error)?;
            items.push(item);
        }

        txn.commit().await.map_err(ServiceError::db_error)?;
        info!(purchase_order_id = %purchase_order.id, lines = items.len(), "Purchase order created");
        Ok(PurchaseOrderView {
            purchase_order,
            items,
        })
    }

    pub async fn get_purchase_order(
        &self,
        purchase_order_id: Uuid,
    ) -> Result<PurchaseOrderView, ServiceError> {
        let db = &*self.db;
        let purchase_order = find_purchase_order(db, purchase_order_id).await?;
        let items = load_items(db, purchase_order_id).await?;
        Ok(PurchaseOrderView {
            purchase_order,
            items,
        })
    }

    /// Only a PO nothing has been received against can be cancelled.
    #[instrument(skip(self))]
    pub async fn cancel_purchase_order(
        &self,
        purchase_order_id: Uuid,
    ) -> Result<purchase_order::Model, ServiceError> {
        let db = &*self.db;
        let existing = find_purchase_order(db, purchase_order_id).await?;
        if existing.status != PurchaseOrderStatus::Created {
            return Err(ServiceError::InvalidOperation(format!(
                "Purchase order {} is {} and cannot be cancelled",
                existing.po_number, existing.status
            )));
        }

        let updated = bump_purchase_order(db, &existing, PurchaseOrderStatus::Cancelled).await?;
        info!("Purchase order cancelled");
        Ok(updated)
    }

    #[instrument(skip(self, command), fields(purchase_order_id = %command.purchase_order_id, sku_id = %command.sku_id, quantity = command.quantity))]
    pub async fn receive_po_item(
        &self,
        command: &ReceivePurchaseOrderItemCommand,
    ) -> Result<ReceiptResult, ServiceError> {
        command.validate()?;

        let receipt = retry_on_conflict("receive_po_item", self.retry_limit, move || {
            self.receive_once(command)
        })
        .await?;

        info!(
            status = %receipt.purchase_order.status,
            received = receipt.line.received_quantity,
            "Purchase order line received"
        );
        self.sync.sync_sku(command.sku_id).await;
        self.event_sender
            .send_or_log(Event::PurchaseOrderItemReceived {
                purchase_order_id: receipt.purchase_order.id,
                sku_id: command.sku_id,
                quantity: command.quantity,
                status: receipt.purchase_order.status.to_string(),
            });
        Ok(receipt)
    }

    async fn receive_once(
        &self,
        command: &ReceivePurchaseOrderItemCommand,
    ) -> Result<ReceiptResult, ServiceError> {
        let txn = self.db.begin().await.map_err(ServiceError::db_error)?;

        let purchase_order = find_purchase_order(&txn, command.purchase_order_id).await?;
        if purchase_order.status == PurchaseOrderStatus::Cancelled {
            return Err(ServiceError::InvalidOperation(format!(
                "Purchase order {} is cancelled",
                purchase_order.po_number
            )));
        }
        if purchase_order.warehouse_id != command.warehouse_id {
            return Err(ServiceError::ValidationError(format!(
                "Purchase order {} is destined for a different warehouse",
                purchase_order.po_number
            )));
        }

        let mut items = load_items(&txn, purchase_order.id).await?;
        let line = items
            .iter_mut()
            .find(|item| item.sku_id == command.sku_id)
            .ok_or_else(|| {
                ServiceError::NotFound(format!(
                    "Purchase order {} has no line for SKU {}",
                    purchase_order.po_number, command.sku_id
                ))
            })?;

        let sku = registry::find_sku(&txn, command.sku_id).await?;
        registry::require_active_warehouse(&txn, command.warehouse_id).await?;
        registry::require_location(&txn, command.warehouse_id, command.location_id).await?;

        let received = line.received_quantity.checked_add(command.quantity).ok_or_else(|| {
            ServiceError::ValidationError("Receipt overflows the line".to_string())
        })?;
        if received > line.expected_quantity {
            warn!(
                expected = line.expected_quantity,
                received, "Over-receipt on purchase order line"
            );
        }
        let mut active_line = line.clone().into_active_model();
        active_line.received_quantity = Set(received);
        let line = active_line
            .update(&txn)
            .await
            .map_err(ServiceError::db_error)?;
        if let Some(slot) = items.iter_mut().find(|item| item.id == line.id) {
            *slot = line.clone();
        }

        let status = PurchaseOrderStatus::from_lines(
            items
                .iter()
                .map(|item| (item.received_quantity, item.expected_quantity)),
        );
        let purchase_order = bump_purchase_order(&txn, &purchase_order, status).await?;

        let balance = receive_into_slot(
            &txn,
            &sku,
            SlotKey::new(sku.id, command.warehouse_id, command.location_id),
            command.quantity,
            Inbound {
                source_type: SourceType::PurchaseOrder,
                source_id: Some(purchase_order.id.to_string()),
                reason: Some(format!("Receipt against {}", purchase_order.po_number)),
                actor: command.actor.clone(),
            },
        )
        .await?;

        txn.commit().await.map_err(ServiceError::db_error)?;
        Ok(ReceiptResult {
            purchase_order,
            line,
            balance,
        })
    }
}

async fn find_purchase_order<C: ConnectionTrait>(
    conn: &C,
    purchase_order_id: Uuid,
) -> Result<purchase_order::Model, ServiceError> {
    PurchaseOrderEntity::find_by_id(purchase_order_id)
        .one(conn)
        .await
        .map_err(ServiceError::db_error)?
        .ok_or_else(|| {
            ServiceError::NotFound(format!("Purchase order {} not found", purchase_order_id))
        })
}

async fn load_items<C: ConnectionTrait>(
    conn: &C,
    purchase_order_id: Uuid,
) -> Result<Vec<purchase_order_item::Model>, ServiceError> {
    PurchaseOrderItemEntity::find()
        .filter(purchase_order_item::Column::PurchaseOrderId.eq(purchase_order_id))
        .order_by_asc(purchase_order_item::Column::Id)
        .all(conn)
        .await
        .map_err(ServiceError::db_error)
}

/// Writes `status` if the PO is still at the version that was read.
/// Concurrent receipts against one PO serialize on this update.
async fn bump_purchase_order<C: ConnectionTrait>(
    conn: &C,
    current: &purchase_order::Model,
    status: PurchaseOrderStatus,
) -> Result<purchase_order::Model, ServiceError> {
    let now = Utc::now();
    let result = PurchaseOrderEntity::update_many()
        .col_expr(purchase_order::Column::Status, Expr::value(status))
        .col_expr(
            purchase_order::Column::Version,
            Expr::value(current.version + 1),
        )
        .col_expr(purchase_order::Column::UpdatedAt, Expr::value(now))
        .filter(purchase_order::Column::Id.eq(current.id))
        .filter(purchase_order::Column::Version.eq(current.version))
        .exec(conn)
        .await
        .map_err(ServiceError::db_error)?;

    if result.rows_affected == 0 {
        return Err(ServiceError::ConcurrentModification(current.id));
    }

    Ok(purchase_order::Model {
        status,
        version: current.version + 1,
        updated_at: now,
        ..current.clone()
    })
}

