use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, EntityTrait,
    IntoActiveModel, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

use crate::{
    commands::{inventory::StockOutCommand, picking::ConfirmPickCommand},
    db::retry_on_conflict,
    entities::{
        inventory_balance::{self, Entity as InventoryBalance},
        location::{Entity as LocationEntity, LocationType},
        order::{
            self, Entity as OrderEntity, FulfillmentStatus, OrderStatus, PaymentMethod,
            PaymentStatus,
        },
        order_item::{self, Entity as OrderItemEntity},
        sku,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::{registry, stock::StockService, stock_sync::StockSyncService},
};

/// Rank given to warehouse-level rows, after every bin type.
const WAREHOUSE_LEVEL_RANK: u8 = 4;

/// One place a picker can take stock from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationSuggestion {
    pub balance_id: Uuid,
    pub warehouse_id: Uuid,
    pub location_id: Option<Uuid>,
    pub location_code: Option<String>,
    pub location_type: Option<LocationType>,
    pub quantity: i32,
    pub available: i32,
}

impl LocationSuggestion {
    fn rank(&self) -> u8 {
        self.location_type
            .map(|t| t.pick_rank())
            .unwrap_or(WAREHOUSE_LEVEL_RANK)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PickLine {
    pub item: order_item::Model,
    /// `None` when neither the line's SKU code nor its product resolves
    pub sku: Option<sku::Model>,
    pub suggestions: Vec<LocationSuggestion>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PickDetails {
    pub order: order::Model,
    pub lines: Vec<PickLine>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PickConfirmation {
    pub order_item: order_item::Model,
    pub balance: inventory_balance::Model,
    pub fulfillment_status: FulfillmentStatus,
}

/// Sorts pick candidates: pick faces first, then reserve, staging, dock
/// and warehouse-level rows; within a type the fullest bin first, then
/// location code and balance id so the order is total.
pub fn rank_suggestions(suggestions: &mut [LocationSuggestion]) {
    suggestions.sort_by(|a, b| {
        (a.rank(), Reverse(a.available), &a.location_code, a.balance_id).cmp(&(
            b.rank(),
            Reverse(b.available),
            &b.location_code,
            b.balance_id,
        ))
    });
}

/// Outbound picking against external orders.
#[derive(Clone)]
pub struct PickingService {
    db: Arc<DatabaseConnection>,
    stock: StockService,
    sync: StockSyncService,
    event_sender: EventSender,
    retry_limit: u32,
}

impl PickingService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        stock: StockService,
        sync: StockSyncService,
        event_sender: EventSender,
        retry_limit: u32,
    ) -> Self {
        Self {
            db,
            stock,
            sync,
            event_sender,
            retry_limit,
        }
    }

    /// Paid or cash-on-delivery orders, commercially open and not fully
    /// picked. Newest first.
    #[instrument(skip(self))]
    pub async fn list_fulfillable_orders(&self) -> Result<Vec<order::Model>, ServiceError> {
        OrderEntity::find()
            .filter(
                Condition::any()
                    .add(order::Column::PaymentStatus.eq(PaymentStatus::Paid))
                    .add(order::Column::PaymentMethod.eq(PaymentMethod::CashOnDelivery)),
            )
            .filter(
                order::Column::Status.is_in([OrderStatus::Pending, OrderStatus::Processing]),
            )
            .filter(order::Column::FulfillmentStatus.is_in([
                FulfillmentStatus::Unfulfilled,
                FulfillmentStatus::Picking,
            ]))
            .order_by_desc(order::Column::CreatedAt)
            .all(&*self.db)
            .await
            .map_err(ServiceError::db_error)
    }

    #[instrument(skip(self))]
    pub async fn get_pick_details(&self, order_id: Uuid) -> Result<PickDetails, ServiceError> {
        let db = &*self.db;
        let order = find_order(db, order_id).await?;
        let items = OrderItemEntity::find()
            .filter(order_item::Column::OrderId.eq(order_id))
            .order_by_asc(order_item::Column::Name)
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;

        let mut lines = Vec::with_capacity(items.len());
        for item in items {
            let sku = resolve_line_sku(db, &item).await?;
            let suggestions = match &sku {
                Some(sku) => self.suggest_locations(sku.id).await?,
                None => Vec::new(),
            };
            lines.push(PickLine {
                item,
                sku,
                suggestions,
            });
        }

        Ok(PickDetails { order, lines })
    }

    async fn suggest_locations(
        &self,
        sku_id: Uuid,
    ) -> Result<Vec<LocationSuggestion>, ServiceError> {
        let rows = InventoryBalance::find()
            .filter(inventory_balance::Column::SkuId.eq(sku_id))
            .filter(inventory_balance::Column::Quantity.gt(0))
            .find_also_related(LocationEntity)
            .all(&*self.db)
            .await
            .map_err(ServiceError::db_error)?;

        let mut suggestions: Vec<LocationSuggestion> = rows
            .into_iter()
            .filter(|(_, location)| {
                location
                    .as_ref()
                    .map_or(true, |l| l.location_type.is_pickable())
            })
            .map(|(balance, location)| LocationSuggestion {
                balance_id: balance.id,
                warehouse_id: balance.warehouse_id,
                location_id: balance.location_id,
                location_code: location.as_ref().map(|l| l.code.clone()),
                location_type: location.as_ref().map(|l| l.location_type),
                quantity: balance.quantity,
                available: balance.available(),
            })
            .collect();
        rank_suggestions(&mut suggestions);
        Ok(suggestions)
    }

    /// Issues picked stock against the order and records pick progress on
    /// the line, in one transaction. The order id is the reservation
    /// release reference.
    #[instrument(skip(self, command), fields(order_id = %command.order_id, order_item_id = %command.order_item_id, quantity = command.quantity))]
    pub async fn confirm_pick(
        &self,
        command: &ConfirmPickCommand,
    ) -> Result<PickConfirmation, ServiceError> {
        command.validate()?;

        let (confirmation, issue) =
            retry_on_conflict("confirm_pick", self.retry_limit, move || {
                self.confirm_pick_once(command)
            })
            .await?;

        info!(
            fulfillment_status = %confirmation.fulfillment_status,
            picked = confirmation.order_item.picked_quantity,
            "Pick confirmed"
        );
        self.sync.sync_sku(issue.sku_id).await;
        self.event_sender.send_or_log(Event::StockIssued {
            sku_id: issue.sku_id,
            warehouse_id: issue.warehouse_id,
            location_id: issue.location_id,
            quantity: issue.quantity,
            released_reservation: issue.released,
            order_ref: Some(command.order_id.to_string()),
        });
        self.event_sender.send_or_log(Event::PickConfirmed {
            order_id: command.order_id,
            order_item_id: command.order_item_id,
            quantity: command.quantity,
            fulfillment_status: confirmation.fulfillment_status.to_string(),
        });
        Ok(confirmation)
    }

    async fn confirm_pick_once(
        &self,
        command: &ConfirmPickCommand,
    ) -> Result<(PickConfirmation, PickIssue), ServiceError> {
        let txn = self.db.begin().await.map_err(ServiceError::db_error)?;

        let order = find_order(&txn, command.order_id).await?;
        if !order.is_fulfillable() {
            return Err(ServiceError::InvalidOperation(format!(
                "Order {} is not open for picking",
                order.order_number
            )));
        }
        let item = OrderItemEntity::find_by_id(command.order_item_id)
            .one(&txn)
            .await
            .map_err(ServiceError::db_error)?
            .filter(|item| item.order_id == order.id)
            .ok_or_else(|| {
                ServiceError::NotFound(format!(
                    "Order {} has no item {}",
                    order.order_number, command.order_item_id
                ))
            })?;
        if command.quantity > item.outstanding() {
            return Err(ServiceError::ValidationError(format!(
                "Cannot pick {} of {}: only {} outstanding",
                command.quantity,
                item.name,
                item.outstanding()
            )));
        }
        let sku = resolve_line_sku(&txn, &item).await?.ok_or_else(|| {
            ServiceError::ValidationError(format!(
                "Order item {} does not resolve to a SKU",
                item.id
            ))
        })?;

        if let Some(location) =
            registry::require_location(&txn, command.warehouse_id, command.location_id).await?
        {
            if !location.location_type.is_pickable() {
                return Err(ServiceError::InvalidOperation(format!(
                    "Location {} is {} and cannot be picked from",
                    location.code, location.location_type
                )));
            }
        }

        let issued = self
            .stock
            .stock_out_in_txn(
                &txn,
                &StockOutCommand {
                    sku_id: sku.id,
                    warehouse_id: command.warehouse_id,
                    location_id: command.location_id,
                    quantity: command.quantity,
                    reason: Some(format!("Picked for order {}", order.order_number)),
                    order_ref: Some(order.id.to_string()),
                    actor: command.actor.clone(),
                },
            )
            .await?;

        let picked = item.picked_quantity + command.quantity;
        let result = OrderItemEntity::update_many()
            .col_expr(order_item::Column::PickedQuantity, Expr::value(picked))
            .filter(order_item::Column::Id.eq(item.id))
            .filter(order_item::Column::PickedQuantity.eq(item.picked_quantity))
            .exec(&txn)
            .await
            .map_err(ServiceError::db_error)?;
        if result.rows_affected == 0 {
            return Err(ServiceError::ConcurrentModification(item.id));
        }
        let order_item = order_item::Model {
            picked_quantity: picked,
            ..item
        };

        let lines = OrderItemEntity::find()
            .filter(order_item::Column::OrderId.eq(order.id))
            .all(&txn)
            .await
            .map_err(ServiceError::db_error)?;
        let fulfillment_status = if lines.iter().all(|line| line.outstanding() == 0) {
            FulfillmentStatus::Picked
        } else {
            FulfillmentStatus::Picking
        };
        if order.fulfillment_status != fulfillment_status {
            let mut active = order.into_active_model();
            active.fulfillment_status = Set(fulfillment_status);
            active.updated_at = Set(Utc::now());
            active.update(&txn).await.map_err(ServiceError::db_error)?;
        }

        txn.commit().await.map_err(ServiceError::db_error)?;

        let issue = PickIssue {
            sku_id: sku.id,
            warehouse_id: command.warehouse_id,
            location_id: command.location_id,
            quantity: command.quantity,
            released: issued.released,
        };
        Ok((
            PickConfirmation {
                order_item,
                balance: issued.balance,
                fulfillment_status,
            },
            issue,
        ))
    }
}

/// What left the shelf, for post-commit sync and events.
struct PickIssue {
    sku_id: Uuid,
    warehouse_id: Uuid,
    location_id: Option<Uuid>,
    quantity: i32,
    released: i32,
}

async fn find_order<C: ConnectionTrait>(
    conn: &C,
    order_id: Uuid,
) -> Result<order::Model, ServiceError> {
    OrderEntity::find_by_id(order_id)
        .one(conn)
        .await
        .map_err(ServiceError::db_error)?
        .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))
}

/// An explicit SKU code wins over the product link.
async fn resolve_line_sku<C: ConnectionTrait>(
    conn: &C,
    item: &order_item::Model,
) -> Result<Option<sku::Model>, ServiceError> {
    if let Some(code) = &item.sku_code {
        if let Some(sku) = registry::find_sku_by_code(conn, code).await? {
            return Ok(Some(sku));
        }
    }
    match item.product_id {
        Some(product_id) => registry::find_sku_for_product(conn, product_id).await,
        None => Ok(None),
    }
}
