use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

use crate::{
    commands::inventory::{ReleaseReservationCommand, ReserveStockCommand},
    db::retry_on_conflict,
    entities::{
        inventory_balance::{self, Entity as InventoryBalance},
        location::Entity as LocationEntity,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    repositories::balance_repository,
    services::registry,
};

/// Answer to "can this order be placed?".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Availability {
    pub sku_id: Uuid,
    pub requested: i32,
    pub available: i64,
    pub sufficient: bool,
}

/// Reservation accounting on balance rows. Reservations never move stock,
/// so nothing here writes to the ledger.
#[derive(Clone)]
pub struct ReservationService {
    db: Arc<DatabaseConnection>,
    event_sender: EventSender,
    retry_limit: u32,
}

impl ReservationService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: EventSender, retry_limit: u32) -> Self {
        Self {
            db,
            event_sender,
            retry_limit,
        }
    }

    /// Reserves on the single row with the most available stock. The
    /// reservation is not split across rows.
    #[instrument(skip(self, command), fields(order_id = %command.order_id, sku_id = %command.sku_id, quantity = command.quantity))]
    pub async fn reserve_for_order(
        &self,
        command: &ReserveStockCommand,
    ) -> Result<inventory_balance::Model, ServiceError> {
        command.validate()?;

        let balance = retry_on_conflict("reserve_for_order", self.retry_limit, move || async move {
            let txn = self.db.begin().await.map_err(ServiceError::db_error)?;
            let sku = registry::find_sku(&txn, command.sku_id).await?;

            let best = reservable_rows(&txn, sku.id)
                .await?
                .into_iter()
                .max_by_key(|row| (row.available(), Reverse(row.id)))
                .filter(|row| row.available() >= command.quantity)
                .ok_or_else(|| {
                    ServiceError::InsufficientStock(format!(
                        "No single location holds {} available units of SKU {}",
                        command.quantity, sku.code
                    ))
                })?;

            let updated = balance_repository::apply(
                &txn,
                &best,
                best.quantity,
                best.reserved + command.quantity,
            )
            .await?;
            txn.commit().await.map_err(ServiceError::db_error)?;
            Ok(updated)
        })
        .await?;

        info!(balance_id = %balance.id, reserved = balance.reserved, "Stock reserved");
        self.event_sender.send_or_log(Event::InventoryReserved {
            order_id: command.order_id,
            sku_id: command.sku_id,
            balance_id: balance.id,
            quantity: command.quantity,
        });
        Ok(balance)
    }

    /// Gives back reserved units, e.g. on order cancellation.
    #[instrument(skip(self, command), fields(balance_id = %command.balance_id, quantity = command.quantity))]
    pub async fn release_reservation(
        &self,
        command: &ReleaseReservationCommand,
    ) -> Result<inventory_balance::Model, ServiceError> {
        command.validate()?;

        let balance =
            retry_on_conflict("release_reservation", self.retry_limit, move || async move {
                let txn = self.db.begin().await.map_err(ServiceError::db_error)?;
                let current = balance_repository::find_by_id(&txn, command.balance_id)
                    .await?
                    .ok_or_else(|| {
                        ServiceError::NotFound(format!(
                            "Balance {} not found",
                            command.balance_id
                        ))
                    })?;
                if command.quantity > current.reserved {
                    return Err(ServiceError::ValidationError(format!(
                        "Cannot release {} units; only {} reserved",
                        command.quantity, current.reserved
                    )));
                }

                let updated = balance_repository::apply(
                    &txn,
                    &current,
                    current.quantity,
                    current.reserved - command.quantity,
                )
                .await?;
                txn.commit().await.map_err(ServiceError::db_error)?;
                Ok(updated)
            })
            .await?;

        info!(reserved = balance.reserved, "Reservation released");
        self.event_sender.send_or_log(Event::ReservationReleased {
            balance_id: balance.id,
            quantity: command.quantity,
            order_ref: command.order_ref.clone(),
        });
        Ok(balance)
    }

    /// Sums available stock over every sellable row of the SKU.
    #[instrument(skip(self))]
    pub async fn check_availability(
        &self,
        sku_id: Uuid,
        quantity: i32,
    ) -> Result<Availability, ServiceError> {
        let db = &*self.db;
        registry::find_sku(db, sku_id).await?;
        let available: i64 = reservable_rows(db, sku_id)
            .await?
            .iter()
            .map(|row| i64::from(row.available()))
            .sum();

        Ok(Availability {
            sku_id,
            requested: quantity,
            available,
            sufficient: available >= i64::from(quantity),
        })
    }
}

/// Balance rows of the SKU outside damaged bins.
async fn reservable_rows<C: ConnectionTrait>(
    conn: &C,
    sku_id: Uuid,
) -> Result<Vec<inventory_balance::Model>, ServiceError> {
    let rows = InventoryBalance::find()
        .filter(inventory_balance::Column::SkuId.eq(sku_id))
        .find_also_related(LocationEntity)
        .all(conn)
        .await
        .map_err(ServiceError::db_error)?;

    Ok(rows
        .into_iter()
        .filter(|(_, location)| {
            location
                .as_ref()
                .map_or(true, |l| l.location_type.is_pickable())
        })
        .map(|(balance, _)| balance)
        .collect())
}
