use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    IntoActiveModel, QueryFilter, QueryOrder, Set,
};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

use crate::{
    commands::{
        skus::{CreateSkuCommand, UpdateSkuCommand},
        warehouses::{CreateLocationCommand, CreateWarehouseCommand},
    },
    entities::{
        location::{self, Entity as LocationEntity},
        product::Entity as ProductEntity,
        sku::{self, Entity as SkuEntity, SkuStatus},
        warehouse::{self, Entity as WarehouseEntity},
    },
    errors::ServiceError,
};

/// Administrative registry for SKUs, warehouses and locations.
#[derive(Clone)]
pub struct RegistryService {
    db: Arc<DatabaseConnection>,
}

impl RegistryService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    #[instrument(skip(self, command), fields(code = %command.code))]
    pub async fn create_sku(&self, command: &CreateSkuCommand) -> Result<sku::Model, ServiceError> {
        command.validate()?;
        let db = &*self.db;

        if find_sku_by_code(db, &command.code).await?.is_some() {
            return Err(ServiceError::ValidationError(format!(
                "SKU code {} already exists",
                command.code
            )));
        }
        if let Some(barcode) = &command.barcode {
            if find_sku_by_barcode(db, barcode).await?.is_some() {
                return Err(ServiceError::ValidationError(format!(
                    "Barcode {} is already assigned",
                    barcode
                )));
            }
        }
        if let Some(product_id) = command.product_id {
            ensure_product_exists(db, product_id).await?;
        }

        let now = Utc::now();
        let model = sku::ActiveModel {
            id: Set(Uuid::new_v4()),
            code: Set(command.code.clone()),
            barcode: Set(command.barcode.clone()),
            product_id: Set(command.product_id),
            attributes: Set(serde_json::Value::Object(command.attributes.clone())),
            unit_of_measure: Set(command.unit_of_measure.clone()),
            minimum_stock_level: Set(command.minimum_stock_level),
            reorder_quantity: Set(command.reorder_quantity),
            status: Set(SkuStatus::Active),
            cost: Set(command.cost),
            weight_kg: Set(command.weight_kg),
            length_cm: Set(command.length_cm),
            width_cm: Set(command.width_cm),
            height_cm: Set(command.height_cm),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(db)
        .await
        .map_err(ServiceError::db_error)?;

        info!(sku_id = %model.id, "SKU created");
        Ok(model)
    }

    #[instrument(skip(self, command), fields(sku_id = %command.sku_id))]
    pub async fn update_sku_operational_fields(
        &self,
        command: &UpdateSkuCommand,
    ) -> Result<sku::Model, ServiceError> {
        command.validate()?;
        let db = &*self.db;

        let existing = find_sku(db, command.sku_id).await?;
        let mut active = existing.into_active_model();
        if let Some(level) = command.minimum_stock_level {
            active.minimum_stock_level = Set(level);
        }
        if let Some(quantity) = command.reorder_quantity {
            active.reorder_quantity = Set(quantity);
        }
        if let Some(status) = command.status {
            active.status = Set(status);
        }
        if command.cost.is_some() {
            active.cost = Set(command.cost);
        }
        if command.weight_kg.is_some() {
            active.weight_kg = Set(command.weight_kg);
        }
        active.updated_at = Set(Utc::now());

        let updated = active.update(db).await.map_err(ServiceError::db_error)?;
        info!(status = %updated.status, "SKU updated");
        Ok(updated)
    }

    #[instrument(skip(self, command), fields(code = %command.code))]
    pub async fn create_warehouse(
        &self,
        command: &CreateWarehouseCommand,
    ) -> Result<warehouse::Model, ServiceError> {
        command.validate()?;
        let db = &*self.db;

        let duplicate = WarehouseEntity::find()
            .filter(warehouse::Column::Code.eq(command.code.as_str()))
            .one(db)
            .await
            .map_err(ServiceError::db_error)?;
        if duplicate.is_some() {
            return Err(ServiceError::ValidationError(format!(
                "Warehouse code {} already exists",
                command.code
            )));
        }

        let now = Utc::now();
        let model = warehouse::ActiveModel {
            id: Set(Uuid::new_v4()),
            code: Set(command.code.clone()),
            name: Set(command.name.clone()),
            address: Set(command.address.clone()),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(db)
        .await
        .map_err(ServiceError::db_error)?;

        info!(warehouse_id = %model.id, "Warehouse created");
        Ok(model)
    }

    /// Soft-deactivates a warehouse. Its balances and ledger stay intact.
    #[instrument(skip(self))]
    pub async fn deactivate_warehouse(
        &self,
        warehouse_id: Uuid,
    ) -> Result<warehouse::Model, ServiceError> {
        let db = &*self.db;
        let existing = find_warehouse(db, warehouse_id).await?.ok_or_else(|| {
            ServiceError::NotFound(format!("Warehouse {} not found", warehouse_id))
        })?;

        let mut active = existing.into_active_model();
        active.is_active = Set(false);
        active.updated_at = Set(Utc::now());
        let updated = active.update(db).await.map_err(ServiceError::db_error)?;

        info!("Warehouse deactivated");
        Ok(updated)
    }

    #[instrument(skip(self, command), fields(warehouse_id = %command.warehouse_id, code = %command.code))]
    pub async fn create_location(
        &self,
        command: &CreateLocationCommand,
    ) -> Result<location::Model, ServiceError> {
        command.validate()?;
        let db = &*self.db;

        require_active_warehouse(db, command.warehouse_id).await?;

        let duplicate = LocationEntity::find()
            .filter(location::Column::WarehouseId.eq(command.warehouse_id))
            .filter(location::Column::Code.eq(command.code.as_str()))
            .one(db)
            .await
            .map_err(ServiceError::db_error)?;
        if duplicate.is_some() {
            return Err(ServiceError::ValidationError(format!(
                "Location {} already exists in warehouse {}",
                command.code, command.warehouse_id
            )));
        }

        let model = location::ActiveModel {
            id: Set(Uuid::new_v4()),
            warehouse_id: Set(command.warehouse_id),
            code: Set(command.code.clone()),
            location_type: Set(command.location_type),
            zone: Set(command.zone.clone()),
            aisle: Set(command.aisle.clone()),
            rack: Set(command.rack.clone()),
            shelf: Set(command.shelf.clone()),
            bin: Set(command.bin.clone()),
            is_active: Set(true),
            created_at: Set(Utc::now()),
        }
        .insert(db)
        .await
        .map_err(ServiceError::db_error)?;

        info!(location_id = %model.id, "Location created");
        Ok(model)
    }
}

// Lookups shared by the stock services. They take any connection so they
// can run inside an open transaction.

pub(crate) async fn find_sku<C: ConnectionTrait>(
    conn: &C,
    sku_id: Uuid,
) -> Result<sku::Model, ServiceError> {
    SkuEntity::find_by_id(sku_id)
        .one(conn)
        .await
        .map_err(ServiceError::db_error)?
        .ok_or_else(|| ServiceError::NotFound(format!("SKU {} not found", sku_id)))
}

pub(crate) async fn find_sku_by_code<C: ConnectionTrait>(
    conn: &C,
    code: &str,
) -> Result<Option<sku::Model>, ServiceError> {
    SkuEntity::find()
        .filter(sku::Column::Code.eq(code))
        .one(conn)
        .await
        .map_err(ServiceError::db_error)
}

pub(crate) async fn find_sku_by_barcode<C: ConnectionTrait>(
    conn: &C,
    barcode: &str,
) -> Result<Option<sku::Model>, ServiceError> {
    SkuEntity::find()
        .filter(sku::Column::Barcode.eq(barcode))
        .one(conn)
        .await
        .map_err(ServiceError::db_error)
}

/// First SKU of a product by code, used when an order line carries only
/// a product reference.
pub(crate) async fn find_sku_for_product<C: ConnectionTrait>(
    conn: &C,
    product_id: Uuid,
) -> Result<Option<sku::Model>, ServiceError> {
    SkuEntity::find()
        .filter(sku::Column::ProductId.eq(product_id))
        .order_by_asc(sku::Column::Code)
        .one(conn)
        .await
        .map_err(ServiceError::db_error)
}

pub(crate) async fn ensure_product_exists<C: ConnectionTrait>(
    conn: &C,
    product_id: Uuid,
) -> Result<(), ServiceError> {
    ProductEntity::find_by_id(product_id)
        .one(conn)
        .await
        .map_err(ServiceError::db_error)?
        .map(|_| ())
        .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", product_id)))
}

/// Registers a SKU whose code and barcode are both `token`, linked to an
/// existing product. Used when stock arrives for an unregistered barcode.
pub(crate) async fn insert_minimal_sku<C: ConnectionTrait>(
    conn: &C,
    token: &str,
    product_id: Uuid,
) -> Result<sku::Model, ServiceError> {
    let now = Utc::now();
    sku::ActiveModel {
        id: Set(Uuid::new_v4()),
        code: Set(token.to_string()),
        barcode: Set(Some(token.to_string())),
        product_id: Set(Some(product_id)),
        attributes: Set(serde_json::Value::Object(serde_json::Map::new())),
        unit_of_measure: Set("EA".to_string()),
        minimum_stock_level: Set(0),
        reorder_quantity: Set(0),
        status: Set(SkuStatus::Active),
        cost: Set(None),
        weight_kg: Set(None),
        length_cm: Set(None),
        width_cm: Set(None),
        height_cm: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(conn)
    .await
    .map_err(ServiceError::db_error)
}

pub(crate) async fn find_warehouse<C: ConnectionTrait>(
    conn: &C,
    warehouse_id: Uuid,
) -> Result<Option<warehouse::Model>, ServiceError> {
    WarehouseEntity::find_by_id(warehouse_id)
        .one(conn)
        .await
        .map_err(ServiceError::db_error)
}

pub(crate) async fn require_active_warehouse<C: ConnectionTrait>(
    conn: &C,
    warehouse_id: Uuid,
) -> Result<warehouse::Model, ServiceError> {
    let warehouse = find_warehouse(conn, warehouse_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Warehouse {} not found", warehouse_id)))?;
    if !warehouse.is_active {
        return Err(ServiceError::ValidationError(format!(
            "Warehouse {} is inactive",
            warehouse.code
        )));
    }
    Ok(warehouse)
}

/// Resolves an optional location and checks it is an active bin of
/// `warehouse_id`.
pub(crate) async fn require_location<C: ConnectionTrait>(
    conn: &C,
    warehouse_id: Uuid,
    location_id: Option<Uuid>,
) -> Result<Option<location::Model>, ServiceError> {
    let Some(location_id) = location_id else {
        return Ok(None);
    };
    let location = LocationEntity::find_by_id(location_id)
        .one(conn)
        .await
        .map_err(ServiceError::db_error)?
        .ok_or_else(|| ServiceError::NotFound(format!("Location {} not found", location_id)))?;
    if location.warehouse_id != warehouse_id {
        return Err(ServiceError::ValidationError(format!(
            "Location {} does not belong to warehouse {}",
            location.code, warehouse_id
        )));
    }
    if !location.is_active {
        return Err(ServiceError::ValidationError(format!(
            "Location {} is inactive",
            location.code
        )));
    }
    Ok(Some(location))
}
