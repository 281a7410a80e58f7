#![allow(dead_code)]

use std::sync::Arc;

use chrono::Utc;
use inventory_engine::{
    commands::{
        inventory::{StockInCommand, StockOutCommand, TransferStockCommand},
        skus::CreateSkuCommand,
        warehouses::{CreateLocationCommand, CreateWarehouseCommand},
        Command,
    },
    config::AppConfig,
    db::{self, DbPool},
    entities::{
        inventory_balance,
        location::{self, LocationType},
        order::{self, FulfillmentStatus, OrderStatus, PaymentMethod, PaymentStatus},
        order_item, product, sku, stock_movement, warehouse,
    },
    events::{Event, EventSender},
    repositories::{balance_repository, balance_repository::SlotKey},
    services::stock_sync::CatalogStockWriter,
    InventoryEngine,
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseBackend, EntityTrait, QueryFilter,
    Set, Statement,
};
use tempfile::TempDir;
use tokio::sync::mpsc;
use uuid::Uuid;

/// An engine over a fresh SQLite database.
///
/// The default harness is in-memory with exactly one pooled connection so
/// the database lives as long as the harness. `file_backed` opens a real
/// file with several connections so writers genuinely contend.
pub struct TestEngine {
    pub engine: InventoryEngine,
    pub db: Arc<DbPool>,
    pub events: mpsc::Receiver<Event>,
    _dir: Option<TempDir>,
}

pub fn test_config() -> AppConfig {
    let mut cfg = AppConfig::new("sqlite::memory:".to_string(), "test".to_string());
    cfg.db_max_connections = 1;
    cfg.db_min_connections = 1;
    cfg.event_channel_capacity = 10_000;
    cfg
}

impl TestEngine {
    pub async fn new() -> Self {
        Self::build(test_config(), None, None).await
    }

    pub async fn with_catalog_writer(writer: Arc<dyn CatalogStockWriter>) -> Self {
        Self::build(test_config(), Some(writer), None).await
    }

    /// A database file in a temporary directory behind a pool of
    /// `connections`, retrying conflicts up to `retry_limit` times.
    pub async fn file_backed(connections: u32, retry_limit: u32) -> Self {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("inventory.db");
        let mut cfg = test_config();
        cfg.database_url = format!("sqlite://{}?mode=rwc", path.display());
        cfg.db_max_connections = connections;
        cfg.conflict_retry_limit = retry_limit;
        Self::build(cfg, None, Some(dir)).await
    }

    async fn build(
        cfg: AppConfig,
        writer: Option<Arc<dyn CatalogStockWriter>>,
        dir: Option<TempDir>,
    ) -> Self {
        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to open test database");
        db::run_migrations(&pool).await.expect("migrations failed");

        let db = Arc::new(pool);
        let (sender, events) = EventSender::channel(cfg.event_channel_capacity);
        let engine = match writer {
            Some(writer) => InventoryEngine::with_catalog_writer(db.clone(), &cfg, sender, writer),
            None => InventoryEngine::new(db.clone(), &cfg, sender),
        };

        Self {
            engine,
            db,
            events,
            _dir: dir,
        }
    }

    pub fn drain_events(&mut self) -> Vec<Event> {
        let mut drained = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            drained.push(event);
        }
        drained
    }

    pub async fn execute_sql(&self, sql: &str) {
        self.db
            .execute(Statement::from_string(DatabaseBackend::Sqlite, sql.to_string()))
            .await
            .expect("raw SQL failed");
    }

    pub async fn product(&self, name: &str) -> product::Model {
        self.product_with_id(Uuid::new_v4(), name).await
    }

    pub async fn product_with_id(&self, id: Uuid, name: &str) -> product::Model {
        let now = Utc::now();
        product::ActiveModel {
            id: Set(id),
            name: Set(name.to_string()),
            barcode: Set(None),
            image_url: Set(None),
            stock: Set(0),
            count_in_stock: Set(0),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.db)
        .await
        .expect("product insert")
    }

    pub async fn reload_product(&self, id: Uuid) -> product::Model {
        product::Entity::find_by_id(id)
            .one(&*self.db)
            .await
            .unwrap()
            .expect("product exists")
    }

    pub async fn warehouse(&self, code: &str) -> warehouse::Model {
        CreateWarehouseCommand {
            code: code.to_string(),
            name: format!("Warehouse {}", code),
            address: None,
        }
        .execute(&self.engine)
        .await
        .expect("warehouse")
    }

    pub async fn location(
        &self,
        warehouse_id: Uuid,
        code: &str,
        location_type: LocationType,
    ) -> location::Model {
        CreateLocationCommand {
            warehouse_id,
            code: code.to_string(),
            location_type,
            zone: None,
            aisle: None,
            rack: None,
            shelf: None,
            bin: None,
        }
        .execute(&self.engine)
        .await
        .expect("location")
    }

    pub async fn sku(&self, code: &str) -> sku::Model {
        CreateSkuCommand::new(code)
            .execute(&self.engine)
            .await
            .expect("sku")
    }

    pub async fn sku_with(&self, command: CreateSkuCommand) -> sku::Model {
        command.execute(&self.engine).await.expect("sku")
    }

    pub async fn stock_in(
        &self,
        sku_id: Uuid,
        warehouse_id: Uuid,
        location_id: Option<Uuid>,
        quantity: i32,
    ) -> inventory_balance::Model {
        StockInCommand {
            sku_or_barcode: sku_id.to_string(),
            product_id: None,
            warehouse_id,
            location_id,
            quantity,
            reason: Some("seed".to_string()),
            actor: Some("tester".to_string()),
        }
        .execute(&self.engine)
        .await
        .expect("stock in")
    }

    pub fn stock_out_command(
        &self,
        sku_id: Uuid,
        warehouse_id: Uuid,
        location_id: Option<Uuid>,
        quantity: i32,
    ) -> StockOutCommand {
        StockOutCommand {
            sku_id,
            warehouse_id,
            location_id,
            quantity,
            reason: None,
            order_ref: None,
            actor: None,
        }
    }

    pub fn transfer_command(
        &self,
        sku_id: Uuid,
        from: (Uuid, Option<Uuid>),
        to: (Uuid, Option<Uuid>),
        quantity: i32,
    ) -> TransferStockCommand {
        TransferStockCommand {
            sku_id,
            from_warehouse_id: from.0,
            from_location_id: from.1,
            to_warehouse_id: to.0,
            to_location_id: to.1,
            quantity,
            reason: Some("relocation".to_string()),
            actor: None,
        }
    }

    pub async fn balance(
        &self,
        sku_id: Uuid,
        warehouse_id: Uuid,
        location_id: Option<Uuid>,
    ) -> Option<inventory_balance::Model> {
        balance_repository::find_slot(&*self.db, SlotKey::new(sku_id, warehouse_id, location_id))
            .await
            .unwrap()
    }

    pub async fn movements_for_sku(&self, sku_id: Uuid) -> Vec<stock_movement::Model> {
        stock_movement::Entity::find()
            .filter(stock_movement::Column::SkuId.eq(sku_id))
            .all(&*self.db)
            .await
            .unwrap()
    }

    pub async fn total_for_sku(&self, sku_id: Uuid) -> i64 {
        balance_repository::total_on_hand(&*self.db, &[sku_id])
            .await
            .unwrap()
    }

    /// Inserts a paid order with one line per `(sku_code, quantity)`.
    pub async fn paid_order(
        &self,
        number: &str,
        lines: &[(&str, i32)],
    ) -> (order::Model, Vec<order_item::Model>) {
        self.order(number, PaymentStatus::Paid, PaymentMethod::Card, lines)
            .await
    }

    pub async fn order(
        &self,
        number: &str,
        payment_status: PaymentStatus,
        payment_method: PaymentMethod,
        lines: &[(&str, i32)],
    ) -> (order::Model, Vec<order_item::Model>) {
        let now = Utc::now();
        let order = order::ActiveModel {
            id: Set(Uuid::new_v4()),
            order_number: Set(number.to_string()),
            status: Set(OrderStatus::Pending),
            payment_status: Set(payment_status),
            payment_method: Set(payment_method),
            fulfillment_status: Set(FulfillmentStatus::Unfulfilled),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.db)
        .await
        .expect("order insert");

        let mut items = Vec::new();
        for (code, quantity) in lines {
            let item = order_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                order_id: Set(order.id),
                product_id: Set(None),
                sku_code: Set(Some(code.to_string())),
                name: Set(format!("Item {}", code)),
                quantity: Set(*quantity),
                picked_quantity: Set(0),
            }
            .insert(&*self.db)
            .await
            .expect("order item insert");
            items.push(item);
        }
        (order, items)
    }

    pub async fn reload_order(&self, id: Uuid) -> order::Model {
        order::Entity::find_by_id(id)
            .one(&*self.db)
            .await
            .unwrap()
            .expect("order exists")
    }
}
