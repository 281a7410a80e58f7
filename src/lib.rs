//! Warehouse inventory and stock movement engine.
//!
//! Tracks on-hand and reserved quantity per SKU across warehouses and bin
//! locations, records every change in an append-only ledger, and keeps the
//! catalog's denormalized stock total in step.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod commands;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod metrics;
pub mod repositories;
pub mod services;

use std::sync::Arc;

use crate::{
    config::AppConfig,
    db::DbPool,
    events::EventSender,
    services::{
        inventory_query::InventoryQueryService,
        picking::PickingService,
        receiving::PurchaseOrderService,
        reconciliation::ReconciliationService,
        registry::RegistryService,
        reservations::ReservationService,
        stock::StockService,
        stock_sync::{CatalogStockWriter, SeaOrmCatalogWriter, StockSyncService},
    },
};

/// Every engine service, wired to one pool and one event channel.
#[derive(Clone)]
pub struct InventoryEngine {
    pub registry: RegistryService,
    pub stock: StockService,
    pub receiving: PurchaseOrderService,
    pub picking: PickingService,
    pub reservations: ReservationService,
    pub query: InventoryQueryService,
    pub reconciliation: ReconciliationService,
    pub sync: StockSyncService,
}

impl InventoryEngine {
    /// Builds the engine with the catalog mirror written straight to the
    /// `products` table.
    pub fn new(db: Arc<DbPool>, config: &AppConfig, event_sender: EventSender) -> Self {
        let writer = Arc::new(SeaOrmCatalogWriter::new(db.clone()));
        Self::with_catalog_writer(db, config, event_sender, writer)
    }

    pub fn with_catalog_writer(
        db: Arc<DbPool>,
        config: &AppConfig,
        event_sender: EventSender,
        writer: Arc<dyn CatalogStockWriter>,
    ) -> Self {
        let retry_limit = config.conflict_retry_limit;
        let sync = StockSyncService::new(db.clone(), writer, event_sender.clone());
        let stock = StockService::new(db.clone(), sync.clone(), event_sender.clone(), retry_limit);

        Self {
            registry: RegistryService::new(db.clone()),
            receiving: PurchaseOrderService::new(
                db.clone(),
                sync.clone(),
                event_sender.clone(),
                retry_limit,
            ),
            picking: PickingService::new(
                db.clone(),
                stock.clone(),
                sync.clone(),
                event_sender.clone(),
                retry_limit,
            ),
            reservations: ReservationService::new(db.clone(), event_sender, retry_limit),
            query: InventoryQueryService::new(db.clone(), config.recent_movements_limit),
            reconciliation: ReconciliationService::new(db),
            stock,
            sync,
        }
    }
}
