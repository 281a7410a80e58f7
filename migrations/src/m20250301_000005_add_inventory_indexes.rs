use sea_orm_migration::prelude::*;

use super::m20250301_000001_create_catalog_reference_tables::{OrderItems, Orders};
use super::m20250301_000002_create_sku_and_location_tables::Skus;
use super::m20250301_000003_create_inventory_ledger_tables::{InventoryBalances, StockMovements};
use super::m20250301_000004_create_purchase_order_tables::PurchaseOrderItems;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Ledger replay for one slot (reconciliation, snapshots)
        manager
            .create_index(
                Index::create()
                    .name("idx_stock_movements_slot_created")
                    .table(StockMovements::Table)
                    .col(StockMovements::SkuId)
                    .col(StockMovements::WarehouseId)
                    .col(StockMovements::LocationKey)
                    .col(StockMovements::CreatedAt)
                    .to_owned(),
            )
            .await?;

        // Attribution lookups, e.g. all movements for one purchase order
        manager
            .create_index(
                Index::create()
                    .name("idx_stock_movements_source")
                    .table(StockMovements::Table)
                    .col(StockMovements::SourceType)
                    .col(StockMovements::SourceId)
                    .to_owned(),
            )
            .await?;

        // Pick suggestions scan every row of a warehouse
        manager
            .create_index(
                Index::create()
                    .name("idx_inventory_balances_warehouse")
                    .table(InventoryBalances::Table)
                    .col(InventoryBalances::WarehouseId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_skus_product_id")
                    .table(Skus::Table)
                    .col(Skus::ProductId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_purchase_order_items_po_sku")
                    .table(PurchaseOrderItems::Table)
                    .col(PurchaseOrderItems::PurchaseOrderId)
                    .col(PurchaseOrderItems::SkuId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_orders_created_status")
                    .table(Orders::Table)
                    .col((Orders::CreatedAt, IndexOrder::Desc))
                    .col(Orders::Status)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_order_items_order_id")
                    .table(OrderItems::Table)
                    .col(OrderItems::OrderId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_order_items_order_id")
                    .table(OrderItems::Table)
                    .to_owned(),
            )
            .await?;
        manager
            .drop_index(
                Index::drop()
                    .name("idx_orders_created_status")
                    .table(Orders::Table)
                    .to_owned(),
            )
            .await?;
        manager
            .drop_index(
                Index::drop()
                    .name("idx_purchase_order_items_po_sku")
                    .table(PurchaseOrderItems::Table)
                    .to_owned(),
            )
            .await?;
        manager
            .drop_index(
                Index::drop()
                    .name("idx_skus_product_id")
                    .table(Skus::Table)
                    .to_owned(),
            )
            .await?;
        manager
            .drop_index(
                Index::drop()
                    .name("idx_inventory_balances_warehouse")
                    .table(InventoryBalances::Table)
                    .to_owned(),
            )
            .await?;
        manager
            .drop_index(
                Index::drop()
                    .name("idx_stock_movements_source")
                    .table(StockMovements::Table)
                    .to_owned(),
            )
            .await?;
        manager
            .drop_index(
                Index::drop()
                    .name("idx_stock_movements_slot_created")
                    .table(StockMovements::Table)
                    .to_owned(),
            )
            .await
    }
}
