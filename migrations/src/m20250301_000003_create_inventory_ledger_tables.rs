use sea_orm_migration::prelude::*;

use super::m20250301_000002_create_sku_and_location_tables::{Locations, Skus, Warehouses};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Current-state projection, one row per (sku, warehouse, location slot)
        manager
            .create_table(
                Table::create()
                    .table(InventoryBalances::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(InventoryBalances::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(InventoryBalances::SkuId).uuid().not_null())
                    .col(
                        ColumnDef::new(InventoryBalances::WarehouseId)
                            .uuid()
                            .not_null(),
                    )
                    .col(ColumnDef::new(InventoryBalances::LocationId).uuid().null())
                    .col(
                        ColumnDef::new(InventoryBalances::LocationKey)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventoryBalances::Quantity)
                            .integer()
                            .not_null()
                            .default(0)
                            .check(Expr::col(InventoryBalances::Quantity).gte(0)),
                    )
                    .col(
                        ColumnDef::new(InventoryBalances::Reserved)
                            .integer()
                            .not_null()
                            .default(0)
                            .check(Expr::col(InventoryBalances::Reserved).gte(0)),
                    )
                    .col(
                        ColumnDef::new(InventoryBalances::Version)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(InventoryBalances::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventoryBalances::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_inventory_balances_sku_id")
                            .from(InventoryBalances::Table, InventoryBalances::SkuId)
                            .to(Skus::Table, Skus::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_inventory_balances_warehouse_id")
                            .from(InventoryBalances::Table, InventoryBalances::WarehouseId)
                            .to(Warehouses::Table, Warehouses::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_inventory_balances_location_id")
                            .from(InventoryBalances::Table, InventoryBalances::LocationId)
                            .to(Locations::Table, Locations::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_inventory_balances_slot")
                    .table(InventoryBalances::Table)
                    .col(InventoryBalances::SkuId)
                    .col(InventoryBalances::WarehouseId)
                    .col(InventoryBalances::LocationKey)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Append-only movement history; rows are never updated or deleted
        manager
            .create_table(
                Table::create()
                    .table(StockMovements::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(StockMovements::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(StockMovements::SkuId).uuid().not_null())
                    .col(ColumnDef::new(StockMovements::WarehouseId).uuid().not_null())
                    .col(ColumnDef::new(StockMovements::LocationId).uuid().null())
                    .col(
                        ColumnDef::new(StockMovements::LocationKey)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(StockMovements::MovementType)
                            .string_len(16)
                            .not_null(),
                    )
                    .col(ColumnDef::new(StockMovements::Quantity).integer().not_null())
                    .col(ColumnDef::new(StockMovements::Reason).text().null())
                    .col(
                        ColumnDef::new(StockMovements::SourceType)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(ColumnDef::new(StockMovements::SourceId).string_len(64).null())
                    .col(ColumnDef::new(StockMovements::Actor).string_len(255).null())
                    .col(
                        ColumnDef::new(StockMovements::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_stock_movements_sku_id")
                            .from(StockMovements::Table, StockMovements::SkuId)
                            .to(Skus::Table, Skus::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_stock_movements_warehouse_id")
                            .from(StockMovements::Table, StockMovements::WarehouseId)
                            .to(Warehouses::Table, Warehouses::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(StockMovements::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(InventoryBalances::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum InventoryBalances {
    Table,
    Id,
    SkuId,
    WarehouseId,
    LocationId,
    LocationKey,
    Quantity,
    Reserved,
    Version,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
pub enum StockMovements {
    Table,
    Id,
    SkuId,
    WarehouseId,
    LocationId,
    LocationKey,
    MovementType,
    Quantity,
    Reason,
    SourceType,
    SourceId,
    Actor,
    CreatedAt,
}
