use sea_orm_migration::prelude::*;

use super::m20250301_000001_create_catalog_reference_tables::Products;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Skus::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Skus::Id).uuid().not_null().primary_key())
                    .col(
                        ColumnDef::new(Skus::Code)
                            .string_len(100)
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(Skus::Barcode)
                            .string_len(255)
                            .null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Skus::ProductId).uuid().null())
                    .col(ColumnDef::new(Skus::Attributes).json().not_null())
                    .col(
                        ColumnDef::new(Skus::UnitOfMeasure)
                            .string_len(16)
                            .not_null()
                            .default("EA"),
                    )
                    .col(
                        ColumnDef::new(Skus::MinimumStockLevel)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Skus::ReorderQuantity)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Skus::Status).string_len(32).not_null())
                    .col(ColumnDef::new(Skus::Cost).decimal_len(16, 4).null())
                    .col(ColumnDef::new(Skus::WeightKg).decimal_len(16, 4).null())
                    .col(ColumnDef::new(Skus::LengthCm).decimal_len(16, 4).null())
                    .col(ColumnDef::new(Skus::WidthCm).decimal_len(16, 4).null())
                    .col(ColumnDef::new(Skus::HeightCm).decimal_len(16, 4).null())
                    .col(
                        ColumnDef::new(Skus::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Skus::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_skus_product_id")
                            .from(Skus::Table, Skus::ProductId)
                            .to(Products::Table, Products::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Warehouses::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Warehouses::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Warehouses::Code)
                            .string_len(64)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Warehouses::Name).string_len(255).not_null())
                    .col(ColumnDef::new(Warehouses::Address).text().null())
                    .col(
                        ColumnDef::new(Warehouses::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(Warehouses::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Warehouses::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Locations::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Locations::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Locations::WarehouseId).uuid().not_null())
                    .col(ColumnDef::new(Locations::Code).string_len(64).not_null())
                    .col(
                        ColumnDef::new(Locations::LocationType)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Locations::Zone).string_len(32).null())
                    .col(ColumnDef::new(Locations::Aisle).string_len(32).null())
                    .col(ColumnDef::new(Locations::Rack).string_len(32).null())
                    .col(ColumnDef::new(Locations::Shelf).string_len(32).null())
                    .col(ColumnDef::new(Locations::Bin).string_len(32).null())
                    .col(
                        ColumnDef::new(Locations::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(Locations::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_locations_warehouse_id")
                            .from(Locations::Table, Locations::WarehouseId)
                            .to(Warehouses::Table, Warehouses::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_locations_warehouse_code")
                    .table(Locations::Table)
                    .col(Locations::WarehouseId)
                    .col(Locations::Code)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Locations::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Warehouses::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Skus::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Skus {
    Table,
    Id,
    Code,
    Barcode,
    ProductId,
    Attributes,
    UnitOfMeasure,
    MinimumStockLevel,
    ReorderQuantity,
    Status,
    Cost,
    WeightKg,
    LengthCm,
    WidthCm,
    HeightCm,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
pub enum Warehouses {
    Table,
    Id,
    Code,
    Name,
    Address,
    IsActive,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
pub enum Locations {
    Table,
    Id,
    WarehouseId,
    Code,
    LocationType,
    Zone,
    Aisle,
    Rack,
    Shelf,
    Bin,
    IsActive,
    CreatedAt,
}
