pub use sea_orm_migration::prelude::*;

mod m20250301_000001_create_catalog_reference_tables;
mod m20250301_000002_create_sku_and_location_tables;
mod m20250301_000003_create_inventory_ledger_tables;
mod m20250301_000004_create_purchase_order_tables;
mod m20250301_000005_add_inventory_indexes;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250301_000001_create_catalog_reference_tables::Migration),
            Box::new(m20250301_000002_create_sku_and_location_tables::Migration),
            Box::new(m20250301_000003_create_inventory_ledger_tables::Migration),
            Box::new(m20250301_000004_create_purchase_order_tables::Migration),
            Box::new(m20250301_000005_add_inventory_indexes::Migration),
        ]
    }
}
