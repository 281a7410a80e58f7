// Reference data
pub mod registry;

// Stock movements
pub mod picking;
pub mod receiving;
pub mod reservations;
pub mod stock;

// Read side and audit
pub mod inventory_query;
pub mod reconciliation;

// Catalog mirror
pub mod stock_sync;
