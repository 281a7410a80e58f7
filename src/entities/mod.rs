pub mod inventory_balance;
pub mod location;
pub mod order;
pub mod order_item;
pub mod product;
pub mod purchase_order;
pub mod purchase_order_item;
pub mod sku;
pub mod stock_movement;
pub mod warehouse;
