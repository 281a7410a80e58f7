pub mod create_location_command;
pub mod create_warehouse_command;

pub use create_location_command::CreateLocationCommand;
pub use create_warehouse_command::CreateWarehouseCommand;
