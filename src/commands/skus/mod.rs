pub mod create_sku_command;
pub mod update_sku_command;

pub use create_sku_command::CreateSkuCommand;
pub use update_sku_command::UpdateSkuCommand;
