pub mod adjust_stock_command;
pub mod release_reservation_command;
pub mod reserve_stock_command;
pub mod stock_in_command;
pub mod stock_out_command;
pub mod transfer_stock_command;

pub use adjust_stock_command::AdjustStockCommand;
pub use release_reservation_command::ReleaseReservationCommand;
pub use reserve_stock_command::ReserveStockCommand;
pub use stock_in_command::StockInCommand;
pub use stock_out_command::StockOutCommand;
pub use transfer_stock_command::TransferStockCommand;
