pub mod cancel_purchase_order_command;
pub mod create_purchase_order_command;
pub mod receive_purchase_order_item_command;

pub use cancel_purchase_order_command::CancelPurchaseOrderCommand;
pub use create_purchase_order_command::{CreatePurchaseOrderCommand, PurchaseOrderLineRequest};
pub use receive_purchase_order_item_command::ReceivePurchaseOrderItemCommand;
