use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Creates a sender together with the receiving end of a bounded channel.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<Event>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self::new(tx), rx)
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }

    /// Publishes without waiting for channel capacity. Events go out after
    /// the owning transaction has committed, so a full or closed channel
    /// is logged and otherwise ignored.
    pub fn send_or_log(&self, event: Event) {
        if let Err(e) = self.sender.try_send(event) {
            warn!("Dropping inventory event: {}", e);
        }
    }
}

/// Facts published after a stock mutation has committed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    StockReceived {
        sku_id: Uuid,
        warehouse_id: Uuid,
        location_id: Option<Uuid>,
        quantity: i32,
        new_quantity: i32,
    },
    StockIssued {
        sku_id: Uuid,
        warehouse_id: Uuid,
        location_id: Option<Uuid>,
        quantity: i32,
        released_reservation: i32,
        order_ref: Option<String>,
    },
    StockAdjusted {
        sku_id: Uuid,
        warehouse_id: Uuid,
        location_id: Option<Uuid>,
        delta: i32,
        new_quantity: i32,
        reason: String,
    },
    StockTransferred {
        sku_id: Uuid,
        from_warehouse_id: Uuid,
        from_location_id: Option<Uuid>,
        to_warehouse_id: Uuid,
        to_location_id: Option<Uuid>,
        quantity: i32,
    },
    PurchaseOrderItemReceived {
        purchase_order_id: Uuid,
        sku_id: Uuid,
        quantity: i32,
        status: String,
    },
    InventoryReserved {
        order_id: Uuid,
        sku_id: Uuid,
        balance_id: Uuid,
        quantity: i32,
    },
    ReservationReleased {
        balance_id: Uuid,
        quantity: i32,
        order_ref: String,
    },
    PickConfirmed {
        order_id: Uuid,
        order_item_id: Uuid,
        quantity: i32,
        fulfillment_status: String,
    },
    StockSyncFailed {
        sku_id: Uuid,
        product_id: Uuid,
        error: String,
    },
    LowStockDetected {
        sku_id: Uuid,
        sku_code: String,
        on_hand: i64,
        minimum_stock_level: i32,
        detected_at: DateTime<Utc>,
    },
}

/// Drains the channel, logging each event until every sender is dropped.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        match &event {
            Event::StockSyncFailed {
                sku_id,
                product_id,
                error,
            } => {
                error!(
                    %sku_id,
                    %product_id,
                    "Catalog stock mirror is stale: {}", error
                );
            }
            Event::LowStockDetected {
                sku_code,
                on_hand,
                minimum_stock_level,
                ..
            } => {
                warn!(
                    sku_code = %sku_code,
                    on_hand,
                    minimum_stock_level,
                    "SKU is at or below its minimum stock level"
                );
            }
            _ => info!("Received event: {:?}", event),
        }
    }

    warn!("Event processing loop has ended");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn send_or_log_delivers_when_capacity_allows() {
        let (sender, mut rx) = EventSender::channel(4);
        let event = Event::ReservationReleased {
            balance_id: Uuid::new_v4(),
            quantity: 3,
            order_ref: "R-1".into(),
        };
        sender.send_or_log(event.clone());
        assert_eq!(rx.recv().await, Some(event));
    }

    #[tokio::test]
    async fn send_or_log_tolerates_a_full_channel() {
        let (sender, mut rx) = EventSender::channel(1);
        let sku_id = Uuid::new_v4();
        for quantity in [1, 2] {
            sender.send_or_log(Event::StockReceived {
                sku_id,
                warehouse_id: Uuid::nil(),
                location_id: None,
                quantity,
                new_quantity: quantity,
            });
        }
        assert!(matches!(
            rx.recv().await,
            Some(Event::StockReceived { quantity: 1, .. })
        ));
        assert!(rx.try_recv().is_err());
    }
}
