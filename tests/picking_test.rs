mod common;

use assert_matches::assert_matches;
use common::TestEngine;
use inventory_engine::{
    commands::{inventory::ReserveStockCommand, picking::ConfirmPickCommand, Command},
    entities::{
        location::LocationType,
        order::{FulfillmentStatus, PaymentMethod, PaymentStatus},
    },
    errors::ServiceError,
    events::Event,
};

#[tokio::test]
async fn only_payable_open_orders_are_fulfillable() {
    let t = TestEngine::new().await;
    let (paid, _) = t.paid_order("SO-1", &[("A", 1)]).await;
    let (cod, _) = t
        .order("SO-2", PaymentStatus::Unpaid, PaymentMethod::CashOnDelivery, &[("A", 1)])
        .await;
    t.order("SO-3", PaymentStatus::Unpaid, PaymentMethod::Card, &[("A", 1)])
        .await;

    let orders = t.engine.picking.list_fulfillable_orders().await.unwrap();
    let ids: Vec<_> = orders.iter().map(|o| o.id).collect();
    assert_eq!(ids, vec![cod.id, paid.id]);
}

#[tokio::test]
async fn pick_details_rank_locations_and_skip_damaged_bins() {
    let t = TestEngine::new().await;
    let w1 = t.warehouse("W1").await;
    let pick = t.location(w1.id, "P-01", LocationType::Pick).await;
    let reserve = t.location(w1.id, "R-01", LocationType::Reserve).await;
    let damaged = t.location(w1.id, "X-01", LocationType::Damaged).await;
    let empty = t.location(w1.id, "P-02", LocationType::Pick).await;
    let sku = t.sku("A").await;
    t.stock_in(sku.id, w1.id, Some(reserve.id), 100).await;
    t.stock_in(sku.id, w1.id, Some(pick.id), 5).await;
    t.stock_in(sku.id, w1.id, Some(damaged.id), 50).await;
    t.stock_in(sku.id, w1.id, Some(empty.id), 2).await;
    t.stock_out_command(sku.id, w1.id, Some(empty.id), 2)
        .execute(&t.engine)
        .await
        .unwrap();
    t.stock_in(sku.id, w1.id, None, 7).await;

    let (order, _) = t.paid_order("SO-1", &[("A", 3), ("UNKNOWN", 1)]).await;
    let details = t.engine.picking.get_pick_details(order.id).await.unwrap();
    assert_eq!(details.lines.len(), 2);

    let line = details
        .lines
        .iter()
        .find(|l| l.item.sku_code.as_deref() == Some("A"))
        .unwrap();
    let codes: Vec<_> = line
        .suggestions
        .iter()
        .map(|s| s.location_code.as_deref())
        .collect();
    assert_eq!(codes, vec![Some("P-01"), Some("R-01"), None]);

    let unknown = details
        .lines
        .iter()
        .find(|l| l.item.sku_code.as_deref() == Some("UNKNOWN"))
        .unwrap();
    assert!(unknown.sku.is_none());
    assert!(unknown.suggestions.is_empty());
}

#[tokio::test]
async fn confirm_pick_issues_stock_and_tracks_progress() {
    let mut t = TestEngine::new().await;
    let w1 = t.warehouse("W1").await;
    let pick = t.location(w1.id, "P-01", LocationType::Pick).await;
    let sku = t.sku("A").await;
    t.stock_in(sku.id, w1.id, Some(pick.id), 10).await;
    let (order, items) = t.paid_order("SO-1", &[("A", 4)]).await;
    ReserveStockCommand {
        order_id: order.id,
        sku_id: sku.id,
        quantity: 4,
    }
    .execute(&t.engine)
    .await
    .unwrap();
    t.drain_events();

    let pick_cmd = |quantity| ConfirmPickCommand {
        order_id: order.id,
        order_item_id: items[0].id,
        warehouse_id: w1.id,
        location_id: Some(pick.id),
        quantity,
        actor: Some("picker-7".to_string()),
    };

    let first = pick_cmd(3).execute(&t.engine).await.unwrap();
    assert_eq!(first.order_item.picked_quantity, 3);
    assert_eq!(first.fulfillment_status, FulfillmentStatus::Picking);
    assert_eq!((first.balance.quantity, first.balance.reserved), (7, 1));

    assert_matches!(
        pick_cmd(2).execute(&t.engine).await,
        Err(ServiceError::ValidationError(_))
    );

    let last = pick_cmd(1).execute(&t.engine).await.unwrap();
    assert_eq!(last.fulfillment_status, FulfillmentStatus::Picked);
    assert_eq!((last.balance.quantity, last.balance.reserved), (6, 0));
    assert_eq!(
        t.reload_order(order.id).await.fulfillment_status,
        FulfillmentStatus::Picked
    );

    let events = t.drain_events();
    assert!(events.iter().any(|e| matches!(
        e,
        Event::PickConfirmed { quantity: 1, .. }
    )));

    // fully picked orders drop off the fulfillment list
    assert!(t
        .engine
        .picking
        .list_fulfillable_orders()
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn failed_pick_leaves_the_order_untouched() {
    let t = TestEngine::new().await;
    let w1 = t.warehouse("W1").await;
    let sku = t.sku("A").await;
    t.stock_in(sku.id, w1.id, None, 1).await;
    let (order, items) = t.paid_order("SO-1", &[("A", 3)]).await;

    let result = ConfirmPickCommand {
        order_id: order.id,
        order_item_id: items[0].id,
        warehouse_id: w1.id,
        location_id: None,
        quantity: 3,
        actor: None,
    }
    .execute(&t.engine)
    .await;
    assert_matches!(result, Err(ServiceError::InsufficientStock(_)));

    let details = t.engine.picking.get_pick_details(order.id).await.unwrap();
    assert_eq!(details.lines[0].item.picked_quantity, 0);
    assert_eq!(details.order.fulfillment_status, FulfillmentStatus::Unfulfilled);
    assert_eq!(t.balance(sku.id, w1.id, None).await.unwrap().quantity, 1);
}

#[tokio::test]
async fn damaged_bins_cannot_be_picked_from() {
    let t = TestEngine::new().await;
    let w1 = t.warehouse("W1").await;
    let damaged = t.location(w1.id, "X-01", LocationType::Damaged).await;
    let sku = t.sku("A").await;
    t.stock_in(sku.id, w1.id, Some(damaged.id), 5).await;
    let (order, items) = t.paid_order("SO-1", &[("A", 2)]).await;

    let result = ConfirmPickCommand {
        order_id: order.id,
        order_item_id: items[0].id,
        warehouse_id: w1.id,
        location_id: Some(damaged.id),
        quantity: 2,
        actor: None,
    }
    .execute(&t.engine)
    .await;
    assert_matches!(result, Err(ServiceError::InvalidOperation(_)));

    let details = t.engine.picking.get_pick_details(order.id).await.unwrap();
    assert_eq!(details.lines[0].item.picked_quantity, 0);
    assert_eq!(
        t.balance(sku.id, w1.id, Some(damaged.id))
            .await
            .unwrap()
            .quantity,
        5
    );
}
