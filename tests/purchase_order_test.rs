mod common;

use assert_matches::assert_matches;
use common::TestEngine;
use inventory_engine::{
    commands::{
        purchaseorders::{
            CancelPurchaseOrderCommand, CreatePurchaseOrderCommand, PurchaseOrderLineRequest,
            ReceivePurchaseOrderItemCommand,
        },
        Command,
    },
    entities::{
        location::LocationType,
        purchase_order::PurchaseOrderStatus,
        stock_movement::{MovementType, SourceType},
    },
    errors::ServiceError,
    services::receiving::PurchaseOrderView,
};
use rust_decimal::Decimal;
use uuid::Uuid;

async fn create_po(
    t: &TestEngine,
    warehouse_id: Uuid,
    lines: &[(Uuid, i32)],
) -> PurchaseOrderView {
    CreatePurchaseOrderCommand {
        po_number: format!("PO-{}", &Uuid::new_v4().simple().to_string()[..8]),
        supplier: "Acme Supply".to_string(),
        warehouse_id,
        lines: lines
            .iter()
            .map(|(sku_id, expected)| PurchaseOrderLineRequest {
                sku_id: *sku_id,
                expected_quantity: *expected,
                unit_cost: Some(Decimal::new(250, 2)),
            })
            .collect(),
    }
    .execute(&t.engine)
    .await
    .unwrap()
}

fn receipt(
    po: &PurchaseOrderView,
    sku_id: Uuid,
    quantity: i32,
    location_id: Option<Uuid>,
) -> ReceivePurchaseOrderItemCommand {
    ReceivePurchaseOrderItemCommand {
        purchase_order_id: po.purchase_order.id,
        sku_id,
        quantity,
        warehouse_id: po.purchase_order.warehouse_id,
        location_id,
        actor: Some("receiver".to_string()),
    }
}

#[tokio::test]
async fn receipts_advance_status_and_stock() {
    let t = TestEngine::new().await;
    let w1 = t.warehouse("W1").await;
    let dock = t.location(w1.id, "DOCK-1", LocationType::Dock).await;
    let a = t.sku("A").await;
    let b = t.sku("B").await;
    let po = create_po(&t, w1.id, &[(a.id, 10), (b.id, 5)]).await;
    assert_eq!(po.purchase_order.status, PurchaseOrderStatus::Created);
    assert_eq!(po.items.len(), 2);

    let first = receipt(&po, a.id, 10, Some(dock.id))
        .execute(&t.engine)
        .await
        .unwrap();
    assert_eq!(first.purchase_order.status, PurchaseOrderStatus::PartiallyReceived);
    assert_eq!(first.line.received_quantity, 10);
    assert_eq!(first.balance.quantity, 10);

    let second = receipt(&po, b.id, 5, Some(dock.id))
        .execute(&t.engine)
        .await
        .unwrap();
    assert_eq!(second.purchase_order.status, PurchaseOrderStatus::Received);

    let movements = t.movements_for_sku(a.id).await;
    assert_eq!(movements.len(), 1);
    assert_eq!(movements[0].movement_type, MovementType::In);
    assert_eq!(movements[0].source_type, SourceType::PurchaseOrder);
    assert_eq!(
        movements[0].source_id,
        Some(po.purchase_order.id.to_string())
    );
}

#[tokio::test]
async fn over_receipt_is_accepted() {
    let t = TestEngine::new().await;
    let w1 = t.warehouse("W1").await;
    let a = t.sku("A").await;
    let po = create_po(&t, w1.id, &[(a.id, 10)]).await;

    let result = receipt(&po, a.id, 12, None)
        .execute(&t.engine)
        .await
        .unwrap();
    assert_eq!(result.purchase_order.status, PurchaseOrderStatus::Received);
    assert_eq!(result.line.received_quantity, 12);
    assert_eq!(result.line.outstanding(), 0);
    assert_eq!(result.balance.quantity, 12);
}

#[tokio::test]
async fn sku_not_on_the_order_is_not_found() {
    let t = TestEngine::new().await;
    let w1 = t.warehouse("W1").await;
    let a = t.sku("A").await;
    let other = t.sku("B").await;
    let po = create_po(&t, w1.id, &[(a.id, 10)]).await;

    let result = receipt(&po, other.id, 1, None).execute(&t.engine).await;
    assert_matches!(result, Err(ServiceError::NotFound(_)));
    assert!(t.balance(other.id, w1.id, None).await.is_none());
}

#[tokio::test]
async fn unknown_po_is_not_found() {
    let t = TestEngine::new().await;
    let w1 = t.warehouse("W1").await;
    let a = t.sku("A").await;

    let result = ReceivePurchaseOrderItemCommand {
        purchase_order_id: Uuid::new_v4(),
        sku_id: a.id,
        quantity: 1,
        warehouse_id: w1.id,
        location_id: None,
        actor: None,
    }
    .execute(&t.engine)
    .await;
    assert_matches!(result, Err(ServiceError::NotFound(_)));
}

#[tokio::test]
async fn receipt_into_another_warehouse_is_rejected() {
    let t = TestEngine::new().await;
    let w1 = t.warehouse("W1").await;
    let w2 = t.warehouse("W2").await;
    let a = t.sku("A").await;
    let po = create_po(&t, w1.id, &[(a.id, 10)]).await;

    let mut command = receipt(&po, a.id, 1, None);
    command.warehouse_id = w2.id;
    assert_matches!(
        command.execute(&t.engine).await,
        Err(ServiceError::ValidationError(_))
    );
}

#[tokio::test]
async fn cancelled_po_rejects_receipts() {
    let t = TestEngine::new().await;
    let w1 = t.warehouse("W1").await;
    let a = t.sku("A").await;
    let po = create_po(&t, w1.id, &[(a.id, 10)]).await;

    let cancelled = CancelPurchaseOrderCommand {
        purchase_order_id: po.purchase_order.id,
    }
    .execute(&t.engine)
    .await
    .unwrap();
    assert_eq!(cancelled.status, PurchaseOrderStatus::Cancelled);

    assert_matches!(
        receipt(&po, a.id, 1, None).execute(&t.engine).await,
        Err(ServiceError::InvalidOperation(_))
    );
}

#[tokio::test]
async fn partially_received_po_cannot_be_cancelled() {
    let t = TestEngine::new().await;
    let w1 = t.warehouse("W1").await;
    let a = t.sku("A").await;
    let po = create_po(&t, w1.id, &[(a.id, 10)]).await;
    receipt(&po, a.id, 3, None).execute(&t.engine).await.unwrap();

    let result = CancelPurchaseOrderCommand {
        purchase_order_id: po.purchase_order.id,
    }
    .execute(&t.engine)
    .await;
    assert_matches!(result, Err(ServiceError::InvalidOperation(_)));
}

#[tokio::test]
async fn duplicate_po_number_and_unknown_sku_are_rejected() {
    let t = TestEngine::new().await;
    let w1 = t.warehouse("W1").await;
    let a = t.sku("A").await;
    let po = create_po(&t, w1.id, &[(a.id, 10)]).await;

    let duplicate = CreatePurchaseOrderCommand {
        po_number: po.purchase_order.po_number.clone(),
        supplier: "Acme Supply".to_string(),
        warehouse_id: w1.id,
        lines: vec![PurchaseOrderLineRequest {
            sku_id: a.id,
            expected_quantity: 1,
            unit_cost: None,
        }],
    }
    .execute(&t.engine)
    .await;
    assert_matches!(duplicate, Err(ServiceError::ValidationError(_)));

    let unknown_sku = CreatePurchaseOrderCommand {
        po_number: "PO-NEW".to_string(),
        supplier: "Acme Supply".to_string(),
        warehouse_id: w1.id,
        lines: vec![PurchaseOrderLineRequest {
            sku_id: Uuid::new_v4(),
            expected_quantity: 1,
            unit_cost: None,
        }],
    }
    .execute(&t.engine)
    .await;
    assert_matches!(unknown_sku, Err(ServiceError::NotFound(_)));
}
