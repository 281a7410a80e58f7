mod common;

use async_trait::async_trait;
use common::TestEngine;
use inventory_engine::{
    commands::{skus::CreateSkuCommand, Command},
    errors::ServiceError,
    events::Event,
    services::stock_sync::CatalogStockWriter,
};
use mockall::{mock, predicate::eq, Sequence};
use std::sync::Arc;
use uuid::Uuid;

mock! {
    pub CatalogWriter {}

    #[async_trait]
    impl CatalogStockWriter for CatalogWriter {
        async fn write_stock_total(&self, product_id: Uuid, total: i64) -> Result<(), ServiceError>;
    }
}

#[tokio::test]
async fn catalog_total_spans_every_sku_of_the_product() {
    let t = TestEngine::new().await;
    let w1 = t.warehouse("W1").await;
    let w2 = t.warehouse("W2").await;
    let product = t.product("Linen Shirt").await;
    let medium = t
        .sku_with(CreateSkuCommand {
            product_id: Some(product.id),
            ..CreateSkuCommand::new("SHIRT-M")
        })
        .await;
    let large = t
        .sku_with(CreateSkuCommand {
            product_id: Some(product.id),
            ..CreateSkuCommand::new("SHIRT-L")
        })
        .await;

    t.stock_in(medium.id, w1.id, None, 10).await;
    t.stock_in(large.id, w2.id, None, 20).await;
    let synced = t.reload_product(product.id).await;
    assert_eq!(synced.stock, 30);
    assert_eq!(synced.count_in_stock, 30);

    t.stock_out_command(large.id, w2.id, None, 5)
        .execute(&t.engine)
        .await
        .unwrap();
    assert_eq!(t.reload_product(product.id).await.stock, 25);

    // transfers move stock but never change the product total
    t.transfer_command(medium.id, (w1.id, None), (w2.id, None), 4)
        .execute(&t.engine)
        .await
        .unwrap();
    assert_eq!(t.reload_product(product.id).await.stock, 25);
}

#[tokio::test]
async fn writer_receives_the_running_total() {
    let product_id = Uuid::new_v4();
    let mut writer = MockCatalogWriter::new();
    let mut seq = Sequence::new();
    writer
        .expect_write_stock_total()
        .with(eq(product_id), eq(7))
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_, _| Ok(()));
    writer
        .expect_write_stock_total()
        .with(eq(product_id), eq(4))
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_, _| Ok(()));

    let t = TestEngine::with_catalog_writer(Arc::new(writer)).await;
    let w1 = t.warehouse("W1").await;
    t.product_with_id(product_id, "Mug").await;
    let sku = t
        .sku_with(CreateSkuCommand {
            product_id: Some(product_id),
            ..CreateSkuCommand::new("A")
        })
        .await;

    t.stock_in(sku.id, w1.id, None, 7).await;
    t.stock_out_command(sku.id, w1.id, None, 3)
        .execute(&t.engine)
        .await
        .unwrap();
}

#[tokio::test]
async fn failed_sync_does_not_fail_the_operation() {
    let mut writer = MockCatalogWriter::new();
    writer
        .expect_write_stock_total()
        .returning(|_, _| Err(ServiceError::InternalError("catalog offline".to_string())));

    let mut t = TestEngine::with_catalog_writer(Arc::new(writer)).await;
    let w1 = t.warehouse("W1").await;
    let product_id = Uuid::new_v4();
    t.product_with_id(product_id, "Mug").await;
    let sku = t
        .sku_with(CreateSkuCommand {
            product_id: Some(product_id),
            ..CreateSkuCommand::new("A")
        })
        .await;

    let balance = t.stock_in(sku.id, w1.id, None, 5).await;
    assert_eq!(balance.quantity, 5);

    let events = t.drain_events();
    assert!(events
        .iter()
        .any(|e| matches!(e, Event::StockReceived { quantity: 5, .. })));
    assert!(events.iter().any(|e| matches!(
        e,
        Event::StockSyncFailed { product_id: p, error, .. }
            if *p == product_id && error.contains("catalog offline")
    )));
}

#[tokio::test]
async fn skus_without_a_product_skip_the_writer() {
    let mut writer = MockCatalogWriter::new();
    writer.expect_write_stock_total().never();

    let t = TestEngine::with_catalog_writer(Arc::new(writer)).await;
    let w1 = t.warehouse("W1").await;
    let sku = t.sku("LOOSE").await;
    t.stock_in(sku.id, w1.id, None, 5).await;
}

#[tokio::test]
async fn dropping_to_the_minimum_publishes_low_stock() {
    let mut t = TestEngine::new().await;
    let w1 = t.warehouse("W1").await;
    let sku = t
        .sku_with(CreateSkuCommand {
            minimum_stock_level: 5,
            ..CreateSkuCommand::new("A")
        })
        .await;
    t.stock_in(sku.id, w1.id, None, 8).await;
    assert!(!t
        .drain_events()
        .iter()
        .any(|e| matches!(e, Event::LowStockDetected { .. })));

    t.stock_out_command(sku.id, w1.id, None, 3)
        .execute(&t.engine)
        .await
        .unwrap();
    let events = t.drain_events();
    assert!(events.iter().any(|e| matches!(
        e,
        Event::LowStockDetected { on_hand: 5, minimum_stock_level: 5, .. }
    )));
}
