//! Contention on a file database with several pooled connections, where
//! concurrent writers really race for the same balance row.

mod common;

use assert_matches::assert_matches;
use common::TestEngine;
use inventory_engine::{
    commands::{inventory::ReserveStockCommand, Command},
    entities::stock_movement::MovementType,
    errors::ServiceError,
};
use uuid::Uuid;

const CONNECTIONS: u32 = 4;
const RETRY_LIMIT: u32 = 20;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_stock_outs_on_one_row_all_succeed() {
    let t = TestEngine::file_backed(CONNECTIONS, RETRY_LIMIT).await;
    let w1 = t.warehouse("W1").await;
    let sku = t.sku("A").await;
    t.stock_in(sku.id, w1.id, None, 100).await;

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let engine = t.engine.clone();
            let command = t.stock_out_command(sku.id, w1.id, None, 1);
            tokio::spawn(async move { command.execute(&engine).await })
        })
        .collect();

    for result in futures::future::join_all(handles).await {
        result.unwrap().unwrap();
    }

    let balance = t.balance(sku.id, w1.id, None).await.unwrap();
    assert_eq!(balance.quantity, 84);
    let outs = t
        .movements_for_sku(sku.id)
        .await
        .into_iter()
        .filter(|m| m.movement_type == MovementType::Out)
        .count();
    assert_eq!(outs, 16);
    assert!(t
        .engine
        .reconciliation
        .audit_ledger()
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn contended_reservations_stop_exactly_at_available() {
    let t = TestEngine::file_backed(CONNECTIONS, RETRY_LIMIT).await;
    let w1 = t.warehouse("W1").await;
    let sku = t.sku("A").await;
    t.stock_in(sku.id, w1.id, None, 10).await;

    let handles: Vec<_> = (0..20)
        .map(|_| {
            let engine = t.engine.clone();
            let command = ReserveStockCommand {
                order_id: Uuid::new_v4(),
                sku_id: sku.id,
                quantity: 1,
            };
            tokio::spawn(async move { command.execute(&engine).await })
        })
        .collect();

    let mut successes = 0;
    for result in futures::future::join_all(handles).await {
        match result.unwrap() {
            Ok(_) => successes += 1,
            Err(e) => assert_matches!(e, ServiceError::InsufficientStock(_)),
        }
    }

    assert_eq!(successes, 10);
    let balance = t.balance(sku.id, w1.id, None).await.unwrap();
    assert_eq!((balance.quantity, balance.reserved), (10, 10));
}
