mod common;

use assert_matches::assert_matches;
use common::TestEngine;
use inventory_engine::{
    commands::{inventory::ReserveStockCommand, skus::CreateSkuCommand, Command},
    entities::location::LocationType,
    errors::ServiceError,
    services::inventory_query::InventoryFilter,
};
use std::collections::HashSet;
use uuid::Uuid;

#[tokio::test]
async fn filters_intersect() {
    let t = TestEngine::new().await;
    let w1 = t.warehouse("W1").await;
    let w2 = t.warehouse("W2").await;
    let shirt = t.product("Linen Shirt").await;
    let mug = t.product("Coffee Mug").await;
    let shirt_m = t
        .sku_with(CreateSkuCommand {
            product_id: Some(shirt.id),
            ..CreateSkuCommand::new("SHIRT-M")
        })
        .await;
    let shirt_l = t
        .sku_with(CreateSkuCommand {
            product_id: Some(shirt.id),
            minimum_stock_level: 50,
            ..CreateSkuCommand::new("SHIRT-L")
        })
        .await;
    let mug_sku = t
        .sku_with(CreateSkuCommand {
            product_id: Some(mug.id),
            minimum_stock_level: 50,
            ..CreateSkuCommand::new("MUG-1")
        })
        .await;
    for sku_id in [shirt_m.id, shirt_l.id, mug_sku.id] {
        t.stock_in(sku_id, w1.id, None, 10).await;
        t.stock_in(sku_id, w2.id, None, 10).await;
    }

    let by_name = t
        .engine
        .query
        .query_inventory(&InventoryFilter {
            search_text: Some("linen".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();
    let skus: HashSet<Uuid> = by_name.iter().map(|b| b.sku_id).collect();
    assert_eq!(skus, HashSet::from([shirt_m.id, shirt_l.id]));
    assert_eq!(by_name.len(), 4);

    // search text and low stock together only leave the large shirt
    let narrowed = t
        .engine
        .query
        .query_inventory(&InventoryFilter {
            search_text: Some("SHIRT".to_string()),
            low_stock_only: true,
            warehouse_id: Some(w2.id),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(narrowed.len(), 1);
    assert_eq!(narrowed[0].sku_id, shirt_l.id);
    assert_eq!(narrowed[0].warehouse_id, w2.id);

    let disjoint = t
        .engine
        .query
        .query_inventory(&InventoryFilter {
            sku_id: Some(mug_sku.id),
            search_text: Some("linen".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert!(disjoint.is_empty());
}

#[tokio::test]
async fn location_and_reserved_filters() {
    let t = TestEngine::new().await;
    let w1 = t.warehouse("W1").await;
    let bin = t.location(w1.id, "P-01", LocationType::Pick).await;
    let a = t.sku("A").await;
    let b = t.sku("B").await;
    t.stock_in(a.id, w1.id, Some(bin.id), 10).await;
    t.stock_in(b.id, w1.id, None, 10).await;
    ReserveStockCommand {
        order_id: Uuid::new_v4(),
        sku_id: b.id,
        quantity: 2,
    }
    .execute(&t.engine)
    .await
    .unwrap();

    let in_bin = t
        .engine
        .query
        .query_inventory(&InventoryFilter {
            location_id: Some(bin.id),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(in_bin.len(), 1);
    assert_eq!(in_bin[0].sku_id, a.id);

    let reserved = t
        .engine
        .query
        .query_inventory(&InventoryFilter {
            reserved_only: true,
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(reserved.len(), 1);
    assert_eq!(reserved[0].sku_id, b.id);

    let everything = t
        .engine
        .query
        .query_inventory(&InventoryFilter::default())
        .await
        .unwrap();
    assert_eq!(everything.len(), 2);
}

#[tokio::test]
async fn snapshot_aggregates_balances_and_recent_movements() {
    let t = TestEngine::new().await;
    let w1 = t.warehouse("W1").await;
    let w2 = t.warehouse("W2").await;
    let sku = t.sku("A").await;
    t.stock_in(sku.id, w1.id, None, 10).await;
    t.stock_in(sku.id, w2.id, None, 5).await;
    ReserveStockCommand {
        order_id: Uuid::new_v4(),
        sku_id: sku.id,
        quantity: 4,
    }
    .execute(&t.engine)
    .await
    .unwrap();

    let snapshot = t.engine.query.get_sku_snapshot(sku.id).await.unwrap();
    assert_eq!(snapshot.sku.code, "A");
    assert_eq!(snapshot.balances.len(), 2);
    assert_eq!(snapshot.stats.total, 15);
    assert_eq!(snapshot.stats.reserved, 4);
    assert_eq!(snapshot.stats.available, 11);
    assert_eq!(snapshot.recent_movements.len(), 2);

    assert_matches!(
        t.engine.query.get_sku_snapshot(Uuid::new_v4()).await,
        Err(ServiceError::NotFound(_))
    );
}

#[tokio::test]
async fn low_stock_includes_skus_that_never_had_stock() {
    let t = TestEngine::new().await;
    let w1 = t.warehouse("W1").await;
    let plenty = t
        .sku_with(CreateSkuCommand {
            minimum_stock_level: 5,
            ..CreateSkuCommand::new("PLENTY")
        })
        .await;
    let at_minimum = t
        .sku_with(CreateSkuCommand {
            minimum_stock_level: 5,
            reorder_quantity: 20,
            ..CreateSkuCommand::new("EDGE")
        })
        .await;
    let empty = t
        .sku_with(CreateSkuCommand {
            minimum_stock_level: 1,
            ..CreateSkuCommand::new("EMPTY")
        })
        .await;
    let untracked = t.sku("UNTRACKED").await;
    t.stock_in(plenty.id, w1.id, None, 6).await;
    t.stock_in(at_minimum.id, w1.id, None, 5).await;

    let low = t.engine.query.list_low_stock().await.unwrap();
    let codes: Vec<_> = low.iter().map(|item| item.sku_code.as_str()).collect();
    assert_eq!(codes, vec!["EDGE", "EMPTY"]);
    assert_eq!(low[0].reorder_quantity, 20);
    assert_eq!(low[1].on_hand, 0);
    assert!(low.iter().all(|item| item.sku_id != untracked.id));
    assert_eq!(low[1].sku_id, empty.id);
}

#[tokio::test]
async fn search_text_wildcards_match_literally() {
    let t = TestEngine::new().await;
    let w1 = t.warehouse("W1").await;
    let plain = t.sku("ABC-1").await;
    let lookalike = t.sku("ABCX1").await;
    let underscored = t.sku("ABC_1").await;
    let other = t.sku("XYZ-2").await;
    for sku_id in [plain.id, lookalike.id, underscored.id, other.id] {
        t.stock_in(sku_id, w1.id, None, 5).await;
    }

    let search = |text: &str| InventoryFilter {
        search_text: Some(text.to_string()),
        ..Default::default()
    };

    let percent = t.engine.query.query_inventory(&search("%")).await.unwrap();
    assert!(percent.is_empty());

    let exact = t
        .engine
        .query
        .query_inventory(&search("abc_1"))
        .await
        .unwrap();
    assert_eq!(exact.len(), 1);
    assert_eq!(exact[0].sku_id, underscored.id);

    let backslash = t.engine.query.query_inventory(&search("\\")).await.unwrap();
    assert!(backslash.is_empty());
}
