mod common;

use uuid::Uuid;

use common::{LocationSeed, TestApp};
use stockroom::consumers::{
    IncomingStockMessage, OrderDecommissionedMessage, OrderPackagedMessage, ReleaseUnitMessage,
    RequestStatusChangedMessage,
};
use stockroom::entities::stock_location::VariantKey;
use stockroom::entities::stock_request::RequestStatus;
use stockroom::message_queue::topics;
use stockroom::resolvers::{OrderLine, OrderSnapshot};

fn snapshot(order_id: Uuid, warehouse_id: Uuid, key: &VariantKey, quantity: i32) -> OrderSnapshot {
    OrderSnapshot {
        id: order_id,
        status: "packaging".to_string(),
        warehouse_id,
        responsible_id: Uuid::new_v4(),
        lines: vec![OrderLine {
            key: key.clone(),
            quantity,
            storage: None,
        }],
    }
}

#[tokio::test]
async fn packaged_order_creates_request_and_reserves_stock() {
    let app = TestApp::spawn().await;
    let warehouse = Uuid::new_v4();
    let key = VariantKey::of_product(Uuid::new_v4());
    let bin = app
        .seed_location(LocationSeed::new(warehouse, key.clone(), 10, 0))
        .await;

    let order_id = Uuid::new_v4();
    app.orders.insert(snapshot(order_id, warehouse, &key, 3));
    app.publish(
        topics::ORDER_PACKAGED,
        &OrderPackagedMessage {
            order_id,
            acting_user: Uuid::new_v4(),
        },
    )
    .await;
    app.drain().await;

    let request = app
        .state
        .context
        .requests
        .find_by_order(order_id)
        .await
        .unwrap()
        .expect("request created from order");
    assert_eq!(request.request_status(), Some(RequestStatus::Package));
    assert!(request.number.starts_with("PKG-"));

    let (_, items) = app
        .state
        .context
        .requests
        .load_with_items(request.id)
        .await
        .unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].quantity, 3);

    let bin = app.location(bin.id).await.expect("bin");
    assert_eq!(bin.total, 10);
    assert_eq!(bin.reserve, 3);
}

#[tokio::test]
async fn duplicate_order_message_is_idempotent() {
    let app = TestApp::spawn().await;
    let warehouse = Uuid::new_v4();
    let key = VariantKey::of_product(Uuid::new_v4());
    let bin = app
        .seed_location(LocationSeed::new(warehouse, key.clone(), 10, 0))
        .await;

    let order_id = Uuid::new_v4();
    app.orders.insert(snapshot(order_id, warehouse, &key, 2));
    let message = OrderPackagedMessage {
        order_id,
        acting_user: Uuid::new_v4(),
    };

    app.publish(topics::ORDER_PACKAGED, &message).await;
    app.drain().await;
    app.publish(topics::ORDER_PACKAGED, &message).await;
    app.drain().await;

    let bin = app.location(bin.id).await.expect("bin");
    assert_eq!(bin.reserve, 2, "redelivery must not double-reserve");
}

#[tokio::test]
async fn fan_out_lands_units_on_the_smallest_sufficient_bin() {
    let app = TestApp::spawn().await;
    let warehouse = Uuid::new_v4();
    let key = VariantKey::of_product(Uuid::new_v4());
    let small = app
        .seed_location(LocationSeed::new(warehouse, key.clone(), 5, 0))
        .await;
    let large = app
        .seed_location(LocationSeed::new(warehouse, key.clone(), 50, 0))
        .await;

    let order_id = Uuid::new_v4();
    app.orders.insert(snapshot(order_id, warehouse, &key, 4));
    app.publish(
        topics::ORDER_PACKAGED,
        &OrderPackagedMessage {
            order_id,
            acting_user: Uuid::new_v4(),
        },
    )
    .await;
    app.drain().await;

    let small = app.location(small.id).await.expect("small bin");
    let large = app.location(large.id).await.expect("large bin");
    assert_eq!(small.reserve, 4, "small bin absorbs all units it can hold");
    assert_eq!(large.reserve, 0, "large bin stays intact for bulk orders");
}

#[tokio::test]
async fn completion_debits_reserved_stock() {
    let app = TestApp::spawn().await;
    let warehouse = Uuid::new_v4();
    let key = VariantKey::of_product(Uuid::new_v4());
    let bin = app
        .seed_location(LocationSeed::new(warehouse, key.clone(), 10, 0))
        .await;

    let order_id = Uuid::new_v4();
    let acting_user = Uuid::new_v4();
    app.orders.insert(snapshot(order_id, warehouse, &key, 3));
    app.publish(
        topics::ORDER_PACKAGED,
        &OrderPackagedMessage {
            order_id,
            acting_user,
        },
    )
    .await;
    app.drain().await;

    let request = app
        .state
        .context
        .requests
        .find_by_order(order_id)
        .await
        .unwrap()
        .expect("request");

    for to_status in [RequestStatus::Extradition, RequestStatus::Completed] {
        app.publish(
            topics::REQUEST_STATUS_CHANGED,
            &RequestStatusChangedMessage {
                request_id: request.id,
                to_status,
                acting_user,
            },
        )
        .await;
    }
    app.drain().await;

    let request = app.state.context.requests.load(request.id).await.unwrap();
    assert_eq!(request.request_status(), Some(RequestStatus::Completed));

    let bin = app.location(bin.id).await.expect("bin");
    assert_eq!(bin.total, 7, "completed units physically leave the warehouse");
    assert_eq!(bin.reserve, 0);
}

#[tokio::test]
async fn fully_reserved_priority_bin_is_passed_over() {
    let app = TestApp::spawn().await;
    let warehouse = Uuid::new_v4();
    let key = VariantKey::of_product(Uuid::new_v4());
    let full = app
        .seed_location(LocationSeed::new(warehouse, key.clone(), 5, 5).with_priority(5))
        .await;
    let plain = app
        .seed_location(LocationSeed::new(warehouse, key.clone(), 10, 0))
        .await;

    let order_id = Uuid::new_v4();
    app.orders.insert(snapshot(order_id, warehouse, &key, 2));
    app.publish(
        topics::ORDER_PACKAGED,
        &OrderPackagedMessage {
            order_id,
            acting_user: Uuid::new_v4(),
        },
    )
    .await;
    app.drain().await;

    let full = app.location(full.id).await.expect("prioritized bin");
    let plain = app.location(plain.id).await.expect("plain bin");
    assert_eq!(
        full.reserve, 5,
        "a bin with no free capacity is excluded despite its priority"
    );
    assert_eq!(plain.reserve, 2, "the lower-priority bin takes the reservation");
}

#[tokio::test]
async fn transfer_branch_returns_the_request_to_incoming() {
    let app = TestApp::spawn().await;
    let warehouse = Uuid::new_v4();
    let request = app.seed_request(warehouse, RequestStatus::Purchase).await;
    let acting_user = Uuid::new_v4();

    // Incoming is visited twice: once on the forward path, once when the
    // transfer branch loops back. The second advancement must not be
    // mistaken for a redelivery of the first.
    for to_status in [
        RequestStatus::Incoming,
        RequestStatus::Warehouse,
        RequestStatus::Moving,
        RequestStatus::Incoming,
    ] {
        app.publish(
            topics::REQUEST_STATUS_CHANGED,
            &RequestStatusChangedMessage {
                request_id: request.id,
                to_status,
                acting_user,
            },
        )
        .await;
        app.drain().await;
    }

    let request = app.state.context.requests.load(request.id).await.unwrap();
    assert_eq!(request.request_status(), Some(RequestStatus::Incoming));
}

#[tokio::test]
async fn divide_branch_round_trips_through_warehouse() {
    let app = TestApp::spawn().await;
    let warehouse = Uuid::new_v4();
    let request = app.seed_request(warehouse, RequestStatus::Warehouse).await;
    let acting_user = Uuid::new_v4();

    for to_status in [RequestStatus::Divide, RequestStatus::Warehouse] {
        app.publish(
            topics::REQUEST_STATUS_CHANGED,
            &RequestStatusChangedMessage {
                request_id: request.id,
                to_status,
                acting_user,
            },
        )
        .await;
        app.drain().await;
    }

    let request = app.state.context.requests.load(request.id).await.unwrap();
    assert_eq!(request.request_status(), Some(RequestStatus::Warehouse));
}

#[tokio::test]
async fn unexpected_status_message_is_dropped_without_mutation() {
    let app = TestApp::spawn().await;
    let warehouse = Uuid::new_v4();
    let key = VariantKey::of_product(Uuid::new_v4());
    app.seed_location(LocationSeed::new(warehouse, key.clone(), 10, 0))
        .await;

    let order_id = Uuid::new_v4();
    app.orders.insert(snapshot(order_id, warehouse, &key, 1));
    app.publish(
        topics::ORDER_PACKAGED,
        &OrderPackagedMessage {
            order_id,
            acting_user: Uuid::new_v4(),
        },
    )
    .await;
    app.drain().await;

    let request = app
        .state
        .context
        .requests
        .find_by_order(order_id)
        .await
        .unwrap()
        .expect("request");

    // Package -> Incoming is not in the transition table.
    app.publish(
        topics::REQUEST_STATUS_CHANGED,
        &RequestStatusChangedMessage {
            request_id: request.id,
            to_status: RequestStatus::Incoming,
            acting_user: Uuid::new_v4(),
        },
    )
    .await;
    app.drain().await;

    let request = app.state.context.requests.load(request.id).await.unwrap();
    assert_eq!(
        request.request_status(),
        Some(RequestStatus::Package),
        "a state-mismatched message must not advance the request"
    );
    assert_eq!(
        app.queue.depth(topics::REQUEST_STATUS_CHANGED),
        0,
        "the anomalous message is dropped, not retried"
    );
}

#[tokio::test]
async fn release_returns_reserved_units() {
    let app = TestApp::spawn().await;
    let warehouse = Uuid::new_v4();
    let key = VariantKey::of_product(Uuid::new_v4());
    let bin = app
        .seed_location(LocationSeed::new(warehouse, key.clone(), 10, 5))
        .await;

    app.publish(
        topics::RELEASE_UNIT,
        &ReleaseUnitMessage {
            request_id: Uuid::new_v4(),
            warehouse_id: warehouse,
            key,
            quantity: 2,
            iterate: 0,
            acting_user: Uuid::new_v4(),
        },
    )
    .await;
    app.drain().await;

    let bin = app.location(bin.id).await.expect("bin");
    assert_eq!(bin.total, 10);
    assert_eq!(bin.reserve, 3);
}

#[tokio::test]
async fn decommissioned_order_writes_off_its_request() {
    let app = TestApp::spawn().await;
    let warehouse = Uuid::new_v4();
    let key = VariantKey::of_product(Uuid::new_v4());
    let bin = app
        .seed_location(LocationSeed::new(warehouse, key.clone(), 10, 0))
        .await;

    let order_id = Uuid::new_v4();
    app.orders.insert(snapshot(order_id, warehouse, &key, 2));
    app.publish(
        topics::ORDER_PACKAGED,
        &OrderPackagedMessage {
            order_id,
            acting_user: Uuid::new_v4(),
        },
    )
    .await;
    app.drain().await;

    app.publish(
        topics::ORDER_DECOMMISSIONED,
        &OrderDecommissionedMessage {
            order_id,
            acting_user: Uuid::new_v4(),
        },
    )
    .await;
    app.drain().await;

    let request = app
        .state
        .context
        .requests
        .find_by_order(order_id)
        .await
        .unwrap()
        .expect("request");
    assert_eq!(request.request_status(), Some(RequestStatus::Decommission));

    let bin = app.location(bin.id).await.expect("bin");
    assert_eq!(bin.total, 8, "written-off units leave the ledger");
    assert_eq!(bin.reserve, 0);
}

#[tokio::test]
async fn incoming_stock_books_new_and_existing_placements() {
    let app = TestApp::spawn().await;
    let warehouse = Uuid::new_v4();
    let key = VariantKey::of_product(Uuid::new_v4());
    let acting_user = Uuid::new_v4();

    let intake = |reference: &str| IncomingStockMessage {
        warehouse_id: warehouse,
        key: key.clone(),
        quantity: 5,
        storage: Some("  A-3 ".to_string()),
        price: None,
        reference: reference.to_string(),
        acting_user,
    };

    app.publish(topics::INCOMING_STOCK, &intake("doc-1")).await;
    app.drain().await;

    let row = app
        .state
        .context
        .selector
        .find_placement(warehouse, &key, Some("a-3"))
        .await
        .unwrap()
        .expect("intake created a labelled row");
    assert_eq!(row.total, 5);
    assert_eq!(row.storage.as_deref(), Some("a-3"), "label is normalized");

    // Same intake document again: deduplicated.
    app.publish(topics::INCOMING_STOCK, &intake("doc-1")).await;
    app.drain().await;
    let row = app.location(row.id).await.expect("row");
    assert_eq!(row.total, 5);

    // A fresh document tops up the existing placement.
    app.publish(topics::INCOMING_STOCK, &intake("doc-2")).await;
    app.drain().await;
    let row = app.location(row.id).await.expect("row");
    assert_eq!(row.total, 10);
}

#[tokio::test]
async fn completion_flags_low_bins_for_recount() {
    let app = TestApp::spawn_with_config(|config| {
        config.approval.default_threshold = 5;
    })
    .await;
    let warehouse = Uuid::new_v4();
    let key = VariantKey::of_product(Uuid::new_v4());
    let bin = app
        .seed_location(LocationSeed::new(warehouse, key.clone(), 6, 0))
        .await;

    let order_id = Uuid::new_v4();
    let acting_user = Uuid::new_v4();
    app.orders.insert(snapshot(order_id, warehouse, &key, 3));
    app.publish(
        topics::ORDER_PACKAGED,
        &OrderPackagedMessage {
            order_id,
            acting_user,
        },
    )
    .await;
    app.drain().await;

    let request = app
        .state
        .context
        .requests
        .find_by_order(order_id)
        .await
        .unwrap()
        .expect("request");
    for to_status in [RequestStatus::Extradition, RequestStatus::Completed] {
        app.publish(
            topics::REQUEST_STATUS_CHANGED,
            &RequestStatusChangedMessage {
                request_id: request.id,
                to_status,
                acting_user,
            },
        )
        .await;
    }
    app.drain().await;

    let bin = app.location(bin.id).await.expect("bin");
    assert_eq!(bin.total, 3);
    assert!(
        !bin.approve,
        "a bin below the threshold is flagged for manual recount"
    );
}
