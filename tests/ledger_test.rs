mod common;

use assert_matches::assert_matches;
use uuid::Uuid;

use common::{LocationSeed, TestApp};
use stockroom::entities::stock_location::VariantKey;
use stockroom::errors::ServiceError;
use stockroom::services::AdjustBy;

#[tokio::test]
async fn sub_reserve_policy_prefers_priority_then_smallest_bin() {
    let app = TestApp::spawn().await;
    let warehouse = Uuid::new_v4();
    let key = VariantKey::of_product(Uuid::new_v4());

    let small = app
        .seed_location(LocationSeed::new(warehouse, key.clone(), 3, 0))
        .await;
    let _large = app
        .seed_location(LocationSeed::new(warehouse, key.clone(), 50, 0))
        .await;

    let picked = app
        .state
        .context
        .selector
        .by_sub_reserve(warehouse, &key)
        .await
        .unwrap()
        .expect("candidate");
    assert_eq!(picked.id, small.id, "smallest sufficient bin wins");

    // An explicitly prioritized bin beats the size tie-break.
    let prioritized = app
        .seed_location(LocationSeed::new(warehouse, key.clone(), 100, 0).with_priority(5))
        .await;
    let picked = app
        .state
        .context
        .selector
        .by_sub_reserve(warehouse, &key)
        .await
        .unwrap()
        .expect("candidate");
    assert_eq!(picked.id, prioritized.id);
}

#[tokio::test]
async fn sub_reserve_policy_skips_fully_reserved_bins() {
    let app = TestApp::spawn().await;
    let warehouse = Uuid::new_v4();
    let key = VariantKey::of_product(Uuid::new_v4());

    app.seed_location(LocationSeed::new(warehouse, key.clone(), 5, 5))
        .await;

    let picked = app
        .state
        .context
        .selector
        .by_sub_reserve(warehouse, &key)
        .await
        .unwrap();
    assert!(picked.is_none(), "a bin with no free capacity is no candidate");
}

#[tokio::test]
async fn reserve_max_policy_picks_largest_reserve_holding_bin() {
    let app = TestApp::spawn().await;
    let warehouse = Uuid::new_v4();
    let key = VariantKey::of_product(Uuid::new_v4());

    app.seed_location(LocationSeed::new(warehouse, key.clone(), 40, 0))
        .await;
    let holding = app
        .seed_location(LocationSeed::new(warehouse, key.clone(), 20, 4))
        .await;
    app.seed_location(LocationSeed::new(warehouse, key.clone(), 5, 2))
        .await;

    let picked = app
        .state
        .context
        .selector
        .by_reserve_max(warehouse, &key)
        .await
        .unwrap()
        .expect("candidate");
    assert_eq!(picked.id, holding.id, "largest bin among reserve holders");
}

#[tokio::test]
async fn total_policies_scope_to_stocked_bins() {
    let app = TestApp::spawn().await;
    let warehouse = Uuid::new_v4();
    let key = VariantKey::of_product(Uuid::new_v4());

    let both = app
        .seed_location(LocationSeed::new(warehouse, key.clone(), 10, 3))
        .await;
    let biggest = app
        .seed_location(LocationSeed::new(warehouse, key.clone(), 25, 0))
        .await;

    let min = app
        .state
        .context
        .selector
        .by_total_min(warehouse, &key)
        .await
        .unwrap()
        .expect("candidate");
    assert_eq!(min.id, both.id, "total-min requires stock and reservations");

    let max = app
        .state
        .context
        .selector
        .by_total_max(warehouse, &key)
        .await
        .unwrap()
        .expect("candidate");
    assert_eq!(max.id, biggest.id);
}

#[tokio::test]
async fn absent_discriminators_match_null_not_wildcard() {
    let app = TestApp::spawn().await;
    let warehouse = Uuid::new_v4();
    let product = Uuid::new_v4();

    let with_offer = VariantKey {
        product_id: product,
        offer_id: Some(Uuid::new_v4()),
        variation_id: None,
        modification_id: None,
    };
    app.seed_location(LocationSeed::new(warehouse, with_offer.clone(), 10, 0))
        .await;

    let bare = VariantKey::of_product(product);
    let picked = app
        .state
        .context
        .selector
        .by_total_max(warehouse, &bare)
        .await
        .unwrap();
    assert!(
        picked.is_none(),
        "a key without an offer must not match rows that carry one"
    );

    let picked = app
        .state
        .context
        .selector
        .by_total_max(warehouse, &with_offer)
        .await
        .unwrap();
    assert!(picked.is_some());
}

#[tokio::test]
async fn placement_lookup_matches_exact_bin_label() {
    let app = TestApp::spawn().await;
    let warehouse = Uuid::new_v4();
    let key = VariantKey::of_product(Uuid::new_v4());

    let labelled = app
        .seed_location(LocationSeed::new(warehouse, key.clone(), 8, 0).with_storage("a-12"))
        .await;
    let unlabelled = app
        .seed_location(LocationSeed::new(warehouse, key.clone(), 3, 0))
        .await;

    let selector = &app.state.context.selector;
    let found = selector
        .find_placement(warehouse, &key, Some("a-12"))
        .await
        .unwrap()
        .expect("labelled bin");
    assert_eq!(found.id, labelled.id);

    let found = selector
        .find_placement(warehouse, &key, None)
        .await
        .unwrap()
        .expect("unlabelled bin");
    assert_eq!(found.id, unlabelled.id);

    assert!(selector
        .find_placement(warehouse, &key, Some("b-1"))
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn reserve_increment_is_gated_on_free_capacity() {
    let app = TestApp::spawn().await;
    let warehouse = Uuid::new_v4();
    let key = VariantKey::of_product(Uuid::new_v4());
    let row = app
        .seed_location(LocationSeed::new(warehouse, key, 5, 4))
        .await;

    let adjuster = &app.state.context.adjuster;
    adjuster.add(row.id, AdjustBy::reserve(1)).await.unwrap();

    // Now fully reserved; the next increment must lose the gate.
    let result = adjuster.add(row.id, AdjustBy::reserve(1)).await;
    assert_matches!(result, Err(ServiceError::StaleCandidate(_)));

    let row = app.location(row.id).await.expect("row still present");
    assert_eq!(row.total, 5);
    assert_eq!(row.reserve, 5, "failed increment must not partially apply");
}

#[tokio::test]
async fn decrement_below_zero_is_rejected_not_clamped() {
    let app = TestApp::spawn().await;
    let warehouse = Uuid::new_v4();
    let key = VariantKey::of_product(Uuid::new_v4());
    let row = app
        .seed_location(LocationSeed::new(warehouse, key, 10, 2))
        .await;

    let adjuster = &app.state.context.adjuster;
    let result = adjuster.sub(row.id, AdjustBy::reserve(3)).await;
    assert_matches!(result, Err(ServiceError::StaleCandidate(_)));

    let result = adjuster.sub(row.id, AdjustBy::total(11)).await;
    assert_matches!(result, Err(ServiceError::StaleCandidate(_)));

    let row = app.location(row.id).await.expect("row still present");
    assert_eq!(row.total, 10);
    assert_eq!(row.reserve, 2);
}

#[tokio::test]
async fn emptied_rows_are_deleted() {
    let app = TestApp::spawn().await;
    let warehouse = Uuid::new_v4();
    let key = VariantKey::of_product(Uuid::new_v4());
    let row = app
        .seed_location(LocationSeed::new(warehouse, key, 2, 2))
        .await;

    let adjuster = &app.state.context.adjuster;
    adjuster.sub(row.id, AdjustBy::both(2, 2)).await.unwrap();

    assert!(
        app.location(row.id).await.is_none(),
        "a row at total 0 and reserve 0 must not persist"
    );
}

#[tokio::test]
async fn partial_decrement_keeps_the_row() {
    let app = TestApp::spawn().await;
    let warehouse = Uuid::new_v4();
    let key = VariantKey::of_product(Uuid::new_v4());
    let row = app
        .seed_location(LocationSeed::new(warehouse, key, 5, 3))
        .await;

    app.state
        .context
        .adjuster
        .sub(row.id, AdjustBy::both(3, 3))
        .await
        .unwrap();

    let row = app.location(row.id).await.expect("row survives");
    assert_eq!(row.total, 2);
    assert_eq!(row.reserve, 0);
}
