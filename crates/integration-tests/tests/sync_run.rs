//! End-to-end sync runs against mock stores.

#![allow(clippy::unwrap_used)]

use pricesync::{Reconciler, ReplicationOutcome, SkipReason};
use pricesync_core::PriceRuleId;
use pricesync_integration_tests::{MockStore, SeedRule};
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, ResponseTemplate};

async fn expect_rule_create(store: &MockStore, title: &str, new_id: i64) {
    Mock::given(method("POST"))
        .and(path(MockStore::api_path("price_rules.json")))
        .and(body_partial_json(json!({"price_rule": {"title": title}})))
        .respond_with(
            ResponseTemplate::new(201)
                .set_body_json(json!({"price_rule": {"id": new_id, "title": title}})),
        )
        .expect(1)
        .mount(&store.server)
        .await;
}

async fn expect_code_create(store: &MockStore, rule_id: i64, code: &str, status: u16) {
    Mock::given(method("POST"))
        .and(path(MockStore::api_path(&format!(
            "price_rules/{rule_id}/discount_codes.json"
        ))))
        .and(body_partial_json(json!({"discount_code": {"code": code}})))
        .respond_with(ResponseTemplate::new(status).set_body_json(json!({})))
        .expect(1)
        .mount(&store.server)
        .await;
}

async fn expect_no_posts(store: &MockStore) {
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&store.server)
        .await;
}

#[tokio::test]
async fn test_each_store_gains_the_other_stores_rule() {
    let a = MockStore::start("shop-a").await;
    let b = MockStore::start("shop-b").await;
    a.seed(&[SeedRule::percentage(1, "X", "X10")]).await;
    b.seed(&[SeedRule::percentage(2, "Y", "Y10")]).await;

    expect_rule_create(&a, "Y", 9001).await;
    expect_code_create(&a, 9001, "Y10", 201).await;
    expect_rule_create(&b, "X", 9002).await;
    expect_code_create(&b, 9002, "X10", 201).await;

    let summary = Reconciler::new(vec![a.client(), b.client()]).run().await;

    assert_eq!(summary.union_size, 2);
    assert!(summary.failed_stores.is_empty());
    assert_eq!(
        summary.report("shop-a").unwrap().outcome("Y"),
        Some(&ReplicationOutcome::Created(PriceRuleId::new(9001)))
    );
    assert_eq!(
        summary.report("shop-b").unwrap().outcome("X"),
        Some(&ReplicationOutcome::Created(PriceRuleId::new(9002)))
    );

    let posted = a.posted(&MockStore::api_path("price_rules.json")).await;
    assert_eq!(posted.len(), 1);
    let body = &posted[0]["price_rule"];
    assert_eq!(body["value_type"], json!("percentage"));
    assert_eq!(body["target_selection"], json!("all"));
    assert_eq!(body["customer_selection"], json!("all"));
    assert_eq!(body["allocation_method"], json!("across"));
    assert!(body.get("id").is_none());
    assert!(body.get("admin_graphql_api_id").is_none());
    assert!(body.get("created_at").is_none());
}

#[tokio::test]
async fn test_converged_stores_post_nothing() {
    let a = MockStore::start("shop-a").await;
    let b = MockStore::start("shop-b").await;
    a.seed(&[
        SeedRule::percentage(1, "X", "X10"),
        SeedRule::percentage(3, "Y", "Y10"),
    ])
    .await;
    b.seed(&[
        SeedRule::percentage(2, "Y", "Y10"),
        SeedRule::percentage(4, "X", "X10"),
    ])
    .await;
    expect_no_posts(&a).await;
    expect_no_posts(&b).await;

    let summary = Reconciler::new(vec![a.client(), b.client()]).run().await;

    assert_eq!(summary.union_size, 2);
    assert_eq!(summary.created(), 0);
    assert!(summary.reports.iter().all(|r| r.outcomes.is_empty()));
}

#[tokio::test]
async fn test_second_run_after_sync_adds_nothing() {
    let a = MockStore::start("shop-a").await;
    let b = MockStore::start("shop-b").await;
    a.seed(&[SeedRule::percentage(1, "X", "X10")]).await;
    b.seed(&[SeedRule::percentage(2, "Y", "Y10")]).await;
    expect_rule_create(&a, "Y", 9001).await;
    expect_code_create(&a, 9001, "Y10", 201).await;
    expect_rule_create(&b, "X", 9002).await;
    expect_code_create(&b, 9002, "X10", 201).await;

    let first = Reconciler::new(vec![a.client(), b.client()]).run().await;
    assert_eq!(first.created(), 2);
    a.server.verify().await;
    b.server.verify().await;

    // Second run: each store now lists what the first run created in it.
    a.server.reset().await;
    b.server.reset().await;
    a.seed(&[
        SeedRule::percentage(1, "X", "X10"),
        SeedRule::percentage(9001, "Y", "Y10"),
    ])
    .await;
    b.seed(&[
        SeedRule::percentage(2, "Y", "Y10"),
        SeedRule::percentage(9002, "X", "X10"),
    ])
    .await;
    expect_no_posts(&a).await;
    expect_no_posts(&b).await;

    let second = Reconciler::new(vec![a.client(), b.client()]).run().await;

    assert_eq!(second.union_size, 2);
    assert_eq!(second.created(), 0);
    assert!(second.failed_stores.is_empty());
    assert!(second.reports.iter().all(|r| r.outcomes.is_empty()));
}

#[tokio::test]
async fn test_ineligible_rules_are_never_created() {
    let a = MockStore::start("shop-a").await;
    let b = MockStore::start("shop-b").await;
    a.seed(&[
        SeedRule::fixed_amount(1, "FIVE_OFF", "FIVE"),
        SeedRule::without_code(2, "NO_CODE"),
    ])
    .await;
    b.seed(&[]).await;
    expect_no_posts(&a).await;
    expect_no_posts(&b).await;

    let summary = Reconciler::new(vec![a.client(), b.client()]).run().await;

    let report = summary.report("shop-b").unwrap();
    assert_eq!(
        report.outcome("FIVE_OFF"),
        Some(&ReplicationOutcome::Skipped(SkipReason::NotPercentage))
    );
    assert_eq!(
        report.outcome("NO_CODE"),
        Some(&ReplicationOutcome::Skipped(SkipReason::NoCode))
    );
}

#[tokio::test]
async fn test_existing_code_rolls_back_exactly_once() {
    let a = MockStore::start("shop-a").await;
    let b = MockStore::start("shop-b").await;
    a.seed(&[SeedRule::percentage(1, "SUMMER10", "SUMMER10")]).await;
    b.seed(&[]).await;
    expect_no_posts(&a).await;

    expect_rule_create(&b, "SUMMER10", 4242).await;
    expect_code_create(&b, 4242, "SUMMER10", 422).await;
    Mock::given(method("DELETE"))
        .and(path(MockStore::api_path("price_rules/4242.json")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&b.server)
        .await;

    let summary = Reconciler::new(vec![a.client(), b.client()]).run().await;

    assert_eq!(
        summary.report("shop-b").unwrap().outcome("SUMMER10"),
        Some(&ReplicationOutcome::RolledBack(PriceRuleId::new(4242)))
    );
    let deletes = b
        .received("DELETE", &MockStore::api_path("price_rules/4242.json"))
        .await;
    assert_eq!(deletes.len(), 1);
    let code_posts = b
        .posted(&MockStore::api_path("price_rules/4242/discount_codes.json"))
        .await;
    assert_eq!(code_posts.len(), 1);
}

#[tokio::test]
async fn test_failed_fetch_excludes_only_that_store() {
    let broken = MockStore::start("shop-broken").await;
    let a = MockStore::start("shop-a").await;
    let b = MockStore::start("shop-b").await;

    Mock::given(method("GET"))
        .and(path(MockStore::api_path("price_rules.json")))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({"errors": "boom"})))
        .mount(&broken.server)
        .await;
    expect_no_posts(&broken).await;

    a.seed(&[SeedRule::percentage(1, "Y", "Y10")]).await;
    b.seed(&[]).await;
    expect_no_posts(&a).await;
    expect_rule_create(&b, "Y", 7001).await;
    expect_code_create(&b, 7001, "Y10", 201).await;

    let summary = Reconciler::new(vec![broken.client(), a.client(), b.client()])
        .run()
        .await;

    assert_eq!(summary.failed_stores, ["shop-broken"]);
    assert!(summary.report("shop-broken").is_none());
    let stores: Vec<&str> = summary.reports.iter().map(|r| r.store.as_str()).collect();
    assert_eq!(stores, ["shop-a", "shop-b"]);
    assert_eq!(summary.created(), 1);
}
