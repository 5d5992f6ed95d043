//! `Link` header pagination against a mock store.

#![allow(clippy::unwrap_used)]

use pricesync_integration_tests::{MockStore, SeedRule};
use wiremock::ResponseTemplate;
use wiremock::matchers::{method, path};

#[tokio::test]
async fn test_three_pages_are_collected_and_pagination_stops() {
    let store = MockStore::start("shop-a").await;
    let first = SeedRule::percentage(1, "PAGE_ONE", "ONE10");
    let second = SeedRule::percentage(2, "PAGE_TWO", "TWO10");
    let third = SeedRule::percentage(3, "PAGE_THREE", "THREE10");

    store.mount_first_page(&[first.clone()], Some("p2")).await;
    store.mount_page("p2", &[second.clone()], Some("p3")).await;
    store.mount_page("p3", &[third.clone()], None).await;
    for rule in [&first, &second, &third] {
        store.mount_rule(rule).await;
    }

    let mut client = store.client();
    let fetched = client.fetch_recent_price_rules().await.unwrap();

    assert_eq!(fetched, 3);
    assert!(client.contains("PAGE_ONE"));
    assert!(client.contains("PAGE_TWO"));
    assert!(client.contains("PAGE_THREE"));

    let listings = store
        .received("GET", &MockStore::api_path("price_rules.json"))
        .await;
    assert_eq!(listings.len(), 3);
}

#[tokio::test]
async fn test_previous_only_link_ends_pagination() {
    let store = MockStore::start("shop-a").await;
    let rule = SeedRule::percentage(1, "ONLY", "ONLY10");
    let previous = format!(
        "<{}{}?page_info=p0>; rel=\"previous\"",
        store.server.uri(),
        MockStore::api_path("price_rules.json")
    );

    wiremock::Mock::given(method("GET"))
        .and(path(MockStore::api_path("price_rules.json")))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"price_rules": [{"id": 1}]}))
                .insert_header("Link", previous.as_str()),
        )
        .expect(1)
        .mount(&store.server)
        .await;
    store.mount_rule(&rule).await;

    let mut client = store.client();
    assert_eq!(client.fetch_recent_price_rules().await.unwrap(), 1);
}

#[tokio::test]
async fn test_listing_query_carries_recency_bound() {
    let store = MockStore::start("shop-a").await;
    store.seed(&[]).await;

    let mut client = store.client();
    client.fetch_recent_price_rules().await.unwrap();

    let listings = store
        .received("GET", &MockStore::api_path("price_rules.json"))
        .await;
    let created_at_min = listings[0]
        .url
        .query_pairs()
        .find(|(k, _)| k == "created_at_min")
        .map(|(_, v)| v.into_owned())
        .unwrap();
    assert!(created_at_min.ends_with("-00:00"));
}
