//! Integration tests for pricesync.
//!
//! Each store is a `wiremock` server speaking the subset of the Admin REST
//! API the sync uses. Scenarios live in `tests/`.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p pricesync-integration-tests
//! ```

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::time::Duration;

use pricesync::shopify::{FixedWindow, RestClient, ShopCredentials};
use pricesync::{StoreClient, TimeWindow};
use secrecy::SecretString;
use serde_json::{Value, json};
use url::Url;
use wiremock::matchers::{method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

/// API version used by every mock store.
pub const API_VERSION: &str = "2021-07";

/// A price rule as seeded into a mock store.
#[derive(Debug, Clone)]
pub struct SeedRule {
    pub id: i64,
    pub title: &'static str,
    pub value_type: &'static str,
    pub code: Option<&'static str>,
}

impl SeedRule {
    /// A percentage rule with a code.
    #[must_use]
    pub const fn percentage(id: i64, title: &'static str, code: &'static str) -> Self {
        Self {
            id,
            title,
            value_type: "percentage",
            code: Some(code),
        }
    }

    #[must_use]
    pub const fn fixed_amount(id: i64, title: &'static str, code: &'static str) -> Self {
        Self {
            id,
            title,
            value_type: "fixed_amount",
            code: Some(code),
        }
    }

    #[must_use]
    pub const fn without_code(id: i64, title: &'static str) -> Self {
        Self {
            id,
            title,
            value_type: "percentage",
            code: None,
        }
    }
}

/// A mock store.
pub struct MockStore {
    pub site_name: String,
    pub server: MockServer,
}

impl MockStore {
    pub async fn start(site_name: &str) -> Self {
        Self {
            site_name: site_name.to_string(),
            server: MockServer::start().await,
        }
    }

    /// Versioned API path, e.g. `/admin/api/2021-07/price_rules.json`.
    #[must_use]
    pub fn api_path(resource: &str) -> String {
        format!("/admin/api/{API_VERSION}/{resource}")
    }

    /// Absolute `rel="next"` link to listing page `page_info`.
    #[must_use]
    pub fn next_link(&self, page_info: &str) -> String {
        format!(
            "<{}{}?limit=250&page_info={page_info}>; rel=\"next\"",
            self.server.uri(),
            Self::api_path("price_rules.json")
        )
    }

    /// Serve `rules` as a single listing page plus their detail endpoints.
    pub async fn seed(&self, rules: &[SeedRule]) {
        self.mount_first_page(rules, None).await;
        for rule in rules {
            self.mount_rule(rule).await;
        }
    }

    /// Serve the first listing page (the request without `page_info`).
    pub async fn mount_first_page(&self, rules: &[SeedRule], next: Option<&str>) {
        let mut template = ResponseTemplate::new(200).set_body_json(listing(rules));
        if let Some(next) = next {
            template = template.insert_header("Link", self.next_link(next).as_str());
        }
        Mock::given(method("GET"))
            .and(path(Self::api_path("price_rules.json")))
            .and(query_param("limit", "250"))
            .and(query_param_is_missing("page_info"))
            .respond_with(template)
            .expect(1)
            .mount(&self.server)
            .await;
    }

    /// Serve listing page `page_info`.
    pub async fn mount_page(&self, page_info: &str, rules: &[SeedRule], next: Option<&str>) {
        let mut template = ResponseTemplate::new(200).set_body_json(listing(rules));
        if let Some(next) = next {
            template = template.insert_header("Link", self.next_link(next).as_str());
        }
        Mock::given(method("GET"))
            .and(path(Self::api_path("price_rules.json")))
            .and(query_param("page_info", page_info))
            .respond_with(template)
            .expect(1)
            .mount(&self.server)
            .await;
    }

    /// Serve one rule and its discount code listing.
    pub async fn mount_rule(&self, rule: &SeedRule) {
        Mock::given(method("GET"))
            .and(path(Self::api_path(&format!("price_rules/{}.json", rule.id))))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "price_rule": {
                    "id": rule.id,
                    "admin_graphql_api_id": format!("gid://shopify/PriceRule/{}", rule.id),
                    "title": rule.title,
                    "value": "-10.0",
                    "value_type": rule.value_type,
                    "target_type": "line_item",
                    "target_selection": "all",
                    "customer_selection": "all",
                    "allocation_method": "across",
                    "once_per_customer": false,
                    "starts_at": "2021-07-01T00:00:00-04:00",
                    "created_at": "2021-07-01T12:00:00-04:00",
                    "updated_at": "2021-07-01T12:00:00-04:00"
                }
            })))
            .mount(&self.server)
            .await;

        let codes = rule.code.map_or_else(Vec::new, |code| {
            vec![json!({
                "id": rule.id * 10,
                "price_rule_id": rule.id,
                "code": code,
                "usage_count": 0,
                "created_at": "2021-07-01T12:00:00-04:00"
            })]
        });
        Mock::given(method("GET"))
            .and(path(Self::api_path(&format!(
                "price_rules/{}/discount_codes.json",
                rule.id
            ))))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"discount_codes": codes})))
            .mount(&self.server)
            .await;
    }

    /// Store client pointed at this mock, with a throttle fast enough for tests.
    #[must_use]
    pub fn client(&self) -> StoreClient {
        let credentials =
            ShopCredentials::new(&self.site_name, "4f1c9a7e", SecretString::from("shppa_9f8e7d6c"))
                .unwrap()
                .with_base_url(Url::parse(&self.server.uri()).unwrap());
        let client = RestClient::with_limiter(
            credentials,
            API_VERSION,
            FixedWindow::new(100, Duration::from_secs(1)),
        )
        .unwrap();
        StoreClient::new(client, TimeWindow::from_hours(1))
    }

    /// Requests received with the given method and path.
    pub async fn received(&self, http_method: &str, request_path: &str) -> Vec<Request> {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .into_iter()
            .filter(|r| r.method.as_str() == http_method && r.url.path() == request_path)
            .collect()
    }

    /// JSON bodies of POSTs to `request_path`.
    pub async fn posted(&self, request_path: &str) -> Vec<Value> {
        self.received("POST", request_path)
            .await
            .iter()
            .map(|r| r.body_json::<Value>().unwrap())
            .collect()
    }
}

fn listing(rules: &[SeedRule]) -> Value {
    let ids: Vec<Value> = rules.iter().map(|r| json!({"id": r.id})).collect();
    json!({"price_rules": ids})
}
