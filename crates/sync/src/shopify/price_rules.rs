//! Price rule operations for the Admin REST API.
//!
//! A fetched price rule keeps every field the API returned except its
//! identity and bookkeeping timestamps, so it can be posted unchanged to
//! another store. Eligibility is always reset to "everyone, no
//! prerequisites" through [`Eligibility::open`].

use pricesync_core::{PriceRuleId, ValueType};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info, instrument, warn};

use super::{DiscountCode, RestClient, ShopifyError};

/// Remote fields that belong to the source store and are never copied.
const SOURCE_ONLY_FIELDS: &[&str] = &["id", "admin_graphql_api_id", "created_at", "updated_at"];

/// Who a price rule applies to and what it applies to.
///
/// Replicated rules are never restricted: selections are `all` and every
/// prerequisite/entitlement list is empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Eligibility {
    pub target_selection: String,
    pub customer_selection: String,
    pub prerequisite_product_ids: Vec<i64>,
    pub prerequisite_variant_ids: Vec<i64>,
    pub prerequisite_collection_ids: Vec<i64>,
    pub prerequisite_saved_search_ids: Vec<i64>,
    pub prerequisite_customer_ids: Vec<i64>,
    pub entitled_product_ids: Vec<i64>,
    pub entitled_variant_ids: Vec<i64>,
    pub entitled_collection_ids: Vec<i64>,
    pub entitled_country_ids: Vec<i64>,
}

impl Eligibility {
    /// Wire names of every eligibility field.
    pub const FIELDS: &'static [&'static str] = &[
        "target_selection",
        "customer_selection",
        "prerequisite_product_ids",
        "prerequisite_variant_ids",
        "prerequisite_collection_ids",
        "prerequisite_saved_search_ids",
        "prerequisite_customer_ids",
        "entitled_product_ids",
        "entitled_variant_ids",
        "entitled_collection_ids",
        "entitled_country_ids",
    ];

    /// Applies to every customer and every line, with no prerequisites.
    #[must_use]
    pub fn open() -> Self {
        Self {
            target_selection: "all".to_string(),
            customer_selection: "all".to_string(),
            prerequisite_product_ids: Vec::new(),
            prerequisite_variant_ids: Vec::new(),
            prerequisite_collection_ids: Vec::new(),
            prerequisite_saved_search_ids: Vec::new(),
            prerequisite_customer_ids: Vec::new(),
            entitled_product_ids: Vec::new(),
            entitled_variant_ids: Vec::new(),
            entitled_collection_ids: Vec::new(),
            entitled_country_ids: Vec::new(),
        }
    }
}

impl Default for Eligibility {
    fn default() -> Self {
        Self::open()
    }
}

/// A price rule as returned by `GET price_rules/{id}.json`.
#[derive(Debug, Clone, Deserialize)]
pub struct RemotePriceRule {
    pub title: String,
    pub value: String,
    pub value_type: ValueType,
    #[serde(default)]
    pub once_per_customer: bool,
    pub target_type: String,
    /// Every other field, verbatim.
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

/// One entry of `GET price_rules.json`; only the id is used.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PriceRuleSummary {
    pub id: PriceRuleId,
}

/// Result of creating a price rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PriceRuleCreation {
    /// HTTP 201 with the new rule's id.
    Created(PriceRuleId),
    /// Any other status. No discount code may be created for this rule.
    Rejected { status: u16, body: String },
}

/// A promotional price rule.
///
/// Identity across stores is the title alone; see
/// [`crate::identity::title_key`].
#[derive(Debug, Clone)]
pub struct PriceRule {
    id: Option<PriceRuleId>,
    title: String,
    value: String,
    value_type: ValueType,
    once_per_customer: bool,
    target_type: String,
    eligibility: Eligibility,
    attributes: Map<String, Value>,
    discount_code: Option<DiscountCode>,
}

/// Builder for [`PriceRule`].
///
/// Starts from a percentage line-item rule with open eligibility and no
/// discount code.
#[derive(Debug, Clone)]
pub struct PriceRuleBuilder {
    rule: PriceRule,
}

impl PriceRuleBuilder {
    #[must_use]
    pub fn value(mut self, value: impl Into<String>) -> Self {
        self.rule.value = value.into();
        self
    }

    #[must_use]
    pub const fn value_type(mut self, value_type: ValueType) -> Self {
        self.rule.value_type = value_type;
        self
    }

    #[must_use]
    pub const fn once_per_customer(mut self, once: bool) -> Self {
        self.rule.once_per_customer = once;
        self
    }

    #[must_use]
    pub fn target_type(mut self, target_type: impl Into<String>) -> Self {
        self.rule.target_type = target_type.into();
        self
    }

    /// Extra wire fields (e.g. `allocation_method`, `starts_at`).
    ///
    /// Source-only and eligibility fields are dropped.
    #[must_use]
    pub fn attributes(mut self, mut attributes: Map<String, Value>) -> Self {
        for field in SOURCE_ONLY_FIELDS.iter().chain(Eligibility::FIELDS) {
            attributes.remove(*field);
        }
        self.rule.attributes = attributes;
        self
    }

    #[must_use]
    pub fn discount_code(mut self, code: DiscountCode) -> Self {
        self.rule.discount_code = Some(code);
        self
    }

    #[must_use]
    pub fn build(self) -> PriceRule {
        self.rule
    }
}

#[derive(Deserialize)]
struct PriceRuleEnvelope<T> {
    price_rule: T,
}

#[derive(Serialize)]
struct PriceRulePayload<'a> {
    price_rule: PriceRuleBody<'a>,
}

#[derive(Serialize)]
struct PriceRuleBody<'a> {
    title: &'a str,
    value: &'a str,
    value_type: ValueType,
    once_per_customer: bool,
    target_type: &'a str,
    #[serde(flatten)]
    eligibility: &'a Eligibility,
    #[serde(flatten)]
    attributes: &'a Map<String, Value>,
}

impl PriceRule {
    /// Start building a rule with the given title.
    #[must_use]
    pub fn builder(title: impl Into<String>) -> PriceRuleBuilder {
        PriceRuleBuilder {
            rule: Self {
                id: None,
                title: title.into(),
                value: "0.0".to_string(),
                value_type: ValueType::Percentage,
                once_per_customer: false,
                target_type: "line_item".to_string(),
                eligibility: Eligibility::open(),
                attributes: Map::new(),
                discount_code: None,
            },
        }
    }

    /// Build a replication template from a fetched rule.
    #[must_use]
    pub fn from_remote(remote: RemotePriceRule) -> PriceRuleBuilder {
        Self::builder(remote.title)
            .value(remote.value)
            .value_type(remote.value_type)
            .once_per_customer(remote.once_per_customer)
            .target_type(remote.target_type)
            .attributes(remote.other)
    }

    /// Fetch a price rule and its discount code.
    ///
    /// Costs two API calls: the rule, then its discount code listing.
    ///
    /// # Errors
    ///
    /// Returns an error if either request fails or cannot be parsed.
    #[instrument(skip_all, fields(store = %client.site_name(), price_rule_id = %id))]
    pub async fn fetch(client: &RestClient, id: PriceRuleId) -> Result<Self, ShopifyError> {
        debug!("Fetching price rule");
        let path = client.api_path(&format!("price_rules/{id}.json"));
        let envelope: PriceRuleEnvelope<RemotePriceRule> =
            client.get(&path).await?.error_for_status()?.parse()?;

        let discount_code = DiscountCode::fetch(client, id).await?;

        Ok(Self::from_remote(envelope.price_rule)
            .discount_code(discount_code)
            .build())
    }

    /// Remote id, set only after a successful [`PriceRule::create`].
    #[must_use]
    pub const fn id(&self) -> Option<PriceRuleId> {
        self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    #[must_use]
    pub const fn value_type(&self) -> ValueType {
        self.value_type
    }

    #[must_use]
    pub const fn eligibility(&self) -> &Eligibility {
        &self.eligibility
    }

    #[must_use]
    pub const fn attributes(&self) -> &Map<String, Value> {
        &self.attributes
    }

    /// The rule's discount code slot. `None` means it was never populated.
    #[must_use]
    pub const fn discount_code(&self) -> Option<&DiscountCode> {
        self.discount_code.as_ref()
    }

    #[must_use]
    pub const fn is_percentage(&self) -> bool {
        self.value_type.is_percentage()
    }

    /// Percentage rule with a present discount code.
    #[must_use]
    pub fn is_replicable(&self) -> bool {
        self.is_percentage() && self.discount_code.as_ref().is_some_and(DiscountCode::is_present)
    }

    fn payload(&self) -> PriceRulePayload<'_> {
        PriceRulePayload {
            price_rule: PriceRuleBody {
                title: &self.title,
                value: &self.value,
                value_type: self.value_type,
                once_per_customer: self.once_per_customer,
                target_type: &self.target_type,
                eligibility: &self.eligibility,
                attributes: &self.attributes,
            },
        }
    }

    /// Create this rule in the client's store and record the new id.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or a 201 body has no id.
    /// Other statuses are reported through [`PriceRuleCreation::Rejected`].
    #[instrument(skip_all, fields(store = %client.site_name(), title = %self.title))]
    pub async fn create(&mut self, client: &RestClient) -> Result<PriceRuleCreation, ShopifyError> {
        info!("Creating price rule");
        let response = client
            .post(&client.api_path("price_rules.json"), &self.payload())
            .await?;

        if response.status != StatusCode::CREATED {
            warn!(
                status = response.status.as_u16(),
                body = %response.body,
                "Price rule could not be created"
            );
            return Ok(PriceRuleCreation::Rejected {
                status: response.status.as_u16(),
                body: response.body.to_string(),
            });
        }

        let created: PriceRuleEnvelope<PriceRuleSummary> = response.parse()?;
        let id = created.price_rule.id;
        self.id = Some(id);
        info!(price_rule_id = %id, "Price rule created");
        Ok(PriceRuleCreation::Created(id))
    }
}
