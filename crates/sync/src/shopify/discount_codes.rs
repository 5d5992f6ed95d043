//! Discount code operations for the Admin REST API.

use chrono::{DateTime, FixedOffset};
use pricesync_core::{DiscountCodeId, PriceRuleId};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use super::{RestClient, ShopifyError};

/// The customer-facing code attached to a price rule.
///
/// A price rule is expected to carry a single code. `code` is `None` when the
/// rule has no discount codes at all, which makes the rule ineligible for
/// replication.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscountCode {
    /// Remote id in the store the code was fetched from. Never sent on create.
    #[serde(default, skip_serializing)]
    pub id: Option<DiscountCodeId>,
    /// The code customers type at checkout.
    pub code: Option<String>,
    /// Number of times the code has been redeemed.
    #[serde(default)]
    pub usage_count: i64,
    /// When the code was created in its source store.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<FixedOffset>>,
}

/// Result of creating a discount code under a price rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscountCodeCreation {
    /// HTTP 201.
    Created,
    /// HTTP 422: the code already exists in the store.
    AlreadyExists,
    /// Any other status.
    Rejected { status: u16, body: String },
}

#[derive(Deserialize)]
struct DiscountCodeList {
    discount_codes: Vec<DiscountCode>,
}

#[derive(Serialize)]
struct DiscountCodePayload<'a> {
    discount_code: &'a DiscountCode,
}

impl DiscountCode {
    /// A code that has never been used.
    #[must_use]
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            id: None,
            code: Some(code.into()),
            usage_count: 0,
            created_at: None,
        }
    }

    /// Whether a code string is present.
    #[must_use]
    pub const fn is_present(&self) -> bool {
        self.code.is_some()
    }

    /// Fetch the discount code of a price rule.
    ///
    /// Only the first code of the listing is kept. An empty listing yields a
    /// code-less value, not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the listing cannot be parsed.
    #[instrument(skip_all, fields(store = %client.site_name(), price_rule_id = %price_rule_id))]
    pub async fn fetch(
        client: &RestClient,
        price_rule_id: PriceRuleId,
    ) -> Result<Self, ShopifyError> {
        let path = client.api_path(&format!("price_rules/{price_rule_id}/discount_codes.json"));
        let listing: DiscountCodeList = client.get(&path).await?.error_for_status()?.parse()?;
        Ok(Self::first_of(price_rule_id, listing.discount_codes))
    }

    fn first_of(price_rule_id: PriceRuleId, codes: Vec<Self>) -> Self {
        let total = codes.len();
        let Some(first) = codes.into_iter().next() else {
            info!(%price_rule_id, "Price rule has no discount codes");
            return Self::default();
        };

        if total > 1 {
            warn!(
                %price_rule_id,
                kept = ?first.code,
                ignored = total - 1,
                "Price rule has several discount codes, keeping the first"
            );
        } else {
            debug!(%price_rule_id, code = ?first.code, "Fetched discount code");
        }
        first
    }

    /// Create this code under `price_rule_id` in the client's store.
    ///
    /// Callers must only call this with a present code.
    ///
    /// # Errors
    ///
    /// Returns an error if the request itself fails. Non-201 statuses are
    /// reported through [`DiscountCodeCreation`].
    #[instrument(skip_all, fields(store = %client.site_name(), price_rule_id = %price_rule_id, code = ?self.code))]
    pub async fn create(
        &self,
        client: &RestClient,
        price_rule_id: PriceRuleId,
    ) -> Result<DiscountCodeCreation, ShopifyError> {
        let path = client.api_path(&format!("price_rules/{price_rule_id}/discount_codes.json"));
        let response = client
            .post(&path, &DiscountCodePayload { discount_code: self })
            .await?;

        match response.status {
            StatusCode::CREATED => {
                info!("Discount code created");
                Ok(DiscountCodeCreation::Created)
            }
            StatusCode::UNPROCESSABLE_ENTITY => {
                warn!(body = %response.body, "Discount code already exists");
                Ok(DiscountCodeCreation::AlreadyExists)
            }
            status => {
                warn!(
                    status = status.as_u16(),
                    body = %response.body,
                    "Discount code could not be created"
                );
                Ok(DiscountCodeCreation::Rejected {
                    status: status.as_u16(),
                    body: response.body.to_string(),
                })
            }
        }
    }
}
