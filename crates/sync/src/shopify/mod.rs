//! Shopify Admin REST API access (HIGH PRIVILEGE).
//!
//! # Security
//!
//! **The clients built here carry private-app credentials with write access
//! to price rules and discount codes.**
//!
//! # Architecture
//!
//! - One [`RestClient`] per store, each with its own fixed-window throttle
//! - Price rules and discount codes are plain value types with async
//!   `fetch`/`create` operations taking the client explicitly
//! - Pagination follows the `Link` response header
//!
//! # Example
//!
//! ```rust,ignore
//! use pricesync::shopify::{PriceRule, RestClient, ShopCredentials};
//!
//! let client = RestClient::new(credentials, "2021-07")?;
//! let rule = PriceRule::fetch(&client, PriceRuleId::new(507_328_175)).await?;
//! ```

mod client;
mod discount_codes;
mod pagination;
mod price_rules;
mod rate_limit;

pub use client::{RestClient, RestResponse, ShopCredentials};
pub use discount_codes::{DiscountCode, DiscountCodeCreation};
pub use pagination::next_page_path;
pub use price_rules::{
    Eligibility, PriceRule, PriceRuleBuilder, PriceRuleCreation, PriceRuleSummary,
    RemotePriceRule,
};
pub use rate_limit::FixedWindow;

use thiserror::Error;

/// Default Admin REST API version.
pub const DEFAULT_API_VERSION: &str = "2021-07";

/// Errors that can occur when interacting with the Shopify Admin REST API.
#[derive(Debug, Error)]
pub enum ShopifyError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// API returned an unexpected status.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// A URL could not be built or parsed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}
