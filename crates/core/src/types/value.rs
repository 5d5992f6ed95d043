//! Price rule value classification.

use serde::{Deserialize, Serialize};

/// How a price rule's `value` is interpreted.
///
/// Maps to Shopify's `value_type` field. Unknown values deserialize to
/// [`ValueType::Other`] rather than failing the whole rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueType {
    /// `value` is a percentage off (e.g. `-10.0` for 10% off).
    Percentage,
    /// `value` is a fixed amount off in the shop currency.
    FixedAmount,
    /// Any value type this crate does not recognize.
    #[serde(other)]
    Other,
}

impl ValueType {
    /// Whether this is a percentage discount.
    #[must_use]
    pub const fn is_percentage(self) -> bool {
        matches!(self, Self::Percentage)
    }

    /// Get the Shopify wire string for this value type.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Percentage => "percentage",
            Self::FixedAmount => "fixed_amount",
            Self::Other => "other",
        }
    }
}

impl std::fmt::Display for ValueType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
