//! Unified error handling for the sync run.

use thiserror::Error;

use crate::config::ConfigError;
use crate::shopify::ShopifyError;

/// Run-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Shopify API operation failed.
    #[error("Shopify error: {0}")]
    Shopify(#[from] ShopifyError),

    /// A per-store task panicked or was cancelled.
    #[error("Store task failed for {store}: {message}")]
    Task { store: String, message: String },
}

impl AppError {
    /// Log the error and capture it with Sentry (a no-op when Sentry is not
    /// initialized).
    pub fn report(&self, store: &str) {
        let event_id = sentry::capture_error(self);
        tracing::error!(
            error = %self,
            store,
            sentry_event_id = %event_id,
            "Sync error"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let err = AppError::from(ConfigError::MissingEnvVar("EXECUTION_TIME_INTERVAL".to_string()));
        assert_eq!(
            err.to_string(),
            "Configuration error: Missing environment variable: EXECUTION_TIME_INTERVAL"
        );
    }

    #[test]
    fn test_shopify_error_display() {
        let err = AppError::from(ShopifyError::Api {
            status: 401,
            message: "Unauthorized".to_string(),
        });
        assert_eq!(err.to_string(), "Shopify error: API error: 401 - Unauthorized");
    }

    #[test]
    fn test_report_without_sentry_does_not_panic() {
        let err = AppError::Task {
            store: "north-shop".to_string(),
            message: "task panicked".to_string(),
        };
        err.report("north-shop");
        assert!(err.to_string().contains("north-shop"));
    }
}
