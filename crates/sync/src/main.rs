//! pricesync - cross-store price rule sync.
//!
//! Runs once and exits: load configuration, fetch every store's recent price
//! rules, replicate the missing ones into each store.
//!
//! # Security
//!
//! Holds private-app credentials (HIGH PRIVILEGE) for every configured store.
//!
//! # Exit codes
//!
//! - `0` - Run completed (individual store failures are logged, not fatal)
//! - `1` - Configuration could not be loaded

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::process::ExitCode;

use pricesync::config::SyncConfig;
use pricesync::{AppError, Reconciler};
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &SyncConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            sample_rate: config.sentry_sample_rate,
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

fn init_tracing(config: &SyncConfig) {
    // Defaults to info level for our crate if RUST_LOG is not set
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "pricesync=info".into());

    let json_layer = config
        .log_json
        .then(|| tracing_subscriber::fmt::layer().json().flatten_event(true));
    let text_layer = (!config.log_json).then(tracing_subscriber::fmt::layer);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(text_layer)
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let config = match SyncConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing_subscriber::fmt().with_writer(std::io::stderr).init();
            tracing::error!(error = %e, "Failed to load configuration");
            return ExitCode::FAILURE;
        }
    };

    // Sentry must be initialized before the tracing subscriber
    let _sentry_guard = init_sentry(&config);
    init_tracing(&config);

    let reconciler = match Reconciler::from_config(&config) {
        Ok(reconciler) => reconciler,
        Err(e) => {
            AppError::from(e).report("config");
            return ExitCode::FAILURE;
        }
    };

    tracing::info!(
        stores = config.stores.len(),
        interval_hours = config.execution_interval_hours,
        api_version = %config.api_version,
        "Starting sync run"
    );

    reconciler.run().await.log();
    ExitCode::SUCCESS
}
