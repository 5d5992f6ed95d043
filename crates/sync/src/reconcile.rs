//! Two-phase run across every configured store.
//!
//! Phase one fetches all stores concurrently. Once every fetch has finished
//! the rules are unioned by title, and phase two replicates the missing rules
//! into each store, again concurrently. A store whose fetch fails is left out
//! of both the union and the replicate phase.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::task::{Id, JoinError, JoinSet};
use tracing::{info, instrument, warn};

use crate::config::SyncConfig;
use crate::error::AppError;
use crate::identity::{title_key, union_by};
use crate::shopify::{PriceRule, RestClient, ShopifyError};
use crate::store::{ReplicationReport, StoreClient};
use crate::time_window::TimeWindow;

/// Result of a whole run.
#[derive(Debug, Clone, Default)]
pub struct SyncSummary {
    /// Distinct titles across all successfully fetched stores.
    pub union_size: usize,
    /// One report per store that reached the replicate phase, in
    /// configuration order.
    pub reports: Vec<ReplicationReport>,
    /// Stores that failed in either phase.
    pub failed_stores: Vec<String>,
}

impl SyncSummary {
    /// Report for `store`, if it reached the replicate phase.
    #[must_use]
    pub fn report(&self, store: &str) -> Option<&ReplicationReport> {
        self.reports.iter().find(|r| r.store == store)
    }

    /// Rules created across all stores.
    #[must_use]
    pub fn created(&self) -> usize {
        self.reports.iter().map(ReplicationReport::created).sum()
    }

    /// Log one line per store and a run total.
    pub fn log(&self) {
        for report in &self.reports {
            info!(
                store = %report.store,
                created = report.created(),
                rolled_back = report.rolled_back(),
                skipped = report.skipped(),
                failed = report.failed(),
                "Store summary"
            );
        }
        if !self.failed_stores.is_empty() {
            warn!(stores = ?self.failed_stores, "Some stores failed");
        }
        info!(
            union_size = self.union_size,
            created = self.created(),
            stores = self.reports.len(),
            "Sync run finished"
        );
    }
}

/// Drives one sync run.
#[derive(Debug)]
pub struct Reconciler {
    stores: Vec<StoreClient>,
}

impl Reconciler {
    #[must_use]
    pub const fn new(stores: Vec<StoreClient>) -> Self {
        Self { stores }
    }

    /// Build a store client per configured store.
    ///
    /// # Errors
    ///
    /// Returns an error if a store's credentials or HTTP client cannot be
    /// built.
    pub fn from_config(config: &SyncConfig) -> Result<Self, ShopifyError> {
        let window = TimeWindow::from_hours(config.execution_interval_hours);
        let stores = config
            .stores
            .iter()
            .map(|store| {
                let client = RestClient::new(store.credentials()?, &config.api_version)?;
                Ok(StoreClient::new(client, window).with_max_pages(config.max_pages))
            })
            .collect::<Result<Vec<_>, ShopifyError>>()?;
        Ok(Self::new(stores))
    }

    /// Fetch, union, replicate.
    #[instrument(skip_all, fields(stores = self.stores.len()))]
    pub async fn run(self) -> SyncSummary {
        let mut summary = SyncSummary::default();

        let fetched = fetch_all(self.stores, &mut summary.failed_stores).await;
        let union: Arc<Vec<PriceRule>> = Arc::new(union_by(
            fetched.iter().map(StoreClient::price_rules),
            title_key,
        ));
        summary.union_size = union.len();
        info!(
            union_size = union.len(),
            stores = fetched.len(),
            "Fetch phase complete"
        );

        summary.reports = replicate_all(fetched, &union, &mut summary.failed_stores).await;
        summary
    }
}

/// Run every store's fetch on its own task. Returns the stores that fetched
/// successfully, in configuration order.
async fn fetch_all(stores: Vec<StoreClient>, failed: &mut Vec<String>) -> Vec<StoreClient> {
    let mut tasks = JoinSet::new();
    let mut names = HashMap::new();

    for (index, mut store) in stores.into_iter().enumerate() {
        let site = store.site_name().to_string();
        let handle = tasks.spawn(async move {
            let result = store.fetch_recent_price_rules().await;
            (index, store, result)
        });
        names.insert(handle.id(), site);
    }

    let mut fetched = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((index, store, Ok(count))) => {
                info!(store = %store.site_name(), count, "Store fetched");
                fetched.push((index, store));
            }
            Ok((_, store, Err(e))) => {
                let site = store.site_name().to_string();
                AppError::from(e).report(&site);
                failed.push(site);
            }
            Err(e) => failed.push(task_failure(&names, &e)),
        }
    }

    fetched.sort_by_key(|(index, _)| *index);
    fetched.into_iter().map(|(_, store)| store).collect()
}

/// Run every store's replication on its own task, sharing the union.
async fn replicate_all(
    stores: Vec<StoreClient>,
    union: &Arc<Vec<PriceRule>>,
    failed: &mut Vec<String>,
) -> Vec<ReplicationReport> {
    let mut tasks = JoinSet::new();
    let mut names = HashMap::new();

    for (index, mut store) in stores.into_iter().enumerate() {
        let site = store.site_name().to_string();
        let union = Arc::clone(union);
        let handle = tasks.spawn(async move {
            let missing = store.missing_against(&union);
            (index, store.add_missing(missing).await)
        });
        names.insert(handle.id(), site);
    }

    let mut reports = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(report) => reports.push(report),
            Err(e) => failed.push(task_failure(&names, &e)),
        }
    }

    reports.sort_by_key(|(index, _)| *index);
    reports.into_iter().map(|(_, report)| report).collect()
}

fn task_failure(names: &HashMap<Id, String>, e: &JoinError) -> String {
    let store = names
        .get(&e.id())
        .cloned()
        .unwrap_or_else(|| "unknown".to_string());
    AppError::Task {
        store: store.clone(),
        message: e.to_string(),
    }
    .report(&store);
    store
}
