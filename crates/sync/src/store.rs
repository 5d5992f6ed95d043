//! Per-store fetch, diff and replication.
//!
//! A [`StoreClient`] owns one store's REST client and the price rules it
//! fetched during the current run. Replication goes rule first, then code;
//! when the code turns out to already exist the just-created rule is deleted
//! again so the store is left as it was.

use std::collections::HashSet;

use pricesync_core::PriceRuleId;
use serde::Deserialize;
use tracing::{debug, error, info, instrument, warn};

use crate::identity::{difference_by, title_key};
use crate::shopify::{
    DiscountCodeCreation, PriceRule, PriceRuleCreation, PriceRuleSummary, RestClient,
    ShopifyError, next_page_path,
};
use crate::time_window::TimeWindow;

/// Page size for price rule listings (the API maximum).
pub const PAGE_LIMIT: u32 = 250;

/// Default cap on listing pages followed per store.
pub const DEFAULT_MAX_PAGES: usize = 40;

#[derive(Deserialize)]
struct PriceRuleList {
    price_rules: Vec<PriceRuleSummary>,
}

/// Why a candidate was not replicated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The store already has a rule with this title.
    AlreadyPresent,
    /// The rule's discount code was never fetched.
    MissingDiscountCode,
    /// The rule is not a percentage discount.
    NotPercentage,
    /// The rule has no discount code in its source store.
    NoCode,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::AlreadyPresent => "already present",
            Self::MissingDiscountCode => "missing discount code",
            Self::NotPercentage => "not a percentage rule",
            Self::NoCode => "no discount code",
        };
        f.write_str(s)
    }
}

/// What happened to one replication candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplicationOutcome {
    /// Rule and code were both created.
    Created(PriceRuleId),
    /// The code already existed, so the new rule was deleted again.
    RolledBack(PriceRuleId),
    /// The candidate was not attempted.
    Skipped(SkipReason),
    /// The rule create was rejected; no code was attempted.
    RuleRejected { status: u16 },
    /// The rule was created but its code was rejected. The rule stays.
    CodeRejected { price_rule_id: PriceRuleId, status: u16 },
    /// A request failed outright.
    Failed(String),
}

/// Per-store result of the replicate phase.
#[derive(Debug, Clone, Default)]
pub struct ReplicationReport {
    pub store: String,
    /// `(title, outcome)` in candidate order.
    pub outcomes: Vec<(String, ReplicationOutcome)>,
}

impl ReplicationReport {
    fn new(store: &str) -> Self {
        Self {
            store: store.to_string(),
            outcomes: Vec::new(),
        }
    }

    fn record(&mut self, title: &str, outcome: ReplicationOutcome) {
        self.outcomes.push((title.to_string(), outcome));
    }

    fn count(&self, pred: impl Fn(&ReplicationOutcome) -> bool) -> usize {
        self.outcomes.iter().filter(|(_, o)| pred(o)).count()
    }

    #[must_use]
    pub fn created(&self) -> usize {
        self.count(|o| matches!(o, ReplicationOutcome::Created(_)))
    }

    #[must_use]
    pub fn rolled_back(&self) -> usize {
        self.count(|o| matches!(o, ReplicationOutcome::RolledBack(_)))
    }

    #[must_use]
    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, ReplicationOutcome::Skipped(_)))
    }

    /// Rejections and outright failures.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.count(|o| {
            matches!(
                o,
                ReplicationOutcome::RuleRejected { .. }
                    | ReplicationOutcome::CodeRejected { .. }
                    | ReplicationOutcome::Failed(_)
            )
        })
    }

    /// Outcome recorded for `title`, if it was a candidate.
    #[must_use]
    pub fn outcome(&self, title: &str) -> Option<&ReplicationOutcome> {
        self.outcomes
            .iter()
            .find(|(t, _)| t == title)
            .map(|(_, o)| o)
    }
}

/// One store's view of the sync run.
#[derive(Debug)]
pub struct StoreClient {
    client: RestClient,
    window: TimeWindow,
    max_pages: usize,
    price_rules: Vec<PriceRule>,
    titles: HashSet<String>,
}

impl StoreClient {
    #[must_use]
    pub fn new(client: RestClient, window: TimeWindow) -> Self {
        Self {
            client,
            window,
            max_pages: DEFAULT_MAX_PAGES,
            price_rules: Vec::new(),
            titles: HashSet::new(),
        }
    }

    /// Cap the number of listing pages followed. Zero is treated as one.
    #[must_use]
    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages.max(1);
        self
    }

    #[must_use]
    pub fn site_name(&self) -> &str {
        self.client.site_name()
    }

    /// Rules known to be in this store: fetched ones plus those replicated
    /// during this run.
    #[must_use]
    pub fn price_rules(&self) -> &[PriceRule] {
        &self.price_rules
    }

    /// Whether the store has a rule with this title.
    #[must_use]
    pub fn contains(&self, title: &str) -> bool {
        self.titles.contains(title)
    }

    fn record(&mut self, rule: PriceRule) {
        if self.titles.insert(rule.title().to_string()) {
            self.price_rules.push(rule);
        }
    }

    /// Fetch every price rule created within the time window.
    ///
    /// Follows `Link: rel="next"` pages until there is none, the header is
    /// malformed, or the page cap is hit. Each listed rule is then fetched
    /// in full along with its discount code.
    ///
    /// # Errors
    ///
    /// Returns an error if any listing or rule fetch fails.
    #[instrument(skip_all, fields(store = %self.client.site_name()))]
    pub async fn fetch_recent_price_rules(&mut self) -> Result<usize, ShopifyError> {
        let created_at_min = self.window.lower_bound();
        let limit = PAGE_LIMIT.to_string();
        info!(%created_at_min, "Fetching recent price rules");

        let mut response = self
            .client
            .get_with_query(
                &self.client.api_path("price_rules.json"),
                &[("limit", limit.as_str()), ("created_at_min", created_at_min.as_str())],
            )
            .await?;
        let mut pages = 0;
        let before = self.price_rules.len();

        loop {
            pages += 1;
            let link = response.link.take();
            let listing: PriceRuleList = response.error_for_status()?.parse()?;
            debug!(page = pages, rules = listing.price_rules.len(), "Fetched listing page");

            for summary in listing.price_rules {
                let rule = PriceRule::fetch(&self.client, summary.id).await?;
                self.record(rule);
            }

            let Some(link) = link else { break };
            let next = match next_page_path(&link) {
                Ok(Some(next)) => next,
                Ok(None) => break,
                Err(e) => {
                    warn!(error = %e, link = %link, "Malformed Link header, stopping pagination");
                    break;
                }
            };
            if pages >= self.max_pages {
                warn!(max_pages = self.max_pages, "Page cap reached, stopping pagination");
                break;
            }
            response = self.client.get(&next).await?;
        }

        let fetched = self.price_rules.len() - before;
        info!(pages, fetched, "Fetched recent price rules");
        Ok(fetched)
    }

    /// Rules of `union` this store does not have, by title.
    #[must_use]
    pub fn missing_against(&self, union: &[PriceRule]) -> Vec<PriceRule> {
        difference_by(union, &self.price_rules, title_key)
    }

    /// Replicate each candidate the store does not already have.
    ///
    /// Never fails as a whole: every candidate gets an outcome in the
    /// returned report.
    #[instrument(skip_all, fields(store = %self.client.site_name(), candidates = candidates.len()))]
    pub async fn add_missing(&mut self, candidates: Vec<PriceRule>) -> ReplicationReport {
        let mut report = ReplicationReport::new(self.site_name());
        if candidates.is_empty() {
            info!("Nothing to do");
            return report;
        }

        for candidate in candidates {
            let title = candidate.title().to_string();
            if self.contains(&title) {
                debug!(%title, "Already present, skipping");
                report.record(&title, ReplicationOutcome::Skipped(SkipReason::AlreadyPresent));
                continue;
            }

            let outcome = match self.replicate(candidate).await {
                Ok((outcome, Some(created))) => {
                    self.record(created);
                    outcome
                }
                Ok((outcome, None)) => outcome,
                Err(e) => {
                    error!(%title, error = %e, "Replication failed");
                    ReplicationOutcome::Failed(e.to_string())
                }
            };
            report.record(&title, outcome);
        }

        info!(
            created = report.created(),
            rolled_back = report.rolled_back(),
            skipped = report.skipped(),
            failed = report.failed(),
            "Replication finished"
        );
        report
    }

    /// Create one rule and its code. Returns the created rule when it stays
    /// in the store.
    #[instrument(skip_all, fields(title = %rule.title()))]
    async fn replicate(
        &self,
        mut rule: PriceRule,
    ) -> Result<(ReplicationOutcome, Option<PriceRule>), ShopifyError> {
        let Some(code) = rule.discount_code().cloned() else {
            warn!("Price rule has no discount code attached, skipping");
            return Ok((ReplicationOutcome::Skipped(SkipReason::MissingDiscountCode), None));
        };
        if !rule.is_percentage() {
            info!(value_type = %rule.value_type(), "Not a percentage rule, skipping");
            return Ok((ReplicationOutcome::Skipped(SkipReason::NotPercentage), None));
        }
        if !code.is_present() {
            info!("Price rule has no discount code, skipping");
            return Ok((ReplicationOutcome::Skipped(SkipReason::NoCode), None));
        }

        let id = match rule.create(&self.client).await? {
            PriceRuleCreation::Created(id) => id,
            PriceRuleCreation::Rejected { status, .. } => {
                return Ok((ReplicationOutcome::RuleRejected { status }, None));
            }
        };

        match code.create(&self.client, id).await? {
            DiscountCodeCreation::Created => Ok((ReplicationOutcome::Created(id), Some(rule))),
            DiscountCodeCreation::AlreadyExists => {
                warn!(price_rule_id = %id, "Discount code already exists, rolling back price rule");
                self.delete_price_rule(id).await?;
                Ok((ReplicationOutcome::RolledBack(id), None))
            }
            DiscountCodeCreation::Rejected { status, .. } => Ok((
                ReplicationOutcome::CodeRejected {
                    price_rule_id: id,
                    status,
                },
                Some(rule),
            )),
        }
    }

    /// Delete a price rule by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or returns a non-2xx status.
    #[instrument(skip_all, fields(store = %self.client.site_name(), price_rule_id = %id))]
    pub async fn delete_price_rule(&self, id: PriceRuleId) -> Result<(), ShopifyError> {
        self.client
            .delete(&self.client.api_path(&format!("price_rules/{id}.json")))
            .await?
            .error_for_status()?;
        info!("Price rule deleted");
        Ok(())
    }
}
