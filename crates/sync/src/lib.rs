//! pricesync library.
//!
//! Keeps promotional price rules (and their discount codes) aligned across
//! several Shopify stores. Each run fetches the rules every store created
//! within a recent time window, unions them by title, and replicates the
//! missing ones into each store.
//!
//! # Security
//!
//! This crate handles private-app credentials with write access to price
//! rules in every configured store. Credentials are kept in
//! [`secrecy::SecretString`] and redacted from debug output.
//!
//! # Modules
//!
//! - [`config`] - Environment and store list loading
//! - [`shopify`] - Rate-limited Admin REST client, price rules, discount codes
//! - [`store`] - Per-store fetch, diff and replication
//! - [`reconcile`] - Two-phase concurrent run across all stores
//! - [`identity`] - Rule identity policy and set utilities
//! - [`time_window`] - Recency lower bound for fetches

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod error;
pub mod identity;
pub mod reconcile;
pub mod shopify;
pub mod store;
pub mod time_window;

pub use error::AppError;
pub use reconcile::{Reconciler, SyncSummary};
pub use store::{ReplicationOutcome, ReplicationReport, SkipReason, StoreClient};
pub use time_window::TimeWindow;
