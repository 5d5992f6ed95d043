//! pricesync core - shared types library.
//!
//! This crate provides the types shared by the sync engine and its tests:
//! - Shopify REST resource identifiers
//! - Price rule value classification
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no HTTP clients. This keeps
//! it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs and price rule enums

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
