//! Core types for pricesync.
//!
//! This module provides type-safe wrappers for Shopify price rule concepts.

pub mod id;
pub mod value;

pub use id::*;
pub use value::ValueType;
