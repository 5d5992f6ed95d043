//! Identity policy for price rules across stores.
//!
//! Two rules in different stores are "the same rule" when their titles are
//! equal. Value, type and code are not compared. The set utilities are
//! generic over the key so the policy stays in one place.

use std::collections::HashSet;
use std::hash::Hash;

use crate::shopify::PriceRule;

/// Cross-store identity of a price rule: its title.
#[must_use]
pub fn title_key(rule: &PriceRule) -> &str {
    rule.title()
}

/// Union of several groups, keeping the first item seen for each key.
///
/// Group order and item order within a group are preserved.
pub fn union_by<'a, T, K, F, G>(groups: G, key: F) -> Vec<T>
where
    T: Clone + 'a,
    K: Eq + Hash,
    F: Fn(&'a T) -> K,
    G: IntoIterator<Item = &'a [T]>,
{
    let mut seen = HashSet::new();
    groups
        .into_iter()
        .flatten()
        .filter(|item| seen.insert(key(*item)))
        .cloned()
        .collect()
}

/// Items of `from` whose key does not appear in `exclude`.
pub fn difference_by<'a, T, K, F>(from: &'a [T], exclude: &'a [T], key: F) -> Vec<T>
where
    T: Clone,
    K: Eq + Hash,
    F: Fn(&'a T) -> K,
{
    let excluded: HashSet<K> = exclude.iter().map(&key).collect();
    from.iter()
        .filter(|item| !excluded.contains(&key(*item)))
        .cloned()
        .collect()
}
