//! Duplicate removal by canonical key.

use std::collections::HashSet;

use super::ShareLink;

/// First occurrences in input order, plus how many repeats were dropped.
#[derive(Debug, Clone, Default)]
pub struct Deduplicated {
    pub unique: Vec<ShareLink>,
    pub duplicate_count: usize,
}

/// Keeps the first link for every canonical key.
///
/// Platform-specific normalization already happened during classification
/// (host aliases, `.html` suffixes, Baidu's two URL forms), so equal keys mean
/// the same share.
pub fn dedup(links: Vec<ShareLink>) -> Deduplicated {
    let mut seen = HashSet::with_capacity(links.len());
    let mut result = Deduplicated::default();
    for link in links {
        if seen.insert(link.canonical_key()) {
            result.unique.push(link);
        } else {
            result.duplicate_count += 1;
        }
    }
    result
}
