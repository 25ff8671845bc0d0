//! Processing statistics tracking.
//!
//! Thread-safe counters for the failure categories seen while checking links.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use strum::IntoEnumIterator;

use super::types::ErrorType;

/// Thread-safe processing statistics tracker.
///
/// Uses atomic counters so concurrent check tasks can record failures through
/// a shared `Arc`. All categories are initialized to zero on creation.
pub struct ProcessingStats {
    errors: HashMap<ErrorType, AtomicUsize>,
}

impl Default for ProcessingStats {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessingStats {
    pub fn new() -> Self {
        let mut errors = HashMap::new();
        for error in ErrorType::iter() {
            errors.insert(error, AtomicUsize::new(0));
        }
        ProcessingStats { errors }
    }

    /// Increment an error counter.
    pub fn increment_error(&self, error: ErrorType) {
        if let Some(counter) = self.errors.get(&error) {
            counter.fetch_add(1, Ordering::Relaxed);
        } else {
            log::error!(
                "Attempted to increment error counter for {:?} which is not in the map. \
                 This indicates a bug in ProcessingStats initialization.",
                error
            );
        }
    }

    pub fn get_error_count(&self, error: ErrorType) -> usize {
        self.errors
            .get(&error)
            .map(|c| c.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    pub fn total_errors(&self) -> usize {
        self.errors.values().map(|c| c.load(Ordering::Relaxed)).sum()
    }

    /// Non-zero counts in declaration order, most frequent first.
    pub fn snapshot(&self) -> Vec<(ErrorType, usize)> {
        let mut counts: Vec<(ErrorType, usize)> = ErrorType::iter()
            .map(|error| (error, self.get_error_count(error)))
            .filter(|(_, count)| *count > 0)
            .collect();
        // Stable sort keeps declaration order among equal counts
        counts.sort_by(|a, b| b.1.cmp(&a.1));
        counts
    }
}
