//! Progress logging utilities.

use log::info;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Logs progress of a running batch.
///
/// # Arguments
///
/// * `start_time` - When the batch started
/// * `completed` - Atomic counter of finished checks
/// * `total` - Number of checks in the batch
pub fn log_progress(start_time: std::time::Instant, completed: &Arc<AtomicUsize>, total: usize) {
    let elapsed_secs = start_time.elapsed().as_secs_f64();
    let done = completed.load(Ordering::SeqCst);
    let rate = if elapsed_secs > 0.0 {
        done as f64 / elapsed_secs
    } else {
        0.0
    };
    info!(
        "Checked {}/{} links in {:.2} seconds (~{:.2} links/sec)",
        done, total, elapsed_secs, rate
    );
}
