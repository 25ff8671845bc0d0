//! End-of-run statistics.

use log::info;

use crate::error_handling::ProcessingStats;
use crate::orchestrator::BatchReport;

/// Prints a one-line summary of a batch.
///
/// Works with both plain and JSON log formats (log::info! handles formatting).
pub fn print_batch_summary(report: &BatchReport) {
    info!(
        "✅ Checked {} link{} ({} valid, {} invalid, {} pending) in {:.1}s; {} duplicate, {} invalid format, {} excluded",
        report.checked_count(),
        if report.checked_count() == 1 { "" } else { "s" },
        report.valid_links.len(),
        report.invalid_links.len(),
        report.pending_links.len(),
        report.total_duration.as_secs_f64(),
        report.duplicate_count,
        report.invalid_format_count,
        report.excluded_count,
    );
}

/// Prints the failure categories behind pending results, most frequent first.
pub fn print_error_statistics(error_stats: &ProcessingStats) {
    let total_errors = error_stats.total_errors();
    if total_errors > 0 {
        info!("Error Counts ({} total):", total_errors);
        for (error_type, count) in error_stats.snapshot() {
            info!("   {}: {}", error_type.as_str(), count);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error_handling::ErrorType;

    #[test]
    fn test_print_error_statistics_no_errors() {
        let stats = ProcessingStats::new();
        // Should not panic when there are no errors
        print_error_statistics(&stats);
    }

    #[test]
    fn test_print_error_statistics_with_errors() {
        let stats = ProcessingStats::new();
        stats.increment_error(ErrorType::HttpRequestTimeoutError);
        stats.increment_error(ErrorType::CheckTimeout);
        print_error_statistics(&stats);
        assert_eq!(stats.total_errors(), 2);
    }

    #[test]
    fn test_print_batch_summary_empty() {
        print_batch_summary(&BatchReport::default());
    }
}
