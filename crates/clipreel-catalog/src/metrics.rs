//! Catalog metrics collection.
//!
//! Provides standardized metrics for monitoring catalog traffic:
//! - Request counters by operation and status
//! - Latency histograms
//! - Re-authentication and duplicate-suppression counters
//! - Download outcomes by strategy

use metrics::{counter, histogram};

/// Metric name constants for consistency.
pub mod names {
    /// Total catalog requests by operation and status.
    pub const REQUESTS_TOTAL: &str = "clipreel_catalog_requests_total";

    /// Request latency in seconds by operation.
    pub const LATENCY_SECONDS: &str = "clipreel_catalog_latency_seconds";

    /// Forced token exchanges after an unauthorized response.
    pub const REAUTH_TOTAL: &str = "clipreel_catalog_reauth_total";

    /// Clips dropped as near-duplicates.
    pub const DUPLICATES_SUPPRESSED_TOTAL: &str = "clipreel_catalog_duplicates_suppressed_total";

    /// Clip downloads by strategy and status.
    pub const DOWNLOADS_TOTAL: &str = "clipreel_clip_downloads_total";

    /// Bytes written by clip downloads.
    pub const DOWNLOAD_BYTES_TOTAL: &str = "clipreel_clip_download_bytes_total";
}

/// Record metrics for a completed catalog request.
pub fn record_request(operation: &str, status: u16, latency_ms: f64) {
    counter!(
        names::REQUESTS_TOTAL,
        "operation" => operation.to_string(),
        "status" => status.to_string()
    )
    .increment(1);

    histogram!(
        names::LATENCY_SECONDS,
        "operation" => operation.to_string()
    )
    .record(latency_ms / 1000.0);
}

/// Record a forced re-authentication.
pub fn record_reauth(operation: &str) {
    counter!(names::REAUTH_TOTAL, "operation" => operation.to_string()).increment(1);
}

/// Record suppressed near-duplicates.
pub fn record_suppressed(count: usize) {
    if count > 0 {
        counter!(names::DUPLICATES_SUPPRESSED_TOTAL).increment(count as u64);
    }
}

/// Record a finished clip download.
pub fn record_download(strategy: &'static str, ok: bool, bytes: u64) {
    let status = if ok { "ok" } else { "error" };
    counter!(names::DOWNLOADS_TOTAL, "strategy" => strategy, "status" => status).increment(1);
    if bytes > 0 {
        counter!(names::DOWNLOAD_BYTES_TOTAL, "strategy" => strategy).increment(bytes);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_names() {
        assert!(names::REQUESTS_TOTAL.contains("requests"));
        assert!(names::REAUTH_TOTAL.contains("reauth"));
        assert!(names::LATENCY_SECONDS.contains("latency"));
    }
}
