//! Acquisition metrics
//!
//! Emitted through the `metrics` facade; they are no-ops until the
//! embedding process installs a recorder.
//!
//! - `token_acquisitions_total` (counter): label `outcome`
//! - `token_acquisition_duration_seconds` (histogram)

/// Counter of `acquire()` calls, labelled by outcome.
pub const ACQUISITIONS_TOTAL: &str = "token_acquisitions_total";

/// Histogram of `acquire()` round-trip time in seconds.
pub const ACQUISITION_DURATION_SECONDS: &str = "token_acquisition_duration_seconds";

/// Record one finished acquisition. `outcome` is `success` or an `Error::kind()`.
pub fn record_acquisition(outcome: &'static str, duration_secs: f64) {
    metrics::counter!(ACQUISITIONS_TOTAL, "outcome" => outcome).increment(1);
    metrics::histogram!(ACQUISITION_DURATION_SECONDS).record(duration_secs);
}
