//! Prometheus metrics exposition
//!
//! The token manager emits `token_acquisitions_total` and
//! `token_acquisition_duration_seconds`; the keeper adds:
//!
//! - `token_expires_in_seconds` (gauge): signed seconds until expiry, set after the startup acquisition and each refresh tick
//! - `token_refresh_cycles_total` (counter): label `result`

use client_credentials::metrics::ACQUISITION_DURATION_SECONDS;
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};

/// Bucket boundaries for acquisition latency, 10ms to 30s.
const ACQUISITION_BUCKETS: &[f64] = &[0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0];

fn builder() -> PrometheusBuilder {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full(ACQUISITION_DURATION_SECONDS.to_string()),
            ACQUISITION_BUCKETS,
        )
        .expect("failed to set histogram buckets")
}

/// Install the Prometheus recorder and return a handle for rendering metrics.
///
/// Acquisition latency renders as a histogram (with `_bucket` lines) rather
/// than the default summary.
pub fn install_recorder() -> PrometheusHandle {
    builder()
        .install_recorder()
        .expect("failed to install Prometheus recorder")
}

/// Record the token's remaining lifetime.
pub fn set_expires_in(seconds: i64) {
    metrics::gauge!("token_expires_in_seconds").set(seconds as f64);
}

/// Record one refresh tick: `fresh`, `refreshed` or `failed`.
pub fn record_refresh_cycle(result: &'static str) {
    metrics::counter!("token_refresh_cycles_total", "result" => result).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;
    use metrics_exporter_prometheus::PrometheusRecorder;

    /// Isolated recorder/handle pair; install_recorder() may only run once per process.
    fn isolated_recorder() -> (PrometheusRecorder, PrometheusHandle) {
        let recorder = builder().build_recorder();
        let handle = recorder.handle();
        (recorder, handle)
    }

    #[test]
    fn record_functions_do_not_panic_without_recorder() {
        set_expires_in(42);
        record_refresh_cycle("fresh");
    }

    #[test]
    fn gauge_and_counter_render() {
        let (recorder, handle) = isolated_recorder();
        let _guard = metrics::set_default_local_recorder(&recorder);

        set_expires_in(-15);
        record_refresh_cycle("refreshed");
        record_refresh_cycle("failed");

        let output = handle.render();
        let gauge_line = output
            .lines()
            .find(|l| l.starts_with("token_expires_in_seconds "))
            .expect("gauge line rendered");
        assert!(gauge_line.contains("-15"), "got: {gauge_line}");
        assert!(output.contains("result=\"refreshed\""));
        assert!(output.contains("result=\"failed\""));
    }

    #[test]
    fn acquisition_latency_renders_as_histogram() {
        let (recorder, handle) = isolated_recorder();
        let _guard = metrics::set_default_local_recorder(&recorder);

        client_credentials::metrics::record_acquisition("success", 0.03);

        let output = handle.render();
        assert!(
            output.contains("token_acquisition_duration_seconds_bucket"),
            "got: {output}"
        );
        assert!(output.contains("le=\"0.05\""));
        assert!(output.contains("le=\"+Inf\""));
    }
}
