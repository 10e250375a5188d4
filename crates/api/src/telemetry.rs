//! Prometheus metrics
//!
//! Recording goes through the `metrics` facade, so the helpers are no-ops
//! until [`install_recorder`] has run.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::config::ConfigError;

pub const MOISTURE_UPDATES: &str = "plant_relay_moisture_updates_total";
pub const PLANT_REGISTRATIONS: &str = "plant_relay_plant_registrations_total";
pub const INVALID_REQUESTS: &str = "plant_relay_invalid_requests_total";
pub const MOISTURE_LEVEL: &str = "plant_relay_moisture_level";

/// Install the process-wide Prometheus recorder
///
/// Fails if a recorder is already installed.
pub fn install_recorder() -> Result<PrometheusHandle, ConfigError> {
    PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| ConfigError::Invalid(format!("metrics recorder install failed: {e}")))
}

/// Record an accepted moisture reading
pub fn record_moisture_update(level: f64) {
    metrics::counter!(MOISTURE_UPDATES).increment(1);
    metrics::gauge!(MOISTURE_LEVEL).set(level);
}

/// Record a plant registration; moisture restarts at zero
pub fn record_registration() {
    metrics::counter!(PLANT_REGISTRATIONS).increment(1);
    metrics::gauge!(MOISTURE_LEVEL).set(0.0);
}

pub fn record_invalid_request() {
    metrics::counter!(INVALID_REQUESTS).increment(1);
}
