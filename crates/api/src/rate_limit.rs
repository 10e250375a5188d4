//! Rate Limiting Middleware using GCRA Algorithm
//!
//! Per-IP rate limiting with tower_governor. The sensor posts a reading every
//! few seconds at most, so the defaults only stop runaway clients.

use governor::middleware::StateInformationMiddleware;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_governor::governor::GovernorConfigBuilder;
use tower_governor::key_extractor::PeerIpKeyExtractor;
use tower_governor::GovernorLayer;

use crate::config::ConfigError;

/// Governor config keyed on peer IP
/// StateInformationMiddleware is used when use_headers() is called to add X-RateLimit-* headers
pub type DefaultGovernorConfig =
    tower_governor::governor::GovernorConfig<PeerIpKeyExtractor, StateInformationMiddleware>;

/// Rate limiting configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Whether the limiter layer is installed at all
    pub enabled: bool,
    /// Seconds until one request of quota is replenished
    #[serde(alias = "per_second")]
    pub replenish_period_secs: u64,
    /// Burst size (max requests that can be made immediately)
    pub burst_size: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            replenish_period_secs: 1,
            burst_size: 10,
        }
    }
}

impl RateLimitConfig {
    /// Config with the limiter switched off
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }
}

/// Create a rate limiting governor config
///
/// Uses PeerIpKeyExtractor, so the service must be served with
/// `into_make_service_with_connect_info::<SocketAddr>()`.
/// Adds X-RateLimit-* headers to responses for quota visibility.
pub fn create_governor_config(
    config: &RateLimitConfig,
) -> Result<Arc<DefaultGovernorConfig>, ConfigError> {
    GovernorConfigBuilder::default()
        .per_second(config.replenish_period_secs)
        .burst_size(config.burst_size)
        .use_headers()
        .finish()
        .map(Arc::new)
        .ok_or_else(|| {
            ConfigError::Invalid(format!(
                "invalid rate limit: period {}s, burst {}",
                config.replenish_period_secs, config.burst_size
            ))
        })
}

/// Build the governor layer, or `None` when rate limiting is disabled
pub fn governor_layer(
    config: &RateLimitConfig,
) -> Result<Option<GovernorLayer<PeerIpKeyExtractor, StateInformationMiddleware>>, ConfigError> {
    if !config.enabled {
        return Ok(None);
    }

    let config = create_governor_config(config)?;
    Ok(Some(GovernorLayer { config }))
}
