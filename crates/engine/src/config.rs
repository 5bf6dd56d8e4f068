use std::time::Duration;

use tradepost_core::proposal::DEFAULT_TTL_DAYS;

/// Default sweep interval: 1 hour.
const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 3600;

/// Engine configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development.
/// In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// How long a proposal stays open before the sweeper expires it.
    pub proposal_ttl_days: i64,
    /// How often the expiry sweeper runs.
    pub sweep_interval: Duration,
}

impl EngineConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var               | Default |
    /// |-----------------------|---------|
    /// | `PROPOSAL_TTL_DAYS`   | `7`     |
    /// | `SWEEP_INTERVAL_SECS` | `3600`  |
    pub fn from_env() -> Self {
        let proposal_ttl_days: i64 = std::env::var("PROPOSAL_TTL_DAYS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_TTL_DAYS);

        let sweep_interval_secs: u64 = std::env::var("SWEEP_INTERVAL_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_SWEEP_INTERVAL_SECS);

        Self {
            proposal_ttl_days,
            sweep_interval: Duration::from_secs(sweep_interval_secs),
        }
    }

    /// The proposal TTL as a chrono duration, for `expires_at` arithmetic.
    pub fn proposal_ttl(&self) -> chrono::Duration {
        chrono::Duration::days(self.proposal_ttl_days)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            proposal_ttl_days: DEFAULT_TTL_DAYS,
            sweep_interval: Duration::from_secs(DEFAULT_SWEEP_INTERVAL_SECS),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_ttl_is_seven_days() {
        let config = EngineConfig::default();
        assert_eq!(config.proposal_ttl(), chrono::Duration::days(7));
    }

    #[test]
    fn default_sweep_interval_is_one_hour() {
        let config = EngineConfig::default();
        assert_eq!(config.sweep_interval, Duration::from_secs(3600));
    }
}
