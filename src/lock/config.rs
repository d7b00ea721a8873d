use std::time::Duration;

// ============================================================================
// Lock Manager Configuration
// ============================================================================

#[derive(Clone, Debug)]
pub struct LockConfig {
    /// Lifetime of a freshly acquired lock
    pub default_ttl: Duration,
    /// How long the in-memory manager keeps an expired, unreleased lock's
    /// full record before compacting it. The id reports `Expired` either way.
    pub expired_retention: Duration,
    /// Key namespace in shared stores
    pub key_prefix: String,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            default_ttl: Duration::from_secs(5 * 60),
            expired_retention: Duration::from_secs(10 * 60),
            key_prefix: "lock".to_string(),
        }
    }
}

impl LockConfig {
    /// Short leases for single-request critical sections
    pub fn short_lived() -> Self {
        Self {
            default_ttl: Duration::from_secs(30),
            expired_retention: Duration::from_secs(2 * 60),
            ..Self::default()
        }
    }

    /// Long leases for editor sessions that span several requests
    pub fn long_edit_session() -> Self {
        Self {
            default_ttl: Duration::from_secs(30 * 60),
            expired_retention: Duration::from_secs(60 * 60),
            ..Self::default()
        }
    }

    /// Defaults overridden by `ORDER_LOCK_TTL_SECS` and `ORDER_LOCK_RETENTION_SECS`
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(ttl) = read_secs("ORDER_LOCK_TTL_SECS") {
            config.default_ttl = ttl;
        }
        if let Some(retention) = read_secs("ORDER_LOCK_RETENTION_SECS") {
            config.expired_retention = retention;
        }

        config
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    pub fn with_retention(mut self, retention: Duration) -> Self {
        self.expired_retention = retention;
        self
    }

    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }
}

fn read_secs(var: &str) -> Option<Duration> {
    let raw = std::env::var(var).ok()?;
    match raw.trim().parse::<u64>() {
        Ok(secs) => Some(Duration::from_secs(secs)),
        Err(e) => {
            tracing::warn!(var = var, value = %raw, error = %e, "Ignoring malformed lock setting");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LockConfig::default();
        assert_eq!(config.default_ttl, Duration::from_secs(300));
        assert_eq!(config.key_prefix, "lock");
    }

    #[test]
    fn test_presets_keep_prefix() {
        assert!(LockConfig::short_lived().default_ttl < LockConfig::long_edit_session().default_ttl);
        assert_eq!(LockConfig::long_edit_session().key_prefix, "lock");
    }

    #[test]
    fn test_builder_overrides() {
        let config = LockConfig::default()
            .with_ttl(Duration::from_secs(5))
            .with_retention(Duration::from_secs(1))
            .with_key_prefix("shop-lock");

        assert_eq!(config.default_ttl, Duration::from_secs(5));
        assert_eq!(config.expired_retention, Duration::from_secs(1));
        assert_eq!(config.key_prefix, "shop-lock");
    }
}
