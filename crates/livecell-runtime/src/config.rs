#![forbid(unsafe_code)]

//! Holder configuration.
//!
//! | Field                  | Default                   | Env var                     |
//! |------------------------|---------------------------|-----------------------------|
//! | `strict_thread_checks` | `cfg!(debug_assertions)`  | `LIVECELL_STRICT_THREADS`   |
//! | `trace_deliveries`     | `false`                   | `LIVECELL_TRACE_DELIVERIES` |

/// Environment variable overriding [`LiveDataConfig::strict_thread_checks`].
pub const ENV_STRICT_THREADS: &str = "LIVECELL_STRICT_THREADS";

/// Environment variable overriding [`LiveDataConfig::trace_deliveries`].
pub const ENV_TRACE_DELIVERIES: &str = "LIVECELL_TRACE_DELIVERIES";

/// Configuration for a [`LiveData`](crate::LiveData) holder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LiveDataConfig {
    /// Panic when an executor-only operation is called from another thread.
    pub strict_thread_checks: bool,
    /// Emit a `trace!` event for every delivery.
    pub trace_deliveries: bool,
}

impl Default for LiveDataConfig {
    fn default() -> Self {
        Self {
            strict_thread_checks: cfg!(debug_assertions),
            trace_deliveries: false,
        }
    }
}

impl LiveDataConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults, overridden by any recognised environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_env_with(|key| std::env::var(key).ok())
    }

    /// Like [`from_env`](Self::from_env) with an injectable lookup (for tests).
    #[must_use]
    pub fn from_env_with(get_env: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(value) = get_env(ENV_STRICT_THREADS) {
            config.strict_thread_checks = env_flag(&value);
        }
        if let Some(value) = get_env(ENV_TRACE_DELIVERIES) {
            config.trace_deliveries = env_flag(&value);
        }
        config
    }

    #[must_use]
    pub fn with_strict_thread_checks(mut self, strict: bool) -> Self {
        self.strict_thread_checks = strict;
        self
    }

    #[must_use]
    pub fn with_trace_deliveries(mut self, trace: bool) -> Self {
        self.trace_deliveries = trace;
        self
    }
}

#[inline]
fn env_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_follows_debug_assertions() {
        let config = LiveDataConfig::default();
        assert_eq!(config.strict_thread_checks, cfg!(debug_assertions));
        assert!(!config.trace_deliveries);
    }

    #[test]
    fn builder_overrides() {
        let config = LiveDataConfig::new()
            .with_strict_thread_checks(false)
            .with_trace_deliveries(true);
        assert!(!config.strict_thread_checks);
        assert!(config.trace_deliveries);
    }

    #[test]
    fn env_flags_parse_truthy_values() {
        for truthy in ["1", "true", " YES ", "on"] {
            let config = LiveDataConfig::from_env_with(|key| {
                (key == ENV_TRACE_DELIVERIES).then(|| truthy.to_string())
            });
            assert!(config.trace_deliveries, "{truthy:?} should enable");
        }
    }

    #[test]
    fn env_can_disable_strict_checks() {
        let config = LiveDataConfig::from_env_with(|key| {
            (key == ENV_STRICT_THREADS).then(|| "0".to_string())
        });
        assert!(!config.strict_thread_checks);
    }

    #[test]
    fn missing_env_keeps_defaults() {
        assert_eq!(LiveDataConfig::from_env_with(|_| None), LiveDataConfig::default());
    }
}
