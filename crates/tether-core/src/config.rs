//! Engine configuration.
//!
//! The configuration is thread-local, matching the single-threaded model of
//! the engine. Install one with [`install`]; the returned [`ConfigGuard`]
//! restores the previous configuration when dropped.
//!
//! ```
//! use tether_core::config::{self, EngineConfig, TrimPolicy};
//!
//! let _guard = config::install(EngineConfig::default().with_trim_policy(TrimPolicy::Legacy));
//! assert_eq!(config::current().trim_policy, TrimPolicy::Legacy);
//! ```

use std::cell::RefCell;
use std::str::FromStr;

use crate::error::ConfigError;

/// Environment variable selecting the [`TrimPolicy`].
pub const TRIM_POLICY_ENV: &str = "TETHER_TRIM_POLICY";
/// Environment variable toggling warn-level logging of listener failures.
pub const LOG_LISTENER_ERRORS_ENV: &str = "TETHER_LOG_LISTENER_ERRORS";

/// How a full Generic slot list treats slots freed by reclaimed weak listeners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrimPolicy {
    /// Adopt the compacted count; grow only when trimming freed nothing.
    #[default]
    Reclaim,
    /// Discard the compacted count and always grow. Freed slots stay behind
    /// as holes inside the logical range until the list is rebuilt.
    Legacy,
}

impl TrimPolicy {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Reclaim => "reclaim",
            Self::Legacy => "legacy",
        }
    }
}

impl FromStr for TrimPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reclaim" => Ok(Self::Reclaim),
            "legacy" => Ok(Self::Legacy),
            _ => Err(ConfigError::UnknownTrimPolicy {
                value: s.to_string(),
            }),
        }
    }
}

/// Engine-wide knobs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Captured by each Generic registry at creation.
    pub trim_policy: TrimPolicy,
    /// Emit a `warn` event for every isolated listener failure.
    pub log_listener_errors: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            trim_policy: TrimPolicy::default(),
            log_listener_errors: true,
        }
    }
}

impl EngineConfig {
    #[must_use]
    pub fn with_trim_policy(mut self, policy: TrimPolicy) -> Self {
        self.trim_policy = policy;
        self
    }

    #[must_use]
    pub fn with_log_listener_errors(mut self, enabled: bool) -> Self {
        self.log_listener_errors = enabled;
        self
    }

    /// Build a configuration from `TETHER_*` environment variables, falling
    /// back to defaults for unset ones.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(raw) = lookup(TRIM_POLICY_ENV) {
            config.trim_policy = raw.parse()?;
        }
        if let Some(raw) = lookup(LOG_LISTENER_ERRORS_ENV) {
            config.log_listener_errors = parse_flag(LOG_LISTENER_ERRORS_ENV, &raw)?;
        }
        Ok(config)
    }
}

fn parse_flag(var: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidFlag {
            var,
            value: raw.to_string(),
        }),
    }
}

thread_local! {
    static ACTIVE: RefCell<EngineConfig> = RefCell::new(EngineConfig::default());
}

/// Snapshot of the configuration active on this thread.
#[must_use]
pub fn current() -> EngineConfig {
    ACTIVE.with(|active| active.borrow().clone())
}

/// Make `config` the active configuration on this thread until the guard
/// is dropped.
#[must_use = "the configuration is reverted when the guard is dropped"]
pub fn install(config: EngineConfig) -> ConfigGuard {
    let previous = ACTIVE.with(|active| active.replace(config));
    ConfigGuard {
        previous: Some(previous),
    }
}

/// Restores the previously active configuration on drop.
#[derive(Debug)]
pub struct ConfigGuard {
    previous: Option<EngineConfig>,
}

impl Drop for ConfigGuard {
    fn drop(&mut self) {
        if let Some(previous) = self.previous.take() {
            ACTIVE.with(|active| *active.borrow_mut() = previous);
        }
    }
}
