//! Run-loop configuration.
//!
//! # Defaults
//!
//! | Field | Default |
//! |-------|---------|
//! | `name` | `"run-loop"` |
//! | `queue_capacity` | 64 |
//! | `trace_tasks` | false |
//!
//! Use [`RunLoopConfig::from_env`] to start from the defaults and apply
//! `SENDKIT_RUN_LOOP_*` overrides (see [`env_config`](super::env_config)).

use super::env_config;

/// Default run-loop name used in log output.
pub const DEFAULT_RUN_LOOP_NAME: &str = "run-loop";
/// Default initial queue capacity.
pub const DEFAULT_QUEUE_CAPACITY: usize = 64;

/// Error produced while building or loading a configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// An environment variable held a value of the wrong shape.
    #[error("invalid value for {var}: expected {expected}, got {value:?}")]
    InvalidEnv {
        /// Variable name.
        var: String,
        /// Raw value.
        value: String,
        /// Description of the accepted values.
        expected: &'static str,
    },
    /// A field failed validation.
    #[error("invalid run-loop configuration: {field} {reason}")]
    Invalid {
        /// Offending field.
        field: &'static str,
        /// What is wrong with it.
        reason: &'static str,
    },
    /// The configuration file could not be read.
    #[cfg(feature = "config-file")]
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    /// The configuration file is not valid TOML for this schema.
    #[cfg(feature = "config-file")]
    #[error("failed to parse TOML config: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Configuration of a [`RunLoop`](super::RunLoop).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunLoopConfig {
    /// Name attached to the loop's log records.
    pub name: String,
    /// Initial capacity of the task queue.
    pub queue_capacity: usize,
    /// Emit a trace record for every scheduled and executed task.
    pub trace_tasks: bool,
}

impl RunLoopConfig {
    /// Defaults with environment overrides applied.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        env_config::apply_env_overrides(&mut config)?;
        config.validate()?;
        Ok(config)
    }

    /// Sets the loop name.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the initial queue capacity.
    #[must_use]
    pub const fn queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    /// Enables or disables per-task trace records.
    #[must_use]
    pub const fn trace_tasks(mut self, enabled: bool) -> Self {
        self.trace_tasks = enabled;
        self
    }

    /// Checks field invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "name",
                reason: "must not be empty",
            });
        }
        Ok(())
    }
}

impl Default for RunLoopConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_RUN_LOOP_NAME.to_string(),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            trace_tasks: false,
        }
    }
}
