//! Environment variable and config file support for [`RunLoopConfig`].
//!
//! # Configuration Precedence
//!
//! Settings are resolved in this order (highest priority first):
//!
//! 1. **Programmatic**: values set via builder methods (`.name("io")`)
//! 2. **Environment variables**: values from `SENDKIT_RUN_LOOP_*` env vars
//! 3. **Config file**: values loaded from a TOML file (requires `config-file` feature)
//! 4. **Defaults**: built-in defaults from [`RunLoopConfig::default()`]
//!
//! # Supported Environment Variables
//!
//! | Variable | Type | Maps to |
//! |----------|------|---------|
//! | `SENDKIT_RUN_LOOP_NAME` | `String` | `name` |
//! | `SENDKIT_RUN_LOOP_QUEUE_CAPACITY` | `usize` | `queue_capacity` |
//! | `SENDKIT_RUN_LOOP_TRACE_TASKS` | `bool` | `trace_tasks` |

use super::config::{ConfigError, RunLoopConfig};

/// Environment variable name for the loop name.
pub const ENV_RUN_LOOP_NAME: &str = "SENDKIT_RUN_LOOP_NAME";
/// Environment variable name for the initial queue capacity.
pub const ENV_RUN_LOOP_QUEUE_CAPACITY: &str = "SENDKIT_RUN_LOOP_QUEUE_CAPACITY";
/// Environment variable name for per-task tracing.
pub const ENV_RUN_LOOP_TRACE_TASKS: &str = "SENDKIT_RUN_LOOP_TRACE_TASKS";

/// Apply environment variable overrides to a [`RunLoopConfig`].
///
/// Only variables that are set in the environment are applied.
/// Returns an error if a variable is set but contains an unparseable value.
pub fn apply_env_overrides(config: &mut RunLoopConfig) -> Result<(), ConfigError> {
    if let Some(val) = read_env(ENV_RUN_LOOP_NAME) {
        config.name = val;
    }
    if let Some(val) = read_env(ENV_RUN_LOOP_QUEUE_CAPACITY) {
        config.queue_capacity = parse_usize(ENV_RUN_LOOP_QUEUE_CAPACITY, &val)?;
    }
    if let Some(val) = read_env(ENV_RUN_LOOP_TRACE_TASKS) {
        config.trace_tasks = parse_bool(ENV_RUN_LOOP_TRACE_TASKS, &val)?;
    }
    Ok(())
}

fn read_env(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

fn parse_usize(var_name: &str, val: &str) -> Result<usize, ConfigError> {
    val.trim()
        .parse::<usize>()
        .map_err(|_| ConfigError::InvalidEnv {
            var: var_name.to_string(),
            value: val.to_string(),
            expected: "unsigned integer",
        })
}

fn parse_bool(var_name: &str, val: &str) -> Result<bool, ConfigError> {
    match val.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidEnv {
            var: var_name.to_string(),
            value: val.to_string(),
            expected: "bool (true/false/1/0/yes/no)",
        }),
    }
}

// =========================================================================
// TOML config file support (feature-gated)
// =========================================================================

/// TOML-deserializable run-loop configuration.
///
/// ```toml
/// [run_loop]
/// name = "io"
/// queue_capacity = 256
/// trace_tasks = true
/// ```
#[cfg(feature = "config-file")]
#[derive(serde::Deserialize, Default, Debug)]
pub struct RunLoopTomlConfig {
    /// Run-loop settings.
    #[serde(default)]
    pub run_loop: RunLoopToml,
}

/// `[run_loop]` section of the TOML config.
#[cfg(feature = "config-file")]
#[derive(serde::Deserialize, Default, Debug)]
pub struct RunLoopToml {
    /// Loop name.
    pub name: Option<String>,
    /// Initial queue capacity.
    pub queue_capacity: Option<usize>,
    /// Per-task tracing.
    pub trace_tasks: Option<bool>,
}

/// Apply a parsed TOML config to a [`RunLoopConfig`].
///
/// Only fields that are `Some` in the TOML struct override the config.
#[cfg(feature = "config-file")]
pub fn apply_toml_config(config: &mut RunLoopConfig, toml: &RunLoopTomlConfig) {
    if let Some(ref v) = toml.run_loop.name {
        config.name.clone_from(v);
    }
    if let Some(v) = toml.run_loop.queue_capacity {
        config.queue_capacity = v;
    }
    if let Some(v) = toml.run_loop.trace_tasks {
        config.trace_tasks = v;
    }
}

/// Parse a TOML string into a [`RunLoopTomlConfig`].
#[cfg(feature = "config-file")]
pub fn parse_toml_str(toml_str: &str) -> Result<RunLoopTomlConfig, ConfigError> {
    Ok(toml::from_str(toml_str)?)
}

/// Read and parse a TOML file into a [`RunLoopTomlConfig`].
#[cfg(feature = "config-file")]
pub fn parse_toml_file(path: &std::path::Path) -> Result<RunLoopTomlConfig, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    parse_toml_str(&content)
}

/// Load a configuration: defaults, then the TOML file, then environment overrides.
#[cfg(feature = "config-file")]
pub fn load_config(path: &std::path::Path) -> Result<RunLoopConfig, ConfigError> {
    let mut config = RunLoopConfig::default();
    apply_toml_config(&mut config, &parse_toml_file(path)?);
    apply_env_overrides(&mut config)?;
    config.validate()?;
    Ok(config)
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn with_clean_env<F, R>(f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let _guard = crate::test_utils::env_lock();
        clean_env_locked();
        f()
    }

    fn with_envs<F, R>(vars: &[(&str, &str)], f: F) -> R
    where
        F: FnOnce() -> R,
    {
        with_clean_env(|| {
            for (k, v) in vars {
                std::env::set_var(k, v);
            }
            let result = f();
            for (k, _) in vars {
                std::env::remove_var(k);
            }
            result
        })
    }

    fn clean_env_locked() {
        for var in &[
            ENV_RUN_LOOP_NAME,
            ENV_RUN_LOOP_QUEUE_CAPACITY,
            ENV_RUN_LOOP_TRACE_TASKS,
        ] {
            std::env::remove_var(var);
        }
    }

    // --- parse helpers ---

    #[test]
    fn parse_usize_valid() {
        assert_eq!(super::parse_usize("TEST", "42").unwrap(), 42);
        assert_eq!(super::parse_usize("TEST", " 100 ").unwrap(), 100);
    }

    #[test]
    fn parse_usize_invalid() {
        assert!(super::parse_usize("TEST", "abc").is_err());
        assert!(super::parse_usize("TEST", "-1").is_err());
        assert!(super::parse_usize("TEST", "").is_err());
    }

    #[test]
    fn parse_bool_accepts_common_spellings() {
        for val in &["true", "1", "yes", "on", "TRUE", "On"] {
            assert!(super::parse_bool("TEST", val).unwrap(), "expected true for {val}");
        }
        for val in &["false", "0", "no", "off", "FALSE", "No"] {
            assert!(!super::parse_bool("TEST", val).unwrap(), "expected false for {val}");
        }
        assert!(super::parse_bool("TEST", "maybe").is_err());
    }

    // --- apply_env_overrides ---

    #[test]
    fn env_overrides_all_fields() {
        with_envs(
            &[
                (ENV_RUN_LOOP_NAME, "worker"),
                (ENV_RUN_LOOP_QUEUE_CAPACITY, "512"),
                (ENV_RUN_LOOP_TRACE_TASKS, "yes"),
            ],
            || {
                let config = RunLoopConfig::from_env().unwrap();
                assert_eq!(config.name, "worker");
                assert_eq!(config.queue_capacity, 512);
                assert!(config.trace_tasks);
            },
        );
    }

    #[test]
    fn unset_env_keeps_defaults() {
        with_clean_env(|| {
            let config = RunLoopConfig::from_env().unwrap();
            assert_eq!(config, RunLoopConfig::default());
        });
    }

    #[test]
    fn invalid_env_value_is_reported() {
        with_envs(&[(ENV_RUN_LOOP_QUEUE_CAPACITY, "lots")], || {
            let err = RunLoopConfig::from_env().unwrap_err();
            assert_eq!(
                err.to_string(),
                "invalid value for SENDKIT_RUN_LOOP_QUEUE_CAPACITY: expected unsigned integer, got \"lots\""
            );
        });
    }

    #[test]
    fn empty_name_from_env_fails_validation() {
        with_envs(&[(ENV_RUN_LOOP_NAME, "")], || {
            assert!(matches!(
                RunLoopConfig::from_env(),
                Err(ConfigError::Invalid { field: "name", .. })
            ));
        });
    }

    #[cfg(feature = "config-file")]
    #[test]
    fn toml_overrides_selected_fields() {
        let parsed = parse_toml_str("[run_loop]\nname = \"io\"\ntrace_tasks = true\n").unwrap();
        let mut config = RunLoopConfig::default();
        apply_toml_config(&mut config, &parsed);
        assert_eq!(config.name, "io");
        assert!(config.trace_tasks);
        assert_eq!(config.queue_capacity, super::super::config::DEFAULT_QUEUE_CAPACITY);
    }

    #[cfg(feature = "config-file")]
    #[test]
    fn toml_empty_document_is_default() {
        let parsed = parse_toml_str("").unwrap();
        let mut config = RunLoopConfig::default();
        apply_toml_config(&mut config, &parsed);
        assert_eq!(config, RunLoopConfig::default());
    }

    #[cfg(feature = "config-file")]
    #[test]
    fn toml_type_errors_are_reported() {
        let err = parse_toml_str("[run_loop]\nqueue_capacity = \"big\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Toml(_)));
    }
}
