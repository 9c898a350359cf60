//! Loading run-loop configuration from TOML files.

#[macro_use]
mod common;

use common::*;
use sendkit::runtime::env_config::{load_config, parse_toml_file};
use sendkit::runtime::ConfigError;
use sendkit::{just, sync_wait_with_config, RunLoopConfig};
use std::path::PathBuf;

struct ConfigFile {
    path: PathBuf,
}

impl ConfigFile {
    fn write(name: &str, contents: &str) -> Self {
        let path = std::env::temp_dir().join(format!(
            "sendkit-{}-{}.toml",
            name,
            std::process::id()
        ));
        std::fs::write(&path, contents).expect("write config file");
        Self { path }
    }
}

impl Drop for ConfigFile {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

// ============================================================================
// File loading
// ============================================================================

#[test]
fn load_config_reads_every_field() {
    init_test("load_config_reads_every_field");
    let file = ConfigFile::write(
        "full",
        "[run_loop]\nname = \"io\"\nqueue_capacity = 256\ntrace_tasks = true\n",
    );
    let config = load_config(&file.path).expect("load config");
    assert_eq!(
        config,
        RunLoopConfig::default().name("io").queue_capacity(256).trace_tasks(true)
    );
    test_complete!("load_config_reads_every_field");
}

#[test]
fn missing_section_keeps_defaults() {
    init_test("missing_section_keeps_defaults");
    let file = ConfigFile::write("empty", "# nothing configured\n");
    assert_eq!(load_config(&file.path).expect("load config"), RunLoopConfig::default());
    test_complete!("missing_section_keeps_defaults");
}

#[test]
fn missing_file_is_an_io_error() {
    init_test("missing_file_is_an_io_error");
    let path = std::env::temp_dir().join("sendkit-does-not-exist.toml");
    let err = parse_toml_file(&path).expect_err("missing file");
    assert!(matches!(err, ConfigError::Io(_)), "got {err}");
    test_complete!("missing_file_is_an_io_error");
}

#[test]
fn invalid_values_fail_validation() {
    init_test("invalid_values_fail_validation");
    let file = ConfigFile::write("invalid", "[run_loop]\nname = \"\"\n");
    assert!(matches!(
        load_config(&file.path),
        Err(ConfigError::Invalid { field: "name", .. })
    ));
    test_complete!("invalid_values_fail_validation");
}

#[test]
fn loaded_config_drives_sync_wait() {
    init_test("loaded_config_drives_sync_wait");
    let file = ConfigFile::write("driver", "[run_loop]\nname = \"from-file\"\n");
    let config = load_config(&file.path).expect("load config");
    assert_eq!(sync_wait_with_config(just(7), config).expect("value"), Some(7));
    test_complete!("loaded_config_drives_sync_wait");
}
