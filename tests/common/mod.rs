#![allow(dead_code)]
#![allow(unused_imports)]
//! Shared integration test utilities.
//!
//! Import with:
//! ```ignore
//! mod common;
//! use common::*;
//! ```

use parking_lot::Mutex;
use proptest::prelude::ProptestConfig;
use proptest::test_runner::RngSeed;
use sendkit::{Channel, Completion, Env, Error, Receiver};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Once};
use tracing_subscriber::fmt::format::FmtSpan;

static INIT_LOGGING: Once = Once::new();

/// Default seed for property tests when running under CI.
pub const DEFAULT_PROPTEST_SEED: u64 = 0x5EED_5EED;

const PROPTEST_SEED_ENV: &str = "SENDKIT_PROPTEST_SEED";
const PROPTEST_MAX_SHRINK_ITERS_ENV: &str = "SENDKIT_PROPTEST_MAX_SHRINK_ITERS";

/// Configuration for property tests with optional deterministic seed support.
#[derive(Debug, Clone)]
pub struct PropertyTestConfig {
    /// Fixed seed for reproducibility (overrides CI default when set).
    pub seed: Option<u64>,
    /// Number of successful cases required.
    pub cases: u32,
    /// Maximum shrink iterations.
    pub max_shrink_iters: u32,
}

impl PropertyTestConfig {
    /// Build a config with defaults for property tests.
    #[must_use]
    pub fn new(cases: u32) -> Self {
        Self {
            seed: read_proptest_seed(),
            cases,
            max_shrink_iters: read_max_shrink_iters()
                .unwrap_or(ProptestConfig::default().max_shrink_iters),
        }
    }

    /// Convert into a ProptestConfig, applying deterministic seed rules.
    #[must_use]
    pub fn to_proptest_config(&self) -> ProptestConfig {
        let mut config = ProptestConfig::with_cases(self.cases);

        // Honor existing PROPTEST_RNG_SEED, otherwise apply our own.
        if matches!(config.rng_seed, RngSeed::Random) {
            if let Some(seed) = self.seed {
                config.rng_seed = RngSeed::Fixed(seed);
            }
        }

        config.max_shrink_iters = self.max_shrink_iters;
        config
    }
}

/// Build a ProptestConfig with deterministic seed support for CI.
#[must_use]
pub fn test_proptest_config(cases: u32) -> ProptestConfig {
    PropertyTestConfig::new(cases).to_proptest_config()
}

fn read_proptest_seed() -> Option<u64> {
    if let Ok(value) = std::env::var(PROPTEST_SEED_ENV) {
        return value.parse::<u64>().ok();
    }

    // If CI is set and no explicit seed is provided, use a fixed seed.
    if std::env::var("CI").is_ok() {
        return Some(DEFAULT_PROPTEST_SEED);
    }

    None
}

fn read_max_shrink_iters() -> Option<u32> {
    std::env::var(PROPTEST_MAX_SHRINK_ITERS_ENV)
        .ok()
        .and_then(|value| value.parse::<u32>().ok())
}

/// Initialize test logging with trace-level output.
pub fn init_test_logging() {
    init_test_logging_with_level(tracing::Level::TRACE);
}

/// Initialize test logging with a custom level.
pub fn init_test_logging_with_level(level: tracing::Level) {
    INIT_LOGGING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_max_level(level)
            .with_test_writer()
            .with_file(true)
            .with_line_number(true)
            .with_target(true)
            .with_thread_ids(true)
            .with_span_events(FmtSpan::CLOSE)
            .with_ansi(false)
            .try_init();
    });
}

/// Log a test phase transition with a visual separator.
#[macro_export]
macro_rules! test_phase {
    ($name:expr) => {
        tracing::info!(phase = %$name, "========================================");
        tracing::info!(phase = %$name, "TEST PHASE: {}", $name);
        tracing::info!(phase = %$name, "========================================");
    };
}

/// Log a section within a test phase.
#[macro_export]
macro_rules! test_section {
    ($name:expr) => {
        tracing::debug!(section = %$name, "--- {} ---", $name);
    };
}

/// Log test completion with summary.
#[macro_export]
macro_rules! test_complete {
    ($name:expr) => {
        tracing::info!(test = %$name, "test completed successfully: {}", $name);
    };
    ($name:expr, $($key:ident = $value:expr),* $(,)?) => {
        tracing::info!(
            test = %$name,
            $($key = %$value,)*
            "test completed successfully: {}",
            $name
        );
    };
}

/// Log before assertions for context.
#[macro_export]
macro_rules! assert_with_log {
    ($cond:expr, $msg:expr, $expected:expr, $actual:expr) => {
        tracing::debug!(
            expected = ?$expected,
            actual = ?$actual,
            "Asserting: {}",
            $msg
        );
        assert!($cond, "{}: expected {:?}, got {:?}", $msg, $expected, $actual);
    };
}

/// Initialize logging and announce the test.
pub fn init_test(name: &str) {
    init_test_logging();
    test_phase!(name);
}

/// Shared state behind a [`Capture`].
struct CaptureState<V> {
    completions: Mutex<Vec<Completion<V>>>,
    dropped_incomplete: AtomicUsize,
}

/// An instrumented receiver factory counting every completion call.
pub struct Capture<V> {
    state: Arc<CaptureState<V>>,
    env: Env,
}

impl<V: Send + 'static> Capture<V> {
    /// A capture whose receivers expose the default environment.
    #[must_use]
    pub fn new() -> Self {
        Self::with_env(Env::new())
    }

    /// A capture whose receivers expose `env`.
    #[must_use]
    pub fn with_env(env: Env) -> Self {
        Self {
            state: Arc::new(CaptureState {
                completions: Mutex::new(Vec::new()),
                dropped_incomplete: AtomicUsize::new(0),
            }),
            env,
        }
    }

    /// A receiver feeding this capture.
    #[must_use]
    pub fn receiver(&self) -> CaptureReceiver<V> {
        CaptureReceiver {
            state: Arc::clone(&self.state),
            env: self.env.clone(),
            done: false,
        }
    }

    /// Number of completion calls observed.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.state.completions.lock().len()
    }

    /// Receivers dropped without a completion call.
    #[must_use]
    pub fn dropped_incomplete(&self) -> usize {
        self.state.dropped_incomplete.load(Ordering::SeqCst)
    }

    /// Channels observed, in order.
    #[must_use]
    pub fn channels(&self) -> Vec<Channel> {
        self.state
            .completions
            .lock()
            .iter()
            .map(Completion::channel)
            .collect()
    }

    /// Takes every observed completion.
    #[must_use]
    pub fn take(&self) -> Vec<Completion<V>> {
        std::mem::take(&mut *self.state.completions.lock())
    }

    /// Takes the single observed completion, failing the test otherwise.
    #[must_use]
    pub fn single(&self) -> Completion<V> {
        let mut completions = self.take();
        assert_eq!(completions.len(), 1, "expected exactly one completion");
        completions.remove(0)
    }
}

impl<V> Clone for Capture<V> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            env: self.env.clone(),
        }
    }
}

/// Receiver handed out by [`Capture::receiver`].
pub struct CaptureReceiver<V> {
    state: Arc<CaptureState<V>>,
    env: Env,
    done: bool,
}

impl<V> CaptureReceiver<V> {
    fn push(mut self, completion: Completion<V>) {
        self.done = true;
        self.state.completions.lock().push(completion);
    }
}

impl<V: Send + 'static> Receiver<V> for CaptureReceiver<V> {
    fn set_value(self, value: V) {
        self.push(Completion::Value(value));
    }

    fn set_error(self, error: Error) {
        self.push(Completion::Error(error));
    }

    fn set_stopped(self) {
        self.push(Completion::Stopped);
    }

    fn env(&self) -> Env {
        self.env.clone()
    }
}

impl<V> Drop for CaptureReceiver<V> {
    fn drop(&mut self) {
        if !self.done {
            self.state.dropped_incomplete.fetch_add(1, Ordering::SeqCst);
        }
    }
}
