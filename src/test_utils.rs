//! Test utilities for sendkit.
//!
//! This module provides shared helpers for unit tests:
//! - Consistent tracing-based logging initialization
//! - Phase/section macros for readable test output
//! - [`Recording`], a receiver that captures every completion it gets
//!
//! # Example
//! ```ignore
//! use sendkit::test_utils::{init_test_logging, Recording};
//! use sendkit::{just, OperationState, Sender};
//!
//! init_test_logging();
//! let recording = Recording::new();
//! just(1).connect(recording.receiver()).start();
//! assert_eq!(recording.take_value(), Some(1));
//! ```

use crate::env::Env;
use crate::error::Error;
use crate::protocol::Receiver;
use crate::types::{Channel, Completion};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};
use tracing_subscriber::fmt::format::FmtSpan;

static INIT_LOGGING: Once = Once::new();
static ENV_LOCK: Mutex<()> = Mutex::new(());

/// Initialize test logging with trace-level output.
///
/// Safe to call multiple times; only initializes once.
pub fn init_test_logging() {
    init_test_logging_with_level(tracing::Level::TRACE);
}

/// Initialize test logging with a custom level.
///
/// The first call wins; later calls are no-ops.
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

/// Acquire the global environment lock for tests that mutate env vars.
pub(crate) fn env_lock() -> std::sync::MutexGuard<'static, ()> {
    ENV_LOCK
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
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

struct RecordingShared<V> {
    completions: parking_lot::Mutex<Vec<Completion<V>>>,
    abandoned: AtomicUsize,
}

/// Captures the completions of every receiver it hands out.
///
/// Receivers may be completed on any thread. A receiver dropped without
/// being completed is counted in [`abandoned`](Self::abandoned).
pub struct Recording<V> {
    shared: Arc<RecordingShared<V>>,
    env: Env,
}

impl<V: Send + 'static> Recording<V> {
    /// A recording whose receivers expose the default environment.
    #[must_use]
    pub fn new() -> Self {
        Self::with_env(Env::new())
    }

    /// A recording whose receivers expose `env`.
    #[must_use]
    pub fn with_env(env: Env) -> Self {
        Self {
            shared: Arc::new(RecordingShared {
                completions: parking_lot::Mutex::new(Vec::new()),
                abandoned: AtomicUsize::new(0),
            }),
            env,
        }
    }

    /// Hands out a new receiver recording into this recording.
    #[must_use]
    pub fn receiver(&self) -> RecordingReceiver<V> {
        RecordingReceiver {
            shared: Arc::clone(&self.shared),
            env: self.env.clone(),
            completed: false,
        }
    }

    /// Removes and returns every completion recorded so far.
    #[must_use]
    pub fn take(&self) -> Vec<Completion<V>> {
        std::mem::take(&mut *self.shared.completions.lock())
    }

    /// Removes the first completion if it is a value and returns the value.
    #[must_use]
    pub fn take_value(&self) -> Option<V> {
        let mut completions = self.shared.completions.lock();
        if completions.first().is_some_and(Completion::is_value) {
            completions.remove(0).value()
        } else {
            None
        }
    }

    /// Removes the first completion if it is an error and returns the error.
    #[must_use]
    pub fn take_error(&self) -> Option<Error> {
        let mut completions = self.shared.completions.lock();
        match completions.first() {
            Some(Completion::Error(_)) => match completions.remove(0) {
                Completion::Error(error) => Some(error),
                Completion::Value(_) | Completion::Stopped => None,
            },
            _ => None,
        }
    }

    /// Channels of the recorded completions, in arrival order.
    #[must_use]
    pub fn channels(&self) -> Vec<Channel> {
        self.shared
            .completions
            .lock()
            .iter()
            .map(Completion::channel)
            .collect()
    }

    /// Returns true if the first recorded completion is `stopped`.
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.channels().first() == Some(&Channel::Stopped)
    }

    /// Number of completions recorded so far.
    #[must_use]
    pub fn count(&self) -> usize {
        self.shared.completions.lock().len()
    }

    /// Number of receivers dropped without being completed.
    #[must_use]
    pub fn abandoned(&self) -> usize {
        self.shared.abandoned.load(Ordering::SeqCst)
    }
}

impl<V: Send + 'static> Default for Recording<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> Clone for Recording<V> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
            env: self.env.clone(),
        }
    }
}

/// Receiver handed out by [`Recording::receiver`].
pub struct RecordingReceiver<V> {
    shared: Arc<RecordingShared<V>>,
    env: Env,
    completed: bool,
}

impl<V> RecordingReceiver<V> {
    fn record(mut self, completion: Completion<V>) {
        self.completed = true;
        self.shared.completions.lock().push(completion);
    }
}

impl<V: Send + 'static> Receiver<V> for RecordingReceiver<V> {
    fn set_value(self, value: V) {
        self.record(Completion::Value(value));
    }

    fn set_error(self, error: Error) {
        self.record(Completion::Error(error));
    }

    fn set_stopped(self) {
        self.record(Completion::Stopped);
    }

    fn env(&self) -> Env {
        self.env.clone()
    }
}

impl<V> Drop for RecordingReceiver<V> {
    fn drop(&mut self) {
        if !self.completed {
            tracing::warn!("recording receiver dropped without completion");
            self.shared.abandoned.fetch_add(1, Ordering::SeqCst);
        }
    }
}
