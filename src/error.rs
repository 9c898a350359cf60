//! Error types and error handling strategy for sendkit.
//!
//! Every sender shares one error-channel payload, [`Error`]. It plays the role
//! an opaque, type-erased exception handle plays in other sender/receiver
//! designs: any failure, whether reported by user code, raised by a panicking
//! callback, or produced by the library itself, travels downstream as an
//! `Error` through `set_error`.
//!
//! Error handling follows these principles:
//!
//! - Errors are explicit and typed (no stringly-typed errors)
//! - Panics inside user callbacks are caught and converted to
//!   [`ErrorKind::Panicked`]; they never unwind through a receiver
//! - User errors keep their concrete type and can be recovered with
//!   [`Error::downcast_ref`]
//!
//! # Error Categories
//!
//! - **Cancellation**: a scheduler or operation refused to continue
//! - **Callback**: a user-supplied function panicked
//! - **Environment**: a queried facility was absent from the receiver's environment
//! - **Protocol**: a receiver was dropped without ever being completed
//! - **Internal**: library bugs and invalid states
//! - **User**: errors raised by application code

use core::fmt;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

/// The kind of error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    // === Cancellation ===
    /// Operation was cancelled and reported it on the error channel.
    Cancelled,

    // === Callbacks ===
    /// A user-supplied callback panicked.
    Panicked,

    // === Environment ===
    /// A queried facility was not provided by the receiver's environment.
    MissingFacility,

    // === Protocol ===
    /// An operation dropped its receiver without completing it.
    AbandonedReceiver,

    // === Internal ===
    /// Internal library error (bug).
    Internal,

    // === User ===
    /// User-provided error.
    User,
}

impl ErrorKind {
    /// Returns the error category for this kind.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::Cancelled => ErrorCategory::Cancellation,
            Self::Panicked => ErrorCategory::Callback,
            Self::MissingFacility => ErrorCategory::Environment,
            Self::AbandonedReceiver => ErrorCategory::Protocol,
            Self::Internal => ErrorCategory::Internal,
            Self::User => ErrorCategory::User,
        }
    }
}

/// High-level error category for grouping related errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Cancellation-related failures.
    Cancellation,
    /// Failures raised by panicking callbacks.
    Callback,
    /// Missing environment facilities.
    Environment,
    /// Completion protocol violations.
    Protocol,
    /// Internal library errors.
    Internal,
    /// User-originated errors.
    User,
}

/// Payload from a caught panic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanicPayload {
    message: String,
}

impl PanicPayload {
    /// Creates a new panic payload with the given message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Extracts a message from a payload returned by `catch_unwind`.
    #[must_use]
    pub fn from_any(payload: &(dyn Any + Send)) -> Self {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| (*s).to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string panic payload".to_string());
        Self { message }
    }

    /// Returns the panic message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for PanicPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "panic: {}", self.message)
    }
}

/// The error-channel payload shared by every sender.
#[derive(Debug, Clone)]
pub struct Error {
    kind: ErrorKind,
    message: Option<String>,
    source: Option<Arc<dyn std::error::Error + Send + Sync>>,
}

impl Error {
    /// Creates a new error with the given kind.
    #[must_use]
    pub const fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            message: None,
            source: None,
        }
    }

    /// Wraps an application error so it can travel on the error channel.
    #[must_use]
    pub fn user(source: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::new(ErrorKind::User).with_source(source)
    }

    /// Creates a user error carrying only a message.
    #[must_use]
    pub fn msg(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::User).with_message(message)
    }

    /// Creates an error describing a caught panic.
    #[must_use]
    pub fn panicked(payload: &PanicPayload) -> Self {
        Self::new(ErrorKind::Panicked).with_message(payload.message())
    }

    /// Creates an error for a facility the environment does not provide.
    #[must_use]
    pub fn missing_facility(name: &str) -> Self {
        Self::new(ErrorKind::MissingFacility)
            .with_message(format!("environment does not provide `{name}`"))
    }

    /// Creates an internal error (library bug).
    #[must_use]
    pub fn internal(detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal).with_message(detail)
    }

    /// Returns the error kind.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the error category.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        self.kind.category()
    }

    /// Returns true if this error represents cancellation.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self.kind, ErrorKind::Cancelled)
    }

    /// Returns true if this error was produced by a caught panic.
    #[must_use]
    pub const fn is_panic(&self) -> bool {
        matches!(self.kind, ErrorKind::Panicked)
    }

    /// Adds a message description to the error.
    #[must_use]
    pub fn with_message(mut self, msg: impl Into<String>) -> Self {
        self.message = Some(msg.into());
        self
    }

    /// Adds a source error to the chain.
    #[must_use]
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Arc::new(source));
        self
    }

    /// Returns the error message, if any.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Returns the wrapped source error if it has type `T`.
    #[must_use]
    pub fn downcast_ref<T: std::error::Error + 'static>(&self) -> Option<&T> {
        self.source.as_deref().and_then(|source| source.downcast_ref::<T>())
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.kind)?;
        if let Some(msg) = &self.message {
            write!(f, ": {msg}")?;
        }
        if let Some(source) = &self.source {
            write!(f, " ({source})")?;
        }
        Ok(())
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|e| e.as_ref() as _)
    }
}

impl From<PanicPayload> for Error {
    fn from(payload: PanicPayload) -> Self {
        Self::panicked(&payload)
    }
}

/// Runs `f`, converting a panic into an [`ErrorKind::Panicked`] error.
///
/// Combinators call user functions through this so that a panicking
/// callback is reported on the error channel instead of unwinding through
/// the operation.
#[allow(clippy::result_large_err)]
pub fn catch_panic<T>(f: impl FnOnce() -> T) -> Result<T> {
    panic::catch_unwind(AssertUnwindSafe(f))
        .map_err(|payload| Error::panicked(&PanicPayload::from_any(payload.as_ref())))
}

/// A specialized Result type for sendkit operations.
#[allow(clippy::result_large_err)]
pub type Result<T> = core::result::Result<T, Error>;
