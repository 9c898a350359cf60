//! Completion channels and captured completions.
//!
//! Every operation finishes on exactly one of three channels:
//!
//! - `Value(V)`: success, carrying the sender's value
//! - `Error(Error)`: failure, carrying the shared error payload
//! - `Stopped`: cancellation, carrying nothing
//!
//! [`Completion`] captures one such event so it can be stored and replayed
//! later, for example on another scheduler or to several split subscribers.

use crate::error::{Error, Result};
use crate::protocol::Receiver;
use core::fmt;

/// One of the three completion channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Channel {
    /// Successful completion.
    Value,
    /// Failed completion.
    Error,
    /// Cancelled completion.
    Stopped,
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value => write!(f, "value"),
            Self::Error => write!(f, "error"),
            Self::Stopped => write!(f, "stopped"),
        }
    }
}

/// A captured completion event.
#[derive(Debug, Clone)]
pub enum Completion<V> {
    /// Completed with a value.
    Value(V),
    /// Completed with an error.
    Error(Error),
    /// Completed because of cancellation.
    Stopped,
}

impl<V> Completion<V> {
    /// Returns the channel this completion was delivered on.
    #[must_use]
    pub const fn channel(&self) -> Channel {
        match self {
            Self::Value(_) => Channel::Value,
            Self::Error(_) => Channel::Error,
            Self::Stopped => Channel::Stopped,
        }
    }

    /// Returns true if this is a value completion.
    #[must_use]
    pub const fn is_value(&self) -> bool {
        matches!(self, Self::Value(_))
    }

    /// Returns true if this is an error completion.
    #[must_use]
    pub const fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }

    /// Returns true if this is a stopped completion.
    #[must_use]
    pub const fn is_stopped(&self) -> bool {
        matches!(self, Self::Stopped)
    }

    /// Replays this completion into `receiver`.
    pub fn deliver<R: Receiver<V>>(self, receiver: R) {
        match self {
            Self::Value(value) => receiver.set_value(value),
            Self::Error(error) => receiver.set_error(error),
            Self::Stopped => receiver.set_stopped(),
        }
    }

    /// Maps the value channel, leaving error and stopped untouched.
    pub fn map<U>(self, f: impl FnOnce(V) -> U) -> Completion<U> {
        match self {
            Self::Value(value) => Completion::Value(f(value)),
            Self::Error(error) => Completion::Error(error),
            Self::Stopped => Completion::Stopped,
        }
    }

    /// Returns the value, if any.
    pub fn value(self) -> Option<V> {
        match self {
            Self::Value(value) => Some(value),
            Self::Error(_) | Self::Stopped => None,
        }
    }

    /// Returns the error, if any.
    #[must_use]
    pub const fn error(&self) -> Option<&Error> {
        match self {
            Self::Error(error) => Some(error),
            Self::Value(_) | Self::Stopped => None,
        }
    }

    /// Converts to the blocking-consumer shape: value as `Some`, stopped as
    /// `None`, error as `Err`.
    #[allow(clippy::result_large_err)]
    pub fn into_result(self) -> Result<Option<V>> {
        match self {
            Self::Value(value) => Ok(Some(value)),
            Self::Stopped => Ok(None),
            Self::Error(error) => Err(error),
        }
    }
}
