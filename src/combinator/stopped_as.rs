//! Folding the stopped channel into the value or error channel.
//!
//! - `stopped_as_optional(src)`: `value(v)` becomes `value(Some(v))`,
//!   `stopped` becomes `value(None)`
//! - `stopped_as_error(src, e)`: `stopped` becomes `error(e)`
//!
//! In both cases the result never completes with `stopped`.

use crate::env::{Env, EnvShape};
use crate::error::Error;
use crate::protocol::{OperationState, Receiver, Sender};
use crate::types::{Channel, Signatures};
use std::marker::PhantomData;

/// Sender returned by [`stopped_as_optional`].
#[must_use = "senders do nothing unless connected and started"]
pub struct StoppedAsOptional<S> {
    source: S,
}

/// Maps `value(v)` to `value(Some(v))` and `stopped` to `value(None)`.
pub fn stopped_as_optional<S: Sender>(source: S) -> StoppedAsOptional<S> {
    StoppedAsOptional { source }
}

impl<S: Sender> Sender for StoppedAsOptional<S> {
    type Value = Option<S::Value>;

    fn signatures(env: Option<EnvShape>) -> Signatures {
        S::signatures(env).map(|sigs| {
            if sigs.sends(Channel::Value) || sigs.sends(Channel::Stopped) {
                sigs.without(Channel::Value)
                    .without(Channel::Stopped)
                    .with_value::<Option<S::Value>>()
            } else {
                sigs
            }
        })
    }

    fn connect<R>(self, receiver: R) -> impl OperationState
    where
        R: Receiver<Option<S::Value>>,
    {
        self.source.connect(OptionalReceiver {
            inner: receiver,
            _value: PhantomData,
        })
    }
}

struct OptionalReceiver<V, R> {
    inner: R,
    _value: PhantomData<fn(V)>,
}

impl<V: Send + 'static, R: Receiver<Option<V>>> Receiver<V> for OptionalReceiver<V, R> {
    fn set_value(self, value: V) {
        self.inner.set_value(Some(value));
    }

    fn set_error(self, error: Error) {
        self.inner.set_error(error);
    }

    fn set_stopped(self) {
        self.inner.set_value(None);
    }

    fn env(&self) -> Env {
        self.inner.env()
    }
}

/// Sender returned by [`stopped_as_error`].
#[must_use = "senders do nothing unless connected and started"]
pub struct StoppedAsError<S> {
    source: S,
    error: Error,
}

/// Reports cancellation of `source` as `error`.
pub fn stopped_as_error<S: Sender>(source: S, error: Error) -> StoppedAsError<S> {
    StoppedAsError { source, error }
}

impl<S: Sender> Sender for StoppedAsError<S> {
    type Value = S::Value;

    fn signatures(env: Option<EnvShape>) -> Signatures {
        S::signatures(env).map(|sigs| {
            if sigs.sends(Channel::Stopped) {
                sigs.without(Channel::Stopped).with_error()
            } else {
                sigs
            }
        })
    }

    fn connect<R>(self, receiver: R) -> impl OperationState
    where
        R: Receiver<S::Value>,
    {
        self.source.connect(StoppedErrorReceiver {
            inner: receiver,
            error: self.error,
        })
    }
}

struct StoppedErrorReceiver<R> {
    inner: R,
    error: Error,
}

impl<V, R: Receiver<V>> Receiver<V> for StoppedErrorReceiver<R> {
    fn set_value(self, value: V) {
        self.inner.set_value(value);
    }

    fn set_error(self, error: Error) {
        self.inner.set_error(error);
    }

    fn set_stopped(self) {
        self.inner.set_error(self.error);
    }

    fn env(&self) -> Env {
        self.inner.env()
    }
}
