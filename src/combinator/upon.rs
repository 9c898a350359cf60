//! Error- and stopped-channel recovery.
//!
//! `upon_error(src, f)` turns an error into a value by calling `f(error)`;
//! `upon_stopped(src, f)` does the same for cancellation with `f()`. The
//! value they produce must have the source's value type. A panic inside `f`
//! is delivered as an error.

use crate::env::{Env, EnvShape};
use crate::error::{catch_panic, Error};
use crate::protocol::{OperationState, Receiver, Sender};
use crate::types::{Channel, Signatures};

/// Sender returned by [`upon_error`].
#[must_use = "senders do nothing unless connected and started"]
pub struct UponError<S, F> {
    source: S,
    f: F,
}

/// Sender returned by [`upon_stopped`].
#[must_use = "senders do nothing unless connected and started"]
pub struct UponStopped<S, F> {
    source: S,
    f: F,
}

/// Recovers from `source`'s error with `f`.
pub fn upon_error<S, F>(source: S, f: F) -> UponError<S, F>
where
    S: Sender,
    F: FnOnce(Error) -> S::Value + Send + 'static,
{
    UponError { source, f }
}

/// Recovers from `source`'s cancellation with `f`.
pub fn upon_stopped<S, F>(source: S, f: F) -> UponStopped<S, F>
where
    S: Sender,
    F: FnOnce() -> S::Value + Send + 'static,
{
    UponStopped { source, f }
}

impl<S, F> Sender for UponError<S, F>
where
    S: Sender,
    F: FnOnce(Error) -> S::Value + Send + 'static,
{
    type Value = S::Value;

    fn signatures(env: Option<EnvShape>) -> Signatures {
        S::signatures(env).map(|sigs| {
            if sigs.sends(Channel::Error) {
                sigs.without(Channel::Error)
                    .with_value::<S::Value>()
                    .with_error()
            } else {
                sigs
            }
        })
    }

    fn connect<R>(self, receiver: R) -> impl OperationState
    where
        R: Receiver<S::Value>,
    {
        self.source.connect(UponErrorReceiver {
            inner: receiver,
            f: self.f,
        })
    }
}

impl<S, F> Sender for UponStopped<S, F>
where
    S: Sender,
    F: FnOnce() -> S::Value + Send + 'static,
{
    type Value = S::Value;

    fn signatures(env: Option<EnvShape>) -> Signatures {
        S::signatures(env).map(|sigs| {
            if sigs.sends(Channel::Stopped) {
                sigs.without(Channel::Stopped)
                    .with_value::<S::Value>()
                    .with_error()
            } else {
                sigs
            }
        })
    }

    fn connect<R>(self, receiver: R) -> impl OperationState
    where
        R: Receiver<S::Value>,
    {
        self.source.connect(UponStoppedReceiver {
            inner: receiver,
            f: self.f,
        })
    }
}

struct UponErrorReceiver<R, F> {
    inner: R,
    f: F,
}

impl<V, R, F> Receiver<V> for UponErrorReceiver<R, F>
where
    F: FnOnce(Error) -> V + Send + 'static,
    R: Receiver<V>,
{
    fn set_value(self, value: V) {
        self.inner.set_value(value);
    }

    fn set_error(self, error: Error) {
        let Self { inner, f } = self;
        match catch_panic(move || f(error)) {
            Ok(value) => inner.set_value(value),
            Err(panic) => inner.set_error(panic),
        }
    }

    fn set_stopped(self) {
        self.inner.set_stopped();
    }

    fn env(&self) -> Env {
        self.inner.env()
    }
}

struct UponStoppedReceiver<R, F> {
    inner: R,
    f: F,
}

impl<V, R, F> Receiver<V> for UponStoppedReceiver<R, F>
where
    F: FnOnce() -> V + Send + 'static,
    R: Receiver<V>,
{
    fn set_value(self, value: V) {
        self.inner.set_value(value);
    }

    fn set_error(self, error: Error) {
        self.inner.set_error(error);
    }

    fn set_stopped(self) {
        let Self { inner, f } = self;
        match catch_panic(f) {
            Ok(value) => inner.set_value(value),
            Err(panic) => inner.set_error(panic),
        }
    }

    fn env(&self) -> Env {
        self.inner.env()
    }
}
