//! Value-channel transformation.
//!
//! # Semantics
//!
//! `then(src, f)`:
//! 1. On `value(v)` from `src`, call `f(v)`
//! 2. If `f` returns `u`, complete with `value(u)`
//! 3. If `f` panics, complete with `error` carrying the panic message
//!
//! Error and stopped completions of `src` pass through unchanged.
//!
//! # Algebraic Laws
//!
//! - Identity: `then(s, |v| v) ≃ s` (up to the added error signature)
//! - Composition: `then(then(s, f), g) ≃ then(s, |v| g(f(v)))`
//! - Error transparency: `then(just_error(e), f) ≃ just_error(e)`

use crate::env::{Env, EnvShape};
use crate::error::{catch_panic, Error};
use crate::protocol::{OperationState, Receiver, Sender};
use crate::types::{Channel, Signatures};

/// Sender returned by [`then`].
#[must_use = "senders do nothing unless connected and started"]
pub struct Then<S, F> {
    source: S,
    f: F,
}

/// Transforms `source`'s value with `f`.
pub fn then<S, F, U>(source: S, f: F) -> Then<S, F>
where
    S: Sender,
    F: FnOnce(S::Value) -> U + Send + 'static,
    U: Send + 'static,
{
    Then { source, f }
}

impl<S, F, U> Sender for Then<S, F>
where
    S: Sender,
    F: FnOnce(S::Value) -> U + Send + 'static,
    U: Send + 'static,
{
    type Value = U;

    fn signatures(env: Option<EnvShape>) -> Signatures {
        S::signatures(env).map(|sigs| {
            if sigs.sends(Channel::Value) {
                sigs.map_values::<U>().with_error()
            } else {
                sigs
            }
        })
    }

    fn connect<R>(self, receiver: R) -> impl OperationState
    where
        R: Receiver<U>,
    {
        self.source.connect(ThenReceiver {
            inner: receiver,
            f: self.f,
        })
    }
}

struct ThenReceiver<R, F> {
    inner: R,
    f: F,
}

impl<V, U, R, F> Receiver<V> for ThenReceiver<R, F>
where
    F: FnOnce(V) -> U + Send + 'static,
    R: Receiver<U>,
{
    fn set_value(self, value: V) {
        let Self { inner, f } = self;
        match catch_panic(move || f(value)) {
            Ok(out) => inner.set_value(out),
            Err(error) => inner.set_error(error),
        }
    }

    fn set_error(self, error: Error) {
        self.inner.set_error(error);
    }

    fn set_stopped(self) {
        self.inner.set_stopped();
    }

    fn env(&self) -> Env {
        self.inner.env()
    }
}
