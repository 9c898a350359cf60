//! Continuation combinators: choose the next sender from a completion.
//!
//! # Semantics
//!
//! `let_value(src, f)`:
//! 1. On `value(v)` from `src`, call `f(v)` to obtain a new sender
//! 2. Connect that sender to the downstream receiver and start it
//! 3. If `f` panics, complete with `error`
//!
//! `let_error` and `let_stopped` do the same on their channel; the sender
//! they produce must have the source's value type so the value channels of
//! both paths agree. Completions on the other channels pass through.
//!
//! The payload and the nested operation are owned by the continuation call
//! itself, so at most one of them exists at a time and nothing is stored in
//! the outer operation.

use crate::env::{Env, EnvShape};
use crate::error::{catch_panic, Error};
use crate::protocol::{OperationState, Receiver, Sender};
use crate::types::{Channel, CompletionSignatures, Signatures};

/// Sender returned by [`let_value`].
#[must_use = "senders do nothing unless connected and started"]
pub struct LetValue<S, F> {
    source: S,
    f: F,
}

/// Sender returned by [`let_error`].
#[must_use = "senders do nothing unless connected and started"]
pub struct LetError<S, F> {
    source: S,
    f: F,
}

/// Sender returned by [`let_stopped`].
#[must_use = "senders do nothing unless connected and started"]
pub struct LetStopped<S, F> {
    source: S,
    f: F,
}

/// Continues `source`'s value with the sender returned by `f`.
pub fn let_value<S, F, S2>(source: S, f: F) -> LetValue<S, F>
where
    S: Sender,
    F: FnOnce(S::Value) -> S2 + Send + 'static,
    S2: Sender,
{
    LetValue { source, f }
}

/// Continues `source`'s error with the sender returned by `f`.
pub fn let_error<S, F, S2>(source: S, f: F) -> LetError<S, F>
where
    S: Sender,
    F: FnOnce(Error) -> S2 + Send + 'static,
    S2: Sender<Value = S::Value>,
{
    LetError { source, f }
}

/// Continues `source`'s cancellation with the sender returned by `f`.
pub fn let_stopped<S, F, S2>(source: S, f: F) -> LetStopped<S, F>
where
    S: Sender,
    F: FnOnce() -> S2 + Send + 'static,
    S2: Sender<Value = S::Value>,
{
    LetStopped { source, f }
}

/// Replaces `channel` in `source` by the continuation's signatures plus error.
fn continue_on<S2: Sender>(
    source: CompletionSignatures,
    channel: Channel,
    env: Option<EnvShape>,
) -> Signatures {
    if !source.sends(channel) {
        return source.into();
    }
    S2::signatures(env).map(|next| source.without(channel).union(&next).with_error())
}

impl<S, F, S2> Sender for LetValue<S, F>
where
    S: Sender,
    F: FnOnce(S::Value) -> S2 + Send + 'static,
    S2: Sender,
{
    type Value = S2::Value;

    fn signatures(env: Option<EnvShape>) -> Signatures {
        S::signatures(env).and_then(|sigs| continue_on::<S2>(sigs, Channel::Value, env))
    }

    fn connect<R>(self, receiver: R) -> impl OperationState
    where
        R: Receiver<S2::Value>,
    {
        self.source.connect(LetValueReceiver {
            inner: receiver,
            f: self.f,
        })
    }
}

impl<S, F, S2> Sender for LetError<S, F>
where
    S: Sender,
    F: FnOnce(Error) -> S2 + Send + 'static,
    S2: Sender<Value = S::Value>,
{
    type Value = S::Value;

    fn signatures(env: Option<EnvShape>) -> Signatures {
        S::signatures(env).and_then(|sigs| continue_on::<S2>(sigs, Channel::Error, env))
    }

    fn connect<R>(self, receiver: R) -> impl OperationState
    where
        R: Receiver<S::Value>,
    {
        self.source.connect(LetErrorReceiver {
            inner: receiver,
            f: self.f,
        })
    }
}

impl<S, F, S2> Sender for LetStopped<S, F>
where
    S: Sender,
    F: FnOnce() -> S2 + Send + 'static,
    S2: Sender<Value = S::Value>,
{
    type Value = S::Value;

    fn signatures(env: Option<EnvShape>) -> Signatures {
        S::signatures(env).and_then(|sigs| continue_on::<S2>(sigs, Channel::Stopped, env))
    }

    fn connect<R>(self, receiver: R) -> impl OperationState
    where
        R: Receiver<S::Value>,
    {
        self.source.connect(LetStoppedReceiver {
            inner: receiver,
            f: self.f,
        })
    }
}

fn continue_with<S2, R>(next: crate::error::Result<S2>, receiver: R)
where
    S2: Sender,
    R: Receiver<S2::Value>,
{
    match next {
        Ok(sender) => sender.connect(receiver).start(),
        Err(error) => receiver.set_error(error),
    }
}

struct LetValueReceiver<R, F> {
    inner: R,
    f: F,
}

impl<V, S2, R, F> Receiver<V> for LetValueReceiver<R, F>
where
    F: FnOnce(V) -> S2 + Send + 'static,
    S2: Sender,
    R: Receiver<S2::Value>,
{
    fn set_value(self, value: V) {
        let Self { inner, f } = self;
        continue_with(catch_panic(move || f(value)), inner);
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

struct LetErrorReceiver<R, F> {
    inner: R,
    f: F,
}

impl<V, S2, R, F> Receiver<V> for LetErrorReceiver<R, F>
where
    F: FnOnce(Error) -> S2 + Send + 'static,
    S2: Sender<Value = V>,
    R: Receiver<V>,
{
    fn set_value(self, value: V) {
        self.inner.set_value(value);
    }

    fn set_error(self, error: Error) {
        let Self { inner, f } = self;
        continue_with(catch_panic(move || f(error)), inner);
    }

    fn set_stopped(self) {
        self.inner.set_stopped();
    }

    fn env(&self) -> Env {
        self.inner.env()
    }
}

struct LetStoppedReceiver<R, F> {
    inner: R,
    f: F,
}

impl<V, S2, R, F> Receiver<V> for LetStoppedReceiver<R, F>
where
    F: FnOnce() -> S2 + Send + 'static,
    S2: Sender<Value = V>,
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
        continue_with(catch_panic(f), inner);
    }

    fn env(&self) -> Env {
        self.inner.env()
    }
}
