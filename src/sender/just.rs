//! Senders that complete immediately with a fixed completion.
//!
//! `just_error` and `just_stopped` never produce a value, but like every
//! sender they still name a value type. It is usually inferred from the
//! surrounding pipeline; annotate it (`just_error::<i32>(e)`) otherwise.

use crate::env::EnvShape;
use crate::error::Error;
use crate::protocol::{OperationState, Receiver, Sender};
use crate::types::{Completion, CompletionSignatures, Signatures};
use std::marker::PhantomData;

/// Completes with `value` when started.
#[must_use = "senders do nothing unless connected and started"]
pub fn just<V: Send + 'static>(value: V) -> Just<V> {
    Just { value }
}

/// Completes with `error` when started.
#[must_use = "senders do nothing unless connected and started"]
pub fn just_error<V: Send + 'static>(error: Error) -> JustError<V> {
    JustError {
        error,
        _value: PhantomData,
    }
}

/// Completes with `stopped` when started.
#[must_use = "senders do nothing unless connected and started"]
pub fn just_stopped<V: Send + 'static>() -> JustStopped<V> {
    JustStopped {
        _value: PhantomData,
    }
}

/// Sender returned by [`just`].
#[derive(Debug, Clone)]
pub struct Just<V> {
    value: V,
}

/// Sender returned by [`just_error`].
#[derive(Debug, Clone)]
pub struct JustError<V> {
    error: Error,
    _value: PhantomData<fn() -> V>,
}

/// Sender returned by [`just_stopped`].
#[derive(Debug, Clone, Copy)]
pub struct JustStopped<V> {
    _value: PhantomData<fn() -> V>,
}

impl<V: Send + 'static> Sender for Just<V> {
    type Value = V;

    fn signatures(_env: Option<EnvShape>) -> Signatures {
        CompletionSignatures::value::<V>().into()
    }

    fn connect<R>(self, receiver: R) -> impl OperationState
    where
        R: Receiver<V>,
    {
        Immediate {
            completion: Completion::Value(self.value),
            receiver,
        }
    }
}

impl<V: Send + 'static> Sender for JustError<V> {
    type Value = V;

    fn signatures(_env: Option<EnvShape>) -> Signatures {
        CompletionSignatures::error().into()
    }

    fn connect<R>(self, receiver: R) -> impl OperationState
    where
        R: Receiver<V>,
    {
        Immediate {
            completion: Completion::Error(self.error),
            receiver,
        }
    }
}

impl<V: Send + 'static> Sender for JustStopped<V> {
    type Value = V;

    fn signatures(_env: Option<EnvShape>) -> Signatures {
        CompletionSignatures::stopped().into()
    }

    fn connect<R>(self, receiver: R) -> impl OperationState
    where
        R: Receiver<V>,
    {
        Immediate {
            completion: Completion::Stopped,
            receiver,
        }
    }
}

struct Immediate<V, R> {
    completion: Completion<V>,
    receiver: R,
}

impl<V, R: Receiver<V>> OperationState for Immediate<V, R> {
    fn start(self) {
        self.completion.deliver(self.receiver);
    }
}
