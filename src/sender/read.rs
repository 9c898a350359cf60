//! Environment queries as senders.
//!
//! `read::<Q>()` completes with the facility `Q` names, looked up in the
//! environment of the receiver it is connected to. When the environment does
//! not provide it the sender completes with an
//! [`ErrorKind::MissingFacility`](crate::error::ErrorKind::MissingFacility)
//! error.
//!
//! Whether that error can happen depends on the environment, so without one
//! the signature set is `Dependent` (except for queries every environment
//! answers, such as the stop token).
//!
//! `read_with_default::<Q>(d)` completes with `d` instead of failing, so it
//! only ever sends a value.

use crate::env::{EnvShape, GetScheduler, GetStopToken, Query};
use crate::error::Error;
use crate::protocol::{OperationState, Receiver, Sender};
use crate::types::{CompletionSignatures, Signatures};
use std::marker::PhantomData;

/// Sender returned by [`read`].
pub struct Read<Q> {
    _query: PhantomData<fn() -> Q>,
}

/// Completes with the facility `Q` from the receiver's environment.
#[must_use = "senders do nothing unless connected and started"]
pub fn read<Q: Query>() -> Read<Q> {
    Read {
        _query: PhantomData,
    }
}

/// Completes with the scheduler the operation runs on.
#[must_use = "senders do nothing unless connected and started"]
pub fn read_scheduler() -> Read<GetScheduler> {
    read()
}

/// Completes with the operation's stop token.
#[must_use = "senders do nothing unless connected and started"]
pub fn read_stop_token() -> Read<GetStopToken> {
    read()
}

impl<Q: Query> Sender for Read<Q> {
    type Value = Q::Output;

    fn signatures(env: Option<EnvShape>) -> Signatures {
        match env {
            _ if Q::ALWAYS_PROVIDED => CompletionSignatures::value::<Q::Output>().into(),
            None => Signatures::Dependent,
            Some(shape) if Q::provided_by(shape) => {
                CompletionSignatures::value::<Q::Output>().into()
            }
            Some(_) => CompletionSignatures::error().into(),
        }
    }

    fn connect<R>(self, receiver: R) -> impl OperationState
    where
        R: Receiver<Q::Output>,
    {
        ReadOperation::<Q, R> {
            receiver,
            _query: PhantomData,
        }
    }
}

struct ReadOperation<Q, R> {
    receiver: R,
    _query: PhantomData<fn() -> Q>,
}

impl<Q: Query, R: Receiver<Q::Output>> OperationState for ReadOperation<Q, R> {
    fn start(self) {
        let env = self.receiver.env();
        match env.get::<Q>() {
            Some(facility) => self.receiver.set_value(facility),
            None => self.receiver.set_error(Error::missing_facility(Q::NAME)),
        }
    }
}

/// Sender returned by [`read_with_default`].
pub struct ReadWithDefault<Q: Query> {
    default: Q::Output,
    _query: PhantomData<fn() -> Q>,
}

/// Completes with the facility `Q`, or with `default` when the receiver's
/// environment does not provide it.
#[must_use = "senders do nothing unless connected and started"]
pub fn read_with_default<Q: Query>(default: Q::Output) -> ReadWithDefault<Q> {
    ReadWithDefault {
        default,
        _query: PhantomData,
    }
}

impl<Q: Query> Sender for ReadWithDefault<Q> {
    type Value = Q::Output;

    fn signatures(_env: Option<EnvShape>) -> Signatures {
        CompletionSignatures::value::<Q::Output>().into()
    }

    fn connect<R>(self, receiver: R) -> impl OperationState
    where
        R: Receiver<Q::Output>,
    {
        ReadWithDefaultOperation::<Q, R> {
            default: self.default,
            receiver,
            _query: PhantomData,
        }
    }
}

struct ReadWithDefaultOperation<Q: Query, R> {
    default: Q::Output,
    receiver: R,
    _query: PhantomData<fn() -> Q>,
}

impl<Q: Query, R: Receiver<Q::Output>> OperationState for ReadWithDefaultOperation<Q, R> {
    fn start(self) {
        let facility = self.receiver.env().get::<Q>().unwrap_or(self.default);
        self.receiver.set_value(facility);
    }
}
