//! The completion protocol: senders, receivers, operation states, schedulers.
//!
//! A [`Sender`] describes work without running it. Connecting it to a
//! [`Receiver`] yields an [`OperationState`]; starting that state runs the
//! work, which eventually calls exactly one of the receiver's completion
//! methods.
//!
//! # Contract
//!
//! - `start` is called at most once: it consumes the operation state.
//! - Each receiver is completed at most once: every completion method
//!   consumes the receiver.
//! - Each started operation completes its receiver at least once. This half
//!   cannot be expressed in types; the crate's tests check it for every
//!   combinator.
//! - The receiver may be completed on any thread, including the one calling
//!   `start`.

mod scheduler;

pub use scheduler::{AnySchedule, AnyScheduler, Scheduler};

use crate::env::{Env, EnvShape};
use crate::error::Error;
use crate::types::Signatures;

/// A connected, not yet started operation.
pub trait OperationState {
    /// Runs the operation.
    fn start(self);
}

/// The sink for one completion of type `V`.
pub trait Receiver<V>: Send + 'static {
    /// Completes successfully.
    fn set_value(self, value: V);

    /// Completes with an error.
    fn set_error(self, error: Error);

    /// Completes because the work was cancelled.
    fn set_stopped(self);

    /// Returns the environment operations connected to this receiver see.
    fn env(&self) -> Env {
        Env::new()
    }
}

/// A description of asynchronous work producing a `Value`.
pub trait Sender: Send + Sized + 'static {
    /// The payload of the value channel.
    type Value: Send + 'static;

    /// The ways this sender type may complete in an environment of the given
    /// shape, or in any environment when `env` is `None`.
    fn signatures(env: Option<EnvShape>) -> Signatures;

    /// Binds this sender to `receiver`.
    fn connect<R>(self, receiver: R) -> impl OperationState
    where
        R: Receiver<Self::Value>;
}

/// Connects `sender` to `receiver` and starts the resulting operation.
pub fn connect_and_start<S, R>(sender: S, receiver: R)
where
    S: Sender,
    R: Receiver<S::Value>,
{
    sender.connect(receiver).start();
}
