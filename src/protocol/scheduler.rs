//! Schedulers and the type-erased scheduler handle carried by environments.

use super::{OperationState, Receiver, Sender};
use crate::env::{Env, EnvShape};
use crate::error::Error;
use crate::types::{Completion, CompletionSignatures, Signatures};
use std::any::type_name;
use std::fmt;
use std::sync::Arc;

/// A handle that produces senders completing on some execution context.
pub trait Scheduler: Clone + Send + Sync + 'static {
    /// The sender returned by [`schedule`](Self::schedule).
    type Sender: Sender<Value = ()>;

    /// Returns a sender that completes with `()` on this scheduler's context.
    fn schedule(&self) -> Self::Sender;

    /// Erases the scheduler's type.
    fn into_any(self) -> AnyScheduler {
        AnyScheduler::new(self)
    }
}

trait DynScheduler: Send + Sync {
    fn schedule_erased(&self, receiver: ErasedReceiver);
    fn name(&self) -> &'static str;
}

impl<S: Scheduler> DynScheduler for S {
    fn schedule_erased(&self, receiver: ErasedReceiver) {
        self.schedule().connect(receiver).start();
    }

    fn name(&self) -> &'static str {
        type_name::<S>()
    }
}

trait DynReceiver: Send {
    fn complete(self: Box<Self>, completion: Completion<()>);
    fn env(&self) -> Env;
}

impl<R: Receiver<()>> DynReceiver for R {
    fn complete(self: Box<Self>, completion: Completion<()>) {
        completion.deliver(*self);
    }

    fn env(&self) -> Env {
        <R as Receiver<()>>::env(self)
    }
}

struct ErasedReceiver {
    inner: Box<dyn DynReceiver>,
}

impl Receiver<()> for ErasedReceiver {
    fn set_value(self, (): ()) {
        self.inner.complete(Completion::Value(()));
    }

    fn set_error(self, error: Error) {
        self.inner.complete(Completion::Error(error));
    }

    fn set_stopped(self) {
        self.inner.complete(Completion::Stopped);
    }

    fn env(&self) -> Env {
        self.inner.env()
    }
}

/// A scheduler of any type.
///
/// Environments store schedulers in this form so that a single [`Env`] type
/// can describe every execution context.
#[derive(Clone)]
pub struct AnyScheduler {
    inner: Arc<dyn DynScheduler>,
}

impl AnyScheduler {
    /// Erases `scheduler`'s type.
    pub fn new<S: Scheduler>(scheduler: S) -> Self {
        Self {
            inner: Arc::new(scheduler),
        }
    }

    /// Type name of the underlying scheduler.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.inner.name()
    }

    /// Returns true if both handles wrap the same scheduler instance.
    #[must_use]
    pub fn same_as(&self, other: &Self) -> bool {
        Arc::as_ptr(&self.inner).cast::<()>() == Arc::as_ptr(&other.inner).cast::<()>()
    }
}

impl Scheduler for AnyScheduler {
    type Sender = AnySchedule;

    fn schedule(&self) -> AnySchedule {
        AnySchedule {
            scheduler: self.clone(),
        }
    }

    fn into_any(self) -> AnyScheduler {
        self
    }
}

impl fmt::Debug for AnyScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("AnyScheduler").field(&self.name()).finish()
    }
}

/// The schedule sender of an [`AnyScheduler`].
///
/// The concrete scheduler is unknown at the type level, so its signatures
/// are the conservative `{value(()), error, stopped}`.
pub struct AnySchedule {
    scheduler: AnyScheduler,
}

impl Sender for AnySchedule {
    type Value = ();

    fn signatures(_env: Option<EnvShape>) -> Signatures {
        CompletionSignatures::value::<()>()
            .with_error()
            .with_stopped()
            .into()
    }

    fn connect<R>(self, receiver: R) -> impl OperationState
    where
        R: Receiver<()>,
    {
        AnyScheduleOperation {
            scheduler: self.scheduler,
            receiver,
        }
    }
}

struct AnyScheduleOperation<R> {
    scheduler: AnyScheduler,
    receiver: R,
}

impl<R: Receiver<()>> OperationState for AnyScheduleOperation<R> {
    fn start(self) {
        self.scheduler.inner.schedule_erased(ErasedReceiver {
            inner: Box::new(self.receiver),
        });
    }
}
