//! Running a sender on a given scheduler.
//!
//! # Semantics
//!
//! `on(sch, src)`:
//! 1. Remember the scheduler in the receiver's environment, if there is one
//! 2. Hop onto `sch` and start `src` there, with `sch` as its current scheduler
//! 3. Hop back to the remembered scheduler and complete downstream there
//!
//! Without a scheduler in the environment there is nowhere to return to: the
//! completion is delivered inline on `sch`.
//!
//! `complete_on(src, sch)` does not move any work. It makes `sch` the current
//! scheduler in `src`'s environment, so that `src` and anything it reads from
//! the environment run against `sch`.

use super::transfer::{hop_signatures, replay_on};
use crate::env::{Env, EnvShape};
use crate::error::Error;
use crate::protocol::{AnySchedule, AnyScheduler, OperationState, Receiver, Scheduler, Sender};
use crate::tracing_compat::trace;
use crate::types::{Channel, Completion, CompletionSignatures, Signatures};

/// Sender returned by [`on`].
#[must_use = "senders do nothing unless connected and started"]
pub struct On<Sch, S> {
    scheduler: Sch,
    source: S,
}

/// Starts `source` on `scheduler` and completes back where it was started.
pub fn on<Sch: Scheduler, S: Sender>(scheduler: Sch, source: S) -> On<Sch, S> {
    On { scheduler, source }
}

impl<Sch: Scheduler, S: Sender> Sender for On<Sch, S> {
    type Value = S::Value;

    fn signatures(env: Option<EnvShape>) -> Signatures {
        let Some(shape) = env else {
            return Signatures::Dependent;
        };
        let back = if shape.provides_scheduler() {
            <AnySchedule as Sender>::signatures(Some(shape)).map(|sigs| sigs.without(Channel::Value))
        } else {
            CompletionSignatures::new().into()
        };
        hop_signatures::<Sch>(Some(shape))
            .union(S::signatures(Some(shape.with_scheduler())))
            .union(back)
    }

    fn connect<R>(self, receiver: R) -> impl OperationState
    where
        R: Receiver<S::Value>,
    {
        OnOperation {
            scheduler: self.scheduler,
            source: self.source,
            receiver,
        }
    }
}

struct OnOperation<Sch, S, R> {
    scheduler: Sch,
    source: S,
    receiver: R,
}

impl<Sch, S, R> OperationState for OnOperation<Sch, S, R>
where
    Sch: Scheduler,
    S: Sender,
    R: Receiver<S::Value>,
{
    fn start(self) {
        let origin = self.receiver.env().scheduler().cloned();
        trace!(returns = origin.is_some(), "hopping onto target scheduler");
        self.scheduler
            .schedule()
            .connect(OnHopReceiver {
                source: self.source,
                scheduler: self.scheduler.clone(),
                origin,
                inner: self.receiver,
            })
            .start();
    }
}

struct OnHopReceiver<S, Sch, R> {
    source: S,
    scheduler: Sch,
    origin: Option<AnyScheduler>,
    inner: R,
}

impl<S, Sch, R> Receiver<()> for OnHopReceiver<S, Sch, R>
where
    S: Sender,
    Sch: Scheduler,
    R: Receiver<S::Value>,
{
    fn set_value(self, (): ()) {
        let env = self.inner.env().with_scheduler(self.scheduler);
        self.source
            .connect(OnReturnReceiver {
                env,
                origin: self.origin,
                inner: self.inner,
            })
            .start();
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

struct OnReturnReceiver<R> {
    env: Env,
    origin: Option<AnyScheduler>,
    inner: R,
}

impl<R> OnReturnReceiver<R> {
    fn finish<V>(self, completion: Completion<V>)
    where
        V: Send + 'static,
        R: Receiver<V>,
    {
        match self.origin {
            Some(origin) => replay_on(&origin, completion, self.inner),
            None => completion.deliver(self.inner),
        }
    }
}

impl<V, R> Receiver<V> for OnReturnReceiver<R>
where
    V: Send + 'static,
    R: Receiver<V>,
{
    fn set_value(self, value: V) {
        self.finish(Completion::Value(value));
    }

    fn set_error(self, error: Error) {
        self.finish(Completion::Error(error));
    }

    fn set_stopped(self) {
        self.finish(Completion::Stopped);
    }

    fn env(&self) -> Env {
        self.env.clone()
    }
}

/// Sender returned by [`complete_on`].
#[must_use = "senders do nothing unless connected and started"]
pub struct CompleteOn<S, Sch> {
    source: S,
    scheduler: Sch,
}

/// Makes `scheduler` the current scheduler of `source`'s environment.
pub fn complete_on<S: Sender, Sch: Scheduler>(source: S, scheduler: Sch) -> CompleteOn<S, Sch> {
    CompleteOn { source, scheduler }
}

impl<S: Sender, Sch: Scheduler> Sender for CompleteOn<S, Sch> {
    type Value = S::Value;

    fn signatures(env: Option<EnvShape>) -> Signatures {
        S::signatures(Some(env.unwrap_or_default().with_scheduler()))
    }

    fn connect<R>(self, receiver: R) -> impl OperationState
    where
        R: Receiver<S::Value>,
    {
        let scheduler = self.scheduler.into_any();
        self.source.connect(CompleteOnReceiver { scheduler, inner: receiver })
    }
}

struct CompleteOnReceiver<R> {
    scheduler: AnyScheduler,
    inner: R,
}

impl<V, R: Receiver<V>> Receiver<V> for CompleteOnReceiver<R> {
    fn set_value(self, value: V) {
        self.inner.set_value(value);
    }

    fn set_error(self, error: Error) {
        self.inner.set_error(error);
    }

    fn set_stopped(self) {
        self.inner.set_stopped();
    }

    fn env(&self) -> Env {
        self.inner.env().with_scheduler(self.scheduler.clone())
    }
}
