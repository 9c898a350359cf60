//! Moving a completion onto another scheduler.
//!
//! # Semantics
//!
//! `transfer(src, sch)` (equivalently `schedule_from(sch, src)`):
//! 1. Run `src` wherever it naturally runs
//! 2. Capture its completion
//! 3. Schedule a trampoline on `sch`
//! 4. When the trampoline runs, replay the captured completion downstream
//!
//! If the trampoline itself completes with error or stopped (the scheduler
//! refused the work), that completion is delivered instead and the captured
//! one is dropped.

use crate::env::{Env, EnvShape};
use crate::error::Error;
use crate::protocol::{OperationState, Receiver, Scheduler, Sender};
use crate::tracing_compat::trace;
use crate::types::{Channel, Completion, Signatures};

/// Sender returned by [`transfer`] and [`schedule_from`].
#[must_use = "senders do nothing unless connected and started"]
pub struct Transfer<S, Sch> {
    source: S,
    scheduler: Sch,
}

/// Runs `source`, then delivers its completion on `scheduler`.
pub fn transfer<S: Sender, Sch: Scheduler>(source: S, scheduler: Sch) -> Transfer<S, Sch> {
    Transfer { source, scheduler }
}

/// Same as [`transfer`] with the scheduler first.
pub fn schedule_from<Sch: Scheduler, S: Sender>(scheduler: Sch, source: S) -> Transfer<S, Sch> {
    Transfer { source, scheduler }
}

/// The non-value completions a hop onto `Sch` may add.
pub(crate) fn hop_signatures<Sch: Scheduler>(env: Option<EnvShape>) -> Signatures {
    <Sch::Sender as Sender>::signatures(env).map(|sigs| sigs.without(Channel::Value))
}

impl<S: Sender, Sch: Scheduler> Sender for Transfer<S, Sch> {
    type Value = S::Value;

    fn signatures(env: Option<EnvShape>) -> Signatures {
        S::signatures(env).union(hop_signatures::<Sch>(env))
    }

    fn connect<R>(self, receiver: R) -> impl OperationState
    where
        R: Receiver<S::Value>,
    {
        self.source.connect(TransferReceiver {
            scheduler: self.scheduler,
            inner: receiver,
        })
    }
}

struct TransferReceiver<Sch, R> {
    scheduler: Sch,
    inner: R,
}

impl<Sch: Scheduler, R> TransferReceiver<Sch, R> {
    fn replay<V>(self, completion: Completion<V>)
    where
        V: Send + 'static,
        R: Receiver<V>,
    {
        trace!(channel = %completion.channel(), "transferring completion");
        replay_on(&self.scheduler, completion, self.inner);
    }
}

impl<V, Sch, R> Receiver<V> for TransferReceiver<Sch, R>
where
    V: Send + 'static,
    Sch: Scheduler,
    R: Receiver<V>,
{
    fn set_value(self, value: V) {
        self.replay(Completion::Value(value));
    }

    fn set_error(self, error: Error) {
        self.replay(Completion::Error(error));
    }

    fn set_stopped(self) {
        self.replay(Completion::Stopped);
    }

    fn env(&self) -> Env {
        self.inner.env()
    }
}

/// Schedules `completion` for delivery to `receiver` on `scheduler`.
pub(crate) fn replay_on<Sch, V, R>(scheduler: &Sch, completion: Completion<V>, receiver: R)
where
    Sch: Scheduler,
    V: Send + 'static,
    R: Receiver<V>,
{
    scheduler
        .schedule()
        .connect(ReplayReceiver {
            completion,
            inner: receiver,
        })
        .start();
}

/// Trampoline receiver: replays a captured completion once scheduled.
pub(crate) struct ReplayReceiver<V, R> {
    completion: Completion<V>,
    inner: R,
}

impl<V: Send + 'static, R: Receiver<V>> Receiver<()> for ReplayReceiver<V, R> {
    fn set_value(self, (): ()) {
        self.completion.deliver(self.inner);
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
