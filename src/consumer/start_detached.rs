//! Fire-and-forget execution.
//!
//! `start_detached(s)` connects `s` to a receiver that discards its value
//! and starts it. Errors are logged at `warn`, stops at `debug`. The work
//! keeps running after the call returns; nothing can wait for it or cancel
//! it.
//!
//! `execute(sch, f)` is the detached form of `then(sch.schedule(), f)`: it
//! runs `f` on `sch`. A panic in `f` is logged like any other error.

use crate::combinator::then;
use crate::error::Error;
use crate::protocol::{OperationState, Receiver, Scheduler, Sender};
use crate::tracing_compat::{debug, trace, warn};
use std::any::type_name;
use std::marker::PhantomData;

/// Starts `sender` without waiting for its completion.
pub fn start_detached<S: Sender>(sender: S) {
    trace!(sender = type_name::<S>(), "starting detached");
    sender
        .connect(DetachedReceiver {
            sender: type_name::<S>(),
            _value: PhantomData,
        })
        .start();
}

/// Runs `f` on `scheduler` without waiting for it.
pub fn execute<Sch, F>(scheduler: &Sch, f: F)
where
    Sch: Scheduler,
    F: FnOnce() + Send + 'static,
{
    start_detached(then(scheduler.schedule(), move |()| f()));
}

struct DetachedReceiver<V> {
    sender: &'static str,
    _value: PhantomData<fn(V)>,
}

impl<V: Send + 'static> Receiver<V> for DetachedReceiver<V> {
    fn set_value(self, _value: V) {
        trace!(sender = self.sender, "detached work completed");
    }

    fn set_error(self, error: Error) {
        warn!(sender = self.sender, error = %error, "detached work failed");
    }

    fn set_stopped(self) {
        debug!(sender = self.sender, "detached work stopped");
    }
}
