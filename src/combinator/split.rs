//! Sharing one execution of a sender between many subscribers.
//!
//! # Semantics
//!
//! `split(src)` returns a cloneable sender. All clones share one execution
//! of `src`:
//!
//! 1. The first subscriber to start starts `src`
//! 2. Subscribers that start while `src` runs are queued
//! 3. When `src` completes, its completion is cached and every queued
//!    subscriber receives a clone of it
//! 4. Subscribers that start afterwards receive the cached completion
//!    immediately, without running `src` again
//!
//! `src` sees an environment whose stop token belongs to the shared state.
//! A stop request from any subscriber is forwarded to that token.
//!
//! `ensure_started(src)` starts `src` when it is called and hands the
//! completion to the single receiver it is later connected to. Dropping it
//! unconnected requests stop on the running work.

use crate::cancel::{StopCallback, StopSource};
use crate::env::{Env, EnvShape};
use crate::error::Error;
use crate::protocol::{OperationState, Receiver, Sender};
use crate::tracing_compat::{debug, trace};
use crate::types::{Completion, Signatures};
use crossbeam_queue::SegQueue;
use parking_lot::Mutex;
use std::sync::atomic::{fence, AtomicBool, Ordering};
use std::sync::Arc;

trait SplitWaiter<V>: Send {
    fn notify(self: Box<Self>, completion: Completion<V>);
}

struct SplitShared<S: Sender> {
    source: Mutex<Option<S>>,
    started: AtomicBool,
    completed: AtomicBool,
    result: Mutex<Option<Completion<S::Value>>>,
    waiters: SegQueue<Box<dyn SplitWaiter<S::Value>>>,
    stop_source: StopSource,
}

impl<S> SplitShared<S>
where
    S: Sender,
    S::Value: Clone,
{
    fn new(source: S) -> Arc<Self> {
        Arc::new(Self {
            source: Mutex::new(Some(source)),
            started: AtomicBool::new(false),
            completed: AtomicBool::new(false),
            result: Mutex::new(None),
            waiters: SegQueue::new(),
            stop_source: StopSource::new(),
        })
    }

    fn cached(&self) -> Option<Completion<S::Value>> {
        self.result.lock().clone()
    }

    fn subscribe(self: &Arc<Self>, waiter: Box<dyn SplitWaiter<S::Value>>) {
        self.waiters.push(waiter);
        fence(Ordering::SeqCst);
        if self.completed.load(Ordering::SeqCst) {
            self.drain();
            return;
        }
        self.start_once();
    }

    fn start_once(self: &Arc<Self>) {
        if self.started.swap(true, Ordering::AcqRel) {
            return;
        }
        if self.stop_source.stop_requested() {
            trace!("split stopped before its source started");
            self.complete(Completion::Stopped);
            return;
        }
        let source = self.source.lock().take();
        if let Some(source) = source {
            trace!("split source starting");
            source
                .connect(SplitReceiver {
                    shared: Arc::clone(self),
                })
                .start();
        }
    }

    fn complete(&self, completion: Completion<S::Value>) {
        debug!(
            channel = %completion.channel(),
            waiting = self.waiters.len(),
            "split source completed"
        );
        *self.result.lock() = Some(completion);
        self.completed.store(true, Ordering::SeqCst);
        fence(Ordering::SeqCst);
        self.drain();
    }

    fn drain(&self) {
        let Some(completion) = self.cached() else {
            return;
        };
        while let Some(waiter) = self.waiters.pop() {
            waiter.notify(completion.clone());
        }
    }
}

struct SplitReceiver<S: Sender> {
    shared: Arc<SplitShared<S>>,
}

impl<S> Receiver<S::Value> for SplitReceiver<S>
where
    S: Sender,
    S::Value: Clone,
{
    fn set_value(self, value: S::Value) {
        self.shared.complete(Completion::Value(value));
    }

    fn set_error(self, error: Error) {
        self.shared.complete(Completion::Error(error));
    }

    fn set_stopped(self) {
        self.shared.complete(Completion::Stopped);
    }

    fn env(&self) -> Env {
        Env::new().with_stop_token(self.shared.stop_source.token())
    }
}

struct SplitSubscriber<R> {
    inner: R,
    on_stop: StopCallback,
}

impl<V, R: Receiver<V>> SplitWaiter<V> for SplitSubscriber<R> {
    fn notify(self: Box<Self>, completion: Completion<V>) {
        let Self { inner, on_stop } = *self;
        drop(on_stop);
        completion.deliver(inner);
    }
}

fn shared_signatures<S: Sender>() -> Signatures {
    S::signatures(Some(EnvShape::new())).map(|sigs| sigs.with_error().with_stopped())
}

/// Sender returned by [`split`].
#[must_use = "senders do nothing unless connected and started"]
pub struct Split<S: Sender> {
    shared: Arc<SplitShared<S>>,
}

/// Shares one execution of `source` between every clone of the result.
pub fn split<S>(source: S) -> Split<S>
where
    S: Sender,
    S::Value: Clone,
{
    Split {
        shared: SplitShared::new(source),
    }
}

impl<S: Sender> Clone for Split<S> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<S> Sender for Split<S>
where
    S: Sender,
    S::Value: Clone,
{
    type Value = S::Value;

    fn signatures(_env: Option<EnvShape>) -> Signatures {
        shared_signatures::<S>()
    }

    fn connect<R>(self, receiver: R) -> impl OperationState
    where
        R: Receiver<S::Value>,
    {
        SplitOperation {
            shared: self.shared,
            receiver,
        }
    }
}

struct SplitOperation<S: Sender, R> {
    shared: Arc<SplitShared<S>>,
    receiver: R,
}

impl<S, R> OperationState for SplitOperation<S, R>
where
    S: Sender,
    S::Value: Clone,
    R: Receiver<S::Value>,
{
    fn start(self) {
        let Self { shared, receiver } = self;
        if shared.completed.load(Ordering::Acquire) {
            match shared.cached() {
                Some(completion) => completion.deliver(receiver),
                None => receiver.set_error(Error::internal("split completed without a result")),
            }
            return;
        }
        let stop_source = shared.stop_source.clone();
        let on_stop = StopCallback::register(receiver.env().stop_token(), move || {
            stop_source.request_stop();
        });
        shared.subscribe(Box::new(SplitSubscriber {
            inner: receiver,
            on_stop,
        }));
    }
}

struct DetachOnDrop {
    stop_source: StopSource,
    armed: bool,
}

impl Drop for DetachOnDrop {
    fn drop(&mut self) {
        if self.armed {
            debug!("ensure_started sender dropped unconnected; requesting stop");
            self.stop_source.request_stop();
        }
    }
}

/// Sender returned by [`ensure_started`].
#[must_use = "dropping this sender requests stop on the work it started"]
pub struct EnsureStarted<S: Sender> {
    shared: Arc<SplitShared<S>>,
    detach: DetachOnDrop,
}

/// Starts `source` now; the result is delivered to whatever the returned
/// sender is connected to.
pub fn ensure_started<S>(source: S) -> EnsureStarted<S>
where
    S: Sender,
    S::Value: Clone,
{
    let shared = SplitShared::new(source);
    shared.start_once();
    let detach = DetachOnDrop {
        stop_source: shared.stop_source.clone(),
        armed: true,
    };
    EnsureStarted { shared, detach }
}

impl<S> Sender for EnsureStarted<S>
where
    S: Sender,
    S::Value: Clone,
{
    type Value = S::Value;

    fn signatures(_env: Option<EnvShape>) -> Signatures {
        shared_signatures::<S>()
    }

    fn connect<R>(self, receiver: R) -> impl OperationState
    where
        R: Receiver<S::Value>,
    {
        let Self { shared, mut detach } = self;
        detach.armed = false;
        SplitOperation { shared, receiver }
    }
}
