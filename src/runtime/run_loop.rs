//! A manually driven FIFO execution context.
//!
//! [`RunLoop`] owns a queue of scheduled tasks. Whatever thread calls
//! [`RunLoop::run`] executes them one at a time in enqueue order, blocking
//! while the queue is empty, until [`RunLoop::finish`] has been called and the
//! queue is drained. Any thread may schedule work through a
//! [`RunLoopScheduler`].
//!
//! A scheduled task completes its receiver with `stopped` if that receiver's
//! stop token has been triggered by the time the task runs, and with
//! `value(())` otherwise.

use super::config::RunLoopConfig;
use crate::env::EnvShape;
use crate::protocol::{OperationState, Receiver, Scheduler, Sender};
use crate::tracing_compat::{debug, debug_span, trace, warn};
use crate::types::{CompletionSignatures, Signatures};
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

trait Task: Send {
    fn execute(self: Box<Self>);
}

struct QueueState {
    tasks: VecDeque<Box<dyn Task>>,
    finishing: bool,
}

struct LoopShared {
    queue: Mutex<QueueState>,
    ready: Condvar,
    executed: AtomicU64,
    config: RunLoopConfig,
}

impl LoopShared {
    fn push(&self, task: Box<dyn Task>) {
        let pending = {
            let mut queue = self.queue.lock();
            queue.tasks.push_back(task);
            queue.tasks.len()
        };
        if self.config.trace_tasks {
            trace!(run_loop = %self.config.name, pending, "task scheduled");
        }
        self.ready.notify_one();
    }

    fn pop(&self) -> Option<Box<dyn Task>> {
        let mut queue = self.queue.lock();
        loop {
            if let Some(task) = queue.tasks.pop_front() {
                return Some(task);
            }
            if queue.finishing {
                return None;
            }
            self.ready.wait(&mut queue);
        }
    }

    fn finish(&self) {
        let newly = {
            let mut queue = self.queue.lock();
            !std::mem::replace(&mut queue.finishing, true)
        };
        if newly {
            debug!(run_loop = %self.config.name, "run loop finishing");
        }
        self.ready.notify_all();
    }

    fn pending(&self) -> usize {
        self.queue.lock().tasks.len()
    }
}

/// A FIFO execution context driven by [`run`](Self::run).
pub struct RunLoop {
    shared: Arc<LoopShared>,
}

impl RunLoop {
    /// Creates a loop with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(RunLoopConfig::default())
    }

    /// Creates a loop with `config`.
    #[must_use]
    pub fn with_config(config: RunLoopConfig) -> Self {
        let queue = QueueState {
            tasks: VecDeque::with_capacity(config.queue_capacity),
            finishing: false,
        };
        Self {
            shared: Arc::new(LoopShared {
                queue: Mutex::new(queue),
                ready: Condvar::new(),
                executed: AtomicU64::new(0),
                config,
            }),
        }
    }

    /// Returns a scheduler that enqueues onto this loop.
    #[must_use]
    pub fn scheduler(&self) -> RunLoopScheduler {
        RunLoopScheduler {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Executes tasks until the loop is finishing and its queue is empty.
    pub fn run(&self) {
        let _span = debug_span!("run_loop", name = %self.shared.config.name).entered();
        while let Some(task) = self.shared.pop() {
            task.execute();
            self.shared.executed.fetch_add(1, Ordering::Relaxed);
        }
        debug!(
            run_loop = %self.shared.config.name,
            executed = self.executed(),
            "run loop drained"
        );
    }

    /// Asks [`run`](Self::run) to return once the queue is empty.
    ///
    /// Tasks scheduled after `finish` are still executed if `run` has not
    /// yet observed an empty queue.
    pub fn finish(&self) {
        self.shared.finish();
    }

    /// Number of tasks waiting to execute.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.shared.pending()
    }

    /// Number of tasks executed so far.
    #[must_use]
    pub fn executed(&self) -> u64 {
        self.shared.executed.load(Ordering::Relaxed)
    }

    /// Returns the loop's configuration.
    #[must_use]
    pub fn config(&self) -> &RunLoopConfig {
        &self.shared.config
    }
}

impl Default for RunLoop {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for RunLoop {
    fn drop(&mut self) {
        let pending = self.pending();
        if pending > 0 {
            warn!(
                run_loop = %self.shared.config.name,
                pending,
                "run loop dropped with pending tasks; their receivers will never complete"
            );
        }
    }
}

impl fmt::Debug for RunLoop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunLoop")
            .field("name", &self.shared.config.name)
            .field("pending", &self.pending())
            .field("executed", &self.executed())
            .finish()
    }
}

/// Schedules work onto a [`RunLoop`].
#[derive(Clone)]
pub struct RunLoopScheduler {
    shared: Arc<LoopShared>,
}

impl RunLoopScheduler {
    /// Finishes the underlying loop.
    pub(crate) fn finish_loop(&self) {
        self.shared.finish();
    }
}

impl Scheduler for RunLoopScheduler {
    type Sender = RunLoopSchedule;

    fn schedule(&self) -> RunLoopSchedule {
        RunLoopSchedule {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl PartialEq for RunLoopScheduler {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }
}

impl Eq for RunLoopScheduler {}

impl fmt::Debug for RunLoopScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RunLoopScheduler")
            .field(&self.shared.config.name)
            .finish()
    }
}

/// Sender returned by [`RunLoopScheduler::schedule`].
pub struct RunLoopSchedule {
    shared: Arc<LoopShared>,
}

impl Sender for RunLoopSchedule {
    type Value = ();

    fn signatures(_env: Option<EnvShape>) -> Signatures {
        CompletionSignatures::value::<()>().with_stopped().into()
    }

    fn connect<R>(self, receiver: R) -> impl OperationState
    where
        R: Receiver<()>,
    {
        ScheduleOperation {
            shared: self.shared,
            receiver,
        }
    }
}

struct ScheduleOperation<R> {
    shared: Arc<LoopShared>,
    receiver: R,
}

impl<R: Receiver<()>> OperationState for ScheduleOperation<R> {
    fn start(self) {
        let trace_tasks = self.shared.config.trace_tasks;
        self.shared.push(Box::new(ScheduledTask {
            receiver: self.receiver,
            trace_tasks,
        }));
    }
}

struct ScheduledTask<R> {
    receiver: R,
    trace_tasks: bool,
}

impl<R: Receiver<()>> Task for ScheduledTask<R> {
    fn execute(self: Box<Self>) {
        let Self {
            receiver,
            trace_tasks,
        } = *self;
        if receiver.env().stop_token().stop_requested() {
            if trace_tasks {
                trace!("scheduled task stopped before running");
            }
            receiver.set_stopped();
        } else {
            if trace_tasks {
                trace!("scheduled task running");
            }
            receiver.set_value(());
        }
    }
}
