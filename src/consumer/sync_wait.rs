//! Blocking until a sender completes.
//!
//! `sync_wait(s)` connects `s` to a receiver whose environment offers the
//! scheduler of a private run loop, starts it, and drives that loop on the
//! calling thread until the receiver has been completed:
//!
//! - `value(v)` returns `Ok(Some(v))`
//! - `stopped` returns `Ok(None)`
//! - `error(e)` returns `Err(e)`
//!
//! Work scheduled onto the loop (for example by `read_scheduler` followed by
//! `transfer`) runs on the calling thread. The call never returns if the
//! sender neither completes nor drops its receiver.

use crate::env::Env;
#[cfg(debug_assertions)]
use crate::env::EnvShape;
use crate::error::{Error, ErrorKind, Result};
use crate::protocol::{OperationState, Receiver, Sender};
use crate::runtime::{RunLoop, RunLoopConfig, RunLoopScheduler};
use crate::tracing_compat::{debug, debug_span};
#[cfg(debug_assertions)]
use crate::types::resolve_signatures;
use crate::types::Completion;
use parking_lot::Mutex;
use std::sync::Arc;

const SYNC_WAIT_LOOP_NAME: &str = "sync_wait";

/// Runs `sender` to completion on the calling thread.
#[allow(clippy::result_large_err)]
pub fn sync_wait<S: Sender>(sender: S) -> Result<Option<S::Value>> {
    sync_wait_with_config(sender, RunLoopConfig::default().name(SYNC_WAIT_LOOP_NAME))
}

/// Like [`sync_wait`], driving a loop built from `config`.
#[allow(clippy::result_large_err)]
pub fn sync_wait_with_config<S: Sender>(sender: S, config: RunLoopConfig) -> Result<Option<S::Value>> {
    #[cfg(debug_assertions)]
    let _ = resolve_signatures::<S>(EnvShape::new().with_scheduler());

    let run_loop = RunLoop::with_config(config);
    let _span = debug_span!("sync_wait", run_loop = %run_loop.config().name).entered();
    let slot = Arc::new(Mutex::new(None));
    sender
        .connect(SyncWaitReceiver {
            slot: Arc::clone(&slot),
            scheduler: run_loop.scheduler(),
        })
        .start();
    run_loop.run();

    let completion = slot.lock().take();
    match completion {
        Some(completion) => {
            debug!(channel = %completion.channel(), "sync_wait completed");
            completion.into_result()
        }
        None => Err(Error::new(ErrorKind::AbandonedReceiver)
            .with_message("sender dropped its receiver without completing it")),
    }
}

struct SyncWaitReceiver<V> {
    slot: Arc<Mutex<Option<Completion<V>>>>,
    scheduler: RunLoopScheduler,
}

impl<V> SyncWaitReceiver<V> {
    fn store(&self, completion: Completion<V>) {
        *self.slot.lock() = Some(completion);
    }
}

impl<V: Send + 'static> Receiver<V> for SyncWaitReceiver<V> {
    fn set_value(self, value: V) {
        self.store(Completion::Value(value));
    }

    fn set_error(self, error: Error) {
        self.store(Completion::Error(error));
    }

    fn set_stopped(self) {
        self.store(Completion::Stopped);
    }

    fn env(&self) -> Env {
        Env::new().with_scheduler(self.scheduler.clone())
    }
}

impl<V> Drop for SyncWaitReceiver<V> {
    fn drop(&mut self) {
        self.scheduler.finish_loop();
    }
}
