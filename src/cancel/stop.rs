//! Stop sources, tokens and callbacks.
//!
//! # Semantics
//!
//! - `request_stop` succeeds for exactly one caller; later calls return false.
//! - Callbacks registered before the request run exactly once, on the
//!   requesting thread, one at a time and outside the registry lock.
//! - Registering after the request runs the callback immediately.
//! - Dropping a [`StopCallback`] deregisters it. Once the drop returns, the
//!   callback is neither running nor will it start. A drop racing with the
//!   callback on another thread blocks until the callback returns; a drop
//!   from inside the callback itself does not wait.
//!
//! A default [`StopToken`] is the "never" token: it is not linked to any
//! source, can never be triggered and accepts registrations as no-ops.

use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, ThreadId};

type Callback = Box<dyn FnOnce() + Send>;

#[derive(Default)]
struct Registry {
    callbacks: VecDeque<(u64, Callback)>,
    /// The callback `request_stop` is executing, and the thread executing it.
    running: Option<(u64, ThreadId)>,
}

struct StopState {
    requested: AtomicBool,
    registry: Mutex<Registry>,
    finished: Condvar,
    next_id: AtomicU64,
}

impl StopState {
    fn new() -> Self {
        Self {
            requested: AtomicBool::new(false),
            registry: Mutex::new(Registry::default()),
            finished: Condvar::new(),
            next_id: AtomicU64::new(0),
        }
    }

    fn stop_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }

    /// Pops and runs callbacks one at a time until the registry is empty.
    fn run_callbacks(&self) {
        loop {
            let mut registry = self.registry.lock();
            let Some((id, callback)) = registry.callbacks.pop_front() else {
                return;
            };
            registry.running = Some((id, thread::current().id()));
            drop(registry);

            let _running = RunningGuard { state: self };
            callback();
        }
    }
}

/// Clears the running slot and wakes waiting drops, also on unwind.
struct RunningGuard<'a> {
    state: &'a StopState,
}

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.state.registry.lock().running = None;
        self.state.finished.notify_all();
    }
}

/// The owning side of a stop signal.
#[derive(Clone)]
pub struct StopSource {
    state: Arc<StopState>,
}

impl StopSource {
    /// Creates a source in the not-stopped state.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Arc::new(StopState::new()),
        }
    }

    /// Returns a token observing this source.
    #[must_use]
    pub fn token(&self) -> StopToken {
        StopToken {
            state: Some(Arc::clone(&self.state)),
        }
    }

    /// Requests stop. Returns true only for the call that flipped the flag.
    pub fn request_stop(&self) -> bool {
        if self
            .state
            .requested
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return false;
        }

        self.state.run_callbacks();
        true
    }

    /// Returns true once stop has been requested.
    #[must_use]
    pub fn stop_requested(&self) -> bool {
        self.state.stop_requested()
    }

    /// Number of callbacks currently registered and not yet run.
    #[must_use]
    pub fn callback_count(&self) -> usize {
        self.state.registry.lock().callbacks.len()
    }
}

impl Default for StopSource {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for StopSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StopSource")
            .field("stop_requested", &self.stop_requested())
            .finish()
    }
}

/// The observing side of a stop signal.
#[derive(Clone, Default)]
pub struct StopToken {
    state: Option<Arc<StopState>>,
}

impl StopToken {
    /// A token that can never be stopped.
    #[must_use]
    pub const fn never() -> Self {
        Self { state: None }
    }

    /// Returns true once stop has been requested on the linked source.
    #[must_use]
    pub fn stop_requested(&self) -> bool {
        self.state.as_ref().is_some_and(|state| state.stop_requested())
    }

    /// Returns false for the never token.
    #[must_use]
    pub const fn stop_possible(&self) -> bool {
        self.state.is_some()
    }

    /// Returns true if both tokens observe the same source.
    #[must_use]
    pub fn same_source(&self, other: &Self) -> bool {
        match (&self.state, &other.state) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        }
    }
}

impl fmt::Debug for StopToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StopToken")
            .field("stop_possible", &self.stop_possible())
            .field("stop_requested", &self.stop_requested())
            .finish()
    }
}

/// A registration on a [`StopToken`]; dropping it deregisters the callback.
#[must_use = "dropping a StopCallback deregisters it immediately"]
pub struct StopCallback {
    registration: Option<(Arc<StopState>, u64)>,
}

impl StopCallback {
    /// Registers `f` to run when stop is requested on `token`'s source.
    ///
    /// Runs `f` before returning if stop was already requested. Never runs
    /// `f` for the never token.
    pub fn register(token: &StopToken, f: impl FnOnce() + Send + 'static) -> Self {
        let Some(state) = &token.state else {
            return Self { registration: None };
        };

        // Hold the registry lock across the flag check: request_stop sets the
        // flag before draining, so a registration that observes !requested
        // here is guaranteed to be drained.
        let mut registry = state.registry.lock();
        if state.stop_requested() {
            drop(registry);
            f();
            return Self { registration: None };
        }
        let id = state.next_id.fetch_add(1, Ordering::Relaxed);
        registry.callbacks.push_back((id, Box::new(f)));
        drop(registry);

        Self {
            registration: Some((Arc::clone(state), id)),
        }
    }

    /// Returns true while the callback is registered and has not run.
    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.registration.as_ref().is_some_and(|(state, id)| {
            state.registry.lock().callbacks.iter().any(|(cid, _)| cid == id)
        })
    }
}

impl Drop for StopCallback {
    fn drop(&mut self) {
        let Some((state, id)) = self.registration.take() else {
            return;
        };
        let mut registry = state.registry.lock();
        if let Some(pos) = registry.callbacks.iter().position(|(cid, _)| *cid == id) {
            let removed = registry.callbacks.remove(pos);
            // The closure's captures may hold registrations of their own.
            drop(registry);
            drop(removed);
            return;
        }
        let current = thread::current().id();
        while matches!(registry.running, Some((rid, tid)) if rid == id && tid != current) {
            state.finished.wait(&mut registry);
        }
    }
}

impl fmt::Debug for StopCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StopCallback")
            .field("armed", &self.is_armed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::init_test_logging;
    use std::sync::atomic::AtomicUsize;

    fn init_test(name: &str) {
        init_test_logging();
        crate::test_phase!(name);
    }

    fn counter() -> (Arc<AtomicUsize>, impl FnOnce() + Send + 'static) {
        let count = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&count);
        (count, move || {
            c.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn request_stop_succeeds_once() {
        init_test("request_stop_succeeds_once");
        let source = StopSource::new();
        let token = source.token();
        assert!(!token.stop_requested());
        assert!(source.request_stop());
        assert!(!source.request_stop());
        assert!(token.stop_requested());
        crate::test_complete!("request_stop_succeeds_once");
    }

    #[test]
    fn callback_runs_once_on_request() {
        init_test("callback_runs_once_on_request");
        let source = StopSource::new();
        let (count, f) = counter();
        let callback = StopCallback::register(&source.token(), f);
        assert!(callback.is_armed());
        assert_eq!(source.callback_count(), 1);

        source.request_stop();
        source.request_stop();
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(!callback.is_armed());
        assert_eq!(source.callback_count(), 0);
        crate::test_complete!("callback_runs_once_on_request");
    }

    #[test]
    fn late_registration_runs_immediately() {
        init_test("late_registration_runs_immediately");
        let source = StopSource::new();
        source.request_stop();
        let (count, f) = counter();
        let callback = StopCallback::register(&source.token(), f);
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(!callback.is_armed());
        crate::test_complete!("late_registration_runs_immediately");
    }

    #[test]
    fn dropping_callback_deregisters() {
        init_test("dropping_callback_deregisters");
        let source = StopSource::new();
        let (count, f) = counter();
        let callback = StopCallback::register(&source.token(), f);
        drop(callback);
        assert_eq!(source.callback_count(), 0);
        source.request_stop();
        assert_eq!(count.load(Ordering::SeqCst), 0);
        crate::test_complete!("dropping_callback_deregisters");
    }

    #[test]
    fn never_token_ignores_registration() {
        init_test("never_token_ignores_registration");
        let token = StopToken::never();
        assert!(!token.stop_possible());
        assert!(!token.stop_requested());
        let (count, f) = counter();
        let callback = StopCallback::register(&token, f);
        assert!(!callback.is_armed());
        drop(callback);
        assert_eq!(count.load(Ordering::SeqCst), 0);
        crate::test_complete!("never_token_ignores_registration");
    }

    #[test]
    fn callbacks_can_chain_sources() {
        init_test("callbacks_can_chain_sources");
        let parent = StopSource::new();
        let child = StopSource::new();
        let forward = child.clone();
        let _link = StopCallback::register(&parent.token(), move || {
            forward.request_stop();
        });
        assert!(!child.stop_requested());
        parent.request_stop();
        assert!(child.stop_requested());
        crate::test_complete!("callbacks_can_chain_sources");
    }

    #[test]
    fn concurrent_requests_have_one_winner() {
        init_test("concurrent_requests_have_one_winner");
        let source = StopSource::new();
        let (count, f) = counter();
        let _callback = StopCallback::register(&source.token(), f);
        let winners = Arc::new(AtomicUsize::new(0));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let source = source.clone();
                let winners = Arc::clone(&winners);
                std::thread::spawn(move || {
                    if source.request_stop() {
                        winners.fetch_add(1, Ordering::SeqCst);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().expect("thread panicked");
        }
        assert_eq!(winners.load(Ordering::SeqCst), 1);
        assert_eq!(count.load(Ordering::SeqCst), 1);
        crate::test_complete!("concurrent_requests_have_one_winner");
    }

    #[test]
    fn callback_dropped_during_stop_never_runs() {
        init_test("callback_dropped_during_stop_never_runs");
        let source = StopSource::new();
        let entered = Arc::new(AtomicBool::new(false));
        let second_ran = Arc::new(AtomicBool::new(false));

        let flag = Arc::clone(&entered);
        let _first = StopCallback::register(&source.token(), move || {
            flag.store(true, Ordering::SeqCst);
            std::thread::sleep(std::time::Duration::from_millis(200));
        });
        let flag = Arc::clone(&second_ran);
        let second = StopCallback::register(&source.token(), move || {
            flag.store(true, Ordering::SeqCst);
        });

        let requester = {
            let source = source.clone();
            std::thread::spawn(move || source.request_stop())
        };
        while !entered.load(Ordering::SeqCst) {
            std::thread::yield_now();
        }
        drop(second);
        let ran_before_join = second_ran.load(Ordering::SeqCst);
        assert!(requester.join().expect("requester panicked"));
        crate::assert_with_log!(!ran_before_join, "not run at drop", false, ran_before_join);
        assert!(!second_ran.load(Ordering::SeqCst));
        crate::test_complete!("callback_dropped_during_stop_never_runs");
    }

    #[test]
    fn drop_waits_for_running_callback_on_other_thread() {
        init_test("drop_waits_for_running_callback_on_other_thread");
        let source = StopSource::new();
        let entered = Arc::new(AtomicBool::new(false));
        let finished = Arc::new(AtomicBool::new(false));

        let (enter, finish) = (Arc::clone(&entered), Arc::clone(&finished));
        let callback = StopCallback::register(&source.token(), move || {
            enter.store(true, Ordering::SeqCst);
            std::thread::sleep(std::time::Duration::from_millis(100));
            finish.store(true, Ordering::SeqCst);
        });

        let requester = {
            let source = source.clone();
            std::thread::spawn(move || source.request_stop())
        };
        while !entered.load(Ordering::SeqCst) {
            std::thread::yield_now();
        }
        drop(callback);
        assert!(finished.load(Ordering::SeqCst));
        requester.join().expect("requester panicked");
        crate::test_complete!("drop_waits_for_running_callback_on_other_thread");
    }

    #[test]
    fn callback_can_drop_its_own_registration() {
        init_test("callback_can_drop_its_own_registration");
        let source = StopSource::new();
        let slot: Arc<Mutex<Option<StopCallback>>> = Arc::new(Mutex::new(None));
        let (count, bump) = counter();

        let own = Arc::clone(&slot);
        let callback = StopCallback::register(&source.token(), move || {
            bump();
            let registration = own.lock().take();
            drop(registration);
        });
        *slot.lock() = Some(callback);

        assert!(source.request_stop());
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(slot.lock().is_none());
        crate::test_complete!("callback_can_drop_its_own_registration");
    }

    #[test]
    fn callbacks_run_in_registration_order() {
        init_test("callbacks_run_in_registration_order");
        let source = StopSource::new();
        let order = Arc::new(Mutex::new(Vec::new()));
        let registrations: Vec<_> = (0..4)
            .map(|i| {
                let order = Arc::clone(&order);
                StopCallback::register(&source.token(), move || order.lock().push(i))
            })
            .collect();
        source.request_stop();
        assert_eq!(*order.lock(), vec![0, 1, 2, 3]);
        drop(registrations);
        crate::test_complete!("callbacks_run_in_registration_order");
    }

    #[test]
    fn same_source_compares_links() {
        let a = StopSource::new();
        let b = StopSource::new();
        assert!(a.token().same_source(&a.token()));
        assert!(!a.token().same_source(&b.token()));
        assert!(StopToken::never().same_source(&StopToken::default()));
    }
}
