//! Fan-out/join: run several senders and wait for all of them.
//!
//! # Semantics
//!
//! `when_all(a, b)`:
//! 1. Connect each child to a sibling receiver sharing one join barrier
//! 2. Start every child
//! 3. A child's value is stored in its slot while the join is still running
//! 4. The first error or stop moves the join out of `started` and requests
//!    stop on the siblings; later errors or stops are dropped
//! 5. When the last child completes, deliver the tuple of values (in child
//!    order), the recorded error, or `stopped`
//!
//! Every child completes before the join does, even after an early failure.
//! Error and stopped are mutually exclusive final outcomes; which one wins a
//! race is decided by arrival order.
//!
//! A stop request from the downstream receiver is forwarded to the children.
//! If it arrives before the join starts, no child is started and the join
//! completes with `stopped`. If it arrives while the children run, the
//! collected values are discarded in favour of `stopped`.
//!
//! # Algebraic Laws
//!
//! - Commutativity: `when_all(a, b) ≃ when_all(b, a)` (up to tuple order)
//! - Error absorption: `when_all(a, just_error(e)) ≃ just_error(e)` when `a`
//!   cannot fail
//! - Identity: `when_all_vec(vec![]) ≃ just(vec![])`

use crate::cancel::{StopCallback, StopSource, StopToken};
use crate::env::{Env, EnvShape};
use crate::error::Error;
use crate::protocol::{OperationState, Receiver, Sender};
use crate::tracing_compat::{debug, trace};
use crate::types::{Channel, CompletionSignatures, Signatures};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};
use std::sync::Arc;

const STARTED: u8 = 0;
const ERROR: u8 = 1;
const STOPPED: u8 = 2;

/// Joins the children's signature sets into the set of a join producing `V`.
fn join_signatures<V: 'static>(children: impl IntoIterator<Item = Signatures>) -> Signatures {
    let mut joined = CompletionSignatures::stopped();
    let mut all_values = true;
    for child in children {
        let Signatures::Resolved(sigs) = child else {
            return Signatures::Dependent;
        };
        all_values &= sigs.sends(Channel::Value);
        joined = joined.union(&sigs.without(Channel::Value));
    }
    if all_values {
        joined = joined.with_value::<V>();
    }
    joined.into()
}

/// The join barrier shared by every child receiver.
struct JoinState<T, V, R> {
    remaining: AtomicUsize,
    outcome: AtomicU8,
    slots: Mutex<T>,
    error: Mutex<Option<Error>>,
    stop_source: StopSource,
    parent_stop: Mutex<Option<StopCallback>>,
    receiver: Mutex<Option<R>>,
    assemble: fn(T) -> Option<V>,
}

impl<T, V, R> JoinState<T, V, R>
where
    T: Default + Send + 'static,
    V: Send + 'static,
    R: Receiver<V>,
{
    fn new(count: usize, slots: T, receiver: R, assemble: fn(T) -> Option<V>) -> Arc<Self> {
        Arc::new(Self {
            remaining: AtomicUsize::new(count),
            outcome: AtomicU8::new(STARTED),
            slots: Mutex::new(slots),
            error: Mutex::new(None),
            stop_source: StopSource::new(),
            parent_stop: Mutex::new(None),
            receiver: Mutex::new(Some(receiver)),
            assemble,
        })
    }

    fn fail(&self, outcome: u8) -> bool {
        let won = self
            .outcome
            .compare_exchange(STARTED, outcome, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        if won {
            self.stop_source.request_stop();
        }
        won
    }

    fn arrive(&self) {
        if self.remaining.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.complete();
        }
    }

    fn complete(&self) {
        let parent_stop = self.parent_stop.lock().take();
        drop(parent_stop);
        let receiver = self.receiver.lock().take();
        let Some(receiver) = receiver else {
            return;
        };
        match self.outcome.load(Ordering::Acquire) {
            STARTED if self.stop_source.stop_requested() => {
                debug!("when_all stopped by downstream; discarding values");
                receiver.set_stopped();
            }
            STARTED => {
                let slots = std::mem::take(&mut *self.slots.lock());
                match (self.assemble)(slots) {
                    Some(values) => receiver.set_value(values),
                    None => receiver.set_error(Error::internal("when_all child completed without a value")),
                }
            }
            ERROR => {
                let error = self.error.lock().take();
                receiver.set_error(
                    error.unwrap_or_else(|| Error::internal("when_all lost its error")),
                );
            }
            _ => receiver.set_stopped(),
        }
    }
}

/// The receiver each child is connected to.
struct WhenAllReceiver<T, V, R, X> {
    state: Arc<JoinState<T, V, R>>,
    index: usize,
    store: fn(&mut T, usize, X),
    env: Env,
}

impl<T, V, R, X> Receiver<X> for WhenAllReceiver<T, V, R, X>
where
    T: Default + Send + 'static,
    V: Send + 'static,
    R: Receiver<V>,
    X: Send + 'static,
{
    fn set_value(self, value: X) {
        if self.state.outcome.load(Ordering::Acquire) == STARTED {
            let mut slots = self.state.slots.lock();
            (self.store)(&mut slots, self.index, value);
        }
        self.state.arrive();
    }

    fn set_error(self, error: Error) {
        if self.state.fail(ERROR) {
            trace!(child = self.index, "when_all child failed; stopping siblings");
            *self.state.error.lock() = Some(error);
        }
        self.state.arrive();
    }

    fn set_stopped(self) {
        if self.state.fail(STOPPED) {
            trace!(child = self.index, "when_all child stopped; stopping siblings");
        }
        self.state.arrive();
    }

    fn env(&self) -> Env {
        self.env.clone()
    }
}

trait StartAll {
    fn start_all(self);
}

impl<A: OperationState, B: OperationState> StartAll for (A, B) {
    fn start_all(self) {
        self.0.start();
        self.1.start();
    }
}

impl<A: OperationState, B: OperationState, C: OperationState> StartAll for (A, B, C) {
    fn start_all(self) {
        self.0.start();
        self.1.start();
        self.2.start();
    }
}

impl<O: OperationState> StartAll for Vec<O> {
    fn start_all(self) {
        for op in self {
            op.start();
        }
    }
}

struct WhenAllOperation<T, V, R, C> {
    state: Arc<JoinState<T, V, R>>,
    children: C,
    count: usize,
    parent_token: StopToken,
}

impl<T, V, R, C> OperationState for WhenAllOperation<T, V, R, C>
where
    T: Default + Send + 'static,
    V: Send + 'static,
    R: Receiver<V>,
    C: StartAll,
{
    fn start(self) {
        let Self {
            state,
            children,
            count,
            parent_token,
        } = self;
        let stop_source = state.stop_source.clone();
        let on_stop = StopCallback::register(&parent_token, move || {
            stop_source.request_stop();
        });
        *state.parent_stop.lock() = Some(on_stop);

        if parent_token.stop_requested() {
            debug!(children = count, "when_all stopped before start");
            drop(children);
            state.remaining.store(0, Ordering::Release);
            state.stop_source.request_stop();
            state.complete();
            return;
        }
        if count == 0 {
            state.complete();
            return;
        }
        trace!(children = count, "when_all starting children");
        children.start_all();
    }
}

/// The parent's environment with the join's stop token.
fn child_env<T, V, R>(parent: &Env, state: &JoinState<T, V, R>) -> Env {
    parent.clone().with_stop_token(state.stop_source.token())
}

type Slots2<A, B> = (Option<A>, Option<B>);
type Slots3<A, B, C> = (Option<A>, Option<B>, Option<C>);

/// Sender returned by [`when_all`].
#[must_use = "senders do nothing unless connected and started"]
pub struct WhenAll<A, B> {
    first: A,
    second: B,
}

/// Runs `first` and `second` and completes with both values.
pub fn when_all<A: Sender, B: Sender>(first: A, second: B) -> WhenAll<A, B> {
    WhenAll { first, second }
}

impl<A: Sender, B: Sender> Sender for WhenAll<A, B> {
    type Value = (A::Value, B::Value);

    fn signatures(env: Option<EnvShape>) -> Signatures {
        join_signatures::<(A::Value, B::Value)>([A::signatures(env), B::signatures(env)])
    }

    fn connect<R>(self, receiver: R) -> impl OperationState
    where
        R: Receiver<(A::Value, B::Value)>,
    {
        let parent = receiver.env();
        let slots: Slots2<A::Value, B::Value> = (None, None);
        let state = JoinState::new(2, slots, receiver, |(a, b)| Some((a?, b?)));
        let env = child_env(&parent, &state);
        let first = self.first.connect(WhenAllReceiver {
            state: Arc::clone(&state),
            index: 0,
            store: |slots: &mut Slots2<A::Value, B::Value>, _: usize, value: A::Value| {
                slots.0 = Some(value);
            },
            env: env.clone(),
        });
        let second = self.second.connect(WhenAllReceiver {
            state: Arc::clone(&state),
            index: 1,
            store: |slots: &mut Slots2<A::Value, B::Value>, _: usize, value: B::Value| {
                slots.1 = Some(value);
            },
            env,
        });
        WhenAllOperation {
            state,
            children: (first, second),
            count: 2,
            parent_token: parent.stop_token().clone(),
        }
    }
}

/// Sender returned by [`when_all3`].
#[must_use = "senders do nothing unless connected and started"]
pub struct WhenAll3<A, B, C> {
    first: A,
    second: B,
    third: C,
}

/// Runs three senders and completes with all three values.
pub fn when_all3<A: Sender, B: Sender, C: Sender>(
    first: A,
    second: B,
    third: C,
) -> WhenAll3<A, B, C> {
    WhenAll3 {
        first,
        second,
        third,
    }
}


impl<A: Sender, B: Sender, C: Sender> Sender for WhenAll3<A, B, C> {
    type Value = (A::Value, B::Value, C::Value);

    fn signatures(env: Option<EnvShape>) -> Signatures {
        join_signatures::<(A::Value, B::Value, C::Value)>([
            A::signatures(env),
            B::signatures(env),
            C::signatures(env),
        ])
    }

    fn connect<R>(self, receiver: R) -> impl OperationState
    where
        R: Receiver<(A::Value, B::Value, C::Value)>,
    {
        let parent = receiver.env();
        let slots: Slots3<A::Value, B::Value, C::Value> = (None, None, None);
        let state = JoinState::new(3, slots, receiver, |(a, b, c)| Some((a?, b?, c?)));
        let env = child_env(&parent, &state);
        let first = self.first.connect(WhenAllReceiver {
            state: Arc::clone(&state),
            index: 0,
            store: |slots: &mut Slots3<A::Value, B::Value, C::Value>, _: usize, value: A::Value| {
                slots.0 = Some(value);
            },
            env: env.clone(),
        });
        let second = self.second.connect(WhenAllReceiver {
            state: Arc::clone(&state),
            index: 1,
            store: |slots: &mut Slots3<A::Value, B::Value, C::Value>, _: usize, value: B::Value| {
                slots.1 = Some(value);
            },
            env: env.clone(),
        });
        let third = self.third.connect(WhenAllReceiver {
            state: Arc::clone(&state),
            index: 2,
            store: |slots: &mut Slots3<A::Value, B::Value, C::Value>, _: usize, value: C::Value| {
                slots.2 = Some(value);
            },
            env,
        });
        WhenAllOperation {
            state,
            children: (first, second, third),
            count: 3,
            parent_token: parent.stop_token().clone(),
        }
    }
}

/// Sender returned by [`when_all_vec`].
#[must_use = "senders do nothing unless connected and started"]
pub struct WhenAllVec<S> {
    children: Vec<S>,
}

/// Runs every sender in `children` and completes with their values in order.
pub fn when_all_vec<S: Sender>(children: Vec<S>) -> WhenAllVec<S> {
    WhenAllVec { children }
}

impl<S: Sender> Sender for WhenAllVec<S> {
    type Value = Vec<S::Value>;

    fn signatures(env: Option<EnvShape>) -> Signatures {
        // An empty vector completes with a value whatever the child type.
        join_signatures::<Vec<S::Value>>([S::signatures(env)])
            .map(CompletionSignatures::with_value::<Vec<S::Value>>)
    }

    fn connect<R>(self, receiver: R) -> impl OperationState
    where
        R: Receiver<Vec<S::Value>>,
    {
        let count = self.children.len();
        let parent = receiver.env();
        let slots: Vec<Option<S::Value>> = (0..count).map(|_| None).collect();
        let state = JoinState::new(count, slots, receiver, |slots: Vec<Option<S::Value>>| {
            slots.into_iter().collect::<Option<Vec<_>>>()
        });
        let env = child_env(&parent, &state);
        let children: Vec<_> = self
            .children
            .into_iter()
            .enumerate()
            .map(|(index, child)| {
                child.connect(WhenAllReceiver {
                    state: Arc::clone(&state),
                    index,
                    store: |slots: &mut Vec<Option<S::Value>>, index: usize, value: S::Value| {
                        if let Some(slot) = slots.get_mut(index) {
                            *slot = Some(value);
                        }
                    },
                    env: env.clone(),
                })
            })
            .collect();
        WhenAllOperation {
            state,
            children,
            count,
            parent_token: parent.stop_token().clone(),
        }
    }
}
