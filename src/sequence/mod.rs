//! Sequence senders: senders that deliver many items before completing.
//!
//! A [`SequenceSender`] is subscribed to a [`SequenceReceiver`]. For every
//! item it calls [`SequenceReceiver::set_next`] with a sender describing that
//! item; the receiver answers with a `Next` sender, and the sequence emits
//! its following item only once `Next` has completed with `()`. After the last
//! item the receiver gets `set_value(())`. An error or stop from `Next` ends
//! the sequence on the same channel.
//!
//! Before each item the sequence checks the receiver's stop token and ends
//! with `stopped` once stop has been requested.
//!
//! Emission runs as a loop. A `Next` that completes inside its own `start`
//! hands control back to the loop instead of emitting from its receiver, so
//! stack depth does not grow with the number of items. A `Next` completing
//! later, from another context, resumes the loop there.
//!
//! - [`as_sequence`]: one item, the given sender
//! - [`iterate`]: one `just(x)` item per element of an iterator
//! - [`transform_each`]: rewrite every item sender
//! - [`ignore_all`]: run a sequence to completion as a plain sender

pub mod transform_each;

pub use transform_each::{transform_each, TransformEach};

use crate::env::{Env, EnvShape};
use crate::error::Error;
use crate::protocol::{OperationState, Receiver, Sender};
use crate::sender::{just, Just};
use crate::tracing_compat::trace;
use crate::types::Signatures;
use parking_lot::Mutex;
use std::iter::Map;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

/// The consumer of a sequence.
pub trait SequenceReceiver<I: Sender>: Receiver<()> {
    /// The sender the sequence waits for before emitting the next item.
    type Next: Sender<Value = ()>;

    /// Accepts one item.
    fn set_next(&mut self, item: I) -> Self::Next;
}

/// A producer of item senders.
pub trait SequenceSender: Send + Sized + 'static {
    /// The sender type of each item.
    type Item: Sender;

    /// Signatures of one item in an environment of the given shape.
    fn item_signatures(env: Option<EnvShape>) -> Signatures {
        <Self::Item as Sender>::signatures(env)
    }

    /// Binds this sequence to `receiver`.
    fn subscribe<R>(self, receiver: R) -> impl OperationState
    where
        R: SequenceReceiver<Self::Item>;
}

/// A sequence emitting the senders an iterator yields.
#[must_use = "sequences do nothing unless subscribed and started"]
pub struct FromIter<It> {
    items: It,
}

/// Sequence returned by [`as_sequence`].
pub type AsSequence<S> = FromIter<std::option::IntoIter<S>>;

/// Sequence returned by [`iterate`].
pub type Iterate<It> =
    FromIter<Map<It, fn(<It as Iterator>::Item) -> Just<<It as Iterator>::Item>>>;

/// A sequence whose only item is `sender`.
pub fn as_sequence<S: Sender>(sender: S) -> AsSequence<S> {
    FromIter {
        items: Some(sender).into_iter(),
    }
}

/// A sequence of `just(x)` for every `x` in `items`.
pub fn iterate<I>(items: I) -> Iterate<I::IntoIter>
where
    I: IntoIterator,
    I::IntoIter: Send + 'static,
    I::Item: Send + 'static,
{
    FromIter {
        items: items.into_iter().map(just as fn(I::Item) -> Just<I::Item>),
    }
}

/// A sequence of the senders `items` yields.
pub fn from_senders<I>(items: I) -> FromIter<I::IntoIter>
where
    I: IntoIterator,
    I::IntoIter: Send + 'static,
    I::Item: Sender,
{
    FromIter {
        items: items.into_iter(),
    }
}

impl<It> SequenceSender for FromIter<It>
where
    It: Iterator + Send + 'static,
    It::Item: Sender,
{
    type Item = It::Item;

    fn subscribe<R>(self, receiver: R) -> impl OperationState
    where
        R: SequenceReceiver<It::Item>,
    {
        EmitOperation {
            items: self.items,
            receiver,
        }
    }
}

struct EmitOperation<It, R> {
    items: It,
    receiver: R,
}

impl<It, R> OperationState for EmitOperation<It, R>
where
    It: Iterator + Send + 'static,
    It::Item: Sender,
    R: SequenceReceiver<It::Item>,
{
    fn start(self) {
        emit(self.items, self.receiver);
    }
}

fn emit<It, R>(mut items: It, mut receiver: R)
where
    It: Iterator + Send + 'static,
    It::Item: Sender,
    R: SequenceReceiver<It::Item>,
{
    loop {
        if receiver.env().stop_token().stop_requested() {
            trace!("sequence stopped before next item");
            receiver.set_stopped();
            return;
        }
        let Some(item) = items.next() else {
            receiver.set_value(());
            return;
        };
        let next = receiver.set_next(item);
        let handoff = Arc::new(Handoff::new());
        next.connect(ItemReceiver {
            items,
            receiver,
            handoff: Arc::clone(&handoff),
        })
        .start();
        match handoff.resume() {
            Some((rest, owner)) => {
                items = rest;
                receiver = owner;
            }
            None => return,
        }
    }
}

const STARTING: u8 = 0;
const READY: u8 = 1;
const DETACHED: u8 = 2;

/// Passes the emission state from an item's receiver back to the loop that
/// started the item.
struct Handoff<It, R> {
    state: AtomicU8,
    slot: Mutex<Option<(It, R)>>,
}

impl<It, R> Handoff<It, R> {
    fn new() -> Self {
        Self {
            state: AtomicU8::new(STARTING),
            slot: Mutex::new(None),
        }
    }

    /// Called by the loop once `start` returned. Yields the state to continue
    /// with if the item already completed with a value.
    fn resume(&self) -> Option<(It, R)> {
        match self
            .state
            .compare_exchange(STARTING, DETACHED, Ordering::AcqRel, Ordering::Acquire)
        {
            Ok(_) => None,
            Err(_) => self.slot.lock().take(),
        }
    }

    /// Called on the item's value. Yields the state back when the loop has
    /// already moved on and the caller must continue emitting itself.
    fn park(&self, items: It, receiver: R) -> Option<(It, R)> {
        *self.slot.lock() = Some((items, receiver));
        match self
            .state
            .compare_exchange(STARTING, READY, Ordering::AcqRel, Ordering::Acquire)
        {
            Ok(_) => None,
            Err(_) => self.slot.lock().take(),
        }
    }
}

/// Waits for one item's `Next` sender, then continues emission.
struct ItemReceiver<It, R> {
    items: It,
    receiver: R,
    handoff: Arc<Handoff<It, R>>,
}

impl<It, R> Receiver<()> for ItemReceiver<It, R>
where
    It: Iterator + Send + 'static,
    It::Item: Sender,
    R: SequenceReceiver<It::Item>,
{
    fn set_value(self, (): ()) {
        if let Some((items, receiver)) = self.handoff.park(self.items, self.receiver) {
            emit(items, receiver);
        }
    }

    fn set_error(self, error: Error) {
        self.receiver.set_error(error);
    }

    fn set_stopped(self) {
        self.receiver.set_stopped();
    }

    fn env(&self) -> Env {
        self.receiver.env()
    }
}

/// Sender returned by [`ignore_all`].
#[must_use = "senders do nothing unless connected and started"]
pub struct IgnoreAll<Seq> {
    sequence: Seq,
}

/// Runs `sequence`, discarding item values, and completes with `()`.
pub fn ignore_all<Seq: SequenceSender>(sequence: Seq) -> IgnoreAll<Seq> {
    IgnoreAll { sequence }
}

impl<Seq: SequenceSender> Sender for IgnoreAll<Seq> {
    type Value = ();

    fn signatures(env: Option<EnvShape>) -> Signatures {
        Seq::item_signatures(env).map(|sigs| sigs.map_values::<()>().with_value::<()>().with_stopped())
    }

    fn connect<R>(self, receiver: R) -> impl OperationState
    where
        R: Receiver<()>,
    {
        self.sequence.subscribe(IgnoreReceiver { inner: receiver })
    }
}

struct IgnoreReceiver<R> {
    inner: R,
}

impl<R: Receiver<()>> Receiver<()> for IgnoreReceiver<R> {
    fn set_value(self, (): ()) {
        self.inner.set_value(());
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

impl<I: Sender, R: Receiver<()>> SequenceReceiver<I> for IgnoreReceiver<R> {
    type Next = DiscardValue<I>;

    fn set_next(&mut self, item: I) -> DiscardValue<I> {
        DiscardValue { item }
    }
}

/// An item sender whose value is replaced by `()`.
#[must_use = "senders do nothing unless connected and started"]
pub struct DiscardValue<I> {
    item: I,
}

impl<I: Sender> Sender for DiscardValue<I> {
    type Value = ();

    fn signatures(env: Option<EnvShape>) -> Signatures {
        I::signatures(env).map(|sigs| sigs.map_values::<()>())
    }

    fn connect<R>(self, receiver: R) -> impl OperationState
    where
        R: Receiver<()>,
    {
        self.item.connect(DiscardReceiver {
            inner: receiver,
            _value: PhantomData,
        })
    }
}

struct DiscardReceiver<V, R> {
    inner: R,
    _value: PhantomData<fn(V)>,
}

impl<V: Send + 'static, R: Receiver<()>> Receiver<V> for DiscardReceiver<V, R> {
    fn set_value(self, _value: V) {
        self.inner.set_value(());
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
