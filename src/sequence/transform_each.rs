//! Rewriting every item of a sequence.
//!
//! `transform_each(seq, adaptor)` is a sequence with the same items as `seq`,
//! each passed through `adaptor` before it reaches the receiver. Typical
//! adaptors are themselves combinators: `|item| then(item, f)` maps every
//! item value.

use super::{SequenceReceiver, SequenceSender};
use crate::env::Env;
use crate::error::Error;
use crate::protocol::{OperationState, Receiver, Sender};

/// Sequence returned by [`transform_each`].
#[must_use = "sequences do nothing unless subscribed and started"]
pub struct TransformEach<Seq, F> {
    sequence: Seq,
    adaptor: F,
}

/// Applies `adaptor` to every item sender of `sequence`.
pub fn transform_each<Seq, F, S2>(sequence: Seq, adaptor: F) -> TransformEach<Seq, F>
where
    Seq: SequenceSender,
    F: FnMut(Seq::Item) -> S2 + Send + 'static,
    S2: Sender,
{
    TransformEach { sequence, adaptor }
}

impl<Seq, F, S2> SequenceSender for TransformEach<Seq, F>
where
    Seq: SequenceSender,
    F: FnMut(Seq::Item) -> S2 + Send + 'static,
    S2: Sender,
{
    type Item = S2;

    fn subscribe<R>(self, receiver: R) -> impl OperationState
    where
        R: SequenceReceiver<S2>,
    {
        self.sequence.subscribe(TransformReceiver {
            inner: receiver,
            adaptor: self.adaptor,
        })
    }
}

struct TransformReceiver<R, F> {
    inner: R,
    adaptor: F,
}

impl<R: Receiver<()>, F: Send + 'static> Receiver<()> for TransformReceiver<R, F> {
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

impl<I, S2, R, F> SequenceReceiver<I> for TransformReceiver<R, F>
where
    I: Sender,
    S2: Sender,
    F: FnMut(I) -> S2 + Send + 'static,
    R: SequenceReceiver<S2>,
{
    type Next = R::Next;

    fn set_next(&mut self, item: I) -> R::Next {
        let item = (self.adaptor)(item);
        self.inner.set_next(item)
    }
}
