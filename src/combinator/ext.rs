//! Method syntax for the sender algebra.

use super::{
    complete_on, ensure_started, let_error, let_stopped, let_value, on, split, stopped_as_error,
    stopped_as_optional, then, transfer, upon_error, upon_stopped, when_all, CompleteOn,
    EnsureStarted, LetError, LetStopped, LetValue, On, Split, StoppedAsError, StoppedAsOptional,
    Then, Transfer, UponError, UponStopped, WhenAll,
};
use crate::consumer::{start_detached, sync_wait};
use crate::error::{Error, Result};
use crate::protocol::{Scheduler, Sender};

/// Extension trait chaining combinators onto any [`Sender`].
///
/// `just(1).then(f).transfer(sch)` reads left to right and builds the same
/// sender as `transfer(then(just(1), f), sch)`.
pub trait SenderExt: Sender {
    /// See [`then`](super::then()).
    fn then<F, U>(self, f: F) -> Then<Self, F>
    where
        F: FnOnce(Self::Value) -> U + Send + 'static,
        U: Send + 'static,
    {
        then(self, f)
    }

    /// See [`upon_error`](super::upon_error()).
    fn upon_error<F>(self, f: F) -> UponError<Self, F>
    where
        F: FnOnce(Error) -> Self::Value + Send + 'static,
    {
        upon_error(self, f)
    }

    /// See [`upon_stopped`](super::upon_stopped()).
    fn upon_stopped<F>(self, f: F) -> UponStopped<Self, F>
    where
        F: FnOnce() -> Self::Value + Send + 'static,
    {
        upon_stopped(self, f)
    }

    /// See [`let_value`](super::let_value()).
    fn let_value<F, S2>(self, f: F) -> LetValue<Self, F>
    where
        F: FnOnce(Self::Value) -> S2 + Send + 'static,
        S2: Sender,
    {
        let_value(self, f)
    }

    /// See [`let_error`](super::let_error()).
    fn let_error<F, S2>(self, f: F) -> LetError<Self, F>
    where
        F: FnOnce(Error) -> S2 + Send + 'static,
        S2: Sender<Value = Self::Value>,
    {
        let_error(self, f)
    }

    /// See [`let_stopped`](super::let_stopped()).
    fn let_stopped<F, S2>(self, f: F) -> LetStopped<Self, F>
    where
        F: FnOnce() -> S2 + Send + 'static,
        S2: Sender<Value = Self::Value>,
    {
        let_stopped(self, f)
    }

    /// See [`stopped_as_optional`](super::stopped_as_optional()).
    fn stopped_as_optional(self) -> StoppedAsOptional<Self> {
        stopped_as_optional(self)
    }

    /// See [`stopped_as_error`](super::stopped_as_error()).
    fn stopped_as_error(self, error: Error) -> StoppedAsError<Self> {
        stopped_as_error(self, error)
    }

    /// See [`transfer`](super::transfer()).
    fn transfer<Sch: Scheduler>(self, scheduler: Sch) -> Transfer<Self, Sch> {
        transfer(self, scheduler)
    }

    /// See [`on`](super::on()).
    fn on<Sch: Scheduler>(self, scheduler: Sch) -> On<Sch, Self> {
        on(scheduler, self)
    }

    /// See [`complete_on`](super::complete_on()).
    fn complete_on<Sch: Scheduler>(self, scheduler: Sch) -> CompleteOn<Self, Sch> {
        complete_on(self, scheduler)
    }

    /// See [`split`](super::split()).
    fn split(self) -> Split<Self>
    where
        Self::Value: Clone,
    {
        split(self)
    }

    /// See [`ensure_started`](super::ensure_started()).
    fn ensure_started(self) -> EnsureStarted<Self>
    where
        Self::Value: Clone,
    {
        ensure_started(self)
    }

    /// See [`when_all`](super::when_all()).
    fn when_all<B: Sender>(self, other: B) -> WhenAll<Self, B> {
        when_all(self, other)
    }

    /// See [`sync_wait`](crate::consumer::sync_wait()).
    fn sync_wait(self) -> Result<Option<Self::Value>> {
        sync_wait(self)
    }

    /// See [`start_detached`](crate::consumer::start_detached()).
    fn start_detached(self) {
        start_detached(self);
    }
}

impl<S: Sender> SenderExt for S {}
