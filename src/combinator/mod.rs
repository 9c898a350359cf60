//! Combinators: functions from senders to senders.
//!
//! - [`then`], [`upon_error`], [`upon_stopped`]: transform one completion channel
//! - [`let_value`], [`let_error`], [`let_stopped`]: continue with a new sender
//! - [`stopped_as_optional`], [`stopped_as_error`]: fold the stopped channel away
//! - [`transfer`], [`schedule_from`]: deliver a completion on another scheduler
//! - [`on`], [`complete_on`]: run work on, or against, a given scheduler
//! - [`split`], [`ensure_started`]: share one execution between subscribers
//! - [`when_all`], [`when_all3`], [`when_all_vec`]: fan out and join
//!
//! [`SenderExt`] offers all of them as methods.

pub mod continuation;
pub mod ext;
pub mod on;
pub mod split;
pub mod stopped_as;
pub mod then;
pub mod transfer;
pub mod upon;
pub mod when_all;

pub use continuation::{let_error, let_stopped, let_value, LetError, LetStopped, LetValue};
pub use ext::SenderExt;
pub use on::{complete_on, on, CompleteOn, On};
pub use split::{ensure_started, split, EnsureStarted, Split};
pub use stopped_as::{stopped_as_error, stopped_as_optional, StoppedAsError, StoppedAsOptional};
pub use then::{then, Then};
pub use transfer::{schedule_from, transfer, Transfer};
pub use upon::{upon_error, upon_stopped, UponError, UponStopped};
pub use when_all::{when_all, when_all3, when_all_vec, WhenAll, WhenAll3, WhenAllVec};
