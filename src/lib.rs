//! sendkit: a sender/receiver algebra for composing asynchronous work.
//!
//! # Overview
//!
//! A [`Sender`] is an inert description of work. Connecting it to a
//! [`Receiver`] produces an [`OperationState`]; starting that state runs the
//! work, which finishes by completing the receiver on exactly one of three
//! channels: value, error or stopped. Combinators build bigger senders out of
//! smaller ones, and every sender type can report, without running, which
//! completions it may produce.
//!
//! # Core Guarantees
//!
//! - **Exactly-once completion**: every started operation completes its
//!   receiver once; completion methods consume the receiver
//! - **No unwinding through operations**: panics in user callbacks become
//!   error completions
//! - **Cooperative cancellation**: stop requests flow down through
//!   [`StopToken`]s in each receiver's environment
//! - **Static completion signatures**: [`Sender::signatures`] describes the
//!   possible completions of a sender type in a given environment shape
//!
//! # Module Structure
//!
//! - [`protocol`]: the `Sender` / `Receiver` / `OperationState` / `Scheduler` traits
//! - [`types`]: completions and completion signatures
//! - [`env`]: receiver environments and facility queries
//! - [`cancel`]: stop sources, tokens and callbacks
//! - [`sender`]: leaf senders (`just`, `read`, ...)
//! - [`combinator`]: `then`, `let_value`, `when_all`, `split`, `on`, ...
//! - [`sequence`]: multi-item senders and `transform_each`
//! - [`runtime`]: the reference [`RunLoop`](runtime::RunLoop) scheduler
//! - [`consumer`]: `sync_wait` and `start_detached`
//! - [`error`]: the shared error-channel payload
//!
//! # Example
//!
//! ```
//! use sendkit::{just, when_all, SenderExt};
//!
//! let sum = when_all(just(1), just(2))
//!     .then(|(a, b)| a + b)
//!     .sync_wait()
//!     .expect("no error");
//! assert_eq!(sum, Some(3));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::module_inception)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::module_name_repetitions)]

pub mod cancel;
pub mod combinator;
pub mod consumer;
pub mod env;
pub mod error;
pub mod protocol;
pub mod runtime;
pub mod sender;
pub mod sequence;
#[cfg(any(test, feature = "test-internals"))]
pub mod test_utils;
pub mod tracing_compat;
pub mod types;

// Re-exports for convenient access to core types
pub use cancel::{StopCallback, StopSource, StopToken};
pub use combinator::{
    complete_on, ensure_started, let_error, let_stopped, let_value, on, schedule_from, split,
    stopped_as_error, stopped_as_optional, then, transfer, upon_error, upon_stopped, when_all,
    when_all3, when_all_vec, SenderExt,
};
pub use consumer::{execute, start_detached, sync_wait, sync_wait_with_config};
pub use env::{Env, EnvShape, GetScheduler, GetStopToken, Query};
pub use error::{Error, ErrorCategory, ErrorKind, PanicPayload, Result};
pub use protocol::{
    connect_and_start, AnyScheduler, OperationState, Receiver, Scheduler, Sender,
};
pub use runtime::{RunLoop, RunLoopConfig, RunLoopScheduler};
pub use sender::{
    just, just_error, just_stopped, read, read_scheduler, read_stop_token, read_with_default,
};
pub use sequence::{
    as_sequence, ignore_all, iterate, transform_each, SequenceReceiver, SequenceSender,
};
pub use types::{resolve_signatures, Channel, Completion, CompletionSignatures, Signatures};
