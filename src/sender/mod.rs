//! Leaf senders: the starting points of every pipeline.
//!
//! - [`just`], [`just_error`], [`just_stopped`]: complete immediately on one channel
//! - [`read`]: complete with a facility looked up in the receiver's environment
//! - [`read_with_default`]: the same, falling back to a given value

pub mod just;
pub mod read;

pub use just::{just, just_error, just_stopped, Just, JustError, JustStopped};
pub use read::{read, read_scheduler, read_stop_token, read_with_default, Read, ReadWithDefault};
