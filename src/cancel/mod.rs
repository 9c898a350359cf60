//! Cooperative cancellation.
//!
//! Stopping is a request, never a forced abort: a [`StopSource`] flips a flag
//! and runs the callbacks registered through its tokens, and each operation
//! decides how to wind down (usually by completing on the stopped channel).
//! Tokens travel to operations through the receiver environment.

pub mod stop;

pub use stop::{StopCallback, StopSource, StopToken};
