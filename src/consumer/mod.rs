//! Consumers: the points where a sender graph is actually run.
//!
//! - [`sync_wait`]: run a sender on a fresh [`RunLoop`](crate::runtime::RunLoop)
//!   driven by the calling thread and return its result
//! - [`start_detached`]: start a sender and forget it
//! - [`execute`]: run a function on a scheduler and forget it

pub mod start_detached;
pub mod sync_wait;

pub use start_detached::{execute, start_detached};
pub use sync_wait::{sync_wait, sync_wait_with_config};
