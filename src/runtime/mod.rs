//! Reference execution context.
//!
//! - [`run_loop`]: the FIFO [`RunLoop`] and its scheduler
//! - [`config`]: [`RunLoopConfig`] and [`ConfigError`]
//! - [`env_config`]: `SENDKIT_RUN_LOOP_*` overrides and TOML loading
//!
//! # Quick Start
//!
//! ```
//! use sendkit::runtime::RunLoop;
//! use sendkit::{just, SenderExt};
//! use std::sync::Arc;
//! use std::thread;
//!
//! let run_loop = Arc::new(RunLoop::new());
//! let driver = {
//!     let run_loop = Arc::clone(&run_loop);
//!     thread::spawn(move || run_loop.run())
//! };
//!
//! let out = just(20).transfer(run_loop.scheduler()).then(|x| x + 1).sync_wait();
//! assert_eq!(out.unwrap(), Some(21));
//!
//! run_loop.finish();
//! driver.join().unwrap();
//! ```

pub mod config;
pub mod env_config;
pub mod run_loop;

pub use config::{ConfigError, RunLoopConfig};
pub use run_loop::{RunLoop, RunLoopSchedule, RunLoopScheduler};
