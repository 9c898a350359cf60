//! Receiver environments and facility queries.
//!
//! An [`Env`] is what a receiver exposes to the operation it is connected
//! to: a stop token and, optionally, the scheduler the operation is running
//! on. Operations discover these facilities through [`Query`] tags instead of
//! reaching for globals.
//!
//! [`EnvShape`] is the static part of an environment, the set of optional
//! facilities it provides. Completion-signature computation works on shapes
//! because whether a query can succeed matters there, not the facility
//! itself.

use crate::cancel::StopToken;
use crate::protocol::{AnyScheduler, Scheduler};
use std::fmt;

/// The ambient environment a receiver provides.
#[derive(Clone, Default)]
pub struct Env {
    stop_token: StopToken,
    scheduler: Option<AnyScheduler>,
}

impl Env {
    /// An environment with a never-stopping token and no scheduler.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the stop token.
    #[must_use]
    pub fn with_stop_token(mut self, stop_token: StopToken) -> Self {
        self.stop_token = stop_token;
        self
    }

    /// Installs `scheduler` as the current scheduler.
    #[must_use]
    pub fn with_scheduler<S: Scheduler>(mut self, scheduler: S) -> Self {
        self.scheduler = Some(scheduler.into_any());
        self
    }

    /// Removes the current scheduler.
    #[must_use]
    pub fn without_scheduler(mut self) -> Self {
        self.scheduler = None;
        self
    }

    /// Returns the stop token.
    #[must_use]
    pub const fn stop_token(&self) -> &StopToken {
        &self.stop_token
    }

    /// Returns the current scheduler, if any.
    #[must_use]
    pub const fn scheduler(&self) -> Option<&AnyScheduler> {
        self.scheduler.as_ref()
    }

    /// Looks up the facility named by `Q`.
    #[must_use]
    pub fn get<Q: Query>(&self) -> Option<Q::Output> {
        Q::query(self)
    }

    /// Returns which optional facilities this environment provides.
    #[must_use]
    pub const fn shape(&self) -> EnvShape {
        EnvShape {
            scheduler: self.scheduler.is_some(),
        }
    }
}

impl fmt::Debug for Env {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Env")
            .field("stop_token", &self.stop_token)
            .field("scheduler", &self.scheduler)
            .finish()
    }
}

/// The facilities an environment provides, without the facilities themselves.
///
/// The stop token is always present, so only the scheduler is tracked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct EnvShape {
    scheduler: bool,
}

impl EnvShape {
    /// The shape of [`Env::new()`]: a stop token and nothing else.
    #[must_use]
    pub const fn new() -> Self {
        Self { scheduler: false }
    }

    /// The same shape with a scheduler present.
    #[must_use]
    pub const fn with_scheduler(self) -> Self {
        Self { scheduler: true }
    }

    /// Returns true if a scheduler is present.
    #[must_use]
    pub const fn provides_scheduler(&self) -> bool {
        self.scheduler
    }
}

/// A tag naming one environment facility.
pub trait Query: Send + 'static {
    /// The facility's type.
    type Output: Send + 'static;

    /// Name used in diagnostics.
    const NAME: &'static str;

    /// Looks the facility up in `env`.
    fn query(env: &Env) -> Option<Self::Output>;

    /// Returns true if environments of this shape provide the facility.
    fn provided_by(shape: EnvShape) -> bool;

    /// True if every environment provides the facility.
    const ALWAYS_PROVIDED: bool = false;
}

/// Queries the scheduler the operation is running on.
#[derive(Debug, Clone, Copy)]
pub struct GetScheduler;

impl Query for GetScheduler {
    type Output = AnyScheduler;
    const NAME: &'static str = "scheduler";

    fn query(env: &Env) -> Option<AnyScheduler> {
        env.scheduler.clone()
    }

    fn provided_by(shape: EnvShape) -> bool {
        shape.provides_scheduler()
    }
}

/// Queries the stop token.
#[derive(Debug, Clone, Copy)]
pub struct GetStopToken;

impl Query for GetStopToken {
    type Output = StopToken;
    const NAME: &'static str = "stop_token";
    const ALWAYS_PROVIDED: bool = true;

    fn query(env: &Env) -> Option<StopToken> {
        Some(env.stop_token.clone())
    }

    fn provided_by(_shape: EnvShape) -> bool {
        true
    }
}
