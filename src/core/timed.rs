//! Scheduler-bound components and their projections into the future.

use crate::core::{AppResult, Expectation, KernelError, Scheduler};
use crate::util::time::{Duration, Instant};

/// A component whose notion of "now" comes from a [`Scheduler`].
pub trait Timed {
    /// The scheduler this component is bound to.
    fn scheduler(&self) -> &Scheduler;

    /// The current instant.
    fn now(&self) -> Instant {
        self.scheduler().now()
    }

    /// Project onto `when`; fails if `when` is before `now()`.
    fn at(&self, when: Instant) -> Result<FutureSelf, KernelError> {
        FutureSelf::of(self, when)
    }

    /// Project onto `delay` after `now()`.
    fn after(&self, delay: Duration) -> Result<FutureSelf, KernelError> {
        FutureSelf::of(self, self.now() + delay)
    }
}

/// A view of a timed component at a fixed future instant.
///
/// Its `now()` is the bound instant, so `after` and [`FutureSelf::then_after`]
/// chain relative to it rather than to the scheduler's clock.
#[derive(Debug, Clone)]
pub struct FutureSelf {
    scheduler: Scheduler,
    when: Instant,
}

impl FutureSelf {
    /// Bind `timed` to `when`, rejecting instants before `timed.now()` right away.
    pub fn of<T: Timed + ?Sized>(timed: &T, when: Instant) -> Result<Self, KernelError> {
        let now = timed.now();
        if when < now {
            return Err(KernelError::PastScheduling { when, now });
        }
        Ok(Self {
            scheduler: timed.scheduler().clone(),
            when,
        })
    }

    /// The bound instant.
    pub const fn when(&self) -> Instant {
        self.when
    }

    /// Schedule `action` at the bound instant.
    pub fn call<F>(&self, action: F) -> Result<Expectation, KernelError>
    where
        F: FnOnce() -> AppResult<()> + Send + 'static,
    {
        self.scheduler.schedule(self.when, action)
    }

    /// Schedule `action(arg)`, binding `arg` now.
    pub fn call_with<F, A>(&self, action: F, arg: A) -> Result<Expectation, KernelError>
    where
        F: FnOnce(A) -> AppResult<()> + Send + 'static,
        A: Send + 'static,
    {
        self.call(move || action(arg))
    }

    /// Schedule `action(first, second)`, binding both arguments now.
    pub fn call_with2<F, A, B>(
        &self,
        action: F,
        first: A,
        second: B,
    ) -> Result<Expectation, KernelError>
    where
        F: FnOnce(A, B) -> AppResult<()> + Send + 'static,
        A: Send + 'static,
        B: Send + 'static,
    {
        self.call(move || action(first, second))
    }

    /// A new view `delay` after the bound instant.
    pub fn then_after(&self, delay: Duration) -> Result<Self, KernelError> {
        Self::of(self, self.when + delay)
    }
}

impl Timed for FutureSelf {
    fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    fn now(&self) -> Instant {
        self.when
    }
}
