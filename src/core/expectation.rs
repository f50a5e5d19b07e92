//! Cancellable handles for scheduled occurrences.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::core::{FutureSelf, KernelError, Scheduler};
use crate::util::time::{Duration, Instant};

/// Confirms that an action is scheduled to occur at some future [`Instant`].
///
/// Clones share the same cancellation token.
#[derive(Clone)]
pub struct Expectation {
    scheduler: Scheduler,
    when: Instant,
    token: Arc<AtomicBool>,
}

impl Expectation {
    pub(crate) const fn new(scheduler: Scheduler, when: Instant, token: Arc<AtomicBool>) -> Self {
        Self {
            scheduler,
            when,
            token,
        }
    }

    /// Instant the action is (or was) due.
    pub const fn when(&self) -> Instant {
        self.when
    }

    /// Cancel the scheduled action and release its slot in the event list.
    /// A no-op once it has fired or was removed.
    pub fn remove(&self) {
        if !self.token.swap(true, Ordering::AcqRel) {
            self.scheduler.unsubscribe(self.when, &self.token);
            tracing::trace!("unscheduled t={}", self.when);
        }
    }

    /// True iff the action was cancelled, has occurred, or was discarded at
    /// the end of the run.
    pub fn is_removed(&self) -> bool {
        self.token.load(Ordering::Acquire)
    }

    /// A view bound to `delay` after this expectation's instant.
    pub fn then_after(&self, delay: Duration) -> Result<FutureSelf, KernelError> {
        FutureSelf::of(&self.scheduler, self.when + delay)
    }
}

impl PartialEq for Expectation {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.token, &other.token)
    }
}

impl fmt::Debug for Expectation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Expectation")
            .field("when", &self.when)
            .field("removed", &self.is_removed())
            .finish()
    }
}
