//! Piecewise-constant values over simulated time.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::core::{AppResult, Expectation, KernelError, Scheduler};
use crate::util::time::{Duration, Instant};

/// A value that changes at given instants and stays in effect until the next
/// change, such as a contact rate that is revised every season.
#[derive(Debug, Clone, PartialEq)]
pub struct Schedule<T> {
    entries: BTreeMap<Instant, T>,
}

impl<T> Schedule<T> {
    /// Build from instant → value pairs; fails if there are none.
    pub fn of(entries: BTreeMap<Instant, T>) -> Result<Self, KernelError> {
        if entries.is_empty() {
            return Err(KernelError::EmptySchedule);
        }
        Ok(Self { entries })
    }

    /// Build from pairs of offsets relative to `offset`.
    pub fn from_offsets<I>(offset: Instant, entries: I) -> Result<Self, KernelError>
    where
        I: IntoIterator<Item = (Duration, T)>,
    {
        Self::of(
            entries
                .into_iter()
                .map(|(delay, value)| (offset + delay, value))
                .collect(),
        )
    }

    /// Value in effect at `t`: the last change at or before `t`.
    pub fn floor(&self, t: Instant) -> Option<&T> {
        self.entries.range(..=t).next_back().map(|(_, value)| value)
    }

    /// Add or replace the change at `when`, returning the replaced value.
    pub fn insert(&mut self, when: Instant, value: T) -> Option<T> {
        self.entries.insert(when, value)
    }

    /// First change.
    pub fn first(&self) -> Option<(Instant, &T)> {
        self.entries.iter().next().map(|(t, v)| (*t, v))
    }

    /// Changes in chronological order.
    pub fn iter(&self) -> impl Iterator<Item = (Instant, &T)> {
        self.entries.iter().map(|(t, v)| (*t, v))
    }

    /// Number of changes.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Always false for a constructed schedule.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<T: Clone + Send + 'static> Schedule<T> {
    /// Schedule `handler(value)` at every change at or after `scheduler.now()`.
    pub fn handle<F>(&self, scheduler: &Scheduler, handler: F) -> Result<Vec<Expectation>, KernelError>
    where
        F: Fn(T) -> AppResult<()> + Send + Sync + 'static,
    {
        let handler = Arc::new(handler);
        self.entries
            .range(scheduler.now()..)
            .map(|(when, value)| {
                let handler = Arc::clone(&handler);
                let value = value.clone();
                scheduler.schedule(*when, move || handler(value))
            })
            .collect()
    }
}
