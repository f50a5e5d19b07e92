//! Discrete-event time authority.
//!
//! A [`Scheduler`] owns the simulated clock of one replication. Model
//! components ask it to run deferred actions at future instants; every distinct
//! instant becomes exactly one event in the underlying [`EventList`], shared by
//! all subscriptions made for that instant. [`Scheduler::resume`] pops events in
//! time order, runs each instant's live subscriptions in subscription order and
//! publishes the visited instant on the [`Scheduler::time`] stream. The start
//! instant is published when the run begins, even if nothing is due then.
//!
//! # Failure policy
//!
//! An action that returns `Err` (or panics) halts the whole run: the failure is
//! logged, emitted on `time()` as [`Signal::Error`] and returned from
//! `resume()`. Pending subscriptions are discarded and further scheduling fails
//! with [`KernelError::SimulationEnded`].
//!
//! ```
//! use episim_kernel::core::Scheduler;
//! use episim_kernel::util::time::{Duration, Instant};
//!
//! let scheduler = Scheduler::new("doc", Instant::ZERO, Some(Duration::of(10.0)));
//! let exp = scheduler.schedule(Instant::of(3.0), || Ok(())).unwrap();
//! scheduler.resume().unwrap();
//! assert!(exp.is_removed());
//! assert!(scheduler.is_finished());
//! ```

use std::any::Any;
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crossbeam_channel::Receiver;
use parking_lot::Mutex;

use crate::core::{AppResult, Expectation, KernelError, Timed};
use crate::infra::event_list::InMemoryEventList;
use crate::util::stream::{Emitter, Signal};
use crate::util::time::{Duration, Instant};

/// Default bound on distinct pending instants for the built-in event list.
pub const DEFAULT_MAX_PENDING_EVENTS: usize = 1 << 20;

/// A deferred action. Arguments are bound by the caller before scheduling.
pub type Action = Box<dyn FnOnce() -> AppResult<()> + Send + 'static>;

/// Abstraction for the event-list engine that advances virtual time.
///
/// The scheduler registers each distinct instant once and pulls instants back
/// in ascending order.
pub trait EventList: Send {
    /// Register an event at `at`.
    fn schedule(&mut self, at: Instant) -> Result<(), KernelError>;
    /// Withdraw one pending event at `at`, which must have been scheduled
    /// and not yet popped.
    fn remove(&mut self, at: Instant);
    /// Remove and return the earliest pending instant.
    fn pop_next(&mut self) -> Option<Instant>;
    /// Earliest pending instant without removing it.
    fn peek(&self) -> Option<Instant>;
    /// Drop every pending event.
    fn clear(&mut self);
    /// Maximum number of pending events.
    fn max_depth(&self) -> usize;
    /// Current number of pending events.
    fn len(&self) -> usize;
    /// True without pending events.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One caller's interest in an instant.
struct Subscription {
    /// Set once cancelled, fired or discarded.
    token: Arc<AtomicBool>,
    action: Action,
}

impl Subscription {
    /// Run the action unless the subscription was cancelled first.
    fn fire(self, at: Instant) -> Result<(), KernelError> {
        if self.token.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        match panic::catch_unwind(AssertUnwindSafe(self.action)) {
            Ok(Ok(())) => Ok(()),
            Ok(Err(error)) => Err(KernelError::ActionFailed {
                at,
                reason: format!("{error:#}"),
            }),
            Err(payload) => Err(KernelError::ActionFailed {
                at,
                reason: format!("panicked: {}", panic_message(payload.as_ref())),
            }),
        }
    }

    fn discard(self) {
        self.token.store(true, Ordering::Release);
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic payload".into())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Running,
    Finished,
}

struct SchedulerState {
    now: Instant,
    phase: Phase,
    /// Last instant published on the time stream.
    visited: Option<Instant>,
    failure: Option<KernelError>,
    listeners: BTreeMap<Instant, Vec<Subscription>>,
    events: Box<dyn EventList>,
}

struct SchedulerInner {
    id: String,
    start: Instant,
    end: Option<Instant>,
    state: Mutex<SchedulerState>,
    time: Emitter<Instant>,
}

/// Time authority of one simulation run. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct Scheduler {
    inner: Arc<SchedulerInner>,
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("id", &self.inner.id)
            .field("now", &self.now())
            .field("end", &self.inner.end)
            .finish_non_exhaustive()
    }
}

impl Scheduler {
    /// Create a scheduler at `start` that runs for `duration` (unbounded if `None`),
    /// backed by an [`InMemoryEventList`].
    pub fn new(id: impl Into<String>, start: Instant, duration: Option<Duration>) -> Self {
        Self::with_event_list(
            id,
            start,
            duration,
            Box::new(InMemoryEventList::new(DEFAULT_MAX_PENDING_EVENTS)),
        )
    }

    /// Create a scheduler driving a caller-supplied event list.
    pub fn with_event_list(
        id: impl Into<String>,
        start: Instant,
        duration: Option<Duration>,
        events: Box<dyn EventList>,
    ) -> Self {
        let id = id.into();
        let end = duration.map(|d| start + d);
        tracing::debug!("created scheduler {} at t={} until {:?}", id, start, end);
        Self {
            inner: Arc::new(SchedulerInner {
                id,
                start,
                end,
                state: Mutex::new(SchedulerState {
                    now: start,
                    phase: Phase::Idle,
                    visited: None,
                    failure: None,
                    listeners: BTreeMap::new(),
                    events,
                }),
                time: Emitter::new(),
            }),
        }
    }

    /// Create a replication and let `initializer` schedule the model's first events.
    pub fn of<F>(
        id: impl Into<String>,
        start: Instant,
        duration: Option<Duration>,
        initializer: F,
    ) -> Result<Self, KernelError>
    where
        F: FnOnce(&Self) -> AppResult<()>,
    {
        let scheduler = Self::new(id, start, duration);
        initializer(&scheduler)
            .map_err(|e| KernelError::InitializationFailed(format!("{e:#}")))?;
        tracing::trace!("initialized {}, t={}", scheduler.id(), scheduler.now());
        Ok(scheduler)
    }

    /// Replication identifier.
    pub fn id(&self) -> &str {
        &self.inner.id
    }

    /// Instant the run started at.
    pub fn start(&self) -> Instant {
        self.inner.start
    }

    /// Horizon after which no events fire, if bounded.
    pub fn end(&self) -> Option<Instant> {
        self.inner.end
    }

    /// Current simulated time.
    pub fn now(&self) -> Instant {
        self.inner.state.lock().now
    }

    /// Number of distinct instants waiting in the event list.
    pub fn pending_events(&self) -> usize {
        self.inner.state.lock().events.len()
    }

    /// True while `resume()` is processing events.
    pub fn is_running(&self) -> bool {
        self.inner.state.lock().phase == Phase::Running
    }

    /// True once the run completed or halted.
    pub fn is_finished(&self) -> bool {
        self.inner.state.lock().phase == Phase::Finished
    }

    /// Stream of visited instants, starting with the start instant and
    /// terminated by completion or failure.
    pub fn time(&self) -> Receiver<Signal<Instant>> {
        self.inner.time.subscribe()
    }

    /// Run `action` at `when`.
    ///
    /// Subscriptions for the same instant share one event and fire in the order
    /// they were made. The returned [`Expectation`] cancels only this one.
    pub fn schedule<F>(&self, when: Instant, action: F) -> Result<Expectation, KernelError>
    where
        F: FnOnce() -> AppResult<()> + Send + 'static,
    {
        let token = Arc::new(AtomicBool::new(false));
        {
            let mut state = self.inner.state.lock();
            if state.phase == Phase::Finished {
                return Err(KernelError::SimulationEnded(self.inner.id.clone()));
            }
            if when < state.now {
                return Err(KernelError::PastScheduling {
                    when,
                    now: state.now,
                });
            }
            let SchedulerState {
                listeners, events, ..
            } = &mut *state;
            let subscription = Subscription {
                token: Arc::clone(&token),
                action: Box::new(action),
            };
            match listeners.entry(when) {
                Entry::Occupied(mut entry) => entry.get_mut().push(subscription),
                Entry::Vacant(entry) => {
                    events.schedule(when)?;
                    entry.insert(vec![subscription]);
                }
            }
            tracing::trace!("scheduled t={}, pending instants={}", when, listeners.len());
        }
        Ok(Expectation::new(self.clone(), when, token))
    }

    /// Drop the subscription identified by `token`. The instant's event is
    /// withdrawn once it has no subscriptions left.
    pub(crate) fn unsubscribe(&self, when: Instant, token: &Arc<AtomicBool>) {
        let removed = {
            let mut state = self.inner.state.lock();
            let SchedulerState {
                listeners, events, ..
            } = &mut *state;
            let Some(subscriptions) = listeners.get_mut(&when) else {
                return;
            };
            let Some(index) = subscriptions
                .iter()
                .position(|s| Arc::ptr_eq(&s.token, token))
            else {
                return;
            };
            let removed = subscriptions.remove(index);
            if subscriptions.is_empty() {
                listeners.remove(&when);
                events.remove(when);
            }
            removed
        };
        // the action's captures are dropped outside the lock
        drop(removed);
    }

    /// Run `action` on each instant pulled from `instants`.
    ///
    /// Only one instant is scheduled at a time: the next one is pulled after
    /// the previous action ran, so lazily generated (e.g. cron-like) sequences
    /// are never materialized. The returned stream carries the [`Expectation`]
    /// of every scheduled instant and completes when the source is exhausted or
    /// the run ends. A failing action terminates the stream with
    /// [`Signal::Error`] and halts the run.
    pub fn schedule_each<I, F>(&self, instants: I, action: F) -> Receiver<Signal<Expectation>>
    where
        I: IntoIterator<Item = Instant>,
        I::IntoIter: Send + 'static,
        F: FnMut(Instant) -> AppResult<()> + Send + 'static,
    {
        let chain = Arc::new(Mutex::new(Chain {
            scheduler: self.clone(),
            instants: Box::new(instants.into_iter()),
            action: Box::new(action),
            results: Emitter::new(),
        }));
        let results = chain.lock().results.subscribe();
        Chain::step(&chain);
        results
    }

    /// Process events until the event list is exhausted, the horizon passes or
    /// an action fails.
    ///
    /// Returns immediately if already running (e.g. when called from inside an
    /// action). Calling it on a finished run returns that run's outcome again.
    pub fn resume(&self) -> Result<(), KernelError> {
        let started = {
            let mut state = self.inner.state.lock();
            match state.phase {
                Phase::Running => {
                    tracing::trace!("{} already running", self.inner.id);
                    return Ok(());
                }
                Phase::Finished => return state.failure.clone().map_or(Ok(()), Err),
                Phase::Idle => state.phase = Phase::Running,
            }
            tracing::info!(
                "resuming {}, t={}, #events={}",
                self.inner.id,
                state.now,
                state.events.len()
            );
            if state.visited.is_none() {
                state.visited = Some(state.now);
                Some(state.now)
            } else {
                None
            }
        };
        if let Some(start) = started {
            self.inner.time.emit(start);
        }

        while let Some((t, subscriptions, visit)) = self.advance() {
            let mut batch = subscriptions.into_iter();
            while let Some(subscription) = batch.next() {
                if let Err(error) = subscription.fire(t) {
                    batch.for_each(Subscription::discard);
                    self.halt(error.clone());
                    return Err(error);
                }
            }
            if visit {
                self.inner.time.emit(t);
            }
        }
        self.complete();
        Ok(())
    }

    /// Pop the next instant within the horizon and take its subscriptions.
    fn advance(&self) -> Option<(Instant, Vec<Subscription>, bool)> {
        let mut state = self.inner.state.lock();
        let t = state.events.pop_next()?;
        if self.inner.end.is_some_and(|end| t > end) {
            tracing::debug!("{} reached horizon before t={}", self.inner.id, t);
            return None;
        }
        debug_assert!(t >= state.now, "event list went back in time");
        state.now = t;
        let visit = state.visited != Some(t);
        state.visited = Some(t);
        let subscriptions = state.listeners.remove(&t).unwrap_or_default();
        Some((t, subscriptions, visit))
    }

    fn complete(&self) {
        let discarded = self.finish(None);
        tracing::info!(
            "completed {}, t={}, discarded {} pending subscriptions",
            self.inner.id,
            self.now(),
            discarded
        );
        self.inner.time.complete();
    }

    fn halt(&self, error: KernelError) {
        let discarded = self.finish(Some(error.clone()));
        tracing::error!(
            "halted {}: {} (discarded {} pending subscriptions)",
            self.inner.id,
            error,
            discarded
        );
        self.inner.time.fail(error);
    }

    /// Mark the run finished and discard pending subscriptions.
    fn finish(&self, failure: Option<KernelError>) -> usize {
        let listeners = {
            let mut state = self.inner.state.lock();
            state.phase = Phase::Finished;
            state.failure = failure;
            state.events.clear();
            std::mem::take(&mut state.listeners)
        };
        // actions are dropped outside the lock; their captures may notify other components
        let mut discarded = 0;
        for subscription in listeners.into_values().flatten() {
            subscription.discard();
            discarded += 1;
        }
        discarded
    }
}

impl Timed for Scheduler {
    fn scheduler(&self) -> &Scheduler {
        self
    }

    fn now(&self) -> Instant {
        Self::now(self)
    }
}

/// State of one `schedule_each` sequence.
struct Chain {
    scheduler: Scheduler,
    instants: Box<dyn Iterator<Item = Instant> + Send>,
    action: Box<dyn FnMut(Instant) -> AppResult<()> + Send>,
    results: Emitter<Expectation>,
}

impl Chain {
    /// Pull the next instant and schedule it, or complete when none remain.
    fn step(chain: &Arc<Mutex<Self>>) {
        let mut guard = chain.lock();
        let Some(t) = guard.instants.next() else {
            guard.results.complete();
            return;
        };
        let next = Arc::clone(chain);
        match guard.scheduler.schedule(t, move || Self::fire(&next, t)) {
            Ok(expectation) => guard.results.emit(expectation),
            Err(error) => {
                tracing::warn!("stopped repeating schedule: {}", error);
                guard.results.fail(error);
            }
        }
    }

    fn fire(chain: &Arc<Mutex<Self>>, t: Instant) -> AppResult<()> {
        let outcome = {
            let mut guard = chain.lock();
            (guard.action)(t)
        };
        match outcome {
            Ok(()) => {
                Self::step(chain);
                Ok(())
            }
            Err(error) => {
                chain.lock().results.fail(KernelError::ActionFailed {
                    at: t,
                    reason: format!("{error:#}"),
                });
                Err(error)
            }
        }
    }
}

impl Drop for Chain {
    fn drop(&mut self) {
        // the run ended with this sequence still pending
        self.results.complete();
    }
}
