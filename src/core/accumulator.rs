//! Continuously varying quantities with threshold-crossing callbacks.
//!
//! An [`Accumulator`] tracks an amount whose evolution between instants is
//! described by an [`Integrator`]. Only changes to the amount or to the
//! integrator are stored; the amount at any instant is interpolated. Targets
//! registered with [`Accumulator::at`] are scheduled at the instant the
//! integrator predicts they are reached and are re-evaluated whenever the
//! dynamics change, so a rate change moves (or cancels) the pending crossing.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crossbeam_channel::Receiver;
use parking_lot::Mutex;

use crate::core::{Expectation, Scheduler, Timed};
use crate::util::stream::{Emitter, Signal};
use crate::util::time::{Duration, Instant};

/// Rule describing how a quantity evolves over simulated time.
pub trait Integrator: Send + Sync {
    /// Net change of the quantity over `[start, end]`.
    fn delta(&self, start: Instant, end: Instant) -> f64;

    /// The next instant (from `now`) at which the quantity has changed by
    /// `delta`, or `None` if it never does.
    fn when(&self, now: Instant, delta: f64) -> Option<Instant>;
}

/// Linear growth at a constant rate per time unit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateIntegrator {
    rate: f64,
}

impl RateIntegrator {
    /// Grow by `rate` per time unit (negative rates shrink).
    pub const fn new(rate: f64) -> Self {
        Self { rate }
    }

    /// Change per time unit.
    pub const fn rate(&self) -> f64 {
        self.rate
    }
}

impl Integrator for RateIntegrator {
    fn delta(&self, start: Instant, end: Instant) -> f64 {
        self.rate * (end - start).units()
    }

    fn when(&self, now: Instant, delta: f64) -> Option<Instant> {
        let duration = Duration::of(delta / self.rate);
        if duration.is_negative() || !duration.is_finite() {
            return None;
        }
        Some(now + duration)
    }
}

/// Handle of a registered target amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct InterceptId(u64);

/// A target amount, its consumer and the pending arrival, if any.
struct TargetIntercept {
    target: f64,
    consumer: Arc<dyn Fn(Instant) + Send + Sync>,
    next: Option<Expectation>,
}

struct AccumulatorState {
    /// Amount at `last`.
    amount: f64,
    integrator: Option<Arc<dyn Integrator>>,
    /// Instant of the last resettlement.
    last: Instant,
    intercepts: BTreeMap<InterceptId, TargetIntercept>,
    next_id: u64,
}

impl AccumulatorState {
    fn amount_at(&self, t: Instant) -> f64 {
        self.integrator
            .as_ref()
            .map_or(self.amount, |integrator| {
                self.amount + integrator.delta(self.last, t)
            })
    }
}

struct AccumulatorInner {
    scheduler: Scheduler,
    state: Mutex<AccumulatorState>,
    amounts: Emitter<f64>,
}

/// A quantity that changes continuously between scheduled events.
/// Cheap to clone; clones share state.
#[derive(Clone)]
pub struct Accumulator {
    inner: Arc<AccumulatorInner>,
}

impl fmt::Debug for Accumulator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Accumulator")
            .field("amount", &self.amount())
            .field("intercepts", &self.intercept_count())
            .finish_non_exhaustive()
    }
}

impl Accumulator {
    /// Create an accumulator holding zero, without dynamics.
    pub fn new(scheduler: &Scheduler) -> Self {
        let now = scheduler.now();
        Self {
            inner: Arc::new(AccumulatorInner {
                scheduler: scheduler.clone(),
                state: Mutex::new(AccumulatorState {
                    amount: 0.0,
                    integrator: None,
                    last: now,
                    intercepts: BTreeMap::new(),
                    next_id: 0,
                }),
                amounts: Emitter::new(),
            }),
        }
    }

    /// Create an accumulator holding `initial`, evolving by `integrator`.
    pub fn of<I>(scheduler: &Scheduler, initial: f64, integrator: I) -> Self
    where
        I: Integrator + 'static,
    {
        let result = Self::new(scheduler);
        result.set_amount(initial);
        result.set_integrator(integrator);
        result
    }

    /// Create an accumulator holding `initial`, growing at `rate` per time unit.
    pub fn with_rate(scheduler: &Scheduler, initial: f64, rate: f64) -> Self {
        Self::of(scheduler, initial, RateIntegrator::new(rate))
    }

    /// Amount at the current instant.
    pub fn amount(&self) -> f64 {
        let now = self.inner.scheduler.now();
        self.inner.state.lock().amount_at(now)
    }

    /// Stream of amounts set explicitly, by integrator swaps, or by reached targets.
    pub fn emit_amounts(&self) -> Receiver<Signal<f64>> {
        self.inner.amounts.subscribe()
    }

    /// Number of registered targets.
    pub fn intercept_count(&self) -> usize {
        self.inner.state.lock().intercepts.len()
    }

    /// Instant the target is next expected to be reached, if scheduled.
    pub fn next_crossing(&self, id: InterceptId) -> Option<Instant> {
        self.inner
            .state
            .lock()
            .intercepts
            .get(&id)
            .and_then(|intercept| intercept.next.as_ref())
            .filter(|next| !next.is_removed())
            .map(Expectation::when)
    }

    /// Replace the amount and re-evaluate every target.
    pub fn set_amount(&self, amount: f64) {
        let now = self.inner.scheduler.now();
        let mut state = self.inner.state.lock();
        self.settle(&mut state, now, amount, false);
    }

    /// Settle the current dynamics up to now, then switch to `integrator`.
    pub fn set_integrator<I>(&self, integrator: I)
    where
        I: Integrator + 'static,
    {
        let now = self.inner.scheduler.now();
        let mut state = self.inner.state.lock();
        let settled = state.amount_at(now);
        state.integrator = Some(Arc::new(integrator));
        self.settle(&mut state, now, settled, true);
    }

    /// Call `consumer` whenever the amount reaches `target`.
    ///
    /// If the target is unreachable under the current dynamics (or already
    /// reached), nothing is scheduled until the amount or integrator changes.
    pub fn at<F>(&self, target: f64, consumer: F) -> InterceptId
    where
        F: Fn(Instant) + Send + Sync + 'static,
    {
        let mut state = self.inner.state.lock();
        let id = InterceptId(state.next_id);
        state.next_id += 1;
        state.intercepts.insert(
            id,
            TargetIntercept {
                target,
                consumer: Arc::new(consumer),
                next: None,
            },
        );
        self.reschedule(&mut state, id, false);
        id
    }

    /// Forget a target, cancelling its pending arrival. Returns false if unknown.
    pub fn remove_intercept(&self, id: InterceptId) -> bool {
        let Some(intercept) = self.inner.state.lock().intercepts.remove(&id) else {
            return false;
        };
        if let Some(next) = intercept.next {
            next.remove();
        }
        true
    }

    /// Store `amount` as of `now`, publish it and re-evaluate all targets.
    ///
    /// `continuous` is set when the amount did not jump at `now`, so arrivals
    /// already due at `now` still hold.
    fn settle(&self, state: &mut AccumulatorState, now: Instant, amount: f64, continuous: bool) {
        state.amount = amount;
        state.last = now;
        self.inner.amounts.emit(amount);
        let ids: Vec<_> = state.intercepts.keys().copied().collect();
        for id in ids {
            self.reschedule(state, id, continuous);
        }
    }

    /// Cancel a target's pending arrival and schedule the next one, if any.
    ///
    /// An arrival due at `now` that has not fired yet is kept while the amount
    /// still sits at its target (always, when `keep_due` is set).
    #[allow(clippy::float_cmp)]
    fn reschedule(&self, state: &mut AccumulatorState, id: InterceptId, keep_due: bool) {
        let now = self.inner.scheduler.now();
        let current = state.amount_at(now);
        let integrator = state.integrator.clone();
        let Some(intercept) = state.intercepts.get_mut(&id) else {
            return;
        };
        if let Some(previous) = intercept.next.take() {
            let due = previous.when() == now && !previous.is_removed();
            if due && (keep_due || intercept.target == current) {
                intercept.next = Some(previous);
                return;
            }
            previous.remove();
        }
        let Some(when) = integrator.and_then(|i| i.when(now, intercept.target - current)) else {
            return;
        };
        if when <= now {
            return;
        }
        let accumulator = self.clone();
        match self.inner.scheduler.schedule(when, move || {
            accumulator.on_reached(id);
            Ok(())
        }) {
            Ok(expectation) => {
                tracing::trace!("scheduled a={} at t={}", intercept.target, when);
                intercept.next = Some(expectation);
            }
            Err(error) => {
                tracing::warn!("dropped target a={}: {}", intercept.target, error);
            }
        }
    }

    /// Snap to the exact target, notify, then look for the next crossing.
    fn on_reached(&self, id: InterceptId) {
        let now = self.inner.scheduler.now();
        let reached = {
            let mut state = self.inner.state.lock();
            let Some((target, consumer)) = state
                .intercepts
                .get(&id)
                .map(|i| (i.target, Arc::clone(&i.consumer)))
            else {
                return;
            };
            self.settle(&mut state, now, target, true);
            (target, consumer)
        };
        tracing::trace!("reached a={} at t={}", reached.0, now);
        (reached.1)(now);
        let mut state = self.inner.state.lock();
        self.reschedule(&mut state, id, false);
    }
}

impl Timed for Accumulator {
    fn scheduler(&self) -> &Scheduler {
        &self.inner.scheduler
    }
}
