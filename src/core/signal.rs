//! Values that vary over simulated time.
//!
//! A [`TimeSignal`] evaluates a function of the current instant over a
//! [`Domain`] and publishes every change it observes on its values stream. The
//! stream completes the first time the signal is read after its domain ended.
//! An [`Indicator`] holds a value that only changes when it is set, such as a
//! prevalence count maintained by the model.

use std::fmt;
use std::ops::{Bound, RangeBounds};
use std::sync::Arc;

use crossbeam_channel::Receiver;
use parking_lot::Mutex;

use crate::core::{KernelError, Scheduler, Timed};
use crate::util::stream::{Emitter, Signal};
use crate::util::time::Instant;

/// Interval of instants over which a signal is defined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Domain {
    lower: Bound<Instant>,
    upper: Bound<Instant>,
}

impl Domain {
    /// All of simulated time.
    pub const fn infinite() -> Self {
        Self {
            lower: Bound::Unbounded,
            upper: Bound::Unbounded,
        }
    }

    /// Domain covering `range`, e.g. `Instant::of(2.0)..Instant::of(5.0)`.
    pub fn of(range: impl RangeBounds<Instant>) -> Self {
        Self {
            lower: range.start_bound().cloned(),
            upper: range.end_bound().cloned(),
        }
    }

    /// True if the domain has not started yet at `t`.
    pub fn is_after(&self, t: Instant) -> bool {
        match self.lower {
            Bound::Included(start) => t < start,
            Bound::Excluded(start) => t <= start,
            Bound::Unbounded => false,
        }
    }

    /// True if the domain is over at `t`.
    pub fn is_before(&self, t: Instant) -> bool {
        match self.upper {
            Bound::Included(end) => t > end,
            Bound::Excluded(end) => t >= end,
            Bound::Unbounded => false,
        }
    }

    /// True if `t` lies inside the domain.
    pub fn contains(&self, t: Instant) -> bool {
        !self.is_after(t) && !self.is_before(t)
    }

    /// True if no instant lies inside the domain.
    pub fn is_empty(&self) -> bool {
        match (self.lower, self.upper) {
            (Bound::Included(start), Bound::Included(end)) => start > end,
            (Bound::Included(start) | Bound::Excluded(start), Bound::Excluded(end))
            | (Bound::Excluded(start), Bound::Included(end)) => start >= end,
            _ => false,
        }
    }

    /// Instants inside both domains.
    #[must_use]
    pub fn intersect(&self, other: &Self) -> Self {
        Self {
            lower: later_lower(self.lower, other.lower),
            upper: earlier_upper(self.upper, other.upper),
        }
    }
}

impl RangeBounds<Instant> for Domain {
    fn start_bound(&self) -> Bound<&Instant> {
        self.lower.as_ref()
    }

    fn end_bound(&self) -> Bound<&Instant> {
        self.upper.as_ref()
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.lower {
            Bound::Included(start) => write!(f, "[{start}, ")?,
            Bound::Excluded(start) => write!(f, "({start}, ")?,
            Bound::Unbounded => f.write_str("(-inf, ")?,
        }
        match self.upper {
            Bound::Included(end) => write!(f, "{end}]"),
            Bound::Excluded(end) => write!(f, "{end})"),
            Bound::Unbounded => f.write_str("+inf)"),
        }
    }
}

fn later_lower(a: Bound<Instant>, b: Bound<Instant>) -> Bound<Instant> {
    match (a, b) {
        (Bound::Unbounded, bound) | (bound, Bound::Unbounded) => bound,
        (Bound::Included(x), Bound::Included(y)) => Bound::Included(x.max(y)),
        (Bound::Excluded(x), Bound::Excluded(y)) => Bound::Excluded(x.max(y)),
        (Bound::Included(i), Bound::Excluded(e)) | (Bound::Excluded(e), Bound::Included(i)) => {
            if i > e {
                Bound::Included(i)
            } else {
                Bound::Excluded(e)
            }
        }
    }
}

fn earlier_upper(a: Bound<Instant>, b: Bound<Instant>) -> Bound<Instant> {
    match (a, b) {
        (Bound::Unbounded, bound) | (bound, Bound::Unbounded) => bound,
        (Bound::Included(x), Bound::Included(y)) => Bound::Included(x.min(y)),
        (Bound::Excluded(x), Bound::Excluded(y)) => Bound::Excluded(x.min(y)),
        (Bound::Included(i), Bound::Excluded(e)) | (Bound::Excluded(e), Bound::Included(i)) => {
            if i < e {
                Bound::Included(i)
            } else {
                Bound::Excluded(e)
            }
        }
    }
}

type Function<T> = Arc<dyn Fn(Instant) -> T + Send + Sync>;

struct SignalState<T> {
    /// Instant of the last evaluation.
    last: Option<Instant>,
    value: Option<T>,
}

struct SignalInner<T> {
    scheduler: Scheduler,
    domain: Domain,
    function: Function<T>,
    state: Mutex<SignalState<T>>,
    values: Emitter<T>,
}

/// A value defined by a function of simulated time over a [`Domain`].
/// Cheap to clone; clones share the cached value and the values stream.
pub struct TimeSignal<T> {
    inner: Arc<SignalInner<T>>,
}

impl<T> Clone for TimeSignal<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> fmt::Debug for TimeSignal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimeSignal")
            .field("domain", &self.inner.domain)
            .field("last", &self.inner.state.lock().last)
            .finish_non_exhaustive()
    }
}

impl<T> TimeSignal<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    /// Signal of `function` over `domain`. Fails if the domain is empty or
    /// already over at `scheduler.now()`.
    pub fn of<R, F>(scheduler: &Scheduler, domain: R, function: F) -> Result<Self, KernelError>
    where
        R: RangeBounds<Instant>,
        F: Fn(Instant) -> T + Send + Sync + 'static,
    {
        Self::checked(scheduler, Domain::of(domain), Arc::new(function))
    }

    /// Signal holding `value` at every instant.
    pub fn constant(scheduler: &Scheduler, value: T) -> Self {
        Self::build(scheduler, Domain::infinite(), Arc::new(move |_: Instant| value.clone()))
    }

    fn checked(scheduler: &Scheduler, domain: Domain, function: Function<T>) -> Result<Self, KernelError> {
        if domain.is_empty() {
            return Err(KernelError::InvalidDomain(format!("empty domain {domain}")));
        }
        let now = scheduler.now();
        if domain.is_before(now) {
            return Err(KernelError::InvalidDomain(format!("t={now} past {domain}")));
        }
        Ok(Self::build(scheduler, domain, function))
    }

    fn build(scheduler: &Scheduler, domain: Domain, function: Function<T>) -> Self {
        Self {
            inner: Arc::new(SignalInner {
                scheduler: scheduler.clone(),
                domain,
                function,
                state: Mutex::new(SignalState {
                    last: None,
                    value: None,
                }),
                values: Emitter::new(),
            }),
        }
    }

    /// Interval over which the signal is defined.
    pub fn domain(&self) -> Domain {
        self.inner.domain
    }

    /// Value at the current instant, or `None` outside the domain.
    ///
    /// Evaluated at most once per instant. A changed value is published on
    /// [`TimeSignal::emit_values`]; the first read after the domain ended
    /// completes that stream.
    pub fn value(&self) -> Option<T> {
        let now = self.inner.scheduler.now();
        let mut state = self.inner.state.lock();
        if state.last != Some(now) {
            state.last = Some(now);
            if self.inner.domain.is_after(now) {
                state.value = None;
            } else if self.inner.domain.is_before(now) {
                state.value = None;
                if !self.inner.values.is_terminated() {
                    tracing::trace!("signal over {} ended at t={}", self.inner.domain, now);
                    self.inner.values.complete();
                }
            } else {
                let value = (self.inner.function)(now);
                if state.value.as_ref() != Some(&value) {
                    state.value = Some(value.clone());
                    self.inner.values.emit(value);
                }
            }
        }
        state.value.clone()
    }

    /// Value at `t`, or `None` outside the domain. Publishes nothing.
    pub fn value_at(&self, t: Instant) -> Option<T> {
        self.inner
            .domain
            .contains(t)
            .then(|| (self.inner.function)(t))
    }

    /// Stream of changed values observed by [`TimeSignal::value`].
    pub fn emit_values(&self) -> Receiver<Signal<T>> {
        self.inner.values.subscribe()
    }

    /// Signal of `f` applied to this signal's function, over the same domain.
    pub fn map<U, F>(&self, f: F) -> TimeSignal<U>
    where
        U: Clone + PartialEq + Send + Sync + 'static,
        F: Fn(T) -> U + Send + Sync + 'static,
    {
        let function = Arc::clone(&self.inner.function);
        TimeSignal::build(
            &self.inner.scheduler,
            self.inner.domain,
            Arc::new(move |t: Instant| f(function(t))),
        )
    }

    /// Signal combining this one with `secondary` over the intersection of
    /// their domains. Fails if that intersection is empty or already over.
    pub fn aggregate<U, F>(&self, secondary: &TimeSignal<U>, aggregator: F) -> Result<Self, KernelError>
    where
        U: Clone + PartialEq + Send + Sync + 'static,
        F: Fn(T, U) -> T + Send + Sync + 'static,
    {
        let primary = Arc::clone(&self.inner.function);
        let other = Arc::clone(&secondary.inner.function);
        Self::checked(
            &self.inner.scheduler,
            self.inner.domain.intersect(&secondary.inner.domain),
            Arc::new(move |t: Instant| aggregator(primary(t), other(t))),
        )
    }
}

impl<T> Timed for TimeSignal<T> {
    fn scheduler(&self) -> &Scheduler {
        &self.inner.scheduler
    }
}

struct IndicatorInner<T> {
    scheduler: Scheduler,
    value: Mutex<T>,
    values: Emitter<T>,
}

/// A time-invariant value that changes only when set.
/// Cheap to clone; clones share the value.
pub struct Indicator<T> {
    inner: Arc<IndicatorInner<T>>,
}

impl<T> Clone for Indicator<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Indicator<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Indicator")
            .field("value", &*self.inner.value.lock())
            .finish_non_exhaustive()
    }
}

impl<T> Indicator<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Indicator holding `initial`.
    pub fn new(scheduler: &Scheduler, initial: T) -> Self {
        Self {
            inner: Arc::new(IndicatorInner {
                scheduler: scheduler.clone(),
                value: Mutex::new(initial),
                values: Emitter::new(),
            }),
        }
    }

    /// Current value.
    pub fn value(&self) -> T {
        self.inner.value.lock().clone()
    }

    /// Replace the value and publish it.
    pub fn set(&self, value: T) {
        let mut current = self.inner.value.lock();
        current.clone_from(&value);
        self.inner.values.emit(value);
    }

    /// Replace the value with `f(current)`, publish and return it.
    pub fn update<F>(&self, f: F) -> T
    where
        F: FnOnce(&T) -> T,
    {
        let mut current = self.inner.value.lock();
        let next = f(&current);
        current.clone_from(&next);
        self.inner.values.emit(next.clone());
        next
    }

    /// Stream of every value set.
    pub fn emit_values(&self) -> Receiver<Signal<T>> {
        self.inner.values.subscribe()
    }

    /// True if the current value lies in `range`.
    pub fn is_within<R>(&self, range: R) -> bool
    where
        T: PartialOrd,
        R: RangeBounds<T>,
    {
        range.contains(&*self.inner.value.lock())
    }

    /// Signal over all of time that reads this indicator.
    pub fn as_signal(&self) -> TimeSignal<T>
    where
        T: PartialEq,
    {
        let inner = Arc::clone(&self.inner);
        TimeSignal::build(
            &self.inner.scheduler,
            Domain::infinite(),
            Arc::new(move |_: Instant| inner.value.lock().clone()),
        )
    }
}

impl<T> Timed for Indicator<T> {
    fn scheduler(&self) -> &Scheduler {
        &self.inner.scheduler
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::time::Duration;

    fn at(t: f64) -> Instant {
        Instant::of(t)
    }

    #[test]
    fn test_domain_bounds() {
        let domain = Domain::of(at(2.0)..at(5.0));
        assert!(domain.is_after(at(1.9)));
        assert!(domain.contains(at(2.0)));
        assert!(domain.contains(at(4.9)));
        assert!(domain.is_before(at(5.0)));
        assert!(!Domain::of(at(2.0)..=at(5.0)).is_before(at(5.0)));
        assert!(Domain::infinite().contains(at(-1e9)));
    }

    #[test]
    fn test_domain_empty() {
        assert!(Domain::of(at(3.0)..at(3.0)).is_empty());
        assert!(!Domain::of(at(3.0)..=at(3.0)).is_empty());
        assert!(Domain::of(at(4.0)..=at(3.0)).is_empty());
        assert!(!Domain::of(at(4.0)..).is_empty());
    }

    #[test]
    fn test_domain_intersect() {
        let a = Domain::of(at(0.0)..=at(10.0));
        let b = Domain::of(at(5.0)..at(10.0));
        assert_eq!(a.intersect(&b), Domain::of(at(5.0)..at(10.0)));
        assert_eq!(a.intersect(&Domain::infinite()), a);
        assert!(a.intersect(&Domain::of(at(11.0)..)).is_empty());
        assert_eq!(a.to_string(), "[0, 10]");
        assert_eq!(Domain::of(..at(1.0)).to_string(), "(-inf, 1)");
    }

    #[test]
    fn test_of_rejects_empty_and_past_domains() {
        let scheduler = Scheduler::new("signal", at(5.0), None);
        let past = TimeSignal::of(&scheduler, at(0.0)..at(5.0), |_| 1).unwrap_err();
        assert_eq!(past, KernelError::InvalidDomain("t=5 past [0, 5)".into()));
        let empty = TimeSignal::of(&scheduler, at(8.0)..at(6.0), |_| 1).unwrap_err();
        assert!(matches!(empty, KernelError::InvalidDomain(_)));
        assert!(TimeSignal::of(&scheduler, at(0.0)..=at(5.0), |_| 1).is_ok());
    }

    #[test]
    fn test_value_at_outside_domain() {
        let scheduler = Scheduler::new("signal", Instant::ZERO, None);
        let signal = TimeSignal::of(&scheduler, at(2.0)..at(4.0), |t: Instant| t.units() * 10.0).unwrap();
        assert_eq!(signal.value_at(at(1.0)), None);
        assert_eq!(signal.value_at(at(3.0)), Some(30.0));
        assert_eq!(signal.value_at(at(4.0)), None);
        // not started at t=0
        assert_eq!(signal.value(), None);
    }

    #[test]
    fn test_constant_and_map() {
        let scheduler = Scheduler::new("signal", Instant::ZERO, Some(Duration::of(1.0)));
        let constant = TimeSignal::constant(&scheduler, 3_u32);
        assert_eq!(constant.value(), Some(3));
        assert_eq!(constant.domain(), Domain::infinite());
        let doubled = constant.map(|v| v * 2);
        assert_eq!(doubled.value(), Some(6));
        assert_eq!(doubled.now(), Instant::ZERO);
    }

    #[test]
    fn test_aggregate_intersects_domains() {
        let scheduler = Scheduler::new("signal", Instant::ZERO, None);
        let base = TimeSignal::of(&scheduler, at(0.0)..at(10.0), |t: Instant| t.units()).unwrap();
        let boost = TimeSignal::of(&scheduler, at(5.0).., |_| 100.0).unwrap();
        let total = base.aggregate(&boost, |a, b| a + b).unwrap();
        assert_eq!(total.domain(), Domain::of(at(5.0)..at(10.0)));
        assert_eq!(total.value_at(at(6.0)), Some(106.0));
        assert_eq!(total.value_at(at(4.0)), None);

        let disjoint = TimeSignal::of(&scheduler, at(20.0).., |_| 0.0).unwrap();
        assert!(base.aggregate(&disjoint, |a, _| a).is_err());
    }

    #[test]
    fn test_indicator_set_and_update() {
        let scheduler = Scheduler::new("indicator", Instant::ZERO, None);
        let infected = Indicator::new(&scheduler, 0_u32);
        let values = infected.emit_values();
        infected.set(4);
        assert_eq!(infected.update(|n| n + 1), 5);
        assert_eq!(infected.value(), 5);
        assert!(infected.is_within(1..=5));
        assert!(!infected.is_within(..5));

        let got: Vec<_> = values.try_iter().filter_map(Signal::into_next).collect();
        assert_eq!(got, vec![4, 5]);
    }
}
