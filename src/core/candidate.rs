//! Time-windowed candidate registry.
//!
//! A [`CandidateRegistry`] indexes entities that are eligible for selection
//! during a window of simulated time, for instance women of fertile age that
//! may be picked as mothers. Candidates are sorted by their birth instant, so
//! callers can query and pick within a birth (that is, age) range.
//!
//! Membership follows the scheduler: a candidate whose window lies in the
//! future is registered when it opens, is removed when it closes, and a picked
//! candidate with a refractory period leaves the index until that period has
//! passed.

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;
use std::ops::{Bound, RangeBounds, RangeInclusive};
use std::sync::Arc;

use crossbeam_channel::Receiver;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::core::{Expectation, Scheduler, Timed};
use crate::util::stream::{Emitter, Signal};
use crate::util::time::{Duration, Instant};

/// Eligibility window `[start, end)`; `end` of `None` never closes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Window {
    start: Instant,
    end: Option<Instant>,
}

impl Window {
    /// Window from `start` up to (excluding) `end`, if any.
    pub const fn new(start: Instant, end: Option<Instant>) -> Self {
        Self { start, end }
    }

    /// Window `[start, end)`.
    pub const fn between(start: Instant, end: Instant) -> Self {
        Self::new(start, Some(end))
    }

    /// Window opening at `start` that never closes.
    pub const fn open_ended(start: Instant) -> Self {
        Self::new(start, None)
    }

    /// First eligible instant.
    pub const fn start(&self) -> Instant {
        self.start
    }

    /// First instant no longer eligible, if bounded.
    pub const fn end(&self) -> Option<Instant> {
        self.end
    }

    /// True if `t` lies inside the window.
    pub fn contains(&self, t: Instant) -> bool {
        t >= self.start && self.end.map_or(true, |end| t < end)
    }

    /// True if the window closed at or before `t`.
    pub fn has_ended(&self, t: Instant) -> bool {
        self.end.is_some_and(|end| end <= t)
    }

    /// True if the window opens after `t`.
    pub fn is_pending(&self, t: Instant) -> bool {
        self.start > t
    }
}

/// An entity that can be registered and picked.
pub trait Candidate: Clone + Eq + Hash + Send + Sync + 'static {
    /// Sort key of the index.
    fn birth(&self) -> Instant;

    /// Eligibility window; `None` is never eligible.
    fn eligibility(&self) -> Option<Window>;

    /// Period out of the index after being picked; `None` stays indexed.
    fn refractory_period(&self) -> Option<Duration>;
}

/// Two or more candidates sharing one birth instant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cluster<T> {
    members: Vec<T>,
}

impl<T: PartialEq> Cluster<T> {
    /// Cluster of two candidates.
    pub fn of(first: T, second: T) -> Self {
        Self {
            members: vec![first, second],
        }
    }

    /// Add a member.
    #[must_use]
    pub fn with(mut self, candidate: T) -> Self {
        self.members.push(candidate);
        self
    }

    /// Drop a member, if present.
    #[must_use]
    pub fn without(mut self, candidate: &T) -> Self {
        self.members.retain(|member| member != candidate);
        self
    }

    /// Members in registration order.
    pub fn members(&self) -> &[T] {
        &self.members
    }

    /// Number of members.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// True without members.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

impl<T: Clone + PartialEq> Cluster<T> {
    /// Flatten index entries into a list of candidates, clusters expanded in place.
    pub fn flatten<'a, I>(entries: I) -> Vec<T>
    where
        I: IntoIterator<Item = &'a IndexEntry<T>>,
        T: 'a,
    {
        entries
            .into_iter()
            .flat_map(IndexEntry::iter)
            .cloned()
            .collect()
    }
}

/// One key of the birth index: a bare candidate or a cluster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexEntry<T> {
    /// The only candidate with this birth instant.
    Single(T),
    /// Several candidates with this birth instant.
    Cluster(Cluster<T>),
}

impl<T: PartialEq> IndexEntry<T> {
    /// Candidates of this entry.
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        match self {
            Self::Single(candidate) => std::slice::from_ref(candidate).iter(),
            Self::Cluster(cluster) => cluster.members.iter(),
        }
    }

    /// Number of candidates in this entry.
    pub fn len(&self) -> usize {
        match self {
            Self::Single(_) => 1,
            Self::Cluster(cluster) => cluster.len(),
        }
    }

    /// Always false; entries are never empty.
    pub const fn is_empty(&self) -> bool {
        false
    }

    fn merge(self, candidate: T) -> Self {
        match self {
            Self::Single(current) => Self::Cluster(Cluster::of(current, candidate)),
            Self::Cluster(cluster) => Self::Cluster(cluster.with(candidate)),
        }
    }

    /// Remove `candidate`, collapsing a single survivor to a bare entry.
    fn without(self, candidate: &T) -> Option<Self> {
        match self {
            Self::Single(current) if current == *candidate => None,
            Self::Single(current) => Some(Self::Single(current)),
            Self::Cluster(cluster) => {
                let mut rest = cluster.without(candidate).members;
                match rest.len() {
                    0 => None,
                    1 => rest.pop().map(Self::Single),
                    _ => Some(Self::Cluster(Cluster { members: rest })),
                }
            }
        }
    }
}

/// Birth instants of everyone aged within `ages` (whole `year`s) at `now`:
/// `(now - (max + 1) * year, now - min * year]`.
pub fn birth_range_for_ages(
    now: Instant,
    ages: RangeInclusive<u32>,
    year: Duration,
) -> (Bound<Instant>, Bound<Instant>) {
    let youngest = now - year * f64::from(*ages.start());
    let oldest = now - year * (f64::from(*ages.end()) + 1.0);
    (Bound::Excluded(oldest), Bound::Included(youngest))
}

/// True if `BTreeMap::range` accepts the bounds.
fn is_valid_range<R: RangeBounds<Instant>>(range: &R) -> bool {
    match (range.start_bound(), range.end_bound()) {
        (Bound::Excluded(start), Bound::Excluded(end)) => start < end,
        (
            Bound::Included(start) | Bound::Excluded(start),
            Bound::Included(end) | Bound::Excluded(end),
        ) => start <= end,
        _ => true,
    }
}

struct RegistryState<T> {
    by_birth: BTreeMap<Instant, IndexEntry<T>>,
    /// Indexed candidates and their automatic unregistration.
    registered: HashMap<T, Option<Expectation>>,
    /// Scheduled (re-)registrations.
    pending: HashMap<T, Expectation>,
}

struct RegistryInner<T> {
    scheduler: Scheduler,
    state: Mutex<RegistryState<T>>,
    picks: Emitter<T>,
}

/// Index of time-windowed candidates. Cheap to clone; clones share state.
pub struct CandidateRegistry<T> {
    inner: Arc<RegistryInner<T>>,
}

impl<T> Clone for CandidateRegistry<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Candidate> CandidateRegistry<T> {
    /// Create an empty registry driven by `scheduler`.
    pub fn new(scheduler: &Scheduler) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                scheduler: scheduler.clone(),
                state: Mutex::new(RegistryState {
                    by_birth: BTreeMap::new(),
                    registered: HashMap::new(),
                    pending: HashMap::new(),
                }),
                picks: Emitter::new(),
            }),
        }
    }

    /// Stream of picked candidates.
    pub fn emit_picks(&self) -> Receiver<Signal<T>> {
        self.inner.picks.subscribe()
    }

    /// Number of indexed candidates.
    pub fn total(&self) -> usize {
        self.inner.state.lock().registered.len()
    }

    /// True if `candidate` is indexed.
    pub fn is_registered(&self, candidate: &T) -> bool {
        self.inner.state.lock().registered.contains_key(candidate)
    }

    /// True if a (re-)registration of `candidate` is scheduled.
    pub fn is_pending(&self, candidate: &T) -> bool {
        self.inner
            .state
            .lock()
            .pending
            .get(candidate)
            .is_some_and(|exp| !exp.is_removed())
    }

    /// Index `candidate` now, or once its window opens.
    ///
    /// No-op if it has no window, its window has closed, or it is already indexed.
    pub fn register(&self, candidate: T) {
        let now = self.inner.scheduler.now();
        let mut state = self.inner.state.lock();
        if state.pending.get(&candidate).is_some_and(Expectation::is_removed) {
            state.pending.remove(&candidate);
        }
        let Some(window) = candidate.eligibility() else {
            return;
        };
        if window.has_ended(now) {
            tracing::trace!("window of candidate born {} closed", candidate.birth());
            return;
        }
        if state.registered.contains_key(&candidate) {
            return;
        }
        if window.is_pending(now) {
            if !state.pending.contains_key(&candidate) {
                self.schedule_registration(&mut state, candidate, window.start());
            }
            return;
        }
        if let Some(previous) = state.pending.remove(&candidate) {
            previous.remove();
        }

        let expiry = window.end().and_then(|end| {
            let registry = self.clone();
            let expired = candidate.clone();
            self.inner
                .scheduler
                .schedule(end, move || {
                    registry.unregister(&expired);
                    Ok(())
                })
                .map_err(|e| tracing::warn!("no expiry for candidate: {}", e))
                .ok()
        });
        let birth = candidate.birth();
        match state.by_birth.entry(birth) {
            Entry::Vacant(entry) => {
                entry.insert(IndexEntry::Single(candidate.clone()));
            }
            Entry::Occupied(mut entry) => {
                let current = entry.get().clone();
                entry.insert(current.merge(candidate.clone()));
            }
        }
        state.registered.insert(candidate, expiry);
        tracing::trace!("registered candidate born {}, total={}", birth, state.registered.len());
    }

    /// Remove `candidate` from the index and cancel its scheduled expiry or
    /// re-registration. No-op if absent.
    pub fn unregister(&self, candidate: &T) {
        let mut state = self.inner.state.lock();
        if let Some(pending) = state.pending.remove(candidate) {
            pending.remove();
        }
        let Some(expiry) = state.registered.remove(candidate) else {
            return;
        };
        if let Some(expiry) = expiry {
            expiry.remove();
        }
        let birth = candidate.birth();
        if let Some(rest) = state
            .by_birth
            .remove(&birth)
            .and_then(|entry| entry.without(candidate))
        {
            state.by_birth.insert(birth, rest);
        }
        tracing::trace!("unregistered candidate born {}, total={}", birth, state.registered.len());
    }

    /// Register each of `candidates`.
    pub fn register_all<I: IntoIterator<Item = T>>(&self, candidates: I) {
        for candidate in candidates {
            self.register(candidate);
        }
    }

    /// Unregister each of `candidates`.
    pub fn unregister_all<'a, I>(&self, candidates: I)
    where
        I: IntoIterator<Item = &'a T>,
    {
        for candidate in candidates {
            self.unregister(candidate);
        }
    }

    /// All indexed candidates, ordered by birth.
    pub fn candidates(&self) -> Vec<T> {
        self.candidates_born_in(..)
    }

    /// Index entries with a birth instant in `range`.
    pub fn entries_born_in<R: RangeBounds<Instant>>(&self, range: R) -> Vec<IndexEntry<T>> {
        if !is_valid_range(&range) {
            return Vec::new();
        }
        let state = self.inner.state.lock();
        state.by_birth.range(range).map(|(_, entry)| entry.clone()).collect()
    }

    /// Eligible candidates with a birth instant in `range`, clusters flattened.
    pub fn candidates_born_in<R: RangeBounds<Instant>>(&self, range: R) -> Vec<T> {
        if !is_valid_range(&range) {
            return Vec::new();
        }
        let now = self.inner.scheduler.now();
        let state = self.inner.state.lock();
        state
            .by_birth
            .range(range)
            .flat_map(|(_, entry)| entry.iter())
            .filter(|candidate| {
                candidate
                    .eligibility()
                    .is_some_and(|window| window.contains(now))
            })
            .cloned()
            .collect()
    }

    /// Eligible candidates aged within `ages` whole `year`s.
    pub fn candidates_of_age(&self, ages: RangeInclusive<u32>, year: Duration) -> Vec<T> {
        self.candidates_born_in(birth_range_for_ages(self.now(), ages, year))
    }

    /// Let `selector` choose among the candidates born in `range`.
    ///
    /// `selector` receives the flattened candidates and their count, and may
    /// return `None` (it always gets an empty slice when nobody is eligible).
    pub fn pick<R, S>(&self, range: R, selector: S) -> Option<T>
    where
        R: RangeBounds<Instant>,
        S: FnOnce(&[T], usize) -> Option<T>,
    {
        let candidates = self.candidates_born_in(range);
        self.do_pick(&candidates, selector)
    }

    /// Let `selector` choose among all indexed candidates.
    pub fn pick_any<S>(&self, selector: S) -> Option<T>
    where
        S: FnOnce(&[T], usize) -> Option<T>,
    {
        let candidates = self.candidates();
        self.do_pick(&candidates, selector)
    }

    fn do_pick<S>(&self, candidates: &[T], selector: S) -> Option<T>
    where
        S: FnOnce(&[T], usize) -> Option<T>,
    {
        let picked = selector(candidates, candidates.len())?;
        let refractory = picked.refractory_period();

        // unregister before the refractory period
        if refractory.is_some() {
            self.unregister(&picked);
        }

        self.inner.picks.emit(picked.clone());

        // re-register after it, if still within the window by then
        if let Some(period) = refractory.filter(|period| period.is_finite()) {
            let now = self.now();
            let at = std::cmp::max(now, now + period);
            let mut state = self.inner.state.lock();
            self.schedule_registration(&mut state, picked.clone(), at);
        }
        Some(picked)
    }

    fn schedule_registration(&self, state: &mut RegistryState<T>, candidate: T, at: Instant) {
        let registry = self.clone();
        let deferred = candidate.clone();
        match self.inner.scheduler.schedule(at, move || {
            registry.register(deferred);
            Ok(())
        }) {
            Ok(expectation) => {
                state.pending.insert(candidate, expectation);
            }
            Err(error) => tracing::warn!("dropped registration at t={}: {}", at, error),
        }
    }
}

impl<T: Candidate> Timed for CandidateRegistry<T> {
    fn scheduler(&self) -> &Scheduler {
        &self.inner.scheduler
    }
}
