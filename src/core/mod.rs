//! Core scheduling abstractions and time-driven components.

pub mod accumulator;
pub mod candidate;
pub mod error;
pub mod expectation;
pub mod schedule;
pub mod scheduler;
pub mod signal;
pub mod timed;

pub use accumulator::{Accumulator, Integrator, InterceptId, RateIntegrator};
pub use candidate::{
    birth_range_for_ages, Candidate, CandidateRegistry, Cluster, IndexEntry, Window,
};
pub use error::{AppResult, KernelError};
pub use expectation::Expectation;
pub use schedule::Schedule;
pub use scheduler::{Action, EventList, Scheduler, DEFAULT_MAX_PENDING_EVENTS};
pub use signal::{Domain, Indicator, TimeSignal};
pub use timed::{FutureSelf, Timed};
