//! Error types for kernel operations.

use thiserror::Error;

use crate::util::time::Instant;

/// Errors produced by kernel components.
///
/// `Clone` so a single failure can be broadcast to every stream subscriber.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum KernelError {
    /// Requested instant lies before the current simulated time.
    #[error("can't schedule in past: {when} < now({now})")]
    PastScheduling {
        /// The rejected instant.
        when: Instant,
        /// Simulated time at the moment of the request.
        now: Instant,
    },
    /// The run has completed or halted; nothing can be scheduled any more.
    #[error("simulation `{0}` has ended")]
    SimulationEnded(String),
    /// The event list refused another pending instant.
    #[error("event list full: {0}")]
    EventListFull(String),
    /// A scheduled action returned an error or panicked.
    #[error("action failed at t={at}: {reason}")]
    ActionFailed {
        /// Instant at which the action ran.
        at: Instant,
        /// Rendered cause chain.
        reason: String,
    },
    /// The model initializer of a replication failed.
    #[error("initialization failed: {0}")]
    InitializationFailed(String),
    /// A schedule needs at least one entry.
    #[error("schedule can't be empty")]
    EmptySchedule,
    /// A signal domain is empty or already over.
    #[error("invalid signal domain: {0}")]
    InvalidDomain(String),
    /// Configuration did not validate.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for model actions, using anyhow for higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;
