//! # Episim Kernel
//!
//! A discrete-event time-scheduling kernel for demographic and epidemic
//! simulation models.
//!
//! Model components never observe wall-clock time. A [`Scheduler`](core::Scheduler)
//! owns the simulated clock and fires scheduled actions in time order; components
//! bound to it implement [`Timed`](core::Timed) and project themselves into the
//! future with [`FutureSelf`](core::FutureSelf).
//!
//! ## Key Features
//!
//! - **Cancellable scheduling**: every scheduled action returns an
//!   [`Expectation`](core::Expectation) that can be removed before it fires
//! - **Shared instants**: all actions due at one instant share a single event
//!   list entry and fire in subscription order
//! - **Accumulators**: continuously varying quantities (driven by an
//!   [`Integrator`](core::Integrator)) with target-crossing callbacks
//! - **Signals and indicators**: time-varying values over a domain
//!   ([`TimeSignal`](core::TimeSignal)) and settable values
//!   ([`Indicator`](core::Indicator)) that publish their changes
//! - **Candidate registries**: time-windowed indexes of eligible entities,
//!   picked by an external selector with refractory re-entry
//! - **Streams**: the scheduler's instants, accumulator amounts and picks are
//!   published as [`Signal`](util::Signal) streams over crossbeam channels
//!
//! ## Example
//!
//! ```rust
//! use episim_kernel::core::{Accumulator, Scheduler, Timed};
//! use episim_kernel::util::{Duration, Instant};
//!
//! let scheduler = Scheduler::new("demo", Instant::ZERO, Some(Duration::of(20.0)));
//! let infected = Accumulator::with_rate(&scheduler, 20.0, 2.0);
//! infected.at(40.0, |t| println!("threshold reached at {t}"));
//!
//! scheduler
//!     .after(Duration::of(5.0))?
//!     .call(|| Ok(()))?;
//!
//! scheduler.resume()?;
//! assert!(scheduler.is_finished());
//! # Ok::<(), episim_kernel::core::KernelError>(())
//! ```
//!
//! For complete scenarios, see:
//! - `tests/end_to_end_test.rs` - a bounded run driven by one thread or tokio
//! - `tests/candidate_registry_test.rs` - picking mothers by age window

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Scheduler, expectations and time-driven components.
pub mod core;
/// Configuration models for simulation runs.
pub mod config;
/// Builders to construct schedulers from configuration.
pub mod builders;
/// Infrastructure adapters for event lists.
pub mod infra;
/// Drivers running a simulation on a dedicated thread or tokio.
pub mod runtime;
/// Shared utilities.
pub mod util;
