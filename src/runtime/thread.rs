//! Dedicated OS thread driver.

use std::io;
use std::thread::{self, JoinHandle};

use crate::core::{KernelError, Scheduler};

/// Run `scheduler` to completion on a new thread named after its id.
///
/// Joining the handle yields the result of [`Scheduler::resume`].
pub fn spawn_simulation(scheduler: &Scheduler) -> io::Result<JoinHandle<Result<(), KernelError>>> {
    let scheduler = scheduler.clone();
    thread::Builder::new()
        .name(format!("episim-{}", scheduler.id()))
        .spawn(move || {
            tracing::debug!("simulation thread for {} started", scheduler.id());
            let result = scheduler.resume();
            tracing::debug!(
                "simulation thread for {} done, ok={}",
                scheduler.id(),
                result.is_ok()
            );
            result
        })
}
