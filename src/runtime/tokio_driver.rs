//! Tokio driver.

use crate::core::{AppResult, Scheduler};

/// Run `scheduler` to completion on tokio's blocking pool.
///
/// Errors if the run halted on a failed action or the blocking task panicked.
pub async fn resume_async(scheduler: &Scheduler) -> AppResult<()> {
    let scheduler = scheduler.clone();
    tokio::task::spawn_blocking(move || scheduler.resume()).await??;
    Ok(())
}
