//! Build a [`Scheduler`] from a [`SimulationConfig`].

use crate::config::SimulationConfig;
use crate::core::{AppResult, EventList, KernelError, Scheduler};
use crate::infra::event_list::InMemoryEventList;

type Initializer = Box<dyn FnOnce(&Scheduler) -> AppResult<()>>;

/// Builds one replication: validates the configuration, installs the event
/// list and runs the model initializer.
pub struct SchedulerBuilder {
    cfg: SimulationConfig,
    events: Option<Box<dyn EventList>>,
    initializer: Option<Initializer>,
}

impl SchedulerBuilder {
    /// Start from `cfg`.
    pub fn new(cfg: SimulationConfig) -> Self {
        Self {
            cfg,
            events: None,
            initializer: None,
        }
    }

    /// Use `events` instead of an [`InMemoryEventList`] sized from the configuration.
    #[must_use]
    pub fn with_event_list(mut self, events: Box<dyn EventList>) -> Self {
        self.events = Some(events);
        self
    }

    /// Schedule the model's first events once the scheduler exists.
    #[must_use]
    pub fn on_initialize<F>(mut self, initializer: F) -> Self
    where
        F: FnOnce(&Scheduler) -> AppResult<()> + 'static,
    {
        self.initializer = Some(Box::new(initializer));
        self
    }

    /// Validate the configuration and build the scheduler.
    pub fn build(self) -> Result<Scheduler, KernelError> {
        self.cfg.validate().map_err(KernelError::InvalidConfig)?;
        let events = self
            .events
            .unwrap_or_else(|| Box::new(InMemoryEventList::new(self.cfg.max_pending_events)));
        let scheduler =
            Scheduler::with_event_list(self.cfg.id, self.cfg.start, self.cfg.duration, events);
        if let Some(initializer) = self.initializer {
            initializer(&scheduler)
                .map_err(|e| KernelError::InitializationFailed(format!("{e:#}")))?;
        }
        tracing::info!(
            "built scheduler {} at t={}, pending={}",
            scheduler.id(),
            scheduler.now(),
            scheduler.pending_events()
        );
        Ok(scheduler)
    }
}
