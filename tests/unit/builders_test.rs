//! Tests for builder modules

use episim_kernel::builders::SchedulerBuilder;
use episim_kernel::config::SimulationConfig;
use episim_kernel::core::{KernelError, Scheduler};
use episim_kernel::infra::event_list::InMemoryEventList;
use episim_kernel::util::{Duration, Instant};

fn cfg() -> SimulationConfig {
    SimulationConfig::new(Instant::of(5.0), Some(Duration::of(5.0))).with_id("built")
}

#[test]
fn test_build_from_config() {
    let scheduler = SchedulerBuilder::new(cfg()).build().unwrap();
    assert_eq!(scheduler.id(), "built");
    assert_eq!(scheduler.now(), Instant::of(5.0));
    assert_eq!(scheduler.end(), Some(Instant::of(10.0)));
}

#[test]
fn test_build_rejects_invalid_config() {
    let err = SchedulerBuilder::new(cfg().with_max_pending_events(0))
        .build()
        .unwrap_err();
    assert!(matches!(err, KernelError::InvalidConfig(_)));
}

#[test]
fn test_initializer_schedules_first_events() {
    let scheduler = SchedulerBuilder::new(cfg())
        .on_initialize(|s: &Scheduler| {
            s.schedule(Instant::of(6.0), || Ok(()))?;
            s.schedule(Instant::of(7.0), || Ok(()))?;
            Ok(())
        })
        .build()
        .unwrap();
    assert_eq!(scheduler.pending_events(), 2);
}

#[test]
fn test_initializer_failure() {
    let err = SchedulerBuilder::new(cfg())
        .on_initialize(|s: &Scheduler| {
            // before the start instant
            s.schedule(Instant::of(1.0), || Ok(()))?;
            Ok(())
        })
        .build()
        .unwrap_err();
    match err {
        KernelError::InitializationFailed(reason) => {
            assert!(reason.contains("can't schedule in past"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_custom_event_list_capacity() {
    let scheduler = SchedulerBuilder::new(cfg())
        .with_event_list(Box::new(InMemoryEventList::new(1)))
        .build()
        .unwrap();
    scheduler.schedule(Instant::of(6.0), || Ok(())).unwrap();
    // same instant shares the event
    scheduler.schedule(Instant::of(6.0), || Ok(())).unwrap();
    let err = scheduler.schedule(Instant::of(7.0), || Ok(())).unwrap_err();
    assert!(matches!(err, KernelError::EventListFull(_)));
}
