//! Tests for error types

use episim_kernel::core::KernelError;
use episim_kernel::util::Instant;

#[test]
fn test_past_scheduling_error() {
    let err = KernelError::PastScheduling {
        when: Instant::of(1.5),
        now: Instant::of(2.0),
    };
    assert_eq!(format!("{}", err), "can't schedule in past: 1.5 < now(2)");
}

#[test]
fn test_simulation_ended_error() {
    let err = KernelError::SimulationEnded("run-1".to_string());
    assert_eq!(format!("{}", err), "simulation `run-1` has ended");
}

#[test]
fn test_action_failed_error() {
    let err = KernelError::ActionFailed {
        at: Instant::of(3.0),
        reason: "boom".to_string(),
    };
    assert_eq!(format!("{}", err), "action failed at t=3: boom");
}

#[test]
fn test_empty_schedule_error() {
    assert_eq!(format!("{}", KernelError::EmptySchedule), "schedule can't be empty");
}

#[test]
fn test_invalid_domain_error() {
    let err = KernelError::InvalidDomain("t=5 past [0, 2)".into());
    assert_eq!(err.to_string(), "invalid signal domain: t=5 past [0, 2)");
}

#[test]
fn test_errors_convert_to_anyhow() {
    let err: anyhow::Error = KernelError::EventListFull("max_depth=1".into()).into();
    assert_eq!(
        err.downcast_ref::<KernelError>(),
        Some(&KernelError::EventListFull("max_depth=1".into()))
    );
}
