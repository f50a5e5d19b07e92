//! Tests for simulated time arithmetic

use std::collections::BTreeSet;

use episim_kernel::util::{Duration, Instant};

#[test]
fn test_instant_arithmetic() {
    let t = Instant::of(5.0);
    assert_eq!(t + Duration::of(2.5), Instant::of(7.5));
    assert_eq!(t - Duration::of(5.0), Instant::ZERO);
    assert_eq!(Instant::of(9.0) - t, Duration::of(4.0));
    assert_eq!(Instant::of(9.0).since(t), Duration::of(4.0));

    let mut u = t;
    u += Duration::of(1.0);
    assert_eq!(u, Instant::of(6.0));
}

#[test]
fn test_duration_scaling() {
    let year = Duration::of(365.0);
    assert_eq!(year * 2.0, Duration::of(730.0));
    assert_eq!(year / 365.0, Duration::of(1.0));
    assert_eq!(-year, Duration::of(-365.0));
    assert!((-year).is_negative());
    assert!(!Duration::ZERO.is_negative());
}

#[test]
fn test_total_order() {
    let set: BTreeSet<Instant> = [3.0, -1.0, 0.0, -0.0, 2.0]
        .into_iter()
        .map(Instant::of)
        .collect();
    let units: Vec<f64> = set.into_iter().map(Instant::units).collect();
    assert_eq!(units, vec![-1.0, 0.0, 2.0, 3.0]);
}

#[test]
fn test_serde_transparent() {
    let t: Instant = serde_json::from_str("12.5").unwrap();
    assert_eq!(t, Instant::of(12.5));
    assert_eq!(serde_json::to_string(&Duration::of(3.0)).unwrap(), "3.0");
}
