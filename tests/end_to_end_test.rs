//! End-to-end runs of a small model.
//!
//! A replication starts at 5h and lasts 5h, with actions at 6h, 7h, 8h and
//! 9h. It is driven inline, on a dedicated thread and through tokio.

use std::sync::Arc;

use episim_kernel::builders::SchedulerBuilder;
use episim_kernel::config::SimulationConfig;
use episim_kernel::core::{Scheduler, Timed};
use episim_kernel::runtime::spawn_simulation;
use episim_kernel::util::{init_tracing, Duration, Instant, Signal};
use parking_lot::Mutex;

const HOUR: f64 = 1.0;

type Log = Arc<Mutex<Vec<Instant>>>;

fn build(id: &str) -> (Scheduler, Log) {
    init_tracing();
    let log = Log::default();
    let sink = Arc::clone(&log);
    let cfg = SimulationConfig::new(Instant::of(5.0 * HOUR), Some(Duration::of(5.0 * HOUR)))
        .with_id(id);
    let scheduler = SchedulerBuilder::new(cfg)
        .on_initialize(move |s: &Scheduler| {
            for hour in [9.0, 6.0, 8.0, 7.0] {
                let sink = Arc::clone(&sink);
                s.at(Instant::of(hour * HOUR))?.call_with(
                    move |t: Instant| {
                        sink.lock().push(t);
                        Ok(())
                    },
                    Instant::of(hour * HOUR),
                )?;
            }
            Ok(())
        })
        .build()
        .unwrap();
    (scheduler, log)
}

fn assert_run(time: &crossbeam_channel::Receiver<Signal<Instant>>, log: &Log) {
    let expected: Vec<_> = [6.0, 7.0, 8.0, 9.0].map(|h| Instant::of(h * HOUR)).to_vec();
    assert_eq!(*log.lock(), expected);

    let signals: Vec<_> = time.try_iter().collect();
    assert_eq!(signals.last(), Some(&Signal::Completed));
    let visited: Vec<_> = signals.into_iter().filter_map(Signal::into_next).collect();
    assert!(visited.windows(2).all(|w| w[0] < w[1]));
    assert_eq!(visited[0], Instant::of(5.0 * HOUR));
    assert_eq!(visited[1..], expected[..]);
}

#[test]
fn test_inline_run() {
    let (scheduler, log) = build("inline");
    let time = scheduler.time();
    scheduler.resume().unwrap();
    assert_run(&time, &log);
    assert!(scheduler.is_finished());
    assert_eq!(scheduler.now(), Instant::of(9.0 * HOUR));
}

#[test]
fn test_thread_run() {
    let (scheduler, log) = build("thread");
    let time = scheduler.time();
    let handle = spawn_simulation(&scheduler).unwrap();
    handle.join().unwrap().unwrap();
    assert_run(&time, &log);
}

#[test]
fn test_late_time_subscriber_sees_completion() {
    let (scheduler, _log) = build("late");
    scheduler.resume().unwrap();
    let late: Vec<_> = scheduler.time().try_iter().collect();
    assert_eq!(late, vec![Signal::Completed]);
}

#[cfg(feature = "tokio-runtime")]
#[tokio::test]
async fn test_tokio_run() {
    use episim_kernel::runtime::resume_async;

    let (scheduler, log) = build("tokio");
    let time = scheduler.time();
    resume_async(&scheduler).await.unwrap();
    assert_run(&time, &log);
}

#[cfg(feature = "tokio-runtime")]
#[tokio::test]
async fn test_tokio_run_reports_failure() {
    use episim_kernel::runtime::resume_async;

    let (scheduler, _log) = build("tokio-failure");
    scheduler
        .schedule(Instant::of(7.5 * HOUR), || anyhow::bail!("ward overflow"))
        .unwrap();
    let err = resume_async(&scheduler).await.unwrap_err();
    assert!(err.to_string().contains("ward overflow"));
}
