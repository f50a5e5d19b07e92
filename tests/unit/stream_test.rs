//! Tests for signal streams

use std::thread;

use episim_kernel::util::{Emitter, Signal};

#[test]
fn test_subscriber_on_another_thread() {
    let emitter = Emitter::new();
    let rx = emitter.subscribe();
    let reader = thread::spawn(move || {
        rx.iter()
            .take_while(|signal| !signal.is_terminal())
            .filter_map(Signal::into_next)
            .sum::<u32>()
    });
    for i in 1..=10 {
        emitter.emit(i);
    }
    emitter.complete();
    assert_eq!(reader.join().unwrap(), 55);
}

#[test]
fn test_complete_is_idempotent() {
    let emitter = Emitter::<u8>::default();
    let rx = emitter.subscribe();
    emitter.complete();
    emitter.complete();
    assert_eq!(rx.try_iter().count(), 1);
    assert_eq!(emitter.subscriber_count(), 0);
}
