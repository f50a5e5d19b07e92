//! Multi-subscriber push streams over `crossbeam-channel`.
//!
//! An [`Emitter`] fans each value out to every live subscriber. A stream ends
//! with exactly one terminal signal, either [`Signal::Completed`] or
//! [`Signal::Error`]; subscribers that arrive after termination receive that
//! terminal signal straight away, so reporting sinks attached late still learn
//! how the run ended.

use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;

use crate::core::KernelError;

/// One item of a stream.
#[derive(Debug, Clone, PartialEq)]
pub enum Signal<T> {
    /// The next value.
    Next(T),
    /// The stream failed; no further values follow.
    Error(KernelError),
    /// The stream ended normally; no further values follow.
    Completed,
}

impl<T> Signal<T> {
    /// True for `Error` and `Completed`.
    pub const fn is_terminal(&self) -> bool {
        !matches!(self, Self::Next(_))
    }

    /// The carried value, if any.
    pub fn into_next(self) -> Option<T> {
        match self {
            Self::Next(value) => Some(value),
            _ => None,
        }
    }
}

struct EmitterState<T> {
    subscribers: Vec<Sender<Signal<T>>>,
    terminal: Option<Signal<T>>,
}

/// Broadcasting source of [`Signal`]s.
pub struct Emitter<T> {
    state: Mutex<EmitterState<T>>,
}

impl<T> Default for Emitter<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Emitter<T> {
    /// Create an emitter without subscribers.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(EmitterState {
                subscribers: Vec::new(),
                terminal: None,
            }),
        }
    }

    /// True once `fail` or `complete` was called.
    pub fn is_terminated(&self) -> bool {
        self.state.lock().terminal.is_some()
    }

    /// Number of live subscribers (dropped receivers are pruned on emission).
    pub fn subscriber_count(&self) -> usize {
        self.state.lock().subscribers.len()
    }
}

impl<T: Clone> Emitter<T> {
    /// Attach a new subscriber.
    pub fn subscribe(&self) -> Receiver<Signal<T>> {
        let (tx, rx) = unbounded();
        let mut state = self.state.lock();
        match &state.terminal {
            Some(terminal) => {
                // receiver is alive; the send can't fail
                let _ = tx.send(terminal.clone());
            }
            None => state.subscribers.push(tx),
        }
        rx
    }

    /// Push a value to every subscriber. Ignored after termination.
    pub fn emit(&self, value: T) {
        let mut state = self.state.lock();
        if state.terminal.is_some() {
            return;
        }
        state
            .subscribers
            .retain(|tx| tx.send(Signal::Next(value.clone())).is_ok());
    }

    /// Terminate the stream with an error.
    pub fn fail(&self, error: KernelError) {
        self.terminate(Signal::Error(error));
    }

    /// Terminate the stream normally.
    pub fn complete(&self) {
        self.terminate(Signal::Completed);
    }

    fn terminate(&self, signal: Signal<T>) {
        let mut state = self.state.lock();
        if state.terminal.is_some() {
            return;
        }
        for tx in state.subscribers.drain(..) {
            let _ = tx.send(signal.clone());
        }
        state.terminal = Some(signal);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fan_out() {
        let emitter = Emitter::new();
        let a = emitter.subscribe();
        let b = emitter.subscribe();
        emitter.emit(1);
        emitter.emit(2);
        emitter.complete();

        for rx in [a, b] {
            let got: Vec<_> = rx.try_iter().collect();
            assert_eq!(got, vec![Signal::Next(1), Signal::Next(2), Signal::Completed]);
        }
    }

    #[test]
    fn test_dropped_subscriber_is_pruned() {
        let emitter = Emitter::new();
        let kept = emitter.subscribe();
        drop(emitter.subscribe());
        assert_eq!(emitter.subscriber_count(), 2);
        emitter.emit("x");
        assert_eq!(emitter.subscriber_count(), 1);
        assert_eq!(kept.try_recv().unwrap(), Signal::Next("x"));
    }

    #[test]
    fn test_late_subscriber_sees_terminal() {
        let emitter = Emitter::<u8>::new();
        emitter.fail(KernelError::EmptySchedule);
        emitter.emit(7);
        emitter.complete();

        let late = emitter.subscribe();
        let got: Vec<_> = late.try_iter().collect();
        assert_eq!(got, vec![Signal::Error(KernelError::EmptySchedule)]);
        assert!(emitter.is_terminated());
    }

    #[test]
    fn test_signal_helpers() {
        assert!(Signal::<u8>::Completed.is_terminal());
        assert!(!Signal::Next(1).is_terminal());
        assert_eq!(Signal::Next(3).into_next(), Some(3));
        assert_eq!(Signal::<u8>::Completed.into_next(), None);
    }
}
