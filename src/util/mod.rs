//! Utility helpers (simulated time, signal streams, telemetry).

pub mod stream;
pub mod telemetry;
pub mod time;

pub use stream::{Emitter, Signal};
pub use telemetry::init_tracing;
pub use time::{Duration, Instant};
