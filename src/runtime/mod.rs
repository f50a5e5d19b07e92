//! Drivers running a simulation off the caller's thread.

pub mod thread;
#[cfg(feature = "tokio-runtime")]
pub mod tokio_driver;

pub use thread::spawn_simulation;
#[cfg(feature = "tokio-runtime")]
pub use tokio_driver::resume_async;
