//! Event list backends.

pub mod memory;

pub use memory::InMemoryEventList;
