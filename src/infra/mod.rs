//! Infrastructure adapters standing in for the external simulation engine.

pub mod event_list;
