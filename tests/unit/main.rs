//! Unit tests for individual components

mod builders_test;
mod config_test;
mod error_test;
mod event_list_test;
mod stream_test;
mod time_test;
