//! # Execution Layer
//!
//! The reusable bounded worker pool every batch job fans out through.

pub mod fan_out;

pub use fan_out::FanOutExecutor;
