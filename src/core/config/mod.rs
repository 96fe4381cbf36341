//! Configuration management for blob inspection.
//!
//! This module provides the validation traits and the shared parallelism
//! policy. Transform parameters live next to the processors that use them.

pub mod errors;
pub mod parallel;

pub use errors::{ConfigError, ConfigValidator, ConfigValidatorExt};
pub use parallel::ParallelPolicy;
