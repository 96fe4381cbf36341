//! The core module of blob inspection.
//!
//! This module contains the fundamental components shared by every processor:
//! - Blob storage and strided views
//! - Configuration management
//! - Error handling
//! - Collaborator traits for forward passes and plane sinks
//!
//! It also provides re-exports of commonly used types for convenience.

pub mod blob;
pub mod config;
pub mod errors;
pub mod traits;

pub use blob::{Blob, BlobView, row_major_strides};
pub use config::{ConfigError, ConfigValidator, ConfigValidatorExt, ParallelPolicy};
pub use errors::{BlobError, BlobResult, ProcessingStage};
pub use traits::{CollectingSink, ForwardPass, PlaneLabel, PlaneSink};
