//! Error handling for blob inspection.

mod types;

pub use types::{BlobError, ProcessingStage};

/// Result alias used throughout the crate.
pub type BlobResult<T> = Result<T, BlobError>;
