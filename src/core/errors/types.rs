//! Core error types for blob inspection.
//!
//! This module defines the `BlobError` enum and the `ProcessingStage` enum
//! used by blob construction and the collaborator seams (forward pass and
//! plane sinks).

use thiserror::Error;

/// Enum representing the stage of blob processing an error belongs to.
///
/// Extraction and restoration never fail, so only construction and the
/// sink seam carry a stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessingStage {
    /// Error occurred while assembling a blob or image from raw buffers.
    BlobConstruction,
    /// Error occurred inside a plane sink (rendering or persistence).
    Sink,
}

impl std::fmt::Display for ProcessingStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProcessingStage::BlobConstruction => write!(f, "blob construction"),
            ProcessingStage::Sink => write!(f, "plane sink"),
        }
    }
}

/// Errors that can occur while building, inspecting or persisting blobs.
///
/// Malformed blobs handed to the converter are not errors: wrong rank and
/// degenerate planes are reported through
/// [`ExtractionStatus`](crate::processors::ExtractionStatus). This enum
/// covers construction failures and collaborator failures.
#[derive(Error, Debug)]
pub enum BlobError {
    /// Error occurred while loading an image.
    #[error("image load")]
    ImageLoad(#[source] image::ImageError),

    /// Error occurred while encoding or writing an image.
    #[error("image save to '{path}'")]
    ImageSave {
        /// Destination path.
        path: String,
        /// The underlying image error.
        #[source]
        source: image::ImageError,
    },

    /// Error occurred during processing.
    #[error("{kind} failed: {context}")]
    Processing {
        /// The stage of processing where the error occurred.
        kind: ProcessingStage,
        /// Additional context about the error.
        context: String,
        /// The underlying error that caused this error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The forward-pass collaborator failed for a layer.
    #[error("forward pass failed for layer '{layer}': {context}")]
    ForwardPass {
        /// The layer that was requested.
        layer: String,
        /// Additional context about the failure.
        context: String,
        /// The underlying error, when the collaborator supplied one.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Error indicating invalid input.
    #[error("invalid input: {message}")]
    InvalidInput {
        /// A message describing the invalid input.
        message: String,
    },

    /// Error indicating a configuration problem.
    #[error("configuration: {message}")]
    ConfigError {
        /// A message describing the configuration error.
        message: String,
    },

    /// IO error.
    #[error("io")]
    Io(#[from] std::io::Error),
}

impl From<image::ImageError> for BlobError {
    fn from(error: image::ImageError) -> Self {
        Self::ImageLoad(error)
    }
}

impl From<crate::core::config::ConfigError> for BlobError {
    fn from(error: crate::core::config::ConfigError) -> Self {
        Self::ConfigError {
            message: error.to_string(),
        }
    }
}

impl BlobError {
    /// Creates an invalid input error from a message.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Creates a forward pass error for `layer` without an underlying source.
    pub fn forward_pass(layer: impl Into<String>, context: impl Into<String>) -> Self {
        Self::ForwardPass {
            layer: layer.into(),
            context: context.into(),
            source: None,
        }
    }

    /// Wraps an error raised by a forward-pass collaborator.
    pub fn forward_pass_error(
        layer: impl Into<String>,
        context: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::ForwardPass {
            layer: layer.into(),
            context: context.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Wraps an error raised while a sink rendered or stored a plane.
    pub fn sink_error(
        context: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Processing {
            kind: ProcessingStage::Sink,
            context: context.into(),
            source: Box::new(source),
        }
    }

    /// Wraps an ndarray shape error with the operation and shapes involved.
    ///
    /// # Arguments
    ///
    /// * `operation` - Short name of the failing operation
    /// * `expected` - The shape that was requested
    /// * `actual_len` - The number of elements actually available
    /// * `source` - The underlying shape error
    pub fn tensor_operation(
        operation: &str,
        expected: &[usize],
        actual_len: usize,
        source: ndarray::ShapeError,
    ) -> Self {
        Self::Processing {
            kind: ProcessingStage::BlobConstruction,
            context: format!(
                "{operation}: shape {expected:?} does not fit {actual_len} elements"
            ),
            source: Box::new(source),
        }
    }
}
