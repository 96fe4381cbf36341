//! # blob-inspect
//!
//! Turns the 4-D `[N, C, H, W]` tensors ("blobs") produced by a neural
//! network into per-image, multi-channel images that can be inspected,
//! and undoes the usual input preprocessing (scale, mean subtraction,
//! resize) so network inputs can be viewed as the original pictures.
//!
//! ## Modules
//!
//! - [`core`]: blob storage, strided views, errors, configuration and the
//!   collaborator traits ([`ForwardPass`], [`PlaneSink`])
//! - [`processors`]: blob → image extraction, inverse preprocessing, the
//!   forward blob builder and bilinear resizing
//! - [`pipeline`]: [`LayerInspector`], which walks a network layer by layer
//!   and feeds channel planes to a sink
//! - [`utils`]: tracing setup and PNG/heatmap rendering
//!
//! ## Example
//!
//! ```
//! use blob_inspect::{Blob, InversePreprocessor, RestoreParams, extract_images};
//!
//! let blob = Blob::from_fn4([2, 3, 4, 5], |_, _, _, _| 123.0);
//! let extraction = extract_images(&blob);
//! assert!(extraction.is_complete());
//! assert_eq!(extraction.images.len(), 2);
//! assert_eq!(extraction.images[0].get(2, 3, 4), Some(123.0));
//!
//! let restorer = InversePreprocessor::new(RestoreParams::new().with_scale(0.5)).unwrap();
//! let restored = restorer.restore(&extraction.images[0]);
//! assert_eq!(restored.get(0, 0, 0), Some(246.0));
//! ```

pub mod core;
pub mod pipeline;
pub mod processors;
pub mod utils;

pub use crate::core::{
    Blob, BlobError, BlobResult, BlobView, ConfigError, ConfigValidator, ConfigValidatorExt,
    ForwardPass, ParallelPolicy, PlaneLabel, PlaneSink,
};
pub use pipeline::{LayerInspector, LayerReport};
pub use processors::{
    BlobBuilder, BlobImage, BlobToImages, ChannelOrder, ColorOrder, Extraction, ExtractionStatus,
    ImageSize, InversePreprocessor, MeanOffset, RestoreParams, extract_images,
};
