//! Blob processors.
//!
//! - [`extraction`]: NCHW blob → one multi-channel image per batch element
//! - [`restoration`]: undo scale, mean subtraction and resize
//! - [`blob_builder`]: the forward transform, images → NCHW blob
//! - [`resize`]: bilinear resizing shared by both directions

pub mod blob_builder;
pub mod blob_image;
pub mod extraction;
pub mod resize;
pub mod restoration;
pub mod types;

pub use blob_builder::BlobBuilder;
pub use blob_image::BlobImage;
pub use extraction::{BlobToImages, Extraction, ExtractionStatus, extract_images};
pub use resize::{resize_bilinear, resize_plane};
pub use restoration::{InversePreprocessor, RestoreParams};
pub use types::{ChannelOrder, ColorOrder, ImageSize, MeanOffset};
