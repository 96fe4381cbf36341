//! Extraction of per-batch-item images from NCHW blobs.
//!
//! A blob stores every batch element's channels back to back
//! (`N×C×H×W`). This module copies each batch element out into an
//! independent [`BlobImage`] through an explicit strided read, so the
//! result holds no reference to the transient blob.

use crate::core::blob::{Blob, BlobView};
use crate::core::config::ParallelPolicy;
use crate::processors::blob_image::BlobImage;
use ndarray::Array3;
use rayon::prelude::*;
use tracing::{debug, warn};

/// Why an extraction produced fewer images than the blob's batch size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionStatus {
    /// Every batch element was extracted.
    Complete,
    /// The blob is not rank 4; nothing was extracted.
    RankMismatch {
        /// Rank of the rejected blob.
        rank: usize,
    },
    /// The image for `batch_index` would hold no plane data.
    /// Images before `batch_index` were extracted.
    Degenerate {
        /// First batch index that could not be extracted.
        batch_index: usize,
        /// Channel count of the blob.
        channels: usize,
        /// Plane height of the blob.
        height: usize,
        /// Plane width of the blob.
        width: usize,
    },
}

impl std::fmt::Display for ExtractionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExtractionStatus::Complete => write!(f, "complete"),
            ExtractionStatus::RankMismatch { rank } => {
                write!(f, "expected a rank-4 blob, got rank {rank}")
            }
            ExtractionStatus::Degenerate {
                batch_index,
                channels,
                height,
                width,
            } => write!(
                f,
                "empty plane at batch index {batch_index} ({channels} channels of {height}x{width})"
            ),
        }
    }
}

/// Images extracted from one blob, with the reason extraction stopped.
///
/// A short `images` list is only a success when `status` is
/// [`ExtractionStatus::Complete`].
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    /// Extracted images, in batch order.
    pub images: Vec<BlobImage>,
    /// Outcome of the extraction.
    pub status: ExtractionStatus,
}

impl Extraction {
    fn new(images: Vec<BlobImage>, status: ExtractionStatus) -> Self {
        Self { images, status }
    }

    /// Returns true if every batch element was extracted.
    pub fn is_complete(&self) -> bool {
        self.status == ExtractionStatus::Complete
    }

    /// Number of extracted images.
    pub fn len(&self) -> usize {
        self.images.len()
    }

    /// Returns true if nothing was extracted.
    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// Discards the status and returns the images.
    pub fn into_images(self) -> Vec<BlobImage> {
        self.images
    }
}

/// Converts NCHW blobs into one multi-channel image per batch element.
///
/// Conversion never fails: a blob of the wrong rank yields no images and a
/// degenerate blob yields the images extracted before the empty plane,
/// both reported through [`ExtractionStatus`].
#[derive(Debug, Clone, Default)]
pub struct BlobToImages {
    policy: ParallelPolicy,
}

impl BlobToImages {
    /// Creates a converter with the default parallel policy.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the parallel policy used for large batches.
    pub fn with_policy(mut self, policy: ParallelPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Returns the parallel policy.
    pub fn policy(&self) -> &ParallelPolicy {
        &self.policy
    }

    /// Extracts the images of an owned blob.
    pub fn convert_blob(&self, blob: &Blob) -> Extraction {
        self.convert(&blob.view())
    }

    /// Extracts one image per batch element of `view`.
    ///
    /// Image `i` holds `view[i, c, h, w]` at `(c, h, w)`, channel order
    /// preserved and values unchanged.
    pub fn convert(&self, view: &BlobView<'_>) -> Extraction {
        let &[batch, channels, height, width] = view.shape() else {
            debug!(
                "Skipping blob of rank {} with shape {:?}",
                view.rank(),
                view.shape()
            );
            let status = ExtractionStatus::RankMismatch { rank: view.rank() };
            return Extraction::new(Vec::new(), status);
        };

        // Every batch element shares the plane geometry, so the first
        // empty plane is at index 0 whenever there is one.
        if batch > 0 && (channels == 0 || height == 0 || width == 0) {
            let status = ExtractionStatus::Degenerate {
                batch_index: 0,
                channels,
                height,
                width,
            };
            warn!("Stopping extraction early: {}", status);
            return Extraction::new(Vec::new(), status);
        }

        debug!(
            "Extracting {} images of {} channels ({}x{})",
            batch, channels, width, height
        );

        let extract = |index: usize| BlobImage::from_array(copy_batch_element(view, index));

        let images: Vec<BlobImage> = if self.policy.should_parallelize(batch) {
            (0..batch).into_par_iter().map(extract).collect()
        } else {
            (0..batch).map(extract).collect()
        };

        Extraction::new(images, ExtractionStatus::Complete)
    }
}

/// Copies batch element `index` of a rank-4 view into a planar `C×H×W` array.
fn copy_batch_element(view: &BlobView<'_>, index: usize) -> Array3<f32> {
    let shape = view.shape();
    let strides = view.strides();
    let data = view.data();
    let base = index * strides[0];
    let (s_c, s_h, s_w) = (strides[1], strides[2], strides[3]);

    Array3::from_shape_fn((shape[1], shape[2], shape[3]), |(c, h, w)| {
        data[base + c * s_c + h * s_h + w * s_w]
    })
}

/// Extracts the images of `blob` with the default converter.
pub fn extract_images(blob: &Blob) -> Extraction {
    BlobToImages::new().convert_blob(blob)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array4;

    fn indexed_blob(shape: [usize; 4]) -> Blob {
        Blob::from_fn4(shape, |i, c, h, w| (i * 1000 + c * 100 + h * 10 + w) as f32)
    }

    #[test]
    fn test_index_mapping_2x3x4x5() {
        let extraction = extract_images(&indexed_blob([2, 3, 4, 5]));
        assert!(extraction.is_complete());
        assert_eq!(extraction.len(), 2);
        for image in &extraction.images {
            assert_eq!((image.channels(), image.height(), image.width()), (3, 4, 5));
        }
        assert_eq!(extraction.images[0].get(1, 2, 3), Some(123.0));
        for (i, image) in extraction.images.iter().enumerate() {
            for c in 0..3 {
                for h in 0..4 {
                    for w in 0..5 {
                        let expected = (i * 1000 + c * 100 + h * 10 + w) as f32;
                        assert_eq!(image.get(c, h, w), Some(expected));
                    }
                }
            }
        }
    }

    #[test]
    fn test_counts_for_valid_shapes() {
        for shape in [[1, 1, 1, 1], [3, 1, 2, 2], [1, 4, 1, 7], [5, 2, 3, 1]] {
            let extraction = extract_images(&indexed_blob(shape));
            assert!(extraction.is_complete());
            assert_eq!(extraction.len(), shape[0]);
            for image in extraction.images {
                assert_eq!(image.channels(), shape[1]);
                assert_eq!(image.height(), shape[2]);
                assert_eq!(image.width(), shape[3]);
            }
        }
    }

    #[test]
    fn test_wrong_rank_yields_nothing() {
        for shape in [vec![], vec![6], vec![2, 3], vec![1, 2, 3], vec![1, 1, 2, 2, 2]] {
            let len = shape.iter().product();
            let blob = Blob::from_shape_vec(&shape, vec![1.0; len]).unwrap();
            let extraction = extract_images(&blob);
            assert!(extraction.is_empty());
            assert_eq!(
                extraction.status,
                ExtractionStatus::RankMismatch { rank: shape.len() }
            );
        }
    }

    #[test]
    fn test_zero_height_is_degenerate() {
        let blob = Blob::from_shape_vec(&[1, 1, 0, 5], Vec::new()).unwrap();
        let extraction = extract_images(&blob);
        assert!(extraction.is_empty());
        assert!(!extraction.is_complete());
        assert!(matches!(
            extraction.status,
            ExtractionStatus::Degenerate { batch_index: 0, height: 0, .. }
        ));
    }

    #[test]
    fn test_zero_channels_is_degenerate() {
        let blob = Blob::from_shape_vec(&[2, 0, 3, 3], Vec::new()).unwrap();
        let extraction = extract_images(&blob);
        assert!(extraction.is_empty());
        assert!(matches!(extraction.status, ExtractionStatus::Degenerate { channels: 0, .. }));
    }

    #[test]
    fn test_huge_extents_with_zero_width_are_degenerate() {
        let data = [1.0f32];
        let view = BlobView::with_strides(&data, &[1, 1 << 40, 1 << 40, 0], &[0, 0, 0, 0]).unwrap();
        let extraction = BlobToImages::new().convert(&view);
        assert!(extraction.is_empty());
        assert!(matches!(
            extraction.status,
            ExtractionStatus::Degenerate { batch_index: 0, width: 0, .. }
        ));
    }

    #[test]
    fn test_contiguous_view_of_collaborator_buffer() {
        let data: Vec<f32> = (0..120).map(|v| v as f32).collect();
        let view = BlobView::contiguous(&data, &[2, 3, 4, 5]).unwrap();
        let extraction = BlobToImages::new().convert(&view);
        assert!(extraction.is_complete());
        assert_eq!(extraction.images[1].get(2, 3, 4), Some(119.0));
        assert_eq!(extraction.images[0].get(1, 0, 0), Some(20.0));
    }

    #[test]
    fn test_empty_batch_is_complete() {
        let blob = Blob::from_shape_vec(&[0, 3, 4, 4], Vec::new()).unwrap();
        let extraction = extract_images(&blob);
        assert!(extraction.is_empty());
        assert!(extraction.is_complete());
    }

    #[test]
    fn test_values_pass_through_unchanged() {
        let values = vec![-1e6, 0.5, f32::MIN_POSITIVE, 3.25e7];
        let blob = Blob::from_shape_vec(&[1, 1, 2, 2], values.clone()).unwrap();
        let image = extract_images(&blob).into_images().remove(0);
        assert_eq!(image.as_planar_slice(), values.as_slice());
    }

    #[test]
    fn test_strided_view_matches_contiguous() {
        // NHWC storage read through NCHW strides
        let nhwc = Array4::from_shape_fn((2, 3, 4, 2), |(n, h, w, c)| {
            (n * 1000 + c * 100 + h * 10 + w) as f32
        });
        let view = BlobView::from_ndarray(nhwc.view().permuted_axes([0, 3, 1, 2])).unwrap();
        let strided = BlobToImages::new().convert(&view);
        let contiguous = extract_images(&indexed_blob([2, 2, 3, 4]));
        assert_eq!(strided, contiguous);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let blob = indexed_blob([9, 2, 3, 3]);
        let parallel = BlobToImages::new()
            .with_policy(ParallelPolicy::new().with_utility_threshold(0))
            .convert_blob(&blob);
        let sequential = BlobToImages::new()
            .with_policy(ParallelPolicy::sequential())
            .convert_blob(&blob);
        assert_eq!(parallel, sequential);
    }

    #[test]
    fn test_images_outlive_blob() {
        let images = {
            let blob = indexed_blob([1, 1, 2, 2]);
            extract_images(&blob).into_images()
        };
        assert_eq!(images[0].get(0, 1, 1), Some(11.0));
    }
}
