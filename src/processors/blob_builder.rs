//! Packing input images into an NCHW blob.
//!
//! This is the forward transform that [`InversePreprocessor`] undoes: each
//! image is resized (bilinear, no crop), reordered into the network's color
//! order, mean-subtracted and scaled, then stacked along the batch axis.
//!
//! [`InversePreprocessor`]: crate::processors::InversePreprocessor

use crate::core::blob::Blob;
use crate::core::config::{ConfigError, ParallelPolicy};
use crate::core::errors::{BlobError, BlobResult};
use crate::processors::blob_image::BlobImage;
use crate::processors::resize::resize_bilinear;
use crate::processors::restoration::RestoreParams;
use crate::processors::types::{ColorOrder, ImageSize, MeanOffset};
use image::DynamicImage;
use rayon::prelude::*;
use tracing::debug;

/// Builds NCHW blobs from images.
///
/// `value = (pixel - mean[c]) * scale`, with pixels in `0.0..=255.0` and
/// `mean` given in the output color order.
#[derive(Debug, Clone)]
pub struct BlobBuilder {
    scale: f32,
    size: Option<ImageSize>,
    mean: [f32; 3],
    color_order: ColorOrder,
    policy: ParallelPolicy,
}

impl Default for BlobBuilder {
    fn default() -> Self {
        Self {
            scale: 1.0,
            size: None,
            mean: [0.0; 3],
            color_order: ColorOrder::BGR,
            policy: ParallelPolicy::default(),
        }
    }
}

impl BlobBuilder {
    /// Creates a builder with scale 1, zero mean, BGR output and no resize.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the multiplicative factor.
    pub fn scale(mut self, scale: f32) -> Self {
        self.scale = scale;
        self
    }

    /// Sets the spatial size every image is resized to.
    pub fn size(mut self, size: ImageSize) -> Self {
        self.size = Some(size);
        self
    }

    /// Sets the per-channel mean, in output color order.
    pub fn mean(mut self, mean: [f32; 3]) -> Self {
        self.mean = mean;
        self
    }

    /// Sets the output color order.
    pub fn color_order(mut self, color_order: ColorOrder) -> Self {
        self.color_order = color_order;
        self
    }

    /// Sets the parallel policy used for large batches.
    pub fn with_policy(mut self, policy: ParallelPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Returns the parameters that undo this transform for an image whose
    /// original size was `original_size`.
    pub fn inverse_params(&self, original_size: Option<ImageSize>) -> RestoreParams {
        RestoreParams {
            scale: Some(self.scale),
            mean: Some(MeanOffset::PerChannel(self.mean.to_vec())),
            target_size: original_size,
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !(self.scale.is_finite() && self.scale > 0.0) {
            return Err(ConfigError::invalid(format!(
                "scale must be finite and greater than 0, got {}",
                self.scale
            )));
        }
        if let Some(size) = self.size
            && size.is_empty()
        {
            return Err(ConfigError::invalid(format!(
                "blob size must be non-zero in both dimensions, got {size}"
            )));
        }
        Ok(())
    }

    /// Packs `images` into a `[N, 3, H, W]` blob.
    ///
    /// # Errors
    ///
    /// Returns an error if the builder configuration is invalid, `images`
    /// is empty, or images differ in size while no target size is set.
    pub fn build(&self, images: &[DynamicImage]) -> BlobResult<Blob> {
        self.validate()?;
        let first = images
            .first()
            .ok_or_else(|| BlobError::invalid_input("no images provided to build a blob"))?;

        let size = match self.size {
            Some(size) => size,
            None => {
                let size = ImageSize::new(first.width() as usize, first.height() as usize);
                for (i, img) in images.iter().enumerate() {
                    let other = ImageSize::new(img.width() as usize, img.height() as usize);
                    if other != size {
                        return Err(BlobError::invalid_input(format!(
                            "image {i} is {other}, image 0 is {size}; set a target size"
                        )));
                    }
                }
                size
            }
        };
        if size.is_empty() {
            return Err(BlobError::invalid_input(format!(
                "cannot build a blob from empty images ({size})"
            )));
        }

        debug!(
            "Building blob of {} images at {} (scale={}, mean={:?}, {:?})",
            images.len(),
            size,
            self.scale,
            self.mean,
            self.color_order
        );

        let image_len = 3 * size.area();
        let mut data = vec![0.0f32; images.len() * image_len];
        let pack = |(img, slot): (&DynamicImage, &mut [f32])| {
            let planar = self.to_planar(img, size);
            slot.copy_from_slice(planar.as_planar_slice());
        };

        if self.policy.should_parallelize(images.len()) {
            images
                .par_iter()
                .zip(data.par_chunks_mut(image_len))
                .for_each(pack);
        } else {
            images.iter().zip(data.chunks_mut(image_len)).for_each(pack);
        }

        Blob::from_shape_vec(&[images.len(), 3, size.height, size.width], data)
    }

    /// Converts one image into its transformed planar form.
    fn to_planar(&self, img: &DynamicImage, size: ImageSize) -> BlobImage {
        let rgb = img.to_rgb8();
        let (width, height) = (rgb.width() as usize, rgb.height() as usize);

        // src_channels[c] gives the source pixel index for output channel c
        let src_channels: [usize; 3] = match self.color_order {
            ColorOrder::RGB => [0, 1, 2],
            ColorOrder::BGR => [2, 1, 0],
        };

        let planes = ndarray::Array3::from_shape_fn((3, height, width), |(c, y, x)| {
            rgb.get_pixel(x as u32, y as u32)[src_channels[c]] as f32
        });
        let resized = resize_bilinear(&BlobImage::from_array(planes), size);
        resized.map_channels(|c, v| (v - self.mean[c]) * self.scale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processors::extraction::extract_images;
    use crate::processors::restoration::InversePreprocessor;
    use image::{Rgb, RgbImage};

    fn gradient(width: u32, height: u32, offset: u8) -> DynamicImage {
        let img = RgbImage::from_fn(width, height, |x, y| {
            Rgb([
                offset.wrapping_add((x * 10) as u8),
                offset.wrapping_add((y * 20) as u8),
                offset,
            ])
        });
        DynamicImage::ImageRgb8(img)
    }

    #[test]
    fn test_bgr_order_and_mean() {
        let mut img = RgbImage::new(1, 1);
        img.put_pixel(0, 0, Rgb([10, 20, 30])); // R, G, B
        let blob = BlobBuilder::new()
            .mean([1.0, 2.0, 3.0])
            .scale(0.5)
            .build(&[DynamicImage::ImageRgb8(img.clone())])
            .unwrap();
        assert_eq!(blob.shape(), &[1, 3, 1, 1]);
        // BGR: (30-1)*0.5, (20-2)*0.5, (10-3)*0.5
        assert_eq!(blob.as_array().as_slice().unwrap(), &[14.5, 9.0, 3.5]);

        let rgb = BlobBuilder::new()
            .color_order(ColorOrder::RGB)
            .build(&[DynamicImage::ImageRgb8(img)])
            .unwrap();
        assert_eq!(rgb.as_array().as_slice().unwrap(), &[10.0, 20.0, 30.0]);
    }

    #[test]
    fn test_round_trip_with_restore() {
        let images = vec![gradient(4, 3, 0), gradient(4, 3, 50)];
        let builder = BlobBuilder::new().scale(1.0 / 255.0).mean([104.0, 117.0, 123.0]);
        let blob = builder.build(&images).unwrap();
        assert_eq!(blob.shape(), &[2, 3, 3, 4]);

        let restorer = InversePreprocessor::new(builder.inverse_params(None)).unwrap();
        let extraction = extract_images(&blob);
        assert!(extraction.is_complete());

        for (restored, source) in restorer.restore_all(&extraction.images).iter().zip(&images) {
            let rgb = source.to_rgb8();
            for y in 0..3 {
                for x in 0..4 {
                    let px = rgb.get_pixel(x, y);
                    let restored_bgr = [2, 1, 0].map(|c| {
                        restored.get(c, y as usize, x as usize).unwrap_or(f32::NAN)
                    });
                    for (c, value) in restored_bgr.iter().enumerate() {
                        let expected = px[c] as f32;
                        assert!((value - expected).abs() <= 1e-5 * expected.max(1.0));
                    }
                }
            }
        }
    }

    #[test]
    fn test_resize_then_restore_size() {
        let images = vec![gradient(6, 4, 0)];
        let builder = BlobBuilder::new().size(ImageSize::new(3, 2));
        let blob = builder.build(&images).unwrap();
        assert_eq!(blob.shape(), &[1, 3, 2, 3]);

        let restorer =
            InversePreprocessor::new(builder.inverse_params(Some(ImageSize::new(6, 4)))).unwrap();
        let restored = restorer.restore(&extract_images(&blob).images[0]);
        assert_eq!(restored.size(), ImageSize::new(6, 4));
        assert_eq!(restored.channels(), 3);
    }

    #[test]
    fn test_mismatched_sizes_without_target() {
        let images = vec![gradient(4, 3, 0), gradient(5, 3, 0)];
        assert!(BlobBuilder::new().build(&images).is_err());
        let blob = BlobBuilder::new()
            .size(ImageSize::new(4, 4))
            .build(&images)
            .unwrap();
        assert_eq!(blob.shape(), &[2, 3, 4, 4]);
    }

    #[test]
    fn test_invalid_configuration() {
        let images = vec![gradient(2, 2, 0)];
        assert!(BlobBuilder::new().scale(0.0).build(&images).is_err());
        assert!(BlobBuilder::new().build(&[]).is_err());
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let images: Vec<_> = (0..6).map(|i| gradient(3, 3, i * 7)).collect();
        let parallel = BlobBuilder::new()
            .with_policy(ParallelPolicy::new().with_utility_threshold(0))
            .build(&images)
            .unwrap();
        let sequential = BlobBuilder::new()
            .with_policy(ParallelPolicy::sequential())
            .build(&images)
            .unwrap();
        assert_eq!(parallel, sequential);
    }
}
