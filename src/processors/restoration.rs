//! Inverse preprocessing for images extracted from blobs.
//!
//! Blobs built from input images usually carry three forward transforms:
//! a resize, a mean subtraction and a multiplicative scale. This module
//! undoes them so an extracted image can be compared to its source.

use crate::core::config::{ConfigError, ConfigValidator, ParallelPolicy};
use crate::processors::blob_image::BlobImage;
use crate::processors::resize::resize_bilinear;
use crate::processors::types::{ImageSize, MeanOffset};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Parameters of the forward transform to undo.
///
/// Every step is optional; `None` skips it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RestoreParams {
    /// Multiplicative factor applied when the blob was built.
    #[serde(default)]
    pub scale: Option<f32>,
    /// Mean subtracted when the blob was built.
    #[serde(default)]
    pub mean: Option<MeanOffset>,
    /// Spatial size to resize back to.
    #[serde(default)]
    pub target_size: Option<ImageSize>,
}

impl RestoreParams {
    /// Creates parameters that restore nothing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the scale factor to undo.
    pub fn with_scale(mut self, scale: f32) -> Self {
        self.scale = Some(scale);
        self
    }

    /// Sets the mean to add back.
    pub fn with_mean(mut self, mean: impl Into<MeanOffset>) -> Self {
        self.mean = Some(mean.into());
        self
    }

    /// Sets the size to resize back to.
    pub fn with_target_size(mut self, size: ImageSize) -> Self {
        self.target_size = Some(size);
        self
    }

    /// Builds parameters from the legacy sentinel convention.
    ///
    /// * `scale <= 0` disables the inverse scale.
    /// * a mean of `[-1]` or all components `-1` disables the mean step.
    /// * a size with negative components, e.g. `(-1, -1)`, disables the resize.
    ///
    /// A mean that legitimately equals `-1` cannot be expressed here; build
    /// the parameters with [`RestoreParams::with_mean`] instead.
    pub fn from_sentinels(scale: f32, mean: &[f32], size: (i64, i64)) -> Self {
        Self {
            scale: (scale > 0.0).then_some(scale),
            mean: MeanOffset::from_sentinel(mean),
            target_size: ImageSize::from_signed(size.0, size.1),
        }
    }

    /// Returns true if no step is enabled.
    pub fn is_identity(&self) -> bool {
        self.scale.is_none() && self.mean.is_none() && self.target_size.is_none()
    }
}

impl ConfigValidator for RestoreParams {
    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(scale) = self.scale
            && !(scale.is_finite() && scale > 0.0)
        {
            return Err(ConfigError::invalid(format!(
                "scale must be finite and greater than 0, got {scale}"
            )));
        }

        if let Some(mean) = &self.mean {
            if mean.values().is_empty() {
                return Err(ConfigError::invalid("per-channel mean must not be empty"));
            }
            for (i, value) in mean.values().iter().enumerate() {
                if !value.is_finite() {
                    return Err(ConfigError::invalid(format!(
                        "mean value at index {i} is not finite: {value}"
                    )));
                }
            }
        }

        if let Some(size) = self.target_size
            && size.is_empty()
        {
            return Err(ConfigError::invalid(format!(
                "target size must be non-zero in both dimensions, got {size}"
            )));
        }

        Ok(())
    }

    fn get_defaults() -> Self {
        Self::default()
    }
}

/// Undoes scale, mean subtraction and resize on extracted images.
///
/// Steps run strictly in this order:
/// 1. divide every value by `scale`
/// 2. add the per-channel mean
/// 3. resize bilinearly to `target_size`, without cropping
///
/// The mean is therefore added in the unscaled value range, and
/// interpolation runs on restored intensities.
#[derive(Debug, Clone)]
pub struct InversePreprocessor {
    params: RestoreParams,
    policy: ParallelPolicy,
}

impl InversePreprocessor {
    /// Creates a preprocessor after validating `params`.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the scale is not finite and positive, the
    /// mean is empty or not finite, or the target size has a zero dimension.
    pub fn new(params: RestoreParams) -> Result<Self, ConfigError> {
        params.validate()?;
        Ok(Self {
            params,
            policy: ParallelPolicy::default(),
        })
    }

    /// Sets the parallel policy used by [`InversePreprocessor::restore_all`].
    pub fn with_policy(mut self, policy: ParallelPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Returns the parameters being undone.
    pub fn params(&self) -> &RestoreParams {
        &self.params
    }

    /// Restores one image, returning a new image.
    pub fn restore(&self, image: &BlobImage) -> BlobImage {
        let scale = self.params.scale;
        let mean = self.params.mean.as_ref();

        let restored = if scale.is_none() && mean.is_none() {
            image.clone()
        } else {
            image.map_channels(|c, v| {
                let v = match scale {
                    Some(s) => v / s,
                    None => v,
                };
                match mean {
                    Some(m) => v + m.for_channel(c),
                    None => v,
                }
            })
        };

        match self.params.target_size {
            Some(size) => {
                debug!("Resizing restored image from {} to {}", restored.size(), size);
                resize_bilinear(&restored, size)
            }
            None => restored,
        }
    }

    /// Restores every image independently, preserving order.
    pub fn restore_all(&self, images: &[BlobImage]) -> Vec<BlobImage> {
        if self.policy.should_parallelize(images.len()) {
            images.par_iter().map(|img| self.restore(img)).collect()
        } else {
            images.iter().map(|img| self.restore(img)).collect()
        }
    }
}
