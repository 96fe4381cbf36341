//! The multi-channel float image produced from one batch element of a blob.

use crate::core::errors::{BlobError, BlobResult};
use crate::processors::types::{ChannelOrder, ImageSize};
use image::Rgb32FImage;
use ndarray::{Array3, ArrayView2, ArrayView3, Axis};

/// One batch element of a blob: `C` dense `f32` planes of `H × W`.
///
/// Values are raw network outputs: unnormalized, possibly negative and
/// far outside any displayable range. Data is stored planar (`C×H×W`).
#[derive(Debug, Clone, PartialEq)]
pub struct BlobImage {
    planes: Array3<f32>,
}

impl BlobImage {
    /// Creates an image from planar (`C×H×W`) data.
    ///
    /// # Errors
    ///
    /// Returns an error if `data.len() != channels * height * width`.
    pub fn from_planar(
        channels: usize,
        height: usize,
        width: usize,
        data: Vec<f32>,
    ) -> BlobResult<Self> {
        let expected = channels * height * width;
        if data.len() != expected {
            return Err(BlobError::invalid_input(format!(
                "planar image {channels}x{height}x{width} needs {expected} values, got {}",
                data.len()
            )));
        }
        let shape = [channels, height, width];
        let planes = Array3::from_shape_vec(shape, data)
            .map_err(|e| BlobError::tensor_operation("image_from_planar", &shape, expected, e))?;
        Ok(Self { planes })
    }

    /// Creates an image from an owned `C×H×W` array.
    pub fn from_array(planes: Array3<f32>) -> Self {
        let planes = if planes.is_standard_layout() {
            planes
        } else {
            planes.as_standard_layout().into_owned()
        };
        Self { planes }
    }

    /// Creates a 3-channel planar image from an RGB float image.
    pub fn from_rgb32f(image: &Rgb32FImage) -> Self {
        let (width, height) = (image.width() as usize, image.height() as usize);
        let planes = Array3::from_shape_fn((3, height, width), |(c, y, x)| {
            image.get_pixel(x as u32, y as u32).0[c]
        });
        Self { planes }
    }

    /// Number of channels.
    pub fn channels(&self) -> usize {
        self.planes.len_of(Axis(0))
    }

    /// Number of rows.
    pub fn height(&self) -> usize {
        self.planes.len_of(Axis(1))
    }

    /// Number of columns.
    pub fn width(&self) -> usize {
        self.planes.len_of(Axis(2))
    }

    /// Spatial size of the image.
    pub fn size(&self) -> ImageSize {
        ImageSize::new(self.width(), self.height())
    }

    /// Returns true if the image has no channel, row or column.
    pub fn is_empty(&self) -> bool {
        self.planes.is_empty()
    }

    /// Returns the value at `(channel, row, col)`.
    pub fn get(&self, channel: usize, row: usize, col: usize) -> Option<f32> {
        self.planes.get((channel, row, col)).copied()
    }

    /// Returns the plane of `channel`, or `None` if out of range.
    pub fn channel(&self, channel: usize) -> Option<ArrayView2<'_, f32>> {
        (channel < self.channels()).then(|| self.planes.index_axis(Axis(0), channel))
    }

    /// Iterates over channel planes in channel order.
    pub fn planes(&self) -> impl ExactSizeIterator<Item = ArrayView2<'_, f32>> + '_ {
        self.planes.outer_iter()
    }

    /// Returns the planar data as an array view.
    pub fn view(&self) -> ArrayView3<'_, f32> {
        self.planes.view()
    }

    /// Returns the planar data as a contiguous slice.
    pub fn as_planar_slice(&self) -> &[f32] {
        self.planes.as_slice().unwrap_or(&[])
    }

    /// Consumes the image and returns the `C×H×W` array.
    pub fn into_array(self) -> Array3<f32> {
        self.planes
    }

    /// Copies the data out in the requested channel order.
    pub fn to_layout(&self, order: ChannelOrder) -> Vec<f32> {
        match order {
            ChannelOrder::CHW => self.as_planar_slice().to_vec(),
            ChannelOrder::HWC => {
                let (channels, height, width) = (self.channels(), self.height(), self.width());
                let planar = self.as_planar_slice();
                let plane_len = height * width;
                let mut result = vec![0.0f32; planar.len()];
                for c in 0..channels {
                    let plane = &planar[c * plane_len..(c + 1) * plane_len];
                    for (pixel, &value) in plane.iter().enumerate() {
                        result[pixel * channels + c] = value;
                    }
                }
                result
            }
        }
    }

    /// Converts a 3-channel image into an interleaved float image.
    ///
    /// Channel 0 becomes the first pixel component; no reordering or
    /// normalization is applied.
    ///
    /// # Errors
    ///
    /// Returns an error if the image does not have exactly 3 channels.
    pub fn to_rgb32f(&self) -> BlobResult<Rgb32FImage> {
        if self.channels() != 3 {
            return Err(BlobError::invalid_input(format!(
                "expected 3 channels for an RGB image, got {}",
                self.channels()
            )));
        }
        let (width, height) = (self.width() as u32, self.height() as u32);
        Rgb32FImage::from_raw(width, height, self.to_layout(ChannelOrder::HWC)).ok_or_else(|| {
            BlobError::invalid_input(format!("buffer does not fit a {width}x{height} RGB image"))
        })
    }

    /// Applies `f(channel, value)` to every element, returning a new image.
    pub(crate) fn map_channels(&self, f: impl Fn(usize, f32) -> f32) -> Self {
        let mut planes = self.planes.clone();
        for (c, mut plane) in planes.outer_iter_mut().enumerate() {
            plane.mapv_inplace(|v| f(c, v));
        }
        Self { planes }
    }
}
