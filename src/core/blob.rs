//! Blob storage and the strided view the extractor reads through.
//!
//! A [`Blob`] owns the output of one forward pass in standard (row-major)
//! layout. A [`BlobView`] is a borrowed, explicitly strided window over any
//! `f32` buffer; index arithmetic is spelled out here instead of relying on
//! a numeric library's reshape or aliasing rules.

use crate::core::errors::{BlobError, BlobResult};
use ndarray::{ArrayD, ArrayView, Dimension, IxDyn};

/// Returns the row-major element strides for `shape`.
pub fn row_major_strides(shape: &[usize]) -> Vec<usize> {
    let mut strides = vec![1usize; shape.len()];
    for axis in (0..shape.len().saturating_sub(1)).rev() {
        strides[axis] = strides[axis + 1].saturating_mul(shape[axis + 1].max(1));
    }
    strides
}

/// Returns the element count of `shape`, or `None` if it overflows `isize`.
fn checked_len(shape: &[usize]) -> Option<usize> {
    if shape.contains(&0) {
        return Some(0);
    }
    shape
        .iter()
        .try_fold(1usize, |acc, &d| acc.checked_mul(d))
        .filter(|&len| len <= isize::MAX as usize)
}

/// An owned, immutable `f32` tensor as produced by a network layer.
///
/// Any rank is representable; only rank-4 blobs (`N, C, H, W`) yield
/// images.
#[derive(Debug, Clone, PartialEq)]
pub struct Blob {
    data: ArrayD<f32>,
}

impl Blob {
    /// Creates a blob from a shape and row-major data.
    ///
    /// # Errors
    ///
    /// Returns `BlobError::InvalidInput` if `data.len()` is not the product
    /// of `shape`.
    pub fn from_shape_vec(shape: &[usize], data: Vec<f32>) -> BlobResult<Self> {
        let expected = checked_len(shape).ok_or_else(|| {
            BlobError::invalid_input(format!("blob shape {shape:?} is too large"))
        })?;
        if data.len() != expected {
            return Err(BlobError::invalid_input(format!(
                "blob shape {shape:?} needs {expected} elements, got {}",
                data.len()
            )));
        }
        let array = ArrayD::from_shape_vec(IxDyn(shape), data).map_err(|e| {
            BlobError::tensor_operation("blob_from_shape_vec", shape, expected, e)
        })?;
        Ok(Self { data: array })
    }

    /// Creates a rank-4 blob whose element `(n, c, h, w)` is `f(n, c, h, w)`.
    pub fn from_fn4(
        shape: [usize; 4],
        mut f: impl FnMut(usize, usize, usize, usize) -> f32,
    ) -> Self {
        let array = ndarray::Array4::from_shape_fn(shape, |(n, c, h, w)| f(n, c, h, w));
        Self {
            data: array.into_dyn(),
        }
    }

    /// Wraps an ndarray, copying it into standard layout if needed.
    pub fn from_array<D: Dimension>(array: ndarray::Array<f32, D>) -> Self {
        let array = array.into_dyn();
        let data = if array.is_standard_layout() {
            array
        } else {
            array.as_standard_layout().into_owned()
        };
        Self { data }
    }

    /// Returns the blob's shape.
    pub fn shape(&self) -> &[usize] {
        self.data.shape()
    }

    /// Returns the number of axes.
    pub fn rank(&self) -> usize {
        self.data.ndim()
    }

    /// Returns the total number of elements.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if the blob holds no elements.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns the underlying array.
    pub fn as_array(&self) -> &ArrayD<f32> {
        &self.data
    }

    /// Returns a contiguous strided view of the blob.
    pub fn view(&self) -> BlobView<'_> {
        BlobView {
            data: self.data.as_slice().unwrap_or(&[]),
            shape: self.data.shape().to_vec(),
            strides: row_major_strides(self.data.shape()),
        }
    }
}

/// A borrowed, explicitly strided view over `f32` data.
///
/// Strides are counted in elements and are non-negative; element
/// `index` lives at `sum(index[k] * strides[k])`.
#[derive(Debug, Clone)]
pub struct BlobView<'a> {
    data: &'a [f32],
    shape: Vec<usize>,
    strides: Vec<usize>,
}

impl<'a> BlobView<'a> {
    /// Creates a view over row-major `data`.
    ///
    /// # Errors
    ///
    /// Returns `BlobError::InvalidInput` if `data.len()` is not the product of `shape`.
    pub fn contiguous(data: &'a [f32], shape: &[usize]) -> BlobResult<Self> {
        let expected = checked_len(shape).ok_or_else(|| {
            BlobError::invalid_input(format!("view shape {shape:?} is too large"))
        })?;
        if data.len() != expected {
            return Err(BlobError::invalid_input(format!(
                "view shape {shape:?} needs {expected} elements, got {}",
                data.len()
            )));
        }
        Ok(Self {
            data,
            shape: shape.to_vec(),
            strides: row_major_strides(shape),
        })
    }

    /// Creates a view with explicit element strides.
    ///
    /// # Errors
    ///
    /// Returns `BlobError::InvalidInput` if `shape` and `strides` differ in
    /// length, the element count or an offset overflows, or the furthest
    /// reachable element lies outside `data`.
    pub fn with_strides(data: &'a [f32], shape: &[usize], strides: &[usize]) -> BlobResult<Self> {
        if shape.len() != strides.len() {
            return Err(BlobError::invalid_input(format!(
                "shape {shape:?} and strides {strides:?} have different ranks"
            )));
        }
        if checked_len(shape).is_none() {
            return Err(BlobError::invalid_input(format!(
                "view shape {shape:?} is too large"
            )));
        }
        if shape.iter().all(|&d| d > 0) {
            let last = shape
                .iter()
                .zip(strides)
                .try_fold(0usize, |acc, (&d, &s)| (d - 1).checked_mul(s)?.checked_add(acc))
                .ok_or_else(|| {
                    BlobError::invalid_input(format!(
                        "strides {strides:?} for shape {shape:?} overflow the offset range"
                    ))
                })?;
            if last >= data.len() {
                return Err(BlobError::invalid_input(format!(
                    "strides {strides:?} for shape {shape:?} reach element {last}, buffer holds {}",
                    data.len()
                )));
            }
        }
        Ok(Self {
            data,
            shape: shape.to_vec(),
            strides: strides.to_vec(),
        })
    }

    /// Creates a view from an ndarray view whose memory is contiguous in
    /// some axis order (e.g. a permuted NHWC array) with non-negative strides.
    ///
    /// # Errors
    ///
    /// Returns `BlobError::InvalidInput` for negative strides or
    /// non-contiguous memory.
    pub fn from_ndarray<D: Dimension>(view: ArrayView<'a, f32, D>) -> BlobResult<Self> {
        let shape = view.shape().to_vec();
        let mut strides = Vec::with_capacity(shape.len());
        for &stride in view.strides() {
            let stride = usize::try_from(stride).map_err(|_| {
                BlobError::invalid_input("negative strides are not supported by BlobView")
            })?;
            strides.push(stride);
        }
        let data = view.to_slice_memory_order().ok_or_else(|| {
            BlobError::invalid_input("array memory is not contiguous in any axis order")
        })?;
        Self::with_strides(data, &shape, &strides)
    }

    /// Returns the view's shape.
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Returns the view's element strides.
    pub fn strides(&self) -> &[usize] {
        &self.strides
    }

    /// Returns the number of axes.
    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    /// Returns the number of addressable elements.
    pub fn len(&self) -> usize {
        checked_len(&self.shape).unwrap_or(0)
    }

    /// Returns true if the view addresses no elements.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the underlying buffer.
    pub fn data(&self) -> &'a [f32] {
        self.data
    }

    /// Returns the element at `index`, or `None` when out of range.
    pub fn get(&self, index: &[usize]) -> Option<f32> {
        if index.len() != self.shape.len() || index.iter().zip(&self.shape).any(|(i, d)| i >= d) {
            return None;
        }
        let offset: usize = index.iter().zip(&self.strides).map(|(i, s)| i * s).sum();
        self.data.get(offset).copied()
    }
}

impl<'a> From<&'a Blob> for BlobView<'a> {
    fn from(blob: &'a Blob) -> Self {
        blob.view()
    }
}
