//! Bilinear resizing of float planes.
//!
//! Sampling uses half-pixel centers with edge clamping, the convention of
//! the bilinear resize applied when images are packed into a blob without
//! cropping, so resizing back to the source size is the geometric inverse.

use crate::processors::blob_image::BlobImage;
use crate::processors::types::ImageSize;
use ndarray::{Array2, Array3, ArrayView2, Axis};

/// Source sample position for one destination coordinate.
#[derive(Debug, Clone, Copy)]
struct Tap {
    /// Lower source index.
    index: usize,
    /// Weight of `index + 1`.
    frac: f32,
}

/// Precomputes source taps along one axis.
fn compute_taps(src_len: usize, dst_len: usize) -> Vec<Tap> {
    let scale = src_len as f32 / dst_len as f32;
    (0..dst_len)
        .map(|dst| {
            let pos = (dst as f32 + 0.5) * scale - 0.5;
            let floor = pos.floor();
            if floor < 0.0 {
                Tap { index: 0, frac: 0.0 }
            } else if floor as usize >= src_len - 1 {
                Tap {
                    index: src_len - 1,
                    frac: 0.0,
                }
            } else {
                Tap {
                    index: floor as usize,
                    frac: pos - floor,
                }
            }
        })
        .collect()
}

fn resize_with_taps(plane: ArrayView2<'_, f32>, x_taps: &[Tap], y_taps: &[Tap]) -> Array2<f32> {
    let (src_h, src_w) = plane.dim();
    Array2::from_shape_fn((y_taps.len(), x_taps.len()), |(y, x)| {
        let ty = y_taps[y];
        let tx = x_taps[x];
        let y1 = (ty.index + 1).min(src_h - 1);
        let x1 = (tx.index + 1).min(src_w - 1);

        let top = plane[[ty.index, tx.index]] * (1.0 - tx.frac) + plane[[ty.index, x1]] * tx.frac;
        let bottom = plane[[y1, tx.index]] * (1.0 - tx.frac) + plane[[y1, x1]] * tx.frac;
        top * (1.0 - ty.frac) + bottom * ty.frac
    })
}

/// Resizes a single plane to `size` with bilinear interpolation.
///
/// Empty source planes or an empty target produce a zero-filled plane of
/// the target size.
pub fn resize_plane(plane: ArrayView2<'_, f32>, size: ImageSize) -> Array2<f32> {
    let (src_h, src_w) = plane.dim();
    if size.is_empty() || src_h == 0 || src_w == 0 {
        return Array2::zeros((size.height, size.width));
    }
    if (src_h, src_w) == (size.height, size.width) {
        return plane.to_owned();
    }
    let x_taps = compute_taps(src_w, size.width);
    let y_taps = compute_taps(src_h, size.height);
    resize_with_taps(plane, &x_taps, &y_taps)
}

/// Resizes every channel of `image` to `size` with bilinear interpolation.
///
/// Channel count and order are preserved; no cropping is performed.
pub fn resize_bilinear(image: &BlobImage, size: ImageSize) -> BlobImage {
    if image.size() == size {
        return image.clone();
    }
    let channels = image.channels();
    let mut output = Array3::<f32>::zeros((channels, size.height, size.width));
    if !image.is_empty() && !size.is_empty() {
        let x_taps = compute_taps(image.width(), size.width);
        let y_taps = compute_taps(image.height(), size.height);
        for (plane, mut out) in image.planes().zip(output.axis_iter_mut(Axis(0))) {
            out.assign(&resize_with_taps(plane, &x_taps, &y_taps));
        }
    }
    BlobImage::from_array(output)
}
