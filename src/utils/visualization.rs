//! Plane rendering.
//!
//! Planes carry raw activations of arbitrary range. They are min-max
//! stretched to `0..=255` and optionally pushed through a JET colormap
//! before being written as PNG files.

use crate::core::errors::BlobError;
use crate::core::traits::{PlaneLabel, PlaneSink};
use image::{GrayImage, Luma, Rgb, RgbImage};
use ndarray::ArrayView2;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Min-max normalizes a plane into an 8-bit grayscale image.
///
/// Constant planes (and planes whose only finite values are equal) map to 0.
/// Non-finite values map to 0.
pub fn normalize_to_u8(plane: ArrayView2<'_, f32>) -> GrayImage {
    let (height, width) = plane.dim();
    let (min, max) = plane
        .iter()
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v as f64), hi.max(v as f64))
        });
    // f64 keeps the span finite for planes covering most of the f32 range
    let range = if max > min { max - min } else { 0.0 };

    GrayImage::from_fn(width as u32, height as u32, |x, y| {
        let v = plane[[y as usize, x as usize]];
        if !v.is_finite() || range == 0.0 {
            return Luma([0]);
        }
        let stretched = (v as f64 - min) / range * 255.0;
        Luma([stretched.round().clamp(0.0, 255.0) as u8])
    })
}

/// Maps an intensity to the JET colormap (dark blue through red).
pub fn jet_color(value: u8) -> Rgb<u8> {
    let x = value as f32 / 255.0;
    let channel = |center: f32| {
        let v = (1.5 - (4.0 * x - center).abs()).clamp(0.0, 1.0);
        (v * 255.0).round() as u8
    };
    Rgb([channel(3.0), channel(2.0), channel(1.0)])
}

/// Renders a plane as a JET heatmap.
pub fn plane_to_heatmap(plane: ArrayView2<'_, f32>) -> RgbImage {
    let gray = normalize_to_u8(plane);
    RgbImage::from_fn(gray.width(), gray.height(), |x, y| {
        jet_color(gray.get_pixel(x, y).0[0])
    })
}

/// A [`PlaneSink`] that writes every plane as `<label>.png` into a directory.
///
/// Distinct labels that sanitize to the same name (e.g. layers `a/b` and
/// `a_b`) get a numeric suffix instead of overwriting each other.
#[derive(Debug, Clone)]
pub struct PngPlaneSink {
    dir: PathBuf,
    heatmap: bool,
    written: Vec<PathBuf>,
    taken: HashSet<PathBuf>,
}

impl PngPlaneSink {
    /// Creates a sink writing grayscale PNGs into `dir`.
    ///
    /// The directory is created on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            heatmap: false,
            written: Vec::new(),
            taken: HashSet::new(),
        }
    }

    /// Writes JET heatmaps instead of grayscale.
    pub fn with_heatmap(mut self, heatmap: bool) -> Self {
        self.heatmap = heatmap;
        self
    }

    /// Output directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Paths written so far, in order.
    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }

    /// File name for a label: path separators and other awkward characters become `_`.
    pub fn file_name(label: &PlaneLabel) -> String {
        format!("{}.png", Self::file_stem(label))
    }

    fn file_stem(label: &PlaneLabel) -> String {
        label
            .to_string()
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '.' {
                    c
                } else {
                    '_'
                }
            })
            .collect()
    }

    /// Picks an output path for `label` that this sink has not written yet.
    fn unique_path(&self, label: &PlaneLabel) -> PathBuf {
        let path = self.dir.join(Self::file_name(label));
        if !self.taken.contains(&path) {
            return path;
        }
        let stem = Self::file_stem(label);
        let unique = (1usize..)
            .map(|n| self.dir.join(format!("{stem}-{n}.png")))
            .find(|candidate| !self.taken.contains(candidate))
            .unwrap_or(path);
        warn!(
            "Plane '{}' collides with an earlier file name, writing {}",
            label,
            unique.display()
        );
        unique
    }
}

impl PlaneSink for PngPlaneSink {
    fn accept(&mut self, label: &PlaneLabel, plane: ArrayView2<'_, f32>) -> Result<(), BlobError> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.unique_path(label);

        let saved = if self.heatmap {
            plane_to_heatmap(plane).save(&path)
        } else {
            normalize_to_u8(plane).save(&path)
        };
        saved.map_err(|source| BlobError::ImageSave {
            path: path.display().to_string(),
            source,
        })?;

        debug!("Wrote {}", path.display());
        self.taken.insert(path.clone());
        self.written.push(path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_normalize_stretches_range() {
        let plane = array![[-2.0f32, 0.0], [2.0, f32::NAN]];
        let gray = normalize_to_u8(plane.view());
        assert_eq!(gray.dimensions(), (2, 2));
        assert_eq!(gray.get_pixel(0, 0).0[0], 0);
        assert_eq!(gray.get_pixel(1, 0).0[0], 128);
        assert_eq!(gray.get_pixel(0, 1).0[0], 255);
        assert_eq!(gray.get_pixel(1, 1).0[0], 0);
    }

    #[test]
    fn test_normalize_full_f32_range() {
        let plane = array![[-3e38f32, 0.0, 3e38]];
        let gray = normalize_to_u8(plane.view());
        assert_eq!(gray.get_pixel(0, 0).0[0], 0);
        assert_eq!(gray.get_pixel(1, 0).0[0], 128);
        assert_eq!(gray.get_pixel(2, 0).0[0], 255);
    }

    #[test]
    fn test_constant_plane_is_black() {
        let plane = ndarray::Array2::<f32>::from_elem((3, 4), 7.5);
        let gray = normalize_to_u8(plane.view());
        assert!(gray.pixels().all(|p| p.0[0] == 0));
    }

    #[test]
    fn test_jet_endpoints() {
        assert_eq!(jet_color(0), Rgb([0, 0, 128]));
        assert_eq!(jet_color(255), Rgb([128, 0, 0]));
        let mid = jet_color(128);
        assert!(mid.0[1] == 255);
    }

    #[test]
    fn test_file_name_sanitizes_label() {
        let label = PlaneLabel::new("inception_3a/1x1", 0, 2, 5);
        assert_eq!(PngPlaneSink::file_name(&label), "inception_3a_1x1_0_2_c5.png");
    }

    #[test]
    fn test_sink_writes_png() {
        let dir = std::env::temp_dir().join(format!("blob-inspect-{}", std::process::id()));
        let mut sink = PngPlaneSink::new(&dir).with_heatmap(true);
        let plane = array![[0.0f32, 1.0], [2.0, 3.0]];
        sink.accept(&PlaneLabel::new("data", 0, 0, 1), plane.view()).unwrap();

        let written = sink.written()[0].clone();
        let loaded = image::open(&written).unwrap().to_rgb8();
        assert_eq!(loaded.dimensions(), (2, 2));
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_colliding_labels_get_distinct_files() {
        let dir = std::env::temp_dir().join(format!("blob-inspect-names-{}", std::process::id()));
        let mut sink = PngPlaneSink::new(&dir);
        let plane = array![[0.0f32, 1.0]];
        sink.accept(&PlaneLabel::new("a/b", 0, 0, 0), plane.view()).unwrap();
        sink.accept(&PlaneLabel::new("a_b", 0, 0, 0), plane.view()).unwrap();
        sink.accept(&PlaneLabel::new("a_b", 0, 0, 0), plane.view()).unwrap();

        let names: Vec<String> = sink
            .written()
            .iter()
            .filter_map(|p| p.file_name()?.to_str().map(String::from))
            .collect();
        assert_eq!(names, ["a_b_0_0_c0.png", "a_b_0_0_c0-1.png", "a_b_0_0_c0-2.png"]);
        assert!(sink.written().iter().all(|p| p.exists()));
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
