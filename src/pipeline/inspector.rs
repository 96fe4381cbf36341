//! # Stage Definition: Layer Inspection
//!
//! This service is considered "Done" when it fulfills the following contract:
//!
//! - **Inputs**: a layer name (or every layer a [`ForwardPass`] reports) and a [`PlaneSink`].
//! - **Outputs**: a [`LayerReport`] per layer; every channel plane of every extracted
//!   image is handed to the sink with a [`PlaneLabel`].
//! - **Logging**: traces per-layer blob counts, skipped empty blobs and incomplete extractions.
//! - **Invariants**:
//!     - Empty blobs (zero elements) are skipped, never converted.
//!     - Planes reach the sink in layer, blob, image, channel order.
//!     - Collaborator errors are returned unchanged; no retries happen here.
//!     - A failing layer in [`LayerInspector::inspect_all`] does not stop its siblings.

use crate::core::errors::BlobError;
use crate::core::traits::{ForwardPass, PlaneLabel, PlaneSink};
use crate::processors::{BlobToImages, ExtractionStatus, InversePreprocessor};
use tracing::{debug, info, warn};

/// Summary of one inspected layer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayerReport {
    /// Layer name.
    pub layer: String,
    /// Blobs returned by the forward pass.
    pub blobs: usize,
    /// Blobs skipped because they held no elements.
    pub skipped_blobs: usize,
    /// Images extracted across all blobs.
    pub images: usize,
    /// Planes handed to the sink.
    pub planes: usize,
    /// `(blob_index, status)` for every extraction that was not complete.
    pub incomplete: Vec<(usize, ExtractionStatus)>,
}

impl LayerReport {
    fn new(layer: &str) -> Self {
        Self {
            layer: layer.to_string(),
            ..Self::default()
        }
    }

    /// Returns true if every non-empty blob was fully extracted.
    pub fn is_complete(&self) -> bool {
        self.incomplete.is_empty()
    }
}

/// Runs a network layer by layer and feeds the extracted planes to a sink.
pub struct LayerInspector<F> {
    forward: F,
    converter: BlobToImages,
    restorer: Option<InversePreprocessor>,
}

impl<F: ForwardPass> LayerInspector<F> {
    /// Creates an inspector over `forward` with the given converter.
    pub fn new(forward: F, converter: BlobToImages) -> Self {
        Self {
            forward,
            converter,
            restorer: None,
        }
    }

    /// Restores every extracted image before it reaches the sink.
    pub fn with_restore(mut self, restorer: Option<InversePreprocessor>) -> Self {
        self.restorer = restorer;
        self
    }

    /// Returns the forward-pass collaborator.
    pub fn forward_pass(&self) -> &F {
        &self.forward
    }

    /// Inspects one layer.
    ///
    /// # Errors
    ///
    /// Returns the forward pass error, or the first sink error.
    pub fn inspect_layer<S: PlaneSink>(
        &self,
        layer: &str,
        sink: &mut S,
    ) -> Result<LayerReport, BlobError> {
        let blobs = self.forward.forward(layer)?;
        let mut report = LayerReport::new(layer);
        report.blobs = blobs.len();
        debug!("Layer '{}' produced {} blobs", layer, blobs.len());

        for (blob_index, blob) in blobs.iter().enumerate() {
            if blob.is_empty() {
                debug!("Skipping empty blob {} of layer '{}'", blob_index, layer);
                report.skipped_blobs += 1;
                continue;
            }

            let extraction = self.converter.convert_blob(blob);
            if !extraction.is_complete() {
                warn!(
                    "Layer '{}' blob {} {:?}: {}",
                    layer,
                    blob_index,
                    blob.shape(),
                    extraction.status
                );
                report.incomplete.push((blob_index, extraction.status));
            }

            let images = match &self.restorer {
                Some(restorer) => restorer.restore_all(&extraction.images),
                None => extraction.images,
            };
            report.images += images.len();

            for (image_index, image) in images.iter().enumerate() {
                for (channel, plane) in image.planes().enumerate() {
                    let label = PlaneLabel::new(layer, blob_index, image_index, channel);
                    sink.accept(&label, plane)?;
                    report.planes += 1;
                }
            }
        }

        info!(
            "Layer '{}': {} images, {} planes",
            layer, report.images, report.planes
        );
        Ok(report)
    }

    /// Inspects every layer the forward pass reports, in order.
    pub fn inspect_all<S: PlaneSink>(
        &self,
        sink: &mut S,
    ) -> Vec<(String, Result<LayerReport, BlobError>)> {
        self.forward
            .layer_names()
            .into_iter()
            .map(|layer| {
                let result = self.inspect_layer(&layer, sink);
                if let Err(e) = &result {
                    warn!("Layer '{}' failed: {}", layer, e);
                }
                (layer, result)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::blob::Blob;
    use crate::core::errors::BlobResult;
    use crate::core::traits::CollectingSink;
    use crate::processors::RestoreParams;
    use ndarray::ArrayView2;

    struct FakeNetwork;

    impl ForwardPass for FakeNetwork {
        fn layer_names(&self) -> Vec<String> {
            ["data", "empty", "fc", "broken", "conv"]
                .map(String::from)
                .to_vec()
        }

        fn forward(&self, layer: &str) -> Result<Vec<Blob>, BlobError> {
            match layer {
                "data" => Ok(vec![Blob::from_fn4([2, 3, 2, 2], |n, c, h, w| {
                    (n * 1000 + c * 100 + h * 10 + w) as f32
                })]),
                "empty" => Ok(vec![Blob::from_shape_vec(&[0], Vec::new())?]),
                "fc" => Ok(vec![Blob::from_shape_vec(&[1, 10], vec![0.5; 10])?]),
                "conv" => Ok(vec![
                    Blob::from_fn4([1, 2, 1, 1], |_, c, _, _| c as f32),
                    Blob::from_shape_vec(&[1, 1, 0, 4], Vec::new())?,
                ]),
                _ => Err(BlobError::forward_pass(layer, "layer not found")),
            }
        }
    }

    #[test]
    fn test_inspect_layer_labels_every_plane() {
        let inspector = LayerInspector::new(FakeNetwork, BlobToImages::new());
        let mut sink = CollectingSink::new();
        let report = inspector.inspect_layer("data", &mut sink).unwrap();

        assert_eq!(report.blobs, 1);
        assert_eq!(report.images, 2);
        assert_eq!(report.planes, 6);
        assert!(report.is_complete());

        let (label, plane) = &sink.planes[4];
        assert_eq!(label, &PlaneLabel::new("data", 0, 1, 1));
        assert_eq!(plane[[1, 0]], 1110.0);
    }

    #[test]
    fn test_non_spatial_and_empty_blobs() {
        let inspector = LayerInspector::new(FakeNetwork, BlobToImages::new());
        let mut sink = CollectingSink::new();

        let empty = inspector.inspect_layer("empty", &mut sink).unwrap();
        assert_eq!(empty.skipped_blobs, 1);
        assert_eq!(empty.planes, 0);

        let fc = inspector.inspect_layer("fc", &mut sink).unwrap();
        assert_eq!(fc.images, 0);
        assert_eq!(fc.incomplete, vec![(0, ExtractionStatus::RankMismatch { rank: 2 })]);
        assert!(sink.planes.is_empty());
    }

    #[test]
    fn test_zero_sized_blob_does_not_affect_siblings() {
        let inspector = LayerInspector::new(FakeNetwork, BlobToImages::new());
        let mut sink = CollectingSink::new();
        let report = inspector.inspect_layer("conv", &mut sink).unwrap();
        assert_eq!(report.blobs, 2);
        assert_eq!(report.skipped_blobs, 1);
        assert_eq!(report.images, 1);
        assert_eq!(report.planes, 2);
        assert!(report.is_complete());
    }

    #[test]
    fn test_inspect_all_isolates_failures() {
        let inspector = LayerInspector::new(FakeNetwork, BlobToImages::new());
        let mut sink = CollectingSink::new();
        let results = inspector.inspect_all(&mut sink);

        let names: Vec<&str> = results.iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(names, ["data", "empty", "fc", "broken", "conv"]);
        assert!(matches!(results[3].1, Err(BlobError::ForwardPass { .. })));
        assert!(results[4].1.is_ok());
        assert_eq!(sink.planes.len(), 6 + 2);
    }

    #[test]
    fn test_restore_applies_before_sink() {
        let params = RestoreParams::new().with_scale(0.5).with_mean(1.0f32);
        let restorer = InversePreprocessor::new(params).unwrap();
        let inspector =
            LayerInspector::new(FakeNetwork, BlobToImages::new()).with_restore(Some(restorer));
        let mut sink = CollectingSink::new();
        inspector.inspect_layer("conv", &mut sink).unwrap();
        assert_eq!(sink.planes[1].1[[0, 0]], 1.0 / 0.5 + 1.0);
    }

    #[test]
    fn test_sink_error_propagates() {
        struct FailingSink;
        impl PlaneSink for FailingSink {
            fn accept(&mut self, label: &PlaneLabel, _: ArrayView2<'_, f32>) -> BlobResult<()> {
                let io = std::io::Error::other("read-only");
                Err(BlobError::sink_error(label.to_string(), io))
            }
        }

        let inspector = LayerInspector::new(FakeNetwork, BlobToImages::new());
        assert!(inspector.inspect_layer("data", &mut FailingSink).is_err());
    }
}
