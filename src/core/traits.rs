//! Collaborator interfaces.
//!
//! The crate never loads networks or draws windows itself. A
//! [`ForwardPass`] supplies blobs per layer, and a [`PlaneSink`] renders or
//! stores the single-channel planes extracted from them.

use crate::core::blob::Blob;
use crate::core::errors::BlobError;
use ndarray::ArrayView2;

/// Runs a network and returns the output blobs of a named layer.
pub trait ForwardPass {
    /// Names of the layers that can be queried, in network order.
    fn layer_names(&self) -> Vec<String>;

    /// Runs the forward pass up to `layer` and returns its output blobs.
    ///
    /// Blobs of any rank may be returned; only rank-4 blobs yield images.
    fn forward(&self, layer: &str) -> Result<Vec<Blob>, BlobError>;
}

/// Identifies one channel plane handed to a [`PlaneSink`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PlaneLabel {
    /// Layer the blob came from.
    pub layer: String,
    /// Index of the blob among the layer's outputs.
    pub blob_index: usize,
    /// Batch index of the image inside the blob.
    pub image_index: usize,
    /// Channel index inside the image.
    pub channel: usize,
}

impl PlaneLabel {
    /// Creates a label.
    pub fn new(
        layer: impl Into<String>,
        blob_index: usize,
        image_index: usize,
        channel: usize,
    ) -> Self {
        Self {
            layer: layer.into(),
            blob_index,
            image_index,
            channel,
        }
    }
}

impl std::fmt::Display for PlaneLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}/{}/{}/c{}",
            self.layer, self.blob_index, self.image_index, self.channel
        )
    }
}

/// Renders or persists single-channel planes.
///
/// Any value-range normalization for display is the sink's business; planes
/// arrive with raw values.
pub trait PlaneSink {
    /// Accepts one plane.
    fn accept(&mut self, label: &PlaneLabel, plane: ArrayView2<'_, f32>) -> Result<(), BlobError>;
}

impl<S: PlaneSink + ?Sized> PlaneSink for &mut S {
    fn accept(&mut self, label: &PlaneLabel, plane: ArrayView2<'_, f32>) -> Result<(), BlobError> {
        (**self).accept(label, plane)
    }
}

/// A sink that keeps every plane in memory, in arrival order.
#[derive(Debug, Default, Clone)]
pub struct CollectingSink {
    /// Received planes with their labels.
    pub planes: Vec<(PlaneLabel, ndarray::Array2<f32>)>,
}

impl CollectingSink {
    /// Creates an empty sink.
    pub fn new() -> Self {
        Self::default()
    }
}

impl PlaneSink for CollectingSink {
    fn accept(&mut self, label: &PlaneLabel, plane: ArrayView2<'_, f32>) -> Result<(), BlobError> {
        self.planes.push((label.clone(), plane.to_owned()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_display() {
        let label = PlaneLabel::new("inception_3a/1x1", 0, 1, 12);
        assert_eq!(label.to_string(), "inception_3a/1x1/0/1/c12");
    }

    #[test]
    fn test_collecting_sink_through_reference() {
        fn feed<S: PlaneSink>(mut sink: S, plane: ArrayView2<'_, f32>) {
            sink.accept(&PlaneLabel::new("conv1", 0, 0, 0), plane).unwrap();
        }

        let mut sink = CollectingSink::new();
        let plane = ndarray::array![[1.0f32, 2.0]];
        feed(&mut sink, plane.view());
        assert_eq!(sink.planes.len(), 1);
        assert_eq!(sink.planes[0].1, plane);
    }
}
