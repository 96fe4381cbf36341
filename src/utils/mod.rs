//! Utility functions for blob inspection.
//!
//! This module provides logging setup and, behind the `visualization`
//! feature, helpers that turn raw planes into viewable images.

#[cfg(feature = "visualization")]
pub mod visualization;

#[cfg(feature = "visualization")]
pub use visualization::{PngPlaneSink, jet_color, normalize_to_u8, plane_to_heatmap};

/// Installs a global `tracing` subscriber.
///
/// The filter defaults to `info` and can be overridden with `RUST_LOG`.
/// Calling this more than once is harmless; later calls are ignored.
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}
