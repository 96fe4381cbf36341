//! blob-inspect CLI
//!
//! Packs images into an NCHW blob, pulls it back apart and writes every
//! channel plane as a PNG.
//!
//! # Usage
//!
//! ```bash
//! blob-inspect --image cat.jpg --image dog.jpg --size 224x224 --mean 104,117,123 --output planes/
//! blob-inspect --image cat.jpg --scale 0.0039 --restore --heatmap --output planes/
//! ```

mod config;

use blob_inspect::core::{Blob, BlobError, ConfigValidator, ForwardPass, ParallelPolicy};
use blob_inspect::pipeline::LayerInspector;
use blob_inspect::processors::{BlobToImages, ColorOrder, ImageSize, InversePreprocessor};
use blob_inspect::utils::PngPlaneSink;
use clap::Parser;
use config::RunConfig;
use std::path::PathBuf;
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(name = "blob-inspect")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Extract and visualize channel planes from NCHW blobs", long_about = None)]
struct Cli {
    /// Input image (repeat for a batch)
    #[arg(long = "image", required = true)]
    images: Vec<PathBuf>,

    /// Blob spatial size as WIDTHxHEIGHT; images keep their size when omitted
    #[arg(long)]
    size: Option<ImageSize>,

    /// Multiplier applied after mean subtraction
    #[arg(long, default_value_t = 1.0)]
    scale: f32,

    /// Mean subtracted per blob channel, as B,G,R or a single value
    #[arg(long, value_parser = config::parse_mean, default_value = "0")]
    mean: [f32; 3],

    /// Pack channels as RGB instead of BGR
    #[arg(long)]
    rgb: bool,

    /// Undo scale, mean and resize before writing planes
    #[arg(long)]
    restore: bool,

    /// JSON file with restore parameters, overriding the derived ones
    #[arg(long, requires = "restore")]
    params: Option<PathBuf>,

    /// Directory the PNG planes are written to
    #[arg(long, short, default_value = "planes", env = "BLOB_INSPECT_OUTPUT")]
    output: PathBuf,

    /// Write JET heatmaps instead of grayscale
    #[arg(long)]
    heatmap: bool,

    /// Number of worker threads (defaults to number of CPUs)
    #[arg(long, env = "BLOB_INSPECT_THREADS")]
    threads: Option<usize>,
}

impl Cli {
    fn into_config(self) -> RunConfig {
        RunConfig {
            images: self.images,
            size: self.size,
            scale: self.scale,
            mean: self.mean,
            color_order: if self.rgb {
                ColorOrder::RGB
            } else {
                ColorOrder::BGR
            },
            restore: self.restore,
            params: self.params,
            output: self.output,
            heatmap: self.heatmap,
            policy: ParallelPolicy::new().with_max_threads(self.threads),
        }
    }
}

/// A single-layer "network" that hands back its input blob.
struct InputLayer {
    blob: Blob,
}

impl ForwardPass for InputLayer {
    fn layer_names(&self) -> Vec<String> {
        vec!["data".to_string()]
    }

    fn forward(&self, layer: &str) -> Result<Vec<Blob>, BlobError> {
        if layer == "data" {
            Ok(vec![self.blob.clone()])
        } else {
            Err(BlobError::forward_pass(layer, "only the input layer 'data' exists"))
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    blob_inspect::utils::init_tracing();

    let config = Cli::parse().into_config();
    config.policy.validate()?;
    if config.policy.install_global_thread_pool()? {
        info!("Using {:?} worker threads", config.policy.max_threads);
    }

    let images = config
        .images
        .iter()
        .map(|path| {
            info!("Loading {}", path.display());
            image::open(path).map_err(BlobError::from)
        })
        .collect::<Result<Vec<_>, _>>()?;

    let blob = config.builder().build(&images)?;
    info!("Built blob {:?}", blob.shape());

    let restorer = if config.restore {
        let original_size = match (config.size, images.first()) {
            (Some(_), Some(first)) => Some(ImageSize::new(
                first.width() as usize,
                first.height() as usize,
            )),
            _ => None,
        };
        if original_size.is_some() && images.len() > 1 {
            warn!("Restoring every image to the size of the first input");
        }
        let params = config.restore_params(original_size)?;
        Some(InversePreprocessor::new(params)?.with_policy(config.policy.clone()))
    } else {
        None
    };

    let converter = BlobToImages::new().with_policy(config.policy.clone());
    let inspector = LayerInspector::new(InputLayer { blob }, converter).with_restore(restorer);
    let mut sink = PngPlaneSink::new(&config.output).with_heatmap(config.heatmap);

    let mut failed = 0;
    for (layer, result) in inspector.inspect_all(&mut sink) {
        match result {
            Ok(report) => info!(
                "Layer '{}': {} planes from {} images",
                layer, report.planes, report.images
            ),
            Err(e) => {
                error!("Layer '{}' failed: {}", layer, e);
                failed += 1;
            }
        }
    }

    info!(
        "Wrote {} planes to {}",
        sink.written().len(),
        config.output.display()
    );
    if failed > 0 {
        return Err(format!("{failed} layer(s) failed").into());
    }
    Ok(())
}
