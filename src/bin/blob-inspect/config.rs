//! Run configuration assembled from the command line.

use blob_inspect::core::{ConfigValidatorExt, ParallelPolicy};
use blob_inspect::processors::{BlobBuilder, ColorOrder, ImageSize, RestoreParams};
use std::path::PathBuf;

/// Everything one inspection run needs.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub images: Vec<PathBuf>,
    pub size: Option<ImageSize>,
    pub scale: f32,
    pub mean: [f32; 3],
    pub color_order: ColorOrder,
    pub restore: bool,
    pub params: Option<PathBuf>,
    pub output: PathBuf,
    pub heatmap: bool,
    pub policy: ParallelPolicy,
}

impl RunConfig {
    /// Builder for the forward transform.
    pub fn builder(&self) -> BlobBuilder {
        let mut builder = BlobBuilder::new()
            .scale(self.scale)
            .mean(self.mean)
            .color_order(self.color_order)
            .with_policy(self.policy.clone());
        if let Some(size) = self.size {
            builder = builder.size(size);
        }
        builder
    }

    /// Restore parameters: the JSON file when given, otherwise the inverse of
    /// [`RunConfig::builder`] back to `original_size`.
    pub fn restore_params(
        &self,
        original_size: Option<ImageSize>,
    ) -> Result<RestoreParams, blob_inspect::core::ConfigError> {
        match &self.params {
            Some(path) => RestoreParams::from_json_file(path),
            None => Ok(self.builder().inverse_params(original_size)),
        }
    }
}

/// Parses `B,G,R` (or a single value used for all three channels).
pub fn parse_mean(s: &str) -> Result<[f32; 3], String> {
    let values = s
        .split(',')
        .map(|v| {
            v.trim()
                .parse::<f32>()
                .map_err(|_| format!("mean component '{}' is not a number", v.trim()))
        })
        .collect::<Result<Vec<_>, _>>()?;
    match values.as_slice() {
        &[v] => Ok([v; 3]),
        &[b, g, r] => Ok([b, g, r]),
        _ => Err(format!("expected 1 or 3 mean values, got {}", values.len())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_mean() {
        assert_eq!(parse_mean("104, 117,123").unwrap(), [104.0, 117.0, 123.0]);
        assert_eq!(parse_mean("127.5").unwrap(), [127.5; 3]);
        assert!(parse_mean("1,2").is_err());
        assert!(parse_mean("a,b,c").is_err());
    }
}
