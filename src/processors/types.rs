//! Types used in blob processing operations
//!
//! This module defines the enums and small value types shared by the
//! extraction, restoration and blob-building processors.
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::config::ConfigError;

/// Specifies the order of channels in an image buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ChannelOrder {
    /// Channel, Height, Width order (planar, as stored in a blob)
    #[default]
    CHW,
    /// Height, Width, Channel order (interleaved, as stored by image libraries)
    HWC,
}

/// Specifies the color channel order in an image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ColorOrder {
    /// Red, Green, Blue order (default for image-rs)
    RGB,
    /// Blue, Green, Red order (the native order of most Caffe-era networks)
    #[default]
    BGR,
}

/// Spatial size of an image in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageSize {
    /// Width in pixels
    pub width: usize,
    /// Height in pixels
    pub height: usize,
}

impl ImageSize {
    /// Creates a new size.
    pub fn new(width: usize, height: usize) -> Self {
        Self { width, height }
    }

    /// Maps the legacy `(-1, -1)` "do not resize" convention to `None`.
    ///
    /// Any other negative component is treated as unset as well.
    pub fn from_signed(width: i64, height: i64) -> Option<Self> {
        if width < 0 || height < 0 {
            return None;
        }
        Some(Self::new(width as usize, height as usize))
    }

    /// Returns true if either dimension is zero.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Returns the number of pixels.
    pub fn area(&self) -> usize {
        self.width * self.height
    }
}

impl std::fmt::Display for ImageSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Parses `WIDTHxHEIGHT`, e.g. `224x224`.
impl FromStr for ImageSize {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (w, h) = s
            .split_once(['x', 'X'])
            .ok_or_else(|| ConfigError::invalid(format!("size '{s}' is not WIDTHxHEIGHT")))?;
        let parse = |v: &str| {
            v.trim()
                .parse::<usize>()
                .map_err(|_| ConfigError::invalid(format!("size component '{v}' is not a number")))
        };
        Ok(Self::new(parse(w)?, parse(h)?))
    }
}

/// Mean offset added back per channel when undoing mean subtraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MeanOffset {
    /// One value shared by every channel.
    Uniform(f32),
    /// One value per channel, in blob channel order.
    PerChannel(Vec<f32>),
}

impl MeanOffset {
    /// Sentinel component used by the legacy "do not undo mean" convention.
    pub const SENTINEL: f32 = -1.0;

    /// Maps the legacy sentinel forms to `None`.
    ///
    /// Both the single value `-1` and a per-channel list whose components
    /// are all `-1` mean "disabled".
    pub fn from_sentinel(values: &[f32]) -> Option<Self> {
        match values {
            [] => None,
            _ if values.iter().all(|&v| v == Self::SENTINEL) => None,
            [single] => Some(Self::Uniform(*single)),
            _ => Some(Self::PerChannel(values.to_vec())),
        }
    }

    /// Returns the offset for `channel`.
    ///
    /// Channels beyond a per-channel list receive `0.0`.
    pub fn for_channel(&self, channel: usize) -> f32 {
        match self {
            MeanOffset::Uniform(v) => *v,
            MeanOffset::PerChannel(values) => values.get(channel).copied().unwrap_or(0.0),
        }
    }

    /// Returns every component of the offset.
    pub fn values(&self) -> &[f32] {
        match self {
            MeanOffset::Uniform(v) => std::slice::from_ref(v),
            MeanOffset::PerChannel(values) => values,
        }
    }
}

impl From<f32> for MeanOffset {
    fn from(value: f32) -> Self {
        MeanOffset::Uniform(value)
    }
}

impl From<[f32; 3]> for MeanOffset {
    fn from(values: [f32; 3]) -> Self {
        MeanOffset::PerChannel(values.to_vec())
    }
}

impl From<Vec<f32>> for MeanOffset {
    fn from(values: Vec<f32>) -> Self {
        MeanOffset::PerChannel(values)
    }
}
