use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Free-rectangle bookkeeping used by the bin packer.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PackingAlgorithm {
    /// Guillotine split of the chosen free rect (shorter leftover axis) with prune + merge.
    #[default]
    Guillotine,
    /// Maximal rectangles: every intersecting free rect is split, contained ones pruned.
    MaxRects,
}

impl FromStr for PackingAlgorithm {
    type Err = ();
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "guillotine" => Ok(Self::Guillotine),
            "maxrects" => Ok(Self::MaxRects),
            _ => Err(()),
        }
    }
}

/// What to do when the lossless optimizer fails on an atlas image.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum OptimizeFailurePolicy {
    /// Keep the unoptimized PNG and report the failure as a warning.
    #[default]
    Fallback,
    /// Abort the build with `AtlasError::Optimization`.
    Fail,
}

impl FromStr for OptimizeFailurePolicy {
    type Err = ();
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "fallback" => Ok(Self::Fallback),
            "fail" => Ok(Self::Fail),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AtlasConfig {
    /// Prefix joined in front of every emitted file name (e.g. `"sprites/"`).
    pub output_path: String,
    /// Maximum bin width in pixels.
    pub max_width: u32,
    /// Maximum bin height in pixels.
    pub max_height: u32,
    /// Pixels reserved between neighbouring sprites.
    pub padding: u32,
    /// Shrink each bin to the bounding box of its sprites.
    pub smart_sizing: bool,
    /// When false, final bins are square (max of both sides).
    pub allow_non_square: bool,
    /// When false, final bin sides are rounded up to a power of two.
    pub allow_non_power_of_two: bool,
    /// Number of hex digits of the content hash used in file names. None = full digest.
    pub hash_length: Option<usize>,
    pub algorithm: PackingAlgorithm,
    /// Upper bound on the number of bins. None = unbounded.
    pub max_bins: Option<usize>,
    /// Run the lossless PNG optimizer before hashing.
    pub optimize: bool,
    /// oxipng preset level (0..=6).
    pub optimization_level: u8,
    pub on_optimize_failure: OptimizeFailurePolicy,
    /// Decode and render bins on rayon when the `parallel` feature is enabled.
    pub parallel: bool,
}

impl Default for AtlasConfig {
    fn default() -> Self {
        Self {
            output_path: String::new(),
            max_width: 2048,
            max_height: 2048,
            padding: 1,
            smart_sizing: true,
            allow_non_square: true,
            allow_non_power_of_two: true,
            hash_length: None,
            algorithm: PackingAlgorithm::default(),
            max_bins: None,
            optimize: true,
            optimization_level: 2,
            on_optimize_failure: OptimizeFailurePolicy::default(),
            parallel: false,
        }
    }
}

/// Length of a full BLAKE3 hex digest.
pub const FULL_DIGEST_LEN: usize = 64;

impl AtlasConfig {
    /// Validates the configuration parameters.
    ///
    /// Rounding to a power of two or to a square must never push a bin past the
    /// configured maximum, so those constraints also restrict the maximum itself.
    pub fn validate(&self) -> crate::error::Result<()> {
        use crate::error::AtlasError;

        if self.max_width == 0 || self.max_height == 0 {
            return Err(AtlasError::InvalidDimensions {
                width: self.max_width,
                height: self.max_height,
            });
        }
        if !self.allow_non_power_of_two
            && (!self.max_width.is_power_of_two() || !self.max_height.is_power_of_two())
        {
            return Err(AtlasError::InvalidConfig(format!(
                "allow_non_power_of_two is false but the maximum bin size {}x{} is not a power of two",
                self.max_width, self.max_height
            )));
        }
        if !self.allow_non_square && self.max_width != self.max_height {
            return Err(AtlasError::InvalidConfig(format!(
                "allow_non_square is false but the maximum bin size {}x{} is not square",
                self.max_width, self.max_height
            )));
        }
        if self.max_width.checked_add(self.padding).is_none()
            || self.max_height.checked_add(self.padding).is_none()
        {
            return Err(AtlasError::InvalidConfig(format!(
                "padding {} overflows the maximum bin size {}x{}",
                self.padding, self.max_width, self.max_height
            )));
        }
        if let Some(len) = self.hash_length {
            if len == 0 || len > FULL_DIGEST_LEN {
                return Err(AtlasError::InvalidConfig(format!(
                    "hash_length must be within 1..={FULL_DIGEST_LEN}, got {len}"
                )));
            }
        }
        if self.max_bins == Some(0) {
            return Err(AtlasError::InvalidConfig(
                "max_bins must be at least 1".into(),
            ));
        }
        if self.optimization_level > 6 {
            return Err(AtlasError::InvalidConfig(format!(
                "optimization_level must be within 0..=6, got {}",
                self.optimization_level
            )));
        }
        Ok(())
    }

    /// Create a fluent builder for `AtlasConfig`.
    pub fn builder() -> AtlasConfigBuilder {
        AtlasConfigBuilder::new()
    }
}

/// Builder for `AtlasConfig` for ergonomic construction.
#[derive(Debug, Default, Clone)]
pub struct AtlasConfigBuilder {
    cfg: AtlasConfig,
}

impl AtlasConfigBuilder {
    pub fn new() -> Self {
        Self {
            cfg: AtlasConfig::default(),
        }
    }
    pub fn output_path(mut self, v: impl Into<String>) -> Self {
        self.cfg.output_path = v.into();
        self
    }
    pub fn with_max_dimensions(mut self, w: u32, h: u32) -> Self {
        self.cfg.max_width = w;
        self.cfg.max_height = h;
        self
    }
    pub fn padding(mut self, v: u32) -> Self {
        self.cfg.padding = v;
        self
    }
    pub fn smart_sizing(mut self, v: bool) -> Self {
        self.cfg.smart_sizing = v;
        self
    }
    pub fn allow_non_square(mut self, v: bool) -> Self {
        self.cfg.allow_non_square = v;
        self
    }
    pub fn allow_non_power_of_two(mut self, v: bool) -> Self {
        self.cfg.allow_non_power_of_two = v;
        self
    }
    pub fn hash_length(mut self, v: Option<usize>) -> Self {
        self.cfg.hash_length = v;
        self
    }
    pub fn algorithm(mut self, v: PackingAlgorithm) -> Self {
        self.cfg.algorithm = v;
        self
    }
    pub fn max_bins(mut self, v: Option<usize>) -> Self {
        self.cfg.max_bins = v;
        self
    }
    pub fn optimize(mut self, v: bool) -> Self {
        self.cfg.optimize = v;
        self
    }
    pub fn optimization_level(mut self, v: u8) -> Self {
        self.cfg.optimization_level = v;
        self
    }
    pub fn on_optimize_failure(mut self, v: OptimizeFailurePolicy) -> Self {
        self.cfg.on_optimize_failure = v;
        self
    }
    pub fn parallel(mut self, v: bool) -> Self {
        self.cfg.parallel = v;
        self
    }
    pub fn build(self) -> AtlasConfig {
        self.cfg
    }
}
