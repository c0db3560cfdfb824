use thiserror::Error;

/// Error reported by a [`LosslessOptimizer`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct OptimizeError(pub String);

/// Recompresses encoded PNG bytes without changing the decoded pixels.
pub trait LosslessOptimizer: Send + Sync {
    fn optimize(&self, png: &[u8]) -> Result<Vec<u8>, OptimizeError>;
}

/// oxipng at a fixed preset level.
#[derive(Debug, Clone)]
pub struct OxipngOptimizer {
    options: oxipng::Options,
}

impl OxipngOptimizer {
    /// `level` is the oxipng preset (0..=6); higher is slower and smaller.
    pub fn new(level: u8) -> Self {
        Self {
            options: oxipng::Options::from_preset(level),
        }
    }
}

impl LosslessOptimizer for OxipngOptimizer {
    fn optimize(&self, png: &[u8]) -> Result<Vec<u8>, OptimizeError> {
        oxipng::optimize_from_memory(png, &self.options).map_err(|e| OptimizeError(e.to_string()))
    }
}

/// Returns its input unchanged; used when optimization is disabled.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughOptimizer;

impl LosslessOptimizer for PassthroughOptimizer {
    fn optimize(&self, png: &[u8]) -> Result<Vec<u8>, OptimizeError> {
        Ok(png.to_vec())
    }
}
