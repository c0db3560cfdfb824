use thiserror::Error;

#[derive(Debug, Error)]
pub enum AtlasError {
    #[error("failed to decode texture '{name}': {source}")]
    Decode {
        name: String,
        #[source]
        source: image::ImageError,
    },
    #[error("texture '{name}' is empty (0x0)")]
    EmptyTexture { name: String },
    #[error(
        "texture '{name}' ({width}x{height}) exceeds the maximum bin size {max_width}x{max_height}"
    )]
    OversizeTexture {
        name: String,
        width: u32,
        height: u32,
        max_width: u32,
        max_height: u32,
    },
    #[error("bin limit of {max_bins} reached: cannot place texture '{name}' (placed {placed} of {total})")]
    PackingExhausted {
        name: String,
        placed: usize,
        total: usize,
        max_bins: usize,
    },
    #[error("bin {bin}: placement references unknown texture '{name}'")]
    MissingTexture { bin: usize, name: String },
    #[error("bin {bin}: failed to encode atlas image: {source}")]
    Encode {
        bin: usize,
        #[source]
        source: image::ImageError,
    },
    #[error("bin {bin}: lossless optimization failed: {message}")]
    Optimization { bin: usize, message: String },
    #[error("bin {bin}: invalid metadata: {message}")]
    Serialization { bin: usize, message: String },
    #[error("Invalid dimensions: {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl AtlasError {
    /// True for conditions the pipeline may report as warnings instead of failing.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, AtlasError::Optimization { .. })
    }
}

pub type Result<T> = std::result::Result<T, AtlasError>;
