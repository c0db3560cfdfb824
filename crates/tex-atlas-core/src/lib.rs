//! Core library for building content-addressed texture atlases.
//!
//! - Collect: decode named image buffers, ordered by name (`collector`)
//! - Pack: best-area-fit free-rectangle packing into one or more bins (`packer`)
//! - Compose: byte-exact RGBA blits into one canvas per bin (`compositing`)
//! - Describe: per-bin plist frame descriptor (`metadata`)
//! - Address: BLAKE3-derived file names and incremental dedup (`addressing`)
//!
//! Quick example:
//! ```ignore
//! use tex_atlas_core::{AtlasConfig, AtlasSession, SourceAsset};
//! # fn main() -> anyhow::Result<()> {
//! let inputs = vec![
//!   ("hero.png", SourceAsset::new(std::fs::read("hero.png")?)),
//!   ("coin.png", SourceAsset::new(std::fs::read("coin.png")?)),
//! ];
//! let mut session = AtlasSession::new(AtlasConfig::default())?;
//! let diff = session.build(inputs)?;
//! for artifact in &diff.produced {
//!     println!("{} ({} bytes)", artifact.file_name, artifact.len());
//! }
//! # Ok(()) }
//! ```

pub mod addressing;
pub mod collector;
pub mod compositing;
pub mod config;
pub mod error;
pub mod metadata;
pub mod model;
pub mod optimize;
pub mod packer;
pub mod pipeline;

pub use addressing::*;
pub use config::*;
pub use error::*;
pub use metadata::*;
pub use model::*;
pub use optimize::*;
pub use packer::{pack_bins, Packer};
pub use pipeline::*;

/// Convenience prelude for common types and functions.
/// Importing `tex_atlas_core::prelude::*` brings the primary APIs into scope.
pub mod prelude {
    pub use crate::addressing::{ArtifactSlot, BuildState};
    pub use crate::config::{
        AtlasConfig, AtlasConfigBuilder, OptimizeFailurePolicy, PackingAlgorithm,
    };
    pub use crate::error::AtlasError;
    pub use crate::metadata::{AtlasFrame, AtlasMetadata};
    pub use crate::model::{
        Artifact, ArtifactKind, Bin, PackStats, Placement, PlacementRequest, Rect, SourceAsset,
        Texture,
    };
    pub use crate::optimize::{LosslessOptimizer, OptimizeError};
    pub use crate::{pack, pack_bins, AtlasSession, BuildDiff, PackOutput};
}
