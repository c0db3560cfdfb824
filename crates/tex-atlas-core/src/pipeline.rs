use crate::addressing::{
    ArtifactSlot, BuildState, artifact_file_name, content_hash, join_output_path,
};
use crate::collector::{collect_textures, index_sources};
use crate::compositing::compose_bin;
use crate::config::{AtlasConfig, OptimizeFailurePolicy};
use crate::error::{AtlasError, Result};
use crate::metadata::{build_metadata, to_plist};
use crate::model::{Artifact, ArtifactKind, Bin, PackStats, SourceAsset, Texture};
use crate::optimize::{LosslessOptimizer, OxipngOptimizer, PassthroughOptimizer};
use crate::packer::pack_bins;
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder, RgbaImage};
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, info, instrument, warn};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Output of a stateless packing run.
#[derive(Debug)]
pub struct PackOutput {
    /// Final bins with their placements, in bin id order.
    pub bins: Vec<Bin>,
    /// Image and metadata artifact for every bin: `[img0, meta0, img1, meta1, ...]`.
    pub artifacts: Vec<Artifact>,
    /// Input names folded into the atlas.
    pub consumed: BTreeSet<String>,
    /// Recoverable conditions (optimizer fallback).
    pub warnings: Vec<AtlasError>,
}

impl PackOutput {
    /// Computes packing statistics for this output.
    pub fn stats(&self) -> PackStats {
        PackStats::from_bins(&self.bins)
    }
}

/// Changes an incremental build asks its host to apply.
#[derive(Debug, Default)]
pub struct BuildDiff {
    /// Input names the host should drop from its own asset set.
    pub consumed: BTreeSet<String>,
    /// Artifacts whose bytes changed since the previous build and must be written.
    pub produced: Vec<Artifact>,
    /// File names of artifacts that are identical to the previous build and still valid.
    pub unchanged: Vec<String>,
    pub warnings: Vec<AtlasError>,
    pub stats: PackStats,
}

impl BuildDiff {
    /// True when the build emitted nothing new.
    pub fn is_noop(&self) -> bool {
        self.produced.is_empty()
    }
}

/// Optimizer matching `cfg.optimize` / `cfg.optimization_level`.
pub fn default_optimizer(cfg: &AtlasConfig) -> Box<dyn LosslessOptimizer> {
    if cfg.optimize {
        Box::new(OxipngOptimizer::new(cfg.optimization_level))
    } else {
        Box::new(PassthroughOptimizer)
    }
}

/// Packs raw image buffers into content-addressed atlas artifacts.
///
/// Notes:
/// - Inputs are keyed by logical name; a repeated name replaces the earlier entry.
/// - Output is independent of input order: textures are processed by name, placed
///   by descending area.
/// - Any decode or packing error aborts the whole run; no partial atlas is returned.
#[instrument(skip_all)]
pub fn pack<I, S>(inputs: I, cfg: &AtlasConfig) -> Result<PackOutput>
where
    I: IntoIterator<Item = (S, SourceAsset)>,
    S: Into<String>,
{
    let optimizer = default_optimizer(cfg);
    pack_with_optimizer(inputs, cfg, optimizer.as_ref())
}

/// Same as [`pack`] with a caller-supplied optimizer.
pub fn pack_with_optimizer<I, S>(
    inputs: I,
    cfg: &AtlasConfig,
    optimizer: &dyn LosslessOptimizer,
) -> Result<PackOutput>
where
    I: IntoIterator<Item = (S, SourceAsset)>,
    S: Into<String>,
{
    cfg.validate()?;

    let sources = index_sources(inputs);
    let consumed: BTreeSet<String> = sources.keys().cloned().collect();
    let textures = collect_textures(&sources, cfg)?;
    drop(sources);
    debug!(count = textures.len(), "decoded textures");

    let requests: Vec<_> = textures.iter().map(Texture::request).collect();
    let bins = pack_bins(&requests, cfg)?;

    let by_name: HashMap<&str, &Texture> =
        textures.iter().map(|t| (t.name.as_str(), t)).collect();
    let rendered = render_bins(&bins, &by_name, cfg, optimizer)?;

    let mut artifacts = Vec::with_capacity(rendered.len() * 2);
    let mut warnings = Vec::new();
    for r in rendered {
        artifacts.push(r.image);
        artifacts.push(r.metadata);
        warnings.extend(r.warning);
    }

    let out = PackOutput {
        bins,
        artifacts,
        consumed,
        warnings,
    };
    info!(stats = %out.stats().summary(), "packed atlas");
    Ok(out)
}

struct RenderedBin {
    image: Artifact,
    metadata: Artifact,
    warning: Option<AtlasError>,
}

fn render_bins(
    bins: &[Bin],
    textures: &HashMap<&str, &Texture>,
    cfg: &AtlasConfig,
    optimizer: &dyn LosslessOptimizer,
) -> Result<Vec<RenderedBin>> {
    #[cfg(feature = "parallel")]
    {
        if cfg.parallel {
            return bins
                .par_iter()
                .map(|bin| render_bin(bin, textures, cfg, optimizer))
                .collect();
        }
    }
    bins.iter()
        .map(|bin| render_bin(bin, textures, cfg, optimizer))
        .collect()
}

/// compose -> encode -> optimize -> hash, for one bin.
fn render_bin(
    bin: &Bin,
    textures: &HashMap<&str, &Texture>,
    cfg: &AtlasConfig,
    optimizer: &dyn LosslessOptimizer,
) -> Result<RenderedBin> {
    let canvas = compose_bin(bin, textures)?;
    let png = encode_png(&canvas, bin.id)?;

    let mut warning = None;
    let png = if cfg.optimize {
        match optimizer.optimize(&png) {
            Ok(optimized) => {
                debug!(bin = bin.id, before = png.len(), after = optimized.len(), "optimized png");
                optimized
            }
            Err(e) => {
                let err = AtlasError::Optimization {
                    bin: bin.id,
                    message: e.to_string(),
                };
                match cfg.on_optimize_failure {
                    OptimizeFailurePolicy::Fail => return Err(err),
                    OptimizeFailurePolicy::Fallback => {
                        warn!(bin = bin.id, error = %e, "optimizer failed, keeping unoptimized png");
                        warning = Some(err);
                        png
                    }
                }
            }
        }
    } else {
        png
    };

    let image_hash = content_hash(&png);
    let image_name = artifact_file_name(ArtifactKind::Image, &image_hash, cfg.hash_length);

    // The descriptor references the image by bare name: both files sit side by side.
    let meta = build_metadata(bin, &image_name);
    let plist = to_plist(&meta)?.into_bytes();
    let meta_hash = content_hash(&plist);
    let meta_name = artifact_file_name(ArtifactKind::Metadata, &meta_hash, cfg.hash_length);

    debug!(bin = bin.id, image = %image_name, metadata = %meta_name, "rendered bin");
    Ok(RenderedBin {
        image: Artifact {
            kind: ArtifactKind::Image,
            bin: bin.id,
            file_name: join_output_path(&cfg.output_path, &image_name),
            hash: image_hash,
            bytes: png,
        },
        metadata: Artifact {
            kind: ArtifactKind::Metadata,
            bin: bin.id,
            file_name: join_output_path(&cfg.output_path, &meta_name),
            hash: meta_hash,
            bytes: plist,
        },
        warning,
    })
}

/// Encode an RGBA8 canvas as PNG without altering any channel.
pub fn encode_png(canvas: &RgbaImage, bin: usize) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    PngEncoder::new(&mut buf)
        .write_image(
            canvas.as_raw(),
            canvas.width(),
            canvas.height(),
            ExtendedColorType::Rgba8,
        )
        .map_err(|source| AtlasError::Encode { bin, source })?;
    Ok(buf)
}

/// A long-lived packer that skips re-emitting artifacts whose bytes did not change.
///
/// Create one per watch/serve session; the remembered hashes are dropped with it.
pub struct AtlasSession {
    cfg: AtlasConfig,
    optimizer: Box<dyn LosslessOptimizer>,
    state: BuildState,
}

impl AtlasSession {
    pub fn new(cfg: AtlasConfig) -> Result<Self> {
        let optimizer = default_optimizer(&cfg);
        Self::with_optimizer(cfg, optimizer)
    }

    pub fn with_optimizer(cfg: AtlasConfig, optimizer: Box<dyn LosslessOptimizer>) -> Result<Self> {
        cfg.validate()?;
        Ok(Self {
            cfg,
            optimizer,
            state: BuildState::new(),
        })
    }

    pub fn config(&self) -> &AtlasConfig {
        &self.cfg
    }

    pub fn state(&self) -> &BuildState {
        &self.state
    }

    /// Runs a full pack and returns only the artifacts that changed since the last
    /// successful build. On error the remembered hashes are left untouched.
    #[instrument(skip_all)]
    pub fn build<I, S>(&mut self, inputs: I) -> Result<BuildDiff>
    where
        I: IntoIterator<Item = (S, SourceAsset)>,
        S: Into<String>,
    {
        let out = pack_with_optimizer(inputs, &self.cfg, self.optimizer.as_ref())?;
        let stats = out.stats();

        let mut slots = Vec::with_capacity(out.artifacts.len());
        let mut produced = Vec::new();
        let mut unchanged = Vec::new();
        for artifact in out.artifacts {
            let slot = ArtifactSlot {
                bin: artifact.bin,
                kind: artifact.kind,
            };
            slots.push((slot, artifact.hash.clone()));
            if self.state.is_unchanged(slot, &artifact.hash) {
                debug!(file = %artifact.file_name, "unchanged, skipping");
                unchanged.push(artifact.file_name);
            } else {
                produced.push(artifact);
            }
        }
        self.state.commit(slots);

        info!(
            produced = produced.len(),
            unchanged = unchanged.len(),
            "build finished"
        );
        Ok(BuildDiff {
            consumed: out.consumed,
            produced,
            unchanged,
            warnings: out.warnings,
            stats,
        })
    }
}
