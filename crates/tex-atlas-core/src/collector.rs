use crate::config::AtlasConfig;
use crate::error::{AtlasError, Result};
use crate::model::{SourceAsset, Texture};
use std::collections::BTreeMap;
use tracing::{debug, instrument};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Deduplicates inputs by name; a later entry with the same name replaces the earlier one.
///
/// The returned map iterates in name order, which fixes composition order for
/// every later stage regardless of how the host enumerated its assets.
pub fn index_sources<I, S>(inputs: I) -> BTreeMap<String, SourceAsset>
where
    I: IntoIterator<Item = (S, SourceAsset)>,
    S: Into<String>,
{
    let mut map = BTreeMap::new();
    for (name, asset) in inputs {
        let name = name.into();
        if map.insert(name.clone(), asset).is_some() {
            debug!(%name, "duplicate texture name, keeping the later entry");
        }
    }
    map
}

/// Decodes a single raw buffer into an RGBA8 texture.
pub fn decode_texture(name: &str, asset: &SourceAsset) -> Result<Texture> {
    let image = image::load_from_memory(&asset.bytes).map_err(|source| AtlasError::Decode {
        name: name.to_string(),
        source,
    })?;
    let pixels = image.to_rgba8();
    if pixels.width() == 0 || pixels.height() == 0 {
        return Err(AtlasError::EmptyTexture {
            name: name.to_string(),
        });
    }
    Ok(Texture {
        name: name.to_string(),
        pixels,
    })
}

/// Decodes every source into a texture, sorted by name.
///
/// All decodes finish before this returns; the first failure (in name order) aborts the batch.
#[instrument(skip_all)]
pub fn collect_textures(
    sources: &BTreeMap<String, SourceAsset>,
    cfg: &AtlasConfig,
) -> Result<Vec<Texture>> {
    let entries: Vec<(&String, &SourceAsset)> = sources.iter().collect();

    #[cfg(feature = "parallel")]
    {
        if cfg.parallel {
            let decoded: Vec<Result<Texture>> = entries
                .par_iter()
                .map(|(name, asset)| decode_texture(name, asset))
                .collect();
            return decoded.into_iter().collect();
        }
    }
    #[cfg(not(feature = "parallel"))]
    let _ = cfg;

    entries
        .into_iter()
        .map(|(name, asset)| decode_texture(name, asset))
        .collect()
}
