use crate::config::{AtlasConfig, PackingAlgorithm};
use crate::error::{AtlasError, Result};
use crate::model::{Bin, Placement, PlacementRequest, Rect};
use tracing::{debug, instrument};

pub mod guillotine;
pub mod maxrects;

use guillotine::GuillotinePacker;
use maxrects::MaxRectsPacker;

/// Ranking of a candidate slot; smaller is better.
///
/// Field order is the comparison order: best area fit, then best short side fit,
/// then top-most, then left-most.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Score {
    pub area_fit: u64,
    pub short_fit: u32,
    pub y: u32,
    pub x: u32,
}

impl Score {
    pub fn best_area_fit(free: &Rect, w: u32, h: u32) -> Self {
        let leftover_h = free.w - w;
        let leftover_v = free.h - h;
        Self {
            area_fit: free.area() - (w as u64 * h as u64),
            short_fit: leftover_h.min(leftover_v),
            y: free.y,
            x: free.x,
        }
    }
}

/// A slot a packer is willing to reserve for a `w x h` request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Candidate {
    /// Reserved slot, padding included.
    pub slot: Rect,
    pub score: Score,
    /// Index of the free rectangle the slot was carved from.
    pub free_index: usize,
}

/// A packer tracks the free space of a single bin.
///
/// Implementations must ensure no overlaps: once `place` has run for a
/// candidate, no later candidate may intersect its slot.
pub trait Packer {
    /// Best free slot for a `w x h` reservation, or `None` if it does not fit.
    fn find(&self, w: u32, h: u32) -> Option<Candidate>;
    /// Reserves `candidate.slot`, which must come from the latest `find` on this packer.
    fn place(&mut self, candidate: &Candidate);
    fn free_rects(&self) -> &[Rect];
}

fn new_packer(cfg: &AtlasConfig) -> Box<dyn Packer + Send> {
    // Padding is reserved to the right/bottom of each slot; widening the free
    // area by the same amount lets the last sprite of a row touch the bin edge.
    let area = Rect::new(
        0,
        0,
        cfg.max_width.saturating_add(cfg.padding),
        cfg.max_height.saturating_add(cfg.padding),
    );
    match cfg.algorithm {
        PackingAlgorithm::Guillotine => Box::new(GuillotinePacker::new(area)),
        PackingAlgorithm::MaxRects => Box::new(MaxRectsPacker::new(area)),
    }
}

/// Drops every free rectangle contained in another one.
pub(crate) fn prune_free_list(free: &mut Vec<Rect>) {
    let mut i = 0;
    while i < free.len() {
        let a = free[i];
        let mut j = i + 1;
        let mut remove_i = false;
        while j < free.len() {
            let b = free[j];
            if b.contains(&a) {
                remove_i = true;
                break;
            }
            if a.contains(&b) {
                free.remove(j);
                continue;
            }
            j += 1;
        }
        if remove_i {
            free.remove(i);
        } else {
            i += 1;
        }
    }
}

struct OpenBin {
    packer: Box<dyn Packer + Send>,
    placements: Vec<Placement>,
}

/// Sort requests by descending area, name ascending as tie-break.
pub fn sort_requests(requests: &mut [PlacementRequest]) {
    requests.sort_by(|a, b| b.area().cmp(&a.area()).then_with(|| a.name.cmp(&b.name)));
}

/// Assigns every request to a bin and a position, opening bins as needed.
///
/// Notes:
/// - Requests are placed in descending area order (name breaks ties), so the result
///   does not depend on input order.
/// - Each request goes to the best-area-fit free rectangle over all opened bins;
///   ties prefer the earlier bin.
/// - A request larger than the maximum bin size fails with `OversizeTexture`.
#[instrument(skip_all, fields(requests = requests.len()))]
pub fn pack_bins(requests: &[PlacementRequest], cfg: &AtlasConfig) -> Result<Vec<Bin>> {
    cfg.validate()?;

    let mut sorted = requests.to_vec();
    sort_requests(&mut sorted);

    for r in &sorted {
        if r.width == 0 || r.height == 0 {
            return Err(AtlasError::EmptyTexture {
                name: r.name.clone(),
            });
        }
        if r.width > cfg.max_width || r.height > cfg.max_height {
            return Err(AtlasError::OversizeTexture {
                name: r.name.clone(),
                width: r.width,
                height: r.height,
                max_width: cfg.max_width,
                max_height: cfg.max_height,
            });
        }
    }

    let mut bins: Vec<OpenBin> = Vec::new();
    for (placed, r) in sorted.iter().enumerate() {
        // validate() guarantees max + padding fits in u32, and oversize requests are gone.
        let (Some(w), Some(h)) = (
            r.width.checked_add(cfg.padding),
            r.height.checked_add(cfg.padding),
        ) else {
            return Err(AtlasError::InvalidConfig(format!(
                "padding {} overflows the slot of '{}'",
                cfg.padding, r.name
            )));
        };

        let mut best: Option<(usize, Candidate)> = None;
        for (idx, bin) in bins.iter().enumerate() {
            if let Some(c) = bin.packer.find(w, h) {
                if best.is_none_or(|(_, b)| c.score < b.score) {
                    best = Some((idx, c));
                }
            }
        }

        let (idx, candidate) = match best {
            Some(found) => found,
            None => {
                if let Some(max_bins) = cfg.max_bins {
                    if bins.len() >= max_bins {
                        return Err(AtlasError::PackingExhausted {
                            name: r.name.clone(),
                            placed,
                            total: sorted.len(),
                            max_bins,
                        });
                    }
                }
                let packer = new_packer(cfg);
                // Oversize requests were rejected above, so an empty bin always fits.
                let Some(c) = packer.find(w, h) else {
                    return Err(AtlasError::OversizeTexture {
                        name: r.name.clone(),
                        width: r.width,
                        height: r.height,
                        max_width: cfg.max_width,
                        max_height: cfg.max_height,
                    });
                };
                bins.push(OpenBin {
                    packer,
                    placements: Vec::new(),
                });
                debug!(bin = bins.len() - 1, "opened bin");
                (bins.len() - 1, c)
            }
        };

        let bin = &mut bins[idx];
        bin.packer.place(&candidate);
        bin.placements.push(Placement {
            name: r.name.clone(),
            rect: Rect::new(candidate.slot.x, candidate.slot.y, r.width, r.height),
        });
    }

    Ok(bins
        .into_iter()
        .enumerate()
        .map(|(id, b)| {
            let (width, height) = compute_bin_size(&b.placements, cfg);
            Bin {
                id,
                width,
                height,
                placements: b.placements,
            }
        })
        .collect())
}

/// Compute final bin dimensions given placed sprites and config.
pub fn compute_bin_size(placements: &[Placement], cfg: &AtlasConfig) -> (u32, u32) {
    let (mut w, mut h) = if cfg.smart_sizing {
        placements.iter().fold((1u32, 1u32), |(w, h), p| {
            (w.max(p.rect.right()), h.max(p.rect.bottom()))
        })
    } else {
        (cfg.max_width, cfg.max_height)
    };
    if !cfg.allow_non_power_of_two {
        w = w.next_power_of_two();
        h = h.next_power_of_two();
    }
    if !cfg.allow_non_square {
        let m = w.max(h);
        w = m;
        h = m;
    }
    // validate() keeps the cap itself square / pow2 when required, so this is a no-op there.
    (w.min(cfg.max_width), h.min(cfg.max_height))
}
