use image::RgbaImage;
use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle (pixels). `x,y` is top-left; `w,h` are sizes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

impl Rect {
    pub fn new(x: u32, y: u32, w: u32, h: u32) -> Self {
        Self { x, y, w, h }
    }
    /// Exclusive right edge (`x + w`).
    pub fn right(&self) -> u32 {
        self.x + self.w
    }
    /// Exclusive bottom edge (`y + h`).
    pub fn bottom(&self) -> u32 {
        self.y + self.h
    }
    pub fn area(&self) -> u64 {
        self.w as u64 * self.h as u64
    }
    /// Returns true if `r` is fully inside `self`.
    pub fn contains(&self, r: &Rect) -> bool {
        r.x >= self.x && r.y >= self.y && r.right() <= self.right() && r.bottom() <= self.bottom()
    }
    /// Returns true if the two rectangles share at least one pixel.
    pub fn intersects(&self, other: &Rect) -> bool {
        !(self.x >= other.right()
            || other.x >= self.right()
            || self.y >= other.bottom()
            || other.y >= self.bottom())
    }
}

/// Raw encoded image bytes handed over by the host, e.g. the contents of a `.png` file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceAsset {
    pub bytes: Vec<u8>,
}

impl SourceAsset {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: bytes.into(),
        }
    }
    pub fn len(&self) -> usize {
        self.bytes.len()
    }
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// A decoded input image.
#[derive(Debug, Clone)]
pub struct Texture {
    pub name: String,
    pub pixels: RgbaImage,
}

impl Texture {
    pub fn width(&self) -> u32 {
        self.pixels.width()
    }
    pub fn height(&self) -> u32 {
        self.pixels.height()
    }
    /// Shape of this texture as seen by the packer.
    pub fn request(&self) -> PlacementRequest {
        PlacementRequest {
            name: self.name.clone(),
            width: self.width(),
            height: self.height(),
        }
    }
}

/// Named size to place; the packer never sees pixel data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacementRequest {
    pub name: String,
    pub width: u32,
    pub height: u32,
}

impl PlacementRequest {
    pub fn new(name: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            name: name.into(),
            width,
            height,
        }
    }
    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

/// A texture placed within a bin. `rect` excludes padding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placement {
    pub name: String,
    pub rect: Rect,
}

/// One atlas page: final size plus the placements in placement order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bin {
    pub id: usize,
    pub width: u32,
    pub height: u32,
    pub placements: Vec<Placement>,
}

impl Bin {
    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
    pub fn used_area(&self) -> u64 {
        self.placements.iter().map(|p| p.rect.area()).sum()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    Image,
    Metadata,
}

impl ArtifactKind {
    pub fn extension(&self) -> &'static str {
        match self {
            ArtifactKind::Image => "png",
            ArtifactKind::Metadata => "plist",
        }
    }
}

/// A content-addressed output file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub kind: ArtifactKind,
    /// Bin this artifact was rendered from.
    pub bin: usize,
    /// Output path prefix + hash-derived file name.
    pub file_name: String,
    /// Full hex digest of `bytes`.
    pub hash: String,
    pub bytes: Vec<u8>,
}

impl Artifact {
    pub fn len(&self) -> usize {
        self.bytes.len()
    }
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Statistics about atlas packing efficiency.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct PackStats {
    pub num_bins: usize,
    pub num_frames: usize,
    /// Sum of final bin areas.
    pub total_bin_area: u64,
    /// Sum of placed sprite areas (padding excluded).
    pub used_frame_area: u64,
    /// used_frame_area / total_bin_area (0.0 to 1.0).
    pub occupancy: f64,
    pub max_bin_width: u32,
    pub max_bin_height: u32,
}

impl PackStats {
    pub fn from_bins(bins: &[Bin]) -> Self {
        let mut stats = PackStats {
            num_bins: bins.len(),
            ..Default::default()
        };
        for bin in bins {
            stats.num_frames += bin.placements.len();
            stats.total_bin_area += bin.area();
            stats.used_frame_area += bin.used_area();
            stats.max_bin_width = stats.max_bin_width.max(bin.width);
            stats.max_bin_height = stats.max_bin_height.max(bin.height);
        }
        if stats.total_bin_area > 0 {
            stats.occupancy = stats.used_frame_area as f64 / stats.total_bin_area as f64;
        }
        stats
    }

    /// Returns a human-readable summary of the statistics.
    pub fn summary(&self) -> String {
        format!(
            "Bins: {}, Frames: {}, Occupancy: {:.2}%, Total Area: {} px², Used Area: {} px²",
            self.num_bins,
            self.num_frames,
            self.occupancy * 100.0,
            self.total_bin_area,
            self.used_frame_area,
        )
    }

    /// Returns wasted space in pixels.
    pub fn wasted_area(&self) -> u64 {
        self.total_bin_area.saturating_sub(self.used_frame_area)
    }
}
