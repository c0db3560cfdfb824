use crate::error::{AtlasError, Result};
use crate::model::{Bin, Rect};
use std::collections::BTreeMap;
use std::fmt::Write as _;

/// Version tag written to `metadata.format`.
pub const PLIST_FORMAT: u32 = 3;

/// Frame descriptor for one sprite. Size and source size are identical (no trimming).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AtlasFrame {
    pub sprite_size: (u32, u32),
    pub sprite_source_size: (u32, u32),
    pub texture_rect: Rect,
}

impl AtlasFrame {
    pub fn from_rect(rect: &Rect) -> Self {
        Self {
            sprite_size: (rect.w, rect.h),
            sprite_source_size: (rect.w, rect.h),
            texture_rect: *rect,
        }
    }
}

/// Per-bin descriptor: frames keyed by texture name plus the header fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtlasMetadata {
    /// Bin this descriptor belongs to; not written into the plist.
    pub bin: usize,
    pub frames: BTreeMap<String, AtlasFrame>,
    pub format: u32,
    pub real_texture_file_name: String,
    pub texture_file_name: String,
    pub size: (u32, u32),
}

/// Describe `bin` for an atlas image stored as `image_file_name`.
pub fn build_metadata(bin: &Bin, image_file_name: &str) -> AtlasMetadata {
    let frames = bin
        .placements
        .iter()
        .map(|p| (p.name.clone(), AtlasFrame::from_rect(&p.rect)))
        .collect();
    AtlasMetadata {
        bin: bin.id,
        frames,
        format: PLIST_FORMAT,
        real_texture_file_name: image_file_name.to_string(),
        texture_file_name: image_file_name.to_string(),
        size: (bin.width, bin.height),
    }
}

/// `{w,h}`
pub fn size_string(w: u32, h: u32) -> String {
    format!("{{{w},{h}}}")
}

/// `{{x,y},{w,h}}`
pub fn rect_string(r: &Rect) -> String {
    format!("{{{{{},{}}},{{{},{}}}}}", r.x, r.y, r.w, r.h)
}

fn xml_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn check_text(bin: usize, what: &str, s: &str) -> Result<()> {
    if s.is_empty() {
        return Err(AtlasError::Serialization {
            bin,
            message: format!("{what} is empty"),
        });
    }
    // XML 1.0 forbids C0 control characters other than tab, LF and CR.
    if let Some(c) = s
        .chars()
        .find(|&c| c < '\u{20}' && !matches!(c, '\t' | '\n' | '\r'))
    {
        return Err(AtlasError::Serialization {
            bin,
            message: format!("{what} {s:?} contains control character {:#x}", c as u32),
        });
    }
    Ok(())
}

/// Serialize as an Apple XML property list.
///
/// Frames are emitted in name order so identical input always yields identical bytes.
pub fn to_plist(meta: &AtlasMetadata) -> Result<String> {
    check_text(meta.bin, "texture file name", &meta.texture_file_name)?;
    check_text(meta.bin, "texture file name", &meta.real_texture_file_name)?;

    let mut s = String::new();
    s.push_str(r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE plist PUBLIC "-//Apple//DTD PLIST 1.0//EN" "http://www.apple.com/DTDs/PropertyList-1.0.dtd">
<plist version="1.0">
<dict>
  <key>frames</key>
  <dict>
"#);
    for (name, fr) in &meta.frames {
        check_text(meta.bin, "frame name", name)?;
        // Writing into a String cannot fail.
        let _ = write!(
            s,
            "    <key>{}</key>\n    <dict>\n      <key>spriteSize</key>\n      <string>{}</string>\n      <key>spriteSourceSize</key>\n      <string>{}</string>\n      <key>textureRect</key>\n      <string>{}</string>\n    </dict>\n",
            xml_escape(name),
            size_string(fr.sprite_size.0, fr.sprite_size.1),
            size_string(fr.sprite_source_size.0, fr.sprite_source_size.1),
            rect_string(&fr.texture_rect),
        );
    }
    s.push_str("  </dict>\n");
    let _ = write!(
        s,
        "  <key>metadata</key>\n  <dict>\n    <key>format</key>\n    <integer>{}</integer>\n    <key>realTextureFileName</key>\n    <string>{}</string>\n    <key>textureFileName</key>\n    <string>{}</string>\n    <key>size</key>\n    <string>{}</string>\n  </dict>\n",
        meta.format,
        xml_escape(&meta.real_texture_file_name),
        xml_escape(&meta.texture_file_name),
        size_string(meta.size.0, meta.size.1),
    );
    s.push_str("</dict>\n</plist>\n");
    Ok(s)
}
