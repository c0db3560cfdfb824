use crate::error::{AtlasError, Result};
use crate::model::{Bin, Texture};
use image::RgbaImage;
use std::collections::HashMap;

/// Copy `src` into `canvas` with its top-left corner at (dx, dy).
///
/// Pixels are copied row by row as raw RGBA8 bytes: no blending, no conversion,
/// alpha preserved. Rows or columns falling outside the canvas are clipped.
pub fn blit_rgba(src: &RgbaImage, canvas: &mut RgbaImage, dx: u32, dy: u32) {
    let (cw, ch) = canvas.dimensions();
    let (sw, sh) = src.dimensions();
    if dx >= cw || dy >= ch {
        return;
    }
    let copy_w = sw.min(cw - dx) as usize;
    let copy_h = sh.min(ch - dy);
    let src_stride = sw as usize * 4;
    let dst_stride = cw as usize * 4;

    let src_raw = src.as_raw();
    let dst_raw: &mut [u8] = canvas;
    for row in 0..copy_h as usize {
        let s = row * src_stride;
        let d = (dy as usize + row) * dst_stride + dx as usize * 4;
        dst_raw[d..d + copy_w * 4].copy_from_slice(&src_raw[s..s + copy_w * 4]);
    }
}

/// Render one bin into a transparent canvas of the bin's final size.
pub fn compose_bin(bin: &Bin, textures: &HashMap<&str, &Texture>) -> Result<RgbaImage> {
    let mut canvas = RgbaImage::new(bin.width, bin.height);
    for p in &bin.placements {
        let texture = textures
            .get(p.name.as_str())
            .ok_or_else(|| AtlasError::MissingTexture {
                bin: bin.id,
                name: p.name.clone(),
            })?;
        blit_rgba(&texture.pixels, &mut canvas, p.rect.x, p.rect.y);
    }
    Ok(canvas)
}
