use image::RgbaImage;

use crate::foundation::error::{NodeError, NodeResult};

pub type PremulRgba8 = [u8; 4];

/// Porter-Duff source-over on premultiplied pixels.
pub fn over(dst: PremulRgba8, src: PremulRgba8) -> PremulRgba8 {
    if src[3] == 0 {
        return dst;
    }
    let sa = u16::from(src[3]);
    let inv = 255u16 - sa;

    let mut out = [0u8; 4];
    out[3] = add_sat_u8(src[3], mul_div255(u16::from(dst[3]), inv));
    for i in 0..3 {
        out[i] = add_sat_u8(src[i], mul_div255(u16::from(dst[i]), inv));
    }
    out
}

/// Blend every channel, alpha included, by the mask: `dst * (1 - m) + src * m`.
pub fn masked_blend(dst: [u8; 4], src: [u8; 4], mask: u8) -> [u8; 4] {
    let m = u16::from(mask);
    let inv = 255u16 - m;
    let mut out = [0u8; 4];
    for i in 0..4 {
        out[i] = add_sat_u8(
            mul_div255(u16::from(dst[i]), inv),
            mul_div255(u16::from(src[i]), m),
        );
    }
    out
}

pub fn premultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = u16::from(px[3]);
        if a == 0 {
            px[0] = 0;
            px[1] = 0;
            px[2] = 0;
            continue;
        }
        px[0] = mul_div255(u16::from(px[0]), a);
        px[1] = mul_div255(u16::from(px[1]), a);
        px[2] = mul_div255(u16::from(px[2]), a);
    }
}

/// Inverse of [`premultiply_rgba8_in_place`]; fully transparent pixels become black.
pub fn unpremultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = u32::from(px[3]);
        if a == 0 {
            px[0] = 0;
            px[1] = 0;
            px[2] = 0;
            continue;
        }
        for c in &mut px[..3] {
            *c = ((u32::from(*c) * 255 + a / 2) / a).min(255) as u8;
        }
    }
}

/// How [`paste`] combines the layer with the destination.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PasteMode {
    /// Straight-alpha layer blended through its own alpha as a mask.
    AlphaMask,
    /// Premultiplied destination and layer, source-over.
    Over,
}

/// Draw `layer` into `dst` with its top-left corner at `(x, y)`, clipping at the edges.
pub fn paste(
    dst: &mut RgbaImage,
    layer: &RgbaImage,
    x: u32,
    y: u32,
    mode: PasteMode,
) -> NodeResult<()> {
    if x > dst.width() || y > dst.height() {
        return Err(NodeError::validation(format!(
            "paste origin ({x}, {y}) outside {}x{} destination",
            dst.width(),
            dst.height()
        )));
    }
    let w = layer.width().min(dst.width() - x);
    let h = layer.height().min(dst.height() - y);
    for ly in 0..h {
        for lx in 0..w {
            let src = layer.get_pixel(lx, ly).0;
            let d = dst.get_pixel_mut(x + lx, y + ly);
            d.0 = match mode {
                PasteMode::AlphaMask => masked_blend(d.0, src, src[3]),
                PasteMode::Over => over(d.0, src),
            };
        }
    }
    Ok(())
}

fn mul_div255(x: u16, y: u16) -> u8 {
    (((u32::from(x) * u32::from(y)) + 127) / 255) as u8
}

fn add_sat_u8(a: u8, b: u8) -> u8 {
    a.saturating_add(b)
}

#[cfg(test)]
#[path = "../../tests/unit/imaging/composite.rs"]
mod tests;
