//! Conversions between float image tensors and 8-bit pixel buffers.

use std::path::Path;

use anyhow::Context as _;
use image::{DynamicImage, GrayImage, RgbImage, RgbaImage};
use ndarray::{Array3, ArrayView3};

use crate::foundation::error::{NodeError, NodeResult};
use crate::foundation::tensor::ImageBatch;

/// `round(clamp(v, 0, 1) * 255)`.
pub fn quantize(v: f32) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// `clip(v * 255, 0, 255)` with truncation, the conversion used when writing files.
pub fn truncate_u8(v: f32) -> u8 {
    (v * 255.0).clamp(0.0, 255.0) as u8
}

/// ITU-R 601 luma in 16.16 fixed point, rounded.
pub fn luma_601(r: u8, g: u8, b: u8) -> u8 {
    let l = u32::from(r) * 19595 + u32::from(g) * 38470 + u32::from(b) * 7471 + 0x8000;
    (l >> 16) as u8
}

fn dims(image: &ArrayView3<'_, f32>) -> NodeResult<(u32, u32, usize)> {
    let s = image.shape();
    let h = u32::try_from(s[0]).map_err(|_| NodeError::shape("image height overflows u32"))?;
    let w = u32::try_from(s[1]).map_err(|_| NodeError::shape("image width overflows u32"))?;
    Ok((w, h, s[2]))
}

/// Quantize one `[h, w, c]` image to RGBA8; luma is replicated and missing alpha is opaque.
pub fn to_rgba8(image: ArrayView3<'_, f32>) -> NodeResult<RgbaImage> {
    let (w, h, channels) = dims(&image)?;
    let mut out = RgbaImage::new(w, h);
    for (x, y, px) in out.enumerate_pixels_mut() {
        let (yy, xx) = (y as usize, x as usize);
        px.0 = match channels {
            1 => {
                let l = quantize(image[[yy, xx, 0]]);
                [l, l, l, 255]
            }
            3 => [
                quantize(image[[yy, xx, 0]]),
                quantize(image[[yy, xx, 1]]),
                quantize(image[[yy, xx, 2]]),
                255,
            ],
            4 => [
                quantize(image[[yy, xx, 0]]),
                quantize(image[[yy, xx, 1]]),
                quantize(image[[yy, xx, 2]]),
                quantize(image[[yy, xx, 3]]),
            ],
            c => {
                return Err(NodeError::validation(format!(
                    "unsupported image channel count {c}"
                )));
            }
        };
    }
    Ok(out)
}

/// Convert RGBA8 back to a float `[h, w, channels]` image in the requested channel mode.
pub fn from_rgba8(rgba: &RgbaImage, channels: usize) -> NodeResult<Array3<f32>> {
    let (w, h) = rgba.dimensions();
    if !matches!(channels, 1 | 3 | 4) {
        return Err(NodeError::validation(format!(
            "unsupported image channel count {channels}"
        )));
    }
    let mut out = Array3::<f32>::zeros((h as usize, w as usize, channels));
    for (x, y, px) in rgba.enumerate_pixels() {
        let [r, g, b, a] = px.0;
        let (yy, xx) = (y as usize, x as usize);
        match channels {
            1 => out[[yy, xx, 0]] = f32::from(luma_601(r, g, b)) / 255.0,
            _ => {
                out[[yy, xx, 0]] = f32::from(r) / 255.0;
                out[[yy, xx, 1]] = f32::from(g) / 255.0;
                out[[yy, xx, 2]] = f32::from(b) / 255.0;
                if channels == 4 {
                    out[[yy, xx, 3]] = f32::from(a) / 255.0;
                }
            }
        }
    }
    Ok(out)
}

/// Render one `[h, w, c]` image into a `DynamicImage` with the matching color type.
pub fn to_dynamic_image(image: ArrayView3<'_, f32>) -> NodeResult<DynamicImage> {
    let (w, h, channels) = dims(&image)?;
    let raw: Vec<u8> = image.iter().map(|v| truncate_u8(*v)).collect();
    let too_small = || NodeError::shape("pixel buffer does not match image dimensions");
    match channels {
        1 => Ok(DynamicImage::ImageLuma8(
            GrayImage::from_raw(w, h, raw).ok_or_else(too_small)?,
        )),
        3 => Ok(DynamicImage::ImageRgb8(
            RgbImage::from_raw(w, h, raw).ok_or_else(too_small)?,
        )),
        4 => Ok(DynamicImage::ImageRgba8(
            RgbaImage::from_raw(w, h, raw).ok_or_else(too_small)?,
        )),
        c => Err(NodeError::validation(format!(
            "unsupported image channel count {c}"
        ))),
    }
}

/// Decode pixels into a batch of one, keeping luma / RGB / RGBA as 1 / 3 / 4 channels.
pub fn from_dynamic_image(img: &DynamicImage) -> NodeResult<ImageBatch> {
    let color = img.color();
    let (w, h) = (img.width() as usize, img.height() as usize);
    let (channels, raw) = if color.has_alpha() {
        (4, img.to_rgba8().into_raw())
    } else if color.has_color() {
        (3, img.to_rgb8().into_raw())
    } else {
        (1, img.to_luma8().into_raw())
    };
    let data = Array3::from_shape_vec((h, w, channels), raw)?.mapv(|v| f32::from(v) / 255.0);
    ImageBatch::from_single(data)
}

pub fn load_image_file(path: &Path) -> NodeResult<ImageBatch> {
    let img = image::open(path).with_context(|| format!("open image '{}'", path.display()))?;
    from_dynamic_image(&img)
}

/// Write image `index` of `batch` to `path`, format chosen from the extension.
pub fn save_image_file(batch: &ImageBatch, index: usize, path: &Path) -> NodeResult<()> {
    let img = to_dynamic_image(batch.image(index)?)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    img.save(path)
        .with_context(|| format!("write image '{}'", path.display()))?;
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/imaging/convert.rs"]
mod tests;
