//! Bottom-right watermark overlay.
//!
//! Two variants share placement and sizing:
//!
//! - [`WatermarkMode::Straight`] resizes the straight-alpha watermark and pastes it through its
//!   alpha channel.
//! - [`WatermarkMode::Premultiplied`] premultiplies color by alpha before resizing, so fully
//!   transparent texels cannot bleed their color into the edges, then composites source-over.

use image::RgbaImage;
use image::imageops::{self, FilterType};
use ndarray::{Array3, ArrayView3};

use crate::foundation::error::NodeResult;
use crate::foundation::tensor::ImageBatch;
use crate::foundation::value::Value;
use crate::host::context::HostContext;
use crate::host::node::Node;
use crate::host::schema::{InputDecl, NodeOutput, NodeSchema, OutputDecl, Resolved};
use crate::imaging::composite::{
    PasteMode, paste, premultiply_rgba8_in_place, unpremultiply_rgba8_in_place,
};
use crate::imaging::convert::{from_rgba8, to_rgba8};

pub const DEFAULT_SCALE_PERCENT: f64 = 20.0;
pub const DEFAULT_PADDING: i64 = 25;
pub const MAX_PADDING: i64 = 8192;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WatermarkMode {
    Straight,
    Premultiplied,
}

/// Where and how large the watermark lands on the source.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Placement {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Fit the watermark inside `scale_percent` of the source, keeping its aspect ratio, and
/// anchor it `padding` pixels from the bottom-right corner (clamped to the top-left).
///
/// `None` when nothing should be drawn.
pub fn placement(
    src: (u32, u32),
    wm: (u32, u32),
    scale_percent: f64,
    padding: u32,
) -> Option<Placement> {
    let (src_w, src_h) = src;
    let (wm_w, wm_h) = wm;
    if scale_percent <= 0.0 || wm_w == 0 || wm_h == 0 {
        return None;
    }

    let scale = scale_percent / 100.0;
    let target_w = (f64::from(src_w) * scale).round().max(1.0);
    let target_h = (f64::from(src_h) * scale).round().max(1.0);
    let ratio = (target_w / f64::from(wm_w)).min(target_h / f64::from(wm_h));

    let width = (f64::from(wm_w) * ratio).round().max(1.0) as u32;
    let height = (f64::from(wm_h) * ratio).round().max(1.0) as u32;

    Some(Placement {
        x: src_w.saturating_sub(width).saturating_sub(padding),
        y: src_h.saturating_sub(height).saturating_sub(padding),
        width,
        height,
    })
}

/// Lanczos resize in premultiplied space. The result stays premultiplied, with color clamped to
/// alpha where the filter rings.
pub fn resize_premultiplied(img: &RgbaImage, width: u32, height: u32) -> RgbaImage {
    let mut premul = img.clone();
    premultiply_rgba8_in_place(&mut premul);
    if premul.dimensions() == (width, height) {
        return premul;
    }
    let mut resized = imageops::resize(&premul, width, height, FilterType::Lanczos3);
    for px in resized.pixels_mut() {
        let a = px.0[3];
        for c in &mut px.0[..3] {
            *c = (*c).min(a);
        }
    }
    resized
}

/// Resize premultiplied, then return to straight alpha; fully transparent texels become black.
pub fn resize_with_alpha(img: &RgbaImage, width: u32, height: u32) -> RgbaImage {
    if img.dimensions() == (width, height) {
        return img.clone();
    }
    let mut resized = resize_premultiplied(img, width, height);
    unpremultiply_rgba8_in_place(&mut resized);
    resized
}

/// Watermark one `[h, w, c]` image; the result keeps the source's channel count.
pub fn overlay_watermark(
    src: ArrayView3<'_, f32>,
    wm: ArrayView3<'_, f32>,
    scale_percent: f64,
    padding: u32,
    mode: WatermarkMode,
) -> NodeResult<Array3<f32>> {
    let src_dims = (src.shape()[1] as u32, src.shape()[0] as u32);
    let wm_dims = (wm.shape()[1] as u32, wm.shape()[0] as u32);
    let Some(place) = placement(src_dims, wm_dims, scale_percent, padding) else {
        return Ok(src.to_owned());
    };

    let channels = src.shape()[2];
    let mut canvas = to_rgba8(src)?;
    let mark = to_rgba8(wm)?;

    match mode {
        WatermarkMode::Straight => {
            let resized = imageops::resize(&mark, place.width, place.height, FilterType::Lanczos3);
            paste(&mut canvas, &resized, place.x, place.y, PasteMode::AlphaMask)?;
        }
        WatermarkMode::Premultiplied => {
            let layer = resize_premultiplied(&mark, place.width, place.height);
            premultiply_rgba8_in_place(&mut canvas);
            paste(&mut canvas, &layer, place.x, place.y, PasteMode::Over)?;
            unpremultiply_rgba8_in_place(&mut canvas);
        }
    }

    from_rgba8(&canvas, channels)
}

/// Watermark every image in `source`; image `i` uses watermark `i % watermark.batch()`.
pub fn apply_watermark(
    source: &ImageBatch,
    watermark: &ImageBatch,
    scale_percent: f64,
    padding: u32,
    mode: WatermarkMode,
) -> NodeResult<ImageBatch> {
    if watermark.batch() == 0 {
        return Ok(source.clone());
    }
    let mut out = Vec::with_capacity(source.batch());
    for idx in 0..source.batch() {
        let src = source.image(idx)?;
        let wm = watermark.image(idx % watermark.batch())?;
        out.push(overlay_watermark(src, wm, scale_percent, padding, mode)?);
    }
    if out.is_empty() {
        return Ok(source.clone());
    }
    ImageBatch::stack(&out)
}

fn watermark_schema() -> NodeSchema {
    NodeSchema::new()
        .required(InputDecl::image("source_image"))
        .required(InputDecl::image("watermark"))
        .required(InputDecl::float(
            "scale_percent",
            DEFAULT_SCALE_PERCENT,
            0.0,
            100.0,
            0.1,
        ))
        .required(InputDecl::int("padding", DEFAULT_PADDING, 0, MAX_PADDING))
}

fn execute_watermark(inputs: &Resolved, mode: WatermarkMode) -> NodeResult<NodeOutput> {
    let source = inputs.image("source_image")?;
    let watermark = inputs.image("watermark")?;
    let scale_percent = inputs.float("scale_percent")?;
    let padding = inputs.int("padding")? as u32;

    let out = apply_watermark(&source, &watermark, scale_percent, padding, mode)?;
    Ok(NodeOutput::new(vec![Value::Image(out)]))
}

const OUTPUTS: [OutputDecl; 1] = [OutputDecl::new("watermarked_image", "IMAGE")];

#[derive(Debug, Default, Clone, Copy)]
pub struct Watermarker;

impl Node for Watermarker {
    fn class_name(&self) -> &'static str {
        "OCS_Watermarker"
    }

    fn display_name(&self) -> &'static str {
        "Watermarker"
    }

    fn schema(&self) -> NodeSchema {
        watermark_schema()
    }

    fn outputs(&self) -> &'static [OutputDecl] {
        &OUTPUTS
    }

    fn execute(&self, inputs: &Resolved, _ctx: &HostContext) -> NodeResult<NodeOutput> {
        execute_watermark(inputs, WatermarkMode::Straight)
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct WatermarkerV2;

impl Node for WatermarkerV2 {
    fn class_name(&self) -> &'static str {
        "OCS_WatermarkerV2"
    }

    fn display_name(&self) -> &'static str {
        "Watermarker v2"
    }

    fn description(&self) -> Option<&'static str> {
        Some(
            "Overlay a watermark onto the bottom-right corner of an image while preserving \
             the transparency of the watermark.",
        )
    }

    fn schema(&self) -> NodeSchema {
        watermark_schema()
    }

    fn outputs(&self) -> &'static [OutputDecl] {
        &OUTPUTS
    }

    fn execute(&self, inputs: &Resolved, _ctx: &HostContext) -> NodeResult<NodeOutput> {
        execute_watermark(inputs, WatermarkMode::Premultiplied)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/nodes/watermark.rs"]
mod tests;
