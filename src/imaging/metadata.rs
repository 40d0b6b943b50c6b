//! Encoders that embed metadata: PNG text/eXIf chunks, JPEG and WebP EXIF.
//!
//! EXIF payloads are minimal big-endian TIFF structures carrying at most two fields: the
//! `Make` tag in IFD0 and `UserComment` in the Exif sub-IFD.

use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::codecs::webp::WebPEncoder;
use image::{DynamicImage, ExtendedColorType, ImageEncoder};

use crate::foundation::error::{NodeError, NodeResult};

const TAG_MAKE: u16 = 0x010F;
const TAG_EXIF_IFD: u16 = 0x8769;
const TAG_USER_COMMENT: u16 = 0x9286;

const TYPE_ASCII: u16 = 2;
const TYPE_LONG: u16 = 4;
const TYPE_UNDEFINED: u16 = 7;

/// Character-code prefix of a UTF-16 `UserComment`.
pub const UNICODE_PREFIX: &[u8; 8] = b"UNICODE\0";

/// EXIF fields this crate knows how to write.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExifFields {
    pub make: Option<String>,
    pub user_comment: Option<String>,
}

impl ExifFields {
    pub fn is_empty(&self) -> bool {
        self.make.is_none() && self.user_comment.is_none()
    }

    /// Serialize as a TIFF structure, `None` when there is nothing to write.
    pub fn to_tiff(&self) -> NodeResult<Option<Vec<u8>>> {
        if self.is_empty() {
            return Ok(None);
        }

        let mut ifd0 = Vec::new();
        if let Some(make) = &self.make {
            let mut bytes = make.as_bytes().to_vec();
            bytes.push(0);
            ifd0.push(Entry::new(TAG_MAKE, TYPE_ASCII, bytes));
        }

        let exif_ifd = self
            .user_comment
            .as_ref()
            .map(|c| vec![Entry::new(TAG_USER_COMMENT, TYPE_UNDEFINED, user_comment_bytes(c))]);

        // IFD0 starts right after the 8-byte header; the Exif IFD follows IFD0's data area.
        let ifd0_len = ifd_len(ifd0.len() + usize::from(exif_ifd.is_some()), &ifd0);
        let exif_offset = to_u32(8 + ifd0_len)?;
        if exif_ifd.is_some() {
            ifd0.push(Entry::long(TAG_EXIF_IFD, exif_offset));
        }

        let mut out = Vec::with_capacity(64);
        out.extend_from_slice(b"MM\0\x2A");
        out.extend_from_slice(&8u32.to_be_bytes());
        write_ifd(&mut out, &ifd0)?;
        if let Some(entries) = &exif_ifd {
            write_ifd(&mut out, entries)?;
        }
        to_u32(out.len())?;
        Ok(Some(out))
    }
}

/// `UNICODE\0` followed by the UTF-16BE code units of `comment`.
pub fn user_comment_bytes(comment: &str) -> Vec<u8> {
    let mut out = UNICODE_PREFIX.to_vec();
    for unit in comment.encode_utf16() {
        out.extend_from_slice(&unit.to_be_bytes());
    }
    out
}

struct Entry {
    tag: u16,
    ty: u16,
    count: u32,
    bytes: Vec<u8>,
}

impl Entry {
    fn new(tag: u16, ty: u16, bytes: Vec<u8>) -> Self {
        Self {
            tag,
            ty,
            count: bytes.len() as u32,
            bytes,
        }
    }

    fn long(tag: u16, value: u32) -> Self {
        Self {
            tag,
            ty: TYPE_LONG,
            count: 1,
            bytes: value.to_be_bytes().to_vec(),
        }
    }

    fn out_of_line_len(&self) -> usize {
        if self.bytes.len() > 4 {
            self.bytes.len() + self.bytes.len() % 2
        } else {
            0
        }
    }
}

fn ifd_len(entry_count: usize, entries: &[Entry]) -> usize {
    2 + 12 * entry_count + 4 + entries.iter().map(Entry::out_of_line_len).sum::<usize>()
}

/// Append an IFD at the current end of `out`, values over 4 bytes going to the data area
/// that directly follows it.
fn write_ifd(out: &mut Vec<u8>, entries: &[Entry]) -> NodeResult<()> {
    let mut entries: Vec<&Entry> = entries.iter().collect();
    entries.sort_by_key(|e| e.tag);

    let start = out.len();
    let count =
        u16::try_from(entries.len()).map_err(|_| NodeError::encode("too many EXIF entries"))?;
    let mut data_offset = start + 2 + 12 * entries.len() + 4;
    let mut data = Vec::new();

    out.extend_from_slice(&count.to_be_bytes());
    for e in &entries {
        out.extend_from_slice(&e.tag.to_be_bytes());
        out.extend_from_slice(&e.ty.to_be_bytes());
        out.extend_from_slice(&e.count.to_be_bytes());
        if e.bytes.len() <= 4 {
            let mut inline = [0u8; 4];
            inline[..e.bytes.len()].copy_from_slice(&e.bytes);
            out.extend_from_slice(&inline);
        } else {
            out.extend_from_slice(&to_u32(data_offset)?.to_be_bytes());
            data.extend_from_slice(&e.bytes);
            if e.bytes.len() % 2 == 1 {
                data.push(0);
            }
            data_offset = start + 2 + 12 * entries.len() + 4 + data.len();
        }
    }
    out.extend_from_slice(&0u32.to_be_bytes());
    out.extend_from_slice(&data);
    Ok(())
}

fn to_u32(v: usize) -> NodeResult<u32> {
    u32::try_from(v).map_err(|_| NodeError::encode("EXIF payload exceeds 4 GiB"))
}

/// Metadata to embed in a PNG file.
#[derive(Clone, Copy, Debug, Default)]
pub struct PngMetadata<'a> {
    /// `(keyword, text)` pairs written as tEXt (ASCII) or iTXt (anything else).
    pub text: &'a [(&'a str, &'a str)],
    /// TIFF bytes for an eXIf chunk.
    pub exif: Option<&'a [u8]>,
}

pub fn encode_png(img: &DynamicImage, meta: PngMetadata<'_>) -> NodeResult<Vec<u8>> {
    let (color, raw) = match img {
        DynamicImage::ImageLuma8(buf) => (png::ColorType::Grayscale, buf.as_raw().clone()),
        DynamicImage::ImageRgb8(buf) => (png::ColorType::Rgb, buf.as_raw().clone()),
        other => (png::ColorType::Rgba, other.to_rgba8().into_raw()),
    };

    let mut out = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut out, img.width(), img.height());
        encoder.set_color(color);
        encoder.set_depth(png::BitDepth::Eight);
        for (keyword, text) in meta.text {
            let added = if text.is_ascii() {
                encoder.add_text_chunk(keyword.to_string(), text.to_string())
            } else {
                encoder.add_itxt_chunk(keyword.to_string(), text.to_string())
            };
            added.map_err(|e| NodeError::encode(format!("png text chunk '{keyword}': {e}")))?;
        }
        let mut writer = encoder
            .write_header()
            .map_err(|e| NodeError::encode(format!("png header: {e}")))?;
        if let Some(exif) = meta.exif {
            writer
                .write_chunk(png::chunk::ChunkType(*b"eXIf"), exif)
                .map_err(|e| NodeError::encode(format!("png eXIf chunk: {e}")))?;
        }
        writer
            .write_image_data(&raw)
            .map_err(|e| NodeError::encode(format!("png image data: {e}")))?;
        writer
            .finish()
            .map_err(|e| NodeError::encode(format!("png finish: {e}")))?;
    }
    Ok(out)
}

/// Largest TIFF payload that fits one JPEG APP1 segment after its length and `Exif\0\0` header.
pub const MAX_JPEG_EXIF_LEN: usize = u16::MAX as usize - 2 - 6;

/// Baseline JPEG (RGB) with an optional APP1 EXIF segment after the JFIF header.
pub fn encode_jpeg(img: &DynamicImage, quality: u8, exif: Option<&[u8]>) -> NodeResult<Vec<u8>> {
    let rgb = img.to_rgb8();
    let mut out = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut out, quality.clamp(1, 100));
    if let Some(tiff) = exif {
        if tiff.len() > MAX_JPEG_EXIF_LEN {
            return Err(NodeError::encode(format!(
                "EXIF payload of {} bytes does not fit a JPEG APP1 segment",
                tiff.len()
            )));
        }
        set_exif(&mut encoder, tiff, "jpeg")?;
    }
    encoder
        .write_image(
            rgb.as_raw(),
            rgb.width(),
            rgb.height(),
            ExtendedColorType::Rgb8,
        )
        .map_err(|e| NodeError::encode(format!("jpeg: {e}")))?;
    Ok(out)
}

/// Lossless WebP; an EXIF payload switches the file to the extended (VP8X) layout.
pub fn encode_webp(img: &DynamicImage, exif: Option<&[u8]>) -> NodeResult<Vec<u8>> {
    let mut out = Vec::new();
    let mut encoder = WebPEncoder::new_lossless(Cursor::new(&mut out));
    if let Some(tiff) = exif {
        set_exif(&mut encoder, tiff, "webp")?;
    }
    let result = if img.color().has_alpha() {
        let rgba = img.to_rgba8();
        encoder.write_image(
            rgba.as_raw(),
            rgba.width(),
            rgba.height(),
            ExtendedColorType::Rgba8,
        )
    } else {
        let rgb = img.to_rgb8();
        encoder.write_image(
            rgb.as_raw(),
            rgb.width(),
            rgb.height(),
            ExtendedColorType::Rgb8,
        )
    };
    result.map_err(|e| NodeError::encode(format!("webp: {e}")))?;
    Ok(out)
}

fn set_exif(encoder: &mut impl ImageEncoder, tiff: &[u8], format: &str) -> NodeResult<()> {
    encoder
        .set_exif_metadata(tiff.to_vec())
        .map_err(|e| NodeError::encode(format!("{format} exif: {e}")))
}

#[cfg(test)]
#[path = "../../tests/unit/imaging/metadata.rs"]
mod tests;
