use image::{Rgb, RgbImage, Rgba, RgbaImage};

use super::*;

fn be16(b: &[u8], at: usize) -> u16 {
    u16::from_be_bytes([b[at], b[at + 1]])
}

fn be32(b: &[u8], at: usize) -> u32 {
    u32::from_be_bytes([b[at], b[at + 1], b[at + 2], b[at + 3]])
}

/// Find `tag` in the IFD at `ifd`, returning its value bytes.
fn read_tag(tiff: &[u8], ifd: usize, tag: u16) -> Option<Vec<u8>> {
    let count = be16(tiff, ifd) as usize;
    for i in 0..count {
        let e = ifd + 2 + 12 * i;
        if be16(tiff, e) != tag {
            continue;
        }
        let len = be32(tiff, e + 4) as usize;
        let len = if be16(tiff, e + 2) == TYPE_LONG {
            4 * len
        } else {
            len
        };
        if len <= 4 {
            return Some(tiff[e + 8..e + 8 + len].to_vec());
        }
        let off = be32(tiff, e + 8) as usize;
        return Some(tiff[off..off + len].to_vec());
    }
    None
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

fn sample_rgb() -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_pixel(3, 2, Rgb([10, 20, 30])))
}

#[test]
fn user_comment_is_unicode_prefixed_utf16be() {
    let bytes = user_comment_bytes("hé");
    assert_eq!(&bytes[..8], UNICODE_PREFIX);
    assert_eq!(&bytes[8..], &[0x00, b'h', 0x00, 0xE9]);
}

#[test]
fn empty_fields_produce_no_tiff() {
    assert_eq!(ExifFields::default().to_tiff().unwrap(), None);
}

#[test]
fn tiff_links_user_comment_through_exif_ifd() {
    let fields = ExifFields {
        make: None,
        user_comment: Some("hello".to_string()),
    };
    let tiff = fields.to_tiff().unwrap().unwrap();
    assert_eq!(&tiff[..4], b"MM\0\x2A");
    assert_eq!(be32(&tiff, 4), 8);

    let exif_ptr = read_tag(&tiff, 8, TAG_EXIF_IFD).unwrap();
    let exif_ifd = u32::from_be_bytes([exif_ptr[0], exif_ptr[1], exif_ptr[2], exif_ptr[3]]);
    let comment = read_tag(&tiff, exif_ifd as usize, TAG_USER_COMMENT).unwrap();
    assert_eq!(comment, user_comment_bytes("hello"));
}

#[test]
fn tiff_carries_make_and_comment_together() {
    let fields = ExifFields {
        make: Some("workflow:{\"a\":1}".to_string()),
        user_comment: Some("c".to_string()),
    };
    let tiff = fields.to_tiff().unwrap().unwrap();

    let make = read_tag(&tiff, 8, TAG_MAKE).unwrap();
    assert_eq!(make, b"workflow:{\"a\":1}\0");

    let exif_ptr = read_tag(&tiff, 8, TAG_EXIF_IFD).unwrap();
    let exif_ifd = u32::from_be_bytes([exif_ptr[0], exif_ptr[1], exif_ptr[2], exif_ptr[3]]);
    assert_eq!(
        read_tag(&tiff, exif_ifd as usize, TAG_USER_COMMENT).unwrap(),
        user_comment_bytes("c")
    );
}

#[test]
fn png_embeds_text_and_exif_and_still_decodes() {
    let tiff = ExifFields {
        make: None,
        user_comment: Some("note".to_string()),
    }
    .to_tiff()
    .unwrap()
    .unwrap();
    let bytes = encode_png(
        &sample_rgb(),
        PngMetadata {
            text: &[("workflow", "{\"nodes\":[]}")],
            exif: Some(&tiff),
        },
    )
    .unwrap();

    assert!(contains(&bytes, b"tEXtworkflow\0{\"nodes\":[]}"));
    assert!(contains(&bytes, b"eXIf"));
    assert!(contains(&bytes, &tiff));

    let decoded = image::load_from_memory(&bytes).unwrap().to_rgb8();
    assert_eq!(decoded.get_pixel(2, 1).0, [10, 20, 30]);
}

#[test]
fn png_non_ascii_text_uses_itxt() {
    let bytes = encode_png(
        &sample_rgb(),
        PngMetadata {
            text: &[("workflow", "ünïcode")],
            exif: None,
        },
    )
    .unwrap();
    assert!(contains(&bytes, b"iTXtworkflow"));
}

#[test]
fn jpeg_exif_lands_after_jfif_header() {
    let tiff = b"MM\0\x2A\0\0\0\x08\0\0\0\0\0\0".to_vec();
    let bytes = encode_jpeg(&sample_rgb(), 90, Some(&tiff)).unwrap();
    assert_eq!(&bytes[..2], &[0xFF, 0xD8]);

    let app1 = bytes
        .windows(2)
        .position(|w| w == [0xFF, 0xE1])
        .unwrap();
    assert_eq!(&bytes[app1 + 4..app1 + 10], b"Exif\0\0");
    assert_eq!(&bytes[app1 + 10..app1 + 10 + tiff.len()], tiff.as_slice());
    assert_eq!(
        usize::from(u16::from_be_bytes([bytes[app1 + 2], bytes[app1 + 3]])),
        2 + 6 + tiff.len()
    );

    image::load_from_memory(&bytes).unwrap();
}

#[test]
fn jpeg_rejects_exif_larger_than_one_segment() {
    let tiff = vec![0u8; MAX_JPEG_EXIF_LEN + 1];
    let err = encode_jpeg(&sample_rgb(), 90, Some(&tiff)).unwrap_err();
    assert!(err.to_string().contains("APP1"));

    let fits = vec![0u8; MAX_JPEG_EXIF_LEN];
    let bytes = encode_jpeg(&sample_rgb(), 90, Some(&fits)).unwrap();
    image::load_from_memory(&bytes).unwrap();
}

#[test]
fn webp_gets_extended_header_and_exif_chunk() {
    let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(5, 3, Rgba([1, 2, 3, 128])));
    let tiff = b"MM\0\x2A\0\0\0\x08\0\0\0\0\0".to_vec();
    let bytes = encode_webp(&img, Some(&tiff)).unwrap();

    assert_eq!(&bytes[..4], b"RIFF");
    assert_eq!(
        u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]) as usize,
        bytes.len() - 8
    );
    assert_eq!(&bytes[8..12], b"WEBP");
    assert_eq!(&bytes[12..16], b"VP8X");
    // EXIF and alpha bits
    let flags = bytes[20];
    assert_ne!(flags & 0x08, 0);
    assert_ne!(flags & 0x10, 0);
    assert_eq!(&bytes[24..27], &[4, 0, 0]);
    assert_eq!(&bytes[27..30], &[2, 0, 0]);
    assert!(contains(&bytes, b"EXIF"));
    assert!(contains(&bytes, &tiff));

    let decoded = image::load_from_memory(&bytes).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (5, 3));
}

#[test]
fn webp_without_exif_is_plain() {
    let bytes = encode_webp(&sample_rgb(), None).unwrap();
    assert_eq!(&bytes[8..12], b"WEBP");
    assert!(!contains(&bytes, b"EXIF"));
}
