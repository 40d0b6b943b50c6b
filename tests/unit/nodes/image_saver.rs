use chrono::{TimeZone, Utc};

use super::*;
use crate::host::config::HostConfig;
use crate::host::schema::Args;

fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 9, 7, 5, 2).unwrap()
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

fn gray_batch(batch: usize) -> ImageBatch {
    ImageBatch::solid(batch, 4, 6, &[0.5, 0.5, 0.5]).unwrap()
}

#[test]
fn counter_base_follows_leading_digits() {
    let dir = tempfile::tempdir().unwrap();
    assert_eq!(counter_base(dir.path()), 1);
    assert_eq!(counter_base(&dir.path().join("missing")), 1);

    for name in ["00007_a.png", "12-notes.txt", "x99.png", "3"] {
        std::fs::write(dir.path().join(name), b"").unwrap();
    }
    assert_eq!(counter_base(dir.path()), 13);
}

#[test]
fn format_names_map_to_encoders() {
    assert_eq!(SaveFormat::parse("png").unwrap(), SaveFormat::Png);
    assert_eq!(SaveFormat::parse("jpg").unwrap(), SaveFormat::Jpeg);
    assert_eq!(SaveFormat::parse("jpeg").unwrap(), SaveFormat::Jpeg);
    assert_eq!(SaveFormat::parse("webp").unwrap(), SaveFormat::WebP);
    assert!(SaveFormat::parse("gif").is_err());
}

#[test]
fn default_templates_render_date_time_and_seed() {
    let dir = tempfile::tempdir().unwrap();
    let opts = SaveOptions {
        seed: 42,
        ..SaveOptions::default()
    };
    let saved = save_images(&gray_batch(1), &opts, dir.path(), None, &fixed_now()).unwrap();

    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].subfolder, "2024-03-09");
    assert_eq!(saved[0].filename, "42_2024-03-09_070502_final_OCS.png");
    assert_eq!(
        saved[0].path,
        dir.path()
            .join("2024-03-09")
            .join("42_2024-03-09_070502_final_OCS.png")
    );

    let decoded = image::open(&saved[0].path).unwrap().to_rgb8();
    assert_eq!(decoded.dimensions(), (6, 4));
    // 0.5 * 255 truncates to 127
    assert_eq!(decoded.get_pixel(0, 0).0, [127, 127, 127]);
}

#[test]
fn counter_token_is_zero_padded_per_batch_index() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("00041_old.png"), b"").unwrap();
    let opts = SaveOptions {
        filename: "%counter_%image_format".to_string(),
        path: "/".to_string(),
        ..SaveOptions::default()
    };
    let saved = save_images(&gray_batch(3), &opts, dir.path(), None, &fixed_now()).unwrap();

    let names: Vec<&str> = saved.iter().map(|s| s.filename.as_str()).collect();
    assert_eq!(
        names,
        vec!["00042_png.png", "00043_png.png", "00044_png.png"]
    );
    assert!(saved.iter().all(|s| s.subfolder.is_empty()));
    assert!(saved.iter().all(|s| s.path.exists()));
}

#[test]
fn png_embeds_workflow_and_user_comment() {
    let dir = tempfile::tempdir().unwrap();
    let workflow = serde_json::json!({ "nodes": [1, 2] });
    let opts = SaveOptions {
        filename: "wf".to_string(),
        path: String::new(),
        user_comment: "hello".to_string(),
        ..SaveOptions::default()
    };
    let saved = save_images(
        &gray_batch(1),
        &opts,
        dir.path(),
        Some(&workflow),
        &fixed_now(),
    )
    .unwrap();

    let bytes = std::fs::read(&saved[0].path).unwrap();
    assert!(contains(&bytes, b"tEXtworkflow\0{\"nodes\":[1,2]}"));
    assert!(contains(&bytes, b"eXIf"));
    assert!(contains(&bytes, &crate::imaging::metadata::user_comment_bytes("hello")));
}

#[test]
fn workflow_is_skipped_when_embedding_is_off() {
    let dir = tempfile::tempdir().unwrap();
    let workflow = serde_json::json!({ "nodes": [] });
    let opts = SaveOptions {
        filename: "plain".to_string(),
        path: String::new(),
        embed_workflow: false,
        ..SaveOptions::default()
    };
    let saved = save_images(
        &gray_batch(1),
        &opts,
        dir.path(),
        Some(&workflow),
        &fixed_now(),
    )
    .unwrap();
    let bytes = std::fs::read(&saved[0].path).unwrap();
    assert!(!contains(&bytes, b"workflow"));
    assert!(!contains(&bytes, b"eXIf"));
}

#[test]
fn jpeg_and_webp_carry_exif() {
    let dir = tempfile::tempdir().unwrap();
    let workflow = serde_json::json!({ "id": 7 });
    for ext in ["jpg", "webp"] {
        let opts = SaveOptions {
            filename: "meta".to_string(),
            path: String::new(),
            image_format: ext.to_string(),
            lossless_webp: false,
            quality: 80,
            user_comment: "note".to_string(),
            ..SaveOptions::default()
        };
        let saved = save_images(
            &gray_batch(1),
            &opts,
            dir.path(),
            Some(&workflow),
            &fixed_now(),
        )
        .unwrap();
        assert_eq!(saved[0].filename, format!("meta.{ext}"));

        let bytes = std::fs::read(&saved[0].path).unwrap();
        assert!(contains(&bytes, &crate::imaging::metadata::user_comment_bytes("note")));
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (6, 4));
        if ext == "webp" {
            assert!(contains(&bytes, b"workflow:{\"id\":7}"));
        } else {
            assert!(!contains(&bytes, b"workflow:"));
        }
    }
}

#[test]
fn bad_date_format_is_used_verbatim() {
    let dir = tempfile::tempdir().unwrap();
    let opts = SaveOptions {
        filename: "shot_%date".to_string(),
        path: String::new(),
        date_format: "%Y-%".to_string(),
        ..SaveOptions::default()
    };
    let saved = save_images(&gray_batch(1), &opts, dir.path(), None, &fixed_now()).unwrap();
    assert_eq!(saved[0].filename, "shot_%Y-%.png");
    assert!(saved[0].path.is_file());
}

#[test]
fn oversized_comment_falls_back_to_plain_jpeg() {
    let dir = tempfile::tempdir().unwrap();
    let opts = SaveOptions {
        filename: "long".to_string(),
        path: String::new(),
        image_format: "jpg".to_string(),
        user_comment: "c".repeat(40_000),
        ..SaveOptions::default()
    };
    let saved = save_images(&gray_batch(1), &opts, dir.path(), None, &fixed_now()).unwrap();
    assert_eq!(saved.len(), 1);

    let bytes = std::fs::read(&saved[0].path).unwrap();
    assert!(!contains(&bytes, b"Exif\0\0"));
    let decoded = image::load_from_memory(&bytes).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (6, 4));
}

#[test]
fn unencodable_images_are_skipped() {
    let dir = tempfile::tempdir().unwrap();
    // wider than a lossless WebP canvas allows
    let wide = ImageBatch::solid(2, 1, 20_000, &[0.2, 0.4, 0.6]).unwrap();
    let opts = SaveOptions {
        filename: "wide_%counter".to_string(),
        path: String::new(),
        image_format: "webp".to_string(),
        ..SaveOptions::default()
    };
    let saved = save_images(&wide, &opts, dir.path(), None, &fixed_now()).unwrap();
    assert!(saved.is_empty());
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn unwritable_target_is_skipped() {
    let dir = tempfile::tempdir().unwrap();
    // a plain file where the subfolder should go
    std::fs::write(dir.path().join("blocked"), b"").unwrap();
    let opts = SaveOptions {
        filename: "x".to_string(),
        path: "blocked".to_string(),
        ..SaveOptions::default()
    };
    let saved = save_images(&gray_batch(2), &opts, dir.path(), None, &fixed_now()).unwrap();
    assert!(saved.is_empty());
}

#[test]
fn node_returns_single_string_for_one_image() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = HostContext::new(HostConfig {
        output_dir: dir.path().to_path_buf(),
        ..HostConfig::default()
    });
    let args = Args::new()
        .with("images", gray_batch(1))
        .with("filename", "one")
        .with("path", "sub");
    let out = ImageSaver.invoke(&args, &ctx).unwrap();

    assert_eq!(out.values[0], Value::from("one.png"));
    let expected = dir.path().join("sub").join("one.png");
    assert_eq!(out.values[1], Value::String(expected.display().to_string()));
    assert!(expected.exists());

    let ui = out.ui.unwrap();
    assert_eq!(
        ui,
        serde_json::json!({
            "images": [{ "filename": "one.png", "subfolder": "sub", "type": "output" }]
        })
    );
}

#[test]
fn node_returns_lists_for_batches_and_reads_workflow() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = HostContext::new(HostConfig {
        output_dir: dir.path().to_path_buf(),
        ..HostConfig::default()
    });
    let args = Args::new()
        .with("images", gray_batch(2))
        .with("filename", "b_%counter")
        .with("path", "")
        .with(
            "extra_pnginfo",
            Value::Json(serde_json::json!({ "workflow": { "v": 1 } })),
        );
    let out = ImageSaver.invoke(&args, &ctx).unwrap();

    assert_eq!(
        out.values[0],
        Value::Strings(vec!["b_00001.png".to_string(), "b_00002.png".to_string()])
    );
    let bytes = std::fs::read(dir.path().join("b_00001.png")).unwrap();
    assert!(contains(&bytes, b"{\"v\":1}"));
    assert!(ImageSaver.is_output_node());
}

#[test]
fn node_rejects_unknown_format() {
    let ctx = HostContext::default();
    let args = Args::new()
        .with("images", gray_batch(1))
        .with("image_format", "tiff");
    assert!(ImageSaver.invoke(&args, &ctx).is_err());
}

#[test]
fn node_succeeds_when_no_image_could_be_encoded() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = HostContext::new(HostConfig {
        output_dir: dir.path().to_path_buf(),
        ..HostConfig::default()
    });
    let args = Args::new()
        .with("images", ImageBatch::solid(1, 1, 20_000, &[0.0, 0.0, 0.0]).unwrap())
        .with("path", "")
        .with("image_format", "webp");
    let out = ImageSaver.invoke(&args, &ctx).unwrap();

    assert_eq!(out.values[0], Value::Strings(Vec::new()));
    assert_eq!(out.ui.unwrap(), serde_json::json!({ "images": [] }));
}
