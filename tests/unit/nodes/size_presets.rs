use super::*;
use crate::host::schema::Args;

#[test]
fn every_sized_preset_reports_its_dimensions_and_latent() {
    for table in [
        &CLOUD_IMAGE_PRESETS,
        &LOCAL_IMAGE_PRESETS,
        &LOCAL_VIDEO_PRESETS,
    ] {
        for row in table.rows {
            let PresetRow::Size {
                label,
                width,
                height,
            } = *row
            else {
                continue;
            };
            let sel = configure_sizes(table, label, Some((64, 64)), 2).unwrap();
            assert_eq!((sel.width, sel.height), (width, height), "{label}");
            assert_eq!(
                sel.latent.shape(),
                [2, 4, (height / 8) as usize, (width / 8) as usize],
                "{label}"
            );
            assert_eq!(sel.aspect_ratio, format!("{width}x{height}"), "{label}");
        }
    }
}

#[test]
fn preset_labels_parse_to_their_own_dimensions() {
    for table in [&LOCAL_IMAGE_PRESETS, &LOCAL_VIDEO_PRESETS] {
        for row in table.rows {
            if let PresetRow::Size {
                label,
                width,
                height,
            } = *row
            {
                assert!(label.starts_with(&format!("{width}x{height} ")), "{label}");
            }
        }
    }
}

#[test]
fn table_sizes_match_dropdowns() {
    assert_eq!(CLOUD_IMAGE_PRESETS.rows.len(), 4);
    assert_eq!(LOCAL_IMAGE_PRESETS.rows.len(), 25);
    assert_eq!(LOCAL_VIDEO_PRESETS.rows.len(), 6);
    assert_eq!(
        LOCAL_IMAGE_PRESETS.dimensions("952x512 (1.85:1 | 0.5MP)"),
        Some((952, 512))
    );
}

#[test]
fn custom_uses_widget_dimensions() {
    let sel = configure_sizes(&LOCAL_VIDEO_PRESETS, CUSTOM, Some((640, 360)), 1).unwrap();
    assert_eq!(sel.aspect_ratio, "640x360");
    assert_eq!((sel.width, sel.height), (640, 360));
    assert_eq!(sel.latent.shape(), [1, 4, 45, 80]);
}

#[test]
fn separator_rows_fall_back_to_custom_on_local_tables() {
    let sel = configure_sizes(
        &LOCAL_IMAGE_PRESETS,
        "------------- SD 1.5 ---------------",
        Some((128, 256)),
        1,
    )
    .unwrap();
    assert_eq!((sel.width, sel.height), (128, 256));
    assert_eq!(sel.aspect_ratio, "128x256");
}

#[test]
fn cloud_table_rejects_separator_and_unknown_labels() {
    assert!(
        configure_sizes(
            &CLOUD_IMAGE_PRESETS,
            "------ OpenAI GPT-image-1 ------",
            None,
            1
        )
        .is_err()
    );
    assert!(configure_sizes(&CLOUD_IMAGE_PRESETS, "custom", None, 1).is_err());
}

#[test]
fn zero_batch_is_rejected() {
    assert!(configure_sizes(&LOCAL_VIDEO_PRESETS, CUSTOM, Some((64, 64)), 0).is_err());
}

#[test]
fn node_invocation_emits_five_outputs() {
    let ctx = HostContext::default();
    let out = LocalImageSize
        .invoke(
            &Args::new()
                .push("1920x1088 (16:9 | 2MP)")
                .push(64i64)
                .push(64i64)
                .push(3i64),
            &ctx,
        )
        .unwrap();
    assert_eq!(out.values.len(), LocalImageSize.outputs().len());
    assert_eq!(out.values[0], Value::from("1920x1088"));
    assert_eq!(out.values[1], Value::Int(1920));
    assert_eq!(out.values[2], Value::Int(1088));
    let Value::Latent(latent) = &out.values[3] else {
        panic!("expected latent");
    };
    assert_eq!(latent.shape(), [3, 4, 136, 240]);
    assert_eq!(out.values[4], Value::Int(3));
}

#[test]
fn cloud_node_takes_batch_as_second_argument() {
    let ctx = HostContext::default();
    let out = CloudImageSize
        .invoke(&Args::new().push("1024x1536 (2:3 | 1.6MP)").push(2i64), &ctx)
        .unwrap();
    assert_eq!(out.values[0], Value::from("1024x1536"));
    assert_eq!(out.values[4], Value::Int(2));
}

#[test]
fn custom_widgets_are_range_checked() {
    let ctx = HostContext::default();
    let args = Args::new()
        .with("Aspect Ratio", CUSTOM)
        .with("Custom Width", 32i64)
        .with("Custom Height", 64i64)
        .with("Batch Size", 1i64);
    assert!(LocalVideoSize.invoke(&args, &ctx).is_err());
}
