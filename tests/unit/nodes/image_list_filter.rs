use ndarray::Array4;

use super::*;
use crate::host::schema::Args;

fn img(w: usize, h: usize) -> ImageBatch {
    ImageBatch::zeros(1, h, w, 3).unwrap()
}

#[test]
fn images_at_or_below_minimum_are_removed() {
    let images = vec![img(100, 100), img(101, 200), img(300, 100), img(50, 50)];
    let out = filter_images(&images, 100, 0, None);
    assert_eq!(out.removed, vec![0, 3]);
    assert_eq!(out.kept, vec![img(101, 200), img(300, 100)]);
    assert_eq!(out.removed_indices(), "0, 3");

    let out = filter_images(&images, 0, 100, None);
    assert_eq!(out.removed, vec![0, 2, 3]);
}

#[test]
fn zero_minimum_excludes_nothing() {
    let images = vec![img(1, 1), img(0, 0), img(64, 8)];
    let out = filter_images(&images, 0, 0, None);
    assert!(out.removed.is_empty());
    assert_eq!(out.kept.len(), 3);
    assert_eq!(out.removed_indices(), "");
}

#[test]
fn fallback_only_when_everything_is_removed() {
    let fallback = ImageBatch::solid(1, 2, 2, &[1.0, 1.0, 1.0]).unwrap();

    let out = filter_images(&[img(10, 10)], 10, 10, Some(fallback.clone()));
    assert_eq!(out.kept, vec![fallback.clone()]);
    assert_eq!(out.removed, vec![0]);

    let out = filter_images(&[img(11, 11)], 10, 10, Some(fallback));
    assert_eq!(out.kept, vec![img(11, 11)]);
}

#[test]
fn everything_removed_without_fallback_is_empty() {
    let out = filter_images(&[img(5, 5)], 5, 0, None);
    assert!(out.kept.is_empty());
}

#[test]
fn node_normalizes_u8_fallback() {
    let ctx = HostContext::default();
    let raw = Array4::from_elem((1, 2, 2, 3), 255u8);
    let args = Args::new()
        .with("images", Value::ImageList(vec![img(4, 4)]))
        .with("width_min", Value::List(vec![Value::Int(8)]))
        .with("height_min", Value::List(vec![Value::Int(0)]))
        .with("fallback_image", Value::List(vec![Value::ImageU8(raw)]));
    let out = ImageListFilter.invoke(&args, &ctx).unwrap();

    let Value::ImageList(kept) = &out.values[0] else {
        panic!("expected image list");
    };
    assert_eq!(kept.len(), 1);
    assert!(kept[0].data().iter().all(|v| *v == 1.0));
    assert_eq!(out.values[1], Value::from("0"));
}
