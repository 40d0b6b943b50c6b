use super::*;

#[test]
fn rejects_unsupported_channel_counts() {
    assert!(ImageBatch::zeros(1, 2, 2, 2).is_err());
    assert!(ImageBatch::zeros(1, 2, 2, 5).is_err());
    for c in SUPPORTED_CHANNELS {
        assert!(ImageBatch::zeros(1, 2, 2, c).is_ok());
    }
}

#[test]
fn dimensions_follow_bhwc_layout() {
    let img = ImageBatch::zeros(2, 3, 5, 4).unwrap();
    assert_eq!(img.batch(), 2);
    assert_eq!(img.height(), 3);
    assert_eq!(img.width(), 5);
    assert_eq!(img.channels(), 4);
    assert_eq!(img.image(1).unwrap().shape(), &[3, 5, 4]);
    assert!(img.image(2).is_err());
}

#[test]
fn from_u8_normalizes_to_unit_range() {
    let raw = Array4::from_shape_vec((1, 1, 1, 3), vec![0u8, 51, 255]).unwrap();
    let img = ImageBatch::from_u8(&raw).unwrap();
    let px = img.image(0).unwrap();
    assert_eq!(px[[0, 0, 0]], 0.0);
    assert!((px[[0, 0, 1]] - 0.2).abs() < 1e-6);
    assert_eq!(px[[0, 0, 2]], 1.0);
}

#[test]
fn from_single_adds_batch_axis() {
    let img = ImageBatch::from_single(Array3::zeros((4, 6, 3))).unwrap();
    assert_eq!(img.batch(), 1);
    assert_eq!(img.height(), 4);
    assert_eq!(img.width(), 6);
}

#[test]
fn stack_rebuilds_batch() {
    let a = Array3::from_elem((2, 2, 3), 0.25f32);
    let b = Array3::from_elem((2, 2, 3), 0.75f32);
    let img = ImageBatch::stack(&[a, b]).unwrap();
    assert_eq!(img.batch(), 2);
    assert_eq!(img.image(1).unwrap()[[1, 1, 2]], 0.75);
}

#[test]
fn latent_uses_floor_division_by_eight() {
    let latent = Latent::zeros(3, 910, 682);
    assert_eq!(latent.shape(), [3, 4, 85, 113]);
    assert!(latent.samples.iter().all(|v| *v == 0.0));
}
