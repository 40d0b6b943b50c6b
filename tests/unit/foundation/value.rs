use super::*;

#[test]
fn scalars_unwrap_single_element_lists() {
    let wrapped = Value::List(vec![Value::Int(7)]);
    assert_eq!(wrapped.as_int().unwrap(), 7);
    assert_eq!(wrapped.as_float().unwrap(), 7.0);

    let nested = Value::List(vec![Value::List(vec![Value::from("hi")])]);
    assert_eq!(nested.as_str().unwrap(), "hi");
}

#[test]
fn mismatched_types_are_validation_errors() {
    let err = Value::from("x").as_int().unwrap_err();
    assert!(err.to_string().contains("expected INT, got STRING"));
    assert!(Value::Int(1).as_bool().is_err());
}

#[test]
fn u8_images_normalize_on_coercion() {
    let raw = Array4::from_elem((1, 2, 2, 3), 255u8);
    let img = Value::ImageU8(raw).to_image().unwrap();
    assert!(img.data().iter().all(|v| *v == 1.0));
}

#[test]
fn image_list_coercion_accepts_single_batches() {
    let img = ImageBatch::zeros(1, 2, 2, 3).unwrap();
    let list = Value::Image(img.clone()).to_image_list().unwrap();
    assert_eq!(list, vec![img.clone()]);

    let wrapped = Value::List(vec![Value::Image(img.clone()), Value::Image(img)]);
    assert_eq!(wrapped.to_image_list().unwrap().len(), 2);
}

#[test]
fn empty_list_has_no_first_image() {
    assert!(Value::ImageList(vec![]).to_image().is_err());
}
