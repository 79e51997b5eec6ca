use super::*;

#[test]
fn canvas_rejects_zero_dimensions() {
    assert!(Canvas::new(0, 10).is_err());
    assert!(Canvas::new(10, 0).is_err());
    assert_eq!(Canvas::new(3, 2).unwrap().rgba_len(), 24);
}

#[test]
fn orientation_presets_are_print_sizes() {
    assert_eq!(
        Canvas::for_orientation(Orientation::Portrait),
        Canvas {
            width: 2400,
            height: 3600
        }
    );
    assert_eq!(
        Canvas::for_orientation(Orientation::Landscape),
        Canvas {
            width: 3600,
            height: 2400
        }
    );
}

#[test]
fn orientation_serializes_lowercase() {
    let s = serde_json::to_string(&Orientation::Landscape).unwrap();
    assert_eq!(s, "\"landscape\"");
}

#[test]
fn pixel_rect_emptiness() {
    assert!(PixelRect::new(0, 0, 0, 5).is_empty());
    assert!(!PixelRect::new(-3, -3, 1, 1).is_empty());
}
