use super::*;

#[test]
fn new_frame_honors_clear_color() {
    let canvas = Canvas::new(3, 2).unwrap();
    let clear = FrameRGBA::new(canvas, Some([0, 0, 0, 255])).unwrap();
    assert!(clear.data.chunks_exact(4).all(|px| px == [0, 0, 0, 255]));

    let transparent = FrameRGBA::new(canvas, None).unwrap();
    assert!(transparent.data.iter().all(|&b| b == 0));
    assert!(transparent.premultiplied);
}

#[test]
fn pixel_lookup_is_bounds_checked() {
    let frame = FrameRGBA::new(Canvas::new(2, 2).unwrap(), Some([1, 2, 3, 255])).unwrap();
    assert_eq!(frame.pixel(1, 1), Some([1, 2, 3, 255]));
    assert_eq!(frame.pixel(2, 0), None);
}

#[test]
fn png_export_decodes_back_to_the_same_size() {
    let frame = FrameRGBA::new(Canvas::new(5, 4).unwrap(), Some([10, 20, 30, 255])).unwrap();
    let png = frame.to_png().unwrap();
    let back = image::load_from_memory(&png).unwrap().to_rgba8();
    assert_eq!(back.dimensions(), (5, 4));
    assert_eq!(back.get_pixel(4, 3).0, [10, 20, 30, 255]);
}

#[test]
fn default_settings_leave_background_transparent() {
    assert_eq!(RenderSettings::default().clear_rgba, None);
    assert_eq!(RenderSettings::opaque_black().clear_rgba, Some([0, 0, 0, 255]));
}
