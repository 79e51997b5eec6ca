use super::*;

/// Left half red, right half blue.
fn split(w: u32, h: u32) -> PreparedImage {
    let mut img = image::RgbaImage::new(w, h);
    for (x, _, p) in img.enumerate_pixels_mut() {
        *p = if x < w / 2 {
            image::Rgba([255, 0, 0, 255])
        } else {
            image::Rgba([0, 0, 255, 255])
        };
    }
    PreparedImage::from_rgba_image(img)
}

fn px(img: &PreparedImage, x: u32, y: u32) -> [u8; 4] {
    let i = ((y * img.width + x) * 4) as usize;
    let d = img.rgba8_premul.as_slice();
    [d[i], d[i + 1], d[i + 2], d[i + 3]]
}

#[test]
fn output_has_the_target_size_and_is_opaque() {
    let target = Canvas::new(60, 90).unwrap();
    let out = normalize_photo(&split(200, 100), target, CaptureOpts::default()).unwrap();
    assert_eq!((out.width, out.height), (60, 90));
    assert!(out.rgba8_premul.chunks_exact(4).all(|p| p[3] == 255));
}

#[test]
fn mirroring_swaps_left_and_right() {
    let target = Canvas::new(40, 20).unwrap();
    let plain = CaptureOpts {
        mirror: false,
        monochrome: false,
    };
    let out = normalize_photo(&split(80, 40), target, plain).unwrap();
    assert_eq!(px(&out, 2, 10), [255, 0, 0, 255]);
    assert_eq!(px(&out, 37, 10), [0, 0, 255, 255]);

    let mirrored = normalize_photo(&split(80, 40), target, CaptureOpts::default()).unwrap();
    assert_eq!(px(&mirrored, 2, 10), [0, 0, 255, 255]);
    assert_eq!(px(&mirrored, 37, 10), [255, 0, 0, 255]);
}

#[test]
fn monochrome_uses_luma_weights() {
    let target = Canvas::new(40, 20).unwrap();
    let opts = CaptureOpts {
        mirror: false,
        monochrome: true,
    };
    let out = normalize_photo(&split(80, 40), target, opts).unwrap();
    assert_eq!(px(&out, 2, 10), [54, 54, 54, 255]);
    assert_eq!(px(&out, 37, 10), [18, 18, 18, 255]);
}

#[test]
fn transparent_sources_land_on_black() {
    let src = PreparedImage::from_premul(2, 2, vec![0; 16]).unwrap();
    let out = normalize_photo(&src, Canvas::new(4, 4).unwrap(), CaptureOpts::default()).unwrap();
    assert!(out.rgba8_premul.chunks_exact(4).all(|p| p == [0, 0, 0, 255]));
}

#[test]
fn empty_sources_are_rejected() {
    let src = PreparedImage::from_premul(0, 0, Vec::new()).unwrap();
    assert!(normalize_photo(&src, Canvas::new(4, 4).unwrap(), CaptureOpts::default()).is_err());
}
