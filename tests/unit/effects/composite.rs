use super::*;

#[test]
fn over_opacity_0_is_noop() {
    let dst = [1, 2, 3, 4];
    let src = [200, 200, 200, 200];
    assert_eq!(over(dst, src, 0.0), dst);
}

#[test]
fn over_src_alpha_0_is_noop() {
    let dst = [10, 20, 30, 40];
    let src = [255, 255, 255, 0];
    assert_eq!(over(dst, src, 1.0), dst);
}

#[test]
fn over_src_opaque_replaces_dst() {
    let dst = [0, 0, 0, 255];
    let src = [255, 0, 0, 255];
    assert_eq!(over(dst, src, 1.0), src);
}

#[test]
fn over_in_place_rejects_mismatched_buffers() {
    let mut dst = vec![0u8; 8];
    assert!(over_in_place(&mut dst, &[0u8; 4], 1.0).is_err());
}

#[test]
fn tint_never_paints_into_transparent_pixels() {
    let mut layer = vec![
        0, 0, 0, 0, // hole
        40, 40, 40, 255, // opaque artwork
        20, 20, 20, 128, // half-covered edge
    ];
    tint_atop_in_place(&mut layer, HexColor::rgb(255, 0, 0), 1.0).unwrap();

    assert_eq!(&layer[0..4], &[0, 0, 0, 0]);
    assert_eq!(&layer[4..8], &[255, 0, 0, 255]);
    assert_eq!(&layer[8..12], &[128, 0, 0, 128]);
}

#[test]
fn tint_opacity_blends_linearly() {
    let mut layer = vec![0, 0, 200, 255];
    tint_atop_in_place(&mut layer, HexColor::rgb(255, 255, 255), 0.5).unwrap();
    // 128/255 white over 127/255 of the original blue.
    assert_eq!(layer[0], 128);
    assert_eq!(layer[2], 128 + mul_div255(200, 127));
    assert_eq!(layer[3], 255);
}

#[test]
fn zero_opacity_tint_is_identity() {
    let mut layer = vec![1, 2, 3, 255, 0, 0, 0, 0];
    let before = layer.clone();
    tint_atop_in_place(&mut layer, HexColor::rgb(9, 9, 9), 0.0).unwrap();
    assert_eq!(layer, before);
}
