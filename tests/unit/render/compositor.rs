use std::io::Cursor;

use super::*;
use crate::assets::store::MemoryAssetLoader;
use crate::foundation::error::BoothError;
use crate::render::context::RenderTokenSource;
use crate::template::slots::SlotDetectOpts;

const RED: [u8; 4] = [255, 0, 0, 255];
const GREEN: [u8; 4] = [0, 255, 0, 255];
const BLUE: [u8; 4] = [0, 0, 255, 255];
const WHITE: [u8; 4] = [255, 255, 255, 255];

fn encode(img: image::RgbaImage) -> Vec<u8> {
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    buf
}

fn template_img(w: u32, h: u32, holes: &[(u32, u32, u32, u32)]) -> image::RgbaImage {
    let mut img = image::RgbaImage::from_pixel(w, h, image::Rgba(WHITE));
    for &(hx, hy, hw, hh) in holes {
        for y in hy..hy + hh {
            for x in hx..hx + hw {
                img.put_pixel(x, y, image::Rgba([0, 0, 0, 0]));
            }
        }
    }
    img
}

fn solid_png(w: u32, h: u32, px: [u8; 4]) -> Vec<u8> {
    encode(image::RgbaImage::from_pixel(w, h, image::Rgba(px)))
}

fn loader_with(template: &str, img: image::RgbaImage) -> MemoryAssetLoader {
    let mut loader = MemoryAssetLoader::new();
    loader.insert(template, encode(img));
    loader.insert("red.png", solid_png(64, 48, RED));
    loader.insert("green.png", solid_png(48, 64, GREEN));
    loader.insert("blue.png", solid_png(50, 50, BLUE));
    loader
}

fn committed_pixel(ctx: &RenderContext, x: u32, y: u32) -> [u8; 4] {
    ctx.committed_frame().unwrap().pixel(x, y).unwrap()
}

fn grid_holes(rows: u32, cols: u32, pitch: u32, side: u32) -> Vec<(u32, u32, u32, u32)> {
    (0..rows)
        .flat_map(|r| (0..cols).map(move |c| (20 + c * pitch, 20 + r * pitch, side, side)))
        .collect()
}

#[test]
fn broadcast_fills_every_slot_with_the_first_photo() {
    let holes = grid_holes(2, 2, 180, 140);
    let mut loader = loader_with("polaroid.png", template_img(400, 400, &holes));
    let mut ctx = RenderContext::default();
    let req = CompositeRequest::preview(
        TemplateSpec::new("polaroid.png", "Polaroid Landscape 1x - 01", 1),
        vec!["red.png".into()],
    );

    let outcome = composite(&mut ctx, &mut loader, &req).unwrap();
    let report = outcome.report().unwrap();
    assert_eq!(report.class, TemplateClass::Broadcast);
    assert_eq!(report.draws.len(), 4);
    assert!(report.draws.iter().all(|d| d.photo == 0));

    for &(x, y, w, h) in &holes {
        assert_eq!(committed_pixel(&ctx, x + w / 2, y + h / 2), RED);
    }
    assert_eq!(committed_pixel(&ctx, 5, 5), WHITE);
    // Decoded once, drawn four times.
    assert_eq!(loader.load_count("red.png"), 1);
    assert_eq!(ctx.stats().photo_draws, 4);
}

#[test]
fn photostrip_duplicates_each_pose_along_its_row() {
    let holes = grid_holes(3, 2, 200, 150);
    let mut loader = loader_with("strip.png", template_img(420, 620, &holes));
    let mut ctx = RenderContext::default();
    let req = CompositeRequest::preview(
        TemplateSpec::new("strip.png", "Classic Photostrip 3x", 3),
        vec!["red.png".into(), "green.png".into(), "blue.png".into()],
    );

    let report = composite(&mut ctx, &mut loader, &req)
        .unwrap()
        .report()
        .cloned()
        .unwrap();
    assert_eq!(
        report.class,
        TemplateClass::MultiPoseStrip {
            pose_axis: PoseAxis::Rows
        }
    );
    assert_eq!(report.draws.len(), 6);

    let colors = [RED, GREEN, BLUE];
    for (row, color) in colors.iter().enumerate() {
        for col in 0..2u32 {
            let (cx, cy) = (95 + col * 200, 95 + row as u32 * 200);
            assert_eq!(committed_pixel(&ctx, cx, cy), *color, "cell ({col},{row})");
        }
    }
}

#[test]
fn column_strips_only_fill_captured_poses() {
    let holes: Vec<_> = (0..4).map(|c| (20 + c * 200, 20, 150, 150)).collect();
    let template = LoadedTemplate::prepare(
        TemplateSpec::new("row.png", "Photostrip 4x", 4),
        PreparedImage::from_rgba_image(template_img(840, 200, &holes)),
        &SlotDetectOpts::default(),
    );
    assert_eq!(
        template.class,
        TemplateClass::MultiPoseStrip {
            pose_axis: PoseAxis::Cols
        }
    );

    let draws = plan_photo_draws(&template, 2);
    assert_eq!(draws.len(), 2);
    assert_eq!(draws[0].photo, 0);
    assert_eq!(draws[1].photo, 1);
    assert!(draws[0].slot.x < draws[1].slot.x);
}

#[test]
fn ordinal_pairs_photos_with_slots_in_reading_order() {
    let holes = [(20, 20, 150, 150), (220, 20, 150, 150)];
    let mut loader = loader_with("two.png", template_img(400, 200, &holes));
    let mut ctx = RenderContext::default();
    let req = CompositeRequest::preview(
        TemplateSpec::new("two.png", "Frame", 2),
        vec!["green.png".into()],
    );

    let report = composite(&mut ctx, &mut loader, &req)
        .unwrap()
        .report()
        .cloned()
        .unwrap();
    assert_eq!(report.class, TemplateClass::Ordinal);
    assert_eq!(report.draws.len(), 1);
    assert_eq!(committed_pixel(&ctx, 95, 95), GREEN);
    // Second slot stays empty in a transparent preview.
    assert_eq!(committed_pixel(&ctx, 295, 95), [0, 0, 0, 0]);
}

#[test]
fn final_render_scales_slots_and_tints_only_artwork() {
    let holes = [(100, 100, 200, 200)];
    let mut loader = loader_with("one.png", template_img(400, 400, &holes));
    let mut ctx = RenderContext::default();
    let target = Canvas::new(800, 800).unwrap();
    let req = CompositeRequest::final_render(
        TemplateSpec::new("one.png", "Frame", 1),
        vec!["green.png".into()],
        target,
        Some(Tint {
            color: HexColor::rgb(255, 0, 0),
            opacity_percent: 100.0,
        }),
    );

    let report = composite(&mut ctx, &mut loader, &req)
        .unwrap()
        .report()
        .cloned()
        .unwrap();
    assert_eq!(report.canvas, target);
    assert_eq!(committed_pixel(&ctx, 400, 400), GREEN);
    assert_eq!(committed_pixel(&ctx, 210, 210), GREEN);
    assert_eq!(committed_pixel(&ctx, 10, 10), RED);
    assert_eq!(committed_pixel(&ctx, 790, 790), RED);
}

#[test]
fn template_is_detected_once_per_identity() {
    let mut loader = loader_with("one.png", template_img(300, 300, &[(50, 50, 200, 200)]));
    let mut ctx = RenderContext::default();
    let req = CompositeRequest::preview(
        TemplateSpec::new("one.png", "Frame", 1),
        vec!["red.png".into()],
    );

    let first = composite(&mut ctx, &mut loader, &req).unwrap();
    let second = composite(&mut ctx, &mut loader, &req).unwrap();
    assert!(!first.report().unwrap().template_cache_hit);
    assert!(second.report().unwrap().template_cache_hit);
    assert_eq!(first.report().unwrap().draws, second.report().unwrap().draws);
    assert_eq!(loader.load_count("one.png"), 1);
    assert_eq!(ctx.stats().template_detections, 1);
    assert_eq!(ctx.stats().template_cache_hits, 1);
}

#[test]
fn only_the_latest_template_stays_cached() {
    let mut loader = loader_with("t0.png", template_img(300, 300, &[(50, 50, 200, 200)]));
    for i in 1..5 {
        let img = template_img(300, 300, &[(50, 50, 200, 200)]);
        loader.insert(format!("t{i}.png"), encode(img));
    }
    let mut ctx = RenderContext::default();

    for i in 0..5 {
        let req = CompositeRequest::preview(
            TemplateSpec::new(format!("t{i}.png"), "Frame", 1),
            vec!["red.png".into()],
        );
        composite(&mut ctx, &mut loader, &req).unwrap();
        assert_eq!(ctx.cached_template_count(), 1);
    }
    assert_eq!(ctx.stats().template_detections, 5);
    assert!(ctx.cached_template(&TemplateSpec::new("t0.png", "Frame", 1)).is_none());
    assert!(ctx.cached_template(&TemplateSpec::new("t4.png", "Frame", 1)).is_some());

    // Going back to an evicted template decodes it again.
    let back = CompositeRequest::preview(
        TemplateSpec::new("t0.png", "Frame", 1),
        vec!["red.png".into()],
    );
    let outcome = composite(&mut ctx, &mut loader, &back).unwrap();
    assert!(!outcome.report().unwrap().template_cache_hit);
    assert_eq!(loader.load_count("t0.png"), 2);
    assert_eq!(ctx.cached_template_count(), 1);

    ctx.clear_template_cache();
    assert_eq!(ctx.cached_template_count(), 0);
}

/// Starts a newer render when `trigger` is loaded, standing in for a render requested mid-load.
struct InterruptingLoader {
    inner: MemoryAssetLoader,
    tokens: RenderTokenSource,
    trigger: &'static str,
    fired: bool,
}

impl AssetLoader for InterruptingLoader {
    fn load_image(&mut self, locator: &str) -> BoothResult<PreparedImage> {
        if locator == self.trigger && !self.fired {
            self.fired = true;
            self.tokens.advance();
        }
        self.inner.load_image(locator)
    }
}

#[test]
fn superseded_render_draws_nothing_after_the_newer_one_starts() {
    let holes = [(20, 20, 150, 150), (220, 20, 150, 150)];
    let mut ctx = RenderContext::default();
    let mut loader = InterruptingLoader {
        inner: loader_with("two.png", template_img(400, 200, &holes)),
        tokens: ctx.token_source(),
        trigger: "green.png",
        fired: false,
    };
    let spec = TemplateSpec::new("two.png", "Frame", 2);

    let render_a =
        CompositeRequest::preview(spec.clone(), vec!["red.png".into(), "green.png".into()]);
    let outcome = composite(&mut ctx, &mut loader, &render_a).unwrap();
    assert_eq!(outcome, CompositeOutcome::Superseded);
    assert!(ctx.committed().is_none());
    let draws_before_b = ctx.stats().photo_draws;
    assert_eq!(draws_before_b, 1);

    let render_b = CompositeRequest::preview(spec, vec!["blue.png".into(), "blue.png".into()]);
    let outcome = composite(&mut ctx, &mut loader, &render_b).unwrap();
    assert_eq!(outcome.report().map(|r| r.draws.len()), Some(2));
    assert_eq!(ctx.stats().photo_draws, draws_before_b + 2);
    assert_eq!(committed_pixel(&ctx, 95, 95), BLUE);
    assert_eq!(committed_pixel(&ctx, 295, 95), BLUE);
    assert_eq!(ctx.stats().renders_superseded, 1);
    assert_eq!(ctx.stats().renders_committed, 1);
}

#[test]
fn load_failure_keeps_the_previous_commit() {
    let mut loader = loader_with("one.png", template_img(300, 300, &[(50, 50, 200, 200)]));
    let mut ctx = RenderContext::default();
    let spec = TemplateSpec::new("one.png", "Frame", 1);

    let first = CompositeRequest::preview(spec.clone(), vec!["red.png".into()]);
    composite(&mut ctx, &mut loader, &first).unwrap();
    let before = ctx.committed_frame().cloned().unwrap();

    let err = composite(
        &mut ctx,
        &mut loader,
        &CompositeRequest::preview(spec, vec!["missing.png".into()]),
    )
    .unwrap_err();
    assert!(matches!(err, BoothError::AssetLoad(_)));
    assert_eq!(ctx.committed_frame(), Some(&before));
}

#[test]
fn templates_without_slots_render_alone() {
    let mut loader = loader_with("solid.png", template_img(120, 80, &[]));
    let mut ctx = RenderContext::default();
    let req = CompositeRequest::preview(
        TemplateSpec::new("solid.png", "Frame", 1),
        vec!["red.png".into()],
    );

    let report = composite(&mut ctx, &mut loader, &req)
        .unwrap()
        .report()
        .cloned()
        .unwrap();
    assert_eq!(report.slots, 0);
    assert!(report.draws.is_empty());
    assert_eq!(loader.load_count("red.png"), 0);
    assert!(
        ctx.committed_frame()
            .unwrap()
            .data
            .chunks_exact(4)
            .all(|px| px == WHITE)
    );
}

#[test]
fn preview_without_photos_shows_the_template() {
    let mut loader = loader_with("one.png", template_img(300, 300, &[(50, 50, 200, 200)]));
    let mut ctx = RenderContext::default();
    let req = CompositeRequest::preview(TemplateSpec::new("one.png", "Frame", 1), Vec::new());

    let report = composite(&mut ctx, &mut loader, &req)
        .unwrap()
        .report()
        .cloned()
        .unwrap();
    assert_eq!(report.slots, 1);
    assert!(report.draws.is_empty());
    assert_eq!(committed_pixel(&ctx, 150, 150), [0, 0, 0, 0]);
    assert_eq!(committed_pixel(&ctx, 10, 10), WHITE);
}

#[test]
fn tint_alpha_maps_percent_linearly() {
    let tint = |opacity_percent| Tint {
        color: HexColor::BLACK,
        opacity_percent,
    };
    assert_eq!(tint(0.0).alpha(), 0.0);
    assert_eq!(tint(50.0).alpha(), 0.5);
    assert_eq!(tint(100.0).alpha(), 1.0);
    assert_eq!(tint(140.0).alpha(), 1.0);
}
