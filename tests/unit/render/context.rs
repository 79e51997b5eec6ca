use std::io::Cursor;

use super::*;
use crate::assets::store::MemoryAssetLoader;
use crate::foundation::error::BoothError;

fn png_bytes(w: u32, h: u32) -> Vec<u8> {
    let img = image::RgbaImage::from_pixel(w, h, image::Rgba([1, 2, 3, 255]));
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    buf
}

/// Starts a newer render in the middle of every load.
struct SupersedingLoader {
    inner: MemoryAssetLoader,
    tokens: RenderTokenSource,
}

impl AssetLoader for SupersedingLoader {
    fn load_image(&mut self, locator: &str) -> BoothResult<PreparedImage> {
        self.tokens.advance();
        self.inner.load_image(locator)
    }
}

#[test]
fn newer_tokens_make_older_ones_stale() {
    let ctx = RenderContext::default();
    let a = ctx.begin_render();
    assert!(a.is_current());
    let b = ctx.begin_render();
    assert!(!a.is_current());
    assert!(b.is_current());
    assert!(b.value() > a.value());
}

#[test]
fn contexts_do_not_share_tokens() {
    let one = RenderContext::default();
    let two = RenderContext::default();
    let a = one.begin_render();
    two.begin_render();
    two.begin_render();
    assert!(a.is_current());
}

#[test]
fn load_passes_images_through_while_current() {
    let ctx = RenderContext::default();
    let mut loader = MemoryAssetLoader::new();
    loader.insert("p.png", png_bytes(3, 2));
    let token = ctx.begin_render();
    let img = token.load(&mut loader, "p.png").unwrap().unwrap();
    assert_eq!((img.width, img.height), (3, 2));
}

#[test]
fn load_reports_errors_while_current() {
    let ctx = RenderContext::default();
    let token = ctx.begin_render();
    let err = token.load(&mut MemoryAssetLoader::new(), "missing.png").unwrap_err();
    assert!(matches!(err, BoothError::AssetLoad(_)));
}

#[test]
fn load_abandons_when_superseded_mid_load() {
    let ctx = RenderContext::default();
    let mut inner = MemoryAssetLoader::new();
    inner.insert("p.png", png_bytes(2, 2));
    let mut loader = SupersedingLoader {
        inner,
        tokens: ctx.token_source(),
    };
    let token = ctx.begin_render();
    assert!(token.load(&mut loader, "p.png").unwrap().is_none());
    // Stale renders swallow their load errors too.
    assert!(token.load(&mut loader, "missing.png").unwrap().is_none());
}

#[test]
fn stale_tokens_cannot_commit() {
    let mut ctx = RenderContext::default();
    let frame = FrameRGBA::new(crate::foundation::core::Canvas::new(1, 1).unwrap(), None).unwrap();
    let report = RenderReport {
        canvas: frame.canvas(),
        class: crate::template::class::TemplateClass::Ordinal,
        slots: 0,
        draws: Vec::new(),
        template_cache_hit: false,
    };

    let a = ctx.begin_render();
    let b = ctx.begin_render();
    assert!(!ctx.commit(&a, frame.clone(), report.clone()));
    assert!(ctx.committed().is_none());
    assert!(ctx.commit(&b, frame, report));
    assert_eq!(ctx.committed().map(|c| c.token), Some(b.value()));
    assert_eq!(ctx.stats().renders_superseded, 1);
    assert_eq!(ctx.stats().renders_committed, 1);
}
