use std::{collections::BTreeMap, path::Path, sync::Arc};

use anyhow::Context;

use crate::{
    effects::composite::over_in_place,
    foundation::error::{BoothError, BoothResult},
    render::backend::FrameRGBA,
    session::edit::TextAnnotation,
};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
/// RGBA8 brush color used by Parley text layout.
pub struct TextBrushRgba8 {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
    /// Alpha channel.
    pub a: u8,
}

/// Stroke width, as a fraction of the font size, used to embolden a regular face.
const SYNTHETIC_BOLD_STROKE: f64 = 1.0 / 24.0;

/// Layout weight requested when drawing a regular face.
const REGULAR_FACE_WEIGHT: f32 = 400.0;

/// Font bytes by family name, with an optional bold face per family.
///
/// Lookups are case-insensitive. The first registered family doubles as the fallback for names
/// that were never registered. A bold request for a family without a bold face resolves to the
/// regular face flagged for synthetic emboldening.
#[derive(Clone, Debug, Default)]
pub struct FontBook {
    families: BTreeMap<String, FamilyFaces>,
    fallback: Option<String>,
}

#[derive(Clone, Debug, Default)]
struct FamilyFaces {
    regular: Option<Arc<Vec<u8>>>,
    bold: Option<Arc<Vec<u8>>>,
}

/// Face picked by [`FontBook::resolve_face`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedFace {
    /// TTF/OTF bytes.
    pub bytes: Arc<Vec<u8>>,
    /// The bytes are the family's bold face.
    pub bold_face: bool,
    /// Bold was requested but only a regular face exists.
    pub synthetic_bold: bool,
}

impl FontBook {
    /// Empty book.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `bytes` (TTF/OTF) as the regular face of `family`.
    pub fn insert(&mut self, family: &str, bytes: Vec<u8>) {
        self.insert_weighted(family, false, bytes);
    }

    /// Register `bytes` as the bold (`bold == true`) or regular face of `family`.
    pub fn insert_weighted(&mut self, family: &str, bold: bool, bytes: Vec<u8>) {
        let key = family_key(family);
        if self.fallback.is_none() {
            self.fallback = Some(key.clone());
        }
        let faces = self.families.entry(key).or_default();
        let slot = if bold {
            &mut faces.bold
        } else {
            &mut faces.regular
        };
        *slot = Some(Arc::new(bytes));
    }

    /// Read a font file and register it as the regular face of `family`.
    pub fn load_file(&mut self, family: &str, path: &Path) -> BoothResult<()> {
        self.load_file_weighted(family, false, path)
    }

    /// Read a font file and register it as the bold or regular face of `family`.
    pub fn load_file_weighted(&mut self, family: &str, bold: bool, path: &Path) -> BoothResult<()> {
        let bytes =
            std::fs::read(path).with_context(|| format!("read font file '{}'", path.display()))?;
        self.insert_weighted(family, bold, bytes);
        Ok(())
    }

    /// Regular bytes for `family`, or the fallback family.
    pub fn resolve(&self, family: &str) -> Option<Arc<Vec<u8>>> {
        self.resolve_face(family, false).map(|f| f.bytes)
    }

    /// Face for `family` at the requested weight, or the fallback family.
    ///
    /// A regular request for a family registered only in bold gets the bold face as is.
    pub fn resolve_face(&self, family: &str, bold: bool) -> Option<ResolvedFace> {
        let faces = self
            .families
            .get(&family_key(family))
            .or_else(|| self.fallback.as_ref().and_then(|k| self.families.get(k)))?;
        let (preferred, other) = if bold {
            (&faces.bold, &faces.regular)
        } else {
            (&faces.regular, &faces.bold)
        };
        if let Some(bytes) = preferred {
            return Some(ResolvedFace {
                bytes: bytes.clone(),
                bold_face: bold,
                synthetic_bold: false,
            });
        }
        other.as_ref().map(|bytes| ResolvedFace {
            bytes: bytes.clone(),
            bold_face: !bold,
            synthetic_bold: bold,
        })
    }

    /// `true` when no font is registered.
    pub fn is_empty(&self) -> bool {
        self.families.is_empty()
    }
}

fn family_key(family: &str) -> String {
    family.trim().to_lowercase()
}

/// Parley-backed text shaping and layout.
pub struct TextLayoutEngine {
    font_ctx: parley::FontContext,
    layout_ctx: parley::LayoutContext<TextBrushRgba8>,
}

impl Default for TextLayoutEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl TextLayoutEngine {
    /// Construct a new layout engine with fresh Parley contexts.
    pub fn new() -> Self {
        Self {
            font_ctx: parley::FontContext::default(),
            layout_ctx: parley::LayoutContext::new(),
        }
    }

    /// Shape and lay out a single unwrapped run of text.
    pub fn layout_plain(
        &mut self,
        text: &str,
        font_bytes: &[u8],
        size_px: f32,
        weight: f32,
        brush: TextBrushRgba8,
    ) -> BoothResult<parley::Layout<TextBrushRgba8>> {
        if !size_px.is_finite() || size_px <= 0.0 {
            return Err(BoothError::validation(
                "text size_px must be finite and > 0",
            ));
        }

        let families = self
            .font_ctx
            .collection
            .register_fonts(parley::fontique::Blob::from(font_bytes.to_vec()), None);
        let family_id = families.first().map(|(id, _)| *id).ok_or_else(|| {
            BoothError::validation("no font families registered from font bytes")
        })?;

        let family_name = self
            .font_ctx
            .collection
            .family_name(family_id)
            .ok_or_else(|| BoothError::validation("registered font family has no name"))?
            .to_string();

        let mut builder = self
            .layout_ctx
            .ranged_builder(&mut self.font_ctx, text, 1.0, true);
        builder.push_default(parley::style::StyleProperty::FontStack(
            parley::style::FontStack::Source(std::borrow::Cow::Owned(family_name)),
        ));
        builder.push_default(parley::style::StyleProperty::FontSize(size_px));
        builder.push_default(parley::style::StyleProperty::FontWeight(
            parley::style::FontWeight::new(weight),
        ));
        builder.push_default(parley::style::StyleProperty::Brush(brush));

        let mut layout: parley::Layout<TextBrushRgba8> = builder.build(text);
        layout.break_all_lines(None);
        Ok(layout)
    }
}

/// Rasterize `annotations` with `vello_cpu` and composite them over `frame`.
///
/// Each annotation is top-aligned at its `(x, y)` in frame pixels.
#[tracing::instrument(skip_all, fields(annotations = annotations.len()))]
pub fn draw_annotations(
    frame: &mut FrameRGBA,
    annotations: &[TextAnnotation],
    fonts: &FontBook,
    engine: &mut TextLayoutEngine,
) -> BoothResult<()> {
    if annotations.is_empty() {
        return Ok(());
    }
    let width = u16::try_from(frame.width)
        .map_err(|_| BoothError::render("frame is too wide for text rasterization"))?;
    let height = u16::try_from(frame.height)
        .map_err(|_| BoothError::render("frame is too tall for text rasterization"))?;

    let mut ctx = vello_cpu::RenderContext::new(width, height);
    for a in annotations {
        let face = fonts
            .resolve_face(&a.font, a.bold)
            .ok_or_else(|| BoothError::render(format!("no font available for '{}'", a.font)))?;
        let bytes = face.bytes;
        let color = a.color;
        let brush = TextBrushRgba8 {
            r: color.r,
            g: color.g,
            b: color.b,
            a: 255,
        };
        let size_px = a.draw_size_px();
        // Both faces of a family share one name in the layout collection; the requested weight
        // must select the face being drawn.
        let weight = if face.bold_face {
            a.weight()
        } else {
            REGULAR_FACE_WEIGHT
        };
        let layout = engine.layout_plain(&a.text, bytes.as_slice(), size_px, weight, brush)?;
        let font =
            vello_cpu::peniko::FontData::new(vello_cpu::peniko::Blob::from(bytes.to_vec()), 0);
        if face.synthetic_bold {
            ctx.set_stroke(vello_cpu::kurbo::Stroke::new(
                f64::from(size_px) * SYNTHETIC_BOLD_STROKE,
            ));
        }

        ctx.set_transform(vello_cpu::kurbo::Affine::translate((a.x, a.y)));
        for line in layout.lines() {
            for item in line.items() {
                let parley::layout::PositionedLayoutItem::GlyphRun(run) = item else {
                    continue;
                };
                let brush = run.style().brush;
                ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(
                    brush.r, brush.g, brush.b, brush.a,
                ));
                let glyphs = run.positioned_glyphs().map(|g| vello_cpu::Glyph {
                    id: g.id,
                    x: g.x,
                    y: g.y,
                });
                let font_size = run.run().font_size();
                if face.synthetic_bold {
                    let glyphs: Vec<_> = glyphs.collect();
                    ctx.glyph_run(&font)
                        .font_size(font_size)
                        .fill_glyphs(glyphs.iter().copied());
                    ctx.glyph_run(&font)
                        .font_size(font_size)
                        .stroke_glyphs(glyphs.into_iter());
                } else {
                    ctx.glyph_run(&font).font_size(font_size).fill_glyphs(glyphs);
                }
            }
        }
    }

    ctx.flush();
    let mut pixmap = vello_cpu::Pixmap::new(width, height);
    ctx.render_to_pixmap(&mut pixmap);
    over_in_place(&mut frame.data, pixmap.data_as_u8_slice(), 1.0)
}

#[cfg(test)]
#[path = "../../tests/unit/render/text.rs"]
mod tests;
