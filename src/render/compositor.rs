use std::sync::Arc;

use crate::{
    assets::color::HexColor,
    assets::store::{AssetLoader, PreparedImage},
    effects::composite::{over_in_place, tint_atop_in_place},
    effects::cover::{CropRect, Surface, draw_image_cover, draw_image_rect},
    foundation::core::{Canvas, PixelRect},
    foundation::error::BoothResult,
    render::backend::{FrameRGBA, RenderSettings},
    render::context::RenderContext,
    template::axis::PoseAxis,
    template::class::{LoadedTemplate, TemplateClass, TemplateSpec},
    template::slots::Slot,
};

/// Flat color composited onto the template's opaque artwork.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Tint {
    /// Fill color.
    pub color: HexColor,
    /// Opacity in percent, `0..=100`.
    pub opacity_percent: f32,
}

impl Tint {
    /// Opacity as a `0.0..=1.0` alpha.
    pub fn alpha(self) -> f32 {
        (self.opacity_percent / 100.0).clamp(0.0, 1.0)
    }
}

/// Everything one composite render needs.
#[derive(Clone, Debug, PartialEq)]
pub struct CompositeRequest {
    /// Template to fill.
    pub template: TemplateSpec,
    /// Photo locators in pose order.
    pub photos: Vec<String>,
    /// Output size; `None` renders at the template's native size.
    pub target: Option<Canvas>,
    /// Optional tint of the template artwork.
    pub tint: Option<Tint>,
    /// Destination clearing.
    pub settings: RenderSettings,
}

impl CompositeRequest {
    /// Live preview: native template size, no tint, transparent background.
    pub fn preview(template: TemplateSpec, photos: Vec<String>) -> Self {
        Self {
            template,
            photos,
            target: None,
            tint: None,
            settings: RenderSettings::default(),
        }
    }

    /// Final edit render: print-size target on an opaque black background.
    pub fn final_render(
        template: TemplateSpec,
        photos: Vec<String>,
        target: Canvas,
        tint: Option<Tint>,
    ) -> Self {
        Self {
            template,
            photos,
            target: Some(target),
            tint,
            settings: RenderSettings::opaque_black(),
        }
    }
}

/// One photo drawn into one slot (native template coordinates).
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
pub struct PhotoDraw {
    /// Index into the request's photo list.
    pub photo: usize,
    /// Destination slot.
    pub slot: Slot,
}

/// What a committed render drew.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct RenderReport {
    /// Output size.
    pub canvas: Canvas,
    /// Slot-filling strategy used.
    pub class: TemplateClass,
    /// Slots detected in the template; zero means the template was drawn alone.
    pub slots: usize,
    /// Photo draws, in draw order.
    pub draws: Vec<PhotoDraw>,
    /// Whether the prepared template came from the context cache.
    pub template_cache_hit: bool,
}

/// Result of a composite render.
#[derive(Clone, Debug, PartialEq)]
pub enum CompositeOutcome {
    /// The frame was committed to the render context.
    Committed(RenderReport),
    /// A newer render started first; nothing was committed.
    Superseded,
}

impl CompositeOutcome {
    /// Report of a committed render.
    pub fn report(&self) -> Option<&RenderReport> {
        match self {
            Self::Committed(r) => Some(r),
            Self::Superseded => None,
        }
    }
}

/// Assign photos to slots for the template's class.
///
/// - Broadcast: photo 0 into every slot.
/// - Multi-pose strip: pose `i` into every cell at index `i` of the pose axis.
/// - Ordinal: photo `i` into slot `i` (reading order).
pub fn plan_photo_draws(template: &LoadedTemplate, photo_count: usize) -> Vec<PhotoDraw> {
    if photo_count == 0 {
        return Vec::new();
    }
    match template.class {
        TemplateClass::Broadcast => template
            .slots
            .iter()
            .map(|&slot| PhotoDraw { photo: 0, slot })
            .collect(),
        TemplateClass::MultiPoseStrip { pose_axis } => {
            let Some(grid) = template.grid.as_ref() else {
                return Vec::new();
            };
            let poses = photo_count.min(template.spec.pose_count as usize);
            let mut out = Vec::new();
            for pose in 0..poses {
                let cells: Vec<&Slot> = match pose_axis {
                    PoseAxis::Rows => (0..grid.num_cols())
                        .filter_map(|col| grid.cell(col, pose))
                        .collect(),
                    PoseAxis::Cols => (0..grid.num_rows())
                        .filter_map(|row| grid.cell(pose, row))
                        .collect(),
                };
                out.extend(cells.into_iter().map(|&slot| PhotoDraw { photo: pose, slot }));
            }
            out
        }
        TemplateClass::Ordinal => template
            .slots
            .iter()
            .take(photo_count)
            .enumerate()
            .map(|(photo, &slot)| PhotoDraw { photo, slot })
            .collect(),
    }
}

/// Composite the request's photos into its template and commit the frame to `ctx`.
///
/// Photos are cover-fit into their slots, then the (optionally tinted) template is drawn on top.
/// A template without slots is drawn alone. Image loads are the only points where a newer render
/// can intervene; a superseded render returns [`CompositeOutcome::Superseded`] without touching
/// the committed frame. Load failures leave the committed frame intact as well.
#[tracing::instrument(
    skip(ctx, loader, request),
    fields(template = %request.template.name, photos = request.photos.len())
)]
pub fn composite(
    ctx: &mut RenderContext,
    loader: &mut dyn AssetLoader,
    request: &CompositeRequest,
) -> BoothResult<CompositeOutcome> {
    let token = ctx.begin_render();

    let (template, template_cache_hit) = match ctx.cached_template(&request.template) {
        Some(t) => {
            tracing::debug!(locator = %request.template.locator, "template cache hit");
            ctx.stats_mut().template_cache_hits += 1;
            (t, true)
        }
        None => {
            let Some(image) = token.load(loader, &request.template.locator)? else {
                return Ok(superseded(ctx));
            };
            let t = Arc::new(LoadedTemplate::prepare(
                request.template.clone(),
                image,
                ctx.detect_opts(),
            ));
            ctx.insert_template(Arc::clone(&t));
            (t, false)
        }
    };

    let template_canvas = template.image.canvas();
    let canvas = request.target.unwrap_or(template_canvas);
    let mut frame = FrameRGBA::new(canvas, request.settings.clear_rgba)?;

    if template.slots.is_empty() {
        tracing::warn!("no fillable slots, drawing the template alone");
    }
    let draws = plan_photo_draws(&template, request.photos.len());

    let mut photos: Vec<Option<PreparedImage>> = vec![None; request.photos.len()];
    for draw in &draws {
        if photos[draw.photo].is_none() {
            let Some(img) = token.load(loader, &request.photos[draw.photo])? else {
                return Ok(superseded(ctx));
            };
            photos[draw.photo] = Some(img);
        }
        let Some(photo) = photos[draw.photo].as_ref() else {
            continue;
        };
        let dest = draw.slot.project(template_canvas, canvas);
        let mut surface = Surface {
            canvas,
            data: &mut frame.data,
        };
        draw_image_cover(&mut surface, photo, dest);
        ctx.stats_mut().photo_draws += 1;
    }

    let mut layer = vec![0u8; canvas.rgba_len()];
    let full = CropRect {
        x: 0,
        y: 0,
        w: template_canvas.width,
        h: template_canvas.height,
    };
    draw_image_rect(
        &mut Surface {
            canvas,
            data: &mut layer,
        },
        &template.image,
        full,
        PixelRect::new(0, 0, i64::from(canvas.width), i64::from(canvas.height)),
        false,
    );
    if let Some(tint) = request.tint {
        tint_atop_in_place(&mut layer, tint.color, tint.alpha())?;
    }
    over_in_place(&mut frame.data, &layer, 1.0)?;

    let report = RenderReport {
        canvas,
        class: template.class,
        slots: template.slots.len(),
        draws,
        template_cache_hit,
    };
    if ctx.commit(&token, frame, report.clone()) {
        Ok(CompositeOutcome::Committed(report))
    } else {
        Ok(CompositeOutcome::Superseded)
    }
}

fn superseded(ctx: &mut RenderContext) -> CompositeOutcome {
    ctx.stats_mut().renders_superseded += 1;
    CompositeOutcome::Superseded
}

#[cfg(test)]
#[path = "../../tests/unit/render/compositor.rs"]
mod tests;
