use serde::{Deserialize, Serialize};

use crate::{
    assets::color::HexColor,
    assets::store::AssetLoader,
    foundation::core::Canvas,
    foundation::error::{BoothError, BoothResult},
    foundation::math::round_px,
    render::backend::FrameRGBA,
    render::compositor::{CompositeOutcome, CompositeRequest, Tint, composite},
    render::context::RenderContext,
    render::text::{FontBook, TextLayoutEngine, draw_annotations},
    session::flow::FlowState,
    template::slots::SlotDetectOpts,
};

/// Font family used when none is configured.
pub const DEFAULT_FONT: &str = "Open Sans";

/// Text size used when none is configured.
pub const DEFAULT_TEXT_SIZE_PX: f32 = 56.0;

/// Smallest size text is drawn at.
pub const MIN_TEXT_SIZE_PX: f32 = 10.0;

/// Dragged text keeps its origin at least this far from the right and bottom edges.
pub const DRAG_EDGE_MARGIN_PX: f64 = 10.0;

fn default_font() -> String {
    DEFAULT_FONT.to_owned()
}

fn default_text_size() -> f32 {
    DEFAULT_TEXT_SIZE_PX
}

fn default_text_color() -> HexColor {
    HexColor::WHITE
}

fn default_true() -> bool {
    true
}

/// Tint and text style of the edit screen.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StyleConfig {
    /// Tint the template artwork.
    #[serde(rename = "tintEnable")]
    pub tint_enabled: bool,
    /// Tint color.
    #[serde(rename = "tintHex")]
    pub tint_color: HexColor,
    /// Tint opacity, 0..=100.
    #[serde(rename = "tintOpacity")]
    pub tint_opacity_percent: f32,
    /// Font family for new text.
    #[serde(rename = "txtFont")]
    pub text_font: String,
    /// Size for new text.
    #[serde(rename = "txtSize")]
    pub text_size_px: f32,
    /// Color for new text.
    #[serde(rename = "txtHex")]
    pub text_color: HexColor,
    /// Bold weight for new text.
    #[serde(rename = "txtBold")]
    pub text_bold: bool,
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            tint_enabled: true,
            tint_color: HexColor::BLACK,
            tint_opacity_percent: 100.0,
            text_font: default_font(),
            text_size_px: DEFAULT_TEXT_SIZE_PX,
            text_color: HexColor::WHITE,
            text_bold: true,
        }
    }
}

impl StyleConfig {
    /// Clamp and fill fields a stored config may carry out of range.
    pub fn normalized(mut self) -> Self {
        self.tint_opacity_percent = if self.tint_opacity_percent.is_finite() {
            self.tint_opacity_percent.clamp(0.0, 100.0)
        } else {
            100.0
        };
        if !(self.text_size_px.is_finite() && self.text_size_px > 0.0) {
            self.text_size_px = DEFAULT_TEXT_SIZE_PX;
        }
        if self.text_font.trim().is_empty() {
            self.text_font = default_font();
        }
        self
    }

    /// Tint to hand to the compositor, if enabled.
    pub fn tint(&self) -> Option<Tint> {
        self.tint_enabled.then_some(Tint {
            color: self.tint_color,
            opacity_percent: self.tint_opacity_percent,
        })
    }

    /// Restore the tint controls to their defaults, keeping the text style.
    pub fn reset_tint(&mut self) {
        let d = Self::default();
        self.tint_enabled = d.tint_enabled;
        self.tint_color = d.tint_color;
        self.tint_opacity_percent = d.tint_opacity_percent;
    }
}

/// Draggable text placed on the output canvas.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TextAnnotation {
    /// Stable id (`t_<n>`).
    pub id: String,
    /// Text content.
    #[serde(default)]
    pub text: String,
    /// Font family.
    #[serde(default = "default_font")]
    pub font: String,
    /// Requested size in output pixels.
    #[serde(default = "default_text_size", rename = "size")]
    pub size_px: f32,
    /// Fill color.
    #[serde(default = "default_text_color")]
    pub color: HexColor,
    /// Bold weight.
    #[serde(default = "default_true")]
    pub bold: bool,
    /// Left edge, output pixels.
    #[serde(default)]
    pub x: f64,
    /// Top edge, output pixels.
    #[serde(default)]
    pub y: f64,
}

impl TextAnnotation {
    /// Size the annotation is drawn at: whole pixels, at least 10.
    pub fn draw_size_px(&self) -> f32 {
        let size = if self.size_px.is_finite() && self.size_px > 0.0 {
            self.size_px
        } else {
            DEFAULT_TEXT_SIZE_PX
        };
        size.round().max(MIN_TEXT_SIZE_PX)
    }

    /// CSS-style font weight: 800 bold, 600 otherwise.
    pub fn weight(&self) -> f32 {
        if self.bold { 800.0 } else { 600.0 }
    }
}

/// Persisted edit record: style plus text annotations.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EditConfig {
    /// Tint and text style.
    #[serde(flatten)]
    pub style: StyleConfig,
    /// Text annotations in draw order.
    #[serde(rename = "textItems", default)]
    pub text_items: Vec<TextAnnotation>,
}

impl EditConfig {
    /// Parse a stored record, normalizing its style.
    pub fn from_json(raw: &str) -> BoothResult<Self> {
        let mut cfg: Self = serde_json::from_str(raw)?;
        cfg.style = cfg.style.normalized();
        Ok(cfg)
    }

    /// Serialize for storage.
    pub fn to_json(&self) -> BoothResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Editing state over one flow: renders the composite, holds text, and exports the result.
///
/// Style changes that affect the tint re-render the composite; text edits only touch the
/// annotation list and are layered on at [`EditSession::finalize`].
pub struct EditSession {
    flow: FlowState,
    config: EditConfig,
    selected: Option<String>,
    next_id: u64,
    render: RenderContext,
    fonts: FontBook,
    text_engine: TextLayoutEngine,
}

impl EditSession {
    /// Resume editing `flow`, restoring `saved` when present.
    pub fn restore(flow: FlowState, saved: Option<EditConfig>, fonts: FontBook) -> Self {
        let mut config = saved.unwrap_or_default();
        config.style = config.style.normalized();
        let next_id = config
            .text_items
            .iter()
            .filter_map(|t| t.id.strip_prefix("t_")?.parse::<u64>().ok())
            .max()
            .map_or(1, |n| n.saturating_add(1));
        Self {
            flow,
            config,
            selected: None,
            next_id,
            render: RenderContext::new(SlotDetectOpts::default()),
            fonts,
            text_engine: TextLayoutEngine::new(),
        }
    }

    /// Flow being edited.
    pub fn flow(&self) -> &FlowState {
        &self.flow
    }

    /// Give the flow back, e.g. after export.
    pub fn into_flow(self) -> FlowState {
        self.flow
    }

    /// Current edit record (what gets persisted).
    pub fn config(&self) -> &EditConfig {
        &self.config
    }

    /// Current style.
    pub fn style(&self) -> &StyleConfig {
        &self.config.style
    }

    /// Text annotations in draw order.
    pub fn annotations(&self) -> &[TextAnnotation] {
        &self.config.text_items
    }

    /// Id of the selected annotation.
    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    /// Output canvas (print size).
    pub fn canvas(&self) -> Canvas {
        self.flow.target_canvas()
    }

    /// Render state, including the committed base frame.
    pub fn render_context(&self) -> &RenderContext {
        &self.render
    }

    /// Composite photos, template and tint at print size.
    pub fn render(&mut self, loader: &mut dyn AssetLoader) -> BoothResult<CompositeOutcome> {
        if self.flow.photos.is_empty() {
            return Err(BoothError::validation(
                "No photos yet. Capture photos first.",
            ));
        }
        let request = CompositeRequest::final_render(
            self.flow.template_spec()?,
            self.flow.photos.clone(),
            self.canvas(),
            self.config.style.tint(),
        );
        composite(&mut self.render, loader, &request)
    }

    /// Replace the style; re-renders only when the tint changed.
    pub fn update_style(
        &mut self,
        style: StyleConfig,
        loader: &mut dyn AssetLoader,
    ) -> BoothResult<Option<CompositeOutcome>> {
        let style = style.normalized();
        let tint_changed = style.tint() != self.config.style.tint();
        self.config.style = style;
        if tint_changed {
            self.render(loader).map(Some)
        } else {
            Ok(None)
        }
    }

    /// Reset tint controls to their defaults and re-render.
    pub fn reset_tint(&mut self, loader: &mut dyn AssetLoader) -> BoothResult<CompositeOutcome> {
        self.config.style.reset_tint();
        self.render(loader)
    }

    /// Add text, or update the selected annotation in place.
    ///
    /// New annotations start near the bottom-left corner; updated ones keep their position and
    /// take the current text style. The annotation becomes the selection.
    pub fn apply_text(&mut self, text: &str) -> BoothResult<&TextAnnotation> {
        let text = text.trim();
        if text.is_empty() {
            return Err(BoothError::validation("Enter some text first."));
        }
        let style = self.config.style.clone();
        let existing = self
            .selected
            .as_deref()
            .and_then(|id| self.config.text_items.iter().position(|t| t.id == id));

        let index = match existing {
            Some(i) => {
                let item = &mut self.config.text_items[i];
                item.text = text.to_owned();
                item.font = style.text_font;
                item.size_px = style.text_size_px;
                item.color = style.text_color;
                item.bold = style.text_bold;
                i
            }
            None => {
                let canvas = self.flow.target_canvas();
                let id = self
                    .selected
                    .clone()
                    .unwrap_or_else(|| self.fresh_id());
                self.config.text_items.push(TextAnnotation {
                    id,
                    text: text.to_owned(),
                    font: style.text_font,
                    size_px: style.text_size_px,
                    color: style.text_color,
                    bold: style.text_bold,
                    x: round_px(f64::from(canvas.width) * 0.06) as f64,
                    y: round_px(f64::from(canvas.height) * 0.83) as f64,
                });
                self.config.text_items.len() - 1
            }
        };
        let item = &self.config.text_items[index];
        self.selected = Some(item.id.clone());
        Ok(item)
    }

    fn fresh_id(&mut self) -> String {
        loop {
            let id = format!("t_{}", self.next_id);
            self.next_id += 1;
            if !self.config.text_items.iter().any(|t| t.id == id) {
                return id;
            }
        }
    }

    /// Select an annotation for editing or removal.
    pub fn select(&mut self, id: &str) -> BoothResult<()> {
        if !self.config.text_items.iter().any(|t| t.id == id) {
            return Err(BoothError::validation(format!("unknown text '{id}'")));
        }
        self.selected = Some(id.to_owned());
        Ok(())
    }

    /// Deselect (clicking empty stage).
    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    /// Remove the selected annotation.
    pub fn remove_selected(&mut self) -> BoothResult<TextAnnotation> {
        let id = self
            .selected
            .clone()
            .ok_or_else(|| BoothError::validation("Select a text first."))?;
        self.remove(&id)
            .ok_or_else(|| BoothError::validation("Select a text first."))
    }

    /// Remove an annotation by id.
    pub fn remove(&mut self, id: &str) -> Option<TextAnnotation> {
        let i = self.config.text_items.iter().position(|t| t.id == id)?;
        if self.selected.as_deref() == Some(id) {
            self.selected = None;
        }
        Some(self.config.text_items.remove(i))
    }

    /// Move an annotation, clamped to `[0, W-10] x [0, H-10]`.
    ///
    /// Returns the position actually applied.
    pub fn drag_to(&mut self, id: &str, x: f64, y: f64) -> BoothResult<(f64, f64)> {
        let canvas = self.flow.target_canvas();
        let max_x = (f64::from(canvas.width) - DRAG_EDGE_MARGIN_PX).max(0.0);
        let max_y = (f64::from(canvas.height) - DRAG_EDGE_MARGIN_PX).max(0.0);
        let item = self
            .config
            .text_items
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| BoothError::validation(format!("unknown text '{id}'")))?;
        item.x = x.clamp(0.0, max_x);
        item.y = y.clamp(0.0, max_y);
        Ok((item.x, item.y))
    }

    /// Committed composite with every annotation drawn on top.
    #[tracing::instrument(skip(self), fields(texts = self.config.text_items.len()))]
    pub fn finalize(&mut self) -> BoothResult<FrameRGBA> {
        let mut frame = self
            .render
            .committed_frame()
            .cloned()
            .ok_or_else(|| BoothError::render("nothing has been rendered yet"))?;
        draw_annotations(
            &mut frame,
            &self.config.text_items,
            &self.fonts,
            &mut self.text_engine,
        )?;
        Ok(frame)
    }

    /// Finalize, encode as PNG, and snapshot the edit record into the flow.
    pub fn export_png(&mut self) -> BoothResult<Vec<u8>> {
        let png = self.finalize()?.to_png()?;
        self.flow.edit = Some(self.config.clone());
        Ok(png)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/session/edit.rs"]
mod tests;
