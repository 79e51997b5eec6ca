use crate::{
    assets::store::PreparedImage,
    foundation::core::{Canvas, PixelRect},
    foundation::math::round_px,
};

/// Transparent cut-out of a template, in the template's native pixel space.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Slot {
    /// Left edge.
    pub x: u32,
    /// Top edge.
    pub y: u32,
    /// Bounding-box width.
    pub w: u32,
    /// Bounding-box height.
    pub h: u32,
    /// Hole pixel count, rescaled to native resolution.
    pub area: u64,
}

impl Slot {
    /// Horizontal center of the bounding box.
    pub fn center_x(&self) -> f64 {
        f64::from(self.x) + f64::from(self.w) / 2.0
    }

    /// Vertical center of the bounding box.
    pub fn center_y(&self) -> f64 {
        f64::from(self.y) + f64::from(self.h) / 2.0
    }

    /// Project the slot from `template` space onto an `output` canvas.
    ///
    /// x/width and y/height are scaled independently and rounded.
    pub fn project(&self, template: Canvas, output: Canvas) -> PixelRect {
        let sx = f64::from(output.width) / f64::from(template.width.max(1));
        let sy = f64::from(output.height) / f64::from(template.height.max(1));
        PixelRect::new(
            round_px(f64::from(self.x) * sx),
            round_px(f64::from(self.y) * sy),
            round_px(f64::from(self.w) * sx),
            round_px(f64::from(self.h) * sy),
        )
    }
}

/// Tuning knobs for transparent-slot detection.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SlotDetectOpts {
    /// Maximum number of slots returned (largest first before reading-order sort).
    pub max_slots: usize,
    /// Longest side of the detection raster; larger templates are downscaled.
    pub max_dim: u32,
    /// A pixel is a hole when its alpha is strictly below this value.
    pub hole_alpha_below: u8,
    /// Minimum component area as a fraction of the detection raster area.
    pub min_area_ratio: f64,
    /// Components whose box width or height is at most this (detection px) are noise.
    pub min_side_px: u32,
}

impl Default for SlotDetectOpts {
    fn default() -> Self {
        Self {
            max_slots: 12,
            max_dim: 700,
            hole_alpha_below: 8,
            min_area_ratio: 0.008,
            min_side_px: 30,
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct Component {
    min_x: u32,
    max_x: u32,
    min_y: u32,
    max_y: u32,
    area: u64,
}

/// Find the transparent holes of a template.
///
/// Returns slots in reading order (top-to-bottom, then left-to-right), in the template's native
/// coordinates. An empty result means the template has nothing to fill.
#[tracing::instrument(skip(template), fields(w = template.width, h = template.height))]
pub fn detect_slots(template: &PreparedImage, opts: &SlotDetectOpts) -> Vec<Slot> {
    let (iw, ih) = (template.width, template.height);
    if iw == 0 || ih == 0 || opts.max_slots == 0 {
        return Vec::new();
    }

    let scale = (f64::from(opts.max_dim.max(1)) / f64::from(iw.max(ih))).min(1.0);
    let w = (round_px(f64::from(iw) * scale) as u32).max(1);
    let h = (round_px(f64::from(ih) * scale) as u32).max(1);

    let alpha = template.alpha_plane();
    let alpha = if (w, h) == (iw, ih) {
        alpha
    } else {
        image::imageops::resize(&alpha, w, h, image::imageops::FilterType::Triangle)
    };
    let holes: Vec<bool> = alpha
        .as_raw()
        .iter()
        .map(|&a| a < opts.hole_alpha_below)
        .collect();

    let min_area = round_px(f64::from(w) * f64::from(h) * opts.min_area_ratio).max(0) as u64;
    let mut components: Vec<Component> = label_components(&holes, w, h)
        .into_iter()
        .filter(|c| {
            let bw = c.max_x - c.min_x + 1;
            let bh = c.max_y - c.min_y + 1;
            c.area >= min_area && bw > opts.min_side_px && bh > opts.min_side_px
        })
        .collect();
    tracing::debug!(kept = components.len(), "slot components after noise filter");

    components.sort_by(|a, b| b.area.cmp(&a.area));
    components.truncate(opts.max_slots);

    let back = |v: u32| (round_px(f64::from(v) / scale).max(0)) as u32;
    let mut slots: Vec<Slot> = components
        .iter()
        .map(|c| Slot {
            x: back(c.min_x),
            y: back(c.min_y),
            w: back(c.max_x - c.min_x + 1),
            h: back(c.max_y - c.min_y + 1),
            area: round_px(c.area as f64 / (scale * scale)).max(0) as u64,
        })
        .collect();

    slots.sort_by(|a, b| a.y.cmp(&b.y).then(a.x.cmp(&b.x)));
    slots
}

/// 4-connected labeling over a hole mask, iterative so large holes cannot blow the stack.
fn label_components(holes: &[bool], w: u32, h: u32) -> Vec<Component> {
    let (wu, hu) = (w as usize, h as usize);
    let mut visited = vec![false; wu * hu];
    let mut stack: Vec<(u32, u32)> = Vec::new();
    let mut out = Vec::new();

    for y in 0..h {
        for x in 0..w {
            let p = y as usize * wu + x as usize;
            if visited[p] {
                continue;
            }
            visited[p] = true;
            if !holes[p] {
                continue;
            }

            let mut c = Component {
                min_x: x,
                max_x: x,
                min_y: y,
                max_y: y,
                area: 0,
            };
            stack.push((x, y));
            while let Some((cx, cy)) = stack.pop() {
                c.area += 1;
                c.min_x = c.min_x.min(cx);
                c.max_x = c.max_x.max(cx);
                c.min_y = c.min_y.min(cy);
                c.max_y = c.max_y.max(cy);

                let neighbors = [
                    (cx.checked_sub(1), Some(cy)),
                    (cx.checked_add(1).filter(|&nx| nx < w), Some(cy)),
                    (Some(cx), cy.checked_sub(1)),
                    (Some(cx), cy.checked_add(1).filter(|&ny| ny < h)),
                ];
                for (nx, ny) in neighbors {
                    let (Some(nx), Some(ny)) = (nx, ny) else {
                        continue;
                    };
                    let np = ny as usize * wu + nx as usize;
                    if visited[np] {
                        continue;
                    }
                    visited[np] = true;
                    if holes[np] {
                        stack.push((nx, ny));
                    }
                }
            }
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
#[path = "../../tests/unit/template/slots.rs"]
mod tests;
