use std::sync::Arc;

use crate::{
    assets::store::PreparedImage,
    template::axis::{PoseAxis, resolve_pose_axis},
    template::grid::{GridMap, build_grid},
    template::slots::{Slot, SlotDetectOpts, detect_slots},
};

/// Display name of the one single-pose template whose photo is broadcast into every slot.
pub const BROADCAST_TEMPLATE_NAME: &str = "polaroid landscape 1x - 01";

/// Name fragment marking multi-pose strip templates.
pub const PHOTOSTRIP_MARKER: &str = "photostrip";

/// Largest pose count a template may declare.
pub const MAX_POSE_COUNT: u32 = 6;

/// Identity and naming metadata of a selected template.
#[derive(Clone, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct TemplateSpec {
    /// Locator of the template image; the cache identity.
    pub locator: String,
    /// Display name; drives the template class.
    pub name: String,
    /// Declared number of distinct poses (1..=6).
    pub pose_count: u32,
}

impl TemplateSpec {
    /// Build a spec, clamping the pose count into `1..=6`.
    pub fn new(locator: impl Into<String>, name: impl Into<String>, pose_count: u32) -> Self {
        Self {
            locator: locator.into(),
            name: name.into(),
            pose_count: pose_count.clamp(1, MAX_POSE_COUNT),
        }
    }
}

/// How photos are assigned to slots.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TemplateClass {
    /// The first photo fills every slot.
    Broadcast,
    /// Pose `i` fills every copy cell at index `i` along `pose_axis`.
    MultiPoseStrip {
        /// Grid dimension that advances with the pose index.
        pose_axis: PoseAxis,
    },
    /// Photo `i` fills slot `i` in reading order.
    Ordinal,
}

fn norm_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Exact (case-insensitive, trimmed) match against the broadcast template name.
pub fn is_broadcast_template(name: &str) -> bool {
    norm_name(name) == BROADCAST_TEMPLATE_NAME
}

/// Any template whose name mentions "photostrip".
pub fn is_multi_pose_strip_template(name: &str) -> bool {
    norm_name(name).contains(PHOTOSTRIP_MARKER)
}

/// Template image plus everything derived from it once per load.
#[derive(Clone, Debug)]
pub struct LoadedTemplate {
    /// Template identity and naming.
    pub spec: TemplateSpec,
    /// Decoded template pixels.
    pub image: Arc<PreparedImage>,
    /// Detected slots, native coordinates, reading order.
    pub slots: Vec<Slot>,
    /// Grid over `slots`; present for multi-pose strips.
    pub grid: Option<GridMap>,
    /// Resolved slot-filling strategy.
    pub class: TemplateClass,
}

impl LoadedTemplate {
    /// Run slot detection and resolve the template class.
    ///
    /// The grid is built from native-resolution slots, where grouping is most reliable.
    #[tracing::instrument(skip(image, opts), fields(template = %spec.name))]
    pub fn prepare(spec: TemplateSpec, image: PreparedImage, opts: &SlotDetectOpts) -> Self {
        let slots = detect_slots(&image, opts);
        if slots.is_empty() {
            tracing::warn!(locator = %spec.locator, "template has no transparent slots");
        }

        let (class, grid) = if is_broadcast_template(&spec.name) {
            (TemplateClass::Broadcast, None)
        } else if is_multi_pose_strip_template(&spec.name) {
            let grid = build_grid(&slots);
            let pose_axis = resolve_pose_axis(&spec.name, spec.pose_count, &grid);
            (TemplateClass::MultiPoseStrip { pose_axis }, Some(grid))
        } else {
            (TemplateClass::Ordinal, None)
        };

        Self {
            spec,
            image: Arc::new(image),
            slots,
            grid,
            class,
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/template/class.rs"]
mod tests;
