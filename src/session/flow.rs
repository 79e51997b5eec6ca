use serde::{Deserialize, Deserializer, Serialize};

use crate::{
    foundation::core::{Canvas, Orientation},
    foundation::error::{BoothError, BoothResult},
    session::capture::CaptureOpts,
    session::edit::EditConfig,
    template::class::{MAX_POSE_COUNT, TemplateSpec},
};

/// Countdown lengths the capture screen offers.
pub const COUNTDOWN_CHOICES: [u8; 4] = [0, 1, 3, 5];

/// Countdown used when none (or an unsupported one) is stored.
pub const DEFAULT_COUNTDOWN_SECONDS: u8 = 3;

/// Template chosen on the layout screen.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TemplateSelection {
    /// Template image locator.
    pub template: String,
    /// Display name.
    pub name: String,
    /// Template family label.
    pub kind: String,
    /// Orientation label of the template.
    pub orientation: String,
    /// Camera angle label, e.g. "Angle Portrait".
    pub angle: String,
    /// Pose label, e.g. "3x Pose".
    pub pose: String,
}

/// Persisted state of one booth flow: selection, target size, captured photos and preferences.
///
/// Loading never fails on missing or malformed preference fields; they fall back to defaults.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowState {
    /// Template image locator.
    #[serde(default)]
    pub template: String,
    /// Template display name.
    #[serde(default)]
    pub name: String,
    /// Template family label.
    #[serde(default)]
    pub kind: String,
    /// Template orientation label.
    #[serde(default)]
    pub orientation: String,
    /// Camera angle label.
    #[serde(default)]
    pub angle: String,
    /// Pose label.
    #[serde(default)]
    pub pose: String,
    /// Photos needed for the template (1..=6).
    #[serde(default)]
    pub pose_count: u32,
    /// Print width.
    #[serde(default)]
    pub target_w: u32,
    /// Print height.
    #[serde(default)]
    pub target_h: u32,
    /// Print orientation.
    #[serde(default)]
    pub target_orientation: Option<Orientation>,
    /// Captured photo locators in capture (pose) order.
    #[serde(default, deserialize_with = "lenient_photos")]
    pub photos: Vec<String>,
    /// Creation time, unix milliseconds.
    #[serde(default)]
    pub created_at_ms: u64,
    /// Countdown before each capture.
    #[serde(
        default = "default_countdown",
        deserialize_with = "lenient_countdown"
    )]
    pub countdown_seconds: u8,
    /// Mirror captures horizontally.
    #[serde(default = "default_true", deserialize_with = "lenient_mirror")]
    pub mirror: bool,
    /// Capture in black and white.
    #[serde(default, deserialize_with = "lenient_bw")]
    pub bw: bool,
    /// Edit configuration snapshot taken on export.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edit: Option<EditConfig>,
}

fn default_countdown() -> u8 {
    DEFAULT_COUNTDOWN_SECONDS
}

fn default_true() -> bool {
    true
}

fn lenient_countdown<'de, D: Deserializer<'de>>(d: D) -> Result<u8, D::Error> {
    let v = serde_json::Value::deserialize(d)?;
    Ok(v.as_u64()
        .and_then(|n| u8::try_from(n).ok())
        .map_or(DEFAULT_COUNTDOWN_SECONDS, normalize_countdown))
}

fn lenient_mirror<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
    Ok(serde_json::Value::deserialize(d)?.as_bool().unwrap_or(true))
}

fn lenient_bw<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
    Ok(serde_json::Value::deserialize(d)?.as_bool().unwrap_or(false))
}

fn lenient_photos<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<String>, D::Error> {
    let v = serde_json::Value::deserialize(d)?;
    Ok(v.as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|p| p.as_str().map(str::to_owned))
                .collect()
        })
        .unwrap_or_default())
}

/// Supported countdowns pass through; anything else becomes the default.
pub fn normalize_countdown(seconds: u8) -> u8 {
    if COUNTDOWN_CHOICES.contains(&seconds) {
        seconds
    } else {
        DEFAULT_COUNTDOWN_SECONDS
    }
}

/// Pose count from a label like "3x Pose": the first `<digits>x`, default 1, clamped to 1..=6.
pub fn pose_count_from_label(label: &str) -> u32 {
    let lower = label.to_ascii_lowercase();
    let bytes = lower.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if !bytes[i].is_ascii_digit() {
            i += 1;
            continue;
        }
        let start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        let digits = &lower[start..i];
        let rest = lower[i..].trim_start();
        if rest.starts_with('x') {
            let n = digits.parse::<u32>().unwrap_or(u32::MAX);
            return n.clamp(1, MAX_POSE_COUNT);
        }
    }
    1
}

/// Print size for an angle/orientation selection.
///
/// An explicit "angle portrait"/"angle landscape" wins; otherwise an orientation mentioning
/// "portrait" is portrait and everything else landscape.
pub fn target_size(angle: &str, orientation: &str) -> (Canvas, Orientation) {
    let a = angle.to_lowercase();
    let o = orientation.to_lowercase();
    let orientation = if a.contains("angle portrait") {
        Orientation::Portrait
    } else if a.contains("angle landscape") {
        Orientation::Landscape
    } else if o.contains("portrait") {
        Orientation::Portrait
    } else {
        Orientation::Landscape
    };
    (Canvas::for_orientation(orientation), orientation)
}

impl FlowState {
    /// Fresh flow for a template selection.
    pub fn start(selection: TemplateSelection, created_at_ms: u64) -> Self {
        let (canvas, orientation) = target_size(&selection.angle, &selection.orientation);
        Self {
            pose_count: pose_count_from_label(&selection.pose),
            template: selection.template,
            name: selection.name,
            kind: selection.kind,
            orientation: selection.orientation,
            angle: selection.angle,
            pose: selection.pose,
            target_w: canvas.width,
            target_h: canvas.height,
            target_orientation: Some(orientation),
            photos: Vec::new(),
            created_at_ms,
            countdown_seconds: DEFAULT_COUNTDOWN_SECONDS,
            mirror: true,
            bw: false,
            edit: None,
        }
    }

    /// Parse a stored record and fill in derived fields.
    pub fn from_json(raw: &str) -> BoothResult<Self> {
        let mut state: Self = serde_json::from_str(raw)?;
        state.normalize();
        Ok(state)
    }

    /// Serialize for storage.
    pub fn to_json(&self) -> BoothResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Repair fields a stored record may lack or carry out of range.
    pub fn normalize(&mut self) {
        self.countdown_seconds = normalize_countdown(self.countdown_seconds);
        self.pose_count = if self.pose_count == 0 {
            pose_count_from_label(&self.pose)
        } else {
            self.pose_count.clamp(1, MAX_POSE_COUNT)
        };
        if self.target_w == 0 || self.target_h == 0 || self.target_orientation.is_none() {
            let (canvas, orientation) = target_size(&self.angle, &self.orientation);
            self.target_w = canvas.width;
            self.target_h = canvas.height;
            self.target_orientation = Some(orientation);
        }
    }

    /// Set the countdown, falling back to the default for unsupported values.
    pub fn set_countdown(&mut self, seconds: u8) {
        self.countdown_seconds = normalize_countdown(seconds);
    }

    /// Print canvas of this flow.
    pub fn target_canvas(&self) -> Canvas {
        Canvas::new(self.target_w, self.target_h)
            .unwrap_or_else(|_| target_size(&self.angle, &self.orientation).0)
    }

    /// Mirroring and color preferences for new captures.
    pub fn capture_opts(&self) -> CaptureOpts {
        CaptureOpts {
            mirror: self.mirror,
            monochrome: self.bw,
        }
    }

    /// Compositor identity of the selected template.
    pub fn template_spec(&self) -> BoothResult<TemplateSpec> {
        if self.template.trim().is_empty() {
            return Err(BoothError::validation("No template selected."));
        }
        Ok(TemplateSpec::new(
            self.template.clone(),
            self.name.clone(),
            self.pose_count,
        ))
    }

    /// Photos still needed before editing.
    pub fn missing_photos(&self) -> u32 {
        let have = u32::try_from(self.photos.len()).unwrap_or(u32::MAX);
        self.pose_count.saturating_sub(have)
    }

    /// `true` once every pose has a photo.
    pub fn is_complete(&self) -> bool {
        self.missing_photos() == 0
    }

    /// Append a captured photo; rejected once the set is complete.
    ///
    /// Returns the new photo count.
    pub fn push_photo(&mut self, locator: impl Into<String>) -> BoothResult<usize> {
        if self.is_complete() {
            return Err(BoothError::validation(
                "All photos are captured. Continue to edit.",
            ));
        }
        self.photos.push(locator.into());
        Ok(self.photos.len())
    }

    /// Drop the most recent photo.
    pub fn retake_last(&mut self) -> Option<String> {
        self.photos.pop()
    }

    /// Drop every photo.
    pub fn retake_all(&mut self) {
        self.photos.clear();
    }

    /// Gate for moving on to the edit step.
    pub fn ensure_ready_for_edit(&self) -> BoothResult<()> {
        match self.missing_photos() {
            0 => Ok(()),
            1 => Err(BoothError::validation("Still missing 1 photo.")),
            n => Err(BoothError::validation(format!("Still missing {n} photos."))),
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/session/flow.rs"]
mod tests;
