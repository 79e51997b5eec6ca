//! Snapbooth is a photobooth template compositing engine.
//!
//! A template is a PNG with transparent cut-outs. The engine finds those cut-outs, decides how
//! the captured photos map onto them, and composites the photos underneath the (optionally
//! tinted) template artwork:
//!
//! - Detect slots and prepare a [`LoadedTemplate`]
//! - Composite photos into it through a [`RenderContext`] with [`composite`]
//! - Annotate, tint and export the final strip with an [`EditSession`]
#![forbid(unsafe_code)]
#![deny(missing_docs)]

/// Image assets: decoding, loaders and colors.
pub mod assets;
/// Core types and the crate error.
pub mod foundation;

/// Access-code gate.
pub mod access;
pub(crate) mod effects;
/// Compositor, render context and text rasterization.
pub mod render;
/// Booth flow state and the edit session.
pub mod session;
/// Slot detection, grid clustering and template classes.
pub mod template;

pub use crate::access::code_store::{
    AccessCodeRecord, AccessError, AccessGrant, AccessPass, CodeStore, InMemoryCodeStore,
};
pub use crate::assets::color::HexColor;
pub use crate::assets::store::{AssetLoader, FsAssetLoader, MemoryAssetLoader, PreparedImage};
pub use crate::foundation::core::{Canvas, Orientation, PixelRect};
pub use crate::foundation::error::{BoothError, BoothResult};
pub use crate::render::backend::{FrameRGBA, RenderSettings};
pub use crate::render::compositor::{
    CompositeOutcome, CompositeRequest, PhotoDraw, RenderReport, Tint, composite,
};
pub use crate::render::context::{RenderContext, RenderStats, RenderToken, RenderTokenSource};
pub use crate::render::text::{FontBook, ResolvedFace};
pub use crate::session::capture::{CaptureOpts, normalize_photo};
pub use crate::session::edit::{EditConfig, EditSession, StyleConfig, TextAnnotation};
pub use crate::session::flow::{FlowState, TemplateSelection};
pub use crate::template::axis::PoseAxis;
pub use crate::template::class::{LoadedTemplate, TemplateClass, TemplateSpec};
pub use crate::template::grid::GridMap;
pub use crate::template::slots::{Slot, SlotDetectOpts};
