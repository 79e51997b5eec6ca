//! Compositing of photos into templates, and text rasterization on top.

/// Output frame type and render settings.
pub mod backend;
/// Photo-into-template compositor.
pub mod compositor;
/// Render context: template cache, render tokens, committed frame.
pub mod context;
/// Text annotation layout and rasterization.
pub mod text;
