//! Booth flow state, capture normalization and the edit session.

/// Photo normalization onto a target canvas.
pub mod capture;
/// Text annotations, style configuration and final export.
pub mod edit;
/// Persisted flow-state record.
pub mod flow;
