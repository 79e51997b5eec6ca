//! Template analysis: transparent slots, their grid, and the slot-filling class.

/// Pose-axis resolution for multi-pose templates.
pub mod axis;
/// Template classes and cached per-template preparation.
pub mod class;
/// Clustering of slot centers into rows and columns.
pub mod grid;
/// Connected-component detection of transparent slots.
pub mod slots;
