/// Canvas, orientation and rectangle primitives.
pub mod core;
/// Crate-wide error taxonomy.
pub mod error;
pub(crate) mod math;
