//! Access-code gate in front of the booth.

/// Code normalization, the store boundary and unlock passes.
pub mod code_store;
