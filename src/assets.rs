/// Hex colors as used by tint and text styles.
pub mod color;
/// Image decode/encode helpers.
pub mod decode;
/// Prepared images and asset loaders.
pub mod store;
