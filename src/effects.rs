/// Premultiplied pixel compositing and tint.
pub mod composite;
/// Cover-fit cropping and scaled image drawing.
pub mod cover;
