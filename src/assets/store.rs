use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::Arc,
};

use crate::{
    assets::decode::{decode_image, premultiply_rgba8_in_place},
    foundation::core::Canvas,
    foundation::error::{BoothError, BoothResult},
};

#[derive(Clone, Debug, PartialEq, Eq)]
/// Prepared raster image in premultiplied RGBA8 form.
pub struct PreparedImage {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Pixel bytes in row-major premultiplied RGBA8.
    pub rgba8_premul: Arc<Vec<u8>>,
}

impl PreparedImage {
    /// Wrap an already premultiplied buffer, validating its length.
    pub fn from_premul(width: u32, height: u32, rgba8_premul: Vec<u8>) -> BoothResult<Self> {
        if rgba8_premul.len() != (width as usize) * (height as usize) * 4 {
            return Err(BoothError::validation(
                "prepared image expects width*height*4 bytes",
            ));
        }
        Ok(Self {
            width,
            height,
            rgba8_premul: Arc::new(rgba8_premul),
        })
    }

    /// Premultiply a straight-alpha `image` buffer.
    pub fn from_rgba_image(rgba: image::RgbaImage) -> Self {
        let (width, height) = rgba.dimensions();
        let mut rgba8_premul = rgba.into_raw();
        premultiply_rgba8_in_place(&mut rgba8_premul);
        Self {
            width,
            height,
            rgba8_premul: Arc::new(rgba8_premul),
        }
    }

    /// Native size of the image.
    pub fn canvas(&self) -> Canvas {
        Canvas {
            width: self.width,
            height: self.height,
        }
    }

    /// Return `true` when either dimension is zero.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Extract the alpha channel as a single-plane image.
    pub(crate) fn alpha_plane(&self) -> image::GrayImage {
        let alpha: Vec<u8> = self.rgba8_premul.chunks_exact(4).map(|px| px[3]).collect();
        image::GrayImage::from_raw(self.width, self.height, alpha)
            .unwrap_or_else(|| image::GrayImage::new(0, 0))
    }
}

/// Source of decoded images, addressed by locator.
///
/// Loading is the only suspension point of a render: callers check their render token right
/// after every call.
pub trait AssetLoader {
    /// Load and decode the image behind `locator`.
    fn load_image(&mut self, locator: &str) -> BoothResult<PreparedImage>;
}

/// Normalize and validate flow-relative asset paths.
///
/// The normalized result uses `/` separators, removes `.` segments, and rejects absolute paths or
/// parent traversals (`..`).
pub fn normalize_rel_path(source: &str) -> BoothResult<String> {
    let s = source.replace('\\', "/");
    if s.starts_with('/') {
        return Err(BoothError::validation("asset paths must be relative"));
    }
    if s.is_empty() {
        return Err(BoothError::validation("asset path must be non-empty"));
    }

    let mut out = Vec::<&str>::new();
    for part in s.split('/') {
        if part.is_empty() || part == "." {
            continue;
        }
        if part == ".." {
            return Err(BoothError::validation("asset paths must not contain '..'"));
        }
        out.push(part);
    }

    if out.is_empty() {
        return Err(BoothError::validation(
            "asset path must contain a file name",
        ));
    }

    Ok(out.join("/"))
}

/// Filesystem loader rooted at a directory (usually the flow record's directory).
#[derive(Clone, Debug)]
pub struct FsAssetLoader {
    root: PathBuf,
    loads: u64,
}

impl FsAssetLoader {
    /// Loader resolving relative locators against `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            loads: 0,
        }
    }

    /// Root directory used when resolving locators.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Number of successful loads performed so far.
    pub fn load_count(&self) -> u64 {
        self.loads
    }
}

impl AssetLoader for FsAssetLoader {
    fn load_image(&mut self, locator: &str) -> BoothResult<PreparedImage> {
        let norm = normalize_rel_path(locator)?;
        let path = self.root.join(Path::new(&norm));
        let bytes = std::fs::read(&path).map_err(|e| {
            BoothError::asset_load(format!("failed to read '{}': {e}", path.display()))
        })?;
        let img = decode_image(&bytes)
            .map_err(|e| BoothError::asset_load(format!("failed to decode '{locator}': {e}")))?;
        self.loads += 1;
        Ok(img)
    }
}

/// In-memory loader keyed by locator, holding encoded bytes.
#[derive(Clone, Debug, Default)]
pub struct MemoryAssetLoader {
    entries: HashMap<String, Arc<Vec<u8>>>,
    loads: HashMap<String, u64>,
}

impl MemoryAssetLoader {
    /// Empty loader.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register encoded image bytes under `locator`, replacing any previous entry.
    pub fn insert(&mut self, locator: impl Into<String>, bytes: Vec<u8>) {
        self.entries.insert(locator.into(), Arc::new(bytes));
    }

    /// How many times `locator` was successfully decoded.
    pub fn load_count(&self, locator: &str) -> u64 {
        self.loads.get(locator).copied().unwrap_or(0)
    }
}

impl AssetLoader for MemoryAssetLoader {
    fn load_image(&mut self, locator: &str) -> BoothResult<PreparedImage> {
        let bytes = self
            .entries
            .get(locator)
            .ok_or_else(|| BoothError::asset_load(format!("unknown asset '{locator}'")))?;
        let img = decode_image(bytes)
            .map_err(|e| BoothError::asset_load(format!("failed to decode '{locator}': {e}")))?;
        *self.loads.entry(locator.to_owned()).or_insert(0) += 1;
        Ok(img)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/assets/store.rs"]
mod tests;
