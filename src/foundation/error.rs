use crate::access::code_store::AccessError;

/// Convenience result type used across snapbooth.
pub type BoothResult<T> = Result<T, BoothError>;

/// Top-level error taxonomy used by engine APIs.
#[derive(thiserror::Error, Debug)]
pub enum BoothError {
    /// Invalid caller-provided data or flow state.
    #[error("validation error: {0}")]
    Validation(String),

    /// A template or photo could not be read or decoded.
    #[error("asset load error: {0}")]
    AssetLoad(String),

    /// Errors while compositing or rasterizing a frame.
    #[error("render error: {0}")]
    Render(String),

    /// Errors when serializing or deserializing persisted records.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Access-code rejection at the code store boundary.
    #[error("access error: {0}")]
    Access(#[from] AccessError),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl BoothError {
    /// Build a [`BoothError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`BoothError::AssetLoad`] value.
    pub fn asset_load(msg: impl Into<String>) -> Self {
        Self::AssetLoad(msg.into())
    }

    /// Build a [`BoothError::Render`] value.
    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
    }

    /// Build a [`BoothError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }

    /// Short, transient message suitable for a user-facing notice.
    ///
    /// Errors never escalate past the operation boundary; callers surface this string and keep
    /// the previously committed state.
    pub fn user_notice(&self) -> String {
        match self {
            Self::Validation(msg) => msg.clone(),
            Self::AssetLoad(_) => "Could not load the image. Please try again.".to_owned(),
            Self::Render(_) => "Could not render the template.".to_owned(),
            Self::Serde(_) => "Saved state is corrupted.".to_owned(),
            Self::Access(e) => e.to_string(),
            Self::Other(_) => "Something went wrong.".to_owned(),
        }
    }
}

impl From<serde_json::Error> for BoothError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serde(e.to_string())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
