use std::fmt;

/// Convenience result type used across koma.
pub type KomaResult<T> = Result<T, KomaError>;

/// Boxed error used to carry an underlying cause across API boundaries.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Top-level error taxonomy used by library APIs.
#[derive(thiserror::Error, Debug)]
pub enum KomaError {
    /// Invalid caller-provided or scene data.
    #[error("validation error: {0}")]
    Validation(String),

    /// The page list could not be retrieved from the persistence layer.
    #[error("fetch error: {message}")]
    Fetch {
        /// Human-readable summary.
        message: String,
        /// Underlying storage/network fault.
        #[source]
        source: BoxError,
    },

    /// A single image failed to load within its retry budget.
    #[error(transparent)]
    ImageLoad(#[from] ImageLoadError),

    /// Unexpected failure while drawing an element.
    #[error("render error: {0}")]
    Render(String),

    /// Final encoding of a PNG or PDF failed.
    #[error("encode error: {0}")]
    Encode(String),

    /// Errors when serializing or deserializing data structures.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl KomaError {
    /// Build a [`KomaError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`KomaError::Fetch`] value wrapping `source`.
    pub fn fetch(msg: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Fetch {
            message: msg.into(),
            source: source.into(),
        }
    }

    /// Build a [`KomaError::Render`] value.
    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
    }

    /// Build a [`KomaError::Encode`] value.
    pub fn encode(msg: impl Into<String>) -> Self {
        Self::Encode(msg.into())
    }

    /// Build a [`KomaError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }
}

/// Image load failure shared between every caller waiting on the same URL.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("image load error: '{url}' failed after {attempts} attempt(s): {message}")]
pub struct ImageLoadError {
    /// URL that was requested.
    pub url: String,
    /// Number of attempts made before giving up.
    pub attempts: u32,
    /// Last failure, rendered with its cause chain.
    pub message: String,
}

/// Machine-readable code attached to every [`ExportError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Page list retrieval failed.
    FetchError,
    /// Drawing failed in a way that could not be recovered per element.
    RenderError,
    /// Export orchestration or encoding failed.
    ExportError,
    /// An image could not be loaded.
    ImageLoadError,
}

impl ErrorCode {
    /// Stable string form, e.g. `FETCH_ERROR`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::FetchError => "FETCH_ERROR",
            Self::RenderError => "RENDER_ERROR",
            Self::ExportError => "EXPORT_ERROR",
            Self::ImageLoadError => "IMAGE_LOAD_ERROR",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal error returned by [`crate::export_pages`].
#[derive(thiserror::Error, Debug)]
#[error("{code}: {message}")]
pub struct ExportError {
    /// Machine-readable classification.
    pub code: ErrorCode,
    /// Human-readable summary.
    pub message: String,
    /// Original cause, kept for diagnostics.
    #[source]
    pub source: Option<KomaError>,
}

impl ExportError {
    /// Build an error without an underlying cause.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            source: None,
        }
    }
}

impl From<KomaError> for ExportError {
    fn from(err: KomaError) -> Self {
        let code = match &err {
            KomaError::Fetch { .. } => ErrorCode::FetchError,
            KomaError::ImageLoad(_) => ErrorCode::ImageLoadError,
            KomaError::Render(_) => ErrorCode::RenderError,
            KomaError::Validation(_)
            | KomaError::Encode(_)
            | KomaError::Serde(_)
            | KomaError::Other(_) => ErrorCode::ExportError,
        };
        Self {
            code,
            message: err.to_string(),
            source: Some(err),
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
