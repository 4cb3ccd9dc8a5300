//! Error types for the screenshot pipeline

use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while preparing assets or compositing a screenshot
#[derive(Error, Debug)]
pub enum Error {
    /// The persistent asset store could not be opened or used
    #[error("Asset store unavailable: {0}")]
    StoreUnavailable(String),

    /// Network error while fetching a resource
    #[error("Network error: {0}")]
    Network(String),

    /// A fetch completed with a non-success status
    #[error("HTTP {status} for {url}")]
    HttpStatus { status: u16, url: String },

    /// A resource locator could not be parsed or resolved
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Building a font mapping failed
    #[error("Font mapping failed: {0}")]
    FontMapping(String),

    /// Capturing the unit background failed
    #[error("Background capture failed: {0}")]
    BackgroundCapture(String),

    /// The rendering collaborator failed to produce a raster
    #[error("Rendering failed: {0}")]
    Render(String),

    /// Encoding the final canvas failed
    #[error("Encoding failed: {0}")]
    Encode(String),

    /// No elements were supplied for the screenshot
    #[error("No elements provided for screenshot")]
    NothingToCapture,

    /// The selected start/end boundaries could not be resolved
    #[error("Selection range is incomplete or no longer in the document")]
    RangeUnresolved,

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Image(#[from] image::ImageError),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Error::InvalidUrl(err.to_string())
    }
}

#[cfg(feature = "http")]
impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Network(err.to_string())
    }
}
