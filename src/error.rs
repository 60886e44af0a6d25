//! Error types for the fetch-and-composite pipeline

use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while fetching or compositing an inscription
#[derive(Error, Debug)]
pub enum Error {
    /// An identifier token was empty or contained characters that cannot be
    /// spliced into a URL
    #[error("Invalid inscription identifier: {0:?}")]
    InvalidIdentifier(String),

    /// The remote host answered with something other than 200 OK
    #[error("Request to {url} returned status {status}")]
    FetchStatus { url: String, status: u16 },

    /// The inscription page carried no `og:image` meta tag
    #[error("No og:image meta tag found for inscription {0}")]
    MetadataNotFound(String),

    /// The page metadata was present but unusable
    #[error("Failed to parse page metadata: {0}")]
    ParseError(String),

    /// Operation timed out
    #[error("Operation timed out after {0}ms")]
    Timeout(u64),

    /// Network error
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Downloaded or template bytes could not be decoded as an image
    #[error("Image decoding failed: {0}")]
    DecodeError(String),

    /// Failed to encode or persist a composite
    #[error("Rendering failed: {0}")]
    RenderError(String),

    /// Template index outside the fixed catalog
    #[error("Unknown template index {0}")]
    UnknownTemplate(usize),

    /// Color string was not `#rgb` or `#rrggbb`
    #[error("Invalid color: {0:?}")]
    InvalidColor(String),

    /// Invalid or missing configuration
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    /// Filesystem error
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Map a transport failure, keeping timeouts distinguishable.
    pub(crate) fn from_reqwest(err: reqwest::Error, timeout_ms: u64) -> Self {
        if err.is_timeout() {
            Error::Timeout(timeout_ms)
        } else {
            Error::NetworkError(err.to_string())
        }
    }
}
