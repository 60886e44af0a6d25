//! Inscription Backdrop
//!
//! Looks up an inscription by identifier, scrapes the artwork reference from
//! the inscription page, downloads the image and composites it onto a solid
//! color, a jittered color grid or one of a fixed set of template images.
//!
//! # Example
//!
//! ```no_run
//! use inscription_backdrop::{Background, Compositor, FetchConfig, Pipeline};
//! use image::Rgb;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let fetcher = inscription_backdrop::new_fetcher(FetchConfig::default())?;
//! let pipeline = Pipeline::new(fetcher, Compositor::new("output"));
//!
//! let background = Background::Solid(Rgb([0, 0, 0]));
//! for item in pipeline.process_batch("70300943", &background, &mut rand::rng()) {
//!     match item.outcome {
//!         Ok(result) => println!("{} -> {}", item.identifier, result.path.display()),
//!         Err(e) => eprintln!("{}: {}", item.identifier, e),
//!     }
//! }
//! # Ok(())
//! # }
//! ```

use std::collections::HashMap;
use std::fmt;

use image::DynamicImage;
use serde::Deserialize;

pub mod error;
pub use error::{Error, Result};

pub mod color;
pub mod compositor;
pub mod config;
pub mod fetcher;
pub mod pipeline;
pub mod session;
pub mod templates;

pub use compositor::{Background, CompositeResult, Compositor, GridSpec};
pub use config::{Settings, Workspace};
pub use fetcher::HttpFetcher;
pub use pipeline::{BatchItem, Pipeline};
pub use session::{Selection, SessionState};
pub use templates::{TemplateCatalog, TemplateImage};

/// Side length every downloaded image is resampled to.
pub const TARGET_SIZE: u32 = 500;

/// Configuration for fetching inscription artwork
///
/// The defaults mirror the public inscription site and its image bucket:
/// a desktop user agent and a 10 second timeout per request.
///
/// # Examples
///
/// ```
/// let cfg = inscription_backdrop::FetchConfig::default();
/// assert_eq!(cfg.timeout_ms, 10_000);
/// assert!(cfg.base_url.ends_with('/'));
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Page URL prefix; the identifier is appended verbatim
    pub base_url: String,
    /// Image bucket URL prefix; the scraped image id is appended verbatim
    pub bucket_url: String,
    /// User agent string to send with requests
    pub user_agent: String,
    /// Timeout for each request in milliseconds
    pub timeout_ms: u64,
    /// Extra HTTP headers sent with every request
    pub headers: HashMap<String, String>,
    /// Side length of the resampled source image
    pub target_size: u32,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.ord.io/".to_string(),
            bucket_url: "https://ordin.s3.amazonaws.com/inscriptions/".to_string(),
            user_agent: "Mozilla/5.0".to_string(),
            timeout_ms: 10_000,
            headers: HashMap::new(),
            target_size: TARGET_SIZE,
        }
    }
}

/// A single inscription lookup token.
///
/// An optional leading `-` (cursed inscriptions carry negative numbers)
/// followed by ASCII letters and digits. Nothing else is accepted since the
/// value is appended to the page URL as-is.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identifier(String);

impl Identifier {
    pub fn new(raw: &str) -> Result<Self> {
        let token = raw.trim();
        let body = token.strip_prefix('-').unwrap_or(token);
        if body.is_empty() || !body.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(Error::InvalidIdentifier(raw.to_string()));
        }
        Ok(Self(token.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Split user input into its trimmed tokens.
///
/// Tokens are comma separated; blanks between commas are skipped, so an empty
/// input means no lookup was requested. Tokens are not validated here, see
/// [`Identifier::new`].
pub fn batch_tokens(input: &str) -> impl Iterator<Item = &str> {
    input.split(',').map(str::trim).filter(|tok| !tok.is_empty())
}

/// Downloaded artwork, already resampled to its fixed square size
#[derive(Debug, Clone)]
pub struct SourceImage {
    pub image: DynamicImage,
}

impl SourceImage {
    pub fn new(image: DynamicImage) -> Self {
        Self { image }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

/// Core trait for artwork fetchers
pub trait Fetcher {
    /// Create a new fetcher with the given configuration
    fn new(config: FetchConfig) -> Result<Self>
    where
        Self: Sized;

    /// Resolve an identifier to its artwork and resample it
    fn fetch(&self, identifier: &Identifier) -> Result<SourceImage>;
}

/// Create a fetcher backed by the blocking HTTP client
pub fn new_fetcher(config: FetchConfig) -> Result<impl Fetcher> {
    HttpFetcher::new(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = FetchConfig::default();
        assert_eq!(config.target_size, 500);
        assert_eq!(config.user_agent, "Mozilla/5.0");
        assert!(config.headers.is_empty());
    }

    #[test]
    fn parse_batch_of_three() {
        let ids: Vec<&str> = batch_tokens("1, 2,3").collect();
        assert_eq!(ids, vec!["1", "2", "3"]);
    }

    #[test]
    fn empty_input_means_no_lookup() {
        assert_eq!(batch_tokens("").count(), 0);
        assert_eq!(batch_tokens(" , ,").count(), 0);
    }

    #[test]
    fn accepts_negative_inscription_numbers() {
        assert_eq!(Identifier::new("-1000").unwrap().as_str(), "-1000");
        assert_eq!(Identifier::new(" -5 ").unwrap().as_str(), "-5");
        assert!(Identifier::new("-").is_err());
        assert!(Identifier::new("--5").is_err());
        assert!(Identifier::new("5-").is_err());
    }

    #[test]
    fn rejects_tokens_that_would_break_the_url() {
        let err = Identifier::new("../etc").unwrap_err();
        assert!(matches!(err, Error::InvalidIdentifier(tok) if tok == "../etc"));
        assert!(Identifier::new("12 34").is_err());
        assert!(Identifier::new("1?id=2").is_err());
    }
}
