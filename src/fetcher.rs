//! Blocking HTTP fetcher: inscription page → `og:image` → bucket download.
//!
//! Every call performs two requests. The inscription page is scraped for its
//! `og:image` meta tag, whose content URL carries the artwork id in an `id`
//! query parameter; the artwork is then streamed from the image bucket into a
//! scratch file, decoded and resampled with nearest-neighbor so pixel art keeps
//! its hard edges.

use crate::{Error, FetchConfig, Fetcher, Identifier, Result, SourceImage};
use image::imageops::FilterType;
use log::{debug, warn};
use reqwest::blocking::{Client, Response};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, CONNECTION, TE, USER_AGENT};
use reqwest::StatusCode;
use scraper::{Html, Selector};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

/// Fetcher backed by `reqwest`'s blocking client.
pub struct HttpFetcher {
    client: Client,
    config: FetchConfig,
    scratch_dir: PathBuf,
}

impl HttpFetcher {
    /// Place scratch downloads in `dir` instead of the system temp directory.
    pub fn with_scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_dir = dir.into();
        self
    }

    /// GET `url`, failing on anything but 200.
    fn get_ok(&self, url: &str) -> Result<Response> {
        debug!("GET {}", url);
        let res = self
            .client
            .get(url)
            .send()
            .map_err(|e| Error::from_reqwest(e, self.config.timeout_ms))?;

        if res.status() != StatusCode::OK {
            return Err(Error::FetchStatus {
                url: url.to_string(),
                status: res.status().as_u16(),
            });
        }
        Ok(res)
    }

    /// Stream the artwork into a scratch file unique to this call. The file is
    /// removed when the returned handle drops.
    fn download(&self, identifier: &Identifier, image_id: &str) -> Result<tempfile::NamedTempFile> {
        let image_url = format!("{}{}", self.config.bucket_url, image_id);
        let mut res = self.get_ok(&image_url)?;

        let mut scratch = tempfile::Builder::new()
            .prefix(&format!("inscription-{}-", identifier))
            .suffix(".png")
            .tempfile_in(&self.scratch_dir)?;
        res.copy_to(&mut scratch)
            .map_err(|e| Error::from_reqwest(e, self.config.timeout_ms))?;
        scratch.flush()?;
        Ok(scratch)
    }
}

impl Fetcher for HttpFetcher {
    fn new(config: FetchConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        for (name, value) in &config.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| Error::ConfigError(format!("header name {:?}: {}", name, e)))?;
            if name == TE {
                warn!("ignoring configured {} header", name);
                continue;
            }
            let value = HeaderValue::from_str(value)
                .map_err(|e| Error::ConfigError(format!("header value {:?}: {}", value, e)))?;
            headers.insert(name, value);
        }
        // The fixed set goes in last so configured headers cannot replace it.
        let user_agent = HeaderValue::from_str(&config.user_agent).map_err(|e| {
            Error::ConfigError(format!("user agent {:?}: {}", config.user_agent, e))
        })?;
        headers.insert(USER_AGENT, user_agent);
        headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
        headers.insert(CONNECTION, HeaderValue::from_static("close"));

        // gzip/deflate features make the client advertise and decode both.
        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| Error::ConfigError(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            config,
            scratch_dir: std::env::temp_dir(),
        })
    }

    fn fetch(&self, identifier: &Identifier) -> Result<SourceImage> {
        let page_url = format!("{}{}", self.config.base_url, identifier);
        let html = self
            .get_ok(&page_url)?
            .text()
            .map_err(|e| Error::from_reqwest(e, self.config.timeout_ms))?;

        let image_id = match parse_image_id(&html, &page_url)? {
            Some(id) => id,
            None => {
                warn!("no og:image meta tag on {}", page_url);
                return Err(Error::MetadataNotFound(identifier.to_string()));
            }
        };
        debug!("inscription {} resolved to image id {}", identifier, image_id);

        let scratch = self.download(identifier, &image_id)?;
        let image = decode_and_resample(scratch.path(), self.config.target_size)?;
        Ok(SourceImage::new(image))
    }
}

/// Pull the artwork id out of an inscription page.
///
/// Returns `Ok(None)` when the page has no usable `og:image` tag. The tag's
/// content may be absolute or relative to `page_url`.
pub fn parse_image_id(html: &str, page_url: &str) -> Result<Option<String>> {
    let document = Html::parse_document(html);
    let og_image = Selector::parse(r#"meta[property="og:image"]"#)
        .map_err(|e| Error::ParseError(format!("bad selector: {:?}", e)))?;

    let Some(content) = document
        .select(&og_image)
        .find_map(|meta| meta.value().attr("content"))
    else {
        return Ok(None);
    };

    let base = Url::parse(page_url)
        .map_err(|e| Error::ParseError(format!("page url {:?}: {}", page_url, e)))?;
    let image_url = base
        .join(content.trim())
        .map_err(|e| Error::ParseError(format!("og:image url {:?}: {}", content, e)))?;

    // Raw text of the parameter; the bucket expects it exactly as the page wrote it.
    image_url
        .query()
        .and_then(|query| query.split('&').find_map(|pair| pair.strip_prefix("id=")))
        .filter(|id| !id.is_empty())
        .map(|id| Some(id.to_string()))
        .ok_or_else(|| Error::ParseError(format!("og:image url {:?} has no id parameter", content)))
}

fn decode_and_resample(path: &Path, size: u32) -> Result<image::DynamicImage> {
    let bytes = std::fs::read(path)?;
    let image = image::load_from_memory(&bytes)
        .map_err(|e| Error::DecodeError(format!("{}: {}", path.display(), e)))?;
    Ok(image.resize_exact(size, size, FilterType::Nearest))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
    use std::io::Cursor;

    const PAGE: &str = "https://www.ord.io/70300943";

    #[test]
    fn extracts_id_from_absolute_og_image() {
        let html = r#"<html><head>
            <meta property="og:title" content="Inscription 70300943">
            <meta property="og:image" content="https://www.ord.io/api/preview?id=abc123i0&size=large">
            </head><body></body></html>"#;
        let id = parse_image_id(html, PAGE).unwrap();
        assert_eq!(id.as_deref(), Some("abc123i0"));
    }

    #[test]
    fn extracts_id_from_relative_og_image() {
        let html = r#"<meta property="og:image" content="/preview?id=deadbeefi0">"#;
        let id = parse_image_id(html, PAGE).unwrap();
        assert_eq!(id.as_deref(), Some("deadbeefi0"));
    }

    #[test]
    fn missing_meta_tag_is_none() {
        let html = "<html><head><title>Nope</title></head></html>";
        assert!(parse_image_id(html, PAGE).unwrap().is_none());
    }

    #[test]
    fn meta_tag_without_id_is_a_parse_error() {
        let html = r#"<meta property="og:image" content="https://cdn.example/card.png">"#;
        let err = parse_image_id(html, PAGE).unwrap_err();
        assert!(matches!(err, Error::ParseError(_)));
    }

    #[test]
    fn id_keeps_its_raw_encoding() {
        let html = r#"<meta property="og:image" content="/preview?v=2&id=a%2Bb+c&size=l">"#;
        let id = parse_image_id(html, PAGE).unwrap();
        assert_eq!(id.as_deref(), Some("a%2Bb+c"));
    }

    #[test]
    fn resample_uses_nearest_neighbor() {
        // 2x2 checkerboard: nearest keeps only the two original colors.
        let mut img = RgbaImage::new(2, 2);
        img.put_pixel(0, 0, Rgba([255, 0, 0, 255]));
        img.put_pixel(1, 1, Rgba([255, 0, 0, 255]));
        img.put_pixel(1, 0, Rgba([0, 0, 255, 255]));
        img.put_pixel(0, 1, Rgba([0, 0, 255, 255]));

        let mut buf = Vec::new();
        DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .unwrap();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&buf).unwrap();

        let out = decode_and_resample(file.path(), 500).unwrap().to_rgba8();
        assert_eq!(out.dimensions(), (500, 500));
        assert_eq!(out.get_pixel(0, 0), &Rgba([255, 0, 0, 255]));
        assert_eq!(out.get_pixel(499, 0), &Rgba([0, 0, 255, 255]));
        assert!(out
            .pixels()
            .all(|p| *p == Rgba([255, 0, 0, 255]) || *p == Rgba([0, 0, 255, 255])));
    }

    #[test]
    fn test_fetch_status_from_local_server() {
        let server = tiny_http::Server::http("127.0.0.1:0").unwrap();
        let addr = server.server_addr();

        std::thread::spawn(move || {
            if let Ok(request) = server.recv() {
                let response = tiny_http::Response::from_string("gone").with_status_code(404);
                let _ = request.respond(response);
            }
        });

        let config = FetchConfig {
            base_url: format!("http://{}/", addr),
            ..Default::default()
        };
        let fetcher = HttpFetcher::new(config).expect("Failed to create HttpFetcher");
        let id = Identifier::new("404").unwrap();
        match fetcher.fetch(&id) {
            Err(Error::FetchStatus { status, url }) => {
                assert_eq!(status, 404);
                assert!(url.ends_with("/404"));
            }
            other => panic!("expected FetchStatus, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn sends_fixed_request_headers() {
        let server = tiny_http::Server::http("127.0.0.1:0").unwrap();
        let addr = server.server_addr();
        let (tx, rx) = std::sync::mpsc::channel();

        std::thread::spawn(move || {
            if let Ok(request) = server.recv() {
                let headers: Vec<(String, String)> = request
                    .headers()
                    .iter()
                    .map(|h| (h.field.to_string().to_ascii_lowercase(), h.value.to_string()))
                    .collect();
                let _ = tx.send(headers);
                let _ = request.respond(tiny_http::Response::from_string("gone").with_status_code(404));
            }
        });

        let mut extra = std::collections::HashMap::new();
        extra.insert("Connection".to_string(), "keep-alive".to_string());
        extra.insert("User-Agent".to_string(), "curl/8.0".to_string());
        extra.insert("TE".to_string(), "trailers".to_string());
        extra.insert("X-Trace".to_string(), "on".to_string());
        let config = FetchConfig {
            base_url: format!("http://{}/", addr),
            headers: extra,
            ..Default::default()
        };
        let fetcher = HttpFetcher::new(config).unwrap();
        assert!(fetcher.fetch(&Identifier::new("1").unwrap()).is_err());

        let headers = rx.recv().unwrap();
        let get = |name: &str| {
            headers
                .iter()
                .find(|(field, _)| field == name)
                .map(|(_, value)| value.as_str())
        };
        assert_eq!(get("user-agent"), Some("Mozilla/5.0"));
        assert_eq!(get("connection"), Some("close"));
        assert_eq!(get("accept"), Some("*/*"));
        assert_eq!(get("x-trace"), Some("on"));
        let encoding = get("accept-encoding").unwrap_or_default();
        assert!(encoding.contains("gzip") && encoding.contains("deflate"), "{}", encoding);
        assert!(get("te").is_none());
    }
}
