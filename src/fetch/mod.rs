//! Network access and the download-once resource fetcher
//!
//! [`Fetcher`] is the raw network seam. [`ResourceFetcher`] layers the asset
//! cache on top of it and turns font and image resources into self-contained
//! data URLs.

#[cfg(feature = "http")]
pub mod http;
pub mod resource;

#[cfg(feature = "http")]
pub use http::HttpFetcher;
pub use resource::ResourceFetcher;

use crate::Result;
use async_trait::async_trait;
use base64::Engine as _;

/// A completed network response
#[derive(Debug, Clone)]
pub struct FetchedResource {
    /// HTTP status code
    pub status: u16,
    /// `Content-Type` header, if any
    pub content_type: Option<String>,
    /// Response body bytes
    pub body: Vec<u8>,
}

impl FetchedResource {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Raw network access
#[async_trait(?Send)]
pub trait Fetcher {
    /// Perform a GET. Non-success statuses are returned, not raised.
    async fn fetch(&self, url: &str) -> Result<FetchedResource>;
}

/// Fetch hook handed to the renderer.
///
/// The renderer calls it for every remote resource it meets. `None` means
/// "not handled here", and the renderer falls back to its own fetch.
#[async_trait(?Send)]
pub trait FetchOverride {
    async fn fetch_data_url(&self, url: &str) -> Option<String>;
}

/// Encode bytes as a `data:` URL
pub fn encode_data_url(mime: &str, body: &[u8]) -> String {
    format!(
        "data:{};base64,{}",
        mime,
        base64::engine::general_purpose::STANDARD.encode(body)
    )
}

/// Pick a MIME type from the response header, falling back to the URL's extension
pub fn mime_for(content_type: Option<&str>, url: &str) -> String {
    if let Some(ct) = content_type {
        let essence = ct.split(';').next().unwrap_or("").trim();
        if !essence.is_empty() {
            return essence.to_ascii_lowercase();
        }
    }
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let ext = path.rsplit('.').next().unwrap_or("").to_ascii_lowercase();
    match ext.as_str() {
        "woff2" => "font/woff2",
        "woff" => "font/woff",
        "ttf" => "font/ttf",
        "otf" => "font/otf",
        "eot" => "application/vnd.ms-fontobject",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "css" => "text/css",
        _ => "application/octet-stream",
    }
    .to_string()
}
