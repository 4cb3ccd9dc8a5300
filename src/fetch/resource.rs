//! Download-once, cache-forever access to fonts, images and font CSS.

use super::{encode_data_url, mime_for, FetchOverride, Fetcher};
use crate::store::{AssetCache, Namespace};
use crate::{Error, Result};
use async_trait::async_trait;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use url::Url;

/// Resolves resource locators to data URLs through memory, store, then network.
///
/// Every lookup is check-then-fill: the caches are consulted before the first
/// await and filled after the download completes. Two concurrent misses for
/// the same locator may both download; the second fill is an identical
/// overwrite.
pub struct ResourceFetcher {
    cache: Rc<AssetCache>,
    net: Rc<dyn Fetcher>,
    document_url: Url,
    css_text: RefCell<HashMap<String, String>>,
}

impl ResourceFetcher {
    pub fn new(cache: Rc<AssetCache>, net: Rc<dyn Fetcher>, document_url: &str) -> Result<Self> {
        let document_url = Url::parse(document_url)?;
        Ok(Self {
            cache,
            net,
            document_url,
            css_text: RefCell::new(HashMap::new()),
        })
    }

    pub fn document_url(&self) -> &Url {
        &self.document_url
    }

    pub fn cache(&self) -> &AssetCache {
        &self.cache
    }

    /// Resolve `locator` against `base` (or the document URL)
    pub fn resolve(&self, locator: &str, base: Option<&str>) -> Result<Url> {
        let base = match base {
            Some(b) => Url::parse(b)?,
            None => self.document_url.clone(),
        };
        Ok(base.join(locator.trim())?)
    }

    /// Font file as a data URL, or `None` when it cannot be obtained
    pub async fn font_data_url(&self, url: &str) -> Option<String> {
        self.cached_data_url(Namespace::FontData, url).await
    }

    /// Image as a data URL.
    ///
    /// Empty input, input that is already a `data:` URL, and input that does
    /// not parse as a URL return `None` without touching the network.
    pub async fn image_data_url(&self, url: &str) -> Option<String> {
        let url = url.trim();
        if url.is_empty() || url.starts_with("data:") {
            return None;
        }
        let resolved = match self.document_url.join(url) {
            Ok(u) => u,
            Err(_) => return None,
        };
        self.cached_data_url(Namespace::ImageData, resolved.as_str()).await
    }

    async fn cached_data_url(&self, ns: Namespace, url: &str) -> Option<String> {
        if let Some(hit) = self.cache.get(ns, url).await {
            return Some(hit);
        }

        log::info!("Downloading and caching [{}]: {}", ns, url);
        match self.download_data_url(url).await {
            Ok(data_url) => {
                self.cache.put(ns, url, &data_url).await;
                Some(data_url)
            }
            Err(e) => {
                match ns {
                    Namespace::ImageData => log::error!("[Image Fetch] Network fetch failed for {}: {}", url, e),
                    _ => log::error!("Failed to download font {}: {}", url, e),
                }
                None
            }
        }
    }

    async fn download_data_url(&self, url: &str) -> Result<String> {
        let resp = self.net.fetch(url).await?;
        if !resp.is_success() {
            return Err(Error::HttpStatus {
                status: resp.status,
                url: url.to_string(),
            });
        }
        let mime = mime_for(resp.content_type.as_deref(), url);
        Ok(encode_data_url(&mime, &resp.body))
    }

    /// Stylesheet text, memoized for the session
    pub async fn css_text(&self, url: &str) -> Result<String> {
        if let Some(hit) = self.css_text.borrow().get(url) {
            return Ok(hit.clone());
        }
        let resp = self.net.fetch(url).await?;
        if !resp.is_success() {
            return Err(Error::HttpStatus {
                status: resp.status,
                url: url.to_string(),
            });
        }
        let text = String::from_utf8_lossy(&resp.body).into_owned();
        self.css_text.borrow_mut().insert(url.to_string(), text.clone());
        Ok(text)
    }
}

#[async_trait(?Send)]
impl FetchOverride for ResourceFetcher {
    async fn fetch_data_url(&self, url: &str) -> Option<String> {
        self.image_data_url(url).await
    }
}
