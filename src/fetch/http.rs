//! reqwest-backed network fetcher

use super::{FetchedResource, Fetcher};
use crate::{Error, Result};
use async_trait::async_trait;
use reqwest::Client;

const USER_AGENT: &str = concat!("rangeshot/", env!("CARGO_PKG_VERSION"));

/// Plain HTTP(S) GETs with the platform's default timeouts
#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| Error::Network(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    /// Use a preconfigured client (proxies, headers, timeouts)
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait(?Send)]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedResource> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::Network(format!("Failed to fetch {}: {}", url, e)))?;

        let status = resp.status().as_u16();
        let content_type = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());
        let body = resp
            .bytes()
            .await
            .map_err(|e| Error::Network(format!("Failed to read response body of {}: {}", url, e)))?
            .to_vec();

        Ok(FetchedResource {
            status,
            content_type,
            body,
        })
    }
}
