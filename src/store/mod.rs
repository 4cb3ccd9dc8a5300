//! Persistent asset store and the in-memory layer in front of it
//!
//! Three independent namespaces hold font mappings, font payloads and image
//! payloads. Payloads are text (data URLs or serialized mappings). A key maps
//! to at most one payload and writes are idempotent overwrites.

pub mod fs;
pub mod memory;

pub use fs::FsAssetStore;
pub use memory::AssetCache;

use crate::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One of the store's independent key spaces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Namespace {
    /// CSS source identifier -> serialized font mapping
    FontMappings,
    /// Font resource locator -> font data URL
    FontData,
    /// Image resource locator -> image data URL
    ImageData,
}

impl Namespace {
    pub const ALL: [Namespace; 3] = [Namespace::FontMappings, Namespace::FontData, Namespace::ImageData];

    pub fn name(self) -> &'static str {
        match self {
            Namespace::FontMappings => "fontMappings",
            Namespace::FontData => "fontData",
            Namespace::ImageData => "imageData",
        }
    }
}

impl std::fmt::Display for Namespace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A stored key/payload pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetRecord {
    pub key: String,
    pub payload: String,
}

/// Key/value backend that survives across sessions.
///
/// Implementations open lazily and report an unavailable backend through
/// `Error::StoreUnavailable`; callers treat that as a miss.
#[async_trait(?Send)]
pub trait AssetStore {
    /// Look up a payload by key
    async fn get(&self, ns: Namespace, key: &str) -> Result<Option<String>>;

    /// Every record of a namespace, in no particular order
    async fn get_all(&self, ns: Namespace) -> Result<Vec<AssetRecord>>;

    /// Insert or overwrite a payload
    async fn put(&self, ns: Namespace, key: &str, payload: &str) -> Result<()>;
}
