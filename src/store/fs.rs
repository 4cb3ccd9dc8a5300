//! Directory-backed asset store.
//!
//! Layout: `<root>/schema.json` holds the schema version, and each namespace
//! is a directory of `<sha256(key)>.json` files containing an [`AssetRecord`].

use super::{AssetRecord, AssetStore, Namespace};
use crate::{Error, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::OnceCell;

const SCHEMA_FILE: &str = "schema.json";

#[derive(Debug, Serialize, Deserialize)]
struct SchemaMarker {
    version: u32,
}

/// Persistent store rooted at a directory, opened on first use.
///
/// The open step runs at most once per instance; concurrent callers await the
/// same in-flight open. A failed open is remembered and every later call
/// reports `StoreUnavailable`.
pub struct FsAssetStore {
    root: PathBuf,
    version: u32,
    opened: OnceCell<std::result::Result<(), String>>,
    writes: AtomicU64,
}

impl FsAssetStore {
    pub fn new(root: impl Into<PathBuf>, version: u32) -> Self {
        Self {
            root: root.into(),
            version,
            opened: OnceCell::new(),
            writes: AtomicU64::new(0),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    async fn connection(&self) -> Result<&Path> {
        let state = self
            .opened
            .get_or_init(|| async {
                open_store(&self.root, self.version).await.map_err(|e| {
                    log::error!("Failed to open asset store at {}: {}", self.root.display(), e);
                    e.to_string()
                })
            })
            .await;
        match state {
            Ok(()) => Ok(&self.root),
            Err(msg) => Err(Error::StoreUnavailable(msg.clone())),
        }
    }

    fn record_path(root: &Path, ns: Namespace, key: &str) -> PathBuf {
        let digest = Sha256::digest(key.as_bytes());
        root.join(ns.name()).join(format!("{}.json", hex::encode(digest)))
    }
}

async fn open_store(root: &Path, version: u32) -> Result<()> {
    tokio::fs::create_dir_all(root).await?;
    let marker_path = root.join(SCHEMA_FILE);
    let current = match tokio::fs::read(&marker_path).await {
        Ok(bytes) => serde_json::from_slice::<SchemaMarker>(&bytes)?.version,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => 0,
        Err(e) => return Err(e.into()),
    };

    if current > version {
        return Err(Error::Other(format!(
            "store schema v{} is newer than supported v{}",
            current, version
        )));
    }
    if current < version {
        upgrade(root, current, version).await?;
        let marker = serde_json::to_vec(&SchemaMarker { version })?;
        tokio::fs::write(&marker_path, marker).await?;
    }
    Ok(())
}

/// Additive migration: creates missing namespaces, never removes any.
async fn upgrade(root: &Path, from: u32, to: u32) -> Result<()> {
    log::info!("Upgrading asset store schema v{} -> v{}", from, to);
    for ns in Namespace::ALL {
        let dir = root.join(ns.name());
        if !tokio::fs::try_exists(&dir).await? {
            tokio::fs::create_dir_all(&dir).await?;
            log::info!("Created asset store namespace '{}'", ns);
        }
    }
    Ok(())
}

#[async_trait(?Send)]
impl AssetStore for FsAssetStore {
    async fn get(&self, ns: Namespace, key: &str) -> Result<Option<String>> {
        let root = self.connection().await?;
        let path = Self::record_path(root, ns, key);
        let bytes = match tokio::fs::read(&path).await {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let record: AssetRecord = serde_json::from_slice(&bytes)?;
        if record.key != key {
            return Ok(None);
        }
        Ok(Some(record.payload))
    }

    async fn get_all(&self, ns: Namespace) -> Result<Vec<AssetRecord>> {
        let root = self.connection().await?;
        let mut records = Vec::new();
        let mut entries = match tokio::fs::read_dir(root.join(ns.name())).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(records),
            Err(e) => return Err(e.into()),
        };
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let bytes = tokio::fs::read(&path).await?;
            match serde_json::from_slice::<AssetRecord>(&bytes) {
                Ok(record) => records.push(record),
                Err(e) => log::warn!("Skipping unreadable record {}: {}", path.display(), e),
            }
        }
        Ok(records)
    }

    async fn put(&self, ns: Namespace, key: &str, payload: &str) -> Result<()> {
        let root = self.connection().await?;
        let path = Self::record_path(root, ns, key);
        let record = AssetRecord {
            key: key.to_string(),
            payload: payload.to_string(),
        };
        let bytes = serde_json::to_vec(&record)?;
        // write-then-rename keeps readers from seeing a torn record; each
        // write gets its own temp file so duplicate fills of one key can overlap
        let n = self.writes.fetch_add(1, Ordering::Relaxed);
        let tmp = path.with_extension(format!("json.{}-{}.tmp", std::process::id(), n));
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }
}
