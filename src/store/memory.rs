//! Session-scoped memory layer in front of an [`AssetStore`].

use super::{AssetRecord, AssetStore, Namespace};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// Memory-first view of the persistent store.
///
/// The memory tables start empty, are filled on every successful store read
/// or write, and are never persisted. Store failures are logged and behave
/// like misses.
pub struct AssetCache {
    store: Rc<dyn AssetStore>,
    memory: RefCell<HashMap<Namespace, HashMap<String, String>>>,
}

impl AssetCache {
    pub fn new(store: Rc<dyn AssetStore>) -> Self {
        Self {
            store,
            memory: RefCell::new(HashMap::new()),
        }
    }

    /// Memory-only lookup
    pub fn peek(&self, ns: Namespace, key: &str) -> Option<String> {
        self.memory.borrow().get(&ns).and_then(|m| m.get(key)).cloned()
    }

    fn remember(&self, ns: Namespace, key: &str, payload: &str) {
        self.memory
            .borrow_mut()
            .entry(ns)
            .or_default()
            .insert(key.to_string(), payload.to_string());
    }

    /// Memory, then store. `None` on a miss or an unavailable store.
    pub async fn get(&self, ns: Namespace, key: &str) -> Option<String> {
        if let Some(hit) = self.peek(ns, key) {
            log::debug!("Memory cache hit [{}] {}", ns, key);
            return Some(hit);
        }
        match self.store.get(ns, key).await {
            Ok(Some(payload)) => {
                self.remember(ns, key, &payload);
                Some(payload)
            }
            Ok(None) => None,
            Err(e) => {
                log::debug!("Store read [{}] {} treated as miss: {}", ns, key, e);
                None
            }
        }
    }

    /// Write to memory and store. Returns whether the store accepted the write;
    /// the memory layer is filled either way.
    pub async fn put(&self, ns: Namespace, key: &str, payload: &str) -> bool {
        self.remember(ns, key, payload);
        match self.store.put(ns, key, payload).await {
            Ok(()) => true,
            Err(e) => {
                log::warn!("Store write [{}] {} failed: {}", ns, key, e);
                false
            }
        }
    }

    /// All persisted records of a namespace; empty when the store is unavailable.
    pub async fn get_all(&self, ns: Namespace) -> Vec<AssetRecord> {
        match self.store.get_all(ns).await {
            Ok(records) => records,
            Err(e) => {
                log::warn!("Store scan [{}] failed: {}", ns, e);
                Vec::new()
            }
        }
    }

    /// Number of entries held in memory for a namespace
    pub fn memory_len(&self, ns: Namespace) -> usize {
        self.memory.borrow().get(&ns).map(|m| m.len()).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::FsAssetStore;

    #[tokio::test]
    async fn store_hit_fills_memory() {
        let dir = tempfile::tempdir().unwrap();
        let store = Rc::new(FsAssetStore::new(dir.path(), 2));
        store.put(Namespace::FontData, "f", "payload").await.unwrap();

        let cache = AssetCache::new(store);
        assert!(cache.peek(Namespace::FontData, "f").is_none());
        assert_eq!(cache.get(Namespace::FontData, "f").await.as_deref(), Some("payload"));
        assert_eq!(cache.peek(Namespace::FontData, "f").as_deref(), Some("payload"));
        assert_eq!(cache.memory_len(Namespace::ImageData), 0);
    }

    #[tokio::test]
    async fn unavailable_store_still_serves_memory() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let cache = AssetCache::new(Rc::new(FsAssetStore::new(file.path(), 2)));

        assert!(cache.get(Namespace::ImageData, "i").await.is_none());
        assert!(!cache.put(Namespace::ImageData, "i", "data:image/png;base64,AA").await);
        assert_eq!(cache.get(Namespace::ImageData, "i").await.as_deref(), Some("data:image/png;base64,AA"));
        assert!(cache.get_all(Namespace::ImageData).await.is_empty());
    }
}
