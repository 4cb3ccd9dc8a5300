//! Resource fetching through memory, store and a real HTTP backend

mod common;

use common::start_server;
use pretty_assertions::assert_eq;
use rangeshot::fetch::{HttpFetcher, ResourceFetcher};
use rangeshot::store::{AssetCache, AssetStore, FsAssetStore, Namespace};
use std::rc::Rc;

fn fetcher(store: Rc<dyn AssetStore>, base: &str) -> ResourceFetcher {
    let cache = Rc::new(AssetCache::new(store));
    ResourceFetcher::new(cache, Rc::new(HttpFetcher::new().unwrap()), &format!("{}/chat/", base)).unwrap()
}

#[tokio::test]
async fn second_lookup_is_served_from_memory() {
    let server = start_server(vec![("/fonts/a.woff2", "font/woff2", b"wOF2-data".to_vec())]);
    let dir = tempfile::tempdir().unwrap();
    let rf = fetcher(Rc::new(FsAssetStore::new(dir.path(), 2)), &server.base);

    let url = format!("{}/fonts/a.woff2", server.base);
    let first = rf.font_data_url(&url).await.unwrap();
    assert_eq!(first, "data:font/woff2;base64,d09GMi1kYXRh");
    let second = rf.font_data_url(&url).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(server.hits(), 1);
}

#[tokio::test]
async fn cached_payloads_survive_a_new_session() {
    let server = start_server(vec![("/img/avatar.png", "image/png", vec![137, 80, 78, 71])]);
    let dir = tempfile::tempdir().unwrap();

    let first = {
        let rf = fetcher(Rc::new(FsAssetStore::new(dir.path(), 2)), &server.base);
        rf.image_data_url("../img/avatar.png").await.unwrap()
    };

    let rf = fetcher(Rc::new(FsAssetStore::new(dir.path(), 2)), &server.base);
    let url = format!("{}/img/avatar.png", server.base);
    assert_eq!(rf.image_data_url(&url).await.unwrap(), first);
    assert_eq!(server.hits(), 1);
    assert_eq!(rf.cache().memory_len(Namespace::ImageData), 1);
}

#[tokio::test]
async fn unavailable_store_still_fetches_once() {
    let server = start_server(vec![("/fonts/b.woff", "font/woff", b"woff".to_vec())]);
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("not-a-dir");
    std::fs::write(&blocker, "file in the way").unwrap();
    let rf = fetcher(Rc::new(FsAssetStore::new(&blocker, 2)), &server.base);

    let url = format!("{}/fonts/b.woff", server.base);
    let first = rf.font_data_url(&url).await.unwrap();
    let second = rf.font_data_url(&url).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(server.hits(), 1);
}

#[tokio::test]
async fn failures_are_absorbed_and_not_cached() {
    let server = start_server(Vec::new());
    let dir = tempfile::tempdir().unwrap();
    let rf = fetcher(Rc::new(FsAssetStore::new(dir.path(), 2)), &server.base);

    let url = format!("{}/fonts/gone.woff2", server.base);
    assert_eq!(rf.font_data_url(&url).await, None);
    assert_eq!(rf.font_data_url(&url).await, None);
    assert_eq!(server.hits(), 2);

    assert_eq!(rf.font_data_url("http://127.0.0.1:1/refused.woff2").await, None);
    assert!(rf.cache().get_all(Namespace::FontData).await.is_empty());
}

#[tokio::test]
async fn store_namespaces_are_independent() {
    let dir = tempfile::tempdir().unwrap();
    let store = FsAssetStore::new(dir.path(), 2);
    store.put(Namespace::FontData, "k", "font").await.unwrap();
    store.put(Namespace::ImageData, "k", "image").await.unwrap();

    assert_eq!(store.get(Namespace::FontData, "k").await.unwrap().as_deref(), Some("font"));
    assert_eq!(store.get(Namespace::ImageData, "k").await.unwrap().as_deref(), Some("image"));
    assert_eq!(store.get(Namespace::FontMappings, "k").await.unwrap(), None);
}
