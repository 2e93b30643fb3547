//! Shared helpers for update engine integration tests.
#![allow(dead_code)]

use async_trait::async_trait;
use lectio_delta::UpdateManifest;
use lectio_store::LocalStore;
use lectio_updates::{ManifestSource, UpdateError, UpdateResult};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Notify;

pub const JOHN_3_16_FIXED: &str = "For God so loved the world";

/// In-memory store at `version` holding a misspelled John 3:16.
pub fn seeded_store(version: i64) -> LocalStore {
    let store = LocalStore::open_in_memory().unwrap();
    store.set_data_version(version).unwrap();
    store
        .lock_conn()
        .execute(
            "INSERT INTO bible_verses (id, book_id, chapter, verse, text) VALUES (26137, 43, 3, 16, 'For God so loved the wrold')",
            [],
        )
        .unwrap();
    store
}

pub fn verse_text(store: &LocalStore) -> String {
    store
        .lock_conn()
        .query_row(
            "SELECT text FROM bible_verses WHERE book_id = 43 AND chapter = 3 AND verse = 16",
            [],
            |row| row.get(0),
        )
        .unwrap()
}

pub fn john_manifest_json(from: i64, to: i64) -> serde_json::Value {
    serde_json::json!({
        "fromVersion": from,
        "latestVersion": to,
        "hasUpdates": true,
        "description": "Fix typo in John 3:16",
        "changes": [{
            "table": "bible_verses",
            "operation": "update",
            "where": { "book_id": 43, "chapter": 3, "verse": 16 },
            "data": { "text": JOHN_3_16_FIXED }
        }]
    })
}

pub fn john_manifest(from: i64, to: i64) -> UpdateManifest {
    serde_json::from_value(john_manifest_json(from, to)).unwrap()
}

/// Source answering every fetch with the same manifest (or a network error
/// when none is set), counting calls.
#[derive(Default)]
pub struct MockSource {
    manifest: Mutex<Option<UpdateManifest>>,
    calls: AtomicUsize,
    tokens: Mutex<Vec<Option<String>>>,
}

impl MockSource {
    pub fn serving(manifest: UpdateManifest) -> Self {
        Self {
            manifest: Mutex::new(Some(manifest)),
            ..Default::default()
        }
    }

    pub fn failing() -> Self {
        Self::default()
    }

    pub fn set_manifest(&self, manifest: UpdateManifest) {
        *self.manifest.lock().unwrap() = Some(manifest);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn tokens(&self) -> Vec<Option<String>> {
        self.tokens.lock().unwrap().clone()
    }
}

#[async_trait]
impl ManifestSource for MockSource {
    async fn fetch_manifest(
        &self,
        _current_version: i64,
        auth_token: Option<&str>,
    ) -> UpdateResult<UpdateManifest> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.tokens
            .lock()
            .unwrap()
            .push(auth_token.map(str::to_string));
        self.manifest
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| UpdateError::Network("503 Service Unavailable".into()))
    }
}

/// Source that blocks inside `fetch_manifest` until released, then answers
/// with its manifest or "up to date".
#[derive(Default)]
pub struct GatedSource {
    pub entered: Notify,
    pub release: Notify,
    manifest: Option<UpdateManifest>,
}

impl GatedSource {
    pub fn serving(manifest: UpdateManifest) -> Self {
        Self {
            manifest: Some(manifest),
            ..Default::default()
        }
    }
}

#[async_trait]
impl ManifestSource for GatedSource {
    async fn fetch_manifest(
        &self,
        current_version: i64,
        _auth_token: Option<&str>,
    ) -> UpdateResult<UpdateManifest> {
        self.entered.notify_one();
        self.release.notified().await;
        Ok(self
            .manifest
            .clone()
            .unwrap_or_else(|| UpdateManifest::up_to_date(current_version)))
    }
}
