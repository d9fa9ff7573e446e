//! Box records and the JSON-backed record store.
//!
//! A box is one physical storage container: photo, short code, location
//! label and a list of item tags. The embedding of the item text is kept
//! on the record itself as a plain `Vec<f32>` so the database stays a
//! portable flat JSON file.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use crate::codes::BoxId;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoxRecord {
    pub id: BoxId,

    /// Short human-typable code, uppercase, unique across the store.
    pub code: String,

    /// Creation time, milliseconds since epoch. Default ordering key.
    pub created_at: i64,

    pub location: String,

    #[serde(default)]
    pub items: Vec<String>,

    /// Semantic encoding of the item text. Absent when the box has no
    /// items or embedding generation failed at save time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,

    /// Hash of the item text the embedding was generated from, used to
    /// skip re-embedding when an edit didn't change the text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items_hash: Option<u64>,

    /// Identifier of the photo blob in the uploads store.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_id: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct BoxCreate {
    pub location: String,
    pub items: Vec<String>,
    pub image: Option<Vec<u8>>,
}

#[derive(Debug, Clone, Default)]
pub struct BoxUpdate {
    pub location: Option<String>,
    pub items: Option<Vec<String>>,
    pub image: Option<Vec<u8>>,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed box database: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("box code '{0}' already exists")]
    CodeConflict(String),
}

/// Keyed record storage with the two secondary lookups the app needs:
/// by code and by recency. Callers never touch the indices directly.
pub trait RecordManager: Send + Sync {
    /// Insert-or-replace keyed by id. Rejects a new record whose code is
    /// already taken by a different box.
    fn put(&self, record: BoxRecord) -> Result<(), StoreError>;
    fn get(&self, id: &BoxId) -> Result<Option<BoxRecord>, StoreError>;
    /// Exact code lookup; codes are stored uppercase.
    fn get_by_code(&self, code: &str) -> Result<Option<BoxRecord>, StoreError>;
    /// Every record, newest first.
    fn list_all(&self) -> Result<Vec<BoxRecord>, StoreError>;
    /// Idempotent: deleting an absent record is not an error.
    fn delete(&self, id: &BoxId) -> Result<(), StoreError>;
    fn total(&self) -> Result<usize, StoreError>;
}

/// Flat JSON file backend. The whole record list lives in memory behind
/// an `RwLock`; every mutation rewrites `boxes.json` atomically, so a
/// crash mid-write leaves the previous file intact.
pub struct BackendJson {
    list: RwLock<Vec<BoxRecord>>,
    path: PathBuf,
}

impl BackendJson {
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();

        let raw = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                log::info!("Creating new box database at {}", path.display());
                b"[]".to_vec()
            }
            Err(err) => return Err(err.into()),
        };

        let list: Vec<BoxRecord> = serde_json::from_slice(&raw)?;

        Ok(BackendJson {
            list: RwLock::new(list),
            path,
        })
    }

    fn save(&self, list: &[BoxRecord]) -> Result<(), StoreError> {
        let data = serde_json::to_vec_pretty(list)?;
        let temp_path = temp_sibling(&self.path);
        std::fs::write(&temp_path, data)?;
        std::fs::rename(&temp_path, &self.path)?;
        Ok(())
    }
}

fn temp_sibling(path: &Path) -> PathBuf {
    path.with_extension(format!("tmp-{}", std::process::id()))
}

impl RecordManager for BackendJson {
    fn put(&self, record: BoxRecord) -> Result<(), StoreError> {
        let mut list = self.list.write().unwrap();

        if list
            .iter()
            .any(|b| b.code == record.code && b.id != record.id)
        {
            return Err(StoreError::CodeConflict(record.code));
        }

        match list.iter_mut().find(|b| b.id == record.id) {
            Some(existing) => *existing = record,
            None => list.push(record),
        }

        self.save(&list)
    }

    fn get(&self, id: &BoxId) -> Result<Option<BoxRecord>, StoreError> {
        let list = self.list.read().unwrap();
        Ok(list.iter().find(|b| &b.id == id).cloned())
    }

    fn get_by_code(&self, code: &str) -> Result<Option<BoxRecord>, StoreError> {
        let list = self.list.read().unwrap();
        Ok(list.iter().find(|b| b.code == code).cloned())
    }

    fn list_all(&self) -> Result<Vec<BoxRecord>, StoreError> {
        let list = self.list.read().unwrap();
        let mut all = list.clone();
        // stable sort keeps insertion order for identical timestamps
        all.sort_by_key(|b| Reverse(b.created_at));
        Ok(all)
    }

    fn delete(&self, id: &BoxId) -> Result<(), StoreError> {
        let mut list = self.list.write().unwrap();
        let before = list.len();
        list.retain(|b| &b.id != id);

        if list.len() == before {
            return Ok(());
        }

        self.save(&list)
    }

    fn total(&self) -> Result<usize, StoreError> {
        Ok(self.list.read().unwrap().len())
    }
}

impl BoxRecord {
    pub fn new(code: String, location: String, items: Vec<String>) -> Self {
        BoxRecord {
            id: BoxId::new(),
            code,
            created_at: Utc::now().timestamp_millis(),
            location,
            items,
            embedding: None,
            items_hash: None,
            image_id: None,
        }
    }
}
