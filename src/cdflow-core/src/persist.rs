//! Durable key-value storage for the store's state blob.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::Debug;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use crate::error::StorageError;
use crate::model::DebateRound;

/// Everything the store persists, written as one JSON object under one key.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PersistedState {
    pub current_debate: Option<DebateRound>,
    #[serde(default)]
    pub saved_debates: Vec<DebateRound>,
    #[serde(default)]
    pub ui: UiFlags,
}

/// View toggles that survive restarts alongside the round data.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UiFlags {
    pub show_links: bool,
    pub show_summary: bool,
    pub compact_view: bool,
}

impl Default for UiFlags {
    fn default() -> Self {
        Self {
            show_links: true,
            show_summary: false,
            compact_view: false,
        }
    }
}

/// A named boolean in [`UiFlags`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiFlag {
    ShowLinks,
    ShowSummary,
    CompactView,
}

impl UiFlags {
    pub fn set(&mut self, flag: UiFlag, value: bool) {
        match flag {
            UiFlag::ShowLinks => self.show_links = value,
            UiFlag::ShowSummary => self.show_summary = value,
            UiFlag::CompactView => self.compact_view = value,
        }
    }

    pub fn get(&self, flag: UiFlag) -> bool {
        match flag {
            UiFlag::ShowLinks => self.show_links,
            UiFlag::ShowSummary => self.show_summary,
            UiFlag::CompactView => self.compact_view,
        }
    }
}

/// Durable storage of JSON values under string keys.
pub trait StateStorage: Send + Sync + Debug {
    /// Get the backend name
    fn name(&self) -> &str;

    fn set_value(&self, key: &str, value: serde_json::Value) -> Result<(), StorageError>;

    fn get_value(&self, key: &str) -> Result<Option<serde_json::Value>, StorageError>;

    /// Returns whether anything was removed.
    fn delete(&self, key: &str) -> Result<bool, StorageError>;
}

/// Typed access on top of [`StateStorage`].
pub trait StorageExt {
    fn set<T: Serialize>(&self, key: &str, value: &T) -> Result<(), StorageError>;
    fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StorageError>;
}

impl<S: StateStorage + ?Sized> StorageExt for S {
    fn set<T: Serialize>(&self, key: &str, value: &T) -> Result<(), StorageError> {
        let json = serde_json::to_value(value)?;
        self.set_value(key, json)
    }

    fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StorageError> {
        match self.get_value(key)? {
            Some(json) => Ok(Some(serde_json::from_value(json)?)),
            None => Ok(None),
        }
    }
}

/// In-memory storage (for tests and throwaway sessions).
#[derive(Debug, Default)]
pub struct MemoryStorage {
    data: RwLock<HashMap<String, serde_json::Value>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StateStorage for MemoryStorage {
    fn name(&self) -> &str {
        "memory"
    }

    fn set_value(&self, key: &str, value: serde_json::Value) -> Result<(), StorageError> {
        let mut data = self.data.write().unwrap_or_else(|e| e.into_inner());
        data.insert(key.to_string(), value);
        Ok(())
    }

    fn get_value(&self, key: &str) -> Result<Option<serde_json::Value>, StorageError> {
        let data = self.data.read().unwrap_or_else(|e| e.into_inner());
        Ok(data.get(key).cloned())
    }

    fn delete(&self, key: &str) -> Result<bool, StorageError> {
        let mut data = self.data.write().unwrap_or_else(|e| e.into_inner());
        Ok(data.remove(key).is_some())
    }
}

/// One pretty-printed JSON file per key inside a directory.
#[derive(Debug, Clone)]
pub struct JsonFileStorage {
    dir: PathBuf,
}

impl JsonFileStorage {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        let safe: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.dir.join(format!("{}.json", safe))
    }
}

impl StateStorage for JsonFileStorage {
    fn name(&self) -> &str {
        "json-file"
    }

    fn set_value(&self, key: &str, value: serde_json::Value) -> Result<(), StorageError> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(&value)?)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn get_value(&self, key: &str) -> Result<Option<serde_json::Value>, StorageError> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }
        let bytes = fs::read(&path)?;
        Ok(Some(serde_json::from_slice(&bytes)?))
    }

    fn delete(&self, key: &str) -> Result<bool, StorageError> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(false);
        }
        fs::remove_file(path)?;
        Ok(true)
    }
}
