// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! File-backed record store.
//!
//! The whole store is one JSON object on disk. Reads are served from memory;
//! every write rewrites the file via a temporary file and an atomic rename.

use crate::db::{PresenceStore, StoreError};
use dashmap::DashMap;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Durable store persisted to a single JSON file.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: DashMap<String, Value>,
    write_lock: Mutex<()>,
}

impl FileStore {
    /// Open the store at `path`, loading existing records if the file exists.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let entries = DashMap::new();

        if path.exists() {
            let data = fs::read_to_string(&path).map_err(|e| StoreError::Io(e.to_string()))?;
            if !data.trim().is_empty() {
                let map: Map<String, Value> =
                    serde_json::from_str(&data).map_err(|e| StoreError::Serialization {
                        key: path.display().to_string(),
                        message: e.to_string(),
                    })?;
                for (key, value) in map {
                    entries.insert(key, value);
                }
            }
        } else if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| StoreError::Io(e.to_string()))?;
            }
        }

        tracing::info!(path = %path.display(), records = entries.len(), "Opened record store");

        Ok(Self {
            path,
            entries,
            write_lock: Mutex::new(()),
        })
    }

    fn flush(&self) -> Result<(), StoreError> {
        let snapshot: BTreeMap<String, Value> = self
            .entries
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();

        let data = serde_json::to_vec_pretty(&snapshot).map_err(|e| StoreError::Serialization {
            key: self.path.display().to_string(),
            message: e.to_string(),
        })?;

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, data).map_err(|e| StoreError::Io(e.to_string()))?;
        fs::rename(&tmp, &self.path).map_err(|e| StoreError::Io(e.to_string()))?;
        Ok(())
    }
}

impl PresenceStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.entries.get(key).map(|entry| entry.value().clone()))
    }

    fn put(&self, key: &str, value: Value) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        let previous = self.entries.insert(key.to_string(), value);
        if let Err(err) = self.flush() {
            // Memory must not run ahead of the file
            match previous {
                Some(old) => self.entries.insert(key.to_string(), old),
                None => self.entries.remove(key).map(|(_, v)| v),
            };
            tracing::error!(key, error = %err, "Record store write failed; rolled back");
            return Err(err);
        }
        Ok(())
    }

    fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        let mut keys: Vec<String> = self
            .entries
            .iter()
            .filter(|entry| entry.key().starts_with(prefix))
            .map(|entry| entry.key().clone())
            .collect();
        keys.sort();
        Ok(keys)
    }
}
