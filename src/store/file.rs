// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! File-backed token store with write-through persistence.

use crate::store::TokenStore;
use dashmap::DashMap;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Store backed by a JSON file on disk.
///
/// All reads are served from memory; writes go through to the file. An
/// unreadable or missing file starts the store empty, and write failures are
/// logged and dropped, matching the trait's no-failure-mode contract.
pub struct FileStore {
    path: PathBuf,
    entries: DashMap<String, String>,
}

impl FileStore {
    /// Open (or create) a store at the given path.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = DashMap::new();

        match std::fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str::<BTreeMap<String, String>>(&raw) {
                Ok(map) => {
                    for (key, value) in map {
                        entries.insert(key, value);
                    }
                }
                Err(err) => {
                    tracing::warn!(
                        error = %err,
                        path = %path.display(),
                        "session file corrupt, starting empty"
                    );
                }
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => {
                tracing::warn!(
                    error = %err,
                    path = %path.display(),
                    "session file unreadable, starting empty"
                );
            }
        }

        Self { path, entries }
    }

    fn persist(&self) {
        let map: BTreeMap<String, String> = self
            .entries
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();

        let json = match serde_json::to_string_pretty(&map) {
            Ok(json) => json,
            Err(err) => {
                tracing::warn!(error = %err, "failed to serialize session file");
                return;
            }
        };

        if let Err(err) = std::fs::write(&self.path, json) {
            tracing::warn!(
                error = %err,
                path = %self.path.display(),
                "failed to write session file"
            );
        }
    }
}

impl TokenStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).map(|v| v.value().clone())
    }

    fn set(&self, key: &str, value: &str) {
        self.entries.insert(key.to_string(), value.to_string());
        self.persist();
    }

    fn remove(&self, key: &str) {
        self.entries.remove(key);
        self.persist();
    }
}
