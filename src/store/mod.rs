// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Client-side persistence for the session fields.
//!
//! A store is a plain key-value surface with no failure modes: unavailable
//! storage reads as `None` and failed writes are logged and dropped, so the
//! session layer never has to branch on storage errors.

pub mod file;

pub use file::FileStore;

use dashmap::DashMap;

/// Storage keys for the persisted session fields.
pub mod keys {
    pub const ACCESS_TOKEN: &str = "access_token";
    pub const REFRESH_TOKEN: &str = "refresh_token";
    /// Absolute expiry as epoch millis, string-encoded
    pub const EXPIRES_AT: &str = "access_token_expires_at";
    /// JSON-serialized normalized profile
    pub const CURRENT_USER: &str = "current_user";
}

/// Key-value persistence for session fields.
pub trait TokenStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str);
    fn remove(&self, key: &str);
}

/// In-memory store (default; sessions do not survive the process).
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: DashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TokenStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).map(|v| v.value().clone())
    }

    fn set(&self, key: &str, value: &str) {
        self.entries.insert(key.to_string(), value.to_string());
    }

    fn remove(&self, key: &str) {
        self.entries.remove(key);
    }
}
