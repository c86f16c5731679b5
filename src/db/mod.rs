// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Durable key-value record storage.

pub mod file;
pub mod memory;
pub mod presence;

pub use file::FileStore;
pub use memory::MemoryStore;
pub use presence::PresenceDb;

use serde_json::Value;

/// Raw keyed record storage. Values are JSON documents.
pub trait PresenceStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Value>, StoreError>;

    fn put(&self, key: &str, value: Value) -> Result<(), StoreError>;

    /// All keys beginning with `prefix`, in ascending order.
    fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, StoreError>;
}

/// Storage errors.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Storage I/O error: {0}")]
    Io(String),

    #[error("Failed to (de)serialize record {key}: {message}")]
    Serialization { key: String, message: String },
}

/// Record key layout.
pub mod keys {
    use chrono::NaiveDate;

    pub const CONSENT: &str = "location_consent";
    pub const LOCATION_HISTORY: &str = "location_history";
    pub const DAILY_ACTIVITY: &str = "daily_activity";
    pub const MEETINGS: &str = "meetings";

    pub fn consent(subject_id: &str) -> String {
        format!("{}/{}", CONSENT, subject_id)
    }

    pub fn location_history(subject_id: &str) -> String {
        format!("{}/{}", LOCATION_HISTORY, subject_id)
    }

    pub fn daily_activity(subject_id: &str, day: NaiveDate) -> String {
        format!("{}/{}/{}", DAILY_ACTIVITY, subject_id, day.format("%Y-%m-%d"))
    }

    pub fn meeting(meeting_id: &str) -> String {
        format!("{}/{}", MEETINGS, meeting_id)
    }

    pub fn meetings_prefix() -> String {
        format!("{}/", MEETINGS)
    }
}
