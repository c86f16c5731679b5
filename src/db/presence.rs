// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Typed record operations on top of a [`PresenceStore`].
//!
//! Provides high-level operations for:
//! - Consent (one record per subject)
//! - Location history (capped list per subject, newest last)
//! - Daily activity records (one per subject and day)
//! - Meetings (one record per meeting)

use crate::db::{keys, MemoryStore, PresenceStore, StoreError};
use crate::models::{ConsentRecord, DailyActivityRecord, LocationSample, Meeting};
use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;

/// Typed database handle. Cheap to clone.
#[derive(Clone)]
pub struct PresenceDb {
    store: Arc<dyn PresenceStore>,
}

impl PresenceDb {
    pub fn new(store: Arc<dyn PresenceStore>) -> Self {
        Self { store }
    }

    /// Create a database backed by a fresh in-memory store.
    pub fn new_in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    fn get_obj<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StoreError> {
        match self.store.get(key)? {
            Some(value) => serde_json::from_value(value)
                .map(Some)
                .map_err(|e| StoreError::Serialization {
                    key: key.to_string(),
                    message: e.to_string(),
                }),
            None => Ok(None),
        }
    }

    fn put_obj<T: Serialize>(&self, key: &str, obj: &T) -> Result<(), StoreError> {
        let value = serde_json::to_value(obj).map_err(|e| StoreError::Serialization {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        self.store.put(key, value)
    }

    // ─── Consent ─────────────────────────────────────────────────

    pub fn get_consent(&self, subject_id: &str) -> Result<Option<ConsentRecord>, StoreError> {
        self.get_obj(&keys::consent(subject_id))
    }

    pub fn set_consent(&self, subject_id: &str, consent: &ConsentRecord) -> Result<(), StoreError> {
        self.put_obj(&keys::consent(subject_id), consent)
    }

    // ─── Location History ────────────────────────────────────────

    /// Append a sample, evicting the oldest entries beyond `cap`.
    pub fn append_location(&self, sample: &LocationSample, cap: usize) -> Result<(), StoreError> {
        let key = keys::location_history(&sample.subject_id);
        let mut history: Vec<LocationSample> = self.get_obj(&key)?.unwrap_or_default();
        history.push(sample.clone());
        if history.len() > cap {
            let excess = history.len() - cap;
            history.drain(..excess);
        }
        self.put_obj(&key, &history)
    }

    /// Stored samples, oldest first.
    pub fn location_history(&self, subject_id: &str) -> Result<Vec<LocationSample>, StoreError> {
        Ok(self
            .get_obj(&keys::location_history(subject_id))?
            .unwrap_or_default())
    }

    // ─── Daily Activity ──────────────────────────────────────────

    pub fn get_daily_record(
        &self,
        subject_id: &str,
        day: NaiveDate,
    ) -> Result<Option<DailyActivityRecord>, StoreError> {
        self.get_obj(&keys::daily_activity(subject_id, day))
    }

    pub fn set_daily_record(&self, record: &DailyActivityRecord) -> Result<(), StoreError> {
        self.put_obj(
            &keys::daily_activity(&record.subject_id, record.day),
            record,
        )
    }

    // ─── Meetings ────────────────────────────────────────────────

    pub fn get_meeting(&self, meeting_id: &str) -> Result<Option<Meeting>, StoreError> {
        self.get_obj(&keys::meeting(meeting_id))
    }

    pub fn set_meeting(&self, meeting: &Meeting) -> Result<(), StoreError> {
        self.put_obj(&keys::meeting(&meeting.meeting_id), meeting)
    }

    /// All meetings of a subject, ordered by scheduled time.
    pub fn list_meetings(&self, subject_id: &str) -> Result<Vec<Meeting>, StoreError> {
        let mut meetings = Vec::new();
        for key in self.store.keys_with_prefix(&keys::meetings_prefix())? {
            if let Some(meeting) = self.get_obj::<Meeting>(&key)? {
                if meeting.subject_id == subject_id {
                    meetings.push(meeting);
                }
            }
        }
        meetings.sort_by_key(|m| m.scheduled_at);
        Ok(meetings)
    }
}
