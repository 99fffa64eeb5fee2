// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Completed-activity store.
//!
//! Activities live in a concurrent map. When opened with a path, every write
//! is flushed to a JSON file (written to a temp file, then renamed), and the
//! file is loaded again on the next start.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::error::AppError;
use crate::models::{ActivityStats, ActivityType, CompletedActivity};

/// Upper bound on activities returned by one listing.
pub const MAX_LIST_LIMIT: usize = 100;

/// Listing filter.
#[derive(Debug, Clone, Default)]
pub struct ActivityFilter {
    pub activity_type: Option<ActivityType>,
    /// Only activities starting strictly after this time
    pub after: Option<DateTime<Utc>>,
    /// Defaults to, and is capped at, `MAX_LIST_LIMIT`
    pub limit: Option<usize>,
}

/// Activity database.
#[derive(Clone, Default)]
pub struct ActivityDb {
    activities: Arc<DashMap<String, CompletedActivity>>,
    path: Option<PathBuf>,
    /// Serializes writers so a failed flush can be rolled back
    write_lock: Arc<Mutex<()>>,
}

impl ActivityDb {
    /// Store that keeps everything in memory.
    pub fn new_in_memory() -> Self {
        Self::default()
    }

    /// Store backed by a JSON file. A missing file starts an empty store.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, AppError> {
        let path = path.as_ref().to_path_buf();
        let activities = DashMap::new();

        match tokio::fs::read_to_string(&path).await {
            Ok(json) => {
                let stored: Vec<CompletedActivity> = serde_json::from_str(&json).map_err(|e| {
                    AppError::Database(format!("Corrupt activity file {}: {e}", path.display()))
                })?;
                for activity in stored {
                    activities.insert(activity.id.clone(), activity);
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(AppError::Database(format!(
                    "Failed to read {}: {e}",
                    path.display()
                )))
            }
        }

        tracing::info!(path = %path.display(), count = activities.len(), "Opened activity store");

        Ok(Self {
            activities: Arc::new(activities),
            path: Some(path),
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    /// Insert or replace an activity. Returns true if it was new.
    ///
    /// On error the store is left as it was before the call.
    pub async fn save(&self, activity: &CompletedActivity) -> Result<bool, AppError> {
        let _guard = self.write_lock.lock().await;
        let previous = self
            .activities
            .insert(activity.id.clone(), activity.clone());
        let was_new = previous.is_none();

        if let Err(e) = self.flush().await {
            match previous {
                Some(previous) => {
                    self.activities.insert(activity.id.clone(), previous);
                }
                None => {
                    self.activities.remove(&activity.id);
                }
            }
            return Err(e);
        }

        tracing::info!(
            activity_id = %activity.id,
            activity_type = %activity.activity_type,
            distance_km = activity.distance_km,
            was_new,
            "Activity saved"
        );
        Ok(was_new)
    }

    /// Delete an activity. Returns true if it existed.
    ///
    /// On error the activity is still stored.
    pub async fn delete(&self, activity_id: &str) -> Result<bool, AppError> {
        let _guard = self.write_lock.lock().await;
        let Some((id, removed)) = self.activities.remove(activity_id) else {
            return Ok(false);
        };

        if let Err(e) = self.flush().await {
            self.activities.insert(id, removed);
            return Err(e);
        }

        tracing::info!(activity_id, "Activity deleted");
        Ok(true)
    }

    pub async fn get_by_id(&self, activity_id: &str) -> Result<Option<CompletedActivity>, AppError> {
        Ok(self
            .activities
            .get(activity_id)
            .map(|entry| entry.value().clone()))
    }

    /// Activities matching the filter, newest first.
    pub async fn list(&self, filter: &ActivityFilter) -> Result<Vec<CompletedActivity>, AppError> {
        let limit = filter.limit.unwrap_or(MAX_LIST_LIMIT).min(MAX_LIST_LIMIT);
        let mut activities: Vec<CompletedActivity> = self
            .activities
            .iter()
            .filter(|entry| {
                let activity = entry.value();
                filter
                    .activity_type
                    .as_ref()
                    .is_none_or(|t| &activity.activity_type == t)
                    && filter.after.is_none_or(|after| activity.timestamp > after)
            })
            .map(|entry| entry.value().clone())
            .collect();

        activities.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then_with(|| a.id.cmp(&b.id)));
        activities.truncate(limit);
        Ok(activities)
    }

    /// Aggregate statistics over every stored activity.
    pub async fn stats(&self) -> Result<ActivityStats, AppError> {
        let mut stats = ActivityStats::default();
        for entry in self.activities.iter() {
            stats.add(entry.value());
        }
        Ok(stats)
    }

    pub fn len(&self) -> usize {
        self.activities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.activities.is_empty()
    }

    /// Write the whole map to disk. Callers hold `write_lock`.
    async fn flush(&self) -> Result<(), AppError> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let mut snapshot: Vec<CompletedActivity> = self
            .activities
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        snapshot.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then_with(|| a.id.cmp(&b.id)));

        let json = serde_json::to_vec_pretty(&snapshot)
            .map_err(|e| AppError::Database(format!("Failed to serialize activities: {e}")))?;

        let tmp_path = path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, json).await.map_err(|e| {
            AppError::Database(format!("Failed to write {}: {e}", tmp_path.display()))
        })?;
        tokio::fs::rename(&tmp_path, path).await.map_err(|e| {
            AppError::Database(format!("Failed to replace {}: {e}", path.display()))
        })?;
        Ok(())
    }
}
