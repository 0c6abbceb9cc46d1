// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Journey persistence with atomic single-writer semantics.

use nuxie_core::{CampaignId, DistinctId, ExitReason, Journey, JourneyId, JourneyStatus};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::OwnedMutexGuard;

/// Errors from journey persistence.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("corrupt record at {path}: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl StoreError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        StoreError::Io { path: path.to_path_buf(), source }
    }
}

/// Manifest entry: enough of a journey to answer index queries
/// (per-user listing, resume rehydration, frequency accounting) without
/// loading the blob.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JourneySummary {
    pub journey_id: JourneyId,
    pub campaign_id: CampaignId,
    pub distinct_id: DistinctId,
    pub status: JourneyStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resume_at_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_reason: Option<ExitReason>,
    #[serde(default)]
    pub goal_reached: bool,
    pub created_at_ms: u64,
}

impl From<&Journey> for JourneySummary {
    fn from(journey: &Journey) -> Self {
        Self {
            journey_id: journey.id,
            campaign_id: journey.campaign_id,
            distinct_id: journey.distinct_id.clone(),
            status: journey.status,
            resume_at_ms: journey.resume_at_ms,
            exit_reason: journey.exit_reason,
            goal_reached: journey.goal_reached,
            created_at_ms: journey.created_at_ms,
        }
    }
}

impl JourneySummary {
    pub fn is_converted(&self) -> bool {
        self.goal_reached || self.exit_reason == Some(ExitReason::Converted)
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Manifest {
    entries: HashMap<JourneyId, JourneySummary>,
}

/// Durable per-journey state with per-journey exclusive locks.
///
/// The store owns the canonical record; the executor borrows it for one
/// advance under the lock returned by [`JourneyStore::lock`]. Scheduler
/// and router indexes hold only ids and replay the canonical record on
/// wake-up.
pub struct JourneyStore {
    root: PathBuf,
    manifest: Mutex<Manifest>,
    locks: Mutex<HashMap<JourneyId, Arc<tokio::sync::Mutex<()>>>>,
}

impl JourneyStore {
    /// Open (or create) a store rooted at `root`. A missing or
    /// unreadable manifest is rebuilt from the journey blobs.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        let journeys_dir = root.join("journeys");
        fs::create_dir_all(&journeys_dir).map_err(|e| StoreError::io(&journeys_dir, e))?;

        let manifest_path = root.join("manifest.json");
        let manifest = match fs::read(&manifest_path) {
            Ok(bytes) => match serde_json::from_slice::<Manifest>(&bytes) {
                Ok(manifest) => manifest,
                Err(e) => {
                    tracing::warn!(error = %e, "manifest unreadable, rebuilding from blobs");
                    rebuild_manifest(&journeys_dir)?
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                rebuild_manifest(&journeys_dir)?
            }
            Err(e) => return Err(StoreError::io(&manifest_path, e)),
        };

        tracing::info!(
            root = %root.display(),
            journeys = manifest.entries.len(),
            "journey store opened"
        );

        Ok(Self { root, manifest: Mutex::new(manifest), locks: Mutex::new(HashMap::new()) })
    }

    /// Acquire the per-journey exclusive lock. The guard is owned so it
    /// can be held across awaits; dropping it releases the lock.
    pub async fn lock(&self, journey_id: JourneyId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock();
            Arc::clone(locks.entry(journey_id).or_default())
        };
        lock.lock_owned().await
    }

    /// Load the canonical record. `None` when the journey was never
    /// persisted (or was pruned).
    pub fn load(&self, journey_id: JourneyId) -> Result<Option<Journey>, StoreError> {
        let path = self.blob_path(journey_id);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StoreError::io(&path, e)),
        };
        let journey =
            serde_json::from_slice(&bytes).map_err(|e| StoreError::Corrupt { path, source: e })?;
        Ok(Some(journey))
    }

    /// Atomic replace: the blob is durable before this returns, and the
    /// manifest is updated to match.
    pub fn save(&self, journey: &Journey) -> Result<(), StoreError> {
        let path = self.blob_path(journey.id);
        let bytes = serde_json::to_vec_pretty(journey)
            .map_err(|e| StoreError::Corrupt { path: path.clone(), source: e })?;
        write_atomic(&path, &bytes)?;

        {
            let mut manifest = self.manifest.lock();
            manifest.entries.insert(journey.id, JourneySummary::from(journey));
            self.persist_manifest(&manifest)?;
        }
        Ok(())
    }

    /// All non-terminal journeys for a user.
    pub fn list_active(&self, distinct_id: &DistinctId) -> Vec<JourneySummary> {
        let mut active: Vec<JourneySummary> = self
            .manifest
            .lock()
            .entries
            .values()
            .filter(|s| s.distinct_id == *distinct_id && !s.status.is_terminal())
            .cloned()
            .collect();
        active.sort_by_key(|s| s.journey_id);
        active
    }

    /// All paused journeys (restart rehydration).
    pub fn list_paused(&self) -> Vec<JourneySummary> {
        let mut paused: Vec<JourneySummary> = self
            .manifest
            .lock()
            .entries
            .values()
            .filter(|s| s.status == JourneyStatus::Paused)
            .cloned()
            .collect();
        paused.sort_by_key(|s| s.journey_id);
        paused
    }

    /// Journeys stranded in `Running` (process died mid-advance).
    pub fn list_running(&self) -> Vec<JourneySummary> {
        let mut running: Vec<JourneySummary> = self
            .manifest
            .lock()
            .entries
            .values()
            .filter(|s| s.status == JourneyStatus::Running)
            .cloned()
            .collect();
        running.sort_by_key(|s| s.journey_id);
        running
    }

    /// Paused journeys whose deadline is at or before `instant_ms`,
    /// ordered by deadline then id.
    pub fn list_for_resume_before(&self, instant_ms: u64) -> Vec<JourneySummary> {
        let mut due: Vec<JourneySummary> = self
            .manifest
            .lock()
            .entries
            .values()
            .filter(|s| {
                s.status == JourneyStatus::Paused
                    && s.resume_at_ms.is_some_and(|at| at <= instant_ms)
            })
            .cloned()
            .collect();
        due.sort_by_key(|s| (s.resume_at_ms, s.journey_id));
        due
    }

    /// Every journey (including terminal) ever created for a
    /// `(user, campaign)` pair — the frequency-accounting view.
    pub fn list_for_campaign(
        &self,
        distinct_id: &DistinctId,
        campaign_id: CampaignId,
    ) -> Vec<JourneySummary> {
        let mut journeys: Vec<JourneySummary> = self
            .manifest
            .lock()
            .entries
            .values()
            .filter(|s| s.distinct_id == *distinct_id && s.campaign_id == campaign_id)
            .cloned()
            .collect();
        journeys.sort_by_key(|s| s.journey_id);
        journeys
    }

    fn blob_path(&self, journey_id: JourneyId) -> PathBuf {
        self.root.join("journeys").join(format!("{journey_id}.json"))
    }

    fn persist_manifest(&self, manifest: &Manifest) -> Result<(), StoreError> {
        let path = self.root.join("manifest.json");
        let bytes = serde_json::to_vec(manifest)
            .map_err(|e| StoreError::Corrupt { path: path.clone(), source: e })?;
        write_atomic(&path, &bytes)
    }
}

/// Write new file + atomic rename. The temp file is synced before the
/// rename so the new content is on disk when the name flips.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    let tmp = path.with_extension("json.tmp");
    {
        let mut file = fs::File::create(&tmp).map_err(|e| StoreError::io(&tmp, e))?;
        file.write_all(bytes).map_err(|e| StoreError::io(&tmp, e))?;
        file.sync_all().map_err(|e| StoreError::io(&tmp, e))?;
    }
    fs::rename(&tmp, path).map_err(|e| StoreError::io(path, e))
}

fn rebuild_manifest(journeys_dir: &Path) -> Result<Manifest, StoreError> {
    let mut manifest = Manifest::default();
    let entries = fs::read_dir(journeys_dir).map_err(|e| StoreError::io(journeys_dir, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| StoreError::io(journeys_dir, e))?;
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            // Leftover temp files from a crash mid-save are ignored;
            // the previous blob is still the canonical record.
            continue;
        }
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "skipping unreadable blob");
                continue;
            }
        };
        match serde_json::from_slice::<Journey>(&bytes) {
            Ok(journey) => {
                manifest.entries.insert(journey.id, JourneySummary::from(&journey));
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "skipping corrupt blob");
            }
        }
    }
    Ok(manifest)
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
