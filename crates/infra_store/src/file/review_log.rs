//! JSON-lines review store
//!
//! The queue is an append-only event log (`review_queue.jsonl`): one line per
//! enqueue and one per resolution. State is rebuilt by replaying the log on
//! open, so a record is never half-updated in place.
//!
//! Each line is written with a single `write_all` followed by `sync_data`
//! before the caller is acknowledged. A crash mid-write can therefore only
//! leave an unterminated final line, which replay drops and truncates away.
//!
//! Resolved records are also copied to `review_history.jsonl`. The event log
//! is authoritative; missing history lines are re-appended on open.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use core_kernel::{DomainPort, HealthCheckResult, HealthCheckable, PortError, ReviewId};
use domain_claims::{Resolution, ReviewRecord, ReviewStore};

use crate::error::StoreError;
use crate::file::jsonl::{replay, truncate_to, LogFile, Replay};

pub const QUEUE_LOG_FILE: &str = "review_queue.jsonl";
pub const HISTORY_FILE: &str = "review_history.jsonl";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "entry", rename_all = "snake_case")]
enum LogEntry {
    Enqueued {
        record: ReviewRecord,
    },
    Resolved {
        review_id: ReviewId,
        resolution: Resolution,
    },
}

struct LogState {
    records: Vec<ReviewRecord>,
    positions: HashMap<ReviewId, usize>,
    history: Vec<ReviewRecord>,
    log: LogFile,
    history_log: LogFile,
}

/// File-backed review store for single-process deployments
///
/// All writers are serialized through one async mutex, so concurrent
/// resolutions of the same review see each other's effects.
pub struct JsonlReviewStore {
    dir: PathBuf,
    state: Mutex<LogState>,
}

impl JsonlReviewStore {
    /// Opens (or creates) the store in `dir`, replaying the event log
    ///
    /// # Errors
    ///
    /// `StoreError::Corrupt` when a terminated line cannot be decoded or the
    /// log contradicts itself; `StoreError::Io` on filesystem failures.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .await
            .map_err(|e| StoreError::io(&dir, e))?;

        let log_path = dir.join(QUEUE_LOG_FILE);
        let log_replay: Replay<LogEntry> = replay(&log_path).await?;
        if log_replay.torn_tail {
            warn!(path = %log_path.display(), "Dropping unterminated final line from review log");
            truncate_to(&log_path, log_replay.valid_len).await?;
        }

        let mut records: Vec<ReviewRecord> = Vec::new();
        let mut positions = HashMap::new();
        let mut resolved_order = Vec::new();
        for (idx, entry) in log_replay.entries.into_iter().enumerate() {
            match entry {
                LogEntry::Enqueued { record } => {
                    if positions.contains_key(&record.review_id) {
                        return Err(StoreError::Corrupt {
                            path: log_path,
                            line: idx + 1,
                            message: format!("review {} enqueued twice", record.review_id),
                        });
                    }
                    positions.insert(record.review_id, records.len());
                    records.push(record);
                }
                LogEntry::Resolved { review_id, resolution } => {
                    let position = positions.get(&review_id).copied();
                    let applied = position
                        .ok_or_else(|| format!("resolution for unknown review {}", review_id))
                        .and_then(|pos| {
                            records[pos]
                                .apply_resolution(&resolution)
                                .map(|()| pos)
                                .map_err(|e| e.to_string())
                        });
                    match applied {
                        Ok(pos) => resolved_order.push(pos),
                        Err(message) => {
                            return Err(StoreError::Corrupt {
                                path: log_path,
                                line: idx + 1,
                                message,
                            })
                        }
                    }
                }
            }
        }

        let history_path = dir.join(HISTORY_FILE);
        let history_replay: Replay<ReviewRecord> = replay(&history_path).await?;
        if history_replay.torn_tail {
            warn!(path = %history_path.display(), "Dropping unterminated final line from review history");
            truncate_to(&history_path, history_replay.valid_len).await?;
        }
        let archived: HashSet<ReviewId> = history_replay.entries.iter().map(|r| r.review_id).collect();

        let log = LogFile::open(log_path, log_replay.valid_len).await?;
        let mut history_log = LogFile::open(history_path, history_replay.valid_len).await?;

        let history: Vec<ReviewRecord> = resolved_order.iter().map(|pos| records[*pos].clone()).collect();
        let missing: Vec<&ReviewRecord> = history
            .iter()
            .filter(|r| !archived.contains(&r.review_id))
            .collect();
        if !missing.is_empty() {
            warn!(count = missing.len(), "Repairing review history from event log");
            for record in missing {
                history_log.append(record).await?;
            }
        }

        info!(
            dir = %dir.display(),
            records = records.len(),
            resolved = history.len(),
            "Review store opened"
        );

        Ok(Self {
            dir,
            state: Mutex::new(LogState {
                records,
                positions,
                history,
                log,
                history_log,
            }),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    async fn append_record(&self, record: &ReviewRecord) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        if state.positions.contains_key(&record.review_id) {
            return Err(StoreError::Conflict(format!(
                "review {} already exists",
                record.review_id
            )));
        }

        state
            .log
            .append(&LogEntry::Enqueued {
                record: record.clone(),
            })
            .await?;
        let position = state.records.len();
        state.positions.insert(record.review_id, position);
        state.records.push(record.clone());
        debug!(review_id = %record.review_id, "Review appended to log");
        Ok(())
    }

    async fn resolve_record(
        &self,
        review_id: ReviewId,
        resolution: &Resolution,
    ) -> Result<ReviewRecord, StoreError> {
        let mut state = self.state.lock().await;
        let position = *state
            .positions
            .get(&review_id)
            .ok_or_else(|| StoreError::not_found("ReviewRecord", review_id))?;

        let mut resolved = state.records[position].clone();
        resolved
            .apply_resolution(resolution)
            .map_err(|e| StoreError::Conflict(e.to_string()))?;

        state
            .log
            .append(&LogEntry::Resolved {
                review_id,
                resolution: resolution.clone(),
            })
            .await?;
        state.records[position] = resolved.clone();
        state.history.push(resolved.clone());

        if let Err(err) = state.history_log.append(&resolved).await {
            // repaired from the event log on next open
            warn!(review_id = %review_id, error = %err, "History copy not written");
        }
        Ok(resolved)
    }
}

impl DomainPort for JsonlReviewStore {}

#[async_trait]
impl HealthCheckable for JsonlReviewStore {
    async fn health_check(&self) -> HealthCheckResult {
        let start = std::time::Instant::now();
        match fs::metadata(&self.dir).await {
            Ok(meta) if meta.is_dir() => {
                HealthCheckResult::healthy("jsonl-review-store", start.elapsed().as_millis() as u64)
            }
            Ok(_) => HealthCheckResult::unhealthy("jsonl-review-store", "data path is not a directory"),
            Err(e) => HealthCheckResult::unhealthy("jsonl-review-store", format!("I/O error: {}", e)),
        }
    }
}

#[async_trait]
impl ReviewStore for JsonlReviewStore {
    async fn append(&self, record: &ReviewRecord) -> Result<(), PortError> {
        Ok(self.append_record(record).await?)
    }

    async fn pending(&self) -> Result<Vec<ReviewRecord>, PortError> {
        let state = self.state.lock().await;
        Ok(state.records.iter().filter(|r| r.is_pending()).cloned().collect())
    }

    async fn get(&self, review_id: ReviewId) -> Result<ReviewRecord, PortError> {
        let state = self.state.lock().await;
        state
            .positions
            .get(&review_id)
            .map(|pos| state.records[*pos].clone())
            .ok_or_else(|| PortError::not_found("ReviewRecord", review_id))
    }

    async fn resolve(
        &self,
        review_id: ReviewId,
        resolution: &Resolution,
    ) -> Result<ReviewRecord, PortError> {
        Ok(self.resolve_record(review_id, resolution).await?)
    }

    async fn history(&self) -> Result<Vec<ReviewRecord>, PortError> {
        Ok(self.state.lock().await.history.clone())
    }

    async fn all(&self) -> Result<Vec<ReviewRecord>, PortError> {
        Ok(self.state.lock().await.records.clone())
    }
}
