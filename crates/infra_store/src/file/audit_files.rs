//! Per-event JSON audit files
//!
//! Layout:
//!
//! ```text
//! <root>/<YYYY-MM-DD>/<policy_number>/<AgentName>_<timestamp>_<action>.json
//! ```
//!
//! Every event gets its own file, created with `create_new` so an existing
//! record is never overwritten.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use core_kernel::{DomainPort, HealthCheckResult, HealthCheckable, PortError};
use domain_claims::{AuditEvent, AuditReport, AuditSink};

use crate::error::StoreError;

/// Writes each audit event to its own JSON document
#[derive(Debug, Clone)]
pub struct JsonFileAuditSink {
    root: PathBuf,
}

impl JsonFileAuditSink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path the event is written to
    pub fn event_path(&self, event: &AuditEvent) -> PathBuf {
        let file_name = format!(
            "{}_{}_{}.json",
            event.agent_name,
            event.timestamp.format("%Y%m%dT%H%M%S%.6fZ"),
            sanitize(&event.action)
        );
        self.root
            .join(event.timestamp.format("%Y-%m-%d").to_string())
            .join(sanitize(&event.policy_number))
            .join(file_name)
    }

    async fn write_event(&self, event: &AuditEvent) -> Result<PathBuf, StoreError> {
        let mut path = self.event_path(event);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| StoreError::io(parent, e))?;
        }
        let body = serde_json::to_vec_pretty(event)?;

        let mut file = match OpenOptions::new().write(true).create_new(true).open(&path).await {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                // same agent, action and microsecond
                path.set_file_name(format!(
                    "{}_{}_{}_{}.json",
                    event.agent_name,
                    event.timestamp.format("%Y%m%dT%H%M%S%.6fZ"),
                    sanitize(&event.action),
                    event.event_id.as_uuid().simple()
                ));
                OpenOptions::new()
                    .write(true)
                    .create_new(true)
                    .open(&path)
                    .await
                    .map_err(|e| StoreError::io(&path, e))?
            }
            Err(e) => return Err(StoreError::io(&path, e)),
        };

        file.write_all(&body).await.map_err(|e| StoreError::io(&path, e))?;
        file.sync_data().await.map_err(|e| StoreError::io(&path, e))?;
        Ok(path)
    }

    /// Reads the trail back, oldest first
    ///
    /// Unreadable documents are skipped with a warning so one bad file does
    /// not hide the rest of the trail.
    pub async fn read_trail(&self, policy_number: Option<&str>) -> Result<Vec<AuditEvent>, StoreError> {
        let mut events = Vec::new();
        for day_dir in list_dirs(&self.root).await? {
            let policy_dirs = match policy_number {
                Some(policy) => {
                    let dir = day_dir.join(sanitize(policy));
                    if fs::metadata(&dir).await.map(|m| m.is_dir()).unwrap_or(false) {
                        vec![dir]
                    } else {
                        Vec::new()
                    }
                }
                None => list_dirs(&day_dir).await?,
            };

            for dir in policy_dirs {
                let mut entries = fs::read_dir(&dir).await.map_err(|e| StoreError::io(&dir, e))?;
                while let Some(entry) = entries.next_entry().await.map_err(|e| StoreError::io(&dir, e))? {
                    let path = entry.path();
                    if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                        continue;
                    }
                    match read_event(&path).await {
                        // distinct policy numbers can share a sanitized folder
                        Ok(event) if policy_number.is_some_and(|p| event.policy_number != p.trim()) => {}
                        Ok(event) => events.push(event),
                        Err(err) => warn!(path = %path.display(), error = %err, "Skipping unreadable audit file"),
                    }
                }
            }
        }

        events.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then(a.event_id.cmp(&b.event_id)));
        Ok(events)
    }

    /// Summarizes the trail for one policy, or for everything
    pub async fn report(&self, policy_number: Option<&str>) -> Result<AuditReport, StoreError> {
        let events = self.read_trail(policy_number).await?;
        Ok(AuditReport::from_events(&events))
    }
}

async fn read_event(path: &Path) -> Result<AuditEvent, StoreError> {
    let bytes = fs::read(path).await.map_err(|e| StoreError::io(path, e))?;
    Ok(serde_json::from_slice(&bytes)?)
}

async fn list_dirs(dir: &Path) -> Result<Vec<PathBuf>, StoreError> {
    let mut entries = match fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(StoreError::io(dir, e)),
    };
    let mut dirs = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(|e| StoreError::io(dir, e))? {
        let is_dir = entry.file_type().await.map(|t| t.is_dir()).unwrap_or(false);
        if is_dir {
            dirs.push(entry.path());
        }
    }
    dirs.sort();
    Ok(dirs)
}

/// Keeps a path component to `[A-Za-z0-9._-]`
fn sanitize(component: &str) -> String {
    let cleaned: String = component
        .trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') { c } else { '_' })
        .collect();
    match cleaned.trim_matches('.') {
        "" => "_".to_string(),
        name => name.to_string(),
    }
}

impl DomainPort for JsonFileAuditSink {}

#[async_trait]
impl HealthCheckable for JsonFileAuditSink {
    async fn health_check(&self) -> HealthCheckResult {
        let start = std::time::Instant::now();
        match fs::create_dir_all(&self.root).await {
            Ok(()) => HealthCheckResult::healthy("json-audit-sink", start.elapsed().as_millis() as u64),
            Err(e) => HealthCheckResult::unhealthy("json-audit-sink", format!("I/O error: {}", e)),
        }
    }
}

#[async_trait]
impl AuditSink for JsonFileAuditSink {
    async fn record(&self, event: &AuditEvent) -> Result<(), PortError> {
        let path = self.write_event(event).await?;
        debug!(event_id = %event.event_id, path = %path.display(), "Audit event written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_strips_path_separators() {
        assert_eq!(sanitize("POL/../123"), "POL_.._123");
        assert_eq!(sanitize("  "), "_");
        assert_eq!(sanitize(".."), "_");
        assert_eq!(sanitize("POL-2024_01"), "POL-2024_01");
    }
}
