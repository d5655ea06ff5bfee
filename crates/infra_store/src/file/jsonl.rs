//! Append-only JSON-lines files
//!
//! Shared by the review log and the policy ledger. A line is acknowledged
//! only after it is fully written and synced, so the only damage a crash can
//! leave is an unterminated final line.

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::fs::{self, File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::error;

use crate::error::StoreError;

/// An append-only JSON-lines file with its acknowledged length
pub(crate) struct LogFile {
    path: PathBuf,
    file: File,
    len: u64,
    /// Set when a partial write could not be truncated away
    poisoned: bool,
}

impl LogFile {
    pub(crate) async fn open(path: PathBuf, len: u64) -> Result<Self, StoreError> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|e| StoreError::io(&path, e))?;
        Ok(Self {
            path,
            file,
            len,
            poisoned: false,
        })
    }

    /// Appends one line durably, rolling back the file on failure
    ///
    /// If the rollback fails too, every later append is refused: it would
    /// land behind the partial bytes and turn them into a corrupt line.
    pub(crate) async fn append<T: Serialize>(&mut self, value: &T) -> Result<(), StoreError> {
        if self.poisoned {
            return Err(StoreError::Poisoned {
                path: self.path.clone(),
            });
        }

        let mut line = serde_json::to_vec(value)?;
        line.push(b'\n');

        let written = async {
            self.file.write_all(&line).await?;
            self.file.flush().await?;
            self.file.sync_data().await
        }
        .await;

        match written {
            Ok(()) => {
                self.len += line.len() as u64;
                Ok(())
            }
            Err(err) => {
                if let Err(truncate_err) = self.file.set_len(self.len).await {
                    self.poisoned = true;
                    error!(
                        path = %self.path.display(),
                        error = %truncate_err,
                        "Could not roll back partial write, log closed for appends"
                    );
                }
                Err(StoreError::io(&self.path, err))
            }
        }
    }
}

/// Lines recovered from a log file
pub(crate) struct Replay<T> {
    pub(crate) entries: Vec<T>,
    /// Byte length of the fully terminated prefix
    pub(crate) valid_len: u64,
    pub(crate) torn_tail: bool,
}

pub(crate) async fn replay<T: DeserializeOwned>(path: &Path) -> Result<Replay<T>, StoreError> {
    let bytes = match fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Ok(Replay {
                entries: Vec::new(),
                valid_len: 0,
                torn_tail: false,
            })
        }
        Err(e) => return Err(StoreError::io(path, e)),
    };

    let mut entries = Vec::new();
    let mut offset = 0usize;
    let mut line_no = 0usize;
    while offset < bytes.len() {
        line_no += 1;
        let rest = &bytes[offset..];
        let Some(end) = rest.iter().position(|b| *b == b'\n') else {
            // never acknowledged
            return Ok(Replay {
                entries,
                valid_len: offset as u64,
                torn_tail: true,
            });
        };

        let line = &rest[..end];
        if !line.iter().all(u8::is_ascii_whitespace) {
            let entry = serde_json::from_slice(line).map_err(|e| StoreError::Corrupt {
                path: path.to_path_buf(),
                line: line_no,
                message: e.to_string(),
            })?;
            entries.push(entry);
        }
        offset += end + 1;
    }

    Ok(Replay {
        entries,
        valid_len: bytes.len() as u64,
        torn_tail: false,
    })
}

pub(crate) async fn truncate_to(path: &Path, len: u64) -> Result<(), StoreError> {
    let file = OpenOptions::new()
        .write(true)
        .open(path)
        .await
        .map_err(|e| StoreError::io(path, e))?;
    file.set_len(len).await.map_err(|e| StoreError::io(path, e))?;
    file.sync_data().await.map_err(|e| StoreError::io(path, e))
}
