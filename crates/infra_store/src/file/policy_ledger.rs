//! JSON-lines policy ledger
//!
//! Records the usage written back after each terminal approval. The latest
//! line per policy is the current position.

use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{info, warn};

use core_kernel::{DomainPort, PortError};
use domain_claims::{PolicyLedger, UpdatedValues};

use crate::error::StoreError;
use crate::file::jsonl::{replay, truncate_to, LogFile};

pub const LEDGER_FILE: &str = "policy_ledger.jsonl";

/// One applied usage update
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub policy_number: String,
    pub past_claims_amount: Decimal,
    pub claim_history_count: u32,
    pub applied_at: DateTime<Utc>,
}

struct LedgerState {
    positions: HashMap<String, UpdatedValues>,
    log: LogFile,
}

pub struct JsonlPolicyLedger {
    state: Mutex<LedgerState>,
}

impl JsonlPolicyLedger {
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .await
            .map_err(|e| StoreError::io(&dir, e))?;

        let path = dir.join(LEDGER_FILE);
        let replayed = replay::<LedgerEntry>(&path).await?;
        if replayed.torn_tail {
            warn!(path = %path.display(), "Dropping unterminated final line from policy ledger");
            truncate_to(&path, replayed.valid_len).await?;
        }

        let positions = replayed
            .entries
            .into_iter()
            .map(|entry| {
                (
                    entry.policy_number,
                    UpdatedValues {
                        new_past_claims_amount: entry.past_claims_amount,
                        new_claim_history_count: entry.claim_history_count,
                    },
                )
            })
            .collect();
        let log = LogFile::open(path, replayed.valid_len).await?;

        Ok(Self {
            state: Mutex::new(LedgerState { positions, log }),
        })
    }

    /// Latest applied usage for a policy
    pub async fn current(&self, policy_number: &str) -> Option<UpdatedValues> {
        self.state.lock().await.positions.get(policy_number).copied()
    }
}

impl DomainPort for JsonlPolicyLedger {}

#[async_trait]
impl PolicyLedger for JsonlPolicyLedger {
    async fn apply_claim_usage(
        &self,
        policy_number: &str,
        values: &UpdatedValues,
    ) -> Result<(), PortError> {
        let entry = LedgerEntry {
            policy_number: policy_number.to_string(),
            past_claims_amount: values.new_past_claims_amount,
            claim_history_count: values.new_claim_history_count,
            applied_at: Utc::now(),
        };

        let mut state = self.state.lock().await;
        state.log.append(&entry).await.map_err(PortError::from)?;
        state.positions.insert(entry.policy_number.clone(), *values);

        info!(
            policy_number,
            past_claims_amount = %entry.past_claims_amount,
            claim_history_count = entry.claim_history_count,
            "Ledger entry appended"
        );
        Ok(())
    }
}
