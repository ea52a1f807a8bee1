//! Idempotency guard for retried write operations.
//!
//! A caller that retries a confirmed GRN or a manual adjustment (network
//! blip, double tap) supplies the same idempotency key; the guard turns the
//! second attempt into a replay of the first outcome instead of a second
//! mutation. Keys are scoped per operation kind, so a GRN confirmation and a
//! stock adjustment can share a key without colliding.
//!
//! The guard itself is plain data living inside [`StoreState`]; recording a
//! key happens in the same transaction as the mutation it protects, so a
//! rolled-back attempt never leaves a claimed key behind.
//!
//! [`StoreState`]: crate::store::StoreState

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use kirana_core::{DomainError, DomainResult};

/// Longest accepted idempotency key.
pub const MAX_KEY_LEN: usize = 128;

/// Operation families with independent key namespaces.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    GrnConfirmation,
    StockAdjustment,
}

/// Completed operation remembered for replay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdempotencyRecord {
    key: String,
    kind: OperationKind,
    /// Identifier of the entity the original operation produced or mutated.
    result_id: Uuid,
    completed_at: DateTime<Utc>,
}

impl IdempotencyRecord {
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn kind(&self) -> OperationKind {
        self.kind
    }

    pub fn result_id(&self) -> Uuid {
        self.result_id
    }

    pub fn completed_at(&self) -> DateTime<Utc> {
        self.completed_at
    }
}

/// Outcome of checking a key before performing an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyCheck {
    /// Key unseen; proceed and record it together with the mutation.
    New,
    /// Key already completed; return the prior result, mutate nothing.
    Replay(Uuid),
}

/// Per-kind key → completed-operation map.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdempotencyGuard {
    records: HashMap<(OperationKind, String), IdempotencyRecord>,
}

impl IdempotencyGuard {
    /// Check `key` for `kind` without claiming it.
    ///
    /// Claiming happens via [`record`](Self::record) in the same transaction
    /// as the protected mutation.
    pub fn check(&self, kind: OperationKind, key: &str) -> DomainResult<KeyCheck> {
        validate_key(key)?;
        match self.records.get(&(kind, key.to_string())) {
            Some(prior) => Ok(KeyCheck::Replay(prior.result_id())),
            None => Ok(KeyCheck::New),
        }
    }

    /// Remember a completed operation under its key.
    pub fn record(
        &mut self,
        kind: OperationKind,
        key: &str,
        result_id: Uuid,
        completed_at: DateTime<Utc>,
    ) {
        self.records.insert(
            (kind, key.to_string()),
            IdempotencyRecord {
                key: key.to_string(),
                kind,
                result_id,
                completed_at,
            },
        );
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Keys are non-empty printable ASCII, at most [`MAX_KEY_LEN`] bytes.
pub fn validate_key(key: &str) -> DomainResult<()> {
    if key.trim().is_empty() {
        return Err(DomainError::validation("idempotency key cannot be empty"));
    }
    if key.len() > MAX_KEY_LEN {
        return Err(DomainError::validation(format!(
            "idempotency key exceeds {MAX_KEY_LEN} characters"
        )));
    }
    if !key.chars().all(|c| c.is_ascii_graphic()) {
        return Err(DomainError::validation(
            "idempotency key must be printable ASCII without spaces",
        ));
    }
    Ok(())
}
