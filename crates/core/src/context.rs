//! Explicit operation context.
//!
//! Every mutating operation receives the acting user and the business time as
//! an explicit parameter. Nothing in the domain reads ambient state (wall
//! clock, thread-local claims); this keeps operations deterministic and
//! auditable.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::id::UserId;

/// Who is performing an operation, and when.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationContext {
    pub actor: UserId,
    pub occurred_at: DateTime<Utc>,
}

impl OperationContext {
    /// Context stamped with the current wall-clock time.
    pub fn new(actor: UserId) -> Self {
        Self {
            actor,
            occurred_at: Utc::now(),
        }
    }

    /// Context with an explicit business time (preferred in tests).
    pub fn at(actor: UserId, occurred_at: DateTime<Utc>) -> Self {
        Self { actor, occurred_at }
    }
}
