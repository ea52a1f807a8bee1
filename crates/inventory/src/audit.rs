//! Append-only stock movement audit.
//!
//! One row per on-hand mutation, written in the same transaction as the
//! mutation itself. Rows are never updated or deleted; they are the durable
//! record of every stock movement.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use kirana_core::{GrnId, ProductId, SaleId, UserId};

/// Business reason for a stock movement.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdjustmentType {
    Sale,
    Purchase,
    Return,
    ManualAdjustment,
}

/// Document that caused the movement.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditReference {
    Sale(SaleId),
    Grn(GrnId),
    Manual,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryAudit {
    id: Uuid,
    product_id: ProductId,
    adjustment_type: AdjustmentType,
    /// Signed on-hand delta.
    quantity_change: i64,
    quantity_before: i64,
    quantity_after: i64,
    reference: AuditReference,
    recorded_by: UserId,
    recorded_at: DateTime<Utc>,
}

impl InventoryAudit {
    pub fn record(
        product_id: ProductId,
        adjustment_type: AdjustmentType,
        quantity_before: i64,
        quantity_after: i64,
        reference: AuditReference,
        recorded_by: UserId,
        recorded_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            product_id,
            adjustment_type,
            quantity_change: quantity_after - quantity_before,
            quantity_before,
            quantity_after,
            reference,
            recorded_by,
            recorded_at,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn product_id(&self) -> ProductId {
        self.product_id
    }

    pub fn adjustment_type(&self) -> AdjustmentType {
        self.adjustment_type
    }

    pub fn quantity_change(&self) -> i64 {
        self.quantity_change
    }

    pub fn quantity_before(&self) -> i64 {
        self.quantity_before
    }

    pub fn quantity_after(&self) -> i64 {
        self.quantity_after
    }

    pub fn reference(&self) -> AuditReference {
        self.reference
    }

    pub fn recorded_by(&self) -> UserId {
        self.recorded_by
    }

    pub fn recorded_at(&self) -> DateTime<Utc> {
        self.recorded_at
    }
}
