//! Domain events published after committed mutations.
//!
//! Events are facts: immutable, JSON-serializable, emitted exactly once per
//! state change after its transaction commits. They never re-enter the
//! mutation path — a consumer that deducted stock again on `SaleCompleted`
//! would double-count the deduction that already happened.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use kirana_core::{BatchId, GrnId, ProductId, PurchaseOrderId, SaleId, SupplierId};

/// Event discriminant, used by handlers to declare interest.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    SaleCompleted,
    GrnConfirmed,
    LowStock,
    ExpirySoon,
}

/// Item line carried on `SaleCompleted`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleItemSnapshot {
    pub product_id: ProductId,
    pub quantity: i64,
    pub unit_price: Decimal,
}

/// A sale committed; ledger posting, loyalty accrual and low-stock re-checks
/// hang off this event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleCompleted {
    pub sale_id: SaleId,
    pub invoice_number: String,
    pub sale_date: DateTime<Utc>,
    pub total_amount: Decimal,
    pub items: Vec<SaleItemSnapshot>,
}

/// Item line carried on `GrnConfirmed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrnItemSnapshot {
    pub product_id: ProductId,
    pub quantity: i64,
    pub unit_cost: Decimal,
    pub expiry_date: Option<DateTime<Utc>>,
    pub batch_number: Option<String>,
}

/// A goods receipt was confirmed and its batches/stock created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrnConfirmed {
    pub grn_id: GrnId,
    pub grn_number: String,
    pub supplier_id: SupplierId,
    pub purchase_order_id: Option<PurchaseOrderId>,
    pub confirmed_date: DateTime<Utc>,
    pub total_amount: Decimal,
    pub items: Vec<GrnItemSnapshot>,
}

/// Availability dropped to or below the product's replenishment threshold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LowStock {
    pub product_id: ProductId,
    pub product_name: String,
    pub sku: String,
    pub current_stock: i64,
    pub threshold: i64,
    pub occurred_at: DateTime<Utc>,
}

/// A lot's expiry date entered the alert window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpirySoon {
    pub product_id: ProductId,
    pub product_name: String,
    pub sku: String,
    pub batch_id: BatchId,
    pub expiry_date: DateTime<Utc>,
    pub days_until_expiry: i64,
    pub occurred_at: DateTime<Utc>,
}

/// Tagged union of every event the engine publishes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomainEvent {
    SaleCompleted(SaleCompleted),
    GrnConfirmed(GrnConfirmed),
    LowStock(LowStock),
    ExpirySoon(ExpirySoon),
}

impl DomainEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            DomainEvent::SaleCompleted(_) => EventKind::SaleCompleted,
            DomainEvent::GrnConfirmed(_) => EventKind::GrnConfirmed,
            DomainEvent::LowStock(_) => EventKind::LowStock,
            DomainEvent::ExpirySoon(_) => EventKind::ExpirySoon,
        }
    }

    /// Stable event name (e.g. "inventory.low_stock").
    pub fn event_type(&self) -> &'static str {
        match self {
            DomainEvent::SaleCompleted(_) => "sales.sale.completed",
            DomainEvent::GrnConfirmed(_) => "receipts.grn.confirmed",
            DomainEvent::LowStock(_) => "inventory.low_stock",
            DomainEvent::ExpirySoon(_) => "inventory.expiry_soon",
        }
    }

    /// When the event occurred (business time).
    pub fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            DomainEvent::SaleCompleted(e) => e.sale_date,
            DomainEvent::GrnConfirmed(e) => e.confirmed_date,
            DomainEvent::LowStock(e) => e.occurred_at,
            DomainEvent::ExpirySoon(e) => e.occurred_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::str::FromStr;

    #[test]
    fn events_serialize_to_tagged_json() {
        let event = DomainEvent::LowStock(LowStock {
            product_id: ProductId::new(),
            product_name: "Sugar 1kg".to_string(),
            sku: "SUG-1".to_string(),
            current_stock: 8,
            threshold: 10,
            occurred_at: Utc::now(),
        });

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "low_stock");
        assert_eq!(json["current_stock"], 8);

        let back: DomainEvent = serde_json::from_value(json).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn event_type_names_are_stable() {
        let event = DomainEvent::SaleCompleted(SaleCompleted {
            sale_id: SaleId::new(),
            invoice_number: "INV-000001".to_string(),
            sale_date: Utc::now(),
            total_amount: Decimal::from_str("99.00").unwrap(),
            items: vec![],
        });
        assert_eq!(event.event_type(), "sales.sale.completed");
        assert_eq!(event.kind(), EventKind::SaleCompleted);
    }
}
