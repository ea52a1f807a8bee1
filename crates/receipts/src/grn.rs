//! GRN aggregate: items, lifecycle, idempotency-key carrier.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use kirana_core::{DomainError, DomainResult, GrnId, ProductId, PurchaseOrderId, SupplierId};

/// GRN status lifecycle. `Confirmed` and `Cancelled` are both terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GrnStatus {
    Draft,
    Confirmed,
    Cancelled,
}

/// One received line: what arrived, at what cost, with what shelf life.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrnItem {
    pub product_id: ProductId,
    pub quantity: i64,
    pub unit_cost: Decimal,
    pub expiry_date: Option<DateTime<Utc>>,
    pub batch_number: Option<String>,
}

impl GrnItem {
    fn validate(&self) -> DomainResult<()> {
        if self.quantity <= 0 {
            return Err(DomainError::validation("received quantity must be positive"));
        }
        if self.unit_cost < Decimal::ZERO {
            return Err(DomainError::validation("unit cost cannot be negative"));
        }
        Ok(())
    }
}

/// Aggregate root: GoodsReceiveNote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoodsReceiveNote {
    id: GrnId,
    grn_number: String,
    supplier_id: SupplierId,
    purchase_order_id: Option<PurchaseOrderId>,
    status: GrnStatus,
    items: Vec<GrnItem>,
    idempotency_key: Option<String>,
    received_date: DateTime<Utc>,
    confirmed_at: Option<DateTime<Utc>>,
}

impl GoodsReceiveNote {
    pub fn new(
        id: GrnId,
        grn_number: String,
        supplier_id: SupplierId,
        purchase_order_id: Option<PurchaseOrderId>,
        items: Vec<GrnItem>,
        idempotency_key: Option<String>,
        received_date: DateTime<Utc>,
    ) -> DomainResult<Self> {
        if items.is_empty() {
            return Err(DomainError::validation("a GRN needs at least one item"));
        }
        for item in &items {
            item.validate()?;
        }
        Ok(Self {
            id,
            grn_number,
            supplier_id,
            purchase_order_id,
            status: GrnStatus::Draft,
            items,
            idempotency_key,
            received_date,
            confirmed_at: None,
        })
    }

    pub fn id(&self) -> GrnId {
        self.id
    }

    pub fn grn_number(&self) -> &str {
        &self.grn_number
    }

    pub fn supplier_id(&self) -> SupplierId {
        self.supplier_id
    }

    pub fn purchase_order_id(&self) -> Option<PurchaseOrderId> {
        self.purchase_order_id
    }

    pub fn status(&self) -> GrnStatus {
        self.status
    }

    pub fn items(&self) -> &[GrnItem] {
        &self.items
    }

    pub fn idempotency_key(&self) -> Option<&str> {
        self.idempotency_key.as_deref()
    }

    pub fn received_date(&self) -> DateTime<Utc> {
        self.received_date
    }

    pub fn confirmed_at(&self) -> Option<DateTime<Utc>> {
        self.confirmed_at
    }

    /// Total received value: Σ quantity × unit cost.
    pub fn total_amount(&self) -> Decimal {
        self.items
            .iter()
            .map(|i| Decimal::from(i.quantity) * i.unit_cost)
            .sum()
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.status, GrnStatus::Confirmed | GrnStatus::Cancelled)
    }

    /// Draft → Confirmed. Terminal afterwards.
    pub fn confirm(&mut self, at: DateTime<Utc>) -> DomainResult<()> {
        match self.status {
            GrnStatus::Draft => {
                self.status = GrnStatus::Confirmed;
                self.confirmed_at = Some(at);
                Ok(())
            }
            other => Err(DomainError::invalid_transition(format!(
                "cannot confirm a {other:?} GRN"
            ))),
        }
    }

    /// Draft → Cancelled. Terminal afterwards.
    pub fn cancel(&mut self) -> DomainResult<()> {
        match self.status {
            GrnStatus::Draft => {
                self.status = GrnStatus::Cancelled;
                Ok(())
            }
            other => Err(DomainError::invalid_transition(format!(
                "cannot cancel a {other:?} GRN"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::str::FromStr;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn item(qty: i64, cost: &str) -> GrnItem {
        GrnItem {
            product_id: ProductId::new(),
            quantity: qty,
            unit_cost: d(cost),
            expiry_date: None,
            batch_number: None,
        }
    }

    fn draft(items: Vec<GrnItem>) -> GoodsReceiveNote {
        GoodsReceiveNote::new(
            GrnId::new(),
            "GRN-000001".to_string(),
            SupplierId::new(),
            None,
            items,
            None,
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn total_amount_sums_lines() {
        let grn = draft(vec![item(10, "5.00"), item(4, "12.25")]);
        assert_eq!(grn.total_amount(), d("99.00"));
    }

    #[test]
    fn empty_or_invalid_items_are_rejected() {
        assert!(GoodsReceiveNote::new(
            GrnId::new(),
            "GRN-000002".to_string(),
            SupplierId::new(),
            None,
            vec![],
            None,
            Utc::now(),
        )
        .is_err());
        assert!(GoodsReceiveNote::new(
            GrnId::new(),
            "GRN-000003".to_string(),
            SupplierId::new(),
            None,
            vec![item(0, "5.00")],
            None,
            Utc::now(),
        )
        .is_err());
    }

    #[test]
    fn confirm_is_terminal() {
        let mut grn = draft(vec![item(5, "2.00")]);
        grn.confirm(Utc::now()).unwrap();
        assert_eq!(grn.status(), GrnStatus::Confirmed);
        assert!(grn.confirmed_at().is_some());

        let err = grn.confirm(Utc::now()).unwrap_err();
        assert!(matches!(err, DomainError::InvalidStateTransition(_)));
        let err = grn.cancel().unwrap_err();
        assert!(matches!(err, DomainError::InvalidStateTransition(_)));
    }

    #[test]
    fn cancelled_grn_cannot_be_confirmed() {
        let mut grn = draft(vec![item(5, "2.00")]);
        grn.cancel().unwrap();
        assert_eq!(grn.status(), GrnStatus::Cancelled);

        let err = grn.confirm(Utc::now()).unwrap_err();
        assert!(matches!(err, DomainError::InvalidStateTransition(_)));
    }
}
