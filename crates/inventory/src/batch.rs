//! Lot-level (batch) records.
//!
//! A batch is one physically received lot: its own cost, its own expiry.
//! Batches are created only by GRN confirmation and are never physically
//! deleted; exhausted or voided lots are marked inactive.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use kirana_core::{BatchId, DomainError, DomainResult, GrnId, ProductId, PurchaseOrderId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Batch {
    id: BatchId,
    product_id: ProductId,
    batch_number: Option<String>,
    /// Originally received quantity.
    quantity: i64,
    /// Remaining quantity, decreased as stock is consumed.
    available_quantity: i64,
    unit_cost: Decimal,
    received_date: DateTime<Utc>,
    expiry_date: Option<DateTime<Utc>>,
    /// Provenance: the purchase order this lot fulfils, when known.
    purchase_order_id: Option<PurchaseOrderId>,
    /// Provenance: the GRN whose confirmation created this lot.
    grn_id: GrnId,
    is_active: bool,
}

impl Batch {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        product_id: ProductId,
        quantity: i64,
        unit_cost: Decimal,
        received_date: DateTime<Utc>,
        expiry_date: Option<DateTime<Utc>>,
        batch_number: Option<String>,
        purchase_order_id: Option<PurchaseOrderId>,
        grn_id: GrnId,
    ) -> DomainResult<Self> {
        if quantity <= 0 {
            return Err(DomainError::validation("batch quantity must be positive"));
        }
        if unit_cost < Decimal::ZERO {
            return Err(DomainError::validation("unit cost cannot be negative"));
        }
        Ok(Self {
            id: BatchId::new(),
            product_id,
            batch_number,
            quantity,
            available_quantity: quantity,
            unit_cost,
            received_date,
            expiry_date,
            purchase_order_id,
            grn_id,
            is_active: true,
        })
    }

    pub fn id(&self) -> BatchId {
        self.id
    }

    pub fn product_id(&self) -> ProductId {
        self.product_id
    }

    pub fn batch_number(&self) -> Option<&str> {
        self.batch_number.as_deref()
    }

    pub fn quantity(&self) -> i64 {
        self.quantity
    }

    pub fn available_quantity(&self) -> i64 {
        self.available_quantity
    }

    pub fn unit_cost(&self) -> Decimal {
        self.unit_cost
    }

    pub fn received_date(&self) -> DateTime<Utc> {
        self.received_date
    }

    pub fn expiry_date(&self) -> Option<DateTime<Utc>> {
        self.expiry_date
    }

    pub fn purchase_order_id(&self) -> Option<PurchaseOrderId> {
        self.purchase_order_id
    }

    pub fn grn_id(&self) -> GrnId {
        self.grn_id
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    /// Consume up to `qty` units from this lot; returns the quantity actually
    /// consumed. Exhausted lots are deactivated, never removed.
    pub fn consume(&mut self, qty: i64) -> i64 {
        let consumed = qty.clamp(0, self.available_quantity);
        self.available_quantity -= consumed;
        if self.available_quantity == 0 {
            self.is_active = false;
        }
        consumed
    }

    /// Mark a lot void (e.g. damaged/recalled) without deleting it.
    pub fn deactivate(&mut self) {
        self.is_active = false;
    }

    /// Whether the lot expires within `[now, now + days]`.
    pub fn is_expiring_soon(&self, now: DateTime<Utc>, days: i64) -> bool {
        match self.expiry_date {
            Some(expiry) => expiry >= now && expiry <= now + chrono::Duration::days(days),
            None => false,
        }
    }

    /// Whole days until expiry (negative when already expired).
    pub fn days_until_expiry(&self, now: DateTime<Utc>) -> Option<i64> {
        self.expiry_date.map(|expiry| (expiry - now).num_days())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use core::str::FromStr;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn batch(qty: i64, expiry_in_days: Option<i64>) -> Batch {
        let now = Utc::now();
        Batch::new(
            ProductId::new(),
            qty,
            d("12.50"),
            now,
            expiry_in_days.map(|days| now + Duration::days(days)),
            Some("LOT-42".to_string()),
            None,
            GrnId::new(),
        )
        .unwrap()
    }

    #[test]
    fn new_batch_is_fully_available_and_active() {
        let batch = batch(40, None);
        assert_eq!(batch.quantity(), 40);
        assert_eq!(batch.available_quantity(), 40);
        assert!(batch.is_active());
    }

    #[test]
    fn non_positive_quantity_is_rejected() {
        let err = Batch::new(
            ProductId::new(),
            0,
            Decimal::ONE,
            Utc::now(),
            None,
            None,
            None,
            GrnId::new(),
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn consume_is_capped_and_deactivates_exhausted_lot() {
        let mut batch = batch(10, None);
        assert_eq!(batch.consume(6), 6);
        assert_eq!(batch.available_quantity(), 4);
        assert!(batch.is_active());

        assert_eq!(batch.consume(9), 4);
        assert_eq!(batch.available_quantity(), 0);
        assert!(!batch.is_active());
    }

    #[test]
    fn expiring_soon_window_is_inclusive() {
        let now = Utc::now();
        let in_window = batch(5, Some(7));
        let outside = batch(5, Some(31));
        let no_expiry = batch(5, None);

        assert!(in_window.is_expiring_soon(now, 30));
        assert!(!outside.is_expiring_soon(now, 30));
        assert!(!no_expiry.is_expiring_soon(now, 30));
    }

    #[test]
    fn already_expired_lot_is_not_expiring_soon() {
        let now = Utc::now();
        let expired = batch(5, Some(-1));
        assert!(!expired.is_expiring_soon(now, 30));
        assert!(expired.days_until_expiry(now).unwrap() < 0);
    }
}
