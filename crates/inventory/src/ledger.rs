//! Per-product aggregate stock state.

use serde::{Deserialize, Serialize};

use kirana_core::{DomainError, DomainResult, ProductId};

/// Aggregate quantity state for one product.
///
/// Invariants: `quantity_on_hand >= 0`, `reserved_quantity >= 0`,
/// `available() >= 0`. Entries are created lazily on first stock movement and
/// never deleted. Availability is re-checked at the instant of every mutation;
/// a pre-check elsewhere is never trusted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockLedgerEntry {
    product_id: ProductId,
    quantity_on_hand: i64,
    reserved_quantity: i64,
}

impl StockLedgerEntry {
    pub fn new(product_id: ProductId) -> Self {
        Self {
            product_id,
            quantity_on_hand: 0,
            reserved_quantity: 0,
        }
    }

    pub fn product_id(&self) -> ProductId {
        self.product_id
    }

    pub fn quantity_on_hand(&self) -> i64 {
        self.quantity_on_hand
    }

    pub fn reserved_quantity(&self) -> i64 {
        self.reserved_quantity
    }

    /// On-hand stock minus reservations.
    pub fn available(&self) -> i64 {
        self.quantity_on_hand - self.reserved_quantity
    }

    /// Set aside `qty` units for a pending operation.
    pub fn reserve(&mut self, qty: i64) -> DomainResult<()> {
        ensure_positive(qty)?;
        if qty > self.available() {
            return Err(DomainError::insufficient_stock(
                self.product_id,
                qty,
                self.available(),
            ));
        }
        self.reserved_quantity += qty;
        Ok(())
    }

    /// Return `qty` previously reserved units to availability.
    pub fn release(&mut self, qty: i64) -> DomainResult<()> {
        ensure_positive(qty)?;
        if qty > self.reserved_quantity {
            return Err(DomainError::validation(format!(
                "cannot release {qty} units, only {} reserved",
                self.reserved_quantity
            )));
        }
        self.reserved_quantity -= qty;
        Ok(())
    }

    /// Remove `qty` units of on-hand stock.
    ///
    /// Availability is checked here, at the instant of mutation, so the gap
    /// between an earlier validation read and this write cannot oversell.
    pub fn deduct(&mut self, qty: i64) -> DomainResult<()> {
        ensure_positive(qty)?;
        if qty > self.available() {
            return Err(DomainError::insufficient_stock(
                self.product_id,
                qty,
                self.available(),
            ));
        }
        self.quantity_on_hand -= qty;
        Ok(())
    }

    /// Add `qty` units of on-hand stock.
    pub fn increase(&mut self, qty: i64) -> DomainResult<()> {
        ensure_positive(qty)?;
        self.quantity_on_hand += qty;
        Ok(())
    }
}

fn ensure_positive(qty: i64) -> DomainResult<()> {
    if qty <= 0 {
        return Err(DomainError::validation("quantity must be positive"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry_with_stock(qty: i64) -> StockLedgerEntry {
        let mut entry = StockLedgerEntry::new(ProductId::new());
        entry.increase(qty).unwrap();
        entry
    }

    #[test]
    fn new_entry_starts_empty() {
        let entry = StockLedgerEntry::new(ProductId::new());
        assert_eq!(entry.quantity_on_hand(), 0);
        assert_eq!(entry.reserved_quantity(), 0);
        assert_eq!(entry.available(), 0);
    }

    #[test]
    fn deduct_within_availability_succeeds() {
        let mut entry = entry_with_stock(10);
        entry.deduct(7).unwrap();
        assert_eq!(entry.quantity_on_hand(), 3);
        assert_eq!(entry.available(), 3);
    }

    #[test]
    fn deduct_beyond_availability_fails_and_leaves_state_intact() {
        let mut entry = entry_with_stock(5);
        let err = entry.deduct(6).unwrap_err();
        match err {
            DomainError::InsufficientStock {
                requested,
                available,
                ..
            } => {
                assert_eq!(requested, 6);
                assert_eq!(available, 5);
            }
            _ => panic!("Expected InsufficientStock"),
        }
        assert_eq!(entry.quantity_on_hand(), 5);
    }

    #[test]
    fn reservations_reduce_availability_but_not_on_hand() {
        let mut entry = entry_with_stock(10);
        entry.reserve(4).unwrap();
        assert_eq!(entry.quantity_on_hand(), 10);
        assert_eq!(entry.available(), 6);

        // Deducting more than the unreserved remainder fails.
        assert!(entry.deduct(7).is_err());

        entry.release(4).unwrap();
        assert_eq!(entry.available(), 10);
        entry.deduct(7).unwrap();
    }

    #[test]
    fn release_cannot_exceed_reserved() {
        let mut entry = entry_with_stock(10);
        entry.reserve(2).unwrap();
        let err = entry.release(3).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn non_positive_quantities_are_rejected() {
        let mut entry = entry_with_stock(10);
        assert!(entry.deduct(0).is_err());
        assert!(entry.increase(-1).is_err());
        assert!(entry.reserve(0).is_err());
    }
}
