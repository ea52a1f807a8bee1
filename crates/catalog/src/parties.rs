//! Supplier/customer/purchase-order existence checks.
//!
//! The engine never mutates parties; it only verifies that references exist
//! before committing a transaction that points at them.

use std::collections::HashSet;
use std::sync::RwLock;

use kirana_core::{CustomerId, PurchaseOrderId, SupplierId};

/// Read-only party lookups (external collaborator).
pub trait PartyDirectory: Send + Sync {
    fn supplier_exists(&self, id: SupplierId) -> bool;
    fn customer_exists(&self, id: CustomerId) -> bool;
    fn purchase_order_exists(&self, id: PurchaseOrderId) -> bool;
}

/// In-memory directory for tests and database-less embedding.
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    suppliers: RwLock<HashSet<SupplierId>>,
    customers: RwLock<HashSet<CustomerId>>,
    purchase_orders: RwLock<HashSet<PurchaseOrderId>>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_supplier(&self, id: SupplierId) {
        if let Ok(mut suppliers) = self.suppliers.write() {
            suppliers.insert(id);
        }
    }

    pub fn add_customer(&self, id: CustomerId) {
        if let Ok(mut customers) = self.customers.write() {
            customers.insert(id);
        }
    }

    pub fn add_purchase_order(&self, id: PurchaseOrderId) {
        if let Ok(mut orders) = self.purchase_orders.write() {
            orders.insert(id);
        }
    }
}

impl PartyDirectory for InMemoryDirectory {
    fn supplier_exists(&self, id: SupplierId) -> bool {
        self.suppliers.read().map(|s| s.contains(&id)).unwrap_or(false)
    }

    fn customer_exists(&self, id: CustomerId) -> bool {
        self.customers.read().map(|c| c.contains(&id)).unwrap_or(false)
    }

    fn purchase_order_exists(&self, id: PurchaseOrderId) -> bool {
        self.purchase_orders
            .read()
            .map(|p| p.contains(&id))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directory_tracks_registered_parties() {
        let directory = InMemoryDirectory::new();
        let supplier = SupplierId::new();
        let customer = CustomerId::new();

        directory.add_supplier(supplier);
        directory.add_customer(customer);

        assert!(directory.supplier_exists(supplier));
        assert!(directory.customer_exists(customer));
        assert!(!directory.supplier_exists(SupplierId::new()));
        assert!(!directory.purchase_order_exists(PurchaseOrderId::new()));
    }
}
