//! Transactional in-memory store.
//!
//! All engine state (ledger entries, lots, audit rows, sales, GRNs, the
//! idempotency guard and document sequences) lives behind one `RwLock`.
//! [`InMemoryStore::transact`] gives writers serializable all-or-nothing
//! semantics: the closure runs against a working copy under the write lock
//! and the copy replaces the live state only on `Ok`, so a failing multi-step
//! operation leaves no partial mutation behind.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};

use kirana_core::{BatchId, DomainError, DomainResult, GrnId, ProductId, SaleId};
use kirana_inventory::{fifo_order, Batch, InventoryAudit, StockLedgerEntry};
use kirana_receipts::GoodsReceiveNote;
use kirana_sales::Sale;

use crate::idempotency::IdempotencyGuard;

/// Default attempt count for [`with_conflict_retry`].
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// The complete mutable state of the engine.
///
/// Plain data, `Clone` on purpose: transactions work on a clone and swap it
/// in on success.
#[derive(Debug, Clone, Default)]
pub struct StoreState {
    ledger: HashMap<ProductId, StockLedgerEntry>,
    batches: HashMap<BatchId, Batch>,
    audits: Vec<InventoryAudit>,
    sales: HashMap<SaleId, Sale>,
    grns: HashMap<GrnId, GoodsReceiveNote>,
    idempotency: IdempotencyGuard,
    invoice_seq: u64,
    grn_seq: u64,
}

impl StoreState {
    // Ledger -----------------------------------------------------------------

    pub fn entry(&self, product_id: ProductId) -> Option<&StockLedgerEntry> {
        self.ledger.get(&product_id)
    }

    /// Ledger entry for a product, created empty on first touch.
    pub fn entry_mut(&mut self, product_id: ProductId) -> &mut StockLedgerEntry {
        self.ledger
            .entry(product_id)
            .or_insert_with(|| StockLedgerEntry::new(product_id))
    }

    /// Every product with a ledger entry, i.e. anything that ever moved.
    pub fn stocked_products(&self) -> Vec<ProductId> {
        self.ledger.keys().copied().collect()
    }

    /// Available quantity; zero for products without an entry.
    pub fn available(&self, product_id: ProductId) -> i64 {
        self.ledger
            .get(&product_id)
            .map(|e| e.available())
            .unwrap_or(0)
    }

    // Lots -------------------------------------------------------------------

    pub fn insert_batch(&mut self, batch: Batch) {
        self.batches.insert(batch.id(), batch);
    }

    pub fn batch(&self, id: BatchId) -> Option<&Batch> {
        self.batches.get(&id)
    }

    /// Cloned active-and-available lots of a product, FIFO order.
    pub fn batches_for(&self, product_id: ProductId) -> Vec<Batch> {
        let mut lots: Vec<Batch> = self
            .batches
            .values()
            .filter(|b| b.product_id() == product_id)
            .cloned()
            .collect();
        lots.sort_by(fifo_order);
        lots
    }

    /// Consume `qty` units from a product's lots in FIFO order.
    ///
    /// Returns the quantity actually covered by lots. Lot data can lag the
    /// ledger (opening stock, manual adjustments), so a shortfall is not an
    /// error: the ledger remains authoritative for availability.
    pub fn consume_batches_fifo(&mut self, product_id: ProductId, qty: i64) -> i64 {
        let mut lots: Vec<&mut Batch> = self
            .batches
            .values_mut()
            .filter(|b| b.product_id() == product_id && b.is_active() && b.available_quantity() > 0)
            .collect();
        lots.sort_by(|a, b| fifo_order(a, b));

        let mut remaining = qty.max(0);
        let mut consumed = 0;
        for lot in lots {
            if remaining == 0 {
                break;
            }
            let taken = lot.consume(remaining);
            consumed += taken;
            remaining -= taken;
        }
        consumed
    }

    /// Active lots whose expiry falls within `[now, now + window_days]`.
    pub fn expiring_batches(&self, now: DateTime<Utc>, window_days: i64) -> Vec<Batch> {
        let mut lots: Vec<Batch> = self
            .batches
            .values()
            .filter(|b| b.is_active() && b.is_expiring_soon(now, window_days))
            .cloned()
            .collect();
        lots.sort_by(fifo_order);
        lots
    }

    // Audit trail ------------------------------------------------------------

    pub fn push_audit(&mut self, audit: InventoryAudit) {
        self.audits.push(audit);
    }

    pub fn audits_for(&self, product_id: ProductId) -> Vec<&InventoryAudit> {
        self.audits
            .iter()
            .filter(|a| a.product_id() == product_id)
            .collect()
    }

    pub fn audit_count(&self) -> usize {
        self.audits.len()
    }

    // Documents --------------------------------------------------------------

    pub fn insert_sale(&mut self, sale: Sale) {
        self.sales.insert(sale.id(), sale);
    }

    pub fn sale(&self, id: SaleId) -> Option<&Sale> {
        self.sales.get(&id)
    }

    pub fn insert_grn(&mut self, grn: GoodsReceiveNote) {
        self.grns.insert(grn.id(), grn);
    }

    pub fn grn(&self, id: GrnId) -> Option<&GoodsReceiveNote> {
        self.grns.get(&id)
    }

    /// Next invoice number, e.g. `INV-000001`. Consumed only by committed
    /// transactions: a rolled-back sale never burns a number.
    pub fn next_invoice_number(&mut self) -> String {
        self.invoice_seq += 1;
        format!("INV-{:06}", self.invoice_seq)
    }

    /// Next GRN number, e.g. `GRN-000001`.
    pub fn next_grn_number(&mut self) -> String {
        self.grn_seq += 1;
        format!("GRN-{:06}", self.grn_seq)
    }

    // Idempotency ------------------------------------------------------------

    pub fn idempotency(&self) -> &IdempotencyGuard {
        &self.idempotency
    }

    pub fn idempotency_mut(&mut self) -> &mut IdempotencyGuard {
        &mut self.idempotency
    }
}

/// Lock-guarded store with copy-on-write transactions.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: RwLock<StoreState>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run a read-only closure against a consistent snapshot.
    pub fn read<R>(&self, f: impl FnOnce(&StoreState) -> R) -> DomainResult<R> {
        let state = self
            .state
            .read()
            .map_err(|_| DomainError::conflict("store lock poisoned"))?;
        Ok(f(&state))
    }

    /// Run a mutating closure transactionally.
    ///
    /// The closure receives a working copy of the state; the copy becomes the
    /// live state only when the closure returns `Ok`. On `Err` the copy is
    /// dropped and no mutation is visible. The write lock is held for the
    /// whole closure, which serializes writers: validation reads inside the
    /// closure cannot be invalidated by a concurrent commit.
    pub fn transact<R>(
        &self,
        f: impl FnOnce(&mut StoreState) -> DomainResult<R>,
    ) -> DomainResult<R> {
        let mut live = self
            .state
            .write()
            .map_err(|_| DomainError::conflict("store lock poisoned"))?;
        let mut working = live.clone();
        let value = f(&mut working)?;
        *live = working;
        Ok(value)
    }
}

/// Re-run `operation` while it fails with a retryable error, up to
/// `max_attempts` total attempts. Non-retryable errors pass through
/// immediately.
pub fn with_conflict_retry<R>(
    max_attempts: u32,
    mut operation: impl FnMut() -> DomainResult<R>,
) -> DomainResult<R> {
    let mut attempt = 1;
    loop {
        match operation() {
            Err(error) if error.is_retryable() && attempt < max_attempts => {
                tracing::debug!(attempt, %error, "retrying after transient conflict");
                attempt += 1;
            }
            other => return other,
        }
    }
}
