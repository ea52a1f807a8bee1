//! Direct stock operations outside the sale/GRN flows.
//!
//! Manual adjustments (stock-take corrections, damage write-offs), customer
//! return restocking and soft reservations. Every on-hand mutation writes its
//! audit row in the same transaction; reservations move only the reserved
//! counter and are not audited.

use std::sync::Arc;

use tracing::{info, instrument};

use kirana_catalog::ProductCatalog;
use kirana_core::{DomainError, DomainResult, OperationContext, ProductId, SaleId};
use kirana_events::{DomainEvent, EventOrchestrator, LowStock};
use kirana_inventory::{AdjustmentType, AuditReference, InventoryAudit, StockLedgerEntry};
use kirana_sales::SaleStatus;

use crate::idempotency::{KeyCheck, OperationKind};
use crate::store::{with_conflict_retry, InMemoryStore, DEFAULT_MAX_ATTEMPTS};

/// Manual and auxiliary stock operations.
pub struct StockService {
    store: Arc<InMemoryStore>,
    catalog: Arc<dyn ProductCatalog>,
    orchestrator: Arc<EventOrchestrator>,
}

impl StockService {
    pub fn new(
        store: Arc<InMemoryStore>,
        catalog: Arc<dyn ProductCatalog>,
        orchestrator: Arc<EventOrchestrator>,
    ) -> Self {
        Self {
            store,
            catalog,
            orchestrator,
        }
    }

    // Queries ----------------------------------------------------------------

    pub fn entry(&self, product_id: ProductId) -> DomainResult<Option<StockLedgerEntry>> {
        self.store.read(|state| state.entry(product_id).cloned())
    }

    pub fn available(&self, product_id: ProductId) -> DomainResult<i64> {
        self.store.read(|state| state.available(product_id))
    }

    /// Audit rows for a product, in recording order.
    pub fn audit_trail(&self, product_id: ProductId) -> DomainResult<Vec<InventoryAudit>> {
        self.store.read(|state| {
            state
                .audits_for(product_id)
                .into_iter()
                .cloned()
                .collect()
        })
    }

    // Mutations --------------------------------------------------------------

    /// Apply a signed manual correction to on-hand stock.
    ///
    /// Decreases are bounded by availability. An idempotency key makes the
    /// correction safe to retry: the second attempt returns the current entry
    /// without moving stock again.
    #[instrument(skip(self))]
    pub fn adjust(
        &self,
        ctx: &OperationContext,
        product_id: ProductId,
        delta: i64,
        idempotency_key: Option<&str>,
    ) -> DomainResult<StockLedgerEntry> {
        if delta == 0 {
            return Err(DomainError::validation("adjustment delta cannot be zero"));
        }
        let product = self.catalog.product(product_id).ok_or_else(|| {
            DomainError::not_found(format!("product {product_id} does not exist"))
        })?;

        let (entry, events) = with_conflict_retry(DEFAULT_MAX_ATTEMPTS, || {
            self.store.transact(|state| {
                if let Some(key) = idempotency_key {
                    if let KeyCheck::Replay(_) = state
                        .idempotency()
                        .check(OperationKind::StockAdjustment, key)?
                    {
                        let entry = state.entry_mut(product_id).clone();
                        return Ok((entry, Vec::new()));
                    }
                }

                let entry = state.entry_mut(product_id);
                let before = entry.quantity_on_hand();
                if delta > 0 {
                    entry.increase(delta)?;
                } else {
                    entry.deduct(-delta)?;
                }
                let after = entry.quantity_on_hand();

                let audit = InventoryAudit::record(
                    product_id,
                    AdjustmentType::ManualAdjustment,
                    before,
                    after,
                    AuditReference::Manual,
                    ctx.actor,
                    ctx.occurred_at,
                );
                let audit_id = audit.id();
                state.push_audit(audit);

                if let Some(key) = idempotency_key {
                    state.idempotency_mut().record(
                        OperationKind::StockAdjustment,
                        key,
                        audit_id,
                        ctx.occurred_at,
                    );
                }

                let mut events = Vec::new();
                let available = state.available(product_id);
                if delta < 0 && available <= product.low_stock_threshold {
                    events.push(DomainEvent::LowStock(LowStock {
                        product_id,
                        product_name: product.name.clone(),
                        sku: product.sku.clone(),
                        current_stock: available,
                        threshold: product.low_stock_threshold,
                        occurred_at: ctx.occurred_at,
                    }));
                }
                let entry = state.entry_mut(product_id).clone();
                Ok((entry, events))
            })
        })?;

        info!(product = %product_id, delta, "stock adjusted");
        self.orchestrator.publish_all(events);
        Ok(entry)
    }

    /// Put returned goods from a completed sale back on the shelf.
    #[instrument(skip(self))]
    pub fn restock_return(
        &self,
        ctx: &OperationContext,
        product_id: ProductId,
        quantity: i64,
        sale_id: SaleId,
    ) -> DomainResult<StockLedgerEntry> {
        if self.catalog.product(product_id).is_none() {
            return Err(DomainError::not_found(format!(
                "product {product_id} does not exist"
            )));
        }

        let entry = self.store.transact(|state| {
            let sale = state
                .sale(sale_id)
                .ok_or_else(|| DomainError::not_found(format!("sale {sale_id} does not exist")))?;
            if sale.status() != SaleStatus::Completed {
                return Err(DomainError::invalid_transition(
                    "only completed sales can be returned",
                ));
            }
            let sold: i64 = sale
                .items()
                .iter()
                .filter(|i| i.product_id() == product_id)
                .map(|i| i.quantity())
                .sum();
            if sold == 0 {
                return Err(DomainError::validation(
                    "the sale does not contain this product",
                ));
            }
            if quantity > sold {
                return Err(DomainError::validation(format!(
                    "cannot return {quantity} units, the sale only had {sold}"
                )));
            }

            let entry = state.entry_mut(product_id);
            let before = entry.quantity_on_hand();
            entry.increase(quantity)?;
            let after = entry.quantity_on_hand();
            state.push_audit(InventoryAudit::record(
                product_id,
                AdjustmentType::Return,
                before,
                after,
                AuditReference::Sale(sale_id),
                ctx.actor,
                ctx.occurred_at,
            ));
            Ok(state.entry_mut(product_id).clone())
        })?;

        info!(product = %product_id, quantity, "return restocked");
        Ok(entry)
    }

    /// Soft-reserve units for a pending order. Reserved stock stays on hand
    /// but is not available to sales.
    pub fn reserve(&self, product_id: ProductId, quantity: i64) -> DomainResult<StockLedgerEntry> {
        self.store.transact(|state| {
            let entry = state.entry_mut(product_id);
            entry.reserve(quantity)?;
            Ok(entry.clone())
        })
    }

    /// Release previously reserved units back to availability.
    pub fn release(&self, product_id: ProductId, quantity: i64) -> DomainResult<StockLedgerEntry> {
        self.store.transact(|state| {
            let entry = state.entry_mut(product_id);
            entry.release(quantity)?;
            Ok(entry.clone())
        })
    }
}
