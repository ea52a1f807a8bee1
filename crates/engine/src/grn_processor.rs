//! Goods-receipt (GRN) lifecycle processing.
//!
//! Confirmation is the only path that creates stock: it turns each received
//! line into a lot, increases the ledger and writes purchase audit rows, all
//! in one transaction. A GRN carrying an idempotency key can be confirmed
//! repeatedly; attempts after the first replay the original outcome and
//! publish nothing.

use std::sync::Arc;

use tracing::{info, instrument, warn};

use kirana_catalog::{PartyDirectory, ProductCatalog, ProductInfo};
use kirana_core::{DomainError, DomainResult, GrnId, OperationContext};
use kirana_events::{
    DomainEvent, EventOrchestrator, ExpirySoon, GrnConfirmed, GrnItemSnapshot, LowStock,
};
use kirana_inventory::{AdjustmentType, AuditReference, Batch, InventoryAudit};
use kirana_receipts::{GoodsReceiveNote, GrnItem};

use crate::idempotency::{validate_key, KeyCheck, OperationKind};
use crate::store::{with_conflict_retry, InMemoryStore, StoreState, DEFAULT_MAX_ATTEMPTS};

/// A request to register received supplier goods.
#[derive(Debug, Clone)]
pub struct GrnDraftRequest {
    pub supplier_id: kirana_core::SupplierId,
    pub purchase_order_id: Option<kirana_core::PurchaseOrderId>,
    pub items: Vec<GrnItem>,
    /// Dedupes retried confirmations of this GRN when present.
    pub idempotency_key: Option<String>,
}

/// Result of a confirmation attempt.
#[derive(Debug, Clone)]
pub struct ConfirmOutcome {
    pub grn: GoodsReceiveNote,
    /// True when a prior confirmation with the same idempotency key already
    /// did the work and this attempt mutated nothing.
    pub replayed: bool,
}

/// Processes GRN drafts, confirmations and cancellations.
pub struct GrnProcessor {
    store: Arc<InMemoryStore>,
    catalog: Arc<dyn ProductCatalog>,
    directory: Arc<dyn PartyDirectory>,
    orchestrator: Arc<EventOrchestrator>,
    expiry_window_days: i64,
}

impl GrnProcessor {
    /// Lots expiring within this many days of confirmation raise an
    /// `ExpirySoon` alert immediately.
    pub const DEFAULT_EXPIRY_WINDOW_DAYS: i64 = 30;

    pub fn new(
        store: Arc<InMemoryStore>,
        catalog: Arc<dyn ProductCatalog>,
        directory: Arc<dyn PartyDirectory>,
        orchestrator: Arc<EventOrchestrator>,
    ) -> Self {
        Self {
            store,
            catalog,
            directory,
            orchestrator,
            expiry_window_days: Self::DEFAULT_EXPIRY_WINDOW_DAYS,
        }
    }

    pub fn with_expiry_window(mut self, days: i64) -> Self {
        self.expiry_window_days = days;
        self
    }

    /// Register a draft GRN. No stock moves until confirmation.
    #[instrument(skip(self, request), fields(items = request.items.len()))]
    pub fn create_draft(
        &self,
        ctx: &OperationContext,
        request: GrnDraftRequest,
    ) -> DomainResult<GoodsReceiveNote> {
        if let Some(key) = &request.idempotency_key {
            validate_key(key)?;
        }
        if !self.directory.supplier_exists(request.supplier_id) {
            return Err(DomainError::not_found(format!(
                "supplier {} does not exist",
                request.supplier_id
            )));
        }
        if let Some(po_id) = request.purchase_order_id {
            if !self.directory.purchase_order_exists(po_id) {
                return Err(DomainError::not_found(format!(
                    "purchase order {po_id} does not exist"
                )));
            }
        }
        for item in &request.items {
            if self.catalog.product(item.product_id).is_none() {
                return Err(DomainError::not_found(format!(
                    "product {} does not exist",
                    item.product_id
                )));
            }
        }

        let grn = self.store.transact(|state| {
            let grn_number = state.next_grn_number();
            let grn = GoodsReceiveNote::new(
                GrnId::new(),
                grn_number,
                request.supplier_id,
                request.purchase_order_id,
                request.items.clone(),
                request.idempotency_key.clone(),
                ctx.occurred_at,
            )?;
            state.insert_grn(grn.clone());
            Ok(grn)
        })?;

        info!(grn = grn.grn_number(), "GRN draft registered");
        Ok(grn)
    }

    /// Confirm a draft GRN: create its lots, increase stock, audit.
    ///
    /// Retries of a keyed GRN replay the first confirmation (no mutation, no
    /// events). Confirming an unkeyed non-draft GRN fails with
    /// `InvalidStateTransition`.
    #[instrument(skip(self))]
    pub fn confirm(&self, ctx: &OperationContext, grn_id: GrnId) -> DomainResult<ConfirmOutcome> {
        let (outcome, events) = with_conflict_retry(DEFAULT_MAX_ATTEMPTS, || {
            self.store
                .transact(|state| self.commit_confirmation(state, ctx, grn_id))
        })?;

        if outcome.replayed {
            info!(grn = outcome.grn.grn_number(), "confirmation replayed");
        } else {
            info!(
                grn = outcome.grn.grn_number(),
                total = %outcome.grn.total_amount(),
                "GRN confirmed"
            );
            self.orchestrator.publish_all(events);
        }
        Ok(outcome)
    }

    fn commit_confirmation(
        &self,
        state: &mut StoreState,
        ctx: &OperationContext,
        grn_id: GrnId,
    ) -> DomainResult<(ConfirmOutcome, Vec<DomainEvent>)> {
        let mut grn = state
            .grn(grn_id)
            .cloned()
            .ok_or_else(|| DomainError::not_found(format!("GRN {grn_id} does not exist")))?;

        if let Some(key) = grn.idempotency_key() {
            if let KeyCheck::Replay(result_id) = state
                .idempotency()
                .check(OperationKind::GrnConfirmation, key)?
            {
                let prior_id = GrnId::from_uuid(result_id);
                let prior = state.grn(prior_id).cloned().ok_or_else(|| {
                    DomainError::not_found(format!(
                        "originally confirmed GRN {prior_id} is missing"
                    ))
                })?;
                return Ok((
                    ConfirmOutcome {
                        grn: prior,
                        replayed: true,
                    },
                    Vec::new(),
                ));
            }
        }

        grn.confirm(ctx.occurred_at)?;

        // References are re-verified at confirmation time; the draft may
        // predate a supplier or product being retired.
        if !self.directory.supplier_exists(grn.supplier_id()) {
            return Err(DomainError::not_found(format!(
                "supplier {} does not exist",
                grn.supplier_id()
            )));
        }
        if let Some(po_id) = grn.purchase_order_id() {
            if !self.directory.purchase_order_exists(po_id) {
                return Err(DomainError::not_found(format!(
                    "purchase order {po_id} does not exist"
                )));
            }
        }
        let mut products = Vec::with_capacity(grn.items().len());
        for item in grn.items() {
            let product = self.catalog.product(item.product_id).ok_or_else(|| {
                DomainError::not_found(format!("product {} does not exist", item.product_id))
            })?;
            products.push(product);
        }

        let mut low_stock = Vec::new();
        let mut expiring = Vec::new();
        for (item, product) in grn.items().iter().zip(&products) {
            let batch = Batch::new(
                item.product_id,
                item.quantity,
                item.unit_cost,
                grn.received_date(),
                item.expiry_date,
                item.batch_number.clone(),
                grn.purchase_order_id(),
                grn.id(),
            )?;
            if batch.is_expiring_soon(ctx.occurred_at, self.expiry_window_days) {
                expiring.push(expiry_event(&batch, product, ctx));
            }
            state.insert_batch(batch);

            let entry = state.entry_mut(item.product_id);
            let before = entry.quantity_on_hand();
            entry.increase(item.quantity)?;
            let after = entry.quantity_on_hand();
            state.push_audit(InventoryAudit::record(
                item.product_id,
                AdjustmentType::Purchase,
                before,
                after,
                AuditReference::Grn(grn.id()),
                ctx.actor,
                ctx.occurred_at,
            ));

            // Receipts normally lift stock out of the alert band, but a small
            // delivery can still leave it at or under the threshold.
            let available = state.available(item.product_id);
            if available <= product.low_stock_threshold {
                low_stock.push(DomainEvent::LowStock(LowStock {
                    product_id: item.product_id,
                    product_name: product.name.clone(),
                    sku: product.sku.clone(),
                    current_stock: available,
                    threshold: product.low_stock_threshold,
                    occurred_at: ctx.occurred_at,
                }));
            }
        }

        if let Some(key) = grn.idempotency_key() {
            state.idempotency_mut().record(
                OperationKind::GrnConfirmation,
                key,
                *grn.id().as_uuid(),
                ctx.occurred_at,
            );
        }
        state.insert_grn(grn.clone());

        let mut events = vec![DomainEvent::GrnConfirmed(GrnConfirmed {
            grn_id: grn.id(),
            grn_number: grn.grn_number().to_string(),
            supplier_id: grn.supplier_id(),
            purchase_order_id: grn.purchase_order_id(),
            confirmed_date: ctx.occurred_at,
            total_amount: grn.total_amount(),
            items: grn
                .items()
                .iter()
                .map(|i| GrnItemSnapshot {
                    product_id: i.product_id,
                    quantity: i.quantity,
                    unit_cost: i.unit_cost,
                    expiry_date: i.expiry_date,
                    batch_number: i.batch_number.clone(),
                })
                .collect(),
        })];
        events.extend(low_stock);
        events.extend(expiring);

        Ok((
            ConfirmOutcome {
                grn,
                replayed: false,
            },
            events,
        ))
    }

    /// Cancel a draft GRN. Terminal; no stock ever moved for it.
    #[instrument(skip(self))]
    pub fn cancel(&self, ctx: &OperationContext, grn_id: GrnId) -> DomainResult<GoodsReceiveNote> {
        let grn = self.store.transact(|state| {
            let mut grn = state
                .grn(grn_id)
                .cloned()
                .ok_or_else(|| DomainError::not_found(format!("GRN {grn_id} does not exist")))?;
            grn.cancel()?;
            state.insert_grn(grn.clone());
            Ok(grn)
        })?;
        warn!(grn = grn.grn_number(), actor = %ctx.actor, "GRN cancelled");
        Ok(grn)
    }
}

fn expiry_event(batch: &Batch, product: &ProductInfo, ctx: &OperationContext) -> DomainEvent {
    DomainEvent::ExpirySoon(ExpirySoon {
        product_id: batch.product_id(),
        product_name: product.name.clone(),
        sku: product.sku.clone(),
        batch_id: batch.id(),
        expiry_date: batch.expiry_date().unwrap_or(ctx.occurred_at),
        days_until_expiry: batch.days_until_expiry(ctx.occurred_at).unwrap_or(0),
        occurred_at: ctx.occurred_at,
    })
}
