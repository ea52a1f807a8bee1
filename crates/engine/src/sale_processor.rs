//! Transactional sale processing.
//!
//! One sale is one transaction: pricing, availability re-check, ledger
//! deduction, FIFO lot consumption, audit rows and the invoice itself either
//! all commit or none do. Events are published only after the commit.

use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::{info, instrument};

use kirana_catalog::{OfferResolver, PartyDirectory, ProductCatalog, ProductInfo};
use kirana_core::{
    CustomerId, DomainError, DomainResult, OperationContext, ProductId, SaleId,
};
use kirana_events::{
    DomainEvent, EventOrchestrator, LowStock, SaleCompleted, SaleItemSnapshot,
};
use kirana_inventory::{AdjustmentType, AuditReference, InventoryAudit};
use kirana_sales::{PaymentSplit, Sale, SaleItem};

use crate::store::{with_conflict_retry, InMemoryStore, StoreState, DEFAULT_MAX_ATTEMPTS};

/// One requested invoice line.
#[derive(Debug, Clone)]
pub struct SaleLine {
    pub product_id: ProductId,
    pub quantity: i64,
    /// Overrides the catalog price when set (counter haggling is real).
    pub price_override: Option<Decimal>,
}

/// A point-of-sale checkout request.
#[derive(Debug, Clone)]
pub struct SaleRequest {
    pub customer_id: Option<CustomerId>,
    pub lines: Vec<SaleLine>,
    pub payment: PaymentSplit,
}

/// Processes checkout requests against the store.
pub struct SaleProcessor {
    store: Arc<InMemoryStore>,
    catalog: Arc<dyn ProductCatalog>,
    offers: Arc<dyn OfferResolver>,
    directory: Arc<dyn PartyDirectory>,
    orchestrator: Arc<EventOrchestrator>,
}

impl SaleProcessor {
    pub fn new(
        store: Arc<InMemoryStore>,
        catalog: Arc<dyn ProductCatalog>,
        offers: Arc<dyn OfferResolver>,
        directory: Arc<dyn PartyDirectory>,
        orchestrator: Arc<EventOrchestrator>,
    ) -> Self {
        Self {
            store,
            catalog,
            offers,
            directory,
            orchestrator,
        }
    }

    /// Process a checkout: price the lines, deduct stock, write the audit
    /// trail and complete the invoice, atomically.
    ///
    /// On success the completed [`Sale`] is returned and `SaleCompleted`
    /// (plus any `LowStock`) events are queued on the orchestrator.
    #[instrument(skip(self, request), fields(lines = request.lines.len()))]
    pub fn process(&self, ctx: &OperationContext, request: SaleRequest) -> DomainResult<Sale> {
        if request.lines.is_empty() {
            return Err(DomainError::validation("a sale needs at least one line"));
        }
        if let Some(customer_id) = request.customer_id {
            if !self.directory.customer_exists(customer_id) {
                return Err(DomainError::not_found(format!(
                    "customer {customer_id} does not exist"
                )));
            }
        }

        let priced = self.price_lines(ctx, &request)?;

        let (sale, events) = with_conflict_retry(DEFAULT_MAX_ATTEMPTS, || {
            self.store
                .transact(|state| commit_sale(state, ctx, &request, &priced))
        })?;

        info!(
            invoice = sale.invoice_number(),
            total = %sale.total_amount(),
            "sale completed"
        );
        self.orchestrator.publish_all(events);
        Ok(sale)
    }

    /// Resolve products and offers and build the invoice lines. Read-only;
    /// runs outside the store transaction.
    fn price_lines(
        &self,
        ctx: &OperationContext,
        request: &SaleRequest,
    ) -> DomainResult<Vec<PricedLine>> {
        let mut priced = Vec::with_capacity(request.lines.len());
        for line in &request.lines {
            let product = self.catalog.product(line.product_id).ok_or_else(|| {
                DomainError::not_found(format!("product {} does not exist", line.product_id))
            })?;
            if !product.is_active {
                return Err(DomainError::validation(format!(
                    "product {} is not sellable",
                    product.sku
                )));
            }

            let unit_price = line.price_override.unwrap_or(product.unit_price);
            let offer = self.offers.find_applicable(
                product.id,
                product.category_id,
                line.quantity,
                ctx.occurred_at,
            );
            let (discount, offer_id) = match offer {
                Some(offer) => (offer.discount.amount(line.quantity, unit_price), Some(offer.id)),
                None => (Decimal::ZERO, None),
            };

            let item = SaleItem::new(&product, line.quantity, unit_price, discount, offer_id)?;
            priced.push(PricedLine { product, item });
        }
        Ok(priced)
    }
}

struct PricedLine {
    product: ProductInfo,
    item: SaleItem,
}

/// The transactional part of a sale. Runs under the store's write lock on a
/// working copy; any `Err` rolls the whole checkout back.
fn commit_sale(
    state: &mut StoreState,
    ctx: &OperationContext,
    request: &SaleRequest,
    priced: &[PricedLine],
) -> DomainResult<(Sale, Vec<DomainEvent>)> {
    let sale_id = SaleId::new();
    let invoice_number = state.next_invoice_number();

    // Payment split is validated against the derived total before any stock
    // moves.
    let mut sale = Sale::new(
        sale_id,
        invoice_number,
        request.customer_id,
        priced.iter().map(|p| p.item.clone()).collect(),
        request.payment,
        ctx.occurred_at,
    )?;

    let mut low_stock = Vec::new();
    for line in priced {
        let product_id = line.product.id;
        let quantity = line.item.quantity();

        let entry = state.entry_mut(product_id);
        let before = entry.quantity_on_hand();
        // Availability is re-checked here, inside the lock; stale catalog
        // reads cannot oversell.
        entry.deduct(quantity)?;
        let after = entry.quantity_on_hand();

        state.push_audit(InventoryAudit::record(
            product_id,
            AdjustmentType::Sale,
            before,
            after,
            AuditReference::Sale(sale_id),
            ctx.actor,
            ctx.occurred_at,
        ));
        state.consume_batches_fifo(product_id, quantity);

        let available = state.available(product_id);
        if available <= line.product.low_stock_threshold {
            low_stock.push(DomainEvent::LowStock(LowStock {
                product_id,
                product_name: line.product.name.clone(),
                sku: line.product.sku.clone(),
                current_stock: available,
                threshold: line.product.low_stock_threshold,
                occurred_at: ctx.occurred_at,
            }));
        }
    }

    sale.complete()?;
    state.insert_sale(sale.clone());

    let mut events = vec![DomainEvent::SaleCompleted(SaleCompleted {
        sale_id,
        invoice_number: sale.invoice_number().to_string(),
        sale_date: sale.sale_date(),
        total_amount: sale.total_amount(),
        items: sale
            .items()
            .iter()
            .map(|i| SaleItemSnapshot {
                product_id: i.product_id(),
                quantity: i.quantity(),
                unit_price: i.unit_price(),
            })
            .collect(),
    })];
    events.extend(low_stock);

    Ok((sale, events))
}
