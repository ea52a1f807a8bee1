//! Stock valuation over a consistent store snapshot.

use std::sync::Arc;

use kirana_core::{DomainResult, ProductId};
use kirana_inventory::{valuate, CostMethod, Valuation};

use crate::store::InMemoryStore;

/// Values current availability against lot cost layers.
pub struct ValuationService {
    store: Arc<InMemoryStore>,
}

impl ValuationService {
    pub fn new(store: Arc<InMemoryStore>) -> Self {
        Self { store }
    }

    /// Value a product's available stock under the given cost method.
    ///
    /// Ledger availability and lot layers are read under one lock, so a
    /// concurrent sale cannot produce a valuation that mixes pre- and
    /// post-sale state.
    pub fn valuate(&self, product_id: ProductId, method: CostMethod) -> DomainResult<Valuation> {
        self.store.read(|state| {
            let available = state.available(product_id);
            let batches = state.batches_for(product_id);
            valuate(product_id, &batches, available, method)
        })
    }

    /// Value every stocked product under one snapshot.
    ///
    /// Covers each product that ever had a stock movement, in a stable order;
    /// products whose availability has dropped to zero report empty layers
    /// rather than being skipped.
    pub fn valuate_all(&self, method: CostMethod) -> DomainResult<Vec<Valuation>> {
        self.store.read(|state| {
            let mut product_ids = state.stocked_products();
            product_ids.sort_by_key(|id| *id.as_uuid());
            product_ids
                .into_iter()
                .map(|product_id| {
                    let available = state.available(product_id);
                    let batches = state.batches_for(product_id);
                    valuate(product_id, &batches, available, method)
                })
                .collect()
        })
    }
}
