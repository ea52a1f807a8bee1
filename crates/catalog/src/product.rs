//! Product catalog lookup.

use std::collections::HashMap;
use std::sync::RwLock;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use kirana_core::{CategoryId, ProductId};

/// GST rate snapshot, split into its CGST and SGST components.
///
/// Intra-state retail splits the slab evenly (e.g. the 18% slab is
/// 9% CGST + 9% SGST).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GstRate {
    /// Central GST component, in percent.
    pub cgst: Decimal,
    /// State GST component, in percent.
    pub sgst: Decimal,
}

impl GstRate {
    /// Split a total slab rate evenly into CGST and SGST halves.
    pub fn of_total(total: Decimal) -> Self {
        let half = total / Decimal::TWO;
        Self { cgst: half, sgst: half }
    }

    pub fn zero() -> Self {
        Self {
            cgst: Decimal::ZERO,
            sgst: Decimal::ZERO,
        }
    }

    pub fn total(&self) -> Decimal {
        self.cgst + self.sgst
    }
}

/// Catalog view of a product, as consumed by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductInfo {
    pub id: ProductId,
    pub sku: String,
    pub name: String,
    pub category_id: Option<CategoryId>,
    /// Catalog selling price (used when no per-line override is supplied).
    pub unit_price: Decimal,
    pub gst_rate: GstRate,
    /// Available quantity at or below which a replenishment alert fires.
    pub low_stock_threshold: i64,
    /// Quantity at which purchasing should reorder.
    pub reorder_threshold: i64,
    pub is_active: bool,
}

/// Read-only product lookup (external collaborator).
pub trait ProductCatalog: Send + Sync {
    fn product(&self, id: ProductId) -> Option<ProductInfo>;
}

/// In-memory catalog for tests and database-less embedding.
#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    products: RwLock<HashMap<ProductId, ProductInfo>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert(&self, product: ProductInfo) {
        if let Ok(mut products) = self.products.write() {
            products.insert(product.id, product);
        }
    }
}

impl ProductCatalog for InMemoryCatalog {
    fn product(&self, id: ProductId) -> Option<ProductInfo> {
        self.products.read().ok()?.get(&id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::str::FromStr;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn gst_rate_splits_the_slab_evenly() {
        let rate = GstRate::of_total(d("18"));
        assert_eq!(rate.cgst, d("9"));
        assert_eq!(rate.sgst, d("9"));
        assert_eq!(rate.total(), d("18"));
    }

    #[test]
    fn catalog_lookup_returns_upserted_product() {
        let catalog = InMemoryCatalog::new();
        let id = ProductId::new();
        catalog.upsert(ProductInfo {
            id,
            sku: "RICE-5KG".to_string(),
            name: "Basmati Rice 5kg".to_string(),
            category_id: None,
            unit_price: d("450.00"),
            gst_rate: GstRate::of_total(d("5")),
            low_stock_threshold: 10,
            reorder_threshold: 20,
            is_active: true,
        });

        let found = catalog.product(id).unwrap();
        assert_eq!(found.sku, "RICE-5KG");
        assert!(catalog.product(ProductId::new()).is_none());
    }
}
