//! Offer/discount resolution.
//!
//! First match wins; offers never stack. The resolver is read-only from the
//! engine's point of view.

use std::sync::RwLock;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use kirana_core::{round_money, CategoryId, OfferId, ProductId};

/// How an offer reduces the gross line amount.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Discount {
    /// Percentage off the gross line amount.
    Percent(Decimal),
    /// Flat amount off per unit sold.
    FlatPerUnit(Decimal),
}

impl Discount {
    /// Discount amount for a line of `quantity` units at `unit_price`.
    pub fn amount(&self, quantity: i64, unit_price: Decimal) -> Decimal {
        let gross = unit_price * Decimal::from(quantity);
        let raw = match self {
            Discount::Percent(pct) => gross * *pct / Decimal::ONE_HUNDRED,
            Discount::FlatPerUnit(per_unit) => *per_unit * Decimal::from(quantity),
        };
        // A discount never exceeds the gross amount.
        round_money(raw.min(gross))
    }
}

/// An active promotional offer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Offer {
    pub id: OfferId,
    pub name: String,
    /// Product the offer applies to; `None` means category-scoped.
    pub product_id: Option<ProductId>,
    /// Category the offer applies to (checked when `product_id` is `None`).
    pub category_id: Option<CategoryId>,
    /// Minimum quantity on the line for the offer to apply.
    pub min_quantity: i64,
    pub discount: Discount,
    pub valid_from: DateTime<Utc>,
    pub valid_to: DateTime<Utc>,
    pub is_active: bool,
}

impl Offer {
    fn matches(
        &self,
        product_id: ProductId,
        category_id: Option<CategoryId>,
        quantity: i64,
        at: DateTime<Utc>,
    ) -> bool {
        if !self.is_active || quantity < self.min_quantity {
            return false;
        }
        if at < self.valid_from || at > self.valid_to {
            return false;
        }
        match (self.product_id, self.category_id) {
            (Some(p), _) => p == product_id,
            (None, Some(c)) => category_id == Some(c),
            (None, None) => false,
        }
    }
}

/// Read-only offer lookup (external collaborator). First match wins.
pub trait OfferResolver: Send + Sync {
    fn find_applicable(
        &self,
        product_id: ProductId,
        category_id: Option<CategoryId>,
        quantity: i64,
        at: DateTime<Utc>,
    ) -> Option<Offer>;
}

/// In-memory resolver; offers are evaluated in insertion order.
#[derive(Debug, Default)]
pub struct InMemoryOffers {
    offers: RwLock<Vec<Offer>>,
}

impl InMemoryOffers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, offer: Offer) {
        if let Ok(mut offers) = self.offers.write() {
            offers.push(offer);
        }
    }
}

impl OfferResolver for InMemoryOffers {
    fn find_applicable(
        &self,
        product_id: ProductId,
        category_id: Option<CategoryId>,
        quantity: i64,
        at: DateTime<Utc>,
    ) -> Option<Offer> {
        let offers = self.offers.read().ok()?;
        offers
            .iter()
            .find(|o| o.matches(product_id, category_id, quantity, at))
            .cloned()
    }
}

/// A resolver with no offers configured.
#[derive(Debug, Default)]
pub struct NoOffers;

impl OfferResolver for NoOffers {
    fn find_applicable(
        &self,
        _product_id: ProductId,
        _category_id: Option<CategoryId>,
        _quantity: i64,
        _at: DateTime<Utc>,
    ) -> Option<Offer> {
        None
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

    fn offer_for(product_id: ProductId, discount: Discount, min_quantity: i64) -> Offer {
        let now = Utc::now();
        Offer {
            id: OfferId::new(),
            name: "test offer".to_string(),
            product_id: Some(product_id),
            category_id: None,
            min_quantity,
            discount,
            valid_from: now - Duration::days(1),
            valid_to: now + Duration::days(1),
            is_active: true,
        }
    }

    #[test]
    fn percent_discount_is_computed_on_gross() {
        let discount = Discount::Percent(d("10"));
        assert_eq!(discount.amount(4, d("25.00")), d("10.00"));
    }

    #[test]
    fn flat_discount_is_capped_at_gross() {
        let discount = Discount::FlatPerUnit(d("30"));
        assert_eq!(discount.amount(2, d("20.00")), d("40.00"));
    }

    #[test]
    fn first_matching_offer_wins_no_stacking() {
        let offers = InMemoryOffers::new();
        let product_id = ProductId::new();
        offers.add(offer_for(product_id, Discount::Percent(d("5")), 1));
        offers.add(offer_for(product_id, Discount::Percent(d("50")), 1));

        let found = offers
            .find_applicable(product_id, None, 3, Utc::now())
            .unwrap();
        assert_eq!(found.discount, Discount::Percent(d("5")));
    }

    #[test]
    fn offer_below_min_quantity_does_not_apply() {
        let offers = InMemoryOffers::new();
        let product_id = ProductId::new();
        offers.add(offer_for(product_id, Discount::Percent(d("5")), 10));

        assert!(offers
            .find_applicable(product_id, None, 9, Utc::now())
            .is_none());
    }

    #[test]
    fn expired_offer_does_not_apply() {
        let offers = InMemoryOffers::new();
        let product_id = ProductId::new();
        let mut offer = offer_for(product_id, Discount::Percent(d("5")), 1);
        offer.valid_to = Utc::now() - Duration::days(2);
        offer.valid_from = Utc::now() - Duration::days(3);
        offers.add(offer);

        assert!(offers
            .find_applicable(product_id, None, 1, Utc::now())
            .is_none());
    }
}
