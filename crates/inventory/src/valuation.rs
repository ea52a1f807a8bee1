//! FIFO/LIFO cost-layer valuation.
//!
//! Pure read over lot records; nothing here mutates state. All arithmetic is
//! fixed-point `Decimal`.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use kirana_core::{BatchId, ProductId};

use crate::batch::Batch;

/// Cost-layer consumption order.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CostMethod {
    Fifo,
    Lifo,
}

/// One consumed cost layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValuationLayer {
    pub batch_id: BatchId,
    pub quantity: i64,
    pub unit_cost: Decimal,
    /// `quantity × unit_cost`.
    pub value: Decimal,
}

/// Valuation result: total value, quantity covered by lots, layer breakdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Valuation {
    pub product_id: ProductId,
    pub method: CostMethod,
    pub consumed_quantity: i64,
    pub total_value: Decimal,
    /// `total_value / consumed_quantity`, 4-decimal precision; zero when no
    /// quantity was consumed.
    pub average_unit_cost: Decimal,
    pub layers: Vec<ValuationLayer>,
}

/// Value `available` units of a product by greedily consuming lot layers.
///
/// Layers come from active batches with remaining quantity, ordered by
/// received date (ascending for FIFO, descending for LIFO), ties broken by
/// expiry date (earliest first for FIFO, latest first for LIFO; undated lots
/// sort last). Consumption stops when `available` units are covered or lots
/// run out, so the result reports how much of the ledger quantity lot data
/// actually covers.
pub fn valuate(
    product_id: ProductId,
    batches: &[Batch],
    available: i64,
    method: CostMethod,
) -> Valuation {
    let mut lots: Vec<&Batch> = batches
        .iter()
        .filter(|b| b.product_id() == product_id && b.is_active() && b.available_quantity() > 0)
        .collect();

    lots.sort_by(|a, b| match method {
        CostMethod::Fifo => fifo_order(a, b),
        CostMethod::Lifo => lifo_order(a, b),
    });

    let mut remaining = available.max(0);
    let mut layers = Vec::new();
    let mut total_value = Decimal::ZERO;
    let mut consumed_quantity = 0i64;

    for lot in lots {
        if remaining == 0 {
            break;
        }
        let take = remaining.min(lot.available_quantity());
        let value = Decimal::from(take) * lot.unit_cost();
        layers.push(ValuationLayer {
            batch_id: lot.id(),
            quantity: take,
            unit_cost: lot.unit_cost(),
            value,
        });
        total_value += value;
        consumed_quantity += take;
        remaining -= take;
    }

    let average_unit_cost = if consumed_quantity > 0 {
        (total_value / Decimal::from(consumed_quantity)).round_dp(4)
    } else {
        Decimal::ZERO
    };

    Valuation {
        product_id,
        method,
        consumed_quantity,
        total_value,
        average_unit_cost,
        layers,
    }
}

/// FIFO consumption order: oldest received first, earliest expiry breaking
/// ties. Shared with lot consumption so valuation and deduction walk lots the
/// same way.
pub fn fifo_order(a: &Batch, b: &Batch) -> core::cmp::Ordering {
    a.received_date()
        .cmp(&b.received_date())
        .then_with(|| cmp_expiry(a, b, true))
}

/// LIFO consumption order: newest received first, latest expiry breaking ties.
pub fn lifo_order(a: &Batch, b: &Batch) -> core::cmp::Ordering {
    b.received_date()
        .cmp(&a.received_date())
        .then_with(|| cmp_expiry(a, b, false))
}

/// Expiry tie-break: earliest-first for FIFO, latest-first for LIFO; lots
/// without an expiry date sort last either way.
fn cmp_expiry(a: &Batch, b: &Batch, earliest_first: bool) -> core::cmp::Ordering {
    use core::cmp::Ordering;
    match (a.expiry_date(), b.expiry_date()) {
        (Some(x), Some(y)) => {
            if earliest_first {
                x.cmp(&y)
            } else {
                y.cmp(&x)
            }
        }
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use core::str::FromStr;
    use kirana_core::GrnId;
    use proptest::prelude::*;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn lot(
        product_id: ProductId,
        qty: i64,
        cost: &str,
        received_day: i64,
        expiry_day: Option<i64>,
    ) -> Batch {
        let epoch = Utc::now() - Duration::days(100);
        Batch::new(
            product_id,
            qty,
            d(cost),
            epoch + Duration::days(received_day),
            expiry_day.map(|day| epoch + Duration::days(day)),
            None,
            None,
            GrnId::new(),
        )
        .unwrap()
    }

    #[test]
    fn fifo_consumes_oldest_layers_first() {
        let product_id = ProductId::new();
        let batches = vec![
            lot(product_id, 20, "5", 1, None),
            lot(product_id, 30, "6", 5, None),
        ];

        let valuation = valuate(product_id, &batches, 25, CostMethod::Fifo);
        assert_eq!(valuation.consumed_quantity, 25);
        assert_eq!(valuation.total_value, d("130"));
        assert_eq!(valuation.average_unit_cost, d("5.2000"));
        assert_eq!(valuation.layers.len(), 2);
        assert_eq!(valuation.layers[0].quantity, 20);
        assert_eq!(valuation.layers[1].quantity, 5);
    }

    #[test]
    fn lifo_consumes_newest_layers_first() {
        let product_id = ProductId::new();
        let batches = vec![
            lot(product_id, 20, "5", 1, None),
            lot(product_id, 30, "6", 5, None),
        ];

        let valuation = valuate(product_id, &batches, 25, CostMethod::Lifo);
        assert_eq!(valuation.consumed_quantity, 25);
        assert_eq!(valuation.total_value, d("150"));
        assert_eq!(valuation.average_unit_cost, d("6.0000"));
        assert_eq!(valuation.layers.len(), 1);
        assert_eq!(valuation.layers[0].quantity, 25);
    }

    #[test]
    fn same_day_ties_break_on_expiry() {
        let product_id = ProductId::new();
        let early_expiry = lot(product_id, 10, "4", 3, Some(10));
        let late_expiry = lot(product_id, 10, "7", 3, Some(60));
        let batches = vec![late_expiry, early_expiry.clone()];

        let fifo = valuate(product_id, &batches, 10, CostMethod::Fifo);
        assert_eq!(fifo.layers[0].batch_id, early_expiry.id());
        assert_eq!(fifo.total_value, d("40"));

        let lifo = valuate(product_id, &batches, 10, CostMethod::Lifo);
        assert_eq!(lifo.layers[0].unit_cost, d("7"));
    }

    #[test]
    fn inactive_and_exhausted_lots_are_skipped() {
        let product_id = ProductId::new();
        let mut exhausted = lot(product_id, 10, "3", 1, None);
        exhausted.consume(10);
        let mut voided = lot(product_id, 10, "3", 2, None);
        voided.deactivate();
        let live = lot(product_id, 10, "8", 3, None);
        let batches = vec![exhausted, voided, live];

        let valuation = valuate(product_id, &batches, 30, CostMethod::Fifo);
        assert_eq!(valuation.consumed_quantity, 10);
        assert_eq!(valuation.total_value, d("80"));
    }

    #[test]
    fn valuation_stops_when_lots_run_out() {
        let product_id = ProductId::new();
        let batches = vec![lot(product_id, 10, "2", 1, None)];

        let valuation = valuate(product_id, &batches, 25, CostMethod::Fifo);
        assert_eq!(valuation.consumed_quantity, 10);
        assert_eq!(valuation.total_value, d("20"));
    }

    #[test]
    fn other_products_lots_are_ignored() {
        let product_id = ProductId::new();
        let batches = vec![
            lot(product_id, 5, "2", 1, None),
            lot(ProductId::new(), 50, "9", 1, None),
        ];

        let valuation = valuate(product_id, &batches, 10, CostMethod::Fifo);
        assert_eq!(valuation.consumed_quantity, 5);
        assert_eq!(valuation.total_value, d("10"));
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: consumed quantity never exceeds either the requested
        /// quantity or the total lot availability, and total value equals the
        /// sum of the layer values.
        #[test]
        fn valuation_is_conservative(
            quantities in prop::collection::vec(1i64..500, 1..8),
            costs in prop::collection::vec(1u32..10_000u32, 8),
            needed in 0i64..2_000,
        ) {
            let product_id = ProductId::new();
            let batches: Vec<Batch> = quantities
                .iter()
                .zip(costs.iter())
                .enumerate()
                .map(|(day, (&qty, &cost_paise))| {
                    lot(
                        product_id,
                        qty,
                        &format!("{}.{:02}", cost_paise / 100, cost_paise % 100),
                        day as i64,
                        None,
                    )
                })
                .collect();

            let lot_total: i64 = quantities.iter().sum();

            for method in [CostMethod::Fifo, CostMethod::Lifo] {
                let valuation = valuate(product_id, &batches, needed, method);
                prop_assert!(valuation.consumed_quantity <= needed.max(0));
                prop_assert!(valuation.consumed_quantity <= lot_total);

                let layer_sum: Decimal =
                    valuation.layers.iter().map(|l| l.value).sum();
                prop_assert_eq!(layer_sum, valuation.total_value);

                let layer_qty: i64 =
                    valuation.layers.iter().map(|l| l.quantity).sum();
                prop_assert_eq!(layer_qty, valuation.consumed_quantity);
            }
        }
    }
}
