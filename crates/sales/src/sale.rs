//! Sale aggregate: items, totals, payment split, lifecycle.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use kirana_catalog::ProductInfo;
use kirana_core::{
    percent_of, round_money, CustomerId, DomainError, DomainResult, OfferId, ProductId, SaleId,
};

/// Sale status lifecycle. `Completed` and `Cancelled` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SaleStatus {
    Draft,
    Completed,
    Cancelled,
}

/// How the customer settled the invoice total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentSplit {
    pub cash: Decimal,
    pub upi: Decimal,
    pub card: Decimal,
    pub pay_later: Decimal,
}

impl PaymentSplit {
    /// Entire amount in cash.
    pub fn cash_of(amount: Decimal) -> Self {
        Self {
            cash: amount,
            upi: Decimal::ZERO,
            card: Decimal::ZERO,
            pay_later: Decimal::ZERO,
        }
    }

    /// Entire amount deferred (pay-later customers).
    pub fn pay_later_of(amount: Decimal) -> Self {
        Self {
            cash: Decimal::ZERO,
            upi: Decimal::ZERO,
            card: Decimal::ZERO,
            pay_later: amount,
        }
    }

    pub fn total(&self) -> Decimal {
        self.cash + self.upi + self.card + self.pay_later
    }

    fn validate(&self, invoice_total: Decimal) -> DomainResult<()> {
        for (leg, amount) in [
            ("cash", self.cash),
            ("upi", self.upi),
            ("card", self.card),
            ("pay_later", self.pay_later),
        ] {
            if amount < Decimal::ZERO {
                return Err(DomainError::validation(format!(
                    "{leg} payment cannot be negative"
                )));
            }
        }
        if self.total() != invoice_total {
            return Err(DomainError::validation(format!(
                "payment split {} does not match invoice total {}",
                self.total(),
                invoice_total
            )));
        }
        Ok(())
    }
}

/// One invoice line. GST rates are snapshotted from the catalog at sale time
/// and never re-read afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleItem {
    product_id: ProductId,
    product_name: String,
    quantity: i64,
    unit_price: Decimal,
    discount_amount: Decimal,
    offer_id: Option<OfferId>,
    cgst_rate: Decimal,
    sgst_rate: Decimal,
    cgst_amount: Decimal,
    sgst_amount: Decimal,
    /// `quantity × unit_price`, before discount and tax.
    gross_amount: Decimal,
    /// Gross minus discount plus GST.
    line_total: Decimal,
}

impl SaleItem {
    pub fn new(
        product: &ProductInfo,
        quantity: i64,
        unit_price: Decimal,
        discount_amount: Decimal,
        offer_id: Option<OfferId>,
    ) -> DomainResult<Self> {
        if quantity <= 0 {
            return Err(DomainError::validation("quantity must be positive"));
        }
        if unit_price < Decimal::ZERO {
            return Err(DomainError::validation("unit price cannot be negative"));
        }
        let gross_amount = round_money(unit_price * Decimal::from(quantity));
        if discount_amount < Decimal::ZERO || discount_amount > gross_amount {
            return Err(DomainError::validation(
                "discount must be between zero and the gross line amount",
            ));
        }

        let taxable = gross_amount - discount_amount;
        let cgst_amount = percent_of(taxable, product.gst_rate.cgst);
        let sgst_amount = percent_of(taxable, product.gst_rate.sgst);

        Ok(Self {
            product_id: product.id,
            product_name: product.name.clone(),
            quantity,
            unit_price,
            discount_amount,
            offer_id,
            cgst_rate: product.gst_rate.cgst,
            sgst_rate: product.gst_rate.sgst,
            cgst_amount,
            sgst_amount,
            gross_amount,
            line_total: taxable + cgst_amount + sgst_amount,
        })
    }

    pub fn product_id(&self) -> ProductId {
        self.product_id
    }

    pub fn product_name(&self) -> &str {
        &self.product_name
    }

    pub fn quantity(&self) -> i64 {
        self.quantity
    }

    pub fn unit_price(&self) -> Decimal {
        self.unit_price
    }

    pub fn discount_amount(&self) -> Decimal {
        self.discount_amount
    }

    pub fn offer_id(&self) -> Option<OfferId> {
        self.offer_id
    }

    pub fn cgst_rate(&self) -> Decimal {
        self.cgst_rate
    }

    pub fn sgst_rate(&self) -> Decimal {
        self.sgst_rate
    }

    pub fn tax_amount(&self) -> Decimal {
        self.cgst_amount + self.sgst_amount
    }

    pub fn gross_amount(&self) -> Decimal {
        self.gross_amount
    }

    pub fn line_total(&self) -> Decimal {
        self.line_total
    }
}

/// Aggregate root: Sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sale {
    id: SaleId,
    invoice_number: String,
    status: SaleStatus,
    customer_id: Option<CustomerId>,
    items: Vec<SaleItem>,
    sub_total: Decimal,
    discount_amount: Decimal,
    tax_amount: Decimal,
    total_amount: Decimal,
    payment: PaymentSplit,
    sale_date: DateTime<Utc>,
}

impl Sale {
    /// Assemble a draft sale; totals are derived from the items and the
    /// payment split must match the computed total exactly.
    pub fn new(
        id: SaleId,
        invoice_number: String,
        customer_id: Option<CustomerId>,
        items: Vec<SaleItem>,
        payment: PaymentSplit,
        sale_date: DateTime<Utc>,
    ) -> DomainResult<Self> {
        if items.is_empty() {
            return Err(DomainError::validation("a sale needs at least one item"));
        }

        let sub_total: Decimal = items.iter().map(|i| i.gross_amount()).sum();
        let discount_amount: Decimal = items.iter().map(|i| i.discount_amount()).sum();
        let tax_amount: Decimal = items.iter().map(|i| i.tax_amount()).sum();
        let total_amount: Decimal = items.iter().map(|i| i.line_total()).sum();

        payment.validate(total_amount)?;

        Ok(Self {
            id,
            invoice_number,
            status: SaleStatus::Draft,
            customer_id,
            items,
            sub_total,
            discount_amount,
            tax_amount,
            total_amount,
            payment,
            sale_date,
        })
    }

    pub fn id(&self) -> SaleId {
        self.id
    }

    pub fn invoice_number(&self) -> &str {
        &self.invoice_number
    }

    pub fn status(&self) -> SaleStatus {
        self.status
    }

    pub fn customer_id(&self) -> Option<CustomerId> {
        self.customer_id
    }

    pub fn items(&self) -> &[SaleItem] {
        &self.items
    }

    pub fn sub_total(&self) -> Decimal {
        self.sub_total
    }

    pub fn discount_amount(&self) -> Decimal {
        self.discount_amount
    }

    pub fn tax_amount(&self) -> Decimal {
        self.tax_amount
    }

    pub fn total_amount(&self) -> Decimal {
        self.total_amount
    }

    pub fn payment(&self) -> PaymentSplit {
        self.payment
    }

    pub fn sale_date(&self) -> DateTime<Utc> {
        self.sale_date
    }

    /// Draft → Completed. Terminal afterwards.
    pub fn complete(&mut self) -> DomainResult<()> {
        match self.status {
            SaleStatus::Draft => {
                self.status = SaleStatus::Completed;
                Ok(())
            }
            other => Err(DomainError::invalid_transition(format!(
                "cannot complete a {other:?} sale"
            ))),
        }
    }

    /// Draft → Cancelled. Terminal afterwards.
    pub fn cancel(&mut self) -> DomainResult<()> {
        match self.status {
            SaleStatus::Draft => {
                self.status = SaleStatus::Cancelled;
                Ok(())
            }
            other => Err(DomainError::invalid_transition(format!(
                "cannot cancel a {other:?} sale"
            ))),
        }
    }
}
