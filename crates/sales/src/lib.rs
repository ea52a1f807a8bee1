//! `kirana-sales` — the sale (invoice) aggregate.
//!
//! A sale snapshots prices, GST rates and discounts at sale time; completed
//! invoices are immutable and later tax-rate changes never alter them.

pub mod sale;

pub use sale::{PaymentSplit, Sale, SaleItem, SaleStatus};
