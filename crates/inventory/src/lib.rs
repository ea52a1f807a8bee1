//! `kirana-inventory` — stock ledger, lot records, audit trail and valuation.
//!
//! Pure domain types and operations. Transaction boundaries, locking and
//! event publication live in `kirana-engine`.

pub mod audit;
pub mod batch;
pub mod ledger;
pub mod valuation;

pub use audit::{AdjustmentType, AuditReference, InventoryAudit};
pub use batch::Batch;
pub use ledger::StockLedgerEntry;
pub use valuation::{fifo_order, lifo_order, valuate, CostMethod, Valuation, ValuationLayer};
