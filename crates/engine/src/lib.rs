//! `kirana-engine` — the transactional heart of the backoffice.
//!
//! Owns the store and the write paths: sale processing, GRN confirmation,
//! manual stock operations, valuation and the expiry scanner. Each mutating
//! operation is one all-or-nothing transaction; domain events fan out only
//! after the transaction commits.

pub mod expiry_worker;
pub mod grn_processor;
pub mod idempotency;
pub mod sale_processor;
pub mod stock_service;
pub mod store;
pub mod valuation_service;

pub use expiry_worker::{ExpiryScanConfig, ExpiryScanner};
pub use grn_processor::{ConfirmOutcome, GrnDraftRequest, GrnProcessor};
pub use idempotency::{IdempotencyGuard, IdempotencyRecord, KeyCheck, OperationKind};
pub use sale_processor::{SaleLine, SaleProcessor, SaleRequest};
pub use stock_service::StockService;
pub use store::{with_conflict_retry, InMemoryStore, StoreState, DEFAULT_MAX_ATTEMPTS};
pub use valuation_service::ValuationService;
