//! `kirana-core` — domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns):
//! strongly-typed identifiers, the error taxonomy, fixed-point money helpers
//! and the explicit operation context threaded through every mutation.

pub mod context;
pub mod error;
pub mod id;
pub mod money;

pub use context::OperationContext;
pub use error::{DomainError, DomainResult};
pub use id::{
    BatchId, CategoryId, CustomerId, GrnId, OfferId, ProductId, PurchaseOrderId, SaleId,
    SupplierId, UserId,
};
pub use money::{percent_of, round_money};
