//! `kirana-receipts` — goods receive note (GRN) aggregate.
//!
//! A GRN records physically received supplier goods. Confirmation is the only
//! operation that creates stock; it is idempotent when the GRN carries an
//! idempotency key (deduplication itself lives in `kirana-engine`).

pub mod grn;

pub use grn::{GoodsReceiveNote, GrnItem, GrnStatus};
