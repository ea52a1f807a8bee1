//! `kirana-events` — typed domain events and their delivery machinery.
//!
//! One event type per committed state change, a broadcast bus for
//! asynchronous fan-out, and a handler registry whose failures are logged and
//! never roll back the already-committed core transaction.

pub mod bus;
pub mod event;
pub mod in_memory_bus;
pub mod orchestrator;

pub use bus::{EventBus, Subscription};
pub use event::{
    DomainEvent, EventKind, ExpirySoon, GrnConfirmed, GrnItemSnapshot, LowStock, SaleCompleted,
    SaleItemSnapshot,
};
pub use in_memory_bus::InMemoryEventBus;
pub use orchestrator::{EventHandler, EventOrchestrator, HandlerRegistry, WorkerHandle};
