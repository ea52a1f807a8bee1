//! `kirana-catalog` — read-only collaborator interfaces.
//!
//! The engine does not own products, offers, suppliers or customers; it
//! consumes them through the narrow traits defined here. In-memory
//! implementations are provided for tests and for embedding without a
//! database.

pub mod offers;
pub mod parties;
pub mod product;

pub use offers::{Discount, InMemoryOffers, NoOffers, Offer, OfferResolver};
pub use parties::{InMemoryDirectory, PartyDirectory};
pub use product::{GstRate, InMemoryCatalog, ProductCatalog, ProductInfo};
