//! Module: db
//! Responsibility: everything that touches store keys: the tuple codec,
//! the store capability, index maintenance and the catalog tying them to a
//! schema.

pub mod catalog;
pub mod index;
pub mod key;
pub mod store;

pub use catalog::IndexCatalog;
