//! Adapters between the engine and the outside world: CSV input for catalogs
//! and carts, JSON output for totals and receipts.

pub mod csv;
pub mod json;
