//! Domain types: money, invoices, line items, payment instruments and the
//! records produced by a payment, plus the ports the engine depends on.

pub mod instrument;
pub mod invoice;
pub mod line_item;
pub mod money;
pub mod ports;
pub mod receipt;
pub mod totals;
pub mod transaction;
