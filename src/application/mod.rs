//! Application layer containing the billing logic.
//!
//! `PricingCalculator` and `PaymentValidator` are synchronous and pure.
//! `TransactionProcessor` owns the payment state machine, and `BillingEngine`
//! ties them together for a single invoice.

pub mod engine;
pub mod pricing;
pub mod processor;
pub mod receipt;
pub mod validator;
