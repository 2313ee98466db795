use super::instrument::PaymentMethod;
use super::invoice::InvoiceId;
use super::line_item::CatalogEntry;
use super::money::Money;
use crate::application::validator::ValidatedInstrument;
use async_trait::async_trait;
use std::sync::Arc;

/// Read-only price lookup backing catalog line items.
pub trait LineItemCatalog: Send + Sync {
    fn lookup(&self, code: &str) -> Option<CatalogEntry>;
}

/// A charge as handed to the payment rail.
#[derive(Debug, Clone)]
pub struct ChargeRequest {
    pub invoice_id: InvoiceId,
    pub method: PaymentMethod,
    pub amount: Money,
    pub instrument: ValidatedInstrument,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RailOutcome {
    Approved { reference: String },
    Declined { reason: String },
}

/// The external system that actually moves money.
#[async_trait]
pub trait PaymentRail: Send + Sync {
    async fn charge(&self, request: &ChargeRequest) -> RailOutcome;
}

pub type CatalogRef = Arc<dyn LineItemCatalog>;
pub type PaymentRailBox = Box<dyn PaymentRail>;
