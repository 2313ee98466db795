use crate::domain::instrument::PaymentMethod;
use crate::domain::invoice::InvoiceId;
use crate::domain::money::Money;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Serialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Completed,
    Failed,
}

/// The terminal outcome of one payment submission.
///
/// Records are only built by the transaction processor and have no setters;
/// a correction is expressed as a new record, never an edit.
#[derive(Debug, Serialize, PartialEq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecord {
    id: Uuid,
    invoice_ref: InvoiceId,
    amount_charged: Money,
    method: PaymentMethod,
    status: TransactionStatus,
    timestamp: DateTime<Utc>,
    receipt_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    instrument: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    rail_reference: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    failure_reason: Option<String>,
}

impl TransactionRecord {
    pub(crate) fn completed(
        invoice_ref: InvoiceId,
        amount_charged: Money,
        method: PaymentMethod,
        instrument: Option<String>,
        rail_reference: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            invoice_ref,
            amount_charged,
            method,
            status: TransactionStatus::Completed,
            timestamp: Utc::now(),
            receipt_id: Some(Uuid::new_v4()),
            instrument,
            rail_reference,
            failure_reason: None,
        }
    }

    pub(crate) fn failed(
        invoice_ref: InvoiceId,
        amount_charged: Money,
        method: PaymentMethod,
        instrument: Option<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            invoice_ref,
            amount_charged,
            method,
            status: TransactionStatus::Failed,
            timestamp: Utc::now(),
            receipt_id: None,
            instrument,
            rail_reference: None,
            failure_reason: Some(reason.into()),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn invoice_ref(&self) -> InvoiceId {
        self.invoice_ref
    }

    /// The amount submitted; for a failed record nothing was actually collected.
    pub fn amount_charged(&self) -> Money {
        self.amount_charged
    }

    pub fn method(&self) -> PaymentMethod {
        self.method
    }

    pub fn status(&self) -> TransactionStatus {
        self.status
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn receipt_id(&self) -> Option<Uuid> {
        self.receipt_id
    }

    /// Masked instrument description, e.g. `**** **** **** 1111`.
    pub fn instrument(&self) -> Option<&str> {
        self.instrument.as_deref()
    }

    pub fn rail_reference(&self) -> Option<&str> {
        self.rail_reference.as_deref()
    }

    pub fn failure_reason(&self) -> Option<&str> {
        self.failure_reason.as_deref()
    }

    pub fn is_completed(&self) -> bool {
        self.status == TransactionStatus::Completed
    }
}
