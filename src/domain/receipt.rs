use crate::domain::invoice::{InvoiceId, InvoiceStatus};
use crate::domain::line_item::LineItem;
use crate::domain::money::Money;
use crate::domain::totals::Totals;
use crate::domain::transaction::TransactionRecord;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// An immutable snapshot of an invoice, its totals and one transaction outcome.
///
/// Built by [`ReceiptAssembler`](crate::application::receipt::ReceiptAssembler).
/// There are no mutators; a refund or adjustment produces a new receipt tied
/// to a new transaction record.
#[derive(Debug, Serialize, PartialEq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    pub(crate) receipt_id: Option<Uuid>,
    pub(crate) invoice_id: InvoiceId,
    pub(crate) patient_ref: String,
    pub(crate) invoice_status: InvoiceStatus,
    pub(crate) line_items: Vec<LineItem>,
    pub(crate) service_fee: Option<Money>,
    pub(crate) totals: Totals,
    pub(crate) amount_paid: Money,
    pub(crate) balance_due: Money,
    pub(crate) transaction: TransactionRecord,
    pub(crate) generated_at: DateTime<Utc>,
}

impl Receipt {
    /// The receipt id issued with the transaction; `None` for a failed one.
    pub fn receipt_id(&self) -> Option<Uuid> {
        self.receipt_id
    }

    pub fn invoice_id(&self) -> InvoiceId {
        self.invoice_id
    }

    pub fn patient_ref(&self) -> &str {
        &self.patient_ref
    }

    pub fn invoice_status(&self) -> InvoiceStatus {
        self.invoice_status
    }

    pub fn line_items(&self) -> &[LineItem] {
        &self.line_items
    }

    pub fn service_fee(&self) -> Option<Money> {
        self.service_fee
    }

    pub fn totals(&self) -> &Totals {
        &self.totals
    }

    pub fn amount_paid(&self) -> Money {
        self.amount_paid
    }

    pub fn balance_due(&self) -> Money {
        self.balance_due
    }

    pub fn transaction(&self) -> &TransactionRecord {
        &self.transaction
    }

    pub fn generated_at(&self) -> DateTime<Utc> {
        self.generated_at
    }
}
