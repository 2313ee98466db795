use crate::domain::invoice::Invoice;
use crate::domain::receipt::Receipt;
use crate::domain::totals::Totals;
use crate::domain::transaction::TransactionRecord;
use chrono::{DateTime, Utc};

/// Packages an invoice, its totals and a transaction outcome into a [`Receipt`].
#[derive(Debug, Default, Clone, Copy)]
pub struct ReceiptAssembler;

impl ReceiptAssembler {
    pub fn new() -> Self {
        Self
    }

    pub fn assemble(&self, invoice: &Invoice, totals: &Totals, transaction: TransactionRecord) -> Receipt {
        self.assemble_at(invoice, totals, transaction, Utc::now())
    }

    /// Same as [`assemble`](Self::assemble) with an explicit generation time.
    pub fn assemble_at(
        &self,
        invoice: &Invoice,
        totals: &Totals,
        transaction: TransactionRecord,
        generated_at: DateTime<Utc>,
    ) -> Receipt {
        Receipt {
            receipt_id: transaction.receipt_id(),
            invoice_id: invoice.id(),
            patient_ref: invoice.patient_ref().to_string(),
            invoice_status: invoice.status(),
            line_items: invoice.line_items().to_vec(),
            service_fee: invoice.service_fee(),
            totals: *totals,
            amount_paid: invoice.amount_paid(),
            balance_due: totals.balance_after(invoice.amount_paid()),
            transaction,
            generated_at,
        }
    }
}
