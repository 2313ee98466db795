use crate::application::pricing::PricingCalculator;
use crate::application::processor::{
    ALREADY_IN_PROGRESS, PaymentRequest, SubmissionState, TransactionProcessor,
};
use crate::application::receipt::ReceiptAssembler;
use crate::config::EngineConfig;
use crate::domain::instrument::{PaymentInstrument, PaymentMethod};
use crate::domain::invoice::{DiscountSpec, Invoice, InvoiceId};
use crate::domain::line_item::{LineItemId, LineItemUpdate};
use crate::domain::money::Money;
use crate::domain::ports::{CatalogRef, PaymentRailBox};
use crate::domain::receipt::Receipt;
use crate::domain::totals::Totals;
use crate::domain::transaction::TransactionRecord;
use crate::error::{BillingError, Result};
use rust_decimal::Decimal;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// How a submitted payment ended.
#[derive(Debug, Clone, PartialEq)]
pub enum PaymentOutcome {
    /// The rail approved the charge and the payment is attached to the invoice.
    Completed(Receipt),
    /// The rail declined or timed out; the invoice balance is unchanged.
    Failed(TransactionRecord),
}

impl PaymentOutcome {
    pub fn record(&self) -> &TransactionRecord {
        match self {
            PaymentOutcome::Completed(receipt) => receipt.transaction(),
            PaymentOutcome::Failed(record) => record,
        }
    }

    pub fn receipt(&self) -> Option<&Receipt> {
        match self {
            PaymentOutcome::Completed(receipt) => Some(receipt),
            PaymentOutcome::Failed(_) => None,
        }
    }
}

/// The billing session for one invoice.
///
/// `BillingEngine` owns the invoice, recomputes its [`Totals`] after every
/// mutation and runs payment submissions through the [`TransactionProcessor`].
/// Mutations are rejected while a payment is processing and after the invoice
/// is paid.
pub struct BillingEngine {
    invoice: Mutex<Invoice>,
    catalog: CatalogRef,
    calculator: PricingCalculator,
    processor: TransactionProcessor,
    assembler: ReceiptAssembler,
}

impl BillingEngine {
    /// Creates an engine around an existing invoice.
    ///
    /// # Arguments
    ///
    /// * `invoice` - The invoice or cart this session bills.
    /// * `catalog` - Price lookups for catalog codes.
    /// * `rail` - Where charges are sent.
    /// * `config` - Supplies the processing timeout.
    pub fn new(invoice: Invoice, catalog: CatalogRef, rail: PaymentRailBox, config: &EngineConfig) -> Self {
        Self {
            invoice: Mutex::new(invoice),
            catalog,
            calculator: PricingCalculator::new(),
            processor: TransactionProcessor::new(rail, config.processing_timeout()),
            assembler: ReceiptAssembler::new(),
        }
    }

    /// Starts a new draft invoice for `patient_ref` with the configured default
    /// tax rate and service fee applied.
    pub fn open(
        patient_ref: impl Into<String>,
        catalog: CatalogRef,
        rail: PaymentRailBox,
        config: &EngineConfig,
    ) -> Result<Self> {
        let mut invoice = Invoice::new(patient_ref);
        invoice.set_tax_rate(config.default_tax_rate_percent)?;
        invoice.set_service_fee(config.default_service_fee)?;
        tracing::debug!(invoice = %invoice.id(), "invoice opened");
        Ok(Self::new(invoice, catalog, rail, config))
    }

    pub fn invoice_id(&self) -> InvoiceId {
        self.lock_invoice().id()
    }

    /// A copy of the invoice as it stands now.
    pub fn invoice(&self) -> Invoice {
        self.lock_invoice().clone()
    }

    pub fn totals(&self) -> Totals {
        self.calculator.compute(&self.lock_invoice())
    }

    /// Total minus everything collected so far. Negative means a credit.
    pub fn balance(&self) -> Money {
        let invoice = self.lock_invoice();
        self.calculator.compute(&invoice).balance_after(invoice.amount_paid())
    }

    pub fn submission_state(&self) -> SubmissionState {
        self.processor.state()
    }

    /// Adds `quantity` of a catalog item, merging with an existing line for the same code.
    pub fn add_item(&self, code: &str, quantity: u32) -> Result<Totals> {
        let entry = self
            .catalog
            .lookup(code)
            .ok_or_else(|| BillingError::field("code", "unknown"))?;
        self.mutate(|invoice| invoice.add_catalog_item(&entry, quantity).map(|_| ()))
    }

    /// Adds a line priced by the caller rather than the catalog.
    pub fn add_custom_item(
        &self,
        code: &str,
        description: &str,
        unit_price: Decimal,
        quantity: u32,
    ) -> Result<Totals> {
        self.mutate(|invoice| {
            invoice
                .add_custom_item(code, description, unit_price, quantity)
                .map(|_| ())
        })
    }

    pub fn update_item(&self, id: LineItemId, update: LineItemUpdate) -> Result<Totals> {
        self.mutate(|invoice| invoice.update_item(id, update))
    }

    pub fn adjust_quantity(&self, id: LineItemId, delta: i64) -> Result<Totals> {
        self.mutate(|invoice| invoice.adjust_quantity(id, delta))
    }

    pub fn remove_item(&self, id: LineItemId) -> Result<Totals> {
        self.mutate(|invoice| invoice.remove_item(id))
    }

    pub fn set_discount(&self, discount: DiscountSpec) -> Result<Totals> {
        self.mutate(|invoice| invoice.set_discount(discount))
    }

    pub fn set_tax_rate(&self, rate: Decimal) -> Result<Totals> {
        self.mutate(|invoice| invoice.set_tax_rate(rate))
    }

    pub fn set_insurance_coverage(&self, rate: Decimal) -> Result<Totals> {
        self.mutate(|invoice| invoice.set_insurance_coverage(rate))
    }

    pub fn set_service_fee(&self, fee: Option<Decimal>) -> Result<Totals> {
        self.mutate(|invoice| invoice.set_service_fee(fee))
    }

    pub fn send(&self) -> Result<Totals> {
        self.mutate(Invoice::send)
    }

    pub fn mark_overdue(&self) -> Result<Totals> {
        self.mutate(Invoice::mark_overdue)
    }

    /// Validates and charges `amount` against the remaining balance.
    ///
    /// Field problems come back as `ValidationError`, a concurrent submission
    /// or an already settled invoice as `InvariantViolation`. A declined or
    /// timed-out charge is not an error: it is `PaymentOutcome::Failed`.
    /// Dropping the returned future while the charge is in flight abandons it
    /// without touching the invoice.
    pub async fn submit_payment(
        &self,
        method: PaymentMethod,
        instrument: &PaymentInstrument,
        amount: Decimal,
    ) -> Result<PaymentOutcome> {
        let amount = Money::new(amount);
        let submission = {
            let invoice = self.lock_invoice();
            if invoice.is_paid() {
                return Err(BillingError::invariant("invoice is already paid"));
            }
            let totals = self.calculator.compute(&invoice);
            self.processor.prepare(PaymentRequest {
                invoice_id: invoice.id(),
                invoice_balance: totals.balance_after(invoice.amount_paid()),
                method,
                instrument,
                amount,
            })?
        };

        // Attached while the processor is still Processing.
        let (record, receipt) = submission
            .execute_and_attach(|record| {
                let mut invoice = self.lock_invoice();
                let totals = self.calculator.compute(&invoice);
                invoice.record_payment(record.clone(), totals.total)?;
                let receipt = self.assembler.assemble(&invoice, &totals, record.clone());
                tracing::info!(
                    invoice = %invoice.id(),
                    status = ?invoice.status(),
                    balance = %receipt.balance_due(),
                    "payment attached"
                );
                Ok(receipt)
            })
            .await?;

        Ok(match receipt {
            Some(receipt) => PaymentOutcome::Completed(receipt),
            None => PaymentOutcome::Failed(record),
        })
    }

    fn mutate<F>(&self, change: F) -> Result<Totals>
    where
        F: FnOnce(&mut Invoice) -> Result<()>,
    {
        let mut invoice = self.lock_invoice();
        if self.processor.is_processing() {
            return Err(BillingError::invariant(ALREADY_IN_PROGRESS));
        }
        change(&mut invoice)?;
        let totals = self.calculator.compute(&invoice);
        tracing::debug!(invoice = %invoice.id(), total = %totals.total, "totals recomputed");
        Ok(totals)
    }

    fn lock_invoice(&self) -> MutexGuard<'_, Invoice> {
        self.invoice.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProcessingDelays;
    use crate::domain::invoice::InvoiceStatus;
    use crate::domain::line_item::CatalogEntry;
    use crate::infrastructure::in_memory::InMemoryCatalog;
    use crate::infrastructure::simulated_rail::SimulatedRail;
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    fn catalog() -> CatalogRef {
        let entries = [
            ("OPD-CONSULT", "Outpatient consultation", dec!(200.00)),
            ("LAB-CBC", "Complete blood count", dec!(150.00)),
            ("PHA-AMOX", "Amoxicillin 500mg strip", dec!(100.00)),
        ];
        Arc::new(
            entries
                .into_iter()
                .map(|(code, description, price)| CatalogEntry {
                    code: code.to_string(),
                    description: description.to_string(),
                    unit_price: price,
                })
                .collect::<InMemoryCatalog>(),
        )
    }

    fn engine() -> BillingEngine {
        BillingEngine::open(
            "PAT-9",
            catalog(),
            Box::new(SimulatedRail::new(ProcessingDelays::instant())),
            &EngineConfig::default(),
        )
        .unwrap()
    }

    fn cash() -> PaymentInstrument {
        PaymentInstrument::Cash {
            received_by: "Billing desk".to_string(),
        }
    }

    #[test]
    fn test_every_mutation_returns_fresh_totals() {
        let engine = engine();
        assert_eq!(engine.add_item("OPD-CONSULT", 1).unwrap().subtotal, Money::new(dec!(200)));
        assert_eq!(engine.add_item("LAB-CBC", 1).unwrap().subtotal, Money::new(dec!(350)));
        assert_eq!(engine.add_item("PHA-AMOX", 1).unwrap().subtotal, Money::new(dec!(450)));

        let totals = engine.set_tax_rate(dec!(8)).unwrap();
        assert_eq!(totals.total, Money::new(dec!(486)));
        assert_eq!(engine.totals(), totals);
    }

    #[test]
    fn test_unknown_catalog_code() {
        let engine = engine();
        let err = engine.add_item("NOPE", 1).unwrap_err();
        assert_eq!(err.field_errors().unwrap().get("code"), Some("unknown"));
    }

    #[test]
    fn test_open_applies_config_defaults() {
        let config = EngineConfig {
            default_tax_rate_percent: dec!(5),
            default_service_fee: Some(dec!(50)),
            ..EngineConfig::default()
        };
        let engine = BillingEngine::open(
            "PAT-1",
            catalog(),
            Box::new(SimulatedRail::new(ProcessingDelays::instant())),
            &config,
        )
        .unwrap();

        let totals = engine.totals();
        assert_eq!(totals.subtotal, Money::new(dec!(50)));
        assert_eq!(totals.tax_amount, Money::new(dec!(2.50)));
    }

    #[tokio::test]
    async fn test_partial_then_full_payment() {
        let engine = engine();
        engine.add_item("OPD-CONSULT", 1).unwrap();

        let outcome = engine
            .submit_payment(PaymentMethod::Cash, &cash(), dec!(50))
            .await
            .unwrap();
        let receipt = outcome.receipt().unwrap();
        assert_eq!(receipt.invoice_status(), InvoiceStatus::PartiallyPaid);
        assert_eq!(receipt.balance_due(), Money::new(dec!(150)));
        assert_eq!(engine.balance(), Money::new(dec!(150)));

        let outcome = engine
            .submit_payment(PaymentMethod::Cash, &cash(), dec!(150))
            .await
            .unwrap();
        assert_eq!(outcome.receipt().unwrap().invoice_status(), InvoiceStatus::Paid);
        assert_eq!(engine.invoice().payments().len(), 2);

        let err = engine
            .submit_payment(PaymentMethod::Cash, &cash(), dec!(1))
            .await
            .unwrap_err();
        assert!(err.is_invariant_violation());
        assert!(engine.add_item("LAB-CBC", 1).unwrap_err().is_invariant_violation());
    }

    #[tokio::test]
    async fn test_overpayment_is_rejected() {
        let engine = engine();
        engine.add_item("LAB-CBC", 1).unwrap();

        let err = engine
            .submit_payment(PaymentMethod::Cash, &cash(), dec!(150.01))
            .await
            .unwrap_err();
        assert_eq!(err.field_errors().unwrap().get("amount"), Some("exceeds balance"));
        assert_eq!(engine.submission_state(), SubmissionState::Idle);
    }

    #[tokio::test]
    async fn test_empty_invoice_cannot_be_paid() {
        let engine = engine();
        let err = engine
            .submit_payment(PaymentMethod::Cash, &cash(), dec!(10))
            .await
            .unwrap_err();
        assert!(err.is_invariant_violation());
    }

    #[tokio::test]
    async fn test_failed_payment_leaves_balance() {
        let engine = BillingEngine::open(
            "PAT-2",
            catalog(),
            Box::new(SimulatedRail::declining(ProcessingDelays::instant(), "rail offline")),
            &EngineConfig::default(),
        )
        .unwrap();
        engine.add_item("LAB-CBC", 2).unwrap();

        let outcome = engine
            .submit_payment(PaymentMethod::Cash, &cash(), dec!(300))
            .await
            .unwrap();

        assert!(outcome.receipt().is_none());
        assert_eq!(outcome.record().failure_reason(), Some("rail offline"));
        assert_eq!(engine.balance(), Money::new(dec!(300)));
        assert_eq!(engine.invoice().status(), InvoiceStatus::Draft);
        assert_eq!(engine.submission_state(), SubmissionState::Failed);
    }
}
