use crate::domain::line_item::{CatalogEntry, LineItem, LineItemId, LineItemUpdate};
use crate::domain::money::{Money, Percentage};
use crate::domain::transaction::TransactionRecord;
use crate::error::{BillingError, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type InvoiceId = Uuid;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Default)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    #[default]
    Draft,
    Sent,
    PartiallyPaid,
    Paid,
    Overdue,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum DiscountKind {
    Amount,
    Percentage,
}

/// A reduction of the subtotal, either flat or as a 0–100 percentage.
///
/// Only constructible through the validating constructors.
#[derive(Debug, Serialize, PartialEq, Clone, Copy)]
pub struct DiscountSpec {
    kind: DiscountKind,
    value: Decimal,
}

impl DiscountSpec {
    pub fn none() -> Self {
        Self {
            kind: DiscountKind::Amount,
            value: Decimal::ZERO,
        }
    }

    pub fn amount(value: Decimal) -> Result<Self> {
        Self::new(DiscountKind::Amount, value)
    }

    pub fn percentage(value: Decimal) -> Result<Self> {
        Self::new(DiscountKind::Percentage, value)
    }

    pub fn new(kind: DiscountKind, value: Decimal) -> Result<Self> {
        if value < Decimal::ZERO {
            return Err(BillingError::field("discount", "must not be negative"));
        }
        if kind == DiscountKind::Percentage {
            Percentage::for_field(value, "discount")?;
        }
        Ok(Self { kind, value })
    }

    pub fn kind(&self) -> DiscountKind {
        self.kind
    }

    pub fn value(&self) -> Decimal {
        self.value
    }
}

impl Default for DiscountSpec {
    fn default() -> Self {
        Self::none()
    }
}

/// An invoice or POS cart for one patient.
///
/// The invoice exclusively owns its line items. Once a completed payment
/// settles the whole balance the invoice becomes `Paid` and every mutator
/// returns an `InvariantViolation`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    id: InvoiceId,
    patient_ref: String,
    line_items: Vec<LineItem>,
    discount: DiscountSpec,
    tax_rate: Percentage,
    insurance_coverage: Percentage,
    service_fee: Option<Money>,
    status: InvoiceStatus,
    amount_paid: Money,
    payments: Vec<TransactionRecord>,
    #[serde(skip)]
    next_line_id: LineItemId,
}

impl Invoice {
    pub fn new(patient_ref: impl Into<String>) -> Self {
        Self::with_id(Uuid::new_v4(), patient_ref)
    }

    pub fn with_id(id: InvoiceId, patient_ref: impl Into<String>) -> Self {
        Self {
            id,
            patient_ref: patient_ref.into(),
            line_items: Vec::new(),
            discount: DiscountSpec::none(),
            tax_rate: Percentage::ZERO,
            insurance_coverage: Percentage::ZERO,
            service_fee: None,
            status: InvoiceStatus::Draft,
            amount_paid: Money::ZERO,
            payments: Vec::new(),
            next_line_id: 1,
        }
    }

    pub fn id(&self) -> InvoiceId {
        self.id
    }

    pub fn patient_ref(&self) -> &str {
        &self.patient_ref
    }

    pub fn line_items(&self) -> &[LineItem] {
        &self.line_items
    }

    pub fn line_item(&self, id: LineItemId) -> Option<&LineItem> {
        self.line_items.iter().find(|item| item.id() == id)
    }

    pub fn discount(&self) -> DiscountSpec {
        self.discount
    }

    pub fn tax_rate(&self) -> Percentage {
        self.tax_rate
    }

    pub fn insurance_coverage(&self) -> Percentage {
        self.insurance_coverage
    }

    pub fn service_fee(&self) -> Option<Money> {
        self.service_fee
    }

    pub fn status(&self) -> InvoiceStatus {
        self.status
    }

    pub fn amount_paid(&self) -> Money {
        self.amount_paid
    }

    /// Completed payments attached to this invoice, oldest first.
    pub fn payments(&self) -> &[TransactionRecord] {
        &self.payments
    }

    /// Adds a catalog line. A code already present has its quantity increased instead.
    pub fn add_catalog_item(&mut self, entry: &CatalogEntry, quantity: u32) -> Result<LineItemId> {
        self.ensure_editable()?;
        if quantity == 0 {
            return Err(BillingError::field("quantity", "must be at least 1"));
        }
        if let Some(existing) = self.line_items.iter_mut().find(|item| item.code() == entry.code) {
            let quantity = existing
                .quantity()
                .checked_add(quantity)
                .ok_or_else(|| BillingError::field("quantity", "too large"))?;
            existing.set_quantity(quantity)?;
            return Ok(existing.id());
        }
        let item = LineItem::from_catalog(self.next_line_id, entry, quantity)?;
        Ok(self.push(item))
    }

    /// Adds an ad hoc priced line, e.g. a procedure or package not in the catalog.
    pub fn add_custom_item(
        &mut self,
        code: impl Into<String>,
        description: impl Into<String>,
        unit_price: Decimal,
        quantity: u32,
    ) -> Result<LineItemId> {
        self.ensure_editable()?;
        let item = LineItem::new(self.next_line_id, code, description, unit_price, quantity)?;
        Ok(self.push(item))
    }

    fn push(&mut self, item: LineItem) -> LineItemId {
        let id = item.id();
        self.line_items.push(item);
        self.next_line_id += 1;
        id
    }

    pub fn update_item(&mut self, id: LineItemId, update: LineItemUpdate) -> Result<()> {
        self.ensure_editable()?;
        if update == LineItemUpdate::Quantity(0) {
            return self.remove_item(id);
        }
        let item = self
            .line_items
            .iter_mut()
            .find(|item| item.id() == id)
            .ok_or_else(|| BillingError::NotFound(format!("line item {id}")))?;
        match update {
            LineItemUpdate::Description(description) => item.set_description(description),
            LineItemUpdate::UnitPrice(price) => item.set_unit_price(price)?,
            LineItemUpdate::Quantity(quantity) => item.set_quantity(quantity)?,
        }
        Ok(())
    }

    /// Adds `delta` to a line's quantity; reaching zero or below removes the line.
    pub fn adjust_quantity(&mut self, id: LineItemId, delta: i64) -> Result<()> {
        self.ensure_editable()?;
        let current = self
            .line_item(id)
            .ok_or_else(|| BillingError::NotFound(format!("line item {id}")))?
            .quantity();
        let next = (i64::from(current) + delta).max(0);
        let next = u32::try_from(next).map_err(|_| BillingError::field("quantity", "too large"))?;
        self.update_item(id, LineItemUpdate::Quantity(next))
    }

    pub fn remove_item(&mut self, id: LineItemId) -> Result<()> {
        self.ensure_editable()?;
        let before = self.line_items.len();
        self.line_items.retain(|item| item.id() != id);
        if self.line_items.len() == before {
            return Err(BillingError::NotFound(format!("line item {id}")));
        }
        Ok(())
    }

    pub fn set_discount(&mut self, discount: DiscountSpec) -> Result<()> {
        self.ensure_editable()?;
        self.discount = DiscountSpec::new(discount.kind, discount.value)?;
        Ok(())
    }

    pub fn set_tax_rate(&mut self, rate: Decimal) -> Result<()> {
        self.ensure_editable()?;
        self.tax_rate = Percentage::for_field(rate, "taxRatePercent")?;
        Ok(())
    }

    pub fn set_insurance_coverage(&mut self, rate: Decimal) -> Result<()> {
        self.ensure_editable()?;
        self.insurance_coverage = Percentage::for_field(rate, "insuranceCoveragePercent")?;
        Ok(())
    }

    /// Sets or clears the fixed consultation/service fee.
    pub fn set_service_fee(&mut self, fee: Option<Decimal>) -> Result<()> {
        self.ensure_editable()?;
        self.service_fee = fee
            .map(|fee| Money::non_negative(fee, "serviceFee"))
            .transpose()?;
        Ok(())
    }

    /// Draft → Sent.
    pub fn send(&mut self) -> Result<()> {
        match self.status {
            InvoiceStatus::Draft => {
                self.status = InvoiceStatus::Sent;
                Ok(())
            }
            other => Err(BillingError::invariant(format!(
                "cannot send an invoice in status {other:?}"
            ))),
        }
    }

    /// Sent or PartiallyPaid → Overdue.
    pub fn mark_overdue(&mut self) -> Result<()> {
        match self.status {
            InvoiceStatus::Sent | InvoiceStatus::PartiallyPaid => {
                self.status = InvoiceStatus::Overdue;
                Ok(())
            }
            other => Err(BillingError::invariant(format!(
                "cannot mark an invoice in status {other:?} overdue"
            ))),
        }
    }

    /// Attaches a completed payment. `total` is the invoice total at the time of charge.
    pub(crate) fn record_payment(&mut self, record: TransactionRecord, total: Money) -> Result<()> {
        self.ensure_editable()?;
        if !record.is_completed() || record.invoice_ref() != self.id {
            return Err(BillingError::invariant(
                "only completed payments for this invoice can be attached",
            ));
        }
        self.amount_paid += record.amount_charged();
        self.payments.push(record);
        self.status = if total - self.amount_paid > Money::ZERO {
            InvoiceStatus::PartiallyPaid
        } else {
            InvoiceStatus::Paid
        };
        Ok(())
    }

    pub fn is_paid(&self) -> bool {
        self.status == InvoiceStatus::Paid
    }

    fn ensure_editable(&self) -> Result<()> {
        if self.is_paid() {
            return Err(BillingError::invariant("invoice is paid and can no longer change"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::instrument::PaymentMethod;
    use rust_decimal_macros::dec;

    fn entry(code: &str, price: Decimal) -> CatalogEntry {
        CatalogEntry {
            code: code.to_string(),
            description: format!("{code} service"),
            unit_price: price,
        }
    }

    fn completed(invoice: &Invoice, amount: Decimal) -> TransactionRecord {
        TransactionRecord::completed(invoice.id(), Money::new(amount), PaymentMethod::Cash, None, None)
    }

    #[test]
    fn test_add_same_code_accumulates_quantity() {
        let mut invoice = Invoice::new("PAT-001");
        let first = invoice.add_catalog_item(&entry("PHA-PARA", dec!(2.50)), 2).unwrap();
        let second = invoice.add_catalog_item(&entry("PHA-PARA", dec!(2.50)), 3).unwrap();

        assert_eq!(first, second);
        assert_eq!(invoice.line_items().len(), 1);
        assert_eq!(invoice.line_items()[0].quantity(), 5);
        assert_eq!(invoice.line_items()[0].line_total(), Money::new(dec!(12.50)));
    }

    #[test]
    fn test_update_quantity_to_zero_removes_line() {
        let mut invoice = Invoice::new("PAT-001");
        let id = invoice.add_catalog_item(&entry("LAB-CBC", dec!(20)), 1).unwrap();
        invoice.update_item(id, LineItemUpdate::Quantity(0)).unwrap();
        assert!(invoice.line_items().is_empty());
    }

    #[test]
    fn test_adjust_quantity() {
        let mut invoice = Invoice::new("PAT-001");
        let id = invoice.add_catalog_item(&entry("LAB-CBC", dec!(20)), 2).unwrap();

        invoice.adjust_quantity(id, 1).unwrap();
        assert_eq!(invoice.line_item(id).unwrap().quantity(), 3);

        invoice.adjust_quantity(id, -5).unwrap();
        assert!(invoice.line_item(id).is_none());
    }

    #[test]
    fn test_unknown_line_is_not_found() {
        let mut invoice = Invoice::new("PAT-001");
        assert!(matches!(invoice.remove_item(42), Err(BillingError::NotFound(_))));
        assert!(matches!(
            invoice.update_item(42, LineItemUpdate::Quantity(2)),
            Err(BillingError::NotFound(_))
        ));
    }

    #[test]
    fn test_rate_setters_validate_range() {
        let mut invoice = Invoice::new("PAT-001");
        let err = invoice.set_tax_rate(dec!(101)).unwrap_err();
        assert!(err.field_errors().unwrap().contains("taxRatePercent"));
        let err = invoice.set_insurance_coverage(dec!(-5)).unwrap_err();
        assert!(err.field_errors().unwrap().contains("insuranceCoveragePercent"));
        assert_eq!(invoice.tax_rate(), Percentage::ZERO);
    }

    #[test]
    fn test_discount_spec_validation() {
        assert!(DiscountSpec::amount(dec!(1000)).is_ok());
        assert!(DiscountSpec::percentage(dec!(150)).is_err());
        assert!(DiscountSpec::amount(dec!(-1)).is_err());
    }

    #[test]
    fn test_negative_percentage_discount_never_applies() {
        use crate::application::pricing::PricingCalculator;

        let mut invoice = Invoice::new("PAT-001");
        invoice.add_catalog_item(&entry("OPD-CONSULT", dec!(100)), 1).unwrap();
        let negative = DiscountSpec {
            kind: DiscountKind::Percentage,
            value: dec!(-10),
        };

        let err = invoice.set_discount(negative).unwrap_err();
        assert!(err.field_errors().unwrap().contains("discount"));
        assert_eq!(invoice.discount(), DiscountSpec::none());

        // Even if one slips past the setter the clamp keeps it at zero.
        invoice.discount = negative;
        let totals = PricingCalculator::new().compute(&invoice);
        assert_eq!(totals.discount_amount, Money::ZERO);
        assert_eq!(totals.total, Money::new(dec!(100)));
    }

    #[test]
    fn test_status_lifecycle() {
        let mut invoice = Invoice::new("PAT-001");
        assert!(invoice.mark_overdue().is_err());
        invoice.send().unwrap();
        assert_eq!(invoice.status(), InvoiceStatus::Sent);
        assert!(invoice.send().is_err());
        invoice.mark_overdue().unwrap();
        assert_eq!(invoice.status(), InvoiceStatus::Overdue);
    }

    #[test]
    fn test_partial_then_full_payment() {
        let mut invoice = Invoice::new("PAT-001");
        invoice.add_catalog_item(&entry("OPD-CONSULT", dec!(100)), 1).unwrap();
        let total = Money::new(dec!(100));

        invoice.record_payment(completed(&invoice, dec!(40)), total).unwrap();
        assert_eq!(invoice.status(), InvoiceStatus::PartiallyPaid);
        assert_eq!(invoice.amount_paid(), Money::new(dec!(40)));

        invoice.record_payment(completed(&invoice, dec!(60)), total).unwrap();
        assert_eq!(invoice.status(), InvoiceStatus::Paid);
        assert_eq!(invoice.payments().len(), 2);
    }

    #[test]
    fn test_paid_invoice_is_immutable() {
        let mut invoice = Invoice::new("PAT-001");
        let id = invoice.add_catalog_item(&entry("OPD-CONSULT", dec!(100)), 1).unwrap();
        invoice
            .record_payment(completed(&invoice, dec!(100)), Money::new(dec!(100)))
            .unwrap();

        assert!(invoice.set_tax_rate(dec!(5)).unwrap_err().is_invariant_violation());
        assert!(invoice.remove_item(id).unwrap_err().is_invariant_violation());
        assert!(invoice.adjust_quantity(id, 1).unwrap_err().is_invariant_violation());
        assert!(invoice.adjust_quantity(99, 1).unwrap_err().is_invariant_violation());
        assert!(
            invoice
                .add_custom_item("PROC", "Dressing", dec!(5), 1)
                .unwrap_err()
                .is_invariant_violation()
        );
    }

    #[test]
    fn test_failed_record_cannot_be_attached() {
        let mut invoice = Invoice::new("PAT-001");
        let failed = TransactionRecord::failed(
            invoice.id(),
            Money::new(dec!(10)),
            PaymentMethod::Card,
            None,
            "declined",
        );
        let result = invoice.record_payment(failed, Money::new(dec!(10)));
        assert!(result.unwrap_err().is_invariant_violation());
        assert_eq!(invoice.amount_paid(), Money::ZERO);
    }
}
