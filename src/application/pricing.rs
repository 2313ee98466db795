use crate::domain::invoice::{DiscountKind, Invoice};
use crate::domain::money::Money;
use crate::domain::totals::Totals;
use rust_decimal_macros::dec;

/// Turns an invoice snapshot into its [`Totals`].
///
/// The order of operations is fixed:
///
/// 1. subtotal = sum of line totals, plus the service fee when present
/// 2. discount = flat amount or percentage of subtotal, clamped to `[0, subtotal]`
/// 3. taxable base = subtotal - discount
/// 4. tax = taxable base * tax rate
/// 5. insurance covered = taxable base * coverage rate, independent of tax
/// 6. total = taxable base + tax - insurance covered
///
/// Each step is rounded to cents before the next one reads it. The total is
/// not floored at zero; a negative total is reported as a credit.
#[derive(Debug, Default, Clone, Copy)]
pub struct PricingCalculator;

impl PricingCalculator {
    pub fn new() -> Self {
        Self
    }

    pub fn compute(&self, invoice: &Invoice) -> Totals {
        let lines: Money = invoice.line_items().iter().map(|item| item.line_total()).sum();
        let subtotal = lines + invoice.service_fee().unwrap_or(Money::ZERO);

        let discount = invoice.discount();
        let requested = match discount.kind() {
            DiscountKind::Percentage => Money::new(subtotal.value() * discount.value() / dec!(100)),
            DiscountKind::Amount => Money::new(discount.value()),
        };
        let discount_amount = requested.clamp_to(Money::ZERO, subtotal.max(Money::ZERO));

        let taxable_base = subtotal - discount_amount;
        let tax_amount = taxable_base.percent(invoice.tax_rate());
        let insurance_covered = taxable_base.percent(invoice.insurance_coverage());
        let total = taxable_base + tax_amount - insurance_covered;

        Totals {
            subtotal,
            discount_amount,
            taxable_base,
            tax_amount,
            insurance_covered,
            total,
        }
    }
}
