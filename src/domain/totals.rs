use crate::domain::money::Money;
use serde::Serialize;

/// The computed breakdown of an invoice, every component at cent precision.
#[derive(Debug, Serialize, PartialEq, Eq, Clone, Copy, Default)]
#[serde(rename_all = "camelCase")]
pub struct Totals {
    pub subtotal: Money,
    pub discount_amount: Money,
    pub taxable_base: Money,
    pub tax_amount: Money,
    pub insurance_covered: Money,
    /// Patient-payable amount. Negative when coverage and discount exceed the base.
    pub total: Money,
}

impl Totals {
    /// A negative total is money owed back to the payer.
    pub fn is_credit(&self) -> bool {
        self.total.is_negative()
    }

    /// What remains to be paid after `amount_paid` has been collected.
    pub fn balance_after(&self, amount_paid: Money) -> Money {
        self.total - amount_paid
    }
}
