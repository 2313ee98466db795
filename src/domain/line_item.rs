use crate::domain::money::Money;
use crate::error::{BillingError, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Per-invoice line identifier, assigned in insertion order.
pub type LineItemId = u32;

/// A catalog entry as supplied by a [`LineItemCatalog`](crate::domain::ports::LineItemCatalog).
///
/// `unit_price` keeps its full precision; pharmacy unit prices are often sub-cent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub code: String,
    pub description: String,
    pub unit_price: Decimal,
}

/// A priced, quantified entry on an invoice.
///
/// `line_total` is `unit_price * quantity` rounded to cents and is recomputed by
/// every setter; it is never assigned independently. The unit price itself is
/// not rounded.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    id: LineItemId,
    code: String,
    description: String,
    unit_price: Decimal,
    quantity: u32,
    line_total: Money,
}

/// A single-field edit of a line item.
#[derive(Debug, Clone, PartialEq)]
pub enum LineItemUpdate {
    Description(String),
    UnitPrice(Decimal),
    /// A quantity of zero removes the line from its invoice.
    Quantity(u32),
}

impl LineItem {
    pub(crate) fn new(
        id: LineItemId,
        code: impl Into<String>,
        description: impl Into<String>,
        unit_price: Decimal,
        quantity: u32,
    ) -> Result<Self> {
        if unit_price < Decimal::ZERO {
            return Err(BillingError::field("unitPrice", "must not be negative"));
        }
        if quantity == 0 {
            return Err(BillingError::field("quantity", "must be at least 1"));
        }
        Ok(Self {
            id,
            code: code.into(),
            description: description.into(),
            unit_price,
            quantity,
            line_total: line_total(unit_price, quantity),
        })
    }

    pub(crate) fn from_catalog(id: LineItemId, entry: &CatalogEntry, quantity: u32) -> Result<Self> {
        Self::new(id, &entry.code, &entry.description, entry.unit_price, quantity)
    }

    pub fn id(&self) -> LineItemId {
        self.id
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn unit_price(&self) -> Decimal {
        self.unit_price
    }

    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    pub fn line_total(&self) -> Money {
        self.line_total
    }

    pub(crate) fn set_description(&mut self, description: String) {
        self.description = description;
    }

    pub(crate) fn set_unit_price(&mut self, unit_price: Decimal) -> Result<()> {
        if unit_price < Decimal::ZERO {
            return Err(BillingError::field("unitPrice", "must not be negative"));
        }
        self.unit_price = unit_price;
        self.recompute();
        Ok(())
    }

    /// Callers handle zero by removing the line; a zero here is rejected.
    pub(crate) fn set_quantity(&mut self, quantity: u32) -> Result<()> {
        if quantity == 0 {
            return Err(BillingError::field("quantity", "must be at least 1"));
        }
        self.quantity = quantity;
        self.recompute();
        Ok(())
    }

    fn recompute(&mut self) {
        self.line_total = line_total(self.unit_price, self.quantity);
    }
}

fn line_total(unit_price: Decimal, quantity: u32) -> Money {
    Money::new(unit_price * Decimal::from(quantity))
}
