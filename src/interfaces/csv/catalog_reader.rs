use crate::domain::line_item::CatalogEntry;
use crate::error::{BillingError, Result};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Read;

#[derive(Debug, Deserialize)]
struct CatalogRow {
    code: String,
    description: String,
    unit_price: Decimal,
}

/// Reads catalog entries (`code,description,unit_price`) from a CSV source.
///
/// Rows are trimmed; a negative price is reported as a validation error for
/// that row without stopping the stream.
pub struct CatalogReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> CatalogReader<R> {
    /// Creates a new `CatalogReader` from any `Read` source (e.g., File, Stdin).
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Returns an iterator that lazily reads and deserializes catalog entries.
    pub fn entries(self) -> impl Iterator<Item = Result<CatalogEntry>> {
        self.reader.into_deserialize().map(|result| {
            let row: CatalogRow = result.map_err(BillingError::from)?;
            if row.unit_price < Decimal::ZERO {
                return Err(BillingError::field("unit_price", "must not be negative"));
            }
            Ok(CatalogEntry {
                code: row.code,
                description: row.description,
                unit_price: row.unit_price,
            })
        })
    }
}
