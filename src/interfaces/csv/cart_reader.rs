use crate::error::{BillingError, Result};
use serde::Deserialize;
use std::io::Read;

/// One `code,quantity` row of a cart file.
#[derive(Debug, Deserialize, PartialEq, Eq, Clone)]
pub struct CartEntry {
    pub code: String,
    pub quantity: u32,
}

/// Reads the items to bill from a CSV source.
pub struct CartReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> CartReader<R> {
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    pub fn entries(self) -> impl Iterator<Item = Result<CartEntry>> {
        self.reader
            .into_deserialize()
            .map(|result| result.map_err(BillingError::from))
    }
}
