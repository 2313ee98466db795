use crate::error::Result;
use serde::Serialize;
use std::io::Write;

/// Writes receipts, totals and field errors as pretty-printed JSON documents.
pub struct ReceiptWriter<W: Write> {
    writer: W,
}

impl<W: Write> ReceiptWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Writes one document followed by a newline.
    pub fn write<T: Serialize>(&mut self, document: &T) -> Result<()> {
        serde_json::to_writer_pretty(&mut self.writer, document)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::money::Money;
    use crate::domain::totals::Totals;
    use rust_decimal_macros::dec;

    #[test]
    fn test_write_totals() {
        let totals = Totals {
            subtotal: Money::new(dec!(450)),
            taxable_base: Money::new(dec!(450)),
            tax_amount: Money::new(dec!(36)),
            total: Money::new(dec!(486)),
            ..Totals::default()
        };
        let mut writer = ReceiptWriter::new(Vec::new());
        writer.write(&totals).unwrap();

        let output = String::from_utf8(writer.into_inner()).unwrap();
        assert!(output.contains("\"total\": \"486.00\""));
        assert!(output.contains("\"discountAmount\": \"0.00\""));
        assert!(output.ends_with("}\n"));
    }
}
