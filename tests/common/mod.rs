#![allow(dead_code)]

use medbill::application::engine::BillingEngine;
use medbill::config::{EngineConfig, ProcessingDelays};
use medbill::domain::instrument::{CardDetails, PaymentInstrument};
use medbill::domain::line_item::CatalogEntry;
use medbill::domain::money::Money;
use medbill::domain::ports::{CatalogRef, PaymentRail};
use medbill::infrastructure::in_memory::InMemoryCatalog;
use medbill::infrastructure::simulated_rail::SimulatedRail;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::fs::File;
use std::io::Error;
use std::path::Path;
use std::sync::Arc;

pub fn hospital_catalog() -> CatalogRef {
    let entries = [
        ("OPD-CONSULT", "Outpatient consultation", dec!(200.00)),
        ("LAB-CBC", "Complete blood count", dec!(150.00)),
        ("PHA-AMOX", "Amoxicillin 500mg strip", dec!(100.00)),
        ("IPD-BED", "General ward bed (per day)", dec!(1250.00)),
        ("PROC-ECG", "Electrocardiogram", dec!(45.75)),
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

pub fn engine_with_rail(rail: impl PaymentRail + 'static) -> BillingEngine {
    BillingEngine::open("PAT-0001", hospital_catalog(), Box::new(rail), &EngineConfig::default())
        .unwrap()
}

pub fn instant_engine() -> BillingEngine {
    engine_with_rail(SimulatedRail::new(ProcessingDelays::instant()))
}

pub fn cash(received_by: &str) -> PaymentInstrument {
    PaymentInstrument::Cash {
        received_by: received_by.to_string(),
    }
}

pub fn card(number: &str) -> PaymentInstrument {
    PaymentInstrument::Card(CardDetails {
        number: number.to_string(),
        expiry: "11/28".to_string(),
        cvv: "456".to_string(),
        holder_name: "Meera Pillai".to_string(),
    })
}

pub fn money(value: Decimal) -> Money {
    Money::new(value)
}

pub fn write_csv(path: &Path, header: &[&str], rows: &[Vec<String>]) -> Result<(), Error> {
    let file = File::create(path)?;
    let mut wtr = csv::WriterBuilder::new().from_writer(file);

    wtr.write_record(header)?;
    for row in rows {
        wtr.write_record(row)?;
    }

    wtr.flush()?;
    Ok(())
}
