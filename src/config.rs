use crate::domain::instrument::PaymentMethod;
use crate::error::Result;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use std::time::Duration;

/// Simulated rail latency per method, in milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct ProcessingDelays {
    pub card: u64,
    pub debit: u64,
    pub check: u64,
    pub bank_transfer: u64,
    pub cash: u64,
    pub insurance_claim: u64,
}

impl Default for ProcessingDelays {
    fn default() -> Self {
        Self {
            card: 1_500,
            debit: 1_500,
            check: 2_000,
            bank_transfer: 2_500,
            cash: 500,
            insurance_claim: 4_000,
        }
    }
}

impl ProcessingDelays {
    /// All methods complete immediately. Useful for tests and batch runs.
    pub fn instant() -> Self {
        Self {
            card: 0,
            debit: 0,
            check: 0,
            bank_transfer: 0,
            cash: 0,
            insurance_claim: 0,
        }
    }

    pub fn for_method(&self, method: PaymentMethod) -> Duration {
        let millis = match method {
            PaymentMethod::Card => self.card,
            PaymentMethod::Debit => self.debit,
            PaymentMethod::Check => self.check,
            PaymentMethod::BankTransfer => self.bank_transfer,
            PaymentMethod::Cash => self.cash,
            PaymentMethod::InsuranceClaim => self.insurance_claim,
        };
        Duration::from_millis(millis)
    }
}

/// Engine settings. Every field has a default, so an empty JSON object is valid.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub delays: ProcessingDelays,
    /// Upper bound on a rail round trip before the submission fails.
    pub processing_timeout_ms: u64,
    pub default_tax_rate_percent: Decimal,
    /// Consultation/service fee applied to new invoices, if any.
    pub default_service_fee: Option<Decimal>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            delays: ProcessingDelays::default(),
            processing_timeout_ms: 30_000,
            default_tax_rate_percent: Decimal::ZERO,
            default_service_fee: None,
        }
    }
}

impl EngineConfig {
    pub fn from_reader<R: Read>(source: R) -> Result<Self> {
        Ok(serde_json::from_reader(source)?)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }

    pub fn processing_timeout(&self) -> Duration {
        Duration::from_millis(self.processing_timeout_ms)
    }
}
