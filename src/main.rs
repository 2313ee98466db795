use clap::{Parser, ValueEnum};
use medbill::application::engine::{BillingEngine, PaymentOutcome};
use medbill::config::EngineConfig;
use medbill::domain::instrument::{CardDetails, PaymentInstrument, PaymentMethod};
use medbill::domain::invoice::DiscountSpec;
use medbill::domain::ports::CatalogRef;
use medbill::error::BillingError;
use medbill::infrastructure::in_memory::InMemoryCatalog;
use medbill::infrastructure::simulated_rail::SimulatedRail;
use medbill::interfaces::csv::cart_reader::CartReader;
use medbill::interfaces::csv::catalog_reader::CatalogReader;
use medbill::interfaces::json::receipt_writer::ReceiptWriter;
use medbill::telemetry::init_tracing;
use miette::{IntoDiagnostic, Result, miette};
use rust_decimal::Decimal;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum MethodArg {
    Card,
    Debit,
    Check,
    BankTransfer,
    Cash,
    InsuranceClaim,
}

impl From<MethodArg> for PaymentMethod {
    fn from(method: MethodArg) -> Self {
        match method {
            MethodArg::Card => PaymentMethod::Card,
            MethodArg::Debit => PaymentMethod::Debit,
            MethodArg::Check => PaymentMethod::Check,
            MethodArg::BankTransfer => PaymentMethod::BankTransfer,
            MethodArg::Cash => PaymentMethod::Cash,
            MethodArg::InsuranceClaim => PaymentMethod::InsuranceClaim,
        }
    }
}

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Catalog CSV file (code,description,unit_price)
    catalog: PathBuf,

    /// Cart CSV file (code,quantity)
    cart: PathBuf,

    /// Engine configuration JSON file
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long, default_value = "WALK-IN")]
    patient: String,

    /// Tax rate percent; overrides the configured default
    #[arg(long)]
    tax_rate: Option<Decimal>,

    #[arg(long, conflicts_with = "discount_amount")]
    discount_percent: Option<Decimal>,

    #[arg(long)]
    discount_amount: Option<Decimal>,

    /// Insurance coverage percent
    #[arg(long)]
    coverage: Option<Decimal>,

    /// Consultation/service fee; overrides the configured default
    #[arg(long)]
    service_fee: Option<Decimal>,

    /// Pay with this method. Without it only the totals are printed.
    #[arg(long, value_enum)]
    method: Option<MethodArg>,

    /// Amount to charge (defaults to the full balance)
    #[arg(long)]
    amount: Option<Decimal>,

    #[arg(long, default_value = "")]
    card_number: String,
    #[arg(long, default_value = "")]
    expiry: String,
    #[arg(long, default_value = "")]
    cvv: String,
    #[arg(long, default_value = "")]
    holder_name: String,
    #[arg(long, default_value = "")]
    check_number: String,
    #[arg(long, default_value = "")]
    bank_name: String,
    #[arg(long, default_value = "")]
    account_number: String,
    #[arg(long, default_value = "")]
    routing_number: String,
    #[arg(long, default_value = "")]
    received_by: String,
    #[arg(long, default_value = "")]
    provider: String,
    #[arg(long, default_value = "")]
    authorization_number: String,
}

impl Cli {
    fn instrument(&self, method: MethodArg) -> PaymentInstrument {
        match method {
            MethodArg::Card | MethodArg::Debit => PaymentInstrument::Card(CardDetails {
                number: self.card_number.clone(),
                expiry: self.expiry.clone(),
                cvv: self.cvv.clone(),
                holder_name: self.holder_name.clone(),
            }),
            MethodArg::Check => PaymentInstrument::Check {
                check_number: self.check_number.clone(),
                bank_name: self.bank_name.clone(),
            },
            MethodArg::BankTransfer => PaymentInstrument::BankTransfer {
                account_number: self.account_number.clone(),
                routing_number: self.routing_number.clone(),
            },
            MethodArg::Cash => PaymentInstrument::Cash {
                received_by: self.received_by.clone(),
            },
            MethodArg::InsuranceClaim => PaymentInstrument::InsuranceClaim {
                provider: self.provider.clone(),
                authorization_number: self.authorization_number.clone(),
            },
        }
    }
}

fn load_catalog(path: &Path) -> Result<CatalogRef> {
    let file = File::open(path).into_diagnostic()?;
    let mut catalog = InMemoryCatalog::new();
    for entry in CatalogReader::new(file).entries() {
        match entry {
            Ok(entry) => catalog.insert(entry),
            Err(e) => eprintln!("Error reading catalog entry: {}", e),
        }
    }
    Ok(Arc::new(catalog))
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing("warn");
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => EngineConfig::from_path(path).into_diagnostic()?,
        None => EngineConfig::default(),
    };

    let catalog = load_catalog(&cli.catalog)?;
    let rail = Box::new(SimulatedRail::new(config.delays.clone()));
    let engine = BillingEngine::open(cli.patient.clone(), catalog, rail, &config).into_diagnostic()?;

    // Build the cart
    let file = File::open(&cli.cart).into_diagnostic()?;
    for entry in CartReader::new(file).entries() {
        let result = entry.and_then(|entry| engine.add_item(&entry.code, entry.quantity).map(|_| entry));
        if let Err(e) = result {
            eprintln!("Error adding cart item: {}", e);
        }
    }

    if let Some(rate) = cli.tax_rate {
        engine.set_tax_rate(rate).into_diagnostic()?;
    }
    if let Some(fee) = cli.service_fee {
        engine.set_service_fee(Some(fee)).into_diagnostic()?;
    }
    if let Some(rate) = cli.coverage {
        engine.set_insurance_coverage(rate).into_diagnostic()?;
    }
    let discount = match (cli.discount_percent, cli.discount_amount) {
        (Some(percent), _) => Some(DiscountSpec::percentage(percent).into_diagnostic()?),
        (None, Some(amount)) => Some(DiscountSpec::amount(amount).into_diagnostic()?),
        (None, None) => None,
    };
    if let Some(discount) = discount {
        engine.set_discount(discount).into_diagnostic()?;
    }

    let stdout = io::stdout();
    let mut writer = ReceiptWriter::new(stdout.lock());

    let Some(method) = cli.method else {
        writer.write(&engine.totals()).into_diagnostic()?;
        return Ok(());
    };

    let amount = cli.amount.unwrap_or_else(|| engine.balance().value());
    let instrument = cli.instrument(method);
    match engine.submit_payment(method.into(), &instrument, amount).await {
        Ok(PaymentOutcome::Completed(receipt)) => {
            writer.write(&receipt).into_diagnostic()?;
            Ok(())
        }
        Ok(PaymentOutcome::Failed(record)) => {
            writer.write(&record).into_diagnostic()?;
            Err(miette!(
                "Payment failed: {}",
                record.failure_reason().unwrap_or("unknown reason")
            ))
        }
        Err(BillingError::ValidationError(errors)) => {
            writer.write(&errors).into_diagnostic()?;
            Err(miette!("Payment rejected: {}", errors))
        }
        Err(e) => Err(e).into_diagnostic(),
    }
}
