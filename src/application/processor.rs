use crate::application::validator::{PaymentValidator, ValidatedInstrument};
use crate::domain::instrument::{PaymentInstrument, PaymentMethod};
use crate::domain::invoice::InvoiceId;
use crate::domain::money::Money;
use crate::domain::ports::{ChargeRequest, PaymentRailBox, RailOutcome};
use crate::domain::transaction::TransactionRecord;
use crate::error::{BillingError, Result};
use serde::Serialize;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::timeout;

pub const ALREADY_IN_PROGRESS: &str = "payment already in progress";
pub const NO_BALANCE: &str = "invoice has no remaining balance";
pub const RAIL_TIMEOUT: &str = "payment rail did not respond in time";

/// Where a payment submission is in its lifecycle.
///
/// `Validating` only exists inside a synchronous call and is never observed
/// across an await point. `Completed` and `Failed` are terminal for the
/// submission that reached them; a new submission starts over at `Validating`.
#[derive(Debug, Serialize, PartialEq, Eq, Clone, Copy, Default)]
#[serde(rename_all = "lowercase")]
pub enum SubmissionState {
    #[default]
    Idle,
    Validating,
    Processing,
    Completed,
    Failed,
}

impl SubmissionState {
    pub fn can_transition_to(self, next: SubmissionState) -> bool {
        use SubmissionState::*;
        matches!(
            (self, next),
            (Idle | Completed | Failed, Validating)
                | (Validating, Idle | Processing)
                // Processing -> Idle is an abandoned submission.
                | (Processing, Completed | Failed | Idle)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, SubmissionState::Completed | SubmissionState::Failed)
    }

    pub fn is_in_flight(self) -> bool {
        matches!(self, SubmissionState::Validating | SubmissionState::Processing)
    }
}

/// What the caller wants charged.
#[derive(Debug, Clone, Copy)]
pub struct PaymentRequest<'a> {
    pub invoice_id: InvoiceId,
    pub invoice_balance: Money,
    pub method: PaymentMethod,
    pub instrument: &'a PaymentInstrument,
    pub amount: Money,
}

/// Drives one invoice's payment submissions through [`SubmissionState`].
///
/// Only one submission may be in flight at a time; a second one is rejected
/// rather than queued. Processing is bounded by `timeout`: a rail that does
/// not answer in time yields a `Failed` record.
pub struct TransactionProcessor {
    rail: PaymentRailBox,
    validator: PaymentValidator,
    timeout: Duration,
    state: Mutex<SubmissionState>,
}

impl TransactionProcessor {
    pub fn new(rail: PaymentRailBox, timeout: Duration) -> Self {
        Self {
            rail,
            validator: PaymentValidator::new(),
            timeout,
            state: Mutex::new(SubmissionState::Idle),
        }
    }

    pub fn state(&self) -> SubmissionState {
        *self.lock_state()
    }

    pub fn is_processing(&self) -> bool {
        self.state().is_in_flight()
    }

    /// Validates and charges in one call.
    pub async fn submit(&self, request: PaymentRequest<'_>) -> Result<TransactionRecord> {
        let submission = self.prepare(request)?;
        Ok(submission.execute().await)
    }

    /// Runs the synchronous half of a submission: the in-flight guard, the
    /// balance check and validation. On success the processor is `Processing`
    /// until the returned [`Submission`] is executed or dropped.
    pub fn prepare(&self, request: PaymentRequest<'_>) -> Result<Submission<'_>> {
        {
            let mut state = self.lock_state();
            if state.is_in_flight() {
                tracing::warn!(invoice = %request.invoice_id, "rejected concurrent payment submission");
                return Err(BillingError::invariant(ALREADY_IN_PROGRESS));
            }
            if !request.invoice_balance.is_positive() {
                return Err(BillingError::invariant(NO_BALANCE));
            }
            advance(&mut state, SubmissionState::Validating)?;
        }

        let validated = self.validator.validate(
            request.method,
            request.instrument,
            request.amount,
            request.invoice_balance,
        );

        let mut state = self.lock_state();
        match validated {
            Ok(instrument) => {
                advance(&mut state, SubmissionState::Processing)?;
                tracing::info!(
                    invoice = %request.invoice_id,
                    method = %request.method,
                    amount = %request.amount,
                    "payment processing"
                );
                Ok(Submission {
                    processor: self,
                    request: ChargeRequest {
                        invoice_id: request.invoice_id,
                        method: request.method,
                        amount: request.amount,
                        instrument,
                    },
                    settled: false,
                })
            }
            Err(errors) => {
                advance(&mut state, SubmissionState::Idle)?;
                tracing::debug!(invoice = %request.invoice_id, %errors, "payment rejected by validation");
                Err(BillingError::ValidationError(errors))
            }
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, SubmissionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn advance(state: &mut SubmissionState, next: SubmissionState) -> Result<()> {
    if !state.can_transition_to(next) {
        return Err(BillingError::invariant(format!(
            "illegal submission transition {state:?} -> {next:?}"
        )));
    }
    *state = next;
    Ok(())
}

/// A validated submission holding the processor in `Processing`.
///
/// Dropping it before [`execute`](Submission::execute) finishes abandons the
/// payment: no record is produced and the processor returns to `Idle`.
pub struct Submission<'a> {
    processor: &'a TransactionProcessor,
    request: ChargeRequest,
    settled: bool,
}

impl Submission<'_> {
    pub fn instrument(&self) -> &ValidatedInstrument {
        &self.request.instrument
    }

    /// Sends the charge to the rail and produces the terminal record.
    pub async fn execute(mut self) -> TransactionRecord {
        let record = self.charge().await;
        self.finish(record)
    }

    /// Like [`execute`](Self::execute), but runs `attach` on a completed record
    /// before the processor leaves `Processing`. Nothing else can be submitted
    /// until `attach` has returned.
    ///
    /// A failed `attach` settles the submission as `Failed` and returns its error.
    pub async fn execute_and_attach<T, F>(mut self, attach: F) -> Result<(TransactionRecord, Option<T>)>
    where
        F: FnOnce(&TransactionRecord) -> Result<T>,
    {
        let record = self.charge().await;
        if !record.is_completed() {
            return Ok((self.finish(record), None));
        }
        match attach(&record) {
            Ok(attached) => Ok((self.finish(record), Some(attached))),
            Err(e) => {
                tracing::error!(invoice = %record.invoice_ref(), error = %e, "completed payment could not be attached");
                self.settle(SubmissionState::Failed);
                Err(e)
            }
        }
    }

    async fn charge(&self) -> TransactionRecord {
        let processor = self.processor;
        let request = &self.request;
        let outcome = timeout(processor.timeout, processor.rail.charge(request)).await;
        let summary = Some(request.instrument.summary());

        match outcome {
            Ok(RailOutcome::Approved { reference }) => TransactionRecord::completed(
                request.invoice_id,
                request.amount,
                request.method,
                summary,
                Some(reference),
            ),
            Ok(RailOutcome::Declined { reason }) => TransactionRecord::failed(
                request.invoice_id,
                request.amount,
                request.method,
                summary,
                reason,
            ),
            Err(_) => TransactionRecord::failed(
                request.invoice_id,
                request.amount,
                request.method,
                summary,
                RAIL_TIMEOUT,
            ),
        }
    }

    fn finish(&mut self, record: TransactionRecord) -> TransactionRecord {
        let terminal = if record.is_completed() {
            tracing::info!(invoice = %record.invoice_ref(), transaction = %record.id(), "payment completed");
            SubmissionState::Completed
        } else {
            tracing::warn!(
                invoice = %record.invoice_ref(),
                reason = record.failure_reason().unwrap_or_default(),
                "payment failed"
            );
            SubmissionState::Failed
        };
        self.settle(terminal);
        record
    }

    fn settle(&mut self, next: SubmissionState) {
        let mut state = self.processor.lock_state();
        if let Err(e) = advance(&mut state, next) {
            tracing::error!(
                invoice = %self.request.invoice_id,
                current = ?*state,
                error = %e,
                "submission could not settle"
            );
        }
        self.settled = true;
    }
}

impl Drop for Submission<'_> {
    fn drop(&mut self) {
        if !self.settled {
            tracing::warn!(invoice = %self.request.invoice_id, "payment submission abandoned");
            self.settle(SubmissionState::Idle);
        }
    }
}
