use crate::config::ProcessingDelays;
use crate::domain::ports::{ChargeRequest, PaymentRail, RailOutcome};
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::time::sleep;

/// Stands in for a real payment gateway.
///
/// Each charge waits for the method's configured delay and then approves it,
/// unless the rail was built to decline. There is no network I/O.
#[derive(Debug)]
pub struct SimulatedRail {
    delays: ProcessingDelays,
    decline_reason: Option<String>,
    sequence: AtomicU64,
}

impl SimulatedRail {
    pub fn new(delays: ProcessingDelays) -> Self {
        Self {
            delays,
            decline_reason: None,
            sequence: AtomicU64::new(0),
        }
    }

    /// A rail that declines every charge with `reason`.
    pub fn declining(delays: ProcessingDelays, reason: impl Into<String>) -> Self {
        Self {
            decline_reason: Some(reason.into()),
            ..Self::new(delays)
        }
    }

    /// Number of charges that reached the end of their delay.
    pub fn charges_seen(&self) -> u64 {
        self.sequence.load(Ordering::Relaxed)
    }
}

impl Default for SimulatedRail {
    fn default() -> Self {
        Self::new(ProcessingDelays::default())
    }
}

#[async_trait]
impl PaymentRail for SimulatedRail {
    async fn charge(&self, request: &ChargeRequest) -> RailOutcome {
        sleep(self.delays.for_method(request.method)).await;
        let seq = self.sequence.fetch_add(1, Ordering::Relaxed) + 1;

        match &self.decline_reason {
            Some(reason) => RailOutcome::Declined {
                reason: reason.clone(),
            },
            None => RailOutcome::Approved {
                reference: format!("SIM-{}-{seq:06}", request.method.as_str().to_uppercase()),
            },
        }
    }
}
