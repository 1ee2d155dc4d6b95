use std::sync::Arc;

use tokio::sync::{Semaphore, mpsc};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{
    app_error::{AppError, AppResult},
    application::ports::settlement::SettlementScheduler,
    use_cases::payment::PaymentUseCases,
};

/// Creates the bounded settlement queue and the worker that drains it.
pub fn settlement_channel(capacity: usize, max_concurrent: usize) -> (SettlementQueue, SettlementWorker) {
    let (tx, rx) = mpsc::channel(capacity);
    (
        SettlementQueue { tx },
        SettlementWorker { rx, max_concurrent },
    )
}

/// Sending half handed to the payment use cases.
#[derive(Clone)]
pub struct SettlementQueue {
    tx: mpsc::Sender<Uuid>,
}

impl SettlementScheduler for SettlementQueue {
    /// Never waits. A full queue leaves the payment PENDING for
    /// reconciliation or the janitor.
    fn schedule(&self, payment_id: Uuid) -> AppResult<()> {
        self.tx.try_send(payment_id).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => {
                warn!(payment_id = %payment_id, "Settlement queue full");
                AppError::Internal("Settlement queue is full".into())
            }
            mpsc::error::TrySendError::Closed(_) => {
                AppError::Internal("Settlement worker is not running".into())
            }
        })
    }
}

pub struct SettlementWorker {
    rx: mpsc::Receiver<Uuid>,
    max_concurrent: usize,
}

impl SettlementWorker {
    /// Runs until every `SettlementQueue` handle is dropped, then waits for
    /// in-flight settlements to finish.
    pub async fn run(mut self, payment_use_cases: Arc<PaymentUseCases>) {
        let semaphore = Arc::new(Semaphore::new(self.max_concurrent));

        info!(
            "Settlement worker started (max {} concurrent)",
            self.max_concurrent
        );

        while let Some(payment_id) = self.rx.recv().await {
            let permit = match semaphore.clone().acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => {
                    error!("Settlement semaphore closed");
                    break;
                }
            };
            let uc = Arc::clone(&payment_use_cases);

            let handle = tokio::spawn(async move {
                let _permit = permit;
                settle_one(&uc, payment_id).await;
            });
            tokio::spawn(async move {
                if let Err(e) = handle.await {
                    error!(payment_id = %payment_id, error = %e, "Settlement task panicked");
                }
            });
        }

        // Wait for outstanding tasks by reclaiming every permit.
        let _ = semaphore.acquire_many(self.max_concurrent as u32).await;
        info!("Settlement worker stopped");
    }
}

async fn settle_one(payment_use_cases: &PaymentUseCases, payment_id: Uuid) {
    match payment_use_cases.settle(payment_id).await {
        Ok(payment) => {
            info!(payment_id = %payment_id, status = %payment.status, "Settlement finished");
        }
        Err(e) => {
            error!(payment_id = %payment_id, error = %e, "Settlement failed");
        }
    }
}
