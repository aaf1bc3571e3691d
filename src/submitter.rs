//! Pending transaction submitter
//!
//! Drives one batch: fetch the signed, unconfirmed transactions, submit each in
//! order, and commit the outcome before moving on to the next.

use crate::classifier::{classify, SubmissionOutcome};
use crate::network::LedgerClient;
use crate::router::{ErrorRouter, ResignRequest, Routed};
use crate::store::{PendingTransaction, TransactionStore};
use crate::Result;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Submitter configuration
#[derive(Debug, Clone)]
pub struct SubmitterConfig {
    /// Signing account the pending transactions belong to
    pub account: String,

    /// Maximum number of transactions processed per batch (at least 1)
    pub max_batch_size: usize,

    /// Delay between batches when running continuously (milliseconds)
    pub poll_interval_ms: u64,
}

impl Default for SubmitterConfig {
    fn default() -> Self {
        Self {
            account: String::new(),
            max_batch_size: 100,
            poll_interval_ms: 4_000, // roughly one ledger close
        }
    }
}

/// Per-batch counters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// Transactions taken from the store
    pub processed: usize,

    /// Accepted by the network
    pub submitted: usize,

    /// Found in a ledger during reconciliation
    pub confirmed: usize,

    /// Terminal errors recorded
    pub errored: usize,

    /// Still in flight; looked at again next batch
    pub in_flight: usize,
}

/// Result of a batch that did not fail
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOutcome {
    /// Every transaction in the batch was handled
    Completed(BatchReport),

    /// Processing stopped at a transaction that must be re-signed
    ResignRequired {
        request: ResignRequest,
        report: BatchReport,
    },
}

impl BatchOutcome {
    pub fn report(&self) -> &BatchReport {
        match self {
            BatchOutcome::Completed(report) => report,
            BatchOutcome::ResignRequired { report, .. } => report,
        }
    }
}

/// Submits pending transactions and reconciles their outcome
pub struct TransactionSubmitter {
    config: SubmitterConfig,
    store: Arc<dyn TransactionStore>,
    client: Arc<dyn LedgerClient>,
    router: ErrorRouter,
}

impl TransactionSubmitter {
    /// Create a new submitter
    pub fn new(
        mut config: SubmitterConfig,
        store: Arc<dyn TransactionStore>,
        client: Arc<dyn LedgerClient>,
    ) -> Self {
        if config.max_batch_size == 0 {
            warn!("max_batch_size of 0 would never submit anything, using 1");
            config.max_batch_size = 1;
        }

        let router = ErrorRouter::new(store.clone(), client.clone());

        Self {
            config,
            store,
            client,
            router,
        }
    }

    pub fn config(&self) -> &SubmitterConfig {
        &self.config
    }

    /// Submit every pending transaction once
    ///
    /// Transactions are handled strictly in order. Processing stops at the
    /// first transaction that needs re-signing, and at the first error that
    /// cannot be resolved locally, which is returned as `Err`.
    pub async fn submit_pending(&self) -> Result<BatchOutcome> {
        let mut pending = self.store.get_signed_unconfirmed_transactions().await?;
        if pending.len() > self.config.max_batch_size {
            debug!(
                "Deferring {} transactions to the next batch",
                pending.len() - self.config.max_batch_size
            );
            pending.truncate(self.config.max_batch_size);
        }

        if pending.is_empty() {
            debug!("No pending transactions for {}", self.config.account);
            return Ok(BatchOutcome::Completed(BatchReport::default()));
        }

        info!(
            "Submitting {} pending transactions for {}",
            pending.len(),
            self.config.account
        );

        let mut report = BatchReport::default();

        for transaction in &pending {
            report.processed += 1;

            let routed = match self.submit_one(transaction).await {
                Ok(routed) => routed,
                Err(e) => {
                    if e.is_fatal() {
                        error!(
                            "Fatal error on transaction {}, stopping batch: {}",
                            transaction.id, e
                        );
                    } else {
                        warn!("Transaction {} stopped the batch: {}", transaction.id, e);
                    }
                    return Err(e);
                }
            };

            match routed {
                None => report.submitted += 1,
                Some(Routed::Ignored) => report.in_flight += 1,
                Some(Routed::Confirmed) => report.confirmed += 1,
                Some(Routed::Recorded) => report.errored += 1,
                Some(Routed::Resign(request)) => {
                    report.errored += 1;
                    return Ok(BatchOutcome::ResignRequired { request, report });
                }
            }
        }

        info!(
            "Batch done: {} submitted, {} confirmed, {} errored, {} in flight",
            report.submitted, report.confirmed, report.errored, report.in_flight
        );

        Ok(BatchOutcome::Completed(report))
    }

    /// Submit one transaction; `None` means the network accepted it
    async fn submit_one(&self, transaction: &PendingTransaction) -> Result<Option<Routed>> {
        debug!(
            "Submitting transaction {} (sequence {}, hash {})",
            transaction.id, transaction.sequence, transaction.hash
        );

        let response = self.client.submit_transaction_blob(&transaction.blob).await?;

        match classify(&response.result) {
            SubmissionOutcome::Success => {
                self.store
                    .mark_transaction_submitted(transaction.id)
                    .await?;
                info!("Transaction {} submitted successfully", transaction.id);
                Ok(None)
            }
            SubmissionOutcome::Failed(e) => {
                debug!("Transaction {} rejected: {}", transaction.id, e);
                self.router.route(transaction, e).await.map(Some)
            }
        }
    }

    /// Run batches until a transaction needs re-signing or an error stops
    /// processing
    ///
    /// Returns the re-sign request so the caller can rebuild the transaction
    /// and call `run` again.
    pub async fn run(&self) -> Result<ResignRequest> {
        let interval = tokio::time::Duration::from_millis(self.config.poll_interval_ms);

        loop {
            match self.submit_pending().await? {
                BatchOutcome::Completed(_) => tokio::time::sleep(interval).await,
                BatchOutcome::ResignRequired { request, .. } => return Ok(request),
            }
        }
    }
}
