//! Submission error routing
//!
//! Decides what a classified submission error does to the transaction: nothing,
//! a ledger reconciliation, a persisted terminal error, or a re-sign request
//! handed back to the caller.

use crate::error::{ErrorKind, SubmitError};
use crate::network::LedgerClient;
use crate::reconciler::LedgerReconciler;
use crate::store::{PendingTransaction, TransactionStore};
use crate::Result;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// A transaction that can never succeed as signed
///
/// The caller must rebuild it with a fresh sequence number and resubmit it. The
/// original record is already marked errored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResignRequest {
    /// The transaction that was rejected
    pub transaction: PendingTransaction,

    /// Why it was rejected
    pub cause: SubmitError,
}

impl ResignRequest {
    /// Express the request as a `ResignTransaction` error, for callers that
    /// want to propagate it with `?`
    pub fn into_error(self) -> SubmitError {
        SubmitError::new(ErrorKind::ResignTransaction).with_message(format!(
            "transaction {} (sequence {}) must be re-signed: {}",
            self.transaction.id, self.transaction.sequence, self.cause
        ))
    }
}

/// What routing did with an error
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Routed {
    /// Nothing to do until the next poll
    Ignored,

    /// Ledger lookup showed the transaction landed; marked confirmed
    Confirmed,

    /// Terminal failure recorded; no further action
    Recorded,

    /// Failure recorded and the transaction must be re-signed
    Resign(ResignRequest),
}

/// Routes classified submission errors to their side effects
pub struct ErrorRouter {
    store: Arc<dyn TransactionStore>,
    reconciler: LedgerReconciler<dyn LedgerClient>,
}

impl ErrorRouter {
    pub fn new(store: Arc<dyn TransactionStore>, client: Arc<dyn LedgerClient>) -> Self {
        Self {
            store,
            reconciler: LedgerReconciler::new(client),
        }
    }

    /// Route `error` for `transaction`
    ///
    /// Errors the submitter cannot resolve locally come back as `Err` unchanged.
    pub async fn route(
        &self,
        transaction: &PendingTransaction,
        error: SubmitError,
    ) -> Result<Routed> {
        debug!(
            "Routing {} for transaction {}",
            error.kind, transaction.id
        );

        match error.kind {
            ErrorKind::ApplyingTransaction => {
                debug!(
                    "Transaction {} is already being applied, waiting",
                    transaction.id
                );
                Ok(Routed::Ignored)
            }

            ErrorKind::PastSequence => self.reconcile(transaction, error).await,

            ErrorKind::ClaimFeeSubmission => {
                self.store
                    .mark_transaction_error(transaction, &error.record_message(), true)
                    .await?;
                Ok(Routed::Recorded)
            }

            ErrorKind::LocalTransaction
            | ErrorKind::MalformedTransaction
            | ErrorKind::FailTransaction
            | ErrorKind::RetryTransaction => {
                // Rejected before reaching a ledger; the sequence slot is still free
                self.store
                    .mark_transaction_error(transaction, &error.record_message(), false)
                    .await?;
                warn!(
                    "Transaction {} (sequence {}) needs to be re-signed: {}",
                    transaction.id, transaction.sequence, error
                );
                Ok(Routed::Resign(ResignRequest {
                    transaction: transaction.clone(),
                    cause: error,
                }))
            }

            ErrorKind::PreSequence
            | ErrorKind::Unfunded
            | ErrorKind::DestinationTagNeeded
            | ErrorKind::UnknownSubmit
            | ErrorKind::DestinationUnfunded
            | ErrorKind::TransactionNotFound
            | ErrorKind::ResignTransaction
            | ErrorKind::Fatal => Err(error.into()),
        }
    }

    /// Resolve a past-sequence verdict against the ledger
    async fn reconcile(
        &self,
        transaction: &PendingTransaction,
        error: SubmitError,
    ) -> Result<Routed> {
        match self.reconciler.is_in_ledger(&transaction.hash).await {
            Ok(true) => {
                self.store.mark_transaction_confirmed(transaction).await?;
                info!(
                    "Transaction {} already in ledger, marked confirmed",
                    transaction.id
                );
                Ok(Routed::Confirmed)
            }
            Ok(false) => {
                debug!(
                    "Transaction {} known to the node but not in a ledger yet",
                    transaction.id
                );
                Ok(Routed::Ignored)
            }
            Err(lookup) => match lookup.kind {
                // Another transaction holds the slot
                ErrorKind::TransactionNotFound => Err(error.into()),
                ErrorKind::ClaimFeeSubmission => {
                    self.store
                        .mark_transaction_error(transaction, &lookup.record_message(), true)
                        .await?;
                    Ok(Routed::Recorded)
                }
                _ => Err(lookup.into()),
            },
        }
    }
}
