//! Ledger reconciliation
//!
//! Resolves what a `tefPAST_SEQ` verdict actually means by looking the
//! transaction up in the ledger: either this exact transaction already landed,
//! or some other transaction took the sequence slot.

use crate::error::{ErrorKind, SubmitError};
use crate::network::{LedgerClient, SUCCESS_RESULT, TX_NOT_FOUND};
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Looks transactions up in the ledger by hash
pub struct LedgerReconciler<C: ?Sized> {
    client: Arc<C>,
}

impl<C: LedgerClient + ?Sized> LedgerReconciler<C> {
    pub fn new(client: Arc<C>) -> Self {
        Self { client }
    }

    /// Whether the transaction with `hash` is included in a ledger
    ///
    /// Fails with `TransactionNotFound` when the node has never seen the hash,
    /// `ClaimFeeSubmission` when it was applied with a non-success result, and
    /// `Fatal` for any other lookup failure.
    pub async fn is_in_ledger(&self, hash: &str) -> Result<bool, SubmitError> {
        debug!("Looking up transaction {} in ledger", hash);

        let response = self.client.get_transaction(hash).await.map_err(|e| {
            error!("Ledger lookup for {} failed: {}", hash, e);
            SubmitError::fatal(format!("Ledger lookup for {} failed: {}", hash, e))
        })?;
        let result = response.result;

        match result.error.as_deref() {
            Some(TX_NOT_FOUND) => {
                debug!("Transaction {} not found in ledger", hash);
                return Err(SubmitError::new(ErrorKind::TransactionNotFound).with_message(hash));
            }
            Some(other) => {
                error!("Ledger lookup for {} returned {}", hash, other);
                return Err(SubmitError::fatal(format!(
                    "Ledger lookup for {} returned {}",
                    hash, other
                )));
            }
            None => {}
        }

        if let Some(meta) = result.meta {
            if meta.transaction_result != SUCCESS_RESULT {
                warn!(
                    "Transaction {} applied with {}",
                    hash, meta.transaction_result
                );
                return Err(SubmitError::new(ErrorKind::ClaimFeeSubmission)
                    .with_message(meta.transaction_result));
            }
        }

        debug!("Transaction {} in ledger: {}", hash, result.in_ledger);
        Ok(result.in_ledger)
    }
}
