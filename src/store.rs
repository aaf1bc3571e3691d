//! Transaction persistence
//!
//! [`TransactionStore`] is the narrow contract the submitter writes through.
//! [`MemoryTransactionStore`] implements it over a concurrent map and enforces
//! the record lifecycle: Pending -> Submitted -> {Confirmed, Errored}.

use crate::{Error, Result};
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// A signed transaction awaiting a final outcome
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingTransaction {
    /// Store identifier
    pub id: u64,

    /// Signed transaction blob, hex encoded
    pub blob: String,

    /// Transaction hash
    pub hash: String,

    /// Account sequence the blob was signed with
    pub sequence: u32,
}

impl PendingTransaction {
    pub fn new(id: u64, blob: impl Into<String>, hash: impl Into<String>, sequence: u32) -> Self {
        Self {
            id,
            blob: blob.into(),
            hash: hash.into(),
            sequence,
        }
    }
}

/// Persisted transaction status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionStatus {
    /// Signed, not yet accepted by the network
    Pending,

    /// Accepted by the network, not yet seen in a ledger
    Submitted,

    /// Included in a ledger with a success result
    Confirmed,

    /// Failed; the message on the record says why
    Errored,
}

impl TransactionStatus {
    /// Check if this is a terminal status
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TransactionStatus::Confirmed | TransactionStatus::Errored
        )
    }

    fn name(&self) -> &'static str {
        match self {
            TransactionStatus::Pending => "Pending",
            TransactionStatus::Submitted => "Submitted",
            TransactionStatus::Confirmed => "Confirmed",
            TransactionStatus::Errored => "Errored",
        }
    }
}

impl std::fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Persistence contract consumed by the submitter
#[async_trait]
pub trait TransactionStore: Send + Sync {
    /// Signed transactions without a final outcome, in submission order
    async fn get_signed_unconfirmed_transactions(&self) -> Result<Vec<PendingTransaction>>;

    /// Record that the network accepted the transaction
    async fn mark_transaction_submitted(&self, id: u64) -> Result<()>;

    /// Record that the transaction is in a ledger
    async fn mark_transaction_confirmed(&self, transaction: &PendingTransaction) -> Result<()>;

    /// Record a terminal failure
    ///
    /// `fee_claimed` is set when the ledger applied the transaction and consumed
    /// its fee and sequence, so the slot must not be reused.
    async fn mark_transaction_error(
        &self,
        transaction: &PendingTransaction,
        message: &str,
        fee_claimed: bool,
    ) -> Result<()>;
}

/// Stored transaction with its lifecycle state
#[derive(Debug, Clone)]
pub struct TransactionRecord {
    pub transaction: PendingTransaction,

    /// Current status
    pub status: TransactionStatus,

    /// Whether the transaction used its sequence slot: accepted by the node,
    /// confirmed, or failed with its fee claimed
    pub submitted: bool,

    /// Creation timestamp (Unix milliseconds)
    pub created_at: u64,

    /// Submission timestamp (Unix milliseconds, if submitted in this store)
    pub submitted_at: Option<u64>,

    /// Finalization timestamp (Unix milliseconds, if terminal)
    pub finalized_at: Option<u64>,

    /// Error message (if errored)
    pub error: Option<String>,
}

impl TransactionRecord {
    fn new(transaction: PendingTransaction, created_at: u64) -> Self {
        Self {
            transaction,
            status: TransactionStatus::Pending,
            submitted: false,
            created_at,
            submitted_at: None,
            finalized_at: None,
            error: None,
        }
    }

    fn transition(&mut self, to: TransactionStatus) -> Result<()> {
        let allowed = match (self.status, to) {
            (TransactionStatus::Pending, TransactionStatus::Submitted) => true,
            // Resubmitting an accepted transaction leaves it where it is
            (TransactionStatus::Submitted, TransactionStatus::Submitted) => true,
            (
                TransactionStatus::Pending | TransactionStatus::Submitted,
                TransactionStatus::Confirmed | TransactionStatus::Errored,
            ) => true,
            _ => false,
        };

        if !allowed {
            return Err(Error::InvalidTransition {
                id: self.transaction.id,
                from: self.status.name(),
                to: to.name(),
            });
        }

        self.status = to;
        if matches!(to, TransactionStatus::Submitted | TransactionStatus::Confirmed) {
            self.submitted = true;
        }
        Ok(())
    }

    fn mark_submitted(&mut self, timestamp: u64) -> Result<()> {
        let first = self.status == TransactionStatus::Pending;
        self.transition(TransactionStatus::Submitted)?;
        if first {
            self.submitted_at = Some(timestamp);
        }
        Ok(())
    }

    fn mark_confirmed(&mut self, timestamp: u64) -> Result<()> {
        self.transition(TransactionStatus::Confirmed)?;
        self.finalized_at = Some(timestamp);
        Ok(())
    }

    fn mark_errored(&mut self, timestamp: u64, error: String, fee_claimed: bool) -> Result<()> {
        self.transition(TransactionStatus::Errored)?;
        self.submitted |= fee_claimed;
        self.finalized_at = Some(timestamp);
        self.error = Some(error);
        Ok(())
    }

    /// Time from creation to finalization (milliseconds)
    pub fn total_time_ms(&self) -> Option<u64> {
        self.finalized_at.map(|fin| fin.saturating_sub(self.created_at))
    }
}

/// In-memory transaction store
pub struct MemoryTransactionStore {
    records: Arc<DashMap<u64, TransactionRecord>>,

    /// Current time provider (for testing)
    current_time_fn: Box<dyn Fn() -> u64 + Send + Sync>,
}

impl MemoryTransactionStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            records: Arc::new(DashMap::new()),
            current_time_fn: Box::new(|| {
                std::time::SystemTime::now()
                    .duration_since(std::time::UNIX_EPOCH)
                    .map(|d| d.as_millis() as u64)
                    .unwrap_or(0)
            }),
        }
    }

    /// Set the current time function (for testing)
    pub fn with_time_fn<F>(mut self, f: F) -> Self
    where
        F: Fn() -> u64 + Send + Sync + 'static,
    {
        self.current_time_fn = Box::new(f);
        self
    }

    /// Add a signed transaction in the Pending state
    pub fn insert(&self, transaction: PendingTransaction) -> Result<()> {
        let id = transaction.id;
        if self.records.contains_key(&id) {
            return Err(Error::Storage(format!("Duplicate transaction id {}", id)));
        }

        let timestamp = (self.current_time_fn)();
        self.records
            .insert(id, TransactionRecord::new(transaction, timestamp));
        debug!("Stored pending transaction {}", id);
        Ok(())
    }

    /// Get transaction status
    pub fn get_status(&self, id: u64) -> Option<TransactionStatus> {
        self.records.get(&id).map(|record| record.status)
    }

    /// Get the full record
    pub fn get_record(&self, id: u64) -> Option<TransactionRecord> {
        self.records.get(&id).map(|record| record.clone())
    }

    fn update<F>(&self, id: u64, f: F) -> Result<()>
    where
        F: FnOnce(&mut TransactionRecord, u64) -> Result<()>,
    {
        let timestamp = (self.current_time_fn)();
        let mut record = self
            .records
            .get_mut(&id)
            .ok_or(Error::TransactionNotFound(id))?;
        f(record.value_mut(), timestamp)
    }

    /// Remove finalized records older than the given age (milliseconds)
    pub fn prune_finalized(&self, max_age_ms: u64) -> usize {
        let cutoff_time = (self.current_time_fn)().saturating_sub(max_age_ms);

        let to_remove: Vec<u64> = self
            .records
            .iter()
            .filter(|entry| {
                let record = entry.value();
                record.status.is_terminal()
                    && record
                        .finalized_at
                        .map(|t| t < cutoff_time)
                        .unwrap_or(false)
            })
            .map(|entry| *entry.key())
            .collect();

        let count = to_remove.len();
        for id in to_remove {
            self.records.remove(&id);
        }

        if count > 0 {
            debug!("Pruned {} finalized transactions", count);
        }

        count
    }

    /// Get statistics about stored transactions
    pub fn get_statistics(&self) -> StoreStatistics {
        let mut stats = StoreStatistics::default();

        for entry in self.records.iter() {
            let record = entry.value();

            match record.status {
                TransactionStatus::Pending => stats.pending_count += 1,
                TransactionStatus::Submitted => stats.submitted_count += 1,
                TransactionStatus::Confirmed => stats.confirmed_count += 1,
                TransactionStatus::Errored => stats.errored_count += 1,
            }

            if let Some(time) = record.total_time_ms() {
                stats.total_latency_ms += time;
                stats.latency_sample_count += 1;
            }
        }

        stats.total_count = self.records.len();
        stats
    }
}

impl Default for MemoryTransactionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TransactionStore for MemoryTransactionStore {
    async fn get_signed_unconfirmed_transactions(&self) -> Result<Vec<PendingTransaction>> {
        let mut pending: Vec<PendingTransaction> = self
            .records
            .iter()
            .filter(|entry| !entry.value().status.is_terminal())
            .map(|entry| entry.value().transaction.clone())
            .collect();

        // Account sequence first so an earlier slot is always resolved before a later one
        pending.sort_by_key(|tx| (tx.sequence, tx.id));
        Ok(pending)
    }

    async fn mark_transaction_submitted(&self, id: u64) -> Result<()> {
        self.update(id, |record, timestamp| record.mark_submitted(timestamp))?;
        debug!("Transaction {} marked as submitted", id);
        Ok(())
    }

    async fn mark_transaction_confirmed(&self, transaction: &PendingTransaction) -> Result<()> {
        self.update(transaction.id, |record, timestamp| {
            record.mark_confirmed(timestamp)
        })?;
        info!(
            "Transaction {} confirmed (hash: {})",
            transaction.id, transaction.hash
        );
        Ok(())
    }

    async fn mark_transaction_error(
        &self,
        transaction: &PendingTransaction,
        message: &str,
        fee_claimed: bool,
    ) -> Result<()> {
        self.update(transaction.id, |record, timestamp| {
            record.mark_errored(timestamp, message.to_string(), fee_claimed)
        })?;
        warn!("Transaction {} errored: {}", transaction.id, message);
        Ok(())
    }
}

/// Store statistics
#[derive(Debug, Clone, Default)]
pub struct StoreStatistics {
    /// Total number of stored transactions
    pub total_count: usize,

    pub pending_count: usize,
    pub submitted_count: usize,
    pub confirmed_count: usize,
    pub errored_count: usize,

    /// Total creation-to-finalization latency (milliseconds)
    pub total_latency_ms: u64,

    /// Number of samples for latency calculation
    pub latency_sample_count: usize,
}

impl StoreStatistics {
    /// Get average latency (milliseconds)
    pub fn average_latency_ms(&self) -> Option<f64> {
        if self.latency_sample_count > 0 {
            Some(self.total_latency_ms as f64 / self.latency_sample_count as f64)
        } else {
            None
        }
    }

    /// Share of finalized transactions that were confirmed (0.0 to 1.0)
    pub fn confirmation_rate(&self) -> f64 {
        let finalized = self.confirmed_count + self.errored_count;
        if finalized > 0 {
            self.confirmed_count as f64 / finalized as f64
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};

    fn tx(id: u64, sequence: u32) -> PendingTransaction {
        PendingTransaction::new(id, format!("blob{}", id), format!("HASH{}", id), sequence)
    }

    #[tokio::test]
    async fn test_lifecycle_transitions() {
        let store = MemoryTransactionStore::new().with_time_fn(|| 1000);
        let t = tx(1, 10);
        store.insert(t.clone()).unwrap();
        assert_eq!(store.get_status(1), Some(TransactionStatus::Pending));

        store.mark_transaction_submitted(1).await.unwrap();
        assert_eq!(store.get_status(1), Some(TransactionStatus::Submitted));

        // Resubmission is a no-op
        store.mark_transaction_submitted(1).await.unwrap();
        assert_eq!(store.get_status(1), Some(TransactionStatus::Submitted));

        store.mark_transaction_confirmed(&t).await.unwrap();
        let record = store.get_record(1).unwrap();
        assert_eq!(record.status, TransactionStatus::Confirmed);
        assert!(record.submitted);
        assert_eq!(record.submitted_at, Some(1000));
        assert_eq!(record.finalized_at, Some(1000));
    }

    #[tokio::test]
    async fn test_pending_can_finalize_directly() {
        let store = MemoryTransactionStore::new();
        let t = tx(1, 10);
        store.insert(t.clone()).unwrap();

        store.mark_transaction_error(&t, "tecNO_DST", true).await.unwrap();
        let record = store.get_record(1).unwrap();
        assert_eq!(record.status, TransactionStatus::Errored);
        assert!(record.submitted);
        assert_eq!(record.submitted_at, None);
        assert_eq!(record.error.as_deref(), Some("tecNO_DST"));
    }

    #[tokio::test]
    async fn test_rejected_transaction_keeps_slot_unused() {
        let store = MemoryTransactionStore::new();
        let t = tx(1, 10);
        store.insert(t.clone()).unwrap();

        store.mark_transaction_error(&t, "temBAD_FEE", false).await.unwrap();
        let record = store.get_record(1).unwrap();
        assert_eq!(record.status, TransactionStatus::Errored);
        assert!(!record.submitted);

        // A record the node accepted stays submitted whatever the later failure
        let t = tx(2, 11);
        store.insert(t.clone()).unwrap();
        store.mark_transaction_submitted(2).await.unwrap();
        store.mark_transaction_error(&t, "telCAN_NOT_QUEUE", false).await.unwrap();
        assert!(store.get_record(2).unwrap().submitted);
    }

    #[tokio::test]
    async fn test_terminal_states_are_final() {
        let store = MemoryTransactionStore::new();
        let t = tx(1, 10);
        store.insert(t.clone()).unwrap();
        store.mark_transaction_confirmed(&t).await.unwrap();

        let result = store.mark_transaction_error(&t, "late", false).await;
        assert!(matches!(
            result,
            Err(Error::InvalidTransition {
                id: 1,
                from: "Confirmed",
                to: "Errored"
            })
        ));
        assert!(store.mark_transaction_submitted(1).await.is_err());
        assert_eq!(store.get_status(1), Some(TransactionStatus::Confirmed));
    }

    #[tokio::test]
    async fn test_unknown_transaction() {
        let store = MemoryTransactionStore::new();
        let result = store.mark_transaction_submitted(42).await;
        assert!(matches!(result, Err(Error::TransactionNotFound(42))));
    }

    #[test]
    fn test_duplicate_insert() {
        let store = MemoryTransactionStore::new();
        store.insert(tx(1, 10)).unwrap();
        assert!(matches!(store.insert(tx(1, 11)), Err(Error::Storage(_))));
    }

    #[tokio::test]
    async fn test_unconfirmed_listing_order() {
        let store = MemoryTransactionStore::new();
        store.insert(tx(3, 12)).unwrap();
        store.insert(tx(1, 10)).unwrap();
        store.insert(tx(2, 11)).unwrap();
        store.insert(tx(4, 13)).unwrap();

        store.mark_transaction_submitted(2).await.unwrap();
        store.mark_transaction_confirmed(&tx(4, 13)).await.unwrap();

        let ids: Vec<u64> = store
            .get_signed_unconfirmed_transactions()
            .await
            .unwrap()
            .iter()
            .map(|t| t.id)
            .collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_prune_and_statistics() {
        let now = Arc::new(AtomicU64::new(1_000));
        let clock = now.clone();
        let store =
            MemoryTransactionStore::new().with_time_fn(move || clock.load(Ordering::SeqCst));

        for i in 0..4 {
            store.insert(tx(i, i as u32)).unwrap();
        }
        now.store(1_500, Ordering::SeqCst);
        store.mark_transaction_confirmed(&tx(0, 0)).await.unwrap();
        store.mark_transaction_confirmed(&tx(1, 1)).await.unwrap();
        store
            .mark_transaction_error(&tx(2, 2), "tecPATH_DRY", true)
            .await
            .unwrap();

        let stats = store.get_statistics();
        assert_eq!(stats.total_count, 4);
        assert_eq!(stats.pending_count, 1);
        assert_eq!(stats.confirmed_count, 2);
        assert_eq!(stats.errored_count, 1);
        assert_eq!(stats.average_latency_ms(), Some(500.0));
        assert!((stats.confirmation_rate() - 2.0 / 3.0).abs() < f64::EPSILON);

        now.store(10_000, Ordering::SeqCst);
        assert_eq!(store.prune_finalized(60_000), 0);
        assert_eq!(store.prune_finalized(1_000), 3);
        assert_eq!(store.get_statistics().total_count, 1);
        assert_eq!(store.get_status(3), Some(TransactionStatus::Pending));
    }
}
