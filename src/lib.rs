//! # Ledger Submitter
//!
//! Submits signed, not-yet-confirmed transactions to a ledger node and
//! reconciles their final outcome.
//!
//! This crate provides:
//! - Classification of node verdicts into a closed error taxonomy
//! - Ledger lookups that resolve ambiguous past-sequence verdicts
//! - Routing of each verdict to a persisted state change or a caller signal
//! - Sequential batch submission of pending transactions
//! - An in-memory transaction store enforcing the record lifecycle

#![warn(missing_docs, rust_2018_idioms)]
#![forbid(unsafe_code)]
#![allow(missing_docs)] // Internal implementation details

mod error;
mod network;
mod classifier;
mod reconciler;
mod router;
mod store;
mod submitter;

pub use error::{Error, ErrorKind, Result, SubmitError};
pub use network::{
    LedgerClient, RpcResponse, SubmitResult, TransactionMeta, TransactionResult, SUCCESS_RESULT,
    TX_NOT_FOUND,
};
pub use classifier::{classify, kind_for_code, SubmissionOutcome};
pub use reconciler::LedgerReconciler;
pub use router::{ErrorRouter, ResignRequest, Routed};
pub use store::{
    MemoryTransactionStore, PendingTransaction, StoreStatistics, TransactionRecord,
    TransactionStatus, TransactionStore,
};
pub use submitter::{BatchOutcome, BatchReport, SubmitterConfig, TransactionSubmitter};
