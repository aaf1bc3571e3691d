//! Error types for the ledger submitter
//!
//! Network verdicts are folded into a single [`SubmitError`] carrying an
//! [`ErrorKind`] tag, so every place that routes an outcome matches on the
//! closed set of kinds.

use thiserror::Error;

/// Closed taxonomy of submission and reconciliation failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The node already holds this exact transaction and is applying it
    ApplyingTransaction,

    /// Sequence number already used; resolved by a ledger lookup
    PastSequence,

    /// Sequence number ahead of the account's current sequence
    PreSequence,

    /// Sender cannot fund the payment
    Unfunded,

    /// Destination account requires a destination tag
    DestinationTagNeeded,

    /// Result code outside every known band
    UnknownSubmit,

    /// Transaction is structurally invalid (`tem` band)
    MalformedTransaction,

    /// Destination account does not exist and the payment cannot create it
    DestinationUnfunded,

    /// Unrecoverable condition; processing must halt
    Fatal,

    /// Fee and sequence were consumed but the transaction failed (`tec` band)
    ClaimFeeSubmission,

    /// Ledger lookup did not find the transaction
    TransactionNotFound,

    /// Rejected by local node policy (`tel` band)
    LocalTransaction,

    /// Transient account condition (`ter` band)
    RetryTransaction,

    /// Transaction failed without claiming a fee (`tef` band)
    FailTransaction,

    /// Transaction must be rebuilt with a fresh sequence number
    ResignTransaction,
}

impl ErrorKind {
    /// Conventional name of the kind, as operators see it in logs and records
    pub fn name(&self) -> &'static str {
        match self {
            ErrorKind::ApplyingTransaction => "ApplyingTransaction",
            ErrorKind::PastSequence => "PastSequenceError",
            ErrorKind::PreSequence => "PreSequenceError",
            ErrorKind::Unfunded => "UnfundedError",
            ErrorKind::DestinationTagNeeded => "DestinationTagNeeded",
            ErrorKind::UnknownSubmit => "UnknownSubmitError",
            ErrorKind::MalformedTransaction => "MalformedTransactionError",
            ErrorKind::DestinationUnfunded => "DestinationUnfundedError",
            ErrorKind::Fatal => "FatalError",
            ErrorKind::ClaimFeeSubmission => "ClaimFeeSubmissionError",
            ErrorKind::TransactionNotFound => "TransactionNotFoundError",
            ErrorKind::LocalTransaction => "LocalTransactionError",
            ErrorKind::RetryTransaction => "RetryTransactionError",
            ErrorKind::FailTransaction => "FailTransactionError",
            ErrorKind::ResignTransaction => "ResignTransactionError",
        }
    }

    /// Whether the submitted blob can never succeed as-is and must be re-signed
    pub fn requires_resign(&self) -> bool {
        matches!(
            self,
            ErrorKind::LocalTransaction
                | ErrorKind::MalformedTransaction
                | ErrorKind::FailTransaction
                | ErrorKind::RetryTransaction
        )
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A classified failure reported by the network or the ledger lookup
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind}: {}", .message.as_deref().unwrap_or("no message"))]
pub struct SubmitError {
    /// Category of the failure
    pub kind: ErrorKind,

    /// Human readable message, usually the engine result message
    pub message: Option<String>,

    /// Underlying numeric result code, when the network supplied one
    pub code: Option<i32>,
}

impl SubmitError {
    /// Create an error of the given kind with no payload
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            message: None,
            code: None,
        }
    }

    /// Attach a message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Attach a numeric result code
    pub fn with_code(mut self, code: i32) -> Self {
        self.code = Some(code);
        self
    }

    /// Shorthand for a fatal error with a message
    pub fn fatal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Fatal).with_message(message)
    }

    /// Message to persist against the transaction record
    pub fn record_message(&self) -> String {
        self.message
            .clone()
            .unwrap_or_else(|| self.kind.name().to_string())
    }
}

/// Submitter error type
#[derive(Error, Debug)]
pub enum Error {
    /// A classified network outcome the caller has to act on
    #[error(transparent)]
    Submit(#[from] SubmitError),

    /// Transport failure talking to the network node
    #[error("Network error: {0}")]
    Network(String),

    /// Persistence failure
    #[error("Storage error: {0}")]
    Storage(String),

    /// Record is not known to the store
    #[error("Transaction not found: {0}")]
    TransactionNotFound(u64),

    /// Attempted a state change the lifecycle does not allow
    #[error("Invalid transition for transaction {id}: {from} -> {to}")]
    InvalidTransition {
        id: u64,
        from: &'static str,
        to: &'static str,
    },

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Classified kind carried by this error, if any
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            Error::Submit(e) => Some(e.kind),
            _ => None,
        }
    }

    /// Whether an operator must be alerted before processing continues
    pub fn is_fatal(&self) -> bool {
        self.kind() == Some(ErrorKind::Fatal)
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
