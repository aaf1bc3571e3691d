//! Network collaborator contract
//!
//! The submitter only needs two calls from a ledger node: submit a signed blob
//! and look a transaction up by hash. Response shapes follow the node's JSON-RPC
//! field names so any client can hand back the decoded `result` object.

use crate::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Canonical success result token
pub const SUCCESS_RESULT: &str = "tesSUCCESS";

/// Lookup error token for a transaction the node has never seen
pub const TX_NOT_FOUND: &str = "txNotFound";

/// JSON-RPC response envelope
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcResponse<T> {
    /// Method result
    pub result: T,
}

impl<T> RpcResponse<T> {
    /// Wrap a result
    pub fn new(result: T) -> Self {
        Self { result }
    }
}

/// Result of a `submit` call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitResult {
    /// Engine result token, e.g. `tesSUCCESS` or `tefPAST_SEQ`
    pub engine_result: String,

    /// Signed numeric form of the engine result
    #[serde(default)]
    pub engine_result_code: Option<i32>,

    /// Human readable explanation of the engine result
    #[serde(default)]
    pub engine_result_message: Option<String>,
}

impl SubmitResult {
    pub fn new(engine_result: impl Into<String>, engine_result_code: i32) -> Self {
        Self {
            engine_result: engine_result.into(),
            engine_result_code: Some(engine_result_code),
            engine_result_message: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.engine_result_message = Some(message.into());
        self
    }
}

/// Transaction metadata attached once the transaction is applied to a ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionMeta {
    #[serde(rename = "TransactionResult")]
    pub transaction_result: String,
}

/// Result of a `tx` lookup
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionResult {
    /// Error token when the lookup failed
    #[serde(default)]
    pub error: Option<String>,

    /// Applied result, present once the transaction is in a ledger
    #[serde(default)]
    pub meta: Option<TransactionMeta>,

    /// Whether the transaction has been included in a ledger
    #[serde(rename = "inLedger", default)]
    pub in_ledger: bool,
}

impl TransactionResult {
    /// A lookup that found the transaction applied with `result`
    pub fn applied(result: impl Into<String>, in_ledger: bool) -> Self {
        Self {
            error: None,
            meta: Some(TransactionMeta {
                transaction_result: result.into(),
            }),
            in_ledger,
        }
    }

    /// A lookup that failed with the given error token
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Default::default()
        }
    }
}

/// Client for a ledger node
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Submit a signed transaction blob (hex encoded)
    async fn submit_transaction_blob(&self, blob: &str) -> Result<RpcResponse<SubmitResult>>;

    /// Look a transaction up by hash
    async fn get_transaction(&self, hash: &str) -> Result<RpcResponse<TransactionResult>>;
}
