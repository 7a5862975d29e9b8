//! The ledger collaborator.
//!
//! Everything the request workflow needs from the network goes through
//! [`RequestLedger`]: listing accounts, reading the core request counter, submitting a
//! transaction and waiting for its settlement. Implementations own timeouts; callers
//! surface whatever the ledger reports without retrying.
//!
//! # Submodules
//!
//! - [`eip155`] - alloy-backed implementation over JSON-RPC

pub mod eip155;

use alloy_primitives::{Address, Bytes, Log, TxHash, U256};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A fully specified outbound contract call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestTransaction {
    /// Account the transaction is sent from.
    pub from: Address,
    /// Target contract address.
    pub to: Address,
    /// Transaction calldata (encoded function call).
    pub calldata: Bytes,
}

/// A transaction the ledger has included.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettledTransaction {
    /// Transaction hash.
    pub hash: TxHash,
    /// Block the transaction was included in, when the ledger reports it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_number: Option<u64>,
    /// `false` if execution reverted.
    pub status: bool,
    /// Logs emitted by the transaction, in emission order.
    pub logs: Vec<Log>,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum LedgerError {
    #[error("Transport failure: {0}")]
    Transport(String),
    #[error("Contract call failed: {0}")]
    Call(String),
    #[error("Timed out waiting for the ledger")]
    Timeout,
    #[error("Ledger rejected the transaction: {}", .reason.as_deref().unwrap_or("no reason given"))]
    Rejected { reason: Option<String> },
}

/// Operations consumed from the ledger.
pub trait RequestLedger: Send + Sync {
    /// Accounts the ledger can send from, in the ledger's order.
    fn accounts(&self) -> impl Future<Output = Result<Vec<Address>, LedgerError>> + Send;

    /// Current `numRequests` of the core contract at `core`.
    fn request_count(
        &self,
        core: Address,
    ) -> impl Future<Output = Result<U256, LedgerError>> + Send;

    /// Submits a transaction, resolving once the ledger accepted it into its pending pool.
    fn submit(
        &self,
        tx: RequestTransaction,
    ) -> impl Future<Output = Result<TxHash, LedgerError>> + Send;

    /// Resolves once the transaction `tx_hash` is included and final.
    fn settlement(
        &self,
        tx_hash: TxHash,
    ) -> impl Future<Output = Result<SettledTransaction, LedgerError>> + Send;
}

impl<T: RequestLedger> RequestLedger for Arc<T> {
    fn accounts(&self) -> impl Future<Output = Result<Vec<Address>, LedgerError>> + Send {
        (**self).accounts()
    }

    fn request_count(
        &self,
        core: Address,
    ) -> impl Future<Output = Result<U256, LedgerError>> + Send {
        (**self).request_count(core)
    }

    fn submit(
        &self,
        tx: RequestTransaction,
    ) -> impl Future<Output = Result<TxHash, LedgerError>> + Send {
        (**self).submit(tx)
    }

    fn settlement(
        &self,
        tx_hash: TxHash,
    ) -> impl Future<Output = Result<SettledTransaction, LedgerError>> + Send {
        (**self).settlement(tx_hash)
    }
}
