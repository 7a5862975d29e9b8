//! Error taxonomy of the creation workflow.
//!
//! Every failure names the precondition or phase it came from:
//!
//! - [`ValidationError`] — caller input rejected before any ledger call.
//! - [`EncodingError`] — the validated input cannot be encoded into the contract call.
//! - [`CreateRequestError::Network`] — the ledger could not be reached or timed out.
//! - [`CreateRequestError::TransactionReverted`] — the ledger rejected the call.
//! - [`AggregationError`] — the settled transaction does not describe the request.
//!
//! Nothing is retried.

use alloy_primitives::TxHash;
use std::fmt::{Display, Formatter};

use crate::ledger::LedgerError;
use crate::request_id::RequestId;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("at least one payee is required")]
    NoPayees,
    #[error("invalid address in field '{field}': {value}")]
    InvalidAddress { field: String, value: String },
    #[error("array size mismatch: {payees} payee addresses but {amounts} expected amounts")]
    ArraySizeMismatch { payees: usize, amounts: usize },
    #[error("non-positive amount at index {index}: expected amounts must be positive integers")]
    NonPositiveAmount { index: usize },
    #[error("payer equals creator: {0} cannot request payment from itself")]
    PayerEqualsCreator(alloy_primitives::Address),
    #[error("unsupported token: {0}")]
    UnsupportedToken(String),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EncodingError {
    #[error("too many payees: {count} exceeds the limit of {max}")]
    TooManyPayees { count: usize, max: usize },
    #[error("{payment_addresses} payee payment addresses for only {payees} payees")]
    PaymentAddressesOverflow {
        payment_addresses: usize,
        payees: usize,
    },
    #[error("the currency contract takes no extension parameters ({0} given)")]
    ExtensionParamsUnsupported(usize),
    #[error("extension data cannot be serialized: {0}")]
    ExtensionData(String),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AggregationError {
    #[error("transaction {0} emitted no Created event from the request core")]
    MissingCreatedEvent(TxHash),
    #[error("Created event for {request_id} has {field} {actual}, expected {expected}")]
    CreatedEventMismatch {
        request_id: RequestId,
        field: &'static str,
        expected: String,
        actual: String,
    },
}

/// Ledger interaction a network failure happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BroadcastPhase {
    RequestCount,
    Submission,
    Settlement,
}

impl Display for BroadcastPhase {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let phase = match self {
            BroadcastPhase::RequestCount => "request counter read",
            BroadcastPhase::Submission => "submission",
            BroadcastPhase::Settlement => "settlement",
        };
        f.write_str(phase)
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum CreateRequestError {
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),
    #[error("Encoding failed: {0}")]
    Encoding(#[from] EncodingError),
    #[error("Network failure during {phase}: {source}")]
    Network {
        phase: BroadcastPhase,
        #[source]
        source: LedgerError,
    },
    #[error("Transaction {} reverted: {}", display_tx(.transaction), .reason.as_deref().unwrap_or("no reason given"))]
    TransactionReverted {
        /// Absent when the ledger refused the call before it got a hash.
        transaction: Option<TxHash>,
        reason: Option<String>,
    },
    #[error("Could not assemble the created request: {0}")]
    Aggregation(#[from] AggregationError),
    #[error("Broadcast task ended unexpectedly: {0}")]
    Aborted(String),
}

fn display_tx(transaction: &Option<TxHash>) -> String {
    transaction
        .map(|tx| tx.to_string())
        .unwrap_or_else(|| "(not submitted)".to_string())
}

impl CreateRequestError {
    /// Classifies a ledger failure in `phase`; ledger-side rejections become reverts.
    pub fn from_ledger(phase: BroadcastPhase, error: LedgerError) -> Self {
        match error {
            LedgerError::Rejected { reason } => Self::TransactionReverted {
                transaction: None,
                reason,
            },
            source => Self::Network { phase, source },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejection_becomes_revert() {
        let err = CreateRequestError::from_ledger(
            BroadcastPhase::Submission,
            LedgerError::Rejected {
                reason: Some("execution reverted".into()),
            },
        );
        assert!(matches!(
            err,
            CreateRequestError::TransactionReverted { transaction: None, reason: Some(ref r) } if r == "execution reverted"
        ));
    }

    #[test]
    fn test_network_error_names_phase() {
        let err = CreateRequestError::from_ledger(BroadcastPhase::Settlement, LedgerError::Timeout);
        assert_eq!(
            err.to_string(),
            "Network failure during settlement: Timed out waiting for the ledger"
        );
    }

    #[test]
    fn test_validation_messages() {
        let err = ValidationError::InvalidAddress {
            field: "payer".into(),
            value: "0xNOTADDRESS".into(),
        };
        assert_eq!(err.to_string(), "invalid address in field 'payer': 0xNOTADDRESS");
        let err = ValidationError::ArraySizeMismatch {
            payees: 2,
            amounts: 1,
        };
        assert!(err.to_string().starts_with("array size mismatch"));
    }
}
