//! Deterministic request identifiers.
//!
//! The core contract assigns every request the identifier
//! `bytes32(uint256(core) << 96 | sequence)`: the 20 bytes of the core address followed
//! by the sequence number as a 12-byte big-endian integer. The sequence number is the
//! value of `numRequests` right after the core increments it, so the next request gets
//! `numRequests() + 1`.
//!
//! The identifier is only authoritative once the ledger has included the transaction.
//! [`next_request_id`] predicts it from the counter read before submission, which is
//! correct as long as no other request lands in between.

use alloy_primitives::{Address, B256, U256};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use crate::ledger::{LedgerError, RequestLedger};

/// Largest sequence number that fits in the low 12 bytes of an identifier.
pub const MAX_SEQUENCE: U256 = U256::from_limbs([u64::MAX, u32::MAX as u64, 0, 0]);

/// A payment request identifier as emitted in `Created.requestId`.
///
/// Displayed as lowercase `0x`-prefixed hex.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(pub B256);

impl RequestId {
    /// Identifier of the `sequence`-th request issued by the core contract at `core`.
    ///
    /// Sequence numbers wider than 96 bits are truncated to their low 96 bits, the same
    /// way the contract's `uint96` counter would wrap.
    pub fn derive(core: Address, sequence: U256) -> Self {
        let mut bytes = [0u8; 32];
        bytes[..20].copy_from_slice(core.as_slice());
        let sequence = (sequence & MAX_SEQUENCE).to_be_bytes::<32>();
        bytes[20..].copy_from_slice(&sequence[20..]);
        Self(B256::from(bytes))
    }

    /// The core contract address embedded in the identifier.
    pub fn core(&self) -> Address {
        Address::from_slice(&self.0[..20])
    }

    /// The sequence number embedded in the identifier.
    pub fn sequence(&self) -> U256 {
        U256::from_be_slice(&self.0[20..])
    }
}

impl Display for RequestId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

impl FromStr for RequestId {
    type Err = alloy_primitives::hex::FromHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        B256::from_str(s).map(Self)
    }
}

impl From<B256> for RequestId {
    fn from(value: B256) -> Self {
        Self(value)
    }
}

impl From<RequestId> for B256 {
    fn from(value: RequestId) -> Self {
        value.0
    }
}

/// Predicts the identifier the next request will receive from the core at `core`.
///
/// `pending` is the number of requests this caller has already submitted but not yet
/// seen settled; the core itself does not track them.
#[tracing::instrument(skip_all, err, fields(core = %core, pending = pending))]
pub async fn next_request_id<L: RequestLedger>(
    ledger: &L,
    core: Address,
    pending: u64,
) -> Result<RequestId, LedgerError> {
    let count = ledger.request_count(core).await?;
    let sequence = count
        .saturating_add(U256::from(pending))
        .saturating_add(U256::from(1));
    tracing::debug!(%count, %sequence, "derived next request sequence");
    Ok(RequestId::derive(core, sequence))
}
