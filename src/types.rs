//! Payment request entities and the caller-facing parameter types.

use alloy_primitives::{Address, B256, I256};
use serde::{Deserialize, Serialize};

use crate::ledger::SettledTransaction;
use crate::request_id::RequestId;

/// State of a request as tracked by the core contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum RequestState {
    Created = 0,
    Accepted = 1,
    Canceled = 2,
}

impl From<RequestState> for u8 {
    fn from(value: RequestState) -> Self {
        value as u8
    }
}

/// A beneficiary of a request together with what it expects and what it has received.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payee {
    pub address: Address,
    pub expected_amount: I256,
    pub balance: I256,
}

impl Payee {
    /// A payee as registered at creation time: nothing paid yet.
    pub fn new(address: Address, expected_amount: I256) -> Self {
        Self {
            address,
            expected_amount,
            balance: I256::ZERO,
        }
    }
}

/// The token-specific contract settling a request.
///
/// `sub_payees_payment_address[i]` belongs to `sub_payees[i]`; the vector may be
/// shorter than the sub-payee list, and missing entries mean "pay the sub-payee
/// address itself".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrencyContract {
    pub address: Address,
    pub token_address: Address,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payee_payment_address: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payer_refund_address: Option<Address>,
    pub sub_payees_payment_address: Vec<Option<Address>>,
}

/// Extension data attached to a request and the content hash the ledger recorded for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestData {
    pub data: serde_json::Value,
    pub hash: String,
}

/// A payment request as created on the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequest {
    pub request_id: RequestId,
    pub creator: Address,
    pub payer: Address,
    pub payee: Payee,
    pub sub_payees: Vec<Payee>,
    pub currency_contract: CurrencyContract,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<RequestData>,
    pub state: RequestState,
}

/// Result of a settled creation: the ledger's receipt and the request it created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedRequest {
    pub transaction: SettledTransaction,
    pub request: PaymentRequest,
}

/// Raw arguments of a creation call.
///
/// Addresses are kept as the caller wrote them so that malformed input can be
/// reported against the field it came from. The first payee is the primary payee;
/// the rest are sub-payees, in order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CreateRequestParams {
    pub token_address: String,
    pub payee_addresses: Vec<String>,
    pub expected_amounts: Vec<I256>,
    pub payer_address: String,
    /// Per-payee payment addresses, aligned with `payee_addresses`. `None` entries
    /// (and the zero address) mean "no separate payment address".
    pub payee_payment_addresses: Option<Vec<Option<String>>>,
    pub payer_refund_address: Option<String>,
    pub extension_data: Option<serde_json::Value>,
    pub extension_params: Option<Vec<B256>>,
}

impl CreateRequestParams {
    pub fn new(
        token_address: impl Into<String>,
        payee_addresses: Vec<String>,
        expected_amounts: Vec<I256>,
        payer_address: impl Into<String>,
    ) -> Self {
        Self {
            token_address: token_address.into(),
            payee_addresses,
            expected_amounts,
            payer_address: payer_address.into(),
            ..Default::default()
        }
    }

    pub fn with_payee_payment_addresses(mut self, addresses: Vec<Option<String>>) -> Self {
        self.payee_payment_addresses = Some(addresses);
        self
    }

    pub fn with_payer_refund_address(mut self, address: impl Into<String>) -> Self {
        self.payer_refund_address = Some(address.into());
        self
    }

    pub fn with_extension_data(mut self, data: serde_json::Value) -> Self {
        self.extension_data = Some(data);
        self
    }

    pub fn with_extension_params(mut self, params: Vec<B256>) -> Self {
        self.extension_params = Some(params);
        self
    }
}

/// Per-call options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CreateRequestOptions {
    /// Account to send the creation transaction from, instead of the active signer.
    pub sender: Option<Address>,
    /// Earlier creations of this caller that the ledger has not included yet. Added to the
    /// core counter when predicting the request identifier.
    pub pending: u64,
}

impl CreateRequestOptions {
    pub fn from_sender(sender: Address) -> Self {
        Self {
            sender: Some(sender),
            ..Default::default()
        }
    }

    pub fn with_pending(self, pending: u64) -> Self {
        Self { pending, ..self }
    }
}
