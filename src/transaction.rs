//! Builds the `createRequestAsPayeeAction` call from validated arguments.
//!
//! Pure data shaping: no ledger access. Absent optional addresses are encoded as the
//! zero address, which the currency contract reads as "not set". Extension data is
//! serialized to JSON and only its keccak-256 content hash goes on-chain, in the
//! `_data` string.

use alloy_primitives::{Address, Bytes, keccak256};
use alloy_sol_types::SolCall;

use crate::contracts::IRequestERC20;
use crate::error::EncodingError;
use crate::ledger::RequestTransaction;
use crate::types::RequestData;
use crate::validation::ValidatedRequest;

/// The core stores sub-payees under a `uint8` index.
pub const MAX_PAYEES: usize = 256;

/// A creation transaction ready for submission, with the inputs it was built from.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestCreationCall {
    pub transaction: RequestTransaction,
    pub request: ValidatedRequest,
    /// Extension data and the hash sent as `_data`.
    pub data: Option<RequestData>,
}

/// Serializes extension data and computes the content hash recorded on-chain.
pub fn extension_document(data: serde_json::Value) -> Result<RequestData, EncodingError> {
    let bytes = serde_json::to_vec(&data).map_err(|e| EncodingError::ExtensionData(e.to_string()))?;
    let hash = format!("{:#x}", keccak256(&bytes));
    Ok(RequestData { data, hash })
}

/// Builds the creation transaction, sent from the validated creator.
pub fn build_transaction(request: ValidatedRequest) -> Result<RequestCreationCall, EncodingError> {
    if request.payees.len() > MAX_PAYEES {
        return Err(EncodingError::TooManyPayees {
            count: request.payees.len(),
            max: MAX_PAYEES,
        });
    }
    if request.payee_payment_addresses.len() > request.payees.len() {
        return Err(EncodingError::PaymentAddressesOverflow {
            payment_addresses: request.payee_payment_addresses.len(),
            payees: request.payees.len(),
        });
    }
    if !request.extension_params.is_empty() {
        return Err(EncodingError::ExtensionParamsUnsupported(
            request.extension_params.len(),
        ));
    }

    let data = request
        .extension_data
        .clone()
        .map(extension_document)
        .transpose()?;

    let call = IRequestERC20::createRequestAsPayeeActionCall {
        _payeesIdAddress: request.payees.clone(),
        _payeesPaymentAddress: request
            .payee_payment_addresses
            .iter()
            .map(|address| address.unwrap_or(Address::ZERO))
            .collect(),
        _expectedAmounts: request.expected_amounts.clone(),
        _payer: request.payer,
        _payerRefundAddress: request.payer_refund_address.unwrap_or(Address::ZERO),
        _data: data.as_ref().map(|d| d.hash.clone()).unwrap_or_default(),
    };

    let transaction = RequestTransaction {
        from: request.creator,
        to: request.currency_contract,
        calldata: Bytes::from(call.abi_encode()),
    };
    Ok(RequestCreationCall {
        transaction,
        request,
        data,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{B256, I256, address};
    use serde_json::json;

    const ERC20: Address = address!("0x2c2b9c9a4a25e24b174f26114e8926a9f2128fe4");
    const CREATOR: Address = address!("0x90f8bf6a479f320ead074411a4b0e7944ea8c9c1");
    const PAYER: Address = address!("0x22d491bde2303f2f43325b2108d26f1eaba1e32b");
    const PAYEE2: Address = address!("0xe11ba2b4d45eaed5996cd0823791e0c93114882d");

    fn validated() -> ValidatedRequest {
        ValidatedRequest {
            token: address!("0x345ca3e014aaf5dca488057592ee47305d9b3e10"),
            currency_contract: ERC20,
            creator: CREATOR,
            payees: vec![CREATOR, PAYEE2],
            expected_amounts: vec![I256::try_from(100).unwrap(), I256::try_from(20).unwrap()],
            payer: PAYER,
            payee_payment_addresses: vec![None, Some(PAYEE2)],
            payer_refund_address: None,
            extension_data: None,
            extension_params: vec![],
        }
    }

    #[test]
    fn test_build_encodes_call() {
        let built = build_transaction(validated()).unwrap();
        assert_eq!(built.transaction.from, CREATOR);
        assert_eq!(built.transaction.to, ERC20);
        assert!(built.data.is_none());

        let decoded =
            IRequestERC20::createRequestAsPayeeActionCall::abi_decode(&built.transaction.calldata)
                .unwrap();
        assert_eq!(decoded._payeesIdAddress, vec![CREATOR, PAYEE2]);
        assert_eq!(decoded._payeesPaymentAddress, vec![Address::ZERO, PAYEE2]);
        assert_eq!(decoded._payer, PAYER);
        assert_eq!(decoded._payerRefundAddress, Address::ZERO);
        assert_eq!(decoded._data, "");
    }

    #[test]
    fn test_extension_data_hash_goes_onchain() {
        let mut request = validated();
        request.extension_data = Some(json!({"reason": "purchased two large pizzas"}));
        let built = build_transaction(request).unwrap();
        let data = built.data.unwrap();
        assert_eq!(data.data, json!({"reason": "purchased two large pizzas"}));
        assert_eq!(data.hash.len(), 66);

        let decoded =
            IRequestERC20::createRequestAsPayeeActionCall::abi_decode(&built.transaction.calldata)
                .unwrap();
        assert_eq!(decoded._data, data.hash);
    }

    #[test]
    fn test_extension_document_is_deterministic() {
        let a = extension_document(json!({"reason": "pizza"})).unwrap();
        let b = extension_document(json!({"reason": "pizza"})).unwrap();
        let c = extension_document(json!({"reason": "pasta"})).unwrap();
        assert_eq!(a.hash, b.hash);
        assert_ne!(a.hash, c.hash);
    }

    #[test]
    fn test_too_many_payees() {
        let mut request = validated();
        request.payees = vec![PAYEE2; MAX_PAYEES + 1];
        request.expected_amounts = vec![I256::ONE; MAX_PAYEES + 1];
        let err = build_transaction(request).unwrap_err();
        assert_eq!(
            err,
            EncodingError::TooManyPayees {
                count: MAX_PAYEES + 1,
                max: MAX_PAYEES
            }
        );
    }

    #[test]
    fn test_payment_addresses_overflow() {
        let mut request = validated();
        request.payee_payment_addresses = vec![None, None, Some(PAYEE2)];
        let err = build_transaction(request).unwrap_err();
        assert!(matches!(err, EncodingError::PaymentAddressesOverflow { .. }));
    }

    #[test]
    fn test_extension_params_rejected() {
        let mut request = validated();
        request.extension_params = vec![B256::ZERO];
        let err = build_transaction(request).unwrap_err();
        assert_eq!(err, EncodingError::ExtensionParamsUnsupported(1));
    }
}
