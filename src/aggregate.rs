//! Assembles the created [`PaymentRequest`] from a settled transaction.
//!
//! The identifier, payee, payer, creator and data hash come from the core's `Created`
//! event; the expected amounts and payment addresses come from the validated inputs,
//! since the creation events do not carry them. Event fields that contradict the
//! inputs are reported rather than silently trusted.

use alloy_primitives::{Address, Log};
use alloy_sol_types::SolEvent;

use crate::contracts::IRequestCore;
use crate::error::AggregationError;
use crate::ledger::SettledTransaction;
use crate::request_id::RequestId;
use crate::transaction::RequestCreationCall;
use crate::types::{CurrencyContract, Payee, PaymentRequest, RequestData, RequestState};

fn decode_from<E: SolEvent>(log: &Log, core: Address) -> Option<E> {
    if log.address != core || log.topics().first() != Some(&E::SIGNATURE_HASH) {
        return None;
    }
    E::decode_log_data(&log.data).ok()
}

fn expect_eq<T: PartialEq + ToString>(
    request_id: RequestId,
    field: &'static str,
    expected: T,
    actual: T,
) -> Result<(), AggregationError> {
    if expected == actual {
        Ok(())
    } else {
        Err(AggregationError::CreatedEventMismatch {
            request_id,
            field,
            expected: expected.to_string(),
            actual: actual.to_string(),
        })
    }
}

/// Builds the request created by `settled`, which executed `call` against the core at `core`.
pub fn aggregate(
    call: &RequestCreationCall,
    core: Address,
    settled: &SettledTransaction,
) -> Result<PaymentRequest, AggregationError> {
    let created = settled
        .logs
        .iter()
        .find_map(|log| decode_from::<IRequestCore::Created>(log, core))
        .ok_or(AggregationError::MissingCreatedEvent(settled.hash))?;
    let request_id = RequestId::from(created.requestId);
    let inputs = &call.request;
    let Some((primary, sub_payee_addresses)) = inputs.payees.split_first() else {
        return Err(AggregationError::CreatedEventMismatch {
            request_id,
            field: "payee",
            expected: "none".to_string(),
            actual: created.payee.to_string(),
        });
    };

    expect_eq(request_id, "payee", *primary, created.payee)?;
    expect_eq(request_id, "payer", inputs.payer, created.payer)?;
    expect_eq(request_id, "creator", inputs.creator, created.creator)?;

    let announced_sub_payees = settled
        .logs
        .iter()
        .filter_map(|log| decode_from::<IRequestCore::NewSubPayee>(log, core))
        .filter(|event| event.requestId == request_id.0)
        .map(|event| event.payee)
        .collect::<Vec<_>>();
    expect_eq(
        request_id,
        "sub-payee count",
        sub_payee_addresses.len(),
        announced_sub_payees.len(),
    )?;
    for (expected, actual) in sub_payee_addresses.iter().zip(announced_sub_payees) {
        expect_eq(request_id, "sub-payee", *expected, actual)?;
    }

    let data = match &call.data {
        Some(document) => {
            expect_eq(request_id, "data hash", document.hash.as_str(), created.data.as_str())?;
            Some(RequestData {
                data: document.data.clone(),
                hash: created.data.clone(),
            })
        }
        None => None,
    };

    let payee = Payee::new(*primary, inputs.expected_amounts[0]);
    let sub_payees = sub_payee_addresses
        .iter()
        .zip(&inputs.expected_amounts[1..])
        .map(|(address, amount)| Payee::new(*address, *amount))
        .collect::<Vec<_>>();

    let mut sub_payees_payment_address = inputs
        .payee_payment_addresses
        .iter()
        .skip(1)
        .copied()
        .collect::<Vec<_>>();
    sub_payees_payment_address.resize(sub_payees.len(), None);

    Ok(PaymentRequest {
        request_id,
        creator: created.creator,
        payer: created.payer,
        payee,
        sub_payees,
        currency_contract: CurrencyContract {
            address: inputs.currency_contract,
            token_address: inputs.token,
            payee_payment_address: inputs.payee_payment_addresses.first().copied().flatten(),
            payer_refund_address: inputs.payer_refund_address,
            sub_payees_payment_address,
        },
        data,
        state: RequestState::Created,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{B256, I256, TxHash, U256, address};
    use serde_json::json;

    use crate::ledger::RequestTransaction;
    use crate::transaction::extension_document;
    use crate::validation::ValidatedRequest;

    const CORE: Address = address!("0x8f0483125fcb9aaaefa9209d8e9d7b9c8b9fb90f");
    const ERC20: Address = address!("0x2c2b9c9a4a25e24b174f26114e8926a9f2128fe4");
    const TOKEN: Address = address!("0x345ca3e014aaf5dca488057592ee47305d9b3e10");
    const CREATOR: Address = address!("0x90f8bf6a479f320ead074411a4b0e7944ea8c9c1");
    const PAYER: Address = address!("0x22d491bde2303f2f43325b2108d26f1eaba1e32b");
    const PAYEE2: Address = address!("0xe11ba2b4d45eaed5996cd0823791e0c93114882d");
    const PAYEE3: Address = address!("0xd03ea8624c8c5987235048901fb614fdca89b117");
    const PAYMENT3: Address = address!("0x95ced938f7991cd0dfcb48f0a06a40fa1af46ebc");

    fn call(data: Option<serde_json::Value>) -> RequestCreationCall {
        let request = ValidatedRequest {
            token: TOKEN,
            currency_contract: ERC20,
            creator: CREATOR,
            payees: vec![CREATOR, PAYEE2, PAYEE3],
            expected_amounts: [100_000_000i64, 20_000_000, 3_000_000]
                .map(|v| I256::try_from(v).unwrap())
                .to_vec(),
            payer: PAYER,
            payee_payment_addresses: vec![None, None, Some(PAYMENT3)],
            payer_refund_address: None,
            extension_data: data.clone(),
            extension_params: vec![],
        };
        RequestCreationCall {
            transaction: RequestTransaction {
                from: CREATOR,
                to: ERC20,
                calldata: Default::default(),
            },
            request,
            data: data.map(|d| extension_document(d).unwrap()),
        }
    }

    fn log<E: SolEvent>(address: Address, event: &E) -> Log {
        Log {
            address,
            data: event.encode_log_data(),
        }
    }

    fn settled(request_id: B256, payee: Address, data: &str) -> SettledTransaction {
        SettledTransaction {
            hash: TxHash::repeat_byte(0xaa),
            block_number: Some(7),
            status: true,
            logs: vec![
                log(
                    CORE,
                    &IRequestCore::Created {
                        requestId: request_id,
                        payee,
                        payer: PAYER,
                        creator: CREATOR,
                        data: data.to_string(),
                    },
                ),
                log(
                    CORE,
                    &IRequestCore::NewSubPayee {
                        requestId: request_id,
                        payee: PAYEE2,
                    },
                ),
                log(
                    CORE,
                    &IRequestCore::NewSubPayee {
                        requestId: request_id,
                        payee: PAYEE3,
                    },
                ),
            ],
        }
    }

    #[test]
    fn test_aggregate_request() {
        let id = RequestId::derive(CORE, U256::from(5));
        let request = aggregate(&call(None), CORE, &settled(id.0, CREATOR, "")).unwrap();

        assert_eq!(request.request_id, id);
        assert_eq!(request.state, RequestState::Created);
        assert_eq!(request.creator, CREATOR);
        assert_eq!(request.payer, PAYER);
        assert_eq!(
            request.payee,
            Payee::new(CREATOR, I256::try_from(100_000_000).unwrap())
        );
        assert_eq!(
            request.sub_payees,
            vec![
                Payee::new(PAYEE2, I256::try_from(20_000_000).unwrap()),
                Payee::new(PAYEE3, I256::try_from(3_000_000).unwrap()),
            ]
        );
        assert_eq!(request.currency_contract.address, ERC20);
        assert_eq!(request.currency_contract.token_address, TOKEN);
        assert_eq!(request.currency_contract.payee_payment_address, None);
        assert_eq!(request.currency_contract.payer_refund_address, None);
        assert_eq!(
            request.currency_contract.sub_payees_payment_address,
            vec![None, Some(PAYMENT3)]
        );
        assert_eq!(request.data, None);
    }

    #[test]
    fn test_aggregate_with_data() {
        let data = json!({"reason": "purchased two large pizzas"});
        let call = call(Some(data.clone()));
        let hash = call.data.as_ref().unwrap().hash.clone();
        let id = RequestId::derive(CORE, U256::from(1));
        let request = aggregate(&call, CORE, &settled(id.0, CREATOR, &hash)).unwrap();
        let request_data = request.data.unwrap();
        assert_eq!(request_data.data, data);
        assert_eq!(request_data.hash, hash);
    }

    #[test]
    fn test_missing_created_event() {
        let mut tx = settled(B256::ZERO, CREATOR, "");
        tx.logs.retain(|log| log.topics()[0] != IRequestCore::Created::SIGNATURE_HASH);
        let err = aggregate(&call(None), CORE, &tx).unwrap_err();
        assert_eq!(err, AggregationError::MissingCreatedEvent(tx.hash));
    }

    #[test]
    fn test_events_from_other_contracts_are_ignored() {
        let tx = settled(B256::ZERO, CREATOR, "");
        let err = aggregate(&call(None), ERC20, &tx).unwrap_err();
        assert!(matches!(err, AggregationError::MissingCreatedEvent(_)));
    }

    #[test]
    fn test_payee_mismatch() {
        let id = RequestId::derive(CORE, U256::from(1));
        let err = aggregate(&call(None), CORE, &settled(id.0, PAYEE3, "")).unwrap_err();
        assert!(matches!(
            err,
            AggregationError::CreatedEventMismatch { field: "payee", .. }
        ));
    }

    #[test]
    fn test_missing_sub_payee_event() {
        let id = RequestId::derive(CORE, U256::from(2));
        let mut tx = settled(id.0, CREATOR, "");
        tx.logs.pop();
        let err = aggregate(&call(None), CORE, &tx).unwrap_err();
        assert_eq!(
            err,
            AggregationError::CreatedEventMismatch {
                request_id: id,
                field: "sub-payee count",
                expected: "2".into(),
                actual: "1".into(),
            }
        );
    }

    #[test]
    fn test_unexpected_sub_payee_event() {
        let id = RequestId::derive(CORE, U256::from(2));
        let mut tx = settled(id.0, CREATOR, "");
        tx.logs.push(log(
            CORE,
            &IRequestCore::NewSubPayee {
                requestId: id.0,
                payee: PAYMENT3,
            },
        ));
        let err = aggregate(&call(None), CORE, &tx).unwrap_err();
        assert!(matches!(
            err,
            AggregationError::CreatedEventMismatch { field: "sub-payee count", .. }
        ));
    }

    #[test]
    fn test_call_without_payees() {
        let id = RequestId::derive(CORE, U256::from(3));
        let mut call = call(None);
        call.request.payees.clear();
        call.request.expected_amounts.clear();
        let err = aggregate(&call, CORE, &settled(id.0, CREATOR, "")).unwrap_err();
        assert_eq!(
            err,
            AggregationError::CreatedEventMismatch {
                request_id: id,
                field: "payee",
                expected: "none".into(),
                actual: CREATOR.to_string(),
            }
        );
    }
}
