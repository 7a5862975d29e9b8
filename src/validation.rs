//! Fail-fast validation of creation arguments.
//!
//! Checks run synchronously and in a fixed order, and the first failure wins:
//!
//! 1. address syntax: payees, payee payment addresses, payer, payer refund address
//! 2. payee / expected amount array parity
//! 3. at least one payee
//! 4. expected amounts strictly positive
//! 5. payer distinct from the creator
//! 6. token supported by a deployed currency contract
//!
//! Addresses are accepted without checksum validation, with or without the `0x` prefix.

use alloy_primitives::{Address, B256, I256};
use std::str::FromStr;

use crate::config::RequestContracts;
use crate::error::ValidationError;
use crate::types::CreateRequestParams;

/// Creation arguments that passed validation, with every address parsed.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedRequest {
    pub token: Address,
    pub currency_contract: Address,
    pub creator: Address,
    pub payees: Vec<Address>,
    pub expected_amounts: Vec<I256>,
    pub payer: Address,
    /// Aligned with `payees`, possibly shorter. The zero address is folded into `None`.
    pub payee_payment_addresses: Vec<Option<Address>>,
    pub payer_refund_address: Option<Address>,
    pub extension_data: Option<serde_json::Value>,
    pub extension_params: Vec<B256>,
}

fn parse_address(field: impl Into<String>, value: &str) -> Result<Address, ValidationError> {
    Address::from_str(value).map_err(|_| ValidationError::InvalidAddress {
        field: field.into(),
        value: value.to_string(),
    })
}

/// Optional addresses treat the zero address as "not given", as the contracts do.
fn parse_optional_address(
    field: impl Into<String>,
    value: Option<&str>,
) -> Result<Option<Address>, ValidationError> {
    match value {
        None => Ok(None),
        Some(value) => {
            let address = parse_address(field, value)?;
            Ok((!address.is_zero()).then_some(address))
        }
    }
}

/// Validates `params` for a creation sent by `creator`.
pub fn validate(
    params: CreateRequestParams,
    creator: Address,
    contracts: &RequestContracts,
) -> Result<ValidatedRequest, ValidationError> {
    let payees = params
        .payee_addresses
        .iter()
        .enumerate()
        .map(|(i, payee)| parse_address(format!("payee_addresses[{i}]"), payee))
        .collect::<Result<Vec<_>, _>>()?;
    let payee_payment_addresses = params
        .payee_payment_addresses
        .unwrap_or_default()
        .iter()
        .enumerate()
        .map(|(i, address)| {
            parse_optional_address(format!("payee_payment_addresses[{i}]"), address.as_deref())
        })
        .collect::<Result<Vec<_>, _>>()?;
    let payer = parse_address("payer_address", &params.payer_address)?;
    let payer_refund_address =
        parse_optional_address("payer_refund_address", params.payer_refund_address.as_deref())?;

    if payees.len() != params.expected_amounts.len() {
        return Err(ValidationError::ArraySizeMismatch {
            payees: payees.len(),
            amounts: params.expected_amounts.len(),
        });
    }
    if payees.is_empty() {
        return Err(ValidationError::NoPayees);
    }

    if let Some(index) = params
        .expected_amounts
        .iter()
        .position(|amount| !amount.is_positive())
    {
        return Err(ValidationError::NonPositiveAmount { index });
    }

    if payer == creator {
        return Err(ValidationError::PayerEqualsCreator(payer));
    }

    let (token, currency_contract) = Address::from_str(&params.token_address)
        .ok()
        .and_then(|token| Some((token, contracts.currency_contract(&token)?)))
        .ok_or_else(|| ValidationError::UnsupportedToken(params.token_address.clone()))?;

    Ok(ValidatedRequest {
        token,
        currency_contract,
        creator,
        payees,
        expected_amounts: params.expected_amounts,
        payer,
        payee_payment_addresses,
        payer_refund_address,
        extension_data: params.extension_data,
        extension_params: params.extension_params.unwrap_or_default(),
    })
}
