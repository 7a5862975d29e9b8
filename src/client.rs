//! The [`RequestNetwork`] entrypoint.

use alloy_primitives::Address;
use std::sync::Arc;

use crate::broadcast::RequestBroadcast;
use crate::config::{RequestContracts, RequestNetworkConfig};
use crate::error::CreateRequestError;
use crate::ledger::{LedgerError, RequestLedger};
use crate::transaction::build_transaction;
use crate::types::{CreateRequestOptions, CreateRequestParams};
use crate::validation::validate;

/// Account that creates requests unless a call names another sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActiveSigner {
    pub address: Address,
}

#[derive(Debug, thiserror::Error)]
pub enum SignerError {
    #[error("ledger lists no accounts")]
    NoAccounts,
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

impl ActiveSigner {
    pub fn new(address: Address) -> Self {
        Self { address }
    }

    /// The first account the ledger lists.
    pub async fn first_account<L: RequestLedger>(ledger: &L) -> Result<Self, SignerError> {
        let accounts = ledger.accounts().await?;
        let address = accounts.first().copied().ok_or(SignerError::NoAccounts)?;
        tracing::debug!(%address, "active signer resolved");
        Ok(Self { address })
    }
}

/// Creates payment requests through a ledger.
///
/// Cloning is cheap; clones share the ledger.
#[derive(Debug)]
pub struct RequestNetwork<L> {
    ledger: Arc<L>,
    contracts: RequestContracts,
    signer: ActiveSigner,
}

impl<L> Clone for RequestNetwork<L> {
    fn clone(&self) -> Self {
        Self {
            ledger: self.ledger.clone(),
            contracts: self.contracts.clone(),
            signer: self.signer,
        }
    }
}

impl<L: RequestLedger + 'static> RequestNetwork<L> {
    pub fn new(ledger: L, contracts: RequestContracts, signer: ActiveSigner) -> Self {
        Self {
            ledger: Arc::new(ledger),
            contracts,
            signer,
        }
    }

    pub fn from_config(ledger: L, config: &RequestNetworkConfig, signer: ActiveSigner) -> Self {
        Self::new(ledger, config.contracts(), signer)
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    pub fn contracts(&self) -> &RequestContracts {
        &self.contracts
    }

    pub fn signer(&self) -> ActiveSigner {
        self.signer
    }

    /// Creates a request with one primary payee and zero or more sub-payees.
    ///
    /// Validation and encoding run before anything reaches the ledger, and their errors are
    /// returned here. Otherwise the broadcast starts in the background; must be called from
    /// within a tokio runtime.
    #[tracing::instrument(skip_all, err, fields(payees = params.payee_addresses.len()))]
    pub fn create_multi_party_request(
        &self,
        params: CreateRequestParams,
        options: CreateRequestOptions,
    ) -> Result<RequestBroadcast, CreateRequestError> {
        let creator = options.sender.unwrap_or(self.signer.address);
        let validated = validate(params, creator, &self.contracts)?;
        let call = build_transaction(validated)?;
        Ok(RequestBroadcast::spawn(
            self.ledger.clone(),
            self.contracts.core(),
            call,
            options.pending,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{I256, TxHash, U256, address};
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::error::ValidationError;
    use crate::ledger::{RequestTransaction, SettledTransaction};

    const CORE: Address = address!("0x8f0483125fcb9aaaefa9209d8e9d7b9c8b9fb90f");
    const TOKEN: Address = address!("0x345ca3e014aaf5dca488057592ee47305d9b3e10");
    const ERC20: Address = address!("0x2c2b9c9a4a25e24b174f26114e8926a9f2128fe4");
    const ACCOUNT0: Address = address!("0x90f8bf6a479f320ead074411a4b0e7944ea8c9c1");
    const ACCOUNT1: Address = address!("0xffcf8fdee72ac11b5c542428b35eef5769c409f0");

    #[derive(Default)]
    struct CountingLedger {
        accounts: Vec<Address>,
        calls: AtomicUsize,
    }

    impl RequestLedger for CountingLedger {
        async fn accounts(&self) -> Result<Vec<Address>, LedgerError> {
            Ok(self.accounts.clone())
        }

        async fn request_count(&self, _core: Address) -> Result<U256, LedgerError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(LedgerError::Transport("offline".into()))
        }

        async fn submit(&self, _tx: RequestTransaction) -> Result<TxHash, LedgerError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(LedgerError::Transport("offline".into()))
        }

        async fn settlement(&self, _tx_hash: TxHash) -> Result<SettledTransaction, LedgerError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(LedgerError::Transport("offline".into()))
        }
    }

    fn network() -> RequestNetwork<CountingLedger> {
        RequestNetwork::new(
            CountingLedger::default(),
            RequestContracts::new(CORE).with_currency_contract(TOKEN, ERC20),
            ActiveSigner::new(ACCOUNT0),
        )
    }

    fn params(payer: Address) -> CreateRequestParams {
        CreateRequestParams::new(
            TOKEN.to_string(),
            vec![ACCOUNT0.to_string()],
            vec![I256::try_from(100).unwrap()],
            payer.to_string(),
        )
    }

    #[tokio::test]
    async fn test_first_account() {
        let ledger = CountingLedger {
            accounts: vec![ACCOUNT0, ACCOUNT1],
            ..Default::default()
        };
        let signer = ActiveSigner::first_account(&ledger).await.unwrap();
        assert_eq!(signer.address, ACCOUNT0);

        let err = ActiveSigner::first_account(&CountingLedger::default())
            .await
            .unwrap_err();
        assert!(matches!(err, SignerError::NoAccounts));
    }

    #[tokio::test]
    async fn test_validation_error_is_synchronous() {
        let network = network();
        let err = network
            .create_multi_party_request(params(ACCOUNT0), CreateRequestOptions::default())
            .unwrap_err();
        assert!(matches!(
            err,
            CreateRequestError::Validation(ValidationError::PayerEqualsCreator(payer)) if payer == ACCOUNT0
        ));
        assert_eq!(network.ledger().calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_sender_option_overrides_active_signer() {
        let network = network();
        let err = network
            .create_multi_party_request(params(ACCOUNT1), CreateRequestOptions::from_sender(ACCOUNT1))
            .unwrap_err();
        assert!(matches!(
            err,
            CreateRequestError::Validation(ValidationError::PayerEqualsCreator(payer)) if payer == ACCOUNT1
        ));
    }

    #[tokio::test]
    async fn test_network_error_surfaces_from_broadcast() {
        let network = network();
        let broadcast = network
            .create_multi_party_request(params(ACCOUNT1), CreateRequestOptions::default())
            .unwrap();
        let err = broadcast.await.unwrap_err();
        assert!(matches!(err, CreateRequestError::Network { .. }));
        assert_eq!(network.ledger().calls.load(Ordering::SeqCst), 1);
    }
}
