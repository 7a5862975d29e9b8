use alloy_network::{Ethereum as AlloyEthereum, EthereumWallet, NetworkWallet, TransactionBuilder};
use alloy_primitives::{Address, B256, TxHash, U256};
use alloy_provider::fillers::{
    BlobGasFiller, CachedNonceManager, ChainIdFiller, GasFiller, JoinFill, NonceFiller,
};
use alloy_provider::{
    DynProvider, PendingTransactionBuilder, PendingTransactionError, Provider, ProviderBuilder,
    WatchTxError,
};
use alloy_rpc_client::RpcClient;
use alloy_rpc_types_eth::{BlockId, TransactionReceipt, TransactionRequest};
use alloy_signer::Signer;
use alloy_signer_local::PrivateKeySigner;
use alloy_transport::TransportError;
use alloy_transport::layers::{FallbackLayer, ThrottleLayer};
use alloy_transport_http::Http;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;
use tracing::Instrument;

use crate::config::{RequestNetworkConfig, RpcConfig};
use crate::contracts::IRequestCore;
use crate::ledger::{LedgerError, RequestLedger, RequestTransaction, SettledTransaction};

/// [`RequestLedger`] over EVM JSON-RPC.
///
/// Transactions are filled with gas, nonce and chain id before sending. When signers
/// are configured they sign locally; otherwise the transaction is handed to the node
/// with `eth_sendTransaction`, which suits development nodes with unlocked accounts.
///
/// Nonces are cached per sender by alloy's [`CachedNonceManager`]. Reverting calls are
/// caught by the explicit gas estimate in [`submit`](RequestLedger::submit), before a
/// nonce is allocated.
#[derive(Debug)]
pub struct Eip155RequestLedger {
    chain_id: u64,
    eip1559: bool,
    receipt_timeout: Duration,
    inner: DynProvider,
    signer_addresses: Arc<Vec<Address>>,
}

#[derive(Debug, thiserror::Error)]
pub enum Eip155LedgerError {
    #[error("Invalid signer key: {0}")]
    InvalidSigner(String),
    #[error("At least one HTTP RPC endpoint must be configured")]
    NoTransports,
}

impl Eip155RequestLedger {
    /// HTTP transports with per-endpoint throttling, wrapped in a fallback layer.
    pub fn rpc_client(chain_id: u64, rpc: &[RpcConfig]) -> Result<RpcClient, Eip155LedgerError> {
        let transports = rpc
            .iter()
            .filter_map(|provider_config| {
                let scheme = provider_config.http.scheme();
                if scheme != "http" && scheme != "https" {
                    return None;
                }
                let rpc_url = provider_config.http.inner().clone();
                tracing::info!(chain_id, rpc_url = %rpc_url, rate_limit = ?provider_config.rate_limit, "Using HTTP transport");
                let rate_limit = provider_config.rate_limit.unwrap_or(u32::MAX);
                let service = ServiceBuilder::new()
                    .layer(ThrottleLayer::new(rate_limit))
                    .service(Http::new(rpc_url));
                Some(service)
            })
            .collect::<Vec<_>>();
        let active = NonZeroUsize::new(transports.len()).ok_or(Eip155LedgerError::NoTransports)?;
        let fallback = ServiceBuilder::new()
            .layer(FallbackLayer::default().with_active_transport_count(active))
            .service(transports);
        Ok(RpcClient::new(fallback, false))
    }

    pub fn from_config(config: &RequestNetworkConfig) -> Result<Self, Eip155LedgerError> {
        let signers = config
            .signers
            .iter()
            .map(|key| {
                PrivateKeySigner::from_bytes(&B256::from_slice(key.as_bytes()))
                    .map(|s| s.with_chain_id(Some(config.chain_id)))
                    .map_err(|e| Eip155LedgerError::InvalidSigner(e.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        let wallet = signers.into_iter().fold(None, |wallet, signer| match wallet {
            None => Some(EthereumWallet::from(signer)),
            Some(mut wallet) => {
                wallet.register_signer(signer);
                Some(wallet)
            }
        });
        let signer_addresses = wallet
            .as_ref()
            .map(|w| NetworkWallet::<AlloyEthereum>::signer_addresses(w).collect::<Vec<_>>())
            .unwrap_or_default();

        let client = Self::rpc_client(config.chain_id, &config.rpc)?;

        let filler = JoinFill::new(
            GasFiller,
            JoinFill::new(
                BlobGasFiller::default(),
                JoinFill::new(
                    NonceFiller::new(CachedNonceManager::default()),
                    ChainIdFiller::new(Some(config.chain_id)),
                ),
            ),
        );
        let builder = ProviderBuilder::default().filler(filler);
        let inner = match wallet {
            Some(wallet) => builder.wallet(wallet).connect_client(client).erased(),
            None => builder.connect_client(client).erased(),
        };

        tracing::info!(chain_id = config.chain_id, signers = ?signer_addresses, "Using EVM ledger");

        Ok(Self {
            chain_id: config.chain_id,
            eip1559: config.eip1559,
            receipt_timeout: Duration::from_secs(config.receipt_timeout_secs),
            inner,
            signer_addresses: Arc::new(signer_addresses),
        })
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    pub fn inner(&self) -> &DynProvider {
        &self.inner
    }
}

impl RequestLedger for Eip155RequestLedger {
    async fn accounts(&self) -> Result<Vec<Address>, LedgerError> {
        if !self.signer_addresses.is_empty() {
            return Ok(self.signer_addresses.as_ref().clone());
        }
        self.inner
            .get_accounts()
            .instrument(tracing::info_span!("eth_accounts", otel.kind = "client"))
            .await
            .map_err(ledger_error)
    }

    async fn request_count(&self, core: Address) -> Result<U256, LedgerError> {
        let contract = IRequestCore::new(core, &self.inner);
        contract
            .numRequests()
            .call()
            .into_future()
            .instrument(tracing::info_span!("numRequests", core = %core, otel.kind = "client"))
            .await
            .map_err(contract_error)
    }

    async fn submit(&self, tx: RequestTransaction) -> Result<TxHash, LedgerError> {
        let mut txr = TransactionRequest::default()
            .with_to(tx.to)
            .with_from(tx.from)
            .with_input(tx.calldata);

        if !self.eip1559 {
            let gas: u128 = self
                .inner
                .get_gas_price()
                .instrument(tracing::info_span!("get_gas_price"))
                .await
                .map_err(ledger_error)?;
            txr.set_gas_price(gas);
        }

        // Estimating against the pending block surfaces contract-side reverts before sending.
        let gas_limit = self
            .inner
            .estimate_gas(txr.clone())
            .block(BlockId::pending())
            .await
            .map_err(ledger_error)?;
        txr.set_gas_limit(gas_limit);

        let pending = self
            .inner
            .send_transaction(txr)
            .instrument(tracing::info_span!("send_transaction", otel.kind = "client"))
            .await
            .map_err(ledger_error)?;
        Ok(*pending.tx_hash())
    }

    async fn settlement(&self, tx_hash: TxHash) -> Result<SettledTransaction, LedgerError> {
        PendingTransactionBuilder::new(self.inner.root().clone(), tx_hash)
            .with_required_confirmations(1)
            .with_timeout(Some(self.receipt_timeout))
            .get_receipt()
            .instrument(tracing::info_span!("get_receipt", transaction = %tx_hash, otel.kind = "client"))
            .await
            .map(settled_transaction)
            .map_err(pending_transaction_error)
    }
}

fn settled_transaction(receipt: TransactionReceipt) -> SettledTransaction {
    SettledTransaction {
        hash: receipt.transaction_hash,
        block_number: receipt.block_number,
        status: receipt.status(),
        logs: receipt
            .inner
            .logs()
            .iter()
            .map(|log| log.inner.clone())
            .collect(),
    }
}

/// Nodes report a reverting call as a JSON-RPC error whose message mentions the revert.
fn ledger_error(e: TransportError) -> LedgerError {
    if let Some(payload) = e.as_error_resp() {
        if payload.message.contains("revert") {
            return LedgerError::Rejected {
                reason: Some(payload.message.to_string()),
            };
        }
    }
    LedgerError::Transport(e.to_string())
}

fn contract_error(e: alloy_contract::Error) -> LedgerError {
    match e {
        alloy_contract::Error::TransportError(e) => ledger_error(e),
        alloy_contract::Error::PendingTransactionError(e) => pending_transaction_error(e),
        other => LedgerError::Call(other.to_string()),
    }
}

fn pending_transaction_error(e: PendingTransactionError) -> LedgerError {
    match e {
        PendingTransactionError::TxWatcher(WatchTxError::Timeout) => LedgerError::Timeout,
        PendingTransactionError::TransportError(e) => ledger_error(e),
        other => LedgerError::Transport(other.to_string()),
    }
}
