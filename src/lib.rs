//! Client-side creation of multi-payee ERC-20 payment requests.
//!
//! A payment request names a payer, a primary payee and any number of sub-payees, each
//! with an expected amount in a single ERC-20 token. Requests are created by calling the
//! token-specific currency contract, which registers them with a core contract that
//! assigns a ledger-wide identifier and emits the creation events.
//!
//! # Flow
//!
//! ```text
//! CreateRequestParams ─▶ validation ─▶ transaction ─▶ broadcast ─▶ aggregate ─▶ PaymentRequest
//!                                                         │
//!                                                         └─▶ Submission (observers)
//! ```
//!
//! # Modules
//!
//! - [`validation`] — Fail-fast checks on caller-supplied addresses and amounts.
//! - [`request_id`] — Deterministic request identifiers derived from the core counter.
//! - [`transaction`] — Builds the `createRequestAsPayeeAction` call.
//! - [`broadcast`] — Two-phase submission/settlement lifecycle with observers.
//! - [`aggregate`] — Assembles the [`PaymentRequest`](types::PaymentRequest) from events.
//! - [`client`] — The [`RequestNetwork`](client::RequestNetwork) entrypoint.
//! - [`ledger`] — The ledger collaborator trait and its alloy-backed implementation.
//! - [`config`] — JSON configuration with environment variable resolution.
//! - [`telemetry`] — Tracing subscriber setup.
//!
//! # Example
//!
//! ```ignore
//! use reqnet::client::{ActiveSigner, RequestNetwork};
//! use reqnet::config::RequestNetworkConfig;
//! use reqnet::ledger::eip155::Eip155RequestLedger;
//! use reqnet::types::{CreateRequestOptions, CreateRequestParams};
//!
//! let config = RequestNetworkConfig::load_from_path("config.json".into())?;
//! let ledger = Eip155RequestLedger::from_config(&config)?;
//! let signer = ActiveSigner::first_account(&ledger).await?;
//! let network = RequestNetwork::new(ledger, config.contracts(), signer);
//!
//! let params = CreateRequestParams::new(token, vec![payee.into()], vec![amount], payer.into());
//! let broadcast = network.create_multi_party_request(params, CreateRequestOptions::default())?;
//! let submission = broadcast.subscribe().submitted().await;
//! let created = broadcast.await?;
//! ```

pub mod aggregate;
pub mod broadcast;
pub mod client;
pub mod config;
pub mod contracts;
pub mod error;
pub mod ledger;
pub mod request_id;
pub mod telemetry;
pub mod timestamp;
pub mod transaction;
pub mod types;
pub mod validation;

pub use client::{ActiveSigner, RequestNetwork};
pub use error::CreateRequestError;
