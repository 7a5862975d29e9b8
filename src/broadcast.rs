//! Two-phase broadcast of a creation transaction.
//!
//! A coordinator task, spawned on the tokio runtime, drives the transaction through:
//!
//! 1. reading the core request counter to predict the request identifier,
//! 2. submitting the transaction, then notifying every [`SubmissionObserver`] exactly once,
//! 3. waiting for settlement and checking the execution status,
//! 4. assembling the created [`PaymentRequest`](crate::types::PaymentRequest).
//!
//! [`RequestBroadcast`] is the caller's handle on both channels. Dropping or detaching it
//! does not stop the coordinator: a submitted transaction cannot be withdrawn.

use alloy_primitives::{Address, TxHash};
use serde::{Deserialize, Serialize};
use std::future::IntoFuture;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::instrument;
use tracing_core::Level;

use crate::aggregate::aggregate;
use crate::error::{BroadcastPhase, CreateRequestError};
use crate::ledger::RequestLedger;
use crate::request_id::{RequestId, next_request_id};
use crate::timestamp::UnixTimestamp;
use crate::transaction::RequestCreationCall;
use crate::types::CreatedRequest;

/// Notification that the ledger accepted the creation transaction into its pending pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub transaction_hash: TxHash,
    pub submitted_at: UnixTimestamp,
    pub sender: Address,
    /// Identifier predicted from the counter read before submission.
    pub expected_request_id: RequestId,
}

/// Receives the single [`Submission`] of a broadcast.
#[derive(Debug, Clone)]
pub struct SubmissionObserver {
    submission: watch::Receiver<Option<Submission>>,
}

impl SubmissionObserver {
    /// Waits for the submission. `None` if the broadcast failed before submitting.
    pub async fn submitted(&mut self) -> Option<Submission> {
        let submission = self.submission.wait_for(Option::is_some).await.ok()?;
        submission.clone()
    }

    /// The submission, if it already happened.
    pub fn current(&self) -> Option<Submission> {
        self.submission.borrow().clone()
    }
}

type Settlement = Result<CreatedRequest, CreateRequestError>;

/// Handle on a running broadcast.
///
/// Awaiting it (or calling [`settled`](Self::settled)) yields the settled request.
#[derive(Debug)]
pub struct RequestBroadcast {
    submission: watch::Receiver<Option<Submission>>,
    settlement: JoinHandle<Settlement>,
}

impl RequestBroadcast {
    /// Spawns the coordinator for `call` against the request core at `core`.
    ///
    /// `pending` is the caller's count of its own earlier creations not yet included on the
    /// ledger; it is added to the core counter when predicting the request identifier.
    pub fn spawn<L: RequestLedger + 'static>(
        ledger: Arc<L>,
        core: Address,
        call: RequestCreationCall,
        pending: u64,
    ) -> Self {
        let (notify, submission) = watch::channel(None);
        let settlement = tokio::spawn(async move {
            coordinate(ledger.as_ref(), core, call, pending, notify).await
        });
        Self {
            submission,
            settlement,
        }
    }

    /// Attaches a new observer of the submission notification.
    pub fn subscribe(&self) -> SubmissionObserver {
        SubmissionObserver {
            submission: self.submission.clone(),
        }
    }

    /// Waits for settlement and returns the created request.
    pub async fn settled(self) -> Settlement {
        match self.settlement.await {
            Ok(result) => result,
            Err(join_error) => Err(CreateRequestError::Aborted(join_error.to_string())),
        }
    }

    /// Stops waiting for settlement locally; the broadcast itself keeps running.
    pub fn detach(self) {
        drop(self.settlement);
    }
}

impl IntoFuture for RequestBroadcast {
    type Output = Settlement;
    type IntoFuture = Pin<Box<dyn Future<Output = Settlement> + Send>>;

    fn into_future(self) -> Self::IntoFuture {
        Box::pin(self.settled())
    }
}

#[instrument(skip_all, err, fields(sender = %call.transaction.from, contract = %call.transaction.to))]
async fn coordinate<L: RequestLedger>(
    ledger: &L,
    core: Address,
    call: RequestCreationCall,
    pending: u64,
    notify: watch::Sender<Option<Submission>>,
) -> Settlement {
    let expected_request_id = next_request_id(ledger, core, pending)
        .await
        .map_err(|e| CreateRequestError::from_ledger(BroadcastPhase::RequestCount, e))?;

    let transaction_hash = ledger
        .submit(call.transaction.clone())
        .await
        .map_err(|e| CreateRequestError::from_ledger(BroadcastPhase::Submission, e))?;
    tracing::info!(
        tx = %transaction_hash,
        request_id = %expected_request_id,
        "createRequestAsPayeeAction submitted"
    );
    notify.send_replace(Some(Submission {
        transaction_hash,
        submitted_at: UnixTimestamp::now(),
        sender: call.transaction.from,
        expected_request_id,
    }));

    let settled = ledger
        .settlement(transaction_hash)
        .await
        .map_err(|e| match CreateRequestError::from_ledger(BroadcastPhase::Settlement, e) {
            CreateRequestError::TransactionReverted { reason, .. } => {
                CreateRequestError::TransactionReverted {
                    transaction: Some(transaction_hash),
                    reason,
                }
            }
            other => other,
        })?;
    if !settled.status {
        tracing::event!(
            Level::WARN,
            status = "failed",
            tx = %settled.hash,
            "createRequestAsPayeeAction failed"
        );
        return Err(CreateRequestError::TransactionReverted {
            transaction: Some(settled.hash),
            reason: None,
        });
    }
    tracing::event!(Level::INFO,
        status = "ok",
        tx = %settled.hash,
        block = ?settled.block_number,
        "createRequestAsPayeeAction succeeded"
    );

    let request = aggregate(&call, core, &settled)?;
    if request.request_id != expected_request_id {
        tracing::warn!(
            expected = %expected_request_id,
            actual = %request.request_id,
            "request identifier differs from prediction, another request landed first"
        );
    }
    Ok(CreatedRequest {
        transaction: settled,
        request,
    })
}
