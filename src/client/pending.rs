//! Pending Transactions
//!
//! A submitted transaction is not a confirmed one. `PendingTransaction`
//! holds the hash between the two and polls for the receipt. Receipts
//! carry no revert reason, so a reverted transaction is replayed as a
//! call to recover it.

use std::fmt;
use std::time::Duration;

use serde::Serialize;
use tokio::time::{sleep, timeout};
use tracing::{debug, warn};

use crate::chain::transport::{CallRequest, ContractTransport, Log, Receipt, TransportError, TxHash, TxRequest};
use crate::contract::abi::ContractCall;
use crate::contract::events::ContractEvent;
use crate::client::error::ClientError;

/// Where a transaction stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TxState {
    /// Accepted by the node, not yet mined.
    Submitted,
    /// Mined successfully.
    Confirmed,
    /// Mined and reverted.
    Reverted,
}

impl fmt::Display for TxState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TxState::Submitted => "submitted",
            TxState::Confirmed => "confirmed",
            TxState::Reverted => "reverted",
        };
        f.write_str(s)
    }
}

/// A mined, successful transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Confirmation {
    /// Transaction.
    pub tx_hash: TxHash,
    /// Inclusion block.
    pub block_number: u64,
    /// Decoded contract events, in log order.
    pub events: Vec<ContractEvent>,
}

impl Confirmation {
    /// First event matching `pick`.
    pub fn find<T>(&self, pick: impl Fn(&ContractEvent) -> Option<T>) -> Option<T> {
        self.events.iter().find_map(pick)
    }
}

/// A transaction accepted by the node but not yet confirmed.
#[derive(Debug, Clone)]
#[must_use = "a submitted transaction is not confirmed until `confirm` resolves"]
pub struct PendingTransaction {
    tx_hash: TxHash,
    request: TxRequest,
    call: ContractCall,
    state: TxState,
    poll_interval: Duration,
    confirmation_timeout: Duration,
}

impl PendingTransaction {
    pub(crate) fn new(
        tx_hash: TxHash,
        request: TxRequest,
        call: ContractCall,
        poll_interval: Duration,
        confirmation_timeout: Duration,
    ) -> Self {
        Self { tx_hash, request, call, state: TxState::Submitted, poll_interval, confirmation_timeout }
    }

    /// Transaction hash.
    pub fn tx_hash(&self) -> TxHash {
        self.tx_hash
    }

    /// Submitted call.
    pub fn call(&self) -> &ContractCall {
        &self.call
    }

    /// Current state.
    pub fn state(&self) -> TxState {
        self.state
    }

    /// Wait for the receipt. A reverted receipt is an error; so is no
    /// receipt within the confirmation timeout.
    pub async fn confirm<T: ContractTransport>(&mut self, transport: &T) -> Result<Confirmation, ClientError> {
        let receipt = match timeout(self.confirmation_timeout, self.poll_receipt(transport)).await {
            Ok(result) => result?,
            Err(_) => {
                warn!("No receipt for {} after {:?}", self.tx_hash, self.confirmation_timeout);
                return Err(ClientError::ConfirmationTimeout(self.tx_hash));
            }
        };

        if !receipt.status {
            self.state = TxState::Reverted;
            let reason = self.replay_reason(transport).await;
            warn!(
                "{} ({}) reverted in block {}: {}",
                self.tx_hash,
                self.call.name(),
                receipt.block_number,
                reason.as_deref().unwrap_or("no reason given")
            );
            return Err(ClientError::Reverted { reason, tx: Some(self.tx_hash) });
        }

        let events = self.contract_events(&receipt.logs);

        self.state = TxState::Confirmed;
        debug!("{} ({}) confirmed in block {}", self.tx_hash, self.call.name(), receipt.block_number);
        Ok(Confirmation { tx_hash: self.tx_hash, block_number: receipt.block_number, events })
    }

    /// Logs emitted by the contract itself, decoded. Logs from other
    /// addresses in the same transaction are ignored.
    fn contract_events(&self, logs: &[Log]) -> Vec<ContractEvent> {
        let mut events = Vec::with_capacity(logs.len());
        for log in logs {
            if log.address != self.request.to {
                debug!("Ignoring log from {} in {}", log.address, self.tx_hash);
                continue;
            }
            match ContractEvent::decode(&log.topics, &log.data) {
                Ok(event) => events.push(event),
                Err(e) => warn!("Skipping undecodable log in {}: {}", self.tx_hash, e),
            }
        }
        events
    }

    /// Re-run the reverted transaction as a call against the latest state.
    /// `None` when the replay no longer reverts or the node gives no reason.
    async fn replay_reason<T: ContractTransport>(&self, transport: &T) -> Option<String> {
        let request = CallRequest {
            to: self.request.to,
            from: Some(self.request.from),
            data: self.request.data.clone(),
        };
        match transport.call(request).await {
            Ok(_) => None,
            Err(e) => {
                debug!("Replay of {} failed: {}", self.tx_hash, e);
                e.revert_reason()
            }
        }
    }

    async fn poll_receipt<T: ContractTransport>(&self, transport: &T) -> Result<Receipt, TransportError> {
        loop {
            match transport.transaction_receipt(self.tx_hash).await {
                Ok(Some(receipt)) => return Ok(receipt),
                Ok(None) => {}
                // A dropped poll is not a failed transaction
                Err(TransportError::Connection(e)) | Err(TransportError::Timeout(e)) => {
                    debug!("Receipt poll for {} failed: {}", self.tx_hash, e);
                }
                Err(e) => return Err(e),
            }
            sleep(self.poll_interval).await;
        }
    }
}
