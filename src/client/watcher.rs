//! Event Watcher
//!
//! Polls the contract's logs, broadcasts decoded events and marks the
//! cache entries they touch as stale. Concurrent edits by other
//! participants show up here instead of waiting for a manual refetch.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, RwLock};
use tokio::time::interval;
use tracing::{debug, info, warn};

use crate::chain::transport::{ContractTransport, LogFilter, TransportError};
use crate::client::cache::SnapshotCache;
use crate::contract::events::ContractEvent;
use crate::core::address::Address;

/// Contract log poller.
pub struct EventWatcher<T: ContractTransport> {
    transport: Arc<T>,
    contract: Address,
    cache: Arc<RwLock<SnapshotCache>>,
    events: broadcast::Sender<ContractEvent>,
    poll_interval: Duration,
    /// Next block to scan. `None` until the first poll pins it to the head.
    next_block: Option<u64>,
}

impl<T: ContractTransport> EventWatcher<T> {
    pub(crate) fn new(
        transport: Arc<T>,
        contract: Address,
        cache: Arc<RwLock<SnapshotCache>>,
        events: broadcast::Sender<ContractEvent>,
        poll_interval: Duration,
    ) -> Self {
        Self { transport, contract, cache, events, poll_interval, next_block: None }
    }

    /// Scan from `block` instead of only picking up new blocks.
    pub fn starting_at(mut self, block: u64) -> Self {
        self.next_block = Some(block);
        self
    }

    /// Next block the watcher will scan.
    pub fn next_block(&self) -> Option<u64> {
        self.next_block
    }

    /// Scan new blocks once. Returns the events found, in log order.
    pub async fn poll_once(&mut self) -> Result<Vec<ContractEvent>, TransportError> {
        let head = self.transport.block_number().await?;
        let Some(from_block) = self.next_block else {
            self.next_block = Some(head + 1);
            debug!("Watching {} from block {}", self.contract, head + 1);
            return Ok(Vec::new());
        };
        if head + 1 < from_block {
            // Head went backwards: node reset or reorg
            warn!("Chain head {} is behind cursor {}, dropping cached state", head, from_block);
            self.cache.write().await.invalidate_all();
            self.next_block = Some(head + 1);
            return Ok(Vec::new());
        }
        if head < from_block {
            return Ok(Vec::new());
        }

        let filter = LogFilter { address: self.contract, from_block, to_block: head };
        let logs = self.transport.logs(filter).await?;

        let mut decoded = Vec::with_capacity(logs.len());
        for log in &logs {
            match ContractEvent::decode(&log.topics, &log.data) {
                Ok(event) => decoded.push(event),
                Err(e) => warn!("Skipping log {} of {}: {}", log.log_index, log.transaction_hash, e),
            }
        }

        if !decoded.is_empty() {
            let mut cache = self.cache.write().await;
            for event in &decoded {
                match event {
                    ContractEvent::UserProfileCreated { user, .. } => {
                        cache.invalidate_profile(user);
                    }
                    other => {
                        if let Some(id) = other.match_id() {
                            cache.invalidate_match(&id);
                        }
                    }
                }
            }
        }

        for event in &decoded {
            debug!("Event {}: {:?}", event.name(), event);
            // No subscribers is fine
            let _ = self.events.send(event.clone());
        }

        self.next_block = Some(head + 1);
        Ok(decoded)
    }

    /// Poll until `shutdown` fires. Transport errors are logged and retried.
    pub async fn run(mut self, mut shutdown: broadcast::Receiver<()>) {
        let mut ticker = interval(self.poll_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        info!("Event watcher started for {}", self.contract);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match self.poll_once().await {
                        Ok(events) if !events.is_empty() => {
                            debug!("Picked up {} events", events.len());
                        }
                        Ok(_) => {}
                        Err(e) => warn!("Log poll failed: {}", e),
                    }
                }
                _ = shutdown.recv() => {
                    info!("Event watcher shutting down");
                    break;
                }
            }
        }
    }
}
