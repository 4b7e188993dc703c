//! Match Client
//!
//! Typed access to every MatchUp contract operation.
//!
//! ## Write Path
//!
//! ```text
//! session.signer() ──▶ precheck (fresh read) ──▶ send_transaction ──▶ PendingTransaction
//!                                                                        │
//!                                          invalidate cache ◀── confirm()┘
//! ```
//!
//! `submit_*` methods stop at the pending transaction; the plain methods
//! also wait for confirmation and return the typed outcome. Nothing is
//! written to the cache optimistically.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, info, instrument, warn};

use crate::chain::session::WalletSession;
use crate::chain::transport::{CallRequest, ContractTransport, TxRequest};
use crate::client::cache::{Cached, SnapshotCache};
use crate::client::config::ClientConfig;
use crate::client::error::ClientError;
use crate::client::pending::{Confirmation, PendingTransaction};
use crate::client::watcher::EventWatcher;
use crate::contract::abi::{
    decode_address, decode_match, decode_string, decode_uint, decode_user_profile, ContractCall,
};
use crate::contract::events::ContractEvent;
use crate::contract::lifecycle::{
    check_cancel, check_declare, check_join, check_ready, MatchAction, MatchPhase, ReadyCheck,
    TransitionError,
};
use crate::contract::types::{Match, MatchId, UserProfile};
use crate::core::address::Address;
use crate::core::amount::TokenAmount;

// =============================================================================
// OUTCOMES
// =============================================================================

/// Confirmed `createMatch`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedMatch {
    /// Id assigned by the contract.
    pub match_id: MatchId,
    /// Creator.
    pub creator: Address,
    /// Escrowed wager.
    pub bet_amount: TokenAmount,
    /// Receipt details.
    pub confirmation: Confirmation,
}

/// Confirmed `joinMatch`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinedMatch {
    /// Match.
    pub match_id: MatchId,
    /// Caller, now the challenger.
    pub challenger: Address,
    /// Receipt details.
    pub confirmation: Confirmation,
}

/// Result of `readyUp`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadyOutcome {
    /// Match.
    pub match_id: MatchId,
    /// Caller was already ready; nothing was submitted.
    pub already_ready: bool,
    /// This ready-up started the match.
    pub started: bool,
    /// Receipt details, absent when nothing was submitted.
    pub confirmation: Option<Confirmation>,
}

/// Confirmed `declareWinner`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchResolved {
    /// Match.
    pub match_id: MatchId,
    /// Paid-out winner.
    pub winner: Address,
    /// Receipt details.
    pub confirmation: Confirmation,
}

/// Confirmed `createUserProfile`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileCreated {
    /// Profile owner.
    pub user: Address,
    /// Riot ID handle.
    pub riot_id: String,
    /// Receipt details.
    pub confirmation: Confirmation,
}

/// Contract-wide constants and counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContractInfo {
    /// Contract address.
    pub address: Address,
    /// Last assigned match id.
    pub match_count: u64,
    /// `PLATFORM_FEE`.
    pub platform_fee: u128,
    /// Fee recipient.
    pub platform_wallet: Address,
}

// =============================================================================
// CLIENT
// =============================================================================

/// Client for the MatchUp contract.
pub struct MatchClient<T: ContractTransport> {
    transport: Arc<T>,
    config: ClientConfig,
    cache: Arc<RwLock<SnapshotCache>>,
    events: broadcast::Sender<ContractEvent>,
}

impl<T: ContractTransport> Clone for MatchClient<T> {
    fn clone(&self) -> Self {
        Self {
            transport: self.transport.clone(),
            config: self.config.clone(),
            cache: self.cache.clone(),
            events: self.events.clone(),
        }
    }
}

impl<T: ContractTransport> MatchClient<T> {
    /// Create a client over a transport.
    pub fn new(transport: Arc<T>, config: ClientConfig) -> Self {
        let (events, _) = broadcast::channel(config.event_channel_capacity.max(1));
        Self { transport, config, cache: Arc::new(RwLock::new(SnapshotCache::new())), events }
    }

    /// Configuration in use.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Underlying transport.
    pub fn transport(&self) -> &Arc<T> {
        &self.transport
    }

    /// Receive contract events picked up by the watcher.
    pub fn subscribe(&self) -> broadcast::Receiver<ContractEvent> {
        self.events.subscribe()
    }

    /// Event watcher feeding this client's subscribers and cache.
    pub fn watcher(&self) -> EventWatcher<T> {
        EventWatcher::new(
            self.transport.clone(),
            self.config.contract,
            self.cache.clone(),
            self.events.clone(),
            self.config.poll_interval,
        )
    }

    /// Parse a user-entered amount with the configured token decimals.
    pub fn parse_amount(&self, input: &str) -> Result<TokenAmount, ClientError> {
        TokenAmount::parse(input, self.config.token_decimals)
            .map_err(|e| ClientError::InvalidRequest(e.to_string()))
    }

    // =========================================================================
    // READS
    // =========================================================================

    async fn view(&self, call: ContractCall) -> Result<Vec<u8>, ClientError> {
        let request = CallRequest { to: self.config.contract, from: None, data: call.encode() };
        Ok(self.transport.call(request).await?)
    }

    /// Current on-chain snapshot of a match. Refreshes the cache.
    #[instrument(skip(self))]
    pub async fn get_match(&self, match_id: MatchId) -> Result<Match, ClientError> {
        let data = self.view(ContractCall::GetMatch { match_id }).await?;
        let m = decode_match(&data)?;
        if !m.exists() {
            return Err(ClientError::MatchNotFound(match_id));
        }
        self.cache.write().await.put_match(match_id, m.clone());
        debug!("Fetched match {} ({})", match_id, MatchPhase::of(&m));
        Ok(m)
    }

    /// Current on-chain profile, `None` when the account has none.
    #[instrument(skip(self))]
    pub async fn get_user_profile(&self, user: Address) -> Result<Option<UserProfile>, ClientError> {
        let data = self.view(ContractCall::GetUserProfile { user }).await?;
        let profile = decode_user_profile(&data)?;
        self.cache.write().await.put_profile(user, profile.clone());
        Ok(profile.exists().then_some(profile))
    }

    /// Riot ID through the `userProfiles` mapping getter.
    pub async fn riot_id(&self, user: Address) -> Result<Option<String>, ClientError> {
        let data = self.view(ContractCall::UserProfiles { user }).await?;
        let riot_id = decode_string(&data)?;
        Ok((!riot_id.is_empty()).then_some(riot_id))
    }

    /// Last assigned match id (0 before the first match).
    pub async fn match_count(&self) -> Result<u64, ClientError> {
        let data = self.view(ContractCall::MatchCount).await?;
        let count = decode_uint(&data)?;
        u64::try_from(count).map_err(|_| ClientError::InvalidRequest(format!("match count {} out of range", count)))
    }

    /// `PLATFORM_FEE` constant.
    pub async fn platform_fee(&self) -> Result<u128, ClientError> {
        let data = self.view(ContractCall::PlatformFee).await?;
        Ok(decode_uint(&data)?)
    }

    /// Fee recipient.
    pub async fn platform_wallet(&self) -> Result<Address, ClientError> {
        let data = self.view(ContractCall::PlatformWallet).await?;
        Ok(decode_address(&data)?)
    }

    /// Counters and constants in one go.
    pub async fn contract_info(&self) -> Result<ContractInfo, ClientError> {
        Ok(ContractInfo {
            address: self.config.contract,
            match_count: self.match_count().await?,
            platform_fee: self.platform_fee().await?,
            platform_wallet: self.platform_wallet().await?,
        })
    }

    /// Every match from id 1 to `matchCount`.
    pub async fn list_matches(&self) -> Result<Vec<(MatchId, Match)>, ClientError> {
        let count = self.match_count().await?;
        let mut matches = Vec::with_capacity(count as usize);
        for id in 1..=count {
            match self.get_match(MatchId(id)).await {
                Ok(m) => matches.push((MatchId(id), m)),
                Err(ClientError::MatchNotFound(_)) => warn!("Match {} missing below matchCount", id),
                Err(e) => return Err(e),
            }
        }
        Ok(matches)
    }

    /// Fresh cached match, read from chain only when missing or stale.
    pub async fn match_snapshot(&self, match_id: MatchId) -> Result<Match, ClientError> {
        if let Some(m) = self.cache.read().await.fresh_match(&match_id) {
            return Ok(m.clone());
        }
        self.get_match(match_id).await
    }

    /// Fresh cached profile, read from chain only when missing or stale.
    pub async fn profile_snapshot(&self, user: Address) -> Result<Option<UserProfile>, ClientError> {
        if let Some(profile) = self.cache.read().await.fresh_profile(&user) {
            return Ok(profile.exists().then(|| profile.clone()));
        }
        self.get_user_profile(user).await
    }

    /// Cached copy of a match, possibly stale.
    pub async fn cached_match(&self, match_id: MatchId) -> Option<Cached<Match>> {
        self.cache.read().await.get_match(&match_id).cloned()
    }

    /// Cached copy of a profile, possibly stale.
    pub async fn cached_profile(&self, user: Address) -> Option<Cached<UserProfile>> {
        self.cache.read().await.get_profile(&user).cloned()
    }

    // =========================================================================
    // PRECHECK
    // =========================================================================

    /// Run a transition check against fresh chain state. If the cached
    /// copy would have passed, the failure is reported as stale state.
    async fn precheck<R>(
        &self,
        match_id: MatchId,
        action: MatchAction,
        check: impl Fn(&Match) -> Result<R, TransitionError>,
    ) -> Result<R, ClientError> {
        let cached = self.cache.read().await.get_match(&match_id).map(|c| c.value.clone());
        let current = self.get_match(match_id).await?;

        match check(&current) {
            Ok(result) => Ok(result),
            Err(source) => {
                if let Some(cached) = cached.filter(|c| check(c).is_ok()) {
                    warn!("Match {} moved on since last read: {} -> {}", match_id, MatchPhase::of(&cached), MatchPhase::of(&current));
                    return Err(ClientError::StaleState {
                        match_id,
                        cached: MatchPhase::of(&cached),
                        current: MatchPhase::of(&current),
                        action,
                    });
                }
                Err(ClientError::InvalidTransition { match_id, source })
            }
        }
    }

    // =========================================================================
    // WRITES
    // =========================================================================

    async fn submit(
        &self,
        from: Address,
        call: ContractCall,
        value: TokenAmount,
    ) -> Result<PendingTransaction, ClientError> {
        let tx = TxRequest { from, to: self.config.contract, data: call.encode(), value };
        let hash = self.transport.send_transaction(tx.clone()).await.map_err(|e| {
            warn!("{} from {} not submitted: {}", call.name(), from, e);
            ClientError::from(e)
        })?;
        info!("Submitted {} from {}: {}", call.name(), from.short(), hash);
        Ok(PendingTransaction::new(hash, tx, call, self.config.poll_interval, self.config.confirmation_timeout))
    }

    async fn confirm(&self, pending: &mut PendingTransaction) -> Result<Confirmation, ClientError> {
        let confirmation = pending.confirm(self.transport.as_ref()).await?;
        let mut cache = self.cache.write().await;
        for event in &confirmation.events {
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
        Ok(confirmation)
    }

    /// Submit `createMatch(betAmount)`.
    #[instrument(skip(self, session))]
    pub async fn submit_create_match(
        &self,
        session: &WalletSession,
        bet_amount: TokenAmount,
    ) -> Result<PendingTransaction, ClientError> {
        let from = session.signer(self.config.chain_id)?;
        if self.config.precheck && bet_amount.is_zero() {
            return Err(ClientError::InvalidRequest("bet amount must be positive".to_string()));
        }
        self.submit(from, ContractCall::CreateMatch { bet_amount }, TokenAmount::ZERO).await
    }

    /// Create a match and wait for its id.
    pub async fn create_match(
        &self,
        session: &WalletSession,
        bet_amount: TokenAmount,
    ) -> Result<CreatedMatch, ClientError> {
        let mut pending = self.submit_create_match(session, bet_amount).await?;
        let confirmation = self.confirm(&mut pending).await?;
        let (match_id, creator, bet_amount) = confirmation
            .find(|e| match e {
                ContractEvent::MatchCreated { match_id, creator, bet_amount } => {
                    Some((*match_id, *creator, *bet_amount))
                }
                _ => None,
            })
            .ok_or(ClientError::MissingEvent { tx: confirmation.tx_hash, event: "MatchCreated" })?;
        info!("Match {} created by {} for {}", match_id, creator.short(), bet_amount);
        Ok(CreatedMatch { match_id, creator, bet_amount, confirmation })
    }

    /// Submit `joinMatch(matchId)`.
    #[instrument(skip(self, session))]
    pub async fn submit_join_match(
        &self,
        session: &WalletSession,
        match_id: MatchId,
    ) -> Result<PendingTransaction, ClientError> {
        let from = session.signer(self.config.chain_id)?;
        if self.config.precheck {
            self.precheck(match_id, MatchAction::Join, |m| check_join(m, &from)).await?;
        }
        self.submit(from, ContractCall::JoinMatch { match_id }, TokenAmount::ZERO).await
    }

    /// Join a match as challenger.
    pub async fn join_match(&self, session: &WalletSession, match_id: MatchId) -> Result<JoinedMatch, ClientError> {
        let mut pending = self.submit_join_match(session, match_id).await?;
        let confirmation = self.confirm(&mut pending).await?;
        let challenger = confirmation
            .find(|e| match e {
                ContractEvent::MatchJoined { match_id: id, challenger } if *id == match_id => Some(*challenger),
                _ => None,
            })
            .ok_or(ClientError::MissingEvent { tx: confirmation.tx_hash, event: "MatchJoined" })?;
        info!("{} joined match {}", challenger.short(), match_id);
        Ok(JoinedMatch { match_id, challenger, confirmation })
    }

    /// Submit `readyUp(matchId)` with an optional payment. `None` when the
    /// caller is already ready and nothing needs submitting.
    #[instrument(skip(self, session))]
    pub async fn submit_ready_up(
        &self,
        session: &WalletSession,
        match_id: MatchId,
        payment: TokenAmount,
    ) -> Result<Option<PendingTransaction>, ClientError> {
        let from = session.signer(self.config.chain_id)?;
        if self.config.precheck {
            let check = self.precheck(match_id, MatchAction::ReadyUp, |m| check_ready(m, &from)).await?;
            if check == ReadyCheck::AlreadyReady {
                info!("{} already ready in match {}, nothing to submit", from.short(), match_id);
                return Ok(None);
            }
        }
        self.submit(from, ContractCall::ReadyUp { match_id }, payment).await.map(Some)
    }

    /// Ready up. The contract starts the match on the second ready-up.
    pub async fn ready_up(
        &self,
        session: &WalletSession,
        match_id: MatchId,
        payment: TokenAmount,
    ) -> Result<ReadyOutcome, ClientError> {
        let Some(mut pending) = self.submit_ready_up(session, match_id, payment).await? else {
            return Ok(ReadyOutcome { match_id, already_ready: true, started: false, confirmation: None });
        };
        let confirmation = self.confirm(&mut pending).await?;
        let started = confirmation
            .find(|e| match e {
                ContractEvent::MatchStarted { match_id: id } if *id == match_id => Some(()),
                _ => None,
            })
            .is_some();
        if started {
            info!("Match {} started", match_id);
        }
        Ok(ReadyOutcome { match_id, already_ready: false, started, confirmation: Some(confirmation) })
    }

    /// Submit `declareWinner(matchId, winner)`.
    #[instrument(skip(self, session))]
    pub async fn submit_declare_winner(
        &self,
        session: &WalletSession,
        match_id: MatchId,
        winner: Address,
    ) -> Result<PendingTransaction, ClientError> {
        let from = session.signer(self.config.chain_id)?;
        if self.config.precheck {
            self.precheck(match_id, MatchAction::DeclareWinner, |m| check_declare(m, &winner)).await?;
        }
        self.submit(from, ContractCall::DeclareWinner { match_id, winner }, TokenAmount::ZERO).await
    }

    /// Resolve a started match and release the pot to `winner`.
    pub async fn declare_winner(
        &self,
        session: &WalletSession,
        match_id: MatchId,
        winner: Address,
    ) -> Result<MatchResolved, ClientError> {
        let mut pending = self.submit_declare_winner(session, match_id, winner).await?;
        let confirmation = self.confirm(&mut pending).await?;
        let winner = confirmation
            .find(|e| match e {
                ContractEvent::MatchCompleted { match_id: id, winner } if *id == match_id => Some(*winner),
                _ => None,
            })
            .ok_or(ClientError::MissingEvent { tx: confirmation.tx_hash, event: "MatchCompleted" })?;
        info!("Match {} won by {}", match_id, winner.short());
        Ok(MatchResolved { match_id, winner, confirmation })
    }

    /// Submit `cancelMatch(matchId)`.
    #[instrument(skip(self, session))]
    pub async fn submit_cancel_match(
        &self,
        session: &WalletSession,
        match_id: MatchId,
    ) -> Result<PendingTransaction, ClientError> {
        let from = session.signer(self.config.chain_id)?;
        if self.config.precheck {
            self.precheck(match_id, MatchAction::Cancel, check_cancel).await?;
        }
        self.submit(from, ContractCall::CancelMatch { match_id }, TokenAmount::ZERO).await
    }

    /// Cancel a match that has not started; escrow is refunded.
    pub async fn cancel_match(&self, session: &WalletSession, match_id: MatchId) -> Result<Confirmation, ClientError> {
        let mut pending = self.submit_cancel_match(session, match_id).await?;
        let confirmation = self.confirm(&mut pending).await?;
        let cancelled = confirmation.events.iter().any(|e| *e == ContractEvent::MatchCancelled { match_id });
        if !cancelled {
            return Err(ClientError::MissingEvent { tx: confirmation.tx_hash, event: "MatchCancelled" });
        }
        info!("Match {} cancelled", match_id);
        Ok(confirmation)
    }

    /// Submit `createUserProfile(riotId)`.
    #[instrument(skip(self, session))]
    pub async fn submit_create_user_profile(
        &self,
        session: &WalletSession,
        riot_id: &str,
    ) -> Result<PendingTransaction, ClientError> {
        let from = session.signer(self.config.chain_id)?;
        let riot_id = riot_id.trim();
        if riot_id.is_empty() {
            return Err(ClientError::InvalidRequest("Riot ID is required".to_string()));
        }
        if self.config.precheck && self.get_user_profile(from).await?.is_some() {
            return Err(ClientError::ProfileExists(from));
        }
        let call = ContractCall::CreateUserProfile { riot_id: riot_id.to_string() };
        self.submit(from, call, TokenAmount::ZERO).await
    }

    /// Register the caller's Riot ID on chain.
    pub async fn create_user_profile(&self, session: &WalletSession, riot_id: &str) -> Result<ProfileCreated, ClientError> {
        let mut pending = self.submit_create_user_profile(session, riot_id).await?;
        let confirmation = self.confirm(&mut pending).await?;
        let (user, riot_id) = confirmation
            .find(|e| match e {
                ContractEvent::UserProfileCreated { user, riot_id } => Some((*user, riot_id.clone())),
                _ => None,
            })
            .ok_or(ClientError::MissingEvent { tx: confirmation.tx_hash, event: "UserProfileCreated" })?;
        info!("Profile {} created for {}", riot_id, user.short());
        Ok(ProfileCreated { user, riot_id, confirmation })
    }
}
