//! Simulated Chain
//!
//! In-memory chain that runs the MatchUp contract rules behind the same
//! `ContractTransport` seam as a live node. Calldata goes through the
//! real ABI codec, so tests exercise exactly the bytes a node would see.
//!
//! ## Execution Model
//!
//! - `send_transaction` pre-flights the call against committed state
//!   (the way a node estimates gas) and rejects reverts up front.
//! - Accepted transactions enter a mempool. With auto-mine on (default)
//!   each one is mined into its own block immediately; otherwise they
//!   wait for `mine()`, and may still revert inside the block.
//! - Each transaction executes on a copy of the contract state that is
//!   committed only on success.
//!
//! `declareWinner` accepts any caller. Who may resolve a match on the
//! deployed contract is not observable from its interface.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use tracing::{debug, info, warn};

use crate::chain::transport::{
    CallRequest, ContractTransport, Log, LogFilter, Receipt, TransportError, TxHash, TxRequest,
    EXECUTION_REVERTED_CODE, USER_REJECTED_CODE,
};
use crate::contract::abi::{
    address_word, encode_match, encode_revert, encode_string, encode_user_profile, uint_word,
    ContractCall,
};
use crate::contract::events::ContractEvent;
use crate::contract::types::{Match, MatchId, MatchStatus, UserProfile};
use crate::core::address::Address;
use crate::core::amount::TokenAmount;
use crate::core::hash::KeccakHasher;

/// `PLATFORM_FEE` of the simulated deployment, in percent of the pot.
pub const SIMULATED_PLATFORM_FEE: u128 = 5;

// =============================================================================
// REVERTS
// =============================================================================

/// A failed execution, with the `require` message if there is one.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Revert(Option<String>);

impl Revert {
    fn reason(reason: &str) -> Self {
        Self(Some(reason.to_string()))
    }

    fn bare() -> Self {
        Self(None)
    }

    /// The error a node returns for a reverted call or gas estimate.
    fn into_rpc_error(self) -> TransportError {
        match self.0 {
            Some(reason) => TransportError::Rpc {
                code: EXECUTION_REVERTED_CODE,
                message: format!("execution reverted: {}", reason),
                data: Some(encode_revert(&reason)),
            },
            None => TransportError::Rpc {
                code: EXECUTION_REVERTED_CODE,
                message: "execution reverted".to_string(),
                data: None,
            },
        }
    }
}

fn require(condition: bool, reason: &str) -> Result<(), Revert> {
    if condition {
        Ok(())
    } else {
        Err(Revert::reason(reason))
    }
}

// =============================================================================
// CONTRACT STATE
// =============================================================================

/// Storage of the simulated contract plus the token ledger.
#[derive(Debug, Clone, Default)]
struct ContractState {
    platform_wallet: Address,
    platform_fee: u128,
    match_count: u64,
    matches: BTreeMap<MatchId, Match>,
    /// Escrowed deposits per match, in deposit order.
    deposits: BTreeMap<MatchId, Vec<(Address, TokenAmount)>>,
    profiles: BTreeMap<Address, UserProfile>,
    balances: BTreeMap<Address, TokenAmount>,
}

impl ContractState {
    fn balance(&self, account: &Address) -> TokenAmount {
        self.balances.get(account).copied().unwrap_or_default()
    }

    fn credit(&mut self, account: Address, amount: TokenAmount) -> Result<(), Revert> {
        let balance = self
            .balance(&account)
            .checked_add(amount)
            .ok_or_else(|| Revert::reason("Balance overflow"))?;
        self.balances.insert(account, balance);
        Ok(())
    }

    fn debit(&mut self, account: Address, amount: TokenAmount) -> Result<(), Revert> {
        let balance = self
            .balance(&account)
            .checked_sub(amount)
            .ok_or_else(|| Revert::reason("Insufficient balance"))?;
        self.balances.insert(account, balance);
        Ok(())
    }

    fn escrow(&mut self, match_id: MatchId, from: Address, amount: TokenAmount) -> Result<(), Revert> {
        self.debit(from, amount)?;
        self.deposits.entry(match_id).or_default().push((from, amount));
        Ok(())
    }

    fn pot(&self, match_id: &MatchId) -> TokenAmount {
        self.deposits
            .get(match_id)
            .map(|d| TokenAmount(d.iter().map(|(_, a)| a.0).sum()))
            .unwrap_or_default()
    }

    fn existing_match(&mut self, match_id: MatchId) -> Result<&mut Match, Revert> {
        self.matches
            .get_mut(&match_id)
            .ok_or_else(|| Revert::reason("Match does not exist"))
    }

    /// Run a state-changing call. Views return no events.
    fn execute(
        &mut self,
        from: Address,
        call: &ContractCall,
        value: TokenAmount,
    ) -> Result<Vec<ContractEvent>, Revert> {
        if !value.is_zero() && !call.is_payable() {
            return Err(Revert::bare());
        }

        match call {
            ContractCall::CreateMatch { bet_amount } => {
                require(!bet_amount.is_zero(), "Bet amount must be positive")?;
                require(self.balance(&from) >= *bet_amount, "Insufficient balance")?;
                self.match_count += 1;
                let match_id = MatchId(self.match_count);
                self.matches.insert(match_id, Match::new(from, *bet_amount));
                self.escrow(match_id, from, *bet_amount)?;
                Ok(vec![ContractEvent::MatchCreated { match_id, creator: from, bet_amount: *bet_amount }])
            }

            ContractCall::JoinMatch { match_id } => {
                let m = self.existing_match(*match_id)?;
                require(m.status == MatchStatus::Created, "Match not open")?;
                require(m.creator != from, "Cannot join own match")?;
                m.challenger = from;
                m.status = MatchStatus::Joined;
                Ok(vec![ContractEvent::MatchJoined { match_id: *match_id, challenger: from }])
            }

            ContractCall::ReadyUp { match_id } => {
                let m = self.existing_match(*match_id)?;
                require(m.status == MatchStatus::Joined, "Match not joined")?;
                let already = m.is_ready(&from).ok_or_else(|| Revert::reason("Not a participant"))?;
                require(!already, "Player already ready")?;
                if m.creator == from {
                    m.creator_ready = true;
                } else {
                    m.challenger_ready = true;
                }
                let started = m.creator_ready && m.challenger_ready;
                if started {
                    m.status = MatchStatus::Started;
                }
                // Funds move only on create, declare and cancel
                if !value.is_zero() {
                    debug!("Ignoring {} sent with readyUp on {}", value, match_id);
                }

                let mut events = vec![ContractEvent::PlayerReady { match_id: *match_id, player: from }];
                if started {
                    events.push(ContractEvent::MatchStarted { match_id: *match_id });
                }
                Ok(events)
            }

            ContractCall::DeclareWinner { match_id, winner } => {
                let m = self.existing_match(*match_id)?;
                require(m.status == MatchStatus::Started, "Match not started")?;
                require(m.is_participant(winner), "Winner must be a participant")?;
                m.status = MatchStatus::Completed;

                let pot = self.pot(match_id);
                let fee = pot.percent(self.platform_fee);
                let payout = TokenAmount(pot.0 - fee.0);
                self.deposits.remove(match_id);
                self.credit(*winner, payout)?;
                self.credit(self.platform_wallet, fee)?;
                Ok(vec![ContractEvent::MatchCompleted { match_id: *match_id, winner: *winner }])
            }

            ContractCall::CancelMatch { match_id } => {
                let m = self.existing_match(*match_id)?;
                require(m.creator == from, "Only creator can cancel")?;
                require(
                    matches!(m.status, MatchStatus::Created | MatchStatus::Joined),
                    "Match cannot be cancelled",
                )?;
                m.status = MatchStatus::Cancelled;

                for (account, amount) in self.deposits.remove(match_id).unwrap_or_default() {
                    self.credit(account, amount)?;
                }
                Ok(vec![ContractEvent::MatchCancelled { match_id: *match_id }])
            }

            ContractCall::CreateUserProfile { riot_id } => {
                require(!riot_id.is_empty(), "Riot ID required")?;
                require(!self.profiles.contains_key(&from), "Profile already exists")?;
                self.profiles.insert(from, UserProfile { riot_id: riot_id.clone() });
                Ok(vec![ContractEvent::UserProfileCreated { user: from, riot_id: riot_id.clone() }])
            }

            _ => Ok(Vec::new()),
        }
    }

    /// Return data of a view.
    fn view(&self, call: &ContractCall) -> Option<Vec<u8>> {
        let empty_match = || Match::new(Address::ZERO, TokenAmount::ZERO);
        let data = match call {
            ContractCall::GetMatch { match_id } | ContractCall::Matches { match_id } => {
                encode_match(&self.matches.get(match_id).cloned().unwrap_or_else(empty_match))
            }
            ContractCall::GetUserProfile { user } => {
                encode_user_profile(&self.profiles.get(user).cloned().unwrap_or_default())
            }
            ContractCall::UserProfiles { user } => {
                encode_string(self.profiles.get(user).map(|p| p.riot_id.as_str()).unwrap_or(""))
            }
            ContractCall::MatchCount => uint_word(self.match_count as u128).to_vec(),
            ContractCall::PlatformFee => uint_word(self.platform_fee).to_vec(),
            ContractCall::PlatformWallet => address_word(&self.platform_wallet).to_vec(),
            _ => return None,
        };
        Some(data)
    }
}

// =============================================================================
// CHAIN
// =============================================================================

#[derive(Debug, Clone)]
struct PendingTx {
    hash: TxHash,
    from: Address,
    call: ContractCall,
    value: TokenAmount,
}

#[derive(Debug, Default)]
struct Faults {
    /// Signature requests to decline.
    reject_signatures: u32,
    /// Requests of any kind to fail with a connection error.
    fail_requests: u32,
}

#[derive(Debug)]
struct ChainState {
    block_number: u64,
    nonce: u64,
    auto_mine: bool,
    mempool: Vec<PendingTx>,
    receipts: BTreeMap<TxHash, Receipt>,
    logs: Vec<Log>,
    faults: Faults,
    contract: ContractState,
}

/// In-memory chain running the MatchUp contract.
#[derive(Debug)]
pub struct SimulatedChain {
    contract_address: Address,
    state: Mutex<ChainState>,
}

impl SimulatedChain {
    /// New chain at block 0 with the contract deployed at `contract_address`.
    pub fn new(contract_address: Address, platform_wallet: Address) -> Self {
        Self {
            contract_address,
            state: Mutex::new(ChainState {
                block_number: 0,
                nonce: 0,
                auto_mine: true,
                mempool: Vec::new(),
                receipts: BTreeMap::new(),
                logs: Vec::new(),
                faults: Faults::default(),
                contract: ContractState {
                    platform_wallet,
                    platform_fee: SIMULATED_PLATFORM_FEE,
                    ..ContractState::default()
                },
            }),
        }
    }

    /// Toggle mining each transaction on submission.
    pub fn with_auto_mine(self, auto_mine: bool) -> Self {
        self.lock().auto_mine = auto_mine;
        self
    }

    fn lock(&self) -> MutexGuard<'_, ChainState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Credit tokens to an account.
    pub fn fund(&self, account: Address, amount: TokenAmount) {
        let mut state = self.lock();
        let balance = state.contract.balance(&account).0.saturating_add(amount.0);
        state.contract.balances.insert(account, TokenAmount(balance));
    }

    /// Token balance of an account.
    pub fn balance_of(&self, account: &Address) -> TokenAmount {
        self.lock().contract.balance(account)
    }

    /// Tokens escrowed for a match.
    pub fn escrow_of(&self, match_id: MatchId) -> TokenAmount {
        self.lock().contract.pot(&match_id)
    }

    /// Transactions waiting to be mined.
    pub fn pending_count(&self) -> usize {
        self.lock().mempool.len()
    }

    /// Transactions accepted so far.
    pub fn transaction_count(&self) -> u64 {
        self.lock().nonce
    }

    /// Decline the next `n` signature requests with code 4001.
    pub fn reject_next_signatures(&self, n: u32) {
        self.lock().faults.reject_signatures = n;
    }

    /// Fail the next `n` requests with a connection error.
    pub fn fail_next_requests(&self, n: u32) {
        self.lock().faults.fail_requests = n;
    }

    /// Mine every pending transaction into a new block. Returns the block number.
    pub fn mine(&self) -> u64 {
        let mut state = self.lock();
        Self::mine_block(&mut state, self.contract_address)
    }

    fn mine_block(state: &mut ChainState, contract_address: Address) -> u64 {
        state.block_number += 1;
        let block_number = state.block_number;
        let mut log_index = 0u64;

        for tx in std::mem::take(&mut state.mempool) {
            let mut next = state.contract.clone();
            let (status, logs) = match next.execute(tx.from, &tx.call, tx.value) {
                Ok(events) => {
                    state.contract = next;
                    let logs = events
                        .iter()
                        .map(|event| {
                            let (topics, data) = event.encode();
                            let log = Log {
                                address: contract_address,
                                topics,
                                data,
                                block_number,
                                transaction_hash: tx.hash,
                                log_index,
                            };
                            log_index += 1;
                            log
                        })
                        .collect::<Vec<_>>();
                    debug!("Mined {} ({}) in block {}", tx.hash, tx.call.name(), block_number);
                    (true, logs)
                }
                Err(revert) => {
                    warn!(
                        "Transaction {} ({}) reverted in block {}: {:?}",
                        tx.hash,
                        tx.call.name(),
                        block_number,
                        revert.0
                    );
                    (false, Vec::new())
                }
            };
            state.logs.extend(logs.iter().cloned());
            state.receipts.insert(
                tx.hash,
                Receipt { transaction_hash: tx.hash, block_number, status, logs },
            );
        }
        block_number
    }

    /// Consume one injected network failure, if armed.
    fn take_network_fault(state: &mut ChainState) -> Result<(), TransportError> {
        if state.faults.fail_requests > 0 {
            state.faults.fail_requests -= 1;
            return Err(TransportError::Connection("simulated network failure".to_string()));
        }
        Ok(())
    }

    fn decode_call(&self, to: &Address, data: &[u8]) -> Result<ContractCall, TransportError> {
        if *to != self.contract_address {
            return Err(TransportError::Rpc {
                code: -32000,
                message: format!("no contract at {}", to),
                data: None,
            });
        }
        ContractCall::decode(data).map_err(|_| Revert::bare().into_rpc_error())
    }
}

impl ContractTransport for SimulatedChain {
    async fn call(&self, request: CallRequest) -> Result<Vec<u8>, TransportError> {
        let mut state = self.lock();
        Self::take_network_fault(&mut state)?;
        let call = self.decode_call(&request.to, &request.data)?;

        if let Some(data) = state.contract.view(&call) {
            return Ok(data);
        }
        // Simulate a state-changing call without committing it
        let from = request.from.unwrap_or(Address::ZERO);
        let mut scratch = state.contract.clone();
        scratch
            .execute(from, &call, TokenAmount::ZERO)
            .map(|_| Vec::new())
            .map_err(Revert::into_rpc_error)
    }

    async fn send_transaction(&self, tx: TxRequest) -> Result<TxHash, TransportError> {
        let mut state = self.lock();
        Self::take_network_fault(&mut state)?;
        if state.faults.reject_signatures > 0 {
            state.faults.reject_signatures -= 1;
            info!("Simulated wallet declined signature for {}", tx.from);
            return Err(TransportError::UserRejected(format!(
                "code {}: User rejected the request.",
                USER_REJECTED_CODE
            )));
        }

        let call = self.decode_call(&tx.to, &tx.data)?;

        // Pre-flight against committed state, like gas estimation
        let mut scratch = state.contract.clone();
        scratch
            .execute(tx.from, &call, tx.value)
            .map_err(Revert::into_rpc_error)?;

        let mut hasher = KeccakHasher::for_transaction();
        hasher.update_bytes(tx.from.as_bytes());
        hasher.update_bytes(tx.to.as_bytes());
        hasher.update_bytes(&tx.data);
        hasher.update_u128(tx.value.0);
        hasher.update_u64(state.nonce);
        let hash = TxHash(hasher.finalize());
        state.nonce += 1;

        debug!("Accepted {} ({}) from {}", hash, call.name(), tx.from);
        state.mempool.push(PendingTx { hash, from: tx.from, call, value: tx.value });

        if state.auto_mine {
            Self::mine_block(&mut state, self.contract_address);
        }
        Ok(hash)
    }

    async fn transaction_receipt(&self, hash: TxHash) -> Result<Option<Receipt>, TransportError> {
        let mut state = self.lock();
        Self::take_network_fault(&mut state)?;
        Ok(state.receipts.get(&hash).cloned())
    }

    async fn block_number(&self) -> Result<u64, TransportError> {
        let mut state = self.lock();
        Self::take_network_fault(&mut state)?;
        Ok(state.block_number)
    }

    async fn logs(&self, filter: LogFilter) -> Result<Vec<Log>, TransportError> {
        let mut state = self.lock();
        Self::take_network_fault(&mut state)?;
        Ok(state
            .logs
            .iter()
            .filter(|log| {
                log.address == filter.address
                    && log.block_number >= filter.from_block
                    && log.block_number <= filter.to_block
            })
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::abi::{decode_match, decode_uint};

    fn addr(b: u8) -> Address {
        Address::new([b; 20])
    }

    const CONTRACT: Address = Address::new([0xc0; 20]);
    const PLATFORM: Address = Address::new([0xfe; 20]);

    fn chain() -> SimulatedChain {
        let chain = SimulatedChain::new(CONTRACT, PLATFORM);
        chain.fund(addr(1), TokenAmount(1_000));
        chain.fund(addr(2), TokenAmount(1_000));
        chain
    }

    async fn send(chain: &SimulatedChain, from: Address, call: ContractCall) -> Result<TxHash, TransportError> {
        send_value(chain, from, call, TokenAmount::ZERO).await
    }

    async fn send_value(
        chain: &SimulatedChain,
        from: Address,
        call: ContractCall,
        value: TokenAmount,
    ) -> Result<TxHash, TransportError> {
        chain
            .send_transaction(TxRequest { from, to: CONTRACT, data: call.encode(), value })
            .await
    }

    async fn get_match(chain: &SimulatedChain, id: u64) -> Match {
        let data = chain
            .call(CallRequest {
                to: CONTRACT,
                from: None,
                data: ContractCall::GetMatch { match_id: MatchId(id) }.encode(),
            })
            .await
            .unwrap();
        decode_match(&data).unwrap()
    }

    async fn started_match(chain: &SimulatedChain) {
        send(chain, addr(1), ContractCall::CreateMatch { bet_amount: TokenAmount(100) }).await.unwrap();
        send(chain, addr(2), ContractCall::JoinMatch { match_id: MatchId(1) }).await.unwrap();
        send(chain, addr(1), ContractCall::ReadyUp { match_id: MatchId(1) }).await.unwrap();
        send(chain, addr(2), ContractCall::ReadyUp { match_id: MatchId(1) }).await.unwrap();
    }

    #[tokio::test]
    async fn test_create_escrows_and_emits() {
        let chain = chain();
        let hash = send(&chain, addr(1), ContractCall::CreateMatch { bet_amount: TokenAmount(100) })
            .await
            .unwrap();

        assert_eq!(chain.balance_of(&addr(1)), TokenAmount(900));
        assert_eq!(chain.escrow_of(MatchId(1)), TokenAmount(100));

        let receipt = chain.transaction_receipt(hash).await.unwrap().unwrap();
        assert!(receipt.status);
        assert_eq!(receipt.block_number, 1);
        let event = ContractEvent::decode(&receipt.logs[0].topics, &receipt.logs[0].data).unwrap();
        assert_eq!(
            event,
            ContractEvent::MatchCreated { match_id: MatchId(1), creator: addr(1), bet_amount: TokenAmount(100) }
        );
    }

    #[tokio::test]
    async fn test_preflight_reverts_carry_reason() {
        let chain = chain();
        let err = send(&chain, addr(1), ContractCall::CreateMatch { bet_amount: TokenAmount(5_000) })
            .await
            .unwrap_err();
        assert!(err.is_revert());
        assert_eq!(err.revert_reason().as_deref(), Some("Insufficient balance"));

        let err = send(&chain, addr(1), ContractCall::CreateMatch { bet_amount: TokenAmount::ZERO })
            .await
            .unwrap_err();
        assert_eq!(err.revert_reason().as_deref(), Some("Bet amount must be positive"));

        let err = send(&chain, addr(2), ContractCall::JoinMatch { match_id: MatchId(9) }).await.unwrap_err();
        assert_eq!(err.revert_reason().as_deref(), Some("Match does not exist"));
        assert_eq!(chain.transaction_count(), 0);
    }

    #[tokio::test]
    async fn test_join_rules() {
        let chain = chain();
        send(&chain, addr(1), ContractCall::CreateMatch { bet_amount: TokenAmount(10) }).await.unwrap();

        let err = send(&chain, addr(1), ContractCall::JoinMatch { match_id: MatchId(1) }).await.unwrap_err();
        assert_eq!(err.revert_reason().as_deref(), Some("Cannot join own match"));

        send(&chain, addr(2), ContractCall::JoinMatch { match_id: MatchId(1) }).await.unwrap();
        let err = send(&chain, addr(3), ContractCall::JoinMatch { match_id: MatchId(1) }).await.unwrap_err();
        assert_eq!(err.revert_reason().as_deref(), Some("Match not open"));

        let m = get_match(&chain, 1).await;
        assert_eq!(m.challenger, addr(2));
        assert_eq!(m.status, MatchStatus::Joined);
    }

    #[tokio::test]
    async fn test_second_ready_starts_match() {
        let chain = chain();
        send(&chain, addr(1), ContractCall::CreateMatch { bet_amount: TokenAmount(10) }).await.unwrap();
        send(&chain, addr(2), ContractCall::JoinMatch { match_id: MatchId(1) }).await.unwrap();

        let first = send(&chain, addr(1), ContractCall::ReadyUp { match_id: MatchId(1) }).await.unwrap();
        assert_eq!(chain.transaction_receipt(first).await.unwrap().unwrap().logs.len(), 1);

        let err = send(&chain, addr(1), ContractCall::ReadyUp { match_id: MatchId(1) }).await.unwrap_err();
        assert_eq!(err.revert_reason().as_deref(), Some("Player already ready"));

        let second = send(&chain, addr(2), ContractCall::ReadyUp { match_id: MatchId(1) }).await.unwrap();
        let receipt = chain.transaction_receipt(second).await.unwrap().unwrap();
        assert_eq!(receipt.logs.len(), 2);
        assert_eq!(get_match(&chain, 1).await.status, MatchStatus::Started);
    }

    #[tokio::test]
    async fn test_ready_value_moves_no_funds_and_payout_takes_fee() {
        let chain = chain();
        send(&chain, addr(1), ContractCall::CreateMatch { bet_amount: TokenAmount(100) }).await.unwrap();
        send(&chain, addr(2), ContractCall::JoinMatch { match_id: MatchId(1) }).await.unwrap();
        send(&chain, addr(1), ContractCall::ReadyUp { match_id: MatchId(1) }).await.unwrap();
        send_value(&chain, addr(2), ContractCall::ReadyUp { match_id: MatchId(1) }, TokenAmount(100))
            .await
            .unwrap();
        assert_eq!(chain.escrow_of(MatchId(1)), TokenAmount(100));
        assert_eq!(chain.balance_of(&addr(2)), TokenAmount(1_000));

        send(&chain, addr(3), ContractCall::DeclareWinner { match_id: MatchId(1), winner: addr(2) })
            .await
            .unwrap();

        assert_eq!(chain.balance_of(&PLATFORM), TokenAmount(5));
        assert_eq!(chain.balance_of(&addr(2)), TokenAmount(1_095));
        assert_eq!(chain.escrow_of(MatchId(1)), TokenAmount::ZERO);
        assert_eq!(get_match(&chain, 1).await.status, MatchStatus::Completed);
    }

    #[tokio::test]
    async fn test_declare_requires_started_and_participant() {
        let chain = chain();
        send(&chain, addr(1), ContractCall::CreateMatch { bet_amount: TokenAmount(100) }).await.unwrap();
        let err = send(&chain, addr(1), ContractCall::DeclareWinner { match_id: MatchId(1), winner: addr(1) })
            .await
            .unwrap_err();
        assert_eq!(err.revert_reason().as_deref(), Some("Match not started"));

        let chain = self::chain();
        started_match(&chain).await;
        let err = send(&chain, addr(1), ContractCall::DeclareWinner { match_id: MatchId(1), winner: addr(7) })
            .await
            .unwrap_err();
        assert_eq!(err.revert_reason().as_deref(), Some("Winner must be a participant"));
    }

    #[tokio::test]
    async fn test_cancel_refunds_creator_only() {
        let chain = chain();
        send(&chain, addr(1), ContractCall::CreateMatch { bet_amount: TokenAmount(100) }).await.unwrap();

        let err = send(&chain, addr(2), ContractCall::CancelMatch { match_id: MatchId(1) }).await.unwrap_err();
        assert_eq!(err.revert_reason().as_deref(), Some("Only creator can cancel"));

        send(&chain, addr(1), ContractCall::CancelMatch { match_id: MatchId(1) }).await.unwrap();
        assert_eq!(chain.balance_of(&addr(1)), TokenAmount(1_000));
        assert_eq!(get_match(&chain, 1).await.status, MatchStatus::Cancelled);

        let err = send(&chain, addr(1), ContractCall::CancelMatch { match_id: MatchId(1) }).await.unwrap_err();
        assert_eq!(err.revert_reason().as_deref(), Some("Match cannot be cancelled"));
    }

    #[tokio::test]
    async fn test_cannot_cancel_started_match() {
        let chain = chain();
        started_match(&chain).await;
        let err = send(&chain, addr(1), ContractCall::CancelMatch { match_id: MatchId(1) }).await.unwrap_err();
        assert_eq!(err.revert_reason().as_deref(), Some("Match cannot be cancelled"));
    }

    #[tokio::test]
    async fn test_profile_created_once() {
        let chain = chain();
        let err = send(&chain, addr(1), ContractCall::CreateUserProfile { riot_id: String::new() })
            .await
            .unwrap_err();
        assert_eq!(err.revert_reason().as_deref(), Some("Riot ID required"));

        send(&chain, addr(1), ContractCall::CreateUserProfile { riot_id: "player#EUW".to_string() })
            .await
            .unwrap();
        let err = send(&chain, addr(1), ContractCall::CreateUserProfile { riot_id: "other#NA".to_string() })
            .await
            .unwrap_err();
        assert_eq!(err.revert_reason().as_deref(), Some("Profile already exists"));
    }

    #[tokio::test]
    async fn test_value_on_non_payable_reverts_without_reason() {
        let chain = chain();
        let err = send_value(&chain, addr(1), ContractCall::CreateMatch { bet_amount: TokenAmount(1) }, TokenAmount(1))
            .await
            .unwrap_err();
        assert!(err.is_revert());
        assert_eq!(err.revert_reason(), None);
    }

    #[tokio::test]
    async fn test_manual_mining_can_revert_in_block() {
        let chain = chain().with_auto_mine(false);
        send(&chain, addr(1), ContractCall::CreateMatch { bet_amount: TokenAmount(10) }).await.unwrap();
        chain.mine();

        // Both pass pre-flight; only the first wins in the block
        let first = send(&chain, addr(2), ContractCall::JoinMatch { match_id: MatchId(1) }).await.unwrap();
        let second = send(&chain, addr(3), ContractCall::JoinMatch { match_id: MatchId(1) }).await.unwrap();
        assert_eq!(chain.pending_count(), 2);
        assert!(chain.transaction_receipt(first).await.unwrap().is_none());

        chain.mine();
        assert!(chain.transaction_receipt(first).await.unwrap().unwrap().status);
        let receipt = chain.transaction_receipt(second).await.unwrap().unwrap();
        assert!(!receipt.status);
        assert!(receipt.logs.is_empty());
    }

    #[tokio::test]
    async fn test_views() {
        let chain = chain();
        send(&chain, addr(1), ContractCall::CreateMatch { bet_amount: TokenAmount(10) }).await.unwrap();

        let view = |call: ContractCall| CallRequest { to: CONTRACT, from: None, data: call.encode() };
        let count = chain.call(view(ContractCall::MatchCount)).await.unwrap();
        assert_eq!(decode_uint(&count).unwrap(), 1);
        let fee = chain.call(view(ContractCall::PlatformFee)).await.unwrap();
        assert_eq!(decode_uint(&fee).unwrap(), SIMULATED_PLATFORM_FEE);

        let missing = get_match(&chain, 42).await;
        assert!(!missing.exists());
    }

    #[tokio::test]
    async fn test_fault_injection() {
        let chain = chain();
        chain.reject_next_signatures(1);
        let err = send(&chain, addr(1), ContractCall::CreateMatch { bet_amount: TokenAmount(10) })
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::UserRejected(_)));

        chain.fail_next_requests(1);
        assert!(matches!(chain.block_number().await, Err(TransportError::Connection(_))));
        assert_eq!(chain.block_number().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_log_filter_by_block_range() {
        let chain = chain();
        send(&chain, addr(1), ContractCall::CreateMatch { bet_amount: TokenAmount(10) }).await.unwrap();
        send(&chain, addr(2), ContractCall::JoinMatch { match_id: MatchId(1) }).await.unwrap();

        let all = chain
            .logs(LogFilter { address: CONTRACT, from_block: 0, to_block: 10 })
            .await
            .unwrap();
        assert_eq!(all.len(), 2);

        let second = chain
            .logs(LogFilter { address: CONTRACT, from_block: 2, to_block: 2 })
            .await
            .unwrap();
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].block_number, 2);
    }

    #[tokio::test]
    async fn test_random_rounds_conserve_funds() {
        use rand::Rng;

        let chain = chain();
        let mut rng = rand::thread_rng();
        let total = |chain: &SimulatedChain, rounds: u64| {
            let escrow: u128 = (1..=rounds).map(|id| chain.escrow_of(MatchId(id)).0).sum();
            chain.balance_of(&addr(1)).0 + chain.balance_of(&addr(2)).0 + chain.balance_of(&PLATFORM).0 + escrow
        };

        for round in 1..=20u64 {
            let id = MatchId(round);
            let bet = TokenAmount(rng.gen_range(1..=40));
            send(&chain, addr(1), ContractCall::CreateMatch { bet_amount: bet }).await.unwrap();

            if rng.gen_bool(0.3) {
                send(&chain, addr(1), ContractCall::CancelMatch { match_id: id }).await.unwrap();
            } else {
                send(&chain, addr(2), ContractCall::JoinMatch { match_id: id }).await.unwrap();
                send(&chain, addr(1), ContractCall::ReadyUp { match_id: id }).await.unwrap();
                send_value(&chain, addr(2), ContractCall::ReadyUp { match_id: id }, bet).await.unwrap();
                let winner = if rng.gen_bool(0.5) { addr(1) } else { addr(2) };
                send(&chain, addr(3), ContractCall::DeclareWinner { match_id: id, winner }).await.unwrap();
            }

            assert_eq!(chain.escrow_of(id), TokenAmount::ZERO);
            assert_eq!(total(&chain, round), 2_000);
        }
    }
}
