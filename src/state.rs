// Autoraffle - State
use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{clock::UnixTimestamp, pubkey::Pubkey};

use crate::error::RaffleError;

/// Maximum number of entries per round. The raffle account is allocated for
/// this capacity up front, so the player list can never outgrow it.
pub const MAX_PLAYERS: usize = 128;

/// Lifecycle of a raffle round
#[derive(BorshSerialize, BorshDeserialize, Clone, Copy, Debug, PartialEq)]
pub enum RaffleState {
    /// Accepting entries; upkeep-eligible once the interval has elapsed
    Open,
    /// Entries blocked, exactly one outstanding randomness request
    Calculating,
}

/// Record of an outstanding randomness request awaiting one fulfillment
#[derive(BorshSerialize, BorshDeserialize, Clone, Copy, Debug, PartialEq)]
pub struct PendingRequest {
    /// Identifier echoed back by the oracle's callback
    pub request_id: u64,
    /// When the request was issued
    pub issued_at: UnixTimestamp,
}

/// Immutable oracle configuration, fixed at initialization
#[derive(BorshSerialize, BorshDeserialize, Clone, Copy, Debug)]
pub struct OracleConfig {
    /// VRF coordinator program randomness requests are sent to
    pub coordinator: Pubkey,
    /// Authority allowed to deliver the randomness callback
    pub fulfill_authority: Pubkey,
    /// Gas lane identifier forwarded with every request
    pub gas_lane: [u8; 32],
    /// Oracle subscription funding the requests
    pub subscription_id: u64,
    /// Confirmations the oracle waits for before responding
    pub request_confirmations: u16,
    /// Compute budget granted to the callback
    pub callback_gas_limit: u32,
    /// Random words requested per settlement (1 in this design)
    pub num_words: u32,
}

/// Result of evaluating the upkeep predicate, clause by clause
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct UpkeepCheck {
    pub is_open: bool,
    pub interval_elapsed: bool,
    pub has_players: bool,
    pub has_balance: bool,
}

impl UpkeepCheck {
    pub fn needed(&self) -> bool {
        self.is_open && self.interval_elapsed && self.has_players && self.has_balance
    }
}

/// Raffle account data
///
/// Holds the whole aggregate: configuration, the player ledger, the state
/// machine, and the outstanding randomness request. Everything that mutates
/// it goes through `Enter`, `PerformUpkeep`, or `FulfillRandomWords`.
#[derive(BorshSerialize, BorshDeserialize, Clone, Debug)]
pub struct Raffle {
    /// Is the account initialized
    pub is_initialized: bool,
    /// Current state of the round
    pub state: RaffleState,
    /// Minimum payment attached to an entry, in lamports
    pub entrance_fee: u64,
    /// Seconds between settlements
    pub interval: i64,
    /// Start of the current round; set at init and on every settlement
    pub last_timestamp: UnixTimestamp,
    /// Accumulated entrance fees since the last settlement
    pub pool_lamports: u64,
    /// Entrants in insertion order; one key may occupy multiple slots
    pub players: Vec<Pubkey>,
    /// Winner of the last settled round
    pub recent_winner: Option<Pubkey>,
    /// Outstanding randomness request, present iff state is Calculating
    pub pending_request: Option<PendingRequest>,
    /// Monotonic counter backing request ids
    pub request_counter: u64,
    /// Oracle configuration
    pub oracle: OracleConfig,
}

impl Raffle {
    /// Serialized size of a raffle account at full player capacity
    pub const LEN: usize = 1 // is_initialized
        + 1 // state
        + 8 // entrance_fee
        + 8 // interval
        + 8 // last_timestamp
        + 8 // pool_lamports
        + 4 + 32 * MAX_PLAYERS // players
        + 1 + 32 // recent_winner
        + 1 + 8 + 8 // pending_request
        + 8 // request_counter
        + 32 + 32 + 32 + 8 + 2 + 4 + 4; // oracle

    /// Create a freshly opened raffle
    pub fn new(
        entrance_fee: u64,
        interval: i64,
        oracle: OracleConfig,
        now: UnixTimestamp,
    ) -> Self {
        Self {
            is_initialized: true,
            state: RaffleState::Open,
            entrance_fee,
            interval,
            last_timestamp: now,
            pool_lamports: 0,
            players: Vec::new(),
            recent_winner: None,
            pending_request: None,
            request_counter: 0,
            oracle,
        }
    }

    pub fn player_count(&self) -> u64 {
        self.players.len() as u64
    }

    /// Evaluate the upkeep predicate without mutating anything.
    ///
    /// The player and balance clauses are redundant while pool and player
    /// list move together, but both are checked in case that coupling is
    /// ever relaxed.
    pub fn check_upkeep(&self, now: UnixTimestamp) -> UpkeepCheck {
        UpkeepCheck {
            is_open: self.state == RaffleState::Open,
            interval_elapsed: now.saturating_sub(self.last_timestamp) >= self.interval,
            has_players: !self.players.is_empty(),
            has_balance: self.pool_lamports > 0,
        }
    }

    pub fn upkeep_needed(&self, now: UnixTimestamp) -> bool {
        self.check_upkeep(now).needed()
    }

    /// Validate and record an entry: append the player and grow the pool.
    ///
    /// The lamport transfer itself is the processor's job; this only updates
    /// the ledger, and only when every check passes.
    pub fn record_entry(&mut self, player: Pubkey, amount: u64) -> Result<(), RaffleError> {
        if amount < self.entrance_fee {
            return Err(RaffleError::InsufficientPayment);
        }
        if self.state != RaffleState::Open {
            return Err(RaffleError::RaffleNotOpen);
        }
        if self.players.len() >= MAX_PLAYERS {
            return Err(RaffleError::RaffleFull);
        }
        self.pool_lamports = self
            .pool_lamports
            .checked_add(amount)
            .ok_or(RaffleError::AmountOverflow)?;
        self.players.push(player);
        Ok(())
    }

    /// Transition Open -> Calculating and mint the request id for the
    /// randomness request. The predicate is re-derived here rather than
    /// trusted from the caller.
    pub fn begin_calculating(&mut self, now: UnixTimestamp) -> Result<u64, RaffleError> {
        if !self.upkeep_needed(now) {
            return Err(RaffleError::UpkeepNotNeeded);
        }
        self.request_counter += 1;
        let request_id = self.request_counter;
        self.pending_request = Some(PendingRequest {
            request_id,
            issued_at: now,
        });
        self.state = RaffleState::Calculating;
        Ok(request_id)
    }

    /// Resolve the pending request and pick the winner. Read-only: the
    /// caller performs the payout first and calls `settle` only once the
    /// lamports have actually moved.
    ///
    /// Returns the winner's index, key, and the prize amount.
    pub fn select_winner(
        &self,
        request_id: u64,
        random_word: u64,
    ) -> Result<(usize, Pubkey, u64), RaffleError> {
        match self.pending_request {
            Some(pending) if pending.request_id == request_id => {}
            _ => return Err(RaffleError::RequestNotFound),
        }
        // A pending request can only exist over a non-empty pool.
        let index = random_word
            .checked_rem(self.player_count())
            .ok_or(RaffleError::RequestNotFound)? as usize;
        let winner = self.players[index];
        Ok((index, winner, self.pool_lamports))
    }

    /// Reset for a new round after a successful payout.
    pub fn settle(&mut self, winner: Pubkey, now: UnixTimestamp) {
        self.recent_winner = Some(winner);
        self.players.clear();
        self.pool_lamports = 0;
        self.pending_request = None;
        self.last_timestamp = now;
        self.state = RaffleState::Open;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FEE: u64 = 1;
    const INTERVAL: i64 = 30;

    fn oracle_config() -> OracleConfig {
        OracleConfig {
            coordinator: Pubkey::new_unique(),
            fulfill_authority: Pubkey::new_unique(),
            gas_lane: [7u8; 32],
            subscription_id: 2196,
            request_confirmations: 3,
            callback_gas_limit: 500_000,
            num_words: 1,
        }
    }

    fn open_raffle() -> Raffle {
        Raffle::new(FEE, INTERVAL, oracle_config(), 1_000)
    }

    #[test]
    fn starts_open_and_empty() {
        let raffle = open_raffle();
        assert_eq!(raffle.state, RaffleState::Open);
        assert!(raffle.players.is_empty());
        assert_eq!(raffle.pool_lamports, 0);
        assert_eq!(raffle.recent_winner, None);
        assert_eq!(raffle.pending_request, None);
        assert_eq!(raffle.last_timestamp, 1_000);
    }

    #[test]
    fn entry_below_fee_is_rejected_and_state_unchanged() {
        let mut raffle = Raffle::new(5, INTERVAL, oracle_config(), 1_000);
        let err = raffle.record_entry(Pubkey::new_unique(), 4).unwrap_err();
        assert_eq!(err, RaffleError::InsufficientPayment);
        assert!(raffle.players.is_empty());
        assert_eq!(raffle.pool_lamports, 0);
    }

    #[test]
    fn entries_accumulate_in_order_and_allow_duplicates() {
        let mut raffle = open_raffle();
        let a = Pubkey::new_unique();
        let b = Pubkey::new_unique();
        raffle.record_entry(a, FEE).unwrap();
        raffle.record_entry(b, 2 * FEE).unwrap();
        raffle.record_entry(a, FEE).unwrap();
        assert_eq!(raffle.players, vec![a, b, a]);
        assert_eq!(raffle.pool_lamports, 4 * FEE);
    }

    #[test]
    fn entry_rejected_at_capacity() {
        let mut raffle = open_raffle();
        for _ in 0..MAX_PLAYERS {
            raffle.record_entry(Pubkey::new_unique(), FEE).unwrap();
        }
        let err = raffle.record_entry(Pubkey::new_unique(), FEE).unwrap_err();
        assert_eq!(err, RaffleError::RaffleFull);
        assert_eq!(raffle.players.len(), MAX_PLAYERS);
    }

    #[test]
    fn upkeep_is_false_before_interval_elapses() {
        let mut raffle = open_raffle();
        raffle.record_entry(Pubkey::new_unique(), FEE).unwrap();
        assert!(!raffle.upkeep_needed(1_000 + INTERVAL - 1));
        assert!(raffle.upkeep_needed(1_000 + INTERVAL));
    }

    #[test]
    fn upkeep_is_false_without_players_or_balance() {
        let raffle = open_raffle();
        let check = raffle.check_upkeep(1_000 + INTERVAL + 1);
        assert!(check.is_open);
        assert!(check.interval_elapsed);
        assert!(!check.has_players);
        assert!(!check.has_balance);
        assert!(!check.needed());
    }

    #[test]
    fn upkeep_is_false_while_calculating() {
        let mut raffle = open_raffle();
        raffle.record_entry(Pubkey::new_unique(), FEE).unwrap();
        raffle.begin_calculating(1_000 + INTERVAL).unwrap();
        assert!(!raffle.upkeep_needed(1_000 + 2 * INTERVAL));
    }

    #[test]
    fn begin_calculating_requires_the_predicate() {
        let mut raffle = open_raffle();
        let err = raffle.begin_calculating(1_000 + INTERVAL).unwrap_err();
        assert_eq!(err, RaffleError::UpkeepNotNeeded);
        assert_eq!(raffle.state, RaffleState::Open);
        assert_eq!(raffle.pending_request, None);
    }

    #[test]
    fn begin_calculating_records_the_pending_request() {
        let mut raffle = open_raffle();
        raffle.record_entry(Pubkey::new_unique(), FEE).unwrap();
        let request_id = raffle.begin_calculating(1_000 + INTERVAL).unwrap();
        assert_eq!(request_id, 1);
        assert_eq!(raffle.state, RaffleState::Calculating);
        assert_eq!(
            raffle.pending_request,
            Some(PendingRequest {
                request_id: 1,
                issued_at: 1_000 + INTERVAL,
            })
        );
    }

    #[test]
    fn entry_rejected_while_calculating() {
        let mut raffle = open_raffle();
        raffle.record_entry(Pubkey::new_unique(), FEE).unwrap();
        raffle.begin_calculating(1_000 + INTERVAL).unwrap();
        let err = raffle.record_entry(Pubkey::new_unique(), FEE).unwrap_err();
        assert_eq!(err, RaffleError::RaffleNotOpen);
        assert_eq!(raffle.players.len(), 1);
    }

    #[test]
    fn select_winner_rejects_unknown_or_missing_request() {
        let mut raffle = open_raffle();
        raffle.record_entry(Pubkey::new_unique(), FEE).unwrap();
        // Nothing pending yet.
        assert_eq!(
            raffle.select_winner(1, 7).unwrap_err(),
            RaffleError::RequestNotFound
        );
        let request_id = raffle.begin_calculating(1_000 + INTERVAL).unwrap();
        // Stale/foreign id.
        assert_eq!(
            raffle.select_winner(request_id + 1, 7).unwrap_err(),
            RaffleError::RequestNotFound
        );
    }

    #[test]
    fn full_round_picks_winner_pays_and_resets() {
        let mut raffle = open_raffle();
        let players: Vec<Pubkey> = (0..3).map(|_| Pubkey::new_unique()).collect();
        for player in &players {
            raffle.record_entry(*player, FEE).unwrap();
        }
        assert_eq!(raffle.pool_lamports, 3);
        assert_eq!(raffle.player_count(), 3);

        let now = 1_000 + INTERVAL;
        let request_id = raffle.begin_calculating(now).unwrap();

        // random word 7 over 3 players -> index 1
        let (index, winner, prize) = raffle.select_winner(request_id, 7).unwrap();
        assert_eq!(index, 1);
        assert_eq!(winner, players[1]);
        assert_eq!(prize, 3);

        raffle.settle(winner, now + 5);
        assert_eq!(raffle.state, RaffleState::Open);
        assert!(raffle.players.is_empty());
        assert_eq!(raffle.pool_lamports, 0);
        assert_eq!(raffle.recent_winner, Some(players[1]));
        assert_eq!(raffle.pending_request, None);
        assert_eq!(raffle.last_timestamp, now + 5);

        // The consumed request can never resolve twice.
        assert_eq!(
            raffle.select_winner(request_id, 7).unwrap_err(),
            RaffleError::RequestNotFound
        );
    }

    #[test]
    fn request_ids_increase_across_rounds() {
        let mut raffle = open_raffle();
        let mut now = 1_000;
        for expected_id in 1..=3u64 {
            raffle.record_entry(Pubkey::new_unique(), FEE).unwrap();
            now += INTERVAL;
            let request_id = raffle.begin_calculating(now).unwrap();
            assert_eq!(request_id, expected_id);
            let (_, winner, _) = raffle.select_winner(request_id, 42).unwrap();
            raffle.settle(winner, now);
        }
    }

    #[test]
    fn serialized_size_never_exceeds_len() {
        let mut raffle = open_raffle();
        for _ in 0..MAX_PLAYERS {
            raffle.record_entry(Pubkey::new_unique(), FEE).unwrap();
        }
        raffle.recent_winner = Some(Pubkey::new_unique());
        raffle.pending_request = Some(PendingRequest {
            request_id: 1,
            issued_at: 0,
        });
        let bytes = raffle.try_to_vec().unwrap();
        assert_eq!(bytes.len(), Raffle::LEN);
    }
}
