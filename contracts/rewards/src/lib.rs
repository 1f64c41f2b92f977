//! GemArcade Rewards Contract
//!
//! Maintains a bounded, score-sorted leaderboard of players and pays out
//! tiered prize-pool rewards, at most once per player. Score submissions are
//! restricted to a single configured score authority (the game backend);
//! pool funding mints reward tokens into this contract's own custody.
//!
//! ## Storage Strategy
//! - `instance()`: Admin, Token, ScoreAuthority, MinScore, Locked. Small,
//!   fixed-size contract config; all instance keys share one ledger entry.
//! - `persistent()`: Board, per-player Rank and Claimed entries, Pool,
//!   Snapshot. Each is a separate ledger entry with its own TTL, bumped on
//!   every write.
//!
//! ## Invariants
//! - Board is sorted descending by score; ties keep earlier insertion order;
//!   length never exceeds `MAX_BOARD_SIZE`.
//! - For every entry at position `i`, `Rank(entry.player) == i`; players
//!   without an entry have no Rank key at all.
//! - Pool grows only through `fund_prize_pool` and shrinks only through
//!   successful claims. Payout percentages are computed against the epoch
//!   snapshot, never against the already-decremented live pool.
#![no_std]
#![allow(unexpected_cfgs)]

use soroban_sdk::{
    contract, contractclient, contracterror, contractevent, contractimpl, contracttype, Address,
    Env, Vec,
};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Maximum number of ranked entries kept on the board.
pub const MAX_BOARD_SIZE: u32 = 100;

/// Persistent storage TTL in ledgers (~30 days at 5 s/ledger).
/// Bumped on every write so active player data never expires mid-epoch.
pub const PERSISTENT_BUMP_LEDGERS: u32 = 518_400;

// Reward tier shares, in percent of the pool used for calculation.
const FIRST_PLACE_PCT: i128 = 40;
const SECOND_PLACE_PCT: i128 = 25;
const THIRD_PLACE_PCT: i128 = 15;
const TOP_TEN_POOL_PCT: i128 = 10;
const PARTICIPATION_POOL_PCT: i128 = 10;
const PCT_DIVISOR: i128 = 100;

// ---------------------------------------------------------------------------
// Token client
// ---------------------------------------------------------------------------

/// The reward-token surface this contract consumes: minting pool funding
/// into its own custody and transferring payouts to players.
#[contractclient(name = "TokenClient")]
pub trait RewardTokenInterface {
    fn mint(env: Env, minter: Address, to: Address, amount: i128);
    fn transfer(env: Env, from: Address, to: Address, amount: i128);
}

// ---------------------------------------------------------------------------
// Error Types
// ---------------------------------------------------------------------------

#[contracterror]
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
#[repr(u32)]
pub enum Error {
    AlreadyInitialized = 1,
    NotInitialized = 2,
    Unauthorized = 3,
    InvalidPlayer = 4,
    InvalidAddress = 5,
    ScoreTooLow = 6,
    ScoreNotImproved = 7,
    AlreadyClaimed = 8,
    NotRanked = 9,
    NoReward = 10,
    InsufficientPool = 11,
    InvalidAmount = 12,
    Overflow = 13,
    Reentrancy = 14,
}

// ---------------------------------------------------------------------------
// Storage Types
// ---------------------------------------------------------------------------

/// One ranked player.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RankedEntry {
    pub player: Address,
    pub score: u64,
    /// Ledger timestamp of the last accepted submission for this player.
    pub submitted_at: u64,
    /// True once this entry's reward has been paid out.
    pub claimed: bool,
}

/// Discriminants for all storage keys.
#[contracttype]
#[derive(Clone)]
pub enum DataKey {
    // --- instance() ---
    Admin,
    Token,
    ScoreAuthority,
    MinScore,
    /// Reentrancy guard; true while an external token call is in flight.
    Locked,
    // --- persistent() ---
    /// The full sorted board, one ledger entry.
    Board,
    /// Player's current 0-based board position. Absent when unranked.
    Rank(Address),
    /// Live prize pool balance.
    Pool,
    /// Pool value frozen at the first claim of the current epoch.
    /// Absent between epochs.
    Snapshot,
    /// Set once a player has claimed; never cleared.
    Claimed(Address),
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

#[contractevent]
pub struct ScoreSubmitted {
    #[topic]
    pub player: Address,
    pub score: u64,
    pub submitted_at: u64,
}

#[contractevent]
pub struct RewardsDistributed {
    #[topic]
    pub player: Address,
    pub amount: i128,
    pub rank: u32,
}

#[contractevent]
pub struct PoolFunded {
    pub amount: i128,
    pub total: i128,
}

#[contractevent]
pub struct AuthorityChanged {
    pub authority: Address,
}

#[contractevent]
pub struct MinScoreChanged {
    pub min_score: u64,
}

// ---------------------------------------------------------------------------
// Contract
// ---------------------------------------------------------------------------

#[contract]
pub struct RewardsEngine;

#[contractimpl]
impl RewardsEngine {
    // -----------------------------------------------------------------------
    // init
    // -----------------------------------------------------------------------

    /// Initialize the engine. May only be called once.
    ///
    /// `token` is the deployed reward-token contract (this contract must be
    /// appointed a minter on it before `fund_prize_pool` can succeed).
    /// `score_authority` is the only address permitted to submit scores.
    pub fn init(
        env: Env,
        admin: Address,
        token: Address,
        score_authority: Address,
        min_score: u64,
    ) -> Result<(), Error> {
        if env.storage().instance().has(&DataKey::Admin) {
            return Err(Error::AlreadyInitialized);
        }

        let own = env.current_contract_address();
        if token == own || score_authority == own {
            return Err(Error::InvalidAddress);
        }

        admin.require_auth();

        env.storage().instance().set(&DataKey::Admin, &admin);
        env.storage().instance().set(&DataKey::Token, &token);
        env.storage()
            .instance()
            .set(&DataKey::ScoreAuthority, &score_authority);
        env.storage().instance().set(&DataKey::MinScore, &min_score);

        // Seed the pool counter so downstream reads never encounter None.
        set_pool(&env, 0);

        Ok(())
    }

    // -----------------------------------------------------------------------
    // submit_score
    // -----------------------------------------------------------------------

    /// Record a score for `player`. Only the configured score authority may
    /// call this.
    ///
    /// A resubmission must strictly improve on the player's stored score;
    /// the old entry is removed and the new one inserted at its sorted
    /// position (ties keep earlier entries ahead). If the board then exceeds
    /// `MAX_BOARD_SIZE`, the last entry is evicted and its rank key cleared.
    /// No reward state is touched here.
    pub fn submit_score(
        env: Env,
        authority: Address,
        player: Address,
        score: u64,
    ) -> Result<(), Error> {
        require_initialized(&env)?;
        require_score_authority(&env, &authority)?;

        if player == env.current_contract_address() {
            return Err(Error::InvalidPlayer);
        }

        if score < get_min_score(&env) {
            return Err(Error::ScoreTooLow);
        }

        let mut board = get_board(&env);

        if let Some(pos) = get_rank_index(&env, &player) {
            let existing = board.get_unchecked(pos);
            if score <= existing.score {
                return Err(Error::ScoreNotImproved);
            }
            remove_entry(&env, &mut board, pos);
        }

        let submitted_at = env.ledger().timestamp();
        let entry = RankedEntry {
            player: player.clone(),
            score,
            submitted_at,
            // A player who already claimed keeps that mark across re-entry.
            claimed: has_claimed(&env, &player),
        };
        insert_entry(&env, &mut board, entry);

        if board.len() > MAX_BOARD_SIZE {
            if let Some(evicted) = board.pop_back() {
                clear_rank(&env, &evicted.player);
            }
        }

        set_board(&env, &board);

        ScoreSubmitted {
            player,
            score,
            submitted_at,
        }
        .publish(&env);

        Ok(())
    }

    // -----------------------------------------------------------------------
    // claim_rewards
    // -----------------------------------------------------------------------

    /// Pay out `player`'s tiered reward share. Each player may claim once,
    /// ever — the claimed mark survives eviction and re-entry.
    ///
    /// The first claim of an epoch freezes the pool value as the snapshot;
    /// all percentage math for that epoch uses the snapshot while the
    /// sufficiency check uses the live pool. All claimed/pool bookkeeping is
    /// written BEFORE the external token transfer, and the whole call runs
    /// under the reentrancy lock.
    pub fn claim_rewards(env: Env, player: Address) -> Result<(), Error> {
        require_initialized(&env)?;

        player.require_auth();
        if player == env.current_contract_address() {
            return Err(Error::InvalidPlayer);
        }

        if has_claimed(&env, &player) {
            return Err(Error::AlreadyClaimed);
        }

        let pos = get_rank_index(&env, &player).ok_or(Error::NotRanked)?;
        let mut board = get_board(&env);
        let mut entry = board.get_unchecked(pos);

        let min_score = get_min_score(&env);
        if entry.score < min_score {
            return Err(Error::ScoreTooLow);
        }

        take_lock(&env)?;

        let pool = get_pool(&env);

        // First claim since the pool was last empty or refilled: freeze the
        // basis for this epoch's percentage math.
        let pool_for_calculation = match get_snapshot(&env) {
            Some(snapshot) => snapshot,
            None => {
                set_snapshot(&env, pool);
                pool
            }
        };

        let rank = pos + 1;
        let eligible = count_eligible(&board, min_score);
        let amount = compute_reward(pool_for_calculation, rank, board.len(), eligible)?;

        if amount == 0 {
            return Err(Error::NoReward);
        }
        // The live pool can lag the snapshot after earlier payouts; never
        // pay out more than is actually left.
        if pool < amount {
            return Err(Error::InsufficientPool);
        }

        entry.claimed = true;
        board.set(pos, entry);
        set_board(&env, &board);
        set_claimed(&env, &player);
        set_pool(&env, pool.checked_sub(amount).ok_or(Error::Overflow)?);

        let token = get_token(&env)?;
        TokenClient::new(&env, &token).transfer(
            &env.current_contract_address(),
            &player,
            &amount,
        );

        release_lock(&env);

        RewardsDistributed {
            player,
            amount,
            rank,
        }
        .publish(&env);

        Ok(())
    }

    // -----------------------------------------------------------------------
    // fund_prize_pool
    // -----------------------------------------------------------------------

    /// Add `amount` to the prize pool, minting that many reward tokens into
    /// this contract's own custody. Admin only.
    ///
    /// If the refill brings the pool back up to the current epoch's snapshot,
    /// the snapshot is cleared and the next claim starts a new epoch. Pool
    /// state is written before the external mint; a mint rejected by the
    /// token (e.g. over its supply cap) fails the whole call.
    pub fn fund_prize_pool(env: Env, admin: Address, amount: i128) -> Result<(), Error> {
        require_initialized(&env)?;
        require_admin(&env, &admin)?;

        if amount <= 0 {
            return Err(Error::InvalidAmount);
        }

        take_lock(&env)?;

        let total = get_pool(&env).checked_add(amount).ok_or(Error::Overflow)?;
        set_pool(&env, total);

        if let Some(snapshot) = get_snapshot(&env) {
            if total >= snapshot {
                clear_snapshot(&env);
            }
        }

        let token = get_token(&env)?;
        let own = env.current_contract_address();
        TokenClient::new(&env, &token).mint(&own, &own, &amount);

        release_lock(&env);

        PoolFunded { amount, total }.publish(&env);

        Ok(())
    }

    // -----------------------------------------------------------------------
    // admin setters
    // -----------------------------------------------------------------------

    /// Replace the score authority. Takes effect for subsequent submissions
    /// only; existing entries are not reevaluated.
    pub fn set_score_authority(
        env: Env,
        admin: Address,
        authority: Address,
    ) -> Result<(), Error> {
        require_initialized(&env)?;
        require_admin(&env, &admin)?;

        if authority == env.current_contract_address() {
            return Err(Error::InvalidAddress);
        }

        env.storage()
            .instance()
            .set(&DataKey::ScoreAuthority, &authority);
        AuthorityChanged { authority }.publish(&env);
        Ok(())
    }

    /// Set the minimum score required to enter the board and to be
    /// reward-eligible. Takes effect for subsequent calls only.
    pub fn set_min_score(env: Env, admin: Address, min_score: u64) -> Result<(), Error> {
        require_initialized(&env)?;
        require_admin(&env, &admin)?;

        env.storage().instance().set(&DataKey::MinScore, &min_score);
        MinScoreChanged { min_score }.publish(&env);
        Ok(())
    }

    // -----------------------------------------------------------------------
    // read-only queries
    // -----------------------------------------------------------------------

    /// Full board snapshot, best score first.
    pub fn get_leaderboard(env: Env) -> Vec<RankedEntry> {
        get_board(&env)
    }

    /// Entry at a 1-based rank.
    pub fn get_entry(env: Env, rank: u32) -> Result<RankedEntry, Error> {
        let board = get_board(&env);
        if rank == 0 || rank > board.len() {
            return Err(Error::NotRanked);
        }
        Ok(board.get_unchecked(rank - 1))
    }

    /// Number of ranked entries.
    pub fn board_length(env: Env) -> u32 {
        get_board(&env).len()
    }

    /// A player's 1-based rank, or 0 if not on the board.
    pub fn player_rank(env: Env, player: Address) -> u32 {
        match get_rank_index(&env, &player) {
            Some(pos) => pos + 1,
            None => 0,
        }
    }

    /// The amount `player` would receive from a claim right now, without
    /// mutating anything. Returns 0 for already-claimed, unranked, or
    /// sub-threshold players.
    pub fn preview_reward(env: Env, player: Address) -> i128 {
        if has_claimed(&env, &player) {
            return 0;
        }
        let pos = match get_rank_index(&env, &player) {
            Some(pos) => pos,
            None => return 0,
        };
        let board = get_board(&env);
        let min_score = get_min_score(&env);
        if board.get_unchecked(pos).score < min_score {
            return 0;
        }

        let pool = get_pool(&env);
        let pool_for_calculation = get_snapshot(&env).unwrap_or(pool);
        let eligible = count_eligible(&board, min_score);
        compute_reward(pool_for_calculation, pos + 1, board.len(), eligible).unwrap_or(0)
    }

    /// Live prize pool balance.
    pub fn pool_balance(env: Env) -> i128 {
        get_pool(&env)
    }

    /// The current epoch's frozen pool basis, or 0 when no epoch is open.
    pub fn pool_snapshot(env: Env) -> i128 {
        get_snapshot(&env).unwrap_or(0)
    }

    /// Current minimum qualifying score.
    pub fn min_score(env: Env) -> u64 {
        get_min_score(&env)
    }

    /// The address currently allowed to submit scores.
    pub fn score_authority(env: Env) -> Result<Address, Error> {
        env.storage()
            .instance()
            .get(&DataKey::ScoreAuthority)
            .ok_or(Error::NotInitialized)
    }
}

// ---------------------------------------------------------------------------
// Reward calculation
// ---------------------------------------------------------------------------

/// Tiered share of `pool` for a 1-based `rank`.
///
/// Ranks 1-3 take fixed percentages. Ranks 4-10 split a 10% tranche over
/// however many of those seven positions are filled. Every lower rank splits
/// the participation tranche over the count of ALL entries at or above the
/// minimum score — including the top-ten players already paid under their
/// own tiers. That denominator is the platform's published reward rule, kept
/// as-is. Integer division truncates; leftover dust stays in the pool.
fn compute_reward(pool: i128, rank: u32, board_len: u32, eligible: u32) -> Result<i128, Error> {
    if pool == 0 {
        return Ok(0);
    }

    let pct = |share: i128| -> Result<i128, Error> {
        pool.checked_mul(share)
            .and_then(|v| v.checked_div(PCT_DIVISOR))
            .ok_or(Error::Overflow)
    };

    match rank {
        1 => pct(FIRST_PLACE_PCT),
        2 => pct(SECOND_PLACE_PCT),
        3 => pct(THIRD_PLACE_PCT),
        4..=10 => {
            let capped = if board_len < 10 { board_len } else { 10 };
            let filled = capped.saturating_sub(3);
            if filled == 0 {
                return Ok(0);
            }
            pct(TOP_TEN_POOL_PCT)?
                .checked_div(filled as i128)
                .ok_or(Error::Overflow)
        }
        _ => {
            if eligible == 0 {
                return Ok(0);
            }
            pct(PARTICIPATION_POOL_PCT)?
                .checked_div(eligible as i128)
                .ok_or(Error::Overflow)
        }
    }
}

/// Number of board entries at or above the current minimum score.
fn count_eligible(board: &Vec<RankedEntry>, min_score: u64) -> u32 {
    let mut count = 0;
    for entry in board.iter() {
        if entry.score >= min_score {
            count += 1;
        }
    }
    count
}

// ---------------------------------------------------------------------------
// Board maintenance
// ---------------------------------------------------------------------------

/// Remove the entry at `pos`, shifting later entries left and rewriting
/// their rank keys. Clears the removed player's rank key.
fn remove_entry(env: &Env, board: &mut Vec<RankedEntry>, pos: u32) {
    let removed = board.get_unchecked(pos);
    board.remove(pos);
    clear_rank(env, &removed.player);
    for i in pos..board.len() {
        set_rank(env, &board.get_unchecked(i).player, i);
    }
}

/// Insert `entry` at the first position whose score is strictly lower,
/// appending if none is. Earlier equal-or-higher scores stay ahead, so ties
/// keep insertion order. Rewrites rank keys from the insertion point down.
fn insert_entry(env: &Env, board: &mut Vec<RankedEntry>, entry: RankedEntry) {
    let score = entry.score;
    let mut pos = board.len();
    for i in 0..board.len() {
        if board.get_unchecked(i).score < score {
            pos = i;
            break;
        }
    }

    if pos == board.len() {
        board.push_back(entry);
    } else {
        board.insert(pos, entry);
    }

    for i in pos..board.len() {
        set_rank(env, &board.get_unchecked(i).player, i);
    }
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

fn require_initialized(env: &Env) -> Result<(), Error> {
    if !env.storage().instance().has(&DataKey::Admin) {
        return Err(Error::NotInitialized);
    }
    Ok(())
}

/// Verify that `caller` is the stored admin and has signed the invocation.
fn require_admin(env: &Env, caller: &Address) -> Result<(), Error> {
    let admin: Address = env
        .storage()
        .instance()
        .get(&DataKey::Admin)
        .ok_or(Error::NotInitialized)?;
    caller.require_auth();
    if caller != &admin {
        return Err(Error::Unauthorized);
    }
    Ok(())
}

/// Verify that `caller` is the configured score authority and has signed.
fn require_score_authority(env: &Env, caller: &Address) -> Result<(), Error> {
    let authority: Address = env
        .storage()
        .instance()
        .get(&DataKey::ScoreAuthority)
        .ok_or(Error::NotInitialized)?;
    caller.require_auth();
    if caller != &authority {
        return Err(Error::Unauthorized);
    }
    Ok(())
}

/// Acquire the reentrancy lock; a nested call during an external token
/// invocation sees the lock held and is rejected.
fn take_lock(env: &Env) -> Result<(), Error> {
    if env
        .storage()
        .instance()
        .get(&DataKey::Locked)
        .unwrap_or(false)
    {
        return Err(Error::Reentrancy);
    }
    env.storage().instance().set(&DataKey::Locked, &true);
    Ok(())
}

fn release_lock(env: &Env) {
    env.storage().instance().set(&DataKey::Locked, &false);
}

fn get_token(env: &Env) -> Result<Address, Error> {
    env.storage()
        .instance()
        .get(&DataKey::Token)
        .ok_or(Error::NotInitialized)
}

fn get_min_score(env: &Env) -> u64 {
    env.storage()
        .instance()
        .get(&DataKey::MinScore)
        .unwrap_or(0)
}

fn get_board(env: &Env) -> Vec<RankedEntry> {
    env.storage()
        .persistent()
        .get(&DataKey::Board)
        .unwrap_or(Vec::new(env))
}

fn set_board(env: &Env, board: &Vec<RankedEntry>) {
    env.storage().persistent().set(&DataKey::Board, board);
    env.storage().persistent().extend_ttl(
        &DataKey::Board,
        PERSISTENT_BUMP_LEDGERS,
        PERSISTENT_BUMP_LEDGERS,
    );
}

fn get_rank_index(env: &Env, player: &Address) -> Option<u32> {
    env.storage().persistent().get(&DataKey::Rank(player.clone()))
}

fn set_rank(env: &Env, player: &Address, pos: u32) {
    let key = DataKey::Rank(player.clone());
    env.storage().persistent().set(&key, &pos);
    env.storage()
        .persistent()
        .extend_ttl(&key, PERSISTENT_BUMP_LEDGERS, PERSISTENT_BUMP_LEDGERS);
}

fn clear_rank(env: &Env, player: &Address) {
    env.storage()
        .persistent()
        .remove(&DataKey::Rank(player.clone()));
}

fn get_pool(env: &Env) -> i128 {
    env.storage().persistent().get(&DataKey::Pool).unwrap_or(0)
}

fn set_pool(env: &Env, value: i128) {
    env.storage().persistent().set(&DataKey::Pool, &value);
    env.storage().persistent().extend_ttl(
        &DataKey::Pool,
        PERSISTENT_BUMP_LEDGERS,
        PERSISTENT_BUMP_LEDGERS,
    );
}

fn get_snapshot(env: &Env) -> Option<i128> {
    env.storage().persistent().get(&DataKey::Snapshot)
}

fn set_snapshot(env: &Env, value: i128) {
    env.storage().persistent().set(&DataKey::Snapshot, &value);
    env.storage().persistent().extend_ttl(
        &DataKey::Snapshot,
        PERSISTENT_BUMP_LEDGERS,
        PERSISTENT_BUMP_LEDGERS,
    );
}

fn clear_snapshot(env: &Env) {
    env.storage().persistent().remove(&DataKey::Snapshot);
}

fn has_claimed(env: &Env, player: &Address) -> bool {
    env.storage()
        .persistent()
        .get(&DataKey::Claimed(player.clone()))
        .unwrap_or(false)
}

fn set_claimed(env: &Env, player: &Address) {
    let key = DataKey::Claimed(player.clone());
    env.storage().persistent().set(&key, &true);
    env.storage()
        .persistent()
        .extend_ttl(&key, PERSISTENT_BUMP_LEDGERS, PERSISTENT_BUMP_LEDGERS);
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
