//! GemArcade Reward Token Contract
//!
//! Fungible token used for all play-to-earn payouts. Supply is capped at a
//! maximum fixed at initialization; new tokens enter circulation only through
//! `mint`, which is restricted to minter addresses appointed by the admin
//! (in practice the rewards contract, which mints prize-pool funding into its
//! own custody).
#![no_std]
#![allow(unexpected_cfgs)]

use soroban_sdk::{
    contract, contracterror, contractevent, contractimpl, contracttype, Address, Env,
};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Persistent storage TTL in ledgers (~30 days at 5 s/ledger).
pub const PERSISTENT_BUMP_LEDGERS: u32 = 518_400;

// ---------------------------------------------------------------------------
// Error Types
// ---------------------------------------------------------------------------

#[contracterror]
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
#[repr(u32)]
pub enum Error {
    AlreadyInitialized = 1,
    NotInitialized = 2,
    NotAuthorized = 3,
    InvalidAmount = 4,
    InsufficientBalance = 5,
    ExceedsMaxSupply = 6,
    Overflow = 7,
}

// ---------------------------------------------------------------------------
// Storage Types
// ---------------------------------------------------------------------------

/// Discriminants for all storage keys.
///
/// Instance keys (Admin, MaxSupply, Minter): contract config, one ledger
/// entry. Persistent keys (TotalSupply, Balance): accounting entries with
/// their own TTL, bumped on every write.
#[contracttype]
#[derive(Clone)]
pub enum DataKey {
    // --- instance() ---
    Admin,
    MaxSupply,
    Minter(Address),
    // --- persistent() ---
    TotalSupply,
    Balance(Address),
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

#[contractevent]
pub struct Minted {
    #[topic]
    pub to: Address,
    pub amount: i128,
}

#[contractevent]
pub struct Transferred {
    #[topic]
    pub from: Address,
    #[topic]
    pub to: Address,
    pub amount: i128,
}

#[contractevent]
pub struct MinterChanged {
    #[topic]
    pub minter: Address,
    pub allowed: bool,
}

// ---------------------------------------------------------------------------
// Contract
// ---------------------------------------------------------------------------

#[contract]
pub struct RewardToken;

#[contractimpl]
impl RewardToken {
    /// Initialize the token with an admin and an immutable supply cap.
    /// May only be called once.
    pub fn init(env: Env, admin: Address, max_supply: i128) -> Result<(), Error> {
        if env.storage().instance().has(&DataKey::Admin) {
            return Err(Error::AlreadyInitialized);
        }
        if max_supply <= 0 {
            return Err(Error::InvalidAmount);
        }

        admin.require_auth();

        env.storage().instance().set(&DataKey::Admin, &admin);
        env.storage().instance().set(&DataKey::MaxSupply, &max_supply);

        // Seed the counter so downstream reads never encounter None.
        set_persistent_i128(&env, DataKey::TotalSupply, 0);

        Ok(())
    }

    /// Appoint or revoke a minter. Admin only.
    pub fn set_minter(
        env: Env,
        admin: Address,
        minter: Address,
        allowed: bool,
    ) -> Result<(), Error> {
        require_admin(&env, &admin)?;

        env.storage()
            .instance()
            .set(&DataKey::Minter(minter.clone()), &allowed);
        MinterChanged { minter, allowed }.publish(&env);
        Ok(())
    }

    /// Mint `amount` new tokens to `to`. Only appointed minters may mint;
    /// the new total supply must not exceed the cap.
    pub fn mint(env: Env, minter: Address, to: Address, amount: i128) -> Result<(), Error> {
        require_initialized(&env)?;

        minter.require_auth();
        if !env
            .storage()
            .instance()
            .get(&DataKey::Minter(minter))
            .unwrap_or(false)
        {
            return Err(Error::NotAuthorized);
        }

        if amount <= 0 {
            return Err(Error::InvalidAmount);
        }

        let max_supply: i128 = env
            .storage()
            .instance()
            .get(&DataKey::MaxSupply)
            .ok_or(Error::NotInitialized)?;

        let new_supply = get_total_supply(&env)
            .checked_add(amount)
            .ok_or(Error::Overflow)?;
        if new_supply > max_supply {
            return Err(Error::ExceedsMaxSupply);
        }
        set_persistent_i128(&env, DataKey::TotalSupply, new_supply);

        let new_balance = get_balance(&env, &to)
            .checked_add(amount)
            .ok_or(Error::Overflow)?;
        set_persistent_i128(&env, DataKey::Balance(to.clone()), new_balance);

        Minted { to, amount }.publish(&env);

        Ok(())
    }

    /// Transfer `amount` tokens from `from` to `to`. `from` must authorize.
    pub fn transfer(env: Env, from: Address, to: Address, amount: i128) -> Result<(), Error> {
        require_initialized(&env)?;

        from.require_auth();

        if amount <= 0 {
            return Err(Error::InvalidAmount);
        }

        let from_balance = get_balance(&env, &from);
        if from_balance < amount {
            return Err(Error::InsufficientBalance);
        }

        let new_from = from_balance.checked_sub(amount).ok_or(Error::Overflow)?;
        let new_to = get_balance(&env, &to)
            .checked_add(amount)
            .ok_or(Error::Overflow)?;

        set_persistent_i128(&env, DataKey::Balance(from.clone()), new_from);
        set_persistent_i128(&env, DataKey::Balance(to.clone()), new_to);

        Transferred { from, to, amount }.publish(&env);

        Ok(())
    }

    /// Get an address's current balance.
    pub fn balance(env: Env, id: Address) -> i128 {
        get_balance(&env, &id)
    }

    /// Get the circulating supply.
    pub fn total_supply(env: Env) -> i128 {
        get_total_supply(&env)
    }

    /// Get the immutable supply cap.
    pub fn max_supply(env: Env) -> Result<i128, Error> {
        env.storage()
            .instance()
            .get(&DataKey::MaxSupply)
            .ok_or(Error::NotInitialized)
    }

    /// Whether `addr` is currently an appointed minter.
    pub fn is_minter(env: Env, addr: Address) -> bool {
        env.storage()
            .instance()
            .get(&DataKey::Minter(addr))
            .unwrap_or(false)
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
        return Err(Error::NotAuthorized);
    }
    Ok(())
}

fn get_balance(env: &Env, id: &Address) -> i128 {
    env.storage()
        .persistent()
        .get(&DataKey::Balance(id.clone()))
        .unwrap_or(0)
}

fn get_total_supply(env: &Env) -> i128 {
    env.storage()
        .persistent()
        .get(&DataKey::TotalSupply)
        .unwrap_or(0)
}

/// Write an i128 to persistent storage and extend its TTL in one step.
fn set_persistent_i128(env: &Env, key: DataKey, value: i128) {
    env.storage().persistent().set(&key, &value);
    env.storage()
        .persistent()
        .extend_ttl(&key, PERSISTENT_BUMP_LEDGERS, PERSISTENT_BUMP_LEDGERS);
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
