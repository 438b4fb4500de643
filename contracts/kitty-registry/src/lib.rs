//! CryptoZombie Kitty Registry Contract
//!
//! A small on-chain cat registry serving as the genetic oracle for the
//! zombie game. Anyone mints their own cats; the zombie game only ever
//! reads, through `get_kitty`.
//!
//! Kitty ids are dense and start at 1, so id 0 never resolves and works as
//! a natural "no such cat" probe.
//!
//! ## Storage Strategy
//! - `instance()`: Admin, NextKittyId. Fixed contract-level config.
//! - `persistent()`: one `Kitty` record per id, TTL bumped on every write.
#![no_std]
#![allow(unexpected_cfgs)]

use soroban_sdk::{
    contract, contracterror, contractevent, contractimpl, contracttype, Address, Env,
};

use cryptozombies_shared::Kitty;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Persistent storage TTL in ledgers (~30 days at 5 s/ledger).
pub const PERSISTENT_BUMP_LEDGERS: u32 = 518_400;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[contracterror]
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
#[repr(u32)]
pub enum Error {
    AlreadyInitialized = 1,
    NotInitialized = 2,
    KittyNotFound = 3,
    Overflow = 4,
}

// ---------------------------------------------------------------------------
// Storage types
// ---------------------------------------------------------------------------

#[contracttype]
#[derive(Clone)]
pub enum DataKey {
    // --- instance() ---
    Admin,
    NextKittyId,
    // --- persistent() ---
    Kitty(u64),
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

#[contractevent]
pub struct Initialized {
    pub admin: Address,
}

#[contractevent]
pub struct Birth {
    #[topic]
    pub kitty_id: u64,
    #[topic]
    pub owner: Address,
    pub genes: u128,
}

// ---------------------------------------------------------------------------
// Contract
// ---------------------------------------------------------------------------

#[contract]
pub struct KittyRegistry;

#[contractimpl]
impl KittyRegistry {
    /// Initialize the registry. May only be called once.
    pub fn init(env: Env, admin: Address) -> Result<(), Error> {
        if env.storage().instance().has(&DataKey::Admin) {
            return Err(Error::AlreadyInitialized);
        }

        admin.require_auth();

        env.storage().instance().set(&DataKey::Admin, &admin);
        env.storage().instance().set(&DataKey::NextKittyId, &1u64);

        Initialized { admin }.publish(&env);

        Ok(())
    }

    /// Mint a generation-zero cat with the given genes for `owner`.
    ///
    /// Genes are stored verbatim; consumers that need a bounded genome
    /// clamp on their side. Returns the new kitty id.
    pub fn create_kitty(env: Env, owner: Address, genes: u128) -> Result<u64, Error> {
        require_initialized(&env)?;
        owner.require_auth();

        let id: u64 = env
            .storage()
            .instance()
            .get(&DataKey::NextKittyId)
            .ok_or(Error::NotInitialized)?;
        let next = id.checked_add(1).ok_or(Error::Overflow)?;
        env.storage().instance().set(&DataKey::NextKittyId, &next);

        let kitty = Kitty {
            is_gestating: false,
            is_ready: true,
            cooldown_index: 0,
            next_action_at: 0,
            siring_with_id: 0,
            birth_time: env.ledger().timestamp(),
            matron_id: 0,
            sire_id: 0,
            generation: 0,
            genes,
        };

        let key = DataKey::Kitty(id);
        env.storage().persistent().set(&key, &kitty);
        env.storage()
            .persistent()
            .extend_ttl(&key, PERSISTENT_BUMP_LEDGERS, PERSISTENT_BUMP_LEDGERS);

        Birth {
            kitty_id: id,
            owner,
            genes,
        }
        .publish(&env);

        Ok(id)
    }

    /// Return the full record for a kitty id.
    pub fn get_kitty(env: Env, kitty_id: u64) -> Result<Kitty, Error> {
        env.storage()
            .persistent()
            .get(&DataKey::Kitty(kitty_id))
            .ok_or(Error::KittyNotFound)
    }

    /// Total cats minted so far.
    pub fn kitty_count(env: Env) -> u64 {
        let next: u64 = env
            .storage()
            .instance()
            .get(&DataKey::NextKittyId)
            .unwrap_or(1);
        next - 1
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

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
