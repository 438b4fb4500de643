//! CryptoZombie Game Contract
//!
//! Mints, evolves, and pits against each other collectible zombie entities.
//! Each address mints exactly one starter zombie with a pseudo-random
//! genome; further zombies arise only by feeding on cats served by an
//! external kitty registry, or by winning attacks. Leveling is paid in a
//! SEP-41 token configured at init, and the admin can withdraw the
//! accumulated fees.
//!
//! ## Randomness Model
//! Genomes and attack rolls are derived as
//!
//!   `sha256(caller_xdr || extra || ledger_timestamp_be || nonce_be)`
//!
//! reduced into the target range, with a per-contract nonce incremented on
//! every draw. This is deterministic under a pinned ledger state and fully
//! predictable to validators; acceptable for a collectible game, not for
//! anything with adversarial stakes.
//!
//! ## Storage Strategy
//! - `instance()`: Admin, Token, KittyContract, LevelUpFee, Balance,
//!   NextZombieId, RandNonce. Fixed contract-level config and counters.
//! - `persistent()`: one `Zombie` record per id plus a per-owner id vector,
//!   each TTL-bumped on every write so active zombies never expire.
#![no_std]
#![allow(unexpected_cfgs)]

use soroban_sdk::{
    contract, contracterror, contractevent, contractimpl, contracttype, token::TokenClient,
    xdr::ToXdr, Address, Bytes, BytesN, Env, String, Vec,
};

use cryptozombies_shared::{mark_kitty_dna, mix_dna, KittyClient, DNA_MODULUS};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Persistent storage TTL in ledgers (~30 days at 5 s/ledger).
pub const PERSISTENT_BUMP_LEDGERS: u32 = 518_400;

/// Seconds a zombie rests after attacking or feeding.
pub const COOLDOWN_SECS: u64 = 86_400;

/// Minimum level to rename a zombie.
pub const NAME_CHANGE_LEVEL: u32 = 2;

/// Minimum level to rewrite a zombie's genome.
pub const DNA_CHANGE_LEVEL: u32 = 20;

/// Attack rolls land in [0, 100); the attacker wins on any roll at or
/// below this value.
pub const ATTACK_VICTORY_PROBABILITY: u64 = 70;

/// Default leveling fee: 0.001 of a 7-decimal token such as XLM.
pub const DEFAULT_LEVEL_UP_FEE: i128 = 10_000;

/// Name given to zombies produced by feeding or attack breeding.
pub const BRED_ZOMBIE_NAME: &str = "NoName";

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[contracterror]
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
#[repr(u32)]
pub enum Error {
    AlreadyInitialized = 1,
    NotInitialized = 2,
    Unauthorized = 3,
    /// The caller already owns a zombie; the starter mint is once per address.
    DuplicateZombie = 4,
    NotFound = 5,
    LevelTooLow = 6,
    InsufficientPayment = 7,
    /// The zombie's cooldown has not elapsed yet.
    NotReady = 8,
    NotOwner = 9,
    /// The kitty registry is unset, unreachable, or has no such kitty.
    OracleUnavailable = 10,
    Overflow = 11,
}

// ---------------------------------------------------------------------------
// Storage types
// ---------------------------------------------------------------------------

#[contracttype]
#[derive(Clone)]
pub enum DataKey {
    // --- instance() ---
    Admin,
    Token,
    KittyContract,
    LevelUpFee,
    /// Fees accrued from level-ups and not yet withdrawn.
    Balance,
    NextZombieId,
    /// Draw counter feeding the randomness preimage.
    RandNonce,
    // --- persistent() ---
    Zombie(u64),
    /// Zombie ids owned by an address, in creation order.
    OwnerZombies(Address),
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Zombie {
    pub id: u64,
    pub name: String,
    pub dna: u128,
    pub level: u32,
    /// Ledger timestamp before which the zombie cannot attack or feed.
    pub ready_time: u64,
    pub win_count: u32,
    pub loss_count: u32,
    pub owner: Address,
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

#[contractevent]
pub struct Initialized {
    pub admin: Address,
    pub token: Address,
    pub level_up_fee: i128,
}

/// Emitted by every path that mints a zombie: starter mint, kitty feed,
/// and attack breeding.
#[contractevent]
pub struct ZombieCreated {
    #[topic]
    pub zombie_id: u64,
    #[topic]
    pub owner: Address,
    pub name: String,
    pub dna: u128,
}

#[contractevent]
pub struct ZombieFed {
    #[topic]
    pub zombie_id: u64,
    #[topic]
    pub kitty_id: u64,
    pub child_id: u64,
}

#[contractevent]
pub struct LeveledUp {
    #[topic]
    pub zombie_id: u64,
    pub new_level: u32,
    pub paid: i128,
}

#[contractevent]
pub struct AttackResolved {
    #[topic]
    pub attacker_id: u64,
    #[topic]
    pub target_id: u64,
    pub attacker_won: bool,
}

#[contractevent]
pub struct LevelUpFeeSet {
    pub new_fee: i128,
}

#[contractevent]
pub struct KittyContractSet {
    pub kitty_contract: Address,
}

#[contractevent]
pub struct FeesWithdrawn {
    #[topic]
    pub to: Address,
    pub amount: i128,
}

#[contractevent]
pub struct AdminTransferred {
    pub old_admin: Address,
    pub new_admin: Address,
}

// ---------------------------------------------------------------------------
// Contract
// ---------------------------------------------------------------------------

#[contract]
pub struct CryptoZombie;

#[contractimpl]
impl CryptoZombie {
    // -----------------------------------------------------------------------
    // init / admin
    // -----------------------------------------------------------------------

    /// Initialize the game. May only be called once.
    ///
    /// `token` is the SEP-41 asset leveling fees are paid in. The kitty
    /// registry address starts unset; feeding fails with `OracleUnavailable`
    /// until the admin wires one via `set_kitty_contract_address`.
    pub fn init(env: Env, admin: Address, token: Address) -> Result<(), Error> {
        if env.storage().instance().has(&DataKey::Admin) {
            return Err(Error::AlreadyInitialized);
        }

        admin.require_auth();

        env.storage().instance().set(&DataKey::Admin, &admin);
        env.storage().instance().set(&DataKey::Token, &token);
        env.storage()
            .instance()
            .set(&DataKey::LevelUpFee, &DEFAULT_LEVEL_UP_FEE);
        env.storage().instance().set(&DataKey::Balance, &0i128);
        env.storage().instance().set(&DataKey::NextZombieId, &0u64);
        env.storage().instance().set(&DataKey::RandNonce, &0u64);

        Initialized {
            admin,
            token,
            level_up_fee: DEFAULT_LEVEL_UP_FEE,
        }
        .publish(&env);

        Ok(())
    }

    /// Replace the leveling fee. Admin only. Applies to later level-ups only.
    pub fn set_level_up_fee(env: Env, caller: Address, new_fee: i128) -> Result<(), Error> {
        require_admin(&env, &caller)?;

        env.storage().instance().set(&DataKey::LevelUpFee, &new_fee);

        LevelUpFeeSet { new_fee }.publish(&env);

        Ok(())
    }

    /// Point the game at a kitty registry. Admin only.
    pub fn set_kitty_contract_address(
        env: Env,
        caller: Address,
        kitty_contract: Address,
    ) -> Result<(), Error> {
        require_admin(&env, &caller)?;

        env.storage()
            .instance()
            .set(&DataKey::KittyContract, &kitty_contract);

        KittyContractSet { kitty_contract }.publish(&env);

        Ok(())
    }

    /// Send the entire accrued fee balance to `to`. Admin only.
    ///
    /// The balance is zeroed before the outbound transfer. A zero balance
    /// withdraws successfully and transfers nothing. Returns the amount moved.
    pub fn withdraw(env: Env, caller: Address, to: Address) -> Result<i128, Error> {
        require_admin(&env, &caller)?;

        let amount = get_balance(&env);
        env.storage().instance().set(&DataKey::Balance, &0i128);

        if amount > 0 {
            let token = get_token(&env);
            TokenClient::new(&env, &token).transfer(
                &env.current_contract_address(),
                &to,
                &amount,
            );
        }

        FeesWithdrawn { to, amount }.publish(&env);

        Ok(amount)
    }

    /// Hand the admin capability to `new_admin`. Admin only.
    pub fn transfer_admin(env: Env, caller: Address, new_admin: Address) -> Result<(), Error> {
        require_admin(&env, &caller)?;

        env.storage().instance().set(&DataKey::Admin, &new_admin);

        AdminTransferred {
            old_admin: caller,
            new_admin,
        }
        .publish(&env);

        Ok(())
    }

    // -----------------------------------------------------------------------
    // create_random_zombie
    // -----------------------------------------------------------------------

    /// Mint the caller's starter zombie with a pseudo-random genome.
    ///
    /// Once per address: any already-owned zombie, bred ones included,
    /// makes this fail with `DuplicateZombie`. The new zombie starts at
    /// level 1, ready immediately. Returns the new id.
    pub fn create_random_zombie(env: Env, caller: Address, name: String) -> Result<u64, Error> {
        require_initialized(&env)?;
        caller.require_auth();

        if !owner_zombies(&env, &caller).is_empty() {
            return Err(Error::DuplicateZombie);
        }

        let dna = rand_dna(&env, &caller, &name)?;
        create_zombie(&env, &caller, name, dna)
    }

    // -----------------------------------------------------------------------
    // views
    // -----------------------------------------------------------------------

    /// Full record for a zombie id.
    pub fn get_zombie(env: Env, zombie_id: u64) -> Result<Zombie, Error> {
        env.storage()
            .persistent()
            .get(&DataKey::Zombie(zombie_id))
            .ok_or(Error::NotFound)
    }

    /// Ids owned by `owner`, in creation order. Empty if none.
    pub fn get_zombies_by_owner(env: Env, owner: Address) -> Vec<u64> {
        owner_zombies(&env, &owner)
    }

    /// Number of zombies owned by `owner`.
    pub fn balance_of(env: Env, owner: Address) -> u32 {
        owner_zombies(&env, &owner).len()
    }

    /// Total zombies ever created; also the next id to be assigned.
    pub fn zombie_count(env: Env) -> u64 {
        env.storage()
            .instance()
            .get(&DataKey::NextZombieId)
            .unwrap_or(0)
    }

    /// Current leveling fee.
    pub fn level_up_fee(env: Env) -> Result<i128, Error> {
        env.storage()
            .instance()
            .get(&DataKey::LevelUpFee)
            .ok_or(Error::NotInitialized)
    }

    /// Fee balance accrued from level-ups and not yet withdrawn.
    pub fn accrued_fees(env: Env) -> Result<i128, Error> {
        require_initialized(&env)?;
        Ok(get_balance(&env))
    }

    // -----------------------------------------------------------------------
    // level_up / change_name / change_dna
    // -----------------------------------------------------------------------

    /// Pay the leveling fee to raise a zombie's level by one.
    ///
    /// Anyone may pay to level any zombie; there is no ownership gate here.
    /// `payment` must cover the fee in effect right now, and the full
    /// payment is kept, excess included.
    pub fn level_up(
        env: Env,
        caller: Address,
        zombie_id: u64,
        payment: i128,
    ) -> Result<(), Error> {
        require_initialized(&env)?;
        caller.require_auth();

        let fee = get_level_up_fee(&env);
        if payment < 0 || payment < fee {
            return Err(Error::InsufficientPayment);
        }

        let key = DataKey::Zombie(zombie_id);
        let mut zombie: Zombie = env
            .storage()
            .persistent()
            .get(&key)
            .ok_or(Error::NotFound)?;

        zombie.level = zombie.level.checked_add(1).ok_or(Error::Overflow)?;
        store_zombie(&env, &zombie);

        let balance = get_balance(&env)
            .checked_add(payment)
            .ok_or(Error::Overflow)?;
        env.storage().instance().set(&DataKey::Balance, &balance);

        // Collect after all writes have landed.
        let token = get_token(&env);
        TokenClient::new(&env, &token).transfer(
            &caller,
            &env.current_contract_address(),
            &payment,
        );

        LeveledUp {
            zombie_id,
            new_level: zombie.level,
            paid: payment,
        }
        .publish(&env);

        Ok(())
    }

    /// Rename a zombie. Requires level 2 and ownership.
    ///
    /// The level gate is checked before the ownership gate.
    pub fn change_name(
        env: Env,
        caller: Address,
        zombie_id: u64,
        new_name: String,
    ) -> Result<(), Error> {
        require_initialized(&env)?;
        caller.require_auth();

        let key = DataKey::Zombie(zombie_id);
        let mut zombie: Zombie = env
            .storage()
            .persistent()
            .get(&key)
            .ok_or(Error::NotFound)?;

        if zombie.level < NAME_CHANGE_LEVEL {
            return Err(Error::LevelTooLow);
        }
        if zombie.owner != caller {
            return Err(Error::NotOwner);
        }

        zombie.name = new_name;
        store_zombie(&env, &zombie);

        Ok(())
    }

    /// Rewrite a zombie's genome verbatim. Requires level 20 and ownership.
    pub fn change_dna(
        env: Env,
        caller: Address,
        zombie_id: u64,
        new_dna: u128,
    ) -> Result<(), Error> {
        require_initialized(&env)?;
        caller.require_auth();

        let key = DataKey::Zombie(zombie_id);
        let mut zombie: Zombie = env
            .storage()
            .persistent()
            .get(&key)
            .ok_or(Error::NotFound)?;

        if zombie.level < DNA_CHANGE_LEVEL {
            return Err(Error::LevelTooLow);
        }
        if zombie.owner != caller {
            return Err(Error::NotOwner);
        }

        zombie.dna = new_dna;
        store_zombie(&env, &zombie);

        Ok(())
    }

    // -----------------------------------------------------------------------
    // feed_on_kitty
    // -----------------------------------------------------------------------

    /// Feed a zombie on a cat from the configured registry, breeding a new
    /// zombie from the blended genome.
    ///
    /// The feeder must be owned by the caller and ready. The kitty query
    /// happens before any write, so an unavailable oracle leaves no state
    /// behind. The child belongs to the caller, carries the kitty marker in
    /// its genome, and is named "NoName"; the feeder's own genome is not
    /// modified. Feeding puts the feeder on cooldown. Returns the child id.
    pub fn feed_on_kitty(
        env: Env,
        caller: Address,
        zombie_id: u64,
        kitty_id: u64,
    ) -> Result<u64, Error> {
        require_initialized(&env)?;
        caller.require_auth();

        let key = DataKey::Zombie(zombie_id);
        let mut zombie: Zombie = env
            .storage()
            .persistent()
            .get(&key)
            .ok_or(Error::NotFound)?;

        if zombie.owner != caller {
            return Err(Error::NotOwner);
        }
        let now = env.ledger().timestamp();
        if now < zombie.ready_time {
            return Err(Error::NotReady);
        }

        let kitty_contract: Address = env
            .storage()
            .instance()
            .get(&DataKey::KittyContract)
            .ok_or(Error::OracleUnavailable)?;
        let kitty = match KittyClient::new(&env, &kitty_contract).try_get_kitty(&kitty_id) {
            Ok(Ok(k)) => k,
            _ => return Err(Error::OracleUnavailable),
        };

        let child_dna = mark_kitty_dna(mix_dna(zombie.dna, kitty.genes));

        zombie.ready_time = now.checked_add(COOLDOWN_SECS).ok_or(Error::Overflow)?;
        store_zombie(&env, &zombie);

        let child_id = create_zombie(
            &env,
            &caller,
            String::from_str(&env, BRED_ZOMBIE_NAME),
            child_dna,
        )?;

        ZombieFed {
            zombie_id,
            kitty_id,
            child_id,
        }
        .publish(&env);

        Ok(child_id)
    }

    // -----------------------------------------------------------------------
    // attack
    // -----------------------------------------------------------------------

    /// Send a zombie against another. Returns whether the attacker won.
    ///
    /// The attacker must be owned by the caller and ready; the target must
    /// exist. A roll in [0, 100) at or below `ATTACK_VICTORY_PROBABILITY`
    /// wins: the attacker's win count and the target's loss count rise, and
    /// the attacker breeds a fresh pseudo-random zombie. On a loss only the
    /// counters move, mirrored. Either way the attacker goes on cooldown;
    /// the target's readiness is never touched.
    pub fn attack(
        env: Env,
        caller: Address,
        attacker_id: u64,
        target_id: u64,
    ) -> Result<bool, Error> {
        require_initialized(&env)?;
        caller.require_auth();

        let attacker_key = DataKey::Zombie(attacker_id);
        let mut attacker: Zombie = env
            .storage()
            .persistent()
            .get(&attacker_key)
            .ok_or(Error::NotFound)?;

        if attacker.owner != caller {
            return Err(Error::NotOwner);
        }
        let now = env.ledger().timestamp();
        if now < attacker.ready_time {
            return Err(Error::NotReady);
        }
        // The target must exist before the roll is drawn.
        if !env
            .storage()
            .persistent()
            .has(&DataKey::Zombie(target_id))
        {
            return Err(Error::NotFound);
        }

        let roll = rand_mod(&env, &caller, 100)?;
        let attacker_won = roll <= ATTACK_VICTORY_PROBABILITY;

        if attacker_won {
            attacker.win_count = attacker.win_count.checked_add(1).ok_or(Error::Overflow)?;
        } else {
            attacker.loss_count = attacker.loss_count.checked_add(1).ok_or(Error::Overflow)?;
        }
        attacker.ready_time = now.checked_add(COOLDOWN_SECS).ok_or(Error::Overflow)?;
        store_zombie(&env, &attacker);

        // Re-load the target after the attacker write so a self-attack
        // lands both counter updates on the same record.
        let target_key = DataKey::Zombie(target_id);
        let mut target: Zombie = env
            .storage()
            .persistent()
            .get(&target_key)
            .ok_or(Error::NotFound)?;
        if attacker_won {
            target.loss_count = target.loss_count.checked_add(1).ok_or(Error::Overflow)?;
        } else {
            target.win_count = target.win_count.checked_add(1).ok_or(Error::Overflow)?;
        }
        store_zombie(&env, &target);

        if attacker_won {
            let name = String::from_str(&env, BRED_ZOMBIE_NAME);
            let dna = rand_dna(&env, &caller, &name)?;
            create_zombie(&env, &caller, name, dna)?;
        }

        AttackResolved {
            attacker_id,
            target_id,
            attacker_won,
        }
        .publish(&env);

        Ok(attacker_won)
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

fn get_token(env: &Env) -> Address {
    env.storage()
        .instance()
        .get(&DataKey::Token)
        .expect("CryptoZombie: token not set")
}

fn get_level_up_fee(env: &Env) -> i128 {
    env.storage()
        .instance()
        .get(&DataKey::LevelUpFee)
        .unwrap_or(DEFAULT_LEVEL_UP_FEE)
}

fn get_balance(env: &Env) -> i128 {
    env.storage()
        .instance()
        .get(&DataKey::Balance)
        .unwrap_or(0)
}

fn owner_zombies(env: &Env, owner: &Address) -> Vec<u64> {
    env.storage()
        .persistent()
        .get(&DataKey::OwnerZombies(owner.clone()))
        .unwrap_or(Vec::new(env))
}

fn store_zombie(env: &Env, zombie: &Zombie) {
    let key = DataKey::Zombie(zombie.id);
    env.storage().persistent().set(&key, zombie);
    env.storage()
        .persistent()
        .extend_ttl(&key, PERSISTENT_BUMP_LEDGERS, PERSISTENT_BUMP_LEDGERS);
}

/// Insert a new zombie for `owner`: assign the next dense id, store the
/// record (level 1, ready immediately, zero counters), append to the
/// owner's id vector, and emit the creation event.
fn create_zombie(env: &Env, owner: &Address, name: String, dna: u128) -> Result<u64, Error> {
    let id: u64 = env
        .storage()
        .instance()
        .get(&DataKey::NextZombieId)
        .ok_or(Error::NotInitialized)?;
    let next = id.checked_add(1).ok_or(Error::Overflow)?;
    env.storage().instance().set(&DataKey::NextZombieId, &next);

    let zombie = Zombie {
        id,
        name: name.clone(),
        dna,
        level: 1,
        ready_time: env.ledger().timestamp(),
        win_count: 0,
        loss_count: 0,
        owner: owner.clone(),
    };
    store_zombie(env, &zombie);

    let owned_key = DataKey::OwnerZombies(owner.clone());
    let mut owned = owner_zombies(env, owner);
    owned.push_back(id);
    env.storage().persistent().set(&owned_key, &owned);
    env.storage()
        .persistent()
        .extend_ttl(&owned_key, PERSISTENT_BUMP_LEDGERS, PERSISTENT_BUMP_LEDGERS);

    ZombieCreated {
        zombie_id: id,
        owner: owner.clone(),
        name,
        dna,
    }
    .publish(env);

    Ok(id)
}

/// Hand out the next draw index and advance the stored counter.
fn next_nonce(env: &Env) -> Result<u64, Error> {
    let nonce: u64 = env
        .storage()
        .instance()
        .get(&DataKey::RandNonce)
        .unwrap_or(0);
    let next = nonce.checked_add(1).ok_or(Error::Overflow)?;
    env.storage().instance().set(&DataKey::RandNonce, &next);
    Ok(nonce)
}

/// Derive a fresh pseudo-random genome for `caller`.
///
/// Preimage: caller XDR || name XDR || ledger timestamp BE || nonce BE.
fn rand_dna(env: &Env, caller: &Address, name: &String) -> Result<u128, Error> {
    let nonce = next_nonce(env)?;
    let mut material = caller.clone().to_xdr(env);
    material.append(&name.clone().to_xdr(env));
    material.append(&Bytes::from_slice(
        env,
        &env.ledger().timestamp().to_be_bytes(),
    ));
    material.append(&Bytes::from_slice(env, &nonce.to_be_bytes()));
    Ok(derive_bounded(env, &material, DNA_MODULUS))
}

/// Bounded pseudo-random draw in `[0, modulus)` for attack resolution.
///
/// Preimage: caller XDR || ledger timestamp BE || nonce BE.
fn rand_mod(env: &Env, caller: &Address, modulus: u64) -> Result<u64, Error> {
    let nonce = next_nonce(env)?;
    let mut material = caller.clone().to_xdr(env);
    material.append(&Bytes::from_slice(
        env,
        &env.ledger().timestamp().to_be_bytes(),
    ));
    material.append(&Bytes::from_slice(env, &nonce.to_be_bytes()));
    Ok(derive_bounded(env, &material, modulus as u128) as u64)
}

/// SHA-256 the material, interpret the first 16 bytes as a big-endian u128,
/// and reduce modulo `modulus`. Produces a value in `[0, modulus)`.
fn derive_bounded(env: &Env, material: &Bytes, modulus: u128) -> u128 {
    let digest: BytesN<32> = env.crypto().sha256(material).into();
    let arr = digest.to_array();
    let mut raw = [0u8; 16];
    raw.copy_from_slice(&arr[..16]);
    u128::from_be_bytes(raw) % modulus
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
