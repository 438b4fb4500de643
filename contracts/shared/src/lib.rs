//! Shared types and genome arithmetic for the CryptoZombie contracts.
//!
//! Holds everything both the zombie game and the kitty registry need to
//! agree on: the `Kitty` record shape, the registry's client interface, and
//! the pure genome math (truncation, blending, kitty marking). Genomes are
//! 16 decimal digits wide; every function here confines its output to that
//! space so callers never have to re-clamp.
#![no_std]
#![allow(unexpected_cfgs)]

use soroban_sdk::{contractclient, contracttype, Env};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Width of the genome space in decimal digits.
pub const DNA_DIGITS: u32 = 16;

/// Exclusive upper bound of the genome space: 10^16.
pub const DNA_MODULUS: u128 = 10u128.pow(DNA_DIGITS);

/// Value stamped into the low two digits of every kitty-derived genome.
pub const KITTY_GENE_MARKER: u128 = 99;

// ---------------------------------------------------------------------------
// Kitty interface
// ---------------------------------------------------------------------------

/// A cat record as served by the kitty registry.
///
/// The zombie game consumes only `genes`; the remaining fields mirror the
/// registry's own breeding bookkeeping and ride along untouched.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Kitty {
    pub is_gestating: bool,
    pub is_ready: bool,
    pub cooldown_index: u32,
    pub next_action_at: u64,
    pub siring_with_id: u64,
    pub birth_time: u64,
    pub matron_id: u64,
    pub sire_id: u64,
    pub generation: u32,
    pub genes: u128,
}

/// Read interface of the kitty registry contract.
///
/// The zombie game holds only the registry's address and calls through the
/// generated `KittyClient`; any registry implementing this entry point can
/// serve as the oracle.
#[contractclient(name = "KittyClient")]
pub trait KittyInterface {
    fn get_kitty(env: Env, kitty_id: u64) -> Kitty;
}

// ---------------------------------------------------------------------------
// Genome arithmetic
// ---------------------------------------------------------------------------

/// Confine a raw genome to the 16-digit space.
pub fn truncate_dna(dna: u128) -> u128 {
    dna % DNA_MODULUS
}

/// Blend two genomes: the arithmetic mean of both, each first confined to
/// the genome space. The result is always inside the space as well.
pub fn mix_dna(dna1: u128, dna2: u128) -> u128 {
    (truncate_dna(dna1) + truncate_dna(dna2)) / 2
}

/// Stamp the low two digits of a genome with the kitty marker, so zombies
/// bred from cats stay recognizable forever.
pub fn mark_kitty_dna(dna: u128) -> u128 {
    let d = truncate_dna(dna);
    d - d % 100 + KITTY_GENE_MARKER
}

/// True when the low two digits carry the kitty marker.
pub fn is_kitty_derived(dna: u128) -> bool {
    dna % 100 == KITTY_GENE_MARKER
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_truncate_confines_to_sixteen_digits() {
        assert_eq!(truncate_dna(0), 0);
        assert_eq!(truncate_dna(DNA_MODULUS - 1), DNA_MODULUS - 1);
        assert_eq!(truncate_dna(DNA_MODULUS), 0);
        assert_eq!(truncate_dna(DNA_MODULUS + 42), 42);
        assert_eq!(truncate_dna(3 * DNA_MODULUS + 7), 7);
    }

    #[test]
    fn test_mix_is_the_mean_of_both_genomes() {
        assert_eq!(mix_dna(8, 6), 7);
        assert_eq!(
            mix_dna(8_229_335_091_878_300, 1_525_635_091_878_300),
            4_877_485_091_878_300
        );
        // Odd sums round down.
        assert_eq!(mix_dna(3, 2), 2);
    }

    #[test]
    fn test_mix_truncates_oversized_inputs() {
        // An out-of-space genome contributes only its low 16 digits.
        assert_eq!(mix_dna(DNA_MODULUS + 10, 20), 15);
        assert_eq!(
            mix_dna(u128::MAX, u128::MAX),
            mix_dna(u128::MAX % DNA_MODULUS, u128::MAX % DNA_MODULUS)
        );
        assert!(mix_dna(u128::MAX, u128::MAX) < DNA_MODULUS);
    }

    #[test]
    fn test_mark_replaces_low_two_digits() {
        assert_eq!(mark_kitty_dna(4_877_485_091_878_300), 4_877_485_091_878_399);
        assert_eq!(mark_kitty_dna(1_234_567_890_123_456), 1_234_567_890_123_499);
        // Already-marked genomes are unchanged.
        assert_eq!(mark_kitty_dna(1_234_567_890_123_499), 1_234_567_890_123_499);
        assert_eq!(mark_kitty_dna(0), 99);
    }

    #[test]
    fn test_mark_result_stays_in_genome_space() {
        assert!(mark_kitty_dna(DNA_MODULUS - 1) < DNA_MODULUS);
        assert!(mark_kitty_dna(u128::MAX) < DNA_MODULUS);
    }

    #[test]
    fn test_is_kitty_derived() {
        assert!(is_kitty_derived(99));
        assert!(is_kitty_derived(1_234_567_890_123_499));
        assert!(!is_kitty_derived(1_234_567_890_123_400));
        assert!(!is_kitty_derived(0));
        assert!(is_kitty_derived(mark_kitty_dna(8_229_335_091_878_300)));
    }
}
