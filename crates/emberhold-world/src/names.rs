//! The character-name registry.
//!
//! A bloom filter over every character name ever created. It answers
//! "might this name be taken?" without touching storage: a negative is
//! definite, a positive may be a false alarm at roughly the configured
//! rate. Names are only ever added.

use std::hash::{DefaultHasher, Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};

/// Sizing floor, so a fresh server doesn't start with a filter that
/// saturates after a handful of players.
pub const MIN_EXPECTED_NAMES: usize = 1000;

/// Default false-positive rate.
pub const DEFAULT_FP_RATE: f64 = 0.01;

/// Lock-free, append-only set of lower-cased names.
#[derive(Debug)]
pub struct NameRegistry {
    words: Vec<AtomicU64>,
    bits: u64,
    hashes: u32,
}

impl NameRegistry {
    /// Sizes the filter for `expected` names at `fp_rate`.
    pub fn with_capacity(expected: usize, fp_rate: f64) -> Self {
        let n = expected.max(MIN_EXPECTED_NAMES) as f64;
        let p = if fp_rate > 0.0 && fp_rate < 1.0 {
            fp_rate
        } else {
            DEFAULT_FP_RATE
        };
        let ln2 = std::f64::consts::LN_2;
        let bits = (-(n * p.ln()) / (ln2 * ln2)).ceil().max(64.0) as u64;
        let hashes = ((bits as f64 / n) * ln2).round().max(1.0) as u32;
        let words = (0..bits.div_ceil(64)).map(|_| AtomicU64::new(0)).collect();
        Self {
            words,
            bits,
            hashes,
        }
    }

    /// Builds a registry holding every name in `names`.
    pub fn from_names<I, S>(names: I, fp_rate: f64) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let names: Vec<S> = names.into_iter().collect();
        let registry = Self::with_capacity(names.len() * 2, fp_rate);
        for name in &names {
            registry.add(name.as_ref());
        }
        registry
    }

    /// Records `name`. Idempotent.
    pub fn add(&self, name: &str) {
        for bit in self.positions(name) {
            self.words[(bit / 64) as usize].fetch_or(1 << (bit % 64), Ordering::Relaxed);
        }
    }

    /// `false` means the name was never added.
    pub fn test(&self, name: &str) -> bool {
        self.positions(name).all(|bit| {
            self.words[(bit / 64) as usize].load(Ordering::Relaxed) & (1 << (bit % 64)) != 0
        })
    }

    pub fn bit_len(&self) -> u64 {
        self.bits
    }

    pub fn hash_count(&self) -> u32 {
        self.hashes
    }

    // Double hashing: bit_i = h1 + i * h2.
    fn positions(&self, name: &str) -> impl Iterator<Item = u64> + '_ {
        let folded = name.trim().to_lowercase();
        let h1 = hash_with(0, &folded);
        let h2 = hash_with(1, &folded) | 1;
        (0..u64::from(self.hashes)).map(move |i| h1.wrapping_add(i.wrapping_mul(h2)) % self.bits)
    }
}

impl Default for NameRegistry {
    fn default() -> Self {
        Self::with_capacity(MIN_EXPECTED_NAMES, DEFAULT_FP_RATE)
    }
}

fn hash_with(seed: u8, name: &str) -> u64 {
    let mut h = DefaultHasher::new();
    seed.hash(&mut h);
    name.hash(&mut h);
    h.finish()
}
