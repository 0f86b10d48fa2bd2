//! Date-seeded xorshift generator used for "content of the day" sampling.
//!
//! The seed is a 32-bit string hash of the local calendar date, so every
//! learner sees the same lineup on a given day and a fresh one tomorrow.
//! None of this is cryptographic.

use crate::constants::{XORSHIFT_DEFAULT_SEED, XORSHIFT_SCALE};
use chrono::{Datelike, Local, NaiveDate};
use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::Sha256;

/// Hash `"{year}-{month}-{day}"` into a non-negative 32-bit seed.
///
/// Month is 1-based and neither month nor day is zero-padded.
#[must_use]
pub fn seed_from_date(date: NaiveDate) -> u32 {
    let key = format!("{}-{}-{}", date.year(), date.month(), date.day());
    string_hash(&key)
}

/// Seed for the current local calendar date.
#[must_use]
pub fn seed_from_today() -> u32 {
    seed_from_date(Local::now().date_naive())
}

fn string_hash(key: &str) -> u32 {
    let mut hash: i32 = 0;
    for unit in key.encode_utf16() {
        hash = (hash << 5).wrapping_sub(hash).wrapping_add(i32::from(unit));
    }
    hash.unsigned_abs()
}

/// Marsaglia xorshift32 (13/17/5).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XorShift32 {
    state: u32,
}

impl XorShift32 {
    /// Zero is a fixed point of xorshift, so it is replaced by a default seed.
    #[must_use]
    pub const fn new(seed: u32) -> Self {
        let state = if seed == 0 {
            XORSHIFT_DEFAULT_SEED
        } else {
            seed
        };
        Self { state }
    }

    #[must_use]
    pub const fn state(&self) -> u32 {
        self.state
    }

    fn step(&mut self) -> u32 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.state = x;
        x
    }

    /// Next float in `[0, 1)`.
    pub fn next_f64(&mut self) -> f64 {
        f64::from(self.step()) / XORSHIFT_SCALE
    }
}

impl RngCore for XorShift32 {
    fn next_u32(&mut self) -> u32 {
        self.step()
    }

    fn next_u64(&mut self) -> u64 {
        let high = u64::from(self.step());
        let low = u64::from(self.step());
        (high << 32) | low
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        for chunk in dest.chunks_mut(4) {
            let bytes = self.step().to_le_bytes();
            chunk.copy_from_slice(&bytes[..chunk.len()]);
        }
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}

/// Build the generator for a seed.
#[must_use]
pub const fn srandom(seed: u32) -> XorShift32 {
    XorShift32::new(seed)
}

/// Generator for a calendar date.
#[must_use]
pub fn srandom_for_date(date: NaiveDate) -> XorShift32 {
    srandom(seed_from_date(date))
}

/// Derive an independent 64-bit stream seed from a user seed and a domain tag.
#[must_use]
pub fn derive_stream_seed(user_seed: u64, domain_tag: &[u8]) -> u64 {
    let mut mac =
        Hmac::<Sha256>::new_from_slice(&user_seed.to_le_bytes()).expect("64-bit seed is valid key");
    mac.update(domain_tag);
    let digest = mac.finalize().into_bytes();
    let mut seed_bytes = [0_u8; 8];
    seed_bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(seed_bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn same_date_yields_same_sequence() {
        let mut a = srandom_for_date(date(2026, 10, 17));
        let mut b = srandom_for_date(date(2026, 10, 17));
        let left: Vec<f64> = (0..32).map(|_| a.next_f64()).collect();
        let right: Vec<f64> = (0..32).map(|_| b.next_f64()).collect();
        assert_eq!(left, right);
    }

    #[test]
    fn different_dates_diverge() {
        let mut a = srandom_for_date(date(2026, 10, 17));
        let mut b = srandom_for_date(date(2026, 10, 18));
        let left: Vec<u32> = (0..8).map(|_| a.next_u32()).collect();
        let right: Vec<u32> = (0..8).map(|_| b.next_u32()).collect();
        assert_ne!(left, right);
    }

    #[test]
    fn hash_matches_known_values() {
        let mut expected: i32 = 0;
        for byte in b"2026-10-17" {
            expected = expected
                .wrapping_mul(31)
                .wrapping_add(i32::from(*byte));
        }
        assert_eq!(seed_from_date(date(2026, 10, 17)), expected.unsigned_abs());
        assert_eq!(string_hash("a"), 97);
        assert_eq!(string_hash(""), 0);
    }

    #[test]
    fn date_key_is_not_zero_padded() {
        assert_eq!(seed_from_date(date(2026, 3, 5)), string_hash("2026-3-5"));
        assert_ne!(seed_from_date(date(2026, 3, 5)), string_hash("2026-03-05"));
    }

    #[test]
    fn zero_seed_is_coerced() {
        let generator = srandom(0);
        assert_eq!(generator.state(), XORSHIFT_DEFAULT_SEED);
        let mut generator = generator;
        assert_ne!(generator.next_u32(), 0);
    }

    #[test]
    fn floats_stay_in_unit_interval() {
        let mut generator = srandom(12_345);
        for _ in 0..10_000 {
            let value = generator.next_f64();
            assert!((0.0..1.0).contains(&value));
        }
    }

    #[test]
    fn xorshift_first_step_is_exact() {
        let mut generator = srandom(1);
        // 1 ^ (1 << 13) = 8193; 8193 >> 17 = 0; 8193 ^ (8193 << 5) = 270_369
        assert_eq!(generator.next_u32(), 270_369);
    }

    #[test]
    fn stream_seeds_are_domain_separated() {
        let display = derive_stream_seed(42, b"display");
        assert_eq!(display, derive_stream_seed(42, b"display"));
        assert_ne!(display, derive_stream_seed(42, b"lineup"));
        assert_ne!(display, derive_stream_seed(43, b"display"));
    }

    #[test]
    fn fill_bytes_handles_partial_chunks() {
        let mut generator = srandom(99);
        let mut buf = [0_u8; 7];
        generator.fill_bytes(&mut buf);
        assert!(buf.iter().any(|b| *b != 0));
    }
}
