//! Locally generated, time-ordered identifiers.
//!
//! Ids are 20 characters: 8 characters of millisecond timestamp followed by
//! 12 characters of randomness, both in a 64-symbol alphabet ordered by
//! ASCII so that string comparison matches generation order. Calls landing
//! in the same millisecond reuse the previous random suffix incremented as
//! a base-64 counter, so ids from one generator never sort backwards.

use std::time::{SystemTime, UNIX_EPOCH};

use rand::{rngs::OsRng, Rng, RngCore, SeedableRng};
use rand_xoshiro::Xoshiro256StarStar;

/// Modeled after base64 web-safe characters, but ordered by ASCII.
const PUSH_CHARS: &[u8; 64] = b"-0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ_abcdefghijklmnopqrstuvwxyz";

/// Total id length in characters.
pub const PUSH_ID_LEN: usize = 20;

const TIME_LEN: usize = 8;
const RAND_LEN: usize = 12;
const TOP_DIGIT: u8 = 63;

/// Generator holding the state needed to keep same-millisecond ids ordered.
///
/// Uses the xoshiro256** PRNG for reproducible sequences when seeded.
pub struct PushIdGenerator {
    rng: Xoshiro256StarStar,
    last_time_ms: u64,
    last_rand: [u8; RAND_LEN],
}

impl PushIdGenerator {
    /// Create a generator with an optional seed. Without a seed, one is
    /// drawn from `OsRng`.
    pub fn new(seed: Option<[u8; 32]>) -> Self {
        let seed = seed.unwrap_or_else(|| {
            let mut bytes = [0u8; 32];
            OsRng.fill_bytes(&mut bytes);
            bytes
        });
        Self {
            rng: Xoshiro256StarStar::from_seed(seed),
            last_time_ms: 0,
            last_rand: [0; RAND_LEN],
        }
    }

    /// Generate the next identifier using the current wall clock.
    pub fn next_id(&mut self) -> String {
        let now_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or_default();
        self.next_id_at(now_ms)
    }

    fn next_id_at(&mut self, now_ms: u64) -> String {
        let duplicate_time = now_ms == self.last_time_ms;
        self.last_time_ms = now_ms;

        let mut stamp = [0u8; TIME_LEN];
        let mut rest = now_ms;
        for slot in stamp.iter_mut().rev() {
            *slot = PUSH_CHARS[(rest % 64) as usize];
            rest /= 64;
        }
        debug_assert_eq!(rest, 0, "timestamp exceeds eight base-64 digits");

        if duplicate_time {
            increment_saturating(&mut self.last_rand);
        } else {
            for digit in &mut self.last_rand {
                *digit = self.rng.gen_range(0..64u8);
            }
        }

        let mut id = String::with_capacity(PUSH_ID_LEN);
        for &byte in &stamp {
            id.push(byte as char);
        }
        for &digit in &self.last_rand {
            id.push(PUSH_CHARS[digit as usize] as char);
        }
        id
    }
}

/// Base-64 counter increment with carry. When every digit already holds
/// the top symbol the suffix saturates instead of wrapping, so ordering is
/// preserved at the cost of one (astronomically unlikely) repeated id.
fn increment_saturating(digits: &mut [u8; RAND_LEN]) {
    for i in (0..RAND_LEN).rev() {
        if digits[i] < TOP_DIGIT {
            digits[i] += 1;
            for digit in &mut digits[i + 1..] {
                *digit = 0;
            }
            return;
        }
    }
}
