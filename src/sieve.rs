//! # Sieve — Small Prime Tables
//!
//! Prime tables for trial division. Factorization of `n − 1` during period
//! certification and Pratt proofs strips every prime below `TRIAL_LIMIT`
//! before falling back to Pollard methods, so the table is built once and
//! shared process-wide.

use std::sync::OnceLock;

/// Trial division bound used by the factorizer (2^20).
pub const TRIAL_LIMIT: u64 = 1 << 20;

static TRIAL_PRIMES: OnceLock<Vec<u64>> = OnceLock::new();

/// Primes up to [`TRIAL_LIMIT`], computed on first use.
pub fn trial_primes() -> &'static [u64] {
    TRIAL_PRIMES.get_or_init(|| generate_primes(TRIAL_LIMIT))
}

/// Generate all primes up to `limit` (inclusive) with an odd-only
/// sieve of Eratosthenes.
///
/// Index `i` of the bit table stands for the odd number `2i + 1`, halving
/// memory against the naive sieve.
pub fn generate_primes(limit: u64) -> Vec<u64> {
    if limit < 2 {
        return vec![];
    }
    let limit = limit as usize;
    let half = limit / 2 + 1;
    let mut composite = vec![false; half];
    composite[0] = true; // 1

    let mut i = 1;
    while (2 * i + 1) * (2 * i + 1) <= limit {
        if !composite[i] {
            let p = 2 * i + 1;
            let mut j = p * p / 2;
            while j < half {
                composite[j] = true;
                j += p;
            }
        }
        i += 1;
    }

    let mut primes = Vec::with_capacity(estimate_prime_count(limit));
    primes.push(2);
    primes.extend(
        composite
            .iter()
            .enumerate()
            .filter(|&(i, &c)| !c && 2 * i + 1 <= limit)
            .map(|(i, _)| (2 * i + 1) as u64),
    );
    primes
}

fn estimate_prime_count(n: usize) -> usize {
    if n < 10 {
        return 4;
    }
    let nf = n as f64;
    (1.3 * nf / nf.ln()) as usize
}
