//! Pollard's P-1 factoring, stages 1 and 2.
//!
//! Finds a factor `p` of N when p-1 is B1-smooth apart from at most one
//! prime in (B1, B2]. The order computations in this crate factor numbers of
//! the shape `k·2^w ± c`, whose prime factors often have smooth predecessors,
//! so the factorizer tries one P-1 pass on a composite cofactor before
//! starting Pollard rho.
//!
//! Stage 1 takes the gcd after every prime power. When several factors of N
//! have smooth predecessors, their orders complete at different primes, and
//! the per-prime gcd catches the first one alone instead of collapsing to N.

use rug::Integer;

use crate::sieve;

/// Default smoothness bound for stage 1.
pub const DEFAULT_B1: u64 = 20_000;
/// Default bound for stage 2, `100 · B1`.
pub const DEFAULT_B2: u64 = 2_000_000;

/// Largest prime gap whose power is precomputed in stage 2.
const MAX_GAP: u64 = 150;
/// Primes accumulated into one product between stage-2 gcds.
const BATCH: usize = 200;

enum Stage1 {
    Split(Integer),
    Base(Integer),
}

/// Run Pollard's P-1 Stage 1 on `n` with smoothness bound `b1`.
///
/// Returns `Some(factor)` for a non-trivial factor, `None` otherwise.
pub fn p1_stage1(n: &Integer, b1: u64) -> Option<Integer> {
    match stage1(n, b1)? {
        Stage1::Split(g) => Some(g),
        Stage1::Base(_) => None,
    }
}

/// Stage 1 up to `b1`, then the standard continuation up to `b2`.
pub fn p1_factor(n: &Integer, b1: u64, b2: u64) -> Option<Integer> {
    match stage1(n, b1)? {
        Stage1::Split(g) => Some(g),
        Stage1::Base(a) => p1_stage2(n, &a, b1, b2),
    }
}

/// `a = 2^(∏ q^e) mod n` over prime powers `q^e ≤ b1`, with a gcd per prime.
///
/// `None` when the gcd jumps straight from 1 to `n`, even stepping the
/// offending prime one power at a time.
fn stage1(n: &Integer, b1: u64) -> Option<Stage1> {
    if b1 < 2 || *n <= 3u32 || n.is_even() {
        return None;
    }

    let mut a = Integer::from(2u32);
    for q in sieve::generate_primes(b1) {
        // largest power q^e <= b1
        let mut pk = q;
        while pk <= b1 / q {
            pk *= q;
        }
        let before = a.clone();
        a = a.pow_mod(&Integer::from(pk), n).ok()?;
        let g = Integer::from(&a - 1u32).gcd(n);
        if g == 1u32 {
            continue;
        }
        if &g < n {
            return Some(Stage1::Split(g));
        }
        return step_prime(n, before, q).map(Stage1::Split);
    }
    Some(Stage1::Base(a))
}

/// Raise `a` to `q` repeatedly until the gcd leaves 1.
fn step_prime(n: &Integer, mut a: Integer, q: u64) -> Option<Integer> {
    let q = Integer::from(q);
    loop {
        a = a.pow_mod(&q, n).ok()?;
        let g = Integer::from(&a - 1u32).gcd(n);
        if g == 1u32 {
            continue;
        }
        return if &g < n { Some(g) } else { None };
    }
}

/// Run Pollard's P-1 Stage 2 on `n` over the primes in `(b1, b2]`.
///
/// `a` is the stage-1 base. Consecutive primes are reached by multiplying
/// with a precomputed `a^gap`, and `a^q − 1` is accumulated into a product
/// that is reduced by one gcd per batch. A batch whose gcd is `n` is replayed
/// prime by prime.
pub fn p1_stage2(n: &Integer, a: &Integer, b1: u64, b2: u64) -> Option<Integer> {
    if b2 <= b1 {
        return None;
    }
    let primes = sieve::generate_primes(b2);
    let start = primes.partition_point(|&p| p <= b1);
    if start >= primes.len() {
        return None;
    }

    // gap_powers[k] = a^(2k + 2)
    let a_sq = Integer::from(a.square_ref()) % n;
    let mut gap_powers: Vec<Integer> = Vec::with_capacity((MAX_GAP / 2) as usize);
    let mut gp = a_sq.clone();
    for _ in 0..MAX_GAP / 2 {
        gap_powers.push(gp.clone());
        gp = Integer::from(&gp * &a_sq) % n;
    }
    let advance = |current: &Integer, gap: u64| -> Option<Integer> {
        let step = if gap >= 2 && gap <= MAX_GAP && gap % 2 == 0 {
            gap_powers[(gap / 2 - 1) as usize].clone()
        } else {
            a.clone().pow_mod(&Integer::from(gap), n).ok()?
        };
        Some(Integer::from(current * &step) % n)
    };

    let mut current = a.clone().pow_mod(&Integer::from(primes[start]), n).ok()?;
    let mut i = start;
    while i < primes.len() {
        let end = (i + BATCH).min(primes.len());
        let batch_start = current.clone();
        let mut product = Integer::from(1u32);
        for j in i..end {
            if j > i {
                current = advance(&current, primes[j] - primes[j - 1])?;
            }
            product = Integer::from(&product * Integer::from(&current - 1u32)) % n;
        }
        let g = product.gcd(n);
        if &g == n {
            let mut x = batch_start;
            for j in i..end {
                if j > i {
                    x = advance(&x, primes[j] - primes[j - 1])?;
                }
                let g = Integer::from(&x - 1u32).gcd(n);
                if g > 1u32 {
                    return if &g < n { Some(g) } else { None };
                }
            }
            return None;
        }
        if g > 1u32 {
            return Some(g);
        }
        if end < primes.len() {
            current = advance(&current, primes[end] - primes[end - 1])?;
        }
        i = end;
    }
    None
}
