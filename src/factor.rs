//! # Factor — Integer Factorization for Order and Certificate Computations
//!
//! Both the period certifier (order of the radix modulo `m`) and the Pratt
//! builder (witness checks over `n − 1`) need complete factorizations of
//! numbers well beyond 64 bits. The numbers involved have many small prime
//! factors and at most a couple of medium ones, so a layered approach is
//! enough:
//!
//! 1. Trial division by every prime below [`sieve::TRIAL_LIMIT`].
//! 2. Probable-prime test on the cofactor (done when it passes).
//! 3. Perfect-square check, then one Pollard P−1 pass (stages 1 and 2).
//! 4. Pollard–Brent rho with a handful of polynomial constants and an
//!    iteration bound, recursing on both halves of every split.
//!
//! A composite that survives the whole ladder is reported as
//! [`Error::FactorizationFailed`] instead of looping.
//!
//! Numbers `2^k − 1` are first split along `2^(2j) − 1 = (2^j − 1)(2^j + 1)`
//! by [`factorize_pow2_minus_one`], which keeps Mersenne-sized cofactors
//! away from rho.

use rug::ops::Pow;
use rug::Integer;
use tracing::debug;

use crate::error::{Error, Result};
use crate::{is_prime, p1, sieve};

/// Prime factorization as ascending `(prime, exponent)` pairs.
pub type Factorization = Vec<(Integer, u32)>;

/// Bounds for the probabilistic stages of [`factorize_with`].
#[derive(Clone, Debug)]
pub struct FactorConfig {
    /// Smoothness bound of the P−1 pass (0 disables it).
    pub p1_bound: u64,
    /// Upper bound of P−1 stage 2 (at or below `p1_bound` skips it).
    pub p1_stage2_bound: u64,
    /// Maximum polynomial evaluations per rho attempt.
    pub rho_iterations: u64,
    /// Number of rho polynomials `x^2 + c` tried before giving up.
    pub rho_attempts: u32,
}

impl Default for FactorConfig {
    fn default() -> Self {
        FactorConfig {
            p1_bound: p1::DEFAULT_B1,
            p1_stage2_bound: p1::DEFAULT_B2,
            rho_iterations: 1 << 24,
            rho_attempts: 8,
        }
    }
}

/// Factor `n` completely with the default bounds.
pub fn factorize(n: &Integer) -> Result<Factorization> {
    factorize_with(n, &FactorConfig::default())
}

/// Factor `n ≥ 1` completely. `1` factors as the empty product.
pub fn factorize_with(n: &Integer, cfg: &FactorConfig) -> Result<Factorization> {
    if *n < 1u32 {
        return Err(Error::FactorizationFailed { value: n.clone() });
    }

    let mut factors: Factorization = Vec::new();
    let mut rest = n.clone();

    for &p in sieve::trial_primes() {
        if rest == 1u32 {
            break;
        }
        if Integer::from(p * p) > rest {
            break;
        }
        let p32 = p as u32;
        if rest.is_divisible_u(p32) {
            let mut e = 0u32;
            while rest.is_divisible_u(p32) {
                rest /= p32;
                e += 1;
            }
            factors.push((Integer::from(p), e));
        }
    }

    let mut pending = vec![rest];
    while let Some(c) = pending.pop() {
        if c == 1u32 {
            continue;
        }
        if is_prime(&c) {
            factors.push((c, 1));
            continue;
        }
        let d = split(&c, cfg).ok_or_else(|| Error::FactorizationFailed { value: c.clone() })?;
        debug!(composite = %c, factor = %d, "split cofactor");
        let q = Integer::from(&c / &d);
        pending.push(d);
        pending.push(q);
    }

    Ok(merge(factors))
}

/// Factor `2^k − 1`, halving even exponents algebraically first.
pub fn factorize_pow2_minus_one(k: u32) -> Result<Factorization> {
    if k >= 2 && k % 2 == 0 {
        let half = k / 2;
        let mut f = factorize_pow2_minus_one(half)?;
        f.extend(factorize(&((Integer::from(1u32) << half) + 1u32))?);
        return Ok(merge(f));
    }
    factorize(&((Integer::from(1u32) << k) - 1u32))
}

/// Multiply a factorization back out.
pub fn product(f: &[(Integer, u32)]) -> Integer {
    let mut acc = Integer::from(1u32);
    for (p, e) in f {
        acc *= Integer::from(p.pow(*e));
    }
    acc
}

/// Sort by prime and combine repeated primes.
fn merge(mut factors: Factorization) -> Factorization {
    factors.sort_by(|a, b| a.0.cmp(&b.0));
    let mut merged: Factorization = Vec::with_capacity(factors.len());
    for (p, e) in factors {
        match merged.last_mut() {
            Some((last, le)) if *last == p => *le += e,
            _ => merged.push((p, e)),
        }
    }
    merged
}

/// Find a non-trivial divisor of the odd composite `n`.
fn split(n: &Integer, cfg: &FactorConfig) -> Option<Integer> {
    if n.is_even() {
        return Some(Integer::from(2u32));
    }
    if n.is_perfect_square() {
        return Some(n.clone().sqrt());
    }
    if cfg.p1_bound >= 2 {
        if let Some(d) = p1::p1_factor(n, cfg.p1_bound, cfg.p1_stage2_bound) {
            return Some(d);
        }
    }
    (1..=cfg.rho_attempts).find_map(|c| pollard_brent(n, c, cfg.rho_iterations))
}

/// Pollard rho with Brent's cycle detection on `x ↦ x² + c (mod n)`.
///
/// Products of `|x − y|` are batched 128 at a time before each gcd.
fn pollard_brent(n: &Integer, c: u32, max_iterations: u64) -> Option<Integer> {
    const BATCH: u64 = 128;
    let f = |v: &Integer| -> Integer { (Integer::from(v.square_ref()) + c) % n };

    let mut y = Integer::from(2u32);
    let mut x = y.clone();
    let mut ys = y.clone();
    let mut q = Integer::from(1u32);
    let mut g = Integer::from(1u32);
    let mut r: u64 = 1;
    let mut evaluations: u64 = 0;

    while g == 1u32 {
        x = y.clone();
        for _ in 0..r {
            y = f(&y);
        }
        evaluations += r;
        let mut k = 0;
        while k < r && g == 1u32 {
            ys = y.clone();
            let steps = BATCH.min(r - k);
            for _ in 0..steps {
                y = f(&y);
                q = (q * Integer::from(&x - &y).abs()) % n;
            }
            evaluations += steps;
            g = q.clone().gcd(n);
            k += BATCH;
        }
        r *= 2;
        if evaluations > max_iterations {
            return None;
        }
    }

    if g == *n {
        // batch overshot the collision; walk it one step at a time
        loop {
            ys = f(&ys);
            g = Integer::from(&x - &ys).abs().gcd(n);
            if g > 1u32 {
                break;
            }
        }
    }

    if g == *n {
        None
    } else {
        Some(g)
    }
}
