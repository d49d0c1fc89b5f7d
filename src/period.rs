//! # Period — AWC Order and Combined Period Certification
//!
//! An add-with-carry generator `x_n = x_{n-1} + x_{n-2} + c (mod b)` is an
//! LCG in disguise: its state walks the multiplicative group modulo
//! `m = b^2 + b − 1` by multiplication with `b^{-1}`, so its period is the
//! multiplicative order of the radix `b` modulo `m`.
//!
//! ## Algorithm
//!
//! 1. Build `m`, test it with the primality oracle.
//! 2. Take the group exponent: `m − 1` when `m` is prime, otherwise the
//!    Carmichael function `λ(m)` built from the factorization of `m`.
//! 3. Starting from the exponent, divide out each prime factor `q` while
//!    `b^(order/q) ≡ 1 (mod m)`. What remains is the exact order.
//! 4. Combine with the xorshift period `2^k − 1` and the Weyl period `2^w`
//!    by big-integer lcm.
//!
//! A composite `m` is not an error: the report is produced with
//! `modulus_is_prime = false` so the caller can see it.

use std::fmt;
use std::str::FromStr;

use rug::ops::Pow;
use rug::Integer;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::factor::{self, Factorization};
use crate::{format_factors, is_prime, log2, xkiss16, xkiss64};

/// Widest word accepted by [`certify_period`].
pub const MAX_WIDTH: u32 = 64;

/// The generator variants implemented by this crate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Variant {
    Xkiss16,
    Xkiss64,
}

impl FromStr for Variant {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "16" | "xkiss16" => Ok(Variant::Xkiss16),
            "64" | "xkiss64" => Ok(Variant::Xkiss64),
            other => Err(format!("unknown variant {:?} (expected 16 or 64)", other)),
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Variant::Xkiss16 => write!(f, "XKISS16/AWC"),
            Variant::Xkiss64 => write!(f, "XKISS64/AWC"),
        }
    }
}

/// Sub-generator sizes that determine the combined period.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodParams {
    /// AWC radix is `2^awc_bits`.
    pub awc_bits: u32,
    /// xorshift state size; its period is `2^xorshift_bits − 1`.
    pub xorshift_bits: u32,
    /// Weyl modulus is `2^weyl_bits`.
    pub weyl_bits: u32,
}

impl PeriodParams {
    /// The generic layout for word width `w`: two-word xorshift, one-word Weyl.
    pub fn for_width(width: u32) -> Result<Self> {
        if width == 0 || width > MAX_WIDTH {
            return Err(Error::InvalidWidth { width });
        }
        Ok(PeriodParams {
            awc_bits: width,
            xorshift_bits: 2 * width,
            weyl_bits: width,
        })
    }

    /// The layout actually used by a generator variant.
    pub fn for_variant(variant: Variant) -> Self {
        match variant {
            Variant::Xkiss16 => PeriodParams {
                awc_bits: xkiss16::AWC_BITS,
                xorshift_bits: 32,
                weyl_bits: 16,
            },
            Variant::Xkiss64 => PeriodParams {
                awc_bits: xkiss64::AWC_BITS,
                xorshift_bits: 64,
                weyl_bits: 64,
            },
        }
    }

    /// `m = b^2 + b − 1` with `b = 2^awc_bits`.
    pub fn awc_modulus(&self) -> Integer {
        let b = Integer::from(1u32) << self.awc_bits;
        Integer::from(&b * &b) + b - 1u32
    }
}

/// Result of certifying one generator layout.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PeriodReport {
    pub params: PeriodParams,
    #[serde(with = "crate::decimal")]
    pub modulus: Integer,
    pub modulus_is_prime: bool,
    /// Order of `2^awc_bits` modulo `modulus`.
    #[serde(with = "crate::decimal")]
    pub awc_period: Integer,
    #[serde(with = "crate::decimal")]
    pub xorshift_period: Integer,
    #[serde(with = "crate::decimal")]
    pub weyl_period: Integer,
    /// `lcm(awc_period, xorshift_period, weyl_period)`.
    #[serde(with = "crate::decimal")]
    pub full_period: Integer,
    #[serde(with = "crate::decimal::factors")]
    pub awc_period_factors: Factorization,
    #[serde(with = "crate::decimal::factors")]
    pub xorshift_period_factors: Factorization,
    pub log2_modulus: f64,
    pub log2_awc_period: f64,
    pub log2_full_period: f64,
}

/// Certify the generic layout of word width `width`:
/// `m = (2^W)^2 + 2^W − 1`, xorshift period `2^(2W) − 1`, Weyl period `2^W`.
pub fn certify_period(width: u32) -> Result<PeriodReport> {
    certify(PeriodParams::for_width(width)?)
}

/// Certify the layout of an implemented generator variant.
pub fn certify_variant(variant: Variant) -> Result<PeriodReport> {
    certify(PeriodParams::for_variant(variant))
}

/// Certify an arbitrary layout.
pub fn certify(params: PeriodParams) -> Result<PeriodReport> {
    let modulus = params.awc_modulus();
    let radix = Integer::from(1u32) << params.awc_bits;
    let modulus_is_prime = is_prime(&modulus);
    info!(
        awc_bits = params.awc_bits,
        modulus = %modulus,
        prime = modulus_is_prime,
        "certifying AWC period"
    );

    let exponent_factors = if modulus_is_prime {
        factor::factorize(&Integer::from(&modulus - 1u32))?
    } else {
        warn!(modulus = %modulus, "AWC modulus is composite, using Carmichael exponent");
        carmichael_factors(&factor::factorize(&modulus)?)?
    };

    let awc_period_factors = order_factors(&radix, &modulus, &exponent_factors)?;
    let awc_period = factor::product(&awc_period_factors);
    debug!(awc_period = %awc_period, "AWC order found");

    let xorshift_period = (Integer::from(1u32) << params.xorshift_bits) - 1u32;
    let xorshift_period_factors = factor::factorize_pow2_minus_one(params.xorshift_bits)?;
    let weyl_period = Integer::from(1u32) << params.weyl_bits;

    let full_period = lcm3(&awc_period, &xorshift_period, &weyl_period);

    Ok(PeriodReport {
        params,
        log2_modulus: log2(&modulus),
        log2_awc_period: log2(&awc_period),
        log2_full_period: log2(&full_period),
        modulus,
        modulus_is_prime,
        awc_period,
        xorshift_period,
        weyl_period,
        full_period,
        awc_period_factors,
        xorshift_period_factors,
    })
}

/// Multiplicative order of `g` modulo `m`, given the factorization of a
/// multiple of it (the group exponent).
pub fn multiplicative_order(g: &Integer, m: &Integer, exponent: &[(Integer, u32)]) -> Result<Integer> {
    Ok(factor::product(&order_factors(g, m, exponent)?))
}

/// Order of `g` mod `m` as a factorization, by repeated division of the
/// exponent. Fails with `NonInvertible` when `gcd(g, m) ≠ 1` and with
/// `NotPrime` when `g^exponent ≢ 1`, which means `exponent` was not a
/// multiple of the group order (`m − 1` for a composite `m`).
fn order_factors(g: &Integer, m: &Integer, exponent: &[(Integer, u32)]) -> Result<Factorization> {
    if Integer::from(g.gcd_ref(m)) != 1u32 {
        return Err(Error::NonInvertible {
            value: g.clone(),
            modulus: m.clone(),
        });
    }
    let mut order = factor::product(exponent);
    if !is_one(&pow_mod(g, &order, m)) {
        return Err(Error::not_prime(m));
    }

    let mut reduced: Factorization = Vec::with_capacity(exponent.len());
    for (q, e) in exponent {
        let mut k = *e;
        while k > 0 {
            let candidate = Integer::from(&order / q);
            if !is_one(&pow_mod(g, &candidate, m)) {
                break;
            }
            order = candidate;
            k -= 1;
        }
        if k > 0 {
            reduced.push((q.clone(), k));
        }
    }
    Ok(reduced)
}

/// Factorization of Carmichael's `λ(m)` from the factorization of `m`.
///
/// `λ(p^k) = p^(k−1)(p − 1)` for odd `p`, `λ(2) = 1`, `λ(4) = 2`,
/// `λ(2^k) = 2^(k−2)` for `k ≥ 3`; `λ(m)` is the lcm over prime powers,
/// i.e. the per-prime maximum exponent.
pub fn carmichael_factors(m_factors: &[(Integer, u32)]) -> Result<Factorization> {
    let mut parts: Vec<Factorization> = Vec::new();
    for (p, k) in m_factors {
        if *p == 2u32 {
            let e = match *k {
                1 => 0,
                2 => 1,
                k => k - 2,
            };
            if e > 0 {
                parts.push(vec![(Integer::from(2u32), e)]);
            }
            continue;
        }
        let mut part = factor::factorize(&Integer::from(p - 1u32))?;
        if *k > 1 {
            part.push((p.clone(), k - 1));
        }
        parts.push(part);
    }
    Ok(max_merge(parts))
}

fn max_merge(parts: Vec<Factorization>) -> Factorization {
    let mut all: Factorization = parts.into_iter().flatten().collect();
    all.sort_by(|a, b| a.0.cmp(&b.0));
    let mut merged: Factorization = Vec::with_capacity(all.len());
    for (p, e) in all {
        match merged.last_mut() {
            Some((last, le)) if *last == p => *le = (*le).max(e),
            _ => merged.push((p, e)),
        }
    }
    merged
}

/// `g^e mod m` for a non-negative exponent; `0` if GMP refuses the pair.
fn pow_mod(g: &Integer, e: &Integer, m: &Integer) -> Integer {
    g.pow_mod_ref(e, m).map(Integer::from).unwrap_or_default()
}

fn is_one(v: &Integer) -> bool {
    *v == 1u32
}

fn lcm3(a: &Integer, b: &Integer, c: &Integer) -> Integer {
    Integer::from(a.lcm_ref(b)).lcm(c)
}

/// `2^k` as a big integer.
pub fn pow2(k: u32) -> Integer {
    Integer::from(2u32).pow(k)
}

impl fmt::Display for PeriodReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let p = &self.params;
        writeln!(
            f,
            "----- AWC(2^{}) + xorshift(2^{}) + Weyl(2^{}) period estimation -----",
            p.awc_bits, p.xorshift_bits, p.weyl_bits
        )?;
        writeln!(f, "m: {} log2: {:.6}", self.modulus, self.log2_modulus)?;
        writeln!(f, "Is m prime: {}", self.modulus_is_prime)?;
        writeln!(
            f,
            "AWC period: {} log2: {:.6}",
            self.awc_period, self.log2_awc_period
        )?;
        writeln!(f, "xorshift period: {}", self.xorshift_period)?;
        writeln!(f, "Weyl period: {}", self.weyl_period)?;
        writeln!(
            f,
            "Full period: {} log2: {:.6}",
            self.full_period, self.log2_full_period
        )?;
        writeln!(
            f,
            "AWC period prime factors: {}",
            format_factors(&self.awc_period_factors)
        )?;
        write!(
            f,
            "xorshift period prime factors: {}",
            format_factors(&self.xorshift_period_factors)
        )
    }
}
