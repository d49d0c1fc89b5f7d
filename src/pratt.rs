//! # Pratt — Recursive Primality Certificates
//!
//! A Pratt certificate proves `n` prime by exhibiting a primitive root:
//! a witness `a` with `a^(n−1) ≡ 1 (mod n)` and `a^((n−1)/p) ≢ 1 (mod n)`
//! for every prime `p | n − 1`. The multiplicative group then has order
//! `n − 1`, which forces `n` prime. Each large prime factor `p` needs its own
//! certificate, so the proof is a tree.
//!
//! ## Trusted Threshold
//!
//! Below `2^trusted_bits` (default 64) the probable-prime oracle is exact
//! (BPSW has no known counterexample below `2^64`), so such values become
//! `Base` leaves and are never recursed into.
//!
//! ## Bounds
//!
//! - witness search gives up after `max_witness_attempts` random draws;
//! - recursion gives up past `max_depth` levels;
//! - factoring `n − 1` uses the iteration bounds of [`FactorConfig`].
//!
//! Sibling branches are certified in parallel on the rayon pool. Every
//! branch draws witnesses from its own `RandState` whose seed is derived from
//! the parent seed and the branch index, so a given seed always yields the
//! same certificate regardless of scheduling.
//!
//! ## Verification
//!
//! [`PrattCertificate::verify`] re-checks a tree without trusting the
//! builder: the stored factorization must multiply back to `n − 1`, every
//! exponentiation is recomputed, and every large factor must be covered by
//! a child that verifies in turn.

use std::fmt;

use rayon::prelude::*;
use rug::rand::RandState;
use rug::Integer;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::factor::{self, FactorConfig, Factorization};
use crate::{format_factors, is_prime};

pub const DEFAULT_TRUSTED_BITS: u32 = 64;
pub const DEFAULT_WITNESS_ATTEMPTS: u32 = 256;
pub const DEFAULT_MAX_DEPTH: u32 = 32;
pub const DEFAULT_SEED: u64 = 0x5eed_cafe;

/// `a·b − 1` with `b = 2^64` and `a = b − 10^16 − 273·256`: the 128-bit
/// multiply-with-carry modulus of the KISS03 generator.
pub fn mwc128_modulus() -> Integer {
    let b = Integer::from(1u32) << 64u32;
    let a = Integer::from(&b - 10_000_000_000_000_000u64) - 273u32 * 256;
    a * b - 1u32
}

/// Certificate tree. Big integers serialize as decimal strings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PrattCertificate {
    /// Prime below the trusted threshold, accepted by the oracle.
    Base {
        #[serde(with = "crate::decimal")]
        n: Integer,
    },
    /// Witness proof over the full factorization of `n − 1`.
    Proof {
        #[serde(with = "crate::decimal")]
        n: Integer,
        #[serde(with = "crate::decimal")]
        witness: Integer,
        #[serde(with = "crate::decimal::factors")]
        factors: Factorization,
        /// One certificate per factor at or above the threshold, ascending.
        children: Vec<PrattCertificate>,
    },
}

impl PrattCertificate {
    /// The number this node proves prime.
    pub fn n(&self) -> &Integer {
        match self {
            PrattCertificate::Base { n } | PrattCertificate::Proof { n, .. } => n,
        }
    }

    /// Levels in the tree, a lone `Base` counting as one.
    pub fn depth(&self) -> u32 {
        match self {
            PrattCertificate::Base { .. } => 1,
            PrattCertificate::Proof { children, .. } => {
                1 + children.iter().map(|c| c.depth()).max().unwrap_or(0)
            }
        }
    }

    /// Total number of nodes.
    pub fn node_count(&self) -> usize {
        match self {
            PrattCertificate::Base { .. } => 1,
            PrattCertificate::Proof { children, .. } => {
                1 + children.iter().map(|c| c.node_count()).sum::<usize>()
            }
        }
    }

    /// Verify with the default trusted threshold.
    pub fn verify(&self) -> Result<()> {
        self.verify_with(DEFAULT_TRUSTED_BITS)
    }

    /// Re-check every node. `Base` leaves must lie below `2^trusted_bits`.
    pub fn verify_with(&self, trusted_bits: u32) -> Result<()> {
        let threshold = Integer::from(1u32) << trusted_bits;
        self.verify_node(&threshold)
    }

    fn verify_node(&self, threshold: &Integer) -> Result<()> {
        match self {
            PrattCertificate::Base { n } => {
                if n >= threshold {
                    return Err(Error::invalid(n, "base node above trusted threshold"));
                }
                if !is_prime(n) {
                    return Err(Error::not_prime(n));
                }
                Ok(())
            }
            PrattCertificate::Proof {
                n,
                witness,
                factors,
                children,
            } => {
                if *n < 3u32 {
                    return Err(Error::invalid(n, "proof node below 3"));
                }
                let n1 = Integer::from(n - 1u32);
                if factor::product(factors) != n1 {
                    return Err(Error::invalid(n, "factors do not multiply to n - 1"));
                }
                if *witness < 2u32 || *witness > Integer::from(n - 2u32) {
                    return Err(Error::invalid(n, "witness outside [2, n - 2]"));
                }
                if !is_witness(witness, n, &n1, factors) {
                    return Err(Error::invalid(n, "witness is not a primitive root"));
                }

                let large: Vec<&Integer> = factors
                    .iter()
                    .map(|(p, _)| p)
                    .filter(|p| *p >= threshold)
                    .collect();
                if large.len() != children.len() {
                    return Err(Error::invalid(n, "missing or extra child certificates"));
                }
                for (p, child) in large.iter().zip(children) {
                    if child.n() != *p {
                        return Err(Error::invalid(n, format!("child does not certify {}", p)));
                    }
                }
                for (p, _) in factors.iter().filter(|(p, _)| p < threshold) {
                    if !is_prime(p) {
                        return Err(Error::not_prime(p));
                    }
                }
                children
                    .par_iter()
                    .try_for_each(|c| c.verify_node(threshold))
            }
        }
    }

    fn fmt_node(&self, f: &mut fmt::Formatter<'_>, level: usize) -> fmt::Result {
        let pad = "  ".repeat(level);
        match self {
            PrattCertificate::Base { n } => writeln!(f, "{}{} (trusted)", pad, n),
            PrattCertificate::Proof {
                n,
                witness,
                factors,
                children,
            } => {
                writeln!(f, "{}{}", pad, n)?;
                writeln!(f, "{}  n - 1 = {}", pad, format_factors(factors))?;
                writeln!(f, "{}  a = {}", pad, witness)?;
                for c in children {
                    c.fmt_node(f, level + 1)?;
                }
                Ok(())
            }
        }
    }
}

impl fmt::Display for PrattCertificate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_node(f, 0)
    }
}

/// Configurable certificate builder.
#[derive(Clone, Debug)]
pub struct PrattBuilder {
    trusted_bits: u32,
    max_witness_attempts: u32,
    max_depth: u32,
    seed: u64,
    factor_config: FactorConfig,
}

impl Default for PrattBuilder {
    fn default() -> Self {
        PrattBuilder {
            trusted_bits: DEFAULT_TRUSTED_BITS,
            max_witness_attempts: DEFAULT_WITNESS_ATTEMPTS,
            max_depth: DEFAULT_MAX_DEPTH,
            seed: DEFAULT_SEED,
            factor_config: FactorConfig::default(),
        }
    }
}

impl PrattBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Values below `2^bits` become `Base` leaves. Clamped to at least 2.
    pub fn trusted_bits(mut self, bits: u32) -> Self {
        self.trusted_bits = bits.max(2);
        self
    }

    pub fn max_witness_attempts(mut self, attempts: u32) -> Self {
        self.max_witness_attempts = attempts;
        self
    }

    pub fn max_depth(mut self, depth: u32) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn factor_config(mut self, cfg: FactorConfig) -> Self {
        self.factor_config = cfg;
        self
    }

    pub fn trusted_threshold_bits(&self) -> u32 {
        self.trusted_bits
    }

    /// Build a certificate for `n`.
    pub fn build(&self, n: &Integer) -> Result<PrattCertificate> {
        let threshold = Integer::from(1u32) << self.trusted_bits;
        let cert = self.prove(n, &threshold, 0, self.seed)?;
        info!(
            n = %n,
            nodes = cert.node_count(),
            depth = cert.depth(),
            "certificate built"
        );
        Ok(cert)
    }

    fn prove(&self, n: &Integer, threshold: &Integer, depth: u32, seed: u64) -> Result<PrattCertificate> {
        if depth > self.max_depth {
            return Err(Error::DepthExceeded {
                value: n.clone(),
                depth: self.max_depth,
            });
        }
        if n < threshold {
            return if is_prime(n) {
                Ok(PrattCertificate::Base { n: n.clone() })
            } else {
                Err(Error::not_prime(n))
            };
        }
        if !is_prime(n) {
            return Err(Error::not_prime(n));
        }

        let n1 = Integer::from(n - 1u32);
        let factors = factor::factorize_with(&n1, &self.factor_config)?;
        debug!(n = %n, depth, factors = %format_factors(&factors), "factored n - 1");

        let large: Vec<&Integer> = factors
            .iter()
            .map(|(p, _)| p)
            .filter(|p| *p >= threshold)
            .collect();
        if let Some(p) = large.iter().find(|p| !is_prime(p)) {
            return Err(Error::not_prime(p));
        }

        let witness = self.find_witness(n, &n1, &factors, seed)?;

        let children = large
            .par_iter()
            .enumerate()
            .map(|(i, p)| self.prove(p, threshold, depth + 1, branch_seed(seed, i)))
            .collect::<Result<Vec<_>>>()?;

        Ok(PrattCertificate::Proof {
            n: n.clone(),
            witness,
            factors,
            children,
        })
    }

    /// Draw random `a ∈ [2, n − 2]` until one is a primitive root.
    fn find_witness(&self, n: &Integer, n1: &Integer, factors: &[(Integer, u32)], seed: u64) -> Result<Integer> {
        let mut rand = RandState::new();
        rand.seed(&Integer::from(seed));
        let span = Integer::from(n - 3u32);

        for attempt in 1..=self.max_witness_attempts {
            let a = Integer::from(span.random_below_ref(&mut rand)) + 2u32;
            if is_witness(&a, n, n1, factors) {
                debug!(n = %n, witness = %a, attempt, "witness found");
                return Ok(a);
            }
        }
        Err(Error::WitnessNotFound {
            value: n.clone(),
            attempts: self.max_witness_attempts,
        })
    }
}

/// Build a certificate with the default configuration.
pub fn build_certificate(n: &Integer) -> Result<PrattCertificate> {
    PrattBuilder::default().build(n)
}

fn is_witness(a: &Integer, n: &Integer, n1: &Integer, factors: &[(Integer, u32)]) -> bool {
    if !is_one(a, n1, n) {
        return false;
    }
    factors
        .iter()
        .all(|(p, _)| !is_one(a, &Integer::from(n1 / p), n))
}

/// Whether `a^e ≡ 1 (mod n)`.
fn is_one(a: &Integer, e: &Integer, n: &Integer) -> bool {
    match a.pow_mod_ref(e, n) {
        Some(r) => Integer::from(r) == 1u32,
        None => false,
    }
}

/// SplitMix64 finalizer over parent seed and branch index.
fn branch_seed(seed: u64, index: usize) -> u64 {
    let mut z = seed ^ (index as u64 + 1).wrapping_mul(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn big(s: &str) -> Integer {
        Integer::parse(s).map(Integer::from).unwrap()
    }

    #[test]
    fn mwc128_modulus_value() {
        assert_eq!(
            mwc128_modulus(),
            big("340097899480200078741164784018624872447")
        );
    }

    #[test]
    fn small_prime_is_base() {
        let c = build_certificate(&Integer::from(4295032831u64)).unwrap();
        assert_eq!(
            c,
            PrattCertificate::Base {
                n: Integer::from(4295032831u64)
            }
        );
        assert_eq!(c.depth(), 1);
        c.verify().unwrap();
    }

    #[test]
    fn small_composite_is_not_prime() {
        assert_eq!(
            build_certificate(&Integer::from(561u32)),
            Err(Error::NotPrime {
                value: Integer::from(561u32)
            })
        );
    }

    #[test]
    fn large_composite_is_not_prime() {
        // (2^64)^2 + 2^64 - 1 = 525209 * 647898963880928284705367485144919
        let b = Integer::from(1u32) << 64u32;
        let m = Integer::from(&b * &b) + &b - 1u32;
        assert!(matches!(
            build_certificate(&m),
            Err(Error::NotPrime { .. })
        ));
    }

    #[test]
    fn mwc128_certificate_has_three_levels() {
        let m = mwc128_modulus();
        let c = build_certificate(&m).unwrap();
        assert_eq!(c.n(), &m);
        c.verify().unwrap();

        // m - 1 = 2 * q, q - 1 = 2 * 609487 * r, r - 1 smooth
        let PrattCertificate::Proof { factors, children, .. } = &c else {
            panic!("expected proof node");
        };
        assert_eq!(factors.len(), 2);
        assert_eq!(children.len(), 1);
        assert_eq!(
            children[0].n(),
            &big("170048949740100039370582392009312436223")
        );
        assert_eq!(c.depth(), 3);
    }

    #[test]
    fn same_seed_same_certificate() {
        let m = mwc128_modulus();
        let a = PrattBuilder::new().seed(7).build(&m).unwrap();
        let b = PrattBuilder::new().seed(7).build(&m).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn low_threshold_forces_recursion() {
        // 4295032830 = 2 * 3^3 * 5 * 11 * 17 * 257 * 331, and 330 = 2 * 3 * 5 * 11
        let n = Integer::from(4295032831u64);
        let c = PrattBuilder::new().trusted_bits(8).build(&n).unwrap();
        let PrattCertificate::Proof { children, .. } = &c else {
            panic!("expected proof node");
        };
        let kids: Vec<&Integer> = children.iter().map(|c| c.n()).collect();
        assert_eq!(kids, vec![&Integer::from(257u32), &Integer::from(331u32)]);
        assert_eq!(c.depth(), 2);
        c.verify_with(8).unwrap();
    }

    #[test]
    fn depth_bound_is_enforced() {
        let m = mwc128_modulus();
        let err = PrattBuilder::new().max_depth(0).build(&m).unwrap_err();
        assert!(matches!(err, Error::DepthExceeded { depth: 0, .. }));
    }

    #[test]
    fn witness_bound_is_enforced() {
        let m = mwc128_modulus();
        let err = PrattBuilder::new()
            .max_witness_attempts(0)
            .build(&m)
            .unwrap_err();
        assert_eq!(
            err,
            Error::WitnessNotFound {
                value: m,
                attempts: 0
            }
        );
    }

    #[test]
    fn tampered_witness_is_rejected() {
        let mut c = PrattBuilder::new()
            .trusted_bits(8)
            .build(&Integer::from(4295032831u64))
            .unwrap();
        if let PrattCertificate::Proof { witness, .. } = &mut c {
            // -1 has order 2, never a primitive root here
            *witness = Integer::from(4295032830u64);
        }
        assert!(matches!(
            c.verify_with(8),
            Err(Error::InvalidCertificate { .. })
        ));
    }

    #[test]
    fn tampered_factors_are_rejected() {
        let mut c = PrattBuilder::new()
            .trusted_bits(8)
            .build(&Integer::from(4295032831u64))
            .unwrap();
        if let PrattCertificate::Proof { factors, .. } = &mut c {
            factors[0].1 += 1;
        }
        let err = c.verify_with(8).unwrap_err();
        assert_eq!(
            err.to_string(),
            "certificate for 4295032831 is invalid: factors do not multiply to n - 1"
        );
    }

    #[test]
    fn dropped_child_is_rejected() {
        let mut c = PrattBuilder::new()
            .trusted_bits(8)
            .build(&Integer::from(4295032831u64))
            .unwrap();
        if let PrattCertificate::Proof { children, .. } = &mut c {
            children.pop();
        }
        assert!(c.verify_with(8).is_err());
    }

    #[test]
    fn base_above_threshold_is_rejected() {
        let c = PrattCertificate::Base {
            n: Integer::from(4295032831u64),
        };
        assert!(c.verify_with(16).is_err());
    }

    #[test]
    fn json_is_tagged_and_roundtrips() {
        let c = PrattBuilder::new()
            .trusted_bits(8)
            .build(&Integer::from(4295032831u64))
            .unwrap();
        let json = serde_json::to_string(&c).unwrap();
        assert!(json.starts_with(r#"{"type":"Proof","n":"4295032831""#));
        assert!(json.contains(r#"{"type":"Proof","n":"257""#));
        let back: PrattCertificate = serde_json::from_str(&json).unwrap();
        assert_eq!(back, c);
    }

    #[test]
    fn display_indents_children() {
        let c = PrattBuilder::new()
            .trusted_bits(8)
            .build(&Integer::from(4295032831u64))
            .unwrap();
        let text = c.to_string();
        assert!(text.starts_with("4295032831\n"));
        assert!(text.contains("  n - 1 = 2 * 3^3 * 5 * 11 * 17 * 257 * 331\n"));
        assert!(text.contains("\n  331\n"));
    }

    #[test]
    fn branch_seeds_differ() {
        assert_ne!(branch_seed(1, 0), branch_seed(1, 1));
        assert_ne!(branch_seed(1, 0), branch_seed(2, 0));
    }
}
