pub mod decimal;
pub mod error;
pub mod factor;
pub mod p1;
pub mod period;
pub mod pratt;
pub mod progress;
pub mod search;
pub mod sieve;
pub mod xkiss16;
pub mod xkiss64;

pub use error::{Error, Result};
pub use period::{certify_period, certify_variant, PeriodParams, PeriodReport, Variant};
pub use pratt::{build_certificate, PrattBuilder, PrattCertificate};
pub use search::{search_candidates, search_parallel, ModulusCandidate};
pub use xkiss16::Xkiss16Awc;
pub use xkiss64::Xkiss64Awc;

use rug::integer::IsPrime;
use rug::Integer;

/// Miller-Rabin rounds used by the primality oracle. GMP runs a
/// Baillie-PSW test first, so results below 2^64 are exact.
pub const MR_ROUNDS: u32 = 30;

/// A combined xorshift + AWC + Weyl generator advanced one output at a time.
pub trait CombinedGenerator {
    type Word: Copy;

    /// Advance every sub-generator once and return the combined output.
    fn step(&mut self) -> Self::Word;

    /// Advance `steps` times, returning the last output (None for zero steps).
    fn advance(&mut self, steps: u64) -> Option<Self::Word> {
        let mut last = None;
        for _ in 0..steps {
            last = Some(self.step());
        }
        last
    }
}

/// Small primes for trial division pre-filter.
const SMALL_PRIMES: [u32; 64] = [
    2, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37, 41, 43, 47, 53, 59, 61, 67, 71, 73, 79, 83, 89, 97,
    101, 103, 107, 109, 113, 127, 131, 137, 139, 149, 151, 157, 163, 167, 173, 179, 181, 191, 193,
    197, 199, 211, 223, 227, 229, 233, 239, 241, 251, 257, 263, 269, 271, 277, 281, 283, 293, 307,
    311,
];

/// Quick check if n is divisible by any small prime.
/// Returns true if n is definitely composite (has a small factor).
pub fn has_small_factor(n: &Integer) -> bool {
    for &p in &SMALL_PRIMES {
        if n.is_divisible_u(p) {
            return n > &Integer::from(p);
        }
    }
    false
}

/// Two-round Miller-Rabin pre-screening: run 2 fast rounds first, full rounds only for survivors.
pub fn mr_screened_test(candidate: &Integer, mr_rounds: u32) -> IsPrime {
    if mr_rounds > 2 && candidate.is_probably_prime(2) == IsPrime::No {
        return IsPrime::No;
    }
    candidate.is_probably_prime(mr_rounds)
}

/// The primality oracle shared by the certifier, the certificate builder
/// and the modulus search.
pub fn is_prime(n: &Integer) -> bool {
    if *n < 2u32 || has_small_factor(n) {
        return false;
    }
    mr_screened_test(n, MR_ROUNDS) != IsPrime::No
}

/// Base-2 logarithm of a positive integer of any size.
pub fn log2(n: &Integer) -> f64 {
    let bits = n.significant_bits();
    if bits <= 1000 {
        return n.to_f64().log2();
    }
    let shift = bits - 64;
    Integer::from(n >> shift).to_f64().log2() + shift as f64
}

/// Render a factorization as `p^e * q * ...`.
pub fn format_factors(factors: &[(Integer, u32)]) -> String {
    if factors.is_empty() {
        return "1".to_string();
    }
    factors
        .iter()
        .map(|(p, e)| {
            if *e == 1 {
                p.to_string()
            } else {
                format!("{}^{}", p, e)
            }
        })
        .collect::<Vec<_>>()
        .join(" * ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rug::ops::Pow;

    #[test]
    fn has_small_factor_returns_false_for_small_primes() {
        for &p in &SMALL_PRIMES {
            let n = Integer::from(p);
            assert!(
                !has_small_factor(&n),
                "has_small_factor incorrectly flagged prime {} as composite",
                p
            );
        }
    }

    #[test]
    fn has_small_factor_returns_true_for_composites() {
        let composites: &[u32] = &[4, 6, 8, 9, 10, 12, 15, 21, 25, 35, 49, 100, 1000];
        for &c in composites {
            assert!(
                has_small_factor(&Integer::from(c)),
                "has_small_factor missed composite {}",
                c
            );
        }
    }

    #[test]
    fn has_small_factor_misses_products_of_large_primes() {
        // 313 * 317 has no factor in the table
        assert!(!has_small_factor(&Integer::from(313u32 * 317)));
    }

    #[test]
    fn mr_screened_test_separates_primes_and_composites() {
        for &p in &[2u32, 3, 5, 101, 1009, 10007] {
            assert_ne!(mr_screened_test(&Integer::from(p), 25), IsPrime::No);
        }
        for &c in &[4u32, 9, 561, 1001, 10000] {
            assert_eq!(mr_screened_test(&Integer::from(c), 25), IsPrime::No);
        }
    }

    #[test]
    fn is_prime_oracle_known_values() {
        assert!(!is_prime(&Integer::from(0)));
        assert!(!is_prime(&Integer::from(1)));
        assert!(is_prime(&Integer::from(2)));
        assert!(is_prime(&Integer::from(4295032831u64)));
        // (2^8)^2 + 2^8 - 1 = 11 * 5981
        assert!(!is_prime(&Integer::from(65791u32)));
        // 2^127 - 1
        assert!(is_prime(&(Integer::from(2).pow(127u32) - 1u32)));
        // (2^64)^2 + 2^64 - 1 = 525209 * 647898963880928284705367485144919
        let m = Integer::from(2).pow(128u32) + Integer::from(2).pow(64u32) - 1u32;
        assert!(!is_prime(&m));
    }

    #[test]
    fn log2_matches_float_for_small_and_large_values() {
        assert_eq!(log2(&Integer::from(1024)), 10.0);
        let m = Integer::from(4295032831u64);
        assert!((log2(&m) - 32.000022013).abs() < 1e-6);
        let big = Integer::from(2).pow(5000u32);
        assert!((log2(&big) - 5000.0).abs() < 1e-9);
    }

    #[test]
    fn format_factors_renders_exponents() {
        let f = vec![
            (Integer::from(3), 3),
            (Integer::from(5), 1),
            (Integer::from(331), 1),
        ];
        assert_eq!(format_factors(&f), "3^3 * 5 * 331");
        assert_eq!(format_factors(&[]), "1");
    }

    struct Counter(u8);

    impl CombinedGenerator for Counter {
        type Word = u8;
        fn step(&mut self) -> u8 {
            self.0 = self.0.wrapping_add(1);
            self.0
        }
    }

    #[test]
    fn advance_returns_last_output() {
        let mut c = Counter(0);
        assert_eq!(c.advance(0), None);
        assert_eq!(c.advance(300), Some(44));
    }
}
