//! # XKISS16/AWC — 16-bit Combined Generator
//!
//! A 16-bit KISS-style generator for machines without wide multipliers.
//! Three sub-generators run in lock step and their outputs are summed:
//!
//! - **xorshift**: a two-word (32-bit state) xorshift/rotate recurrence,
//!   period `2^32 − 1`.
//! - **AWC**: add-with-carry `x_n = x_{n-1} + x_{n-2} + c (mod 2^16)`,
//!   equivalent to an LCG modulo the prime `m = (2^16)^2 + 2^16 − 1`;
//!   period `2147516415` (see [`crate::period`]).
//! - **Weyl**: `w += 0x9E39 (mod 2^16)`, period `2^16`.
//!
//! Two consecutive outputs are packed high word first into a 32-bit value,
//! which is how [`RngCore::next_u32`] is produced.

use rand_core::{impls, Error as RandError, RngCore, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::CombinedGenerator;

/// Number of bits in each AWC word.
pub const AWC_BITS: u32 = 16;
/// Mask for the AWC words.
pub const AWC_MASK: u32 = (1 << AWC_BITS) - 1;
/// Weyl increment, the 16-bit golden ratio fraction rounded to odd.
pub const WEYL_INC: u16 = 0x9E39;

const ROT_S0: u32 = 13;
const SHL_S1: u32 = 5;
const ROT_S1: u32 = 10;

/// Outputs discarded after seeding through [`SeedableRng`].
const WARMUP: usize = 32;

/// Full state of the 16-bit generator.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Xkiss16Awc {
    s0: u16,
    s1: u16,
    x0: u16,
    x1: u16,
    carry: u16,
    weyl: u16,
}

impl Default for Xkiss16Awc {
    /// The seeds used for the published test vectors.
    fn default() -> Self {
        Xkiss16Awc {
            s0: 8765,
            s1: 4321,
            x0: 3,
            x1: 2,
            carry: 1,
            weyl: 1234,
        }
    }
}

impl Xkiss16Awc {
    /// Build a generator from explicit sub-generator states.
    ///
    /// Rejects an all-zero xorshift pair, a carry above 1, and the two AWC
    /// fixed points `(0, 0, 0)` and `(mask, mask, 1)`.
    pub fn with_seeds(xorshift: (u16, u16), awc: (u16, u16, u16), weyl: u16) -> Result<Self> {
        let (s0, s1) = xorshift;
        let (x0, x1, carry) = awc;
        let mask = AWC_MASK as u16;
        let awc_fixed = (x0 == 0 && x1 == 0 && carry == 0) || (x0 == mask && x1 == mask && carry == 1);
        if (s0 == 0 && s1 == 0) || carry > 1 || awc_fixed {
            return Err(Error::DegenerateSeed);
        }
        Ok(Xkiss16Awc {
            s0,
            s1,
            x0,
            x1,
            carry,
            weyl,
        })
    }

    /// Xorshift words `(s0, s1)`.
    pub fn xorshift_state(&self) -> (u16, u16) {
        (self.s0, self.s1)
    }

    /// AWC words and carry `(x0, x1, carry)`.
    pub fn awc_state(&self) -> (u16, u16, u16) {
        (self.x0, self.x1, self.carry)
    }

    pub fn weyl_state(&self) -> u16 {
        self.weyl
    }

    /// Two consecutive outputs packed high word first.
    #[inline]
    pub fn next_pair(&mut self) -> u32 {
        let hi = self.step() as u32;
        let lo = self.step() as u32;
        (hi << 16) | lo
    }
}

impl CombinedGenerator for Xkiss16Awc {
    type Word = u16;

    #[inline]
    fn step(&mut self) -> u16 {
        // xorshift part
        self.s1 ^= self.s0;
        self.s0 = self.s0.rotate_left(ROT_S0) ^ self.s1 ^ (self.s1 << SHL_S1);
        self.s1 = self.s1.rotate_left(ROT_S1);
        // AWC part
        let t = self.x0 as u32 + self.x1 as u32 + self.carry as u32;
        self.x1 = self.x0;
        self.carry = (t >> AWC_BITS) as u16;
        self.x0 = (t & AWC_MASK) as u16;
        // Weyl part
        self.weyl = self.weyl.wrapping_add(WEYL_INC);
        self.x0
            .wrapping_add(self.s0)
            .wrapping_add(self.s1)
            .wrapping_add(self.weyl)
    }
}

impl RngCore for Xkiss16Awc {
    fn next_u32(&mut self) -> u32 {
        self.next_pair()
    }

    fn next_u64(&mut self) -> u64 {
        impls::next_u64_via_u32(self)
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        impls::fill_bytes_via_next(self, dest)
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> std::result::Result<(), RandError> {
        self.fill_bytes(dest);
        Ok(())
    }
}

impl SeedableRng for Xkiss16Awc {
    type Seed = [u8; 8];

    /// Spread a 64-bit little-endian seed over the sub-generators.
    ///
    /// Bits 0..32 go to the xorshift pair, bits 32..64 to the AWC words; the
    /// Weyl counter and carry start at 0 and 1. Degenerate combinations are
    /// nudged off the bad states before the warm-up outputs are discarded.
    fn from_seed(seed: Self::Seed) -> Self {
        let s = u64::from_le_bytes(seed);
        let mut s0 = s as u16;
        let s1 = (s >> 16) as u16;
        if s0 == 0 && s1 == 0 {
            s0 = 1;
        }
        let mut x0 = (s >> 32) as u16;
        let x1 = (s >> 48) as u16;
        if x0 == AWC_MASK as u16 && x1 == AWC_MASK as u16 {
            x0 = 0;
        }
        let mut gen = Xkiss16Awc {
            s0,
            s1,
            x0,
            x1,
            carry: 1,
            weyl: 0,
        };
        for _ in 0..WARMUP {
            gen.next_pair();
        }
        gen
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn golden_vector_after_ten_thousand_pairs() {
        let mut g = Xkiss16Awc::default();
        let mut u = 0;
        for _ in 0..10_000 {
            u = g.next_pair();
        }
        assert_eq!(u, 0xbc84b06e, "got {:#010x}", u);
    }

    #[test]
    fn next_u32_is_packed_pair() {
        let mut a = Xkiss16Awc::default();
        let mut b = a.clone();
        let hi = b.step() as u32;
        let lo = b.step() as u32;
        assert_eq!(a.next_u32(), (hi << 16) | lo);
        assert_eq!(a, b);
    }

    #[test]
    fn first_step_by_hand() {
        let mut g = Xkiss16Awc::default();
        let out = g.step();
        // s1 = 4321 ^ 8765, s0 = rotl(8765, 13) ^ s1 ^ (s1 << 5), s1 = rotl(s1, 10)
        let s1 = 4321u16 ^ 8765;
        let s0 = 8765u16.rotate_left(13) ^ s1 ^ (s1 << 5);
        let s1 = s1.rotate_left(10);
        assert_eq!(g.xorshift_state(), (s0, s1));
        assert_eq!(g.awc_state(), (6, 3, 0));
        assert_eq!(g.weyl_state(), 1234u16.wrapping_add(WEYL_INC));
        let expected = 6u16
            .wrapping_add(s0)
            .wrapping_add(s1)
            .wrapping_add(1234u16.wrapping_add(WEYL_INC));
        assert_eq!(out, expected);
    }

    #[test]
    fn carry_stays_binary() {
        let mut g = Xkiss16Awc::with_seeds((1, 2), (0xFFFF, 0xFFFE, 1), 0).unwrap();
        for _ in 0..100_000 {
            g.step();
            assert!(g.awc_state().2 <= 1);
        }
    }

    #[test]
    fn with_seeds_rejects_degenerate_states() {
        assert_eq!(
            Xkiss16Awc::with_seeds((0, 0), (3, 2, 1), 0),
            Err(Error::DegenerateSeed)
        );
        assert_eq!(
            Xkiss16Awc::with_seeds((1, 0), (0, 0, 0), 0),
            Err(Error::DegenerateSeed)
        );
        assert_eq!(
            Xkiss16Awc::with_seeds((1, 0), (0xFFFF, 0xFFFF, 1), 0),
            Err(Error::DegenerateSeed)
        );
        assert_eq!(
            Xkiss16Awc::with_seeds((1, 0), (1, 1, 2), 0),
            Err(Error::DegenerateSeed)
        );
        assert!(Xkiss16Awc::with_seeds((8765, 4321), (3, 2, 1), 1234).is_ok());
    }

    #[test]
    fn with_seeds_matches_default() {
        let a = Xkiss16Awc::with_seeds((8765, 4321), (3, 2, 1), 1234).unwrap();
        assert_eq!(a, Xkiss16Awc::default());
    }

    #[test]
    fn seed_from_zero_is_not_degenerate() {
        let mut g = Xkiss16Awc::seed_from_u64(0);
        assert_ne!(g.xorshift_state(), (0, 0));
        let first: Vec<u32> = (0..8).map(|_| g.next_u32()).collect();
        assert!(first.windows(2).any(|w| w[0] != w[1]));
    }

    #[test]
    fn from_seed_all_ones_avoids_awc_fixed_point() {
        let g = Xkiss16Awc::from_seed([0xFF; 8]);
        let (x0, x1, c) = g.awc_state();
        assert!(!(x0 == 0xFFFF && x1 == 0xFFFF && c == 1));
    }

    #[test]
    fn fill_bytes_is_little_endian_u32_stream() {
        let mut a = Xkiss16Awc::default();
        let mut b = a.clone();
        let mut buf = [0u8; 8];
        a.fill_bytes(&mut buf);
        let w0 = b.next_u32().to_le_bytes();
        let w1 = b.next_u32().to_le_bytes();
        assert_eq!(&buf[..4], &w0);
        assert_eq!(&buf[4..], &w1);
    }

    #[test]
    fn state_roundtrips_through_json() {
        let mut g = Xkiss16Awc::default();
        g.advance(1000);
        let json = serde_json::to_string(&g).unwrap();
        let mut back: Xkiss16Awc = serde_json::from_str(&json).unwrap();
        assert_eq!(back, g);
        assert_eq!(back.step(), g.step());
    }
}
