//! # XKISS64/AWC — 64-bit Combined Generator
//!
//! The 64-bit member of the family. The AWC part works on 55-bit words so
//! the sum of two words plus carry never overflows a `u64`; it is an LCG
//! modulo the prime `m = (2^55)^2 + 2^55 − 1` with period close to `2^106.7`.
//! Combined with xorshift64 (period `2^64 − 1`) and a 64-bit Weyl sequence
//! the full period is about `2^234.7`.

use rand_core::{impls, Error as RandError, RngCore, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::CombinedGenerator;

/// Number of bits in each AWC word.
pub const AWC_BITS: u32 = 55;
pub const AWC_MASK: u64 = (1 << AWC_BITS) - 1;
/// Weyl increment: 2^64 divided by the golden ratio, rounded to odd.
pub const WEYL_INC: u64 = 0x9E37_79B9_7F4A_7C15;

const XS_A: u32 = 13;
const XS_B: u32 = 17;
const XS_C: u32 = 43;
/// Left shift applied to `x0` before mixing with `x1` in the output.
const OUT_SHIFT: u32 = 9;

const WARMUP: usize = 32;

/// Full state of the 64-bit generator.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Xkiss64Awc {
    xsh: u64,
    x0: u64,
    x1: u64,
    carry: u64,
    weyl: u64,
}

impl Default for Xkiss64Awc {
    /// The seeds used for the published test vector.
    fn default() -> Self {
        Xkiss64Awc {
            xsh: 87654321,
            x0: 3,
            x1: 2,
            carry: 1,
            weyl: 12345678,
        }
    }
}

impl Xkiss64Awc {
    /// Build a generator from explicit sub-generator states.
    pub fn with_seeds(xorshift: u64, awc: (u64, u64, u64), weyl: u64) -> Result<Self> {
        let (x0, x1, carry) = awc;
        let awc_fixed =
            (x0 == 0 && x1 == 0 && carry == 0) || (x0 == AWC_MASK && x1 == AWC_MASK && carry == 1);
        if xorshift == 0 || x0 > AWC_MASK || x1 > AWC_MASK || carry > 1 || awc_fixed {
            return Err(Error::DegenerateSeed);
        }
        Ok(Xkiss64Awc {
            xsh: xorshift,
            x0,
            x1,
            carry,
            weyl,
        })
    }

    pub fn xorshift_state(&self) -> u64 {
        self.xsh
    }

    /// AWC words and carry `(x0, x1, carry)`.
    pub fn awc_state(&self) -> (u64, u64, u64) {
        (self.x0, self.x1, self.carry)
    }

    pub fn weyl_state(&self) -> u64 {
        self.weyl
    }
}

impl CombinedGenerator for Xkiss64Awc {
    type Word = u64;

    #[inline]
    fn step(&mut self) -> u64 {
        // xorshift64 part
        self.xsh ^= self.xsh << XS_A;
        self.xsh ^= self.xsh >> XS_B;
        self.xsh ^= self.xsh << XS_C;
        // AWC part
        let t = self.x0 + self.x1 + self.carry;
        self.x1 = self.x0;
        self.carry = t >> AWC_BITS;
        self.x0 = t & AWC_MASK;
        // Weyl part
        self.weyl = self.weyl.wrapping_add(WEYL_INC);
        ((self.x0 << OUT_SHIFT) ^ self.x1)
            .wrapping_add(self.xsh)
            .wrapping_add(self.weyl)
    }
}

impl RngCore for Xkiss64Awc {
    /// Upper half of the 64-bit output.
    fn next_u32(&mut self) -> u32 {
        (self.step() >> 32) as u32
    }

    fn next_u64(&mut self) -> u64 {
        self.step()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        impls::fill_bytes_via_next(self, dest)
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> std::result::Result<(), RandError> {
        self.fill_bytes(dest);
        Ok(())
    }
}

impl SeedableRng for Xkiss64Awc {
    type Seed = [u8; 16];

    /// Bytes 0..8 seed xorshift and Weyl, bytes 8..16 seed the AWC words.
    fn from_seed(seed: Self::Seed) -> Self {
        let mut lo = [0u8; 8];
        let mut hi = [0u8; 8];
        lo.copy_from_slice(&seed[..8]);
        hi.copy_from_slice(&seed[8..]);
        let a = u64::from_le_bytes(lo);
        let b = u64::from_le_bytes(hi);

        let xsh = if a == 0 { WEYL_INC } else { a };
        let mut x0 = b & AWC_MASK;
        let x1 = (b >> 9) & AWC_MASK;
        if x0 == AWC_MASK && x1 == AWC_MASK {
            x0 = 0;
        }
        let mut gen = Xkiss64Awc {
            xsh,
            x0,
            x1,
            carry: 1,
            weyl: a.rotate_left(32),
        };
        for _ in 0..WARMUP {
            gen.step();
        }
        gen
    }
}
