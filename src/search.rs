//! # Search — Safe-Prime AWC/MWC Modulus Candidates
//!
//! Scans multiplier offsets `i` for moduli of the form `m = a·b² − 1` with
//! `a = b − i`, keeping those where both `m` and `(m − 1)/2` are prime. Such
//! an `m` gives a three-word lag generator whose multiplicative group has a
//! single large subgroup, and `a_lcg = b⁻¹ mod m` is the multiplier of the
//! equivalent LCG.
//!
//! ## Pipeline per offset
//!
//! 1. Skip `i ≥ b` (the multiplier would not be positive).
//! 2. Trial-divide `m` and `(m − 1)/2` by the small-prime table.
//! 3. Screened Miller–Rabin on `m`, then on `(m − 1)/2`.
//! 4. Invert `b` modulo `m`.
//!
//! [`search_candidates`] is a lazy, restartable iterator in ascending offset
//! order. [`search_parallel`] splits a range into fixed-size chunks scanned on
//! the rayon pool; chunks are independent, so the merged result is the same
//! list the sequential iterator produces.

use std::fmt;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use rayon::prelude::*;
use rug::Integer;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::progress::Progress;
use crate::{has_small_factor, is_prime};

/// Offset the published scan starts from, `5^26`.
pub const DEFAULT_START: u64 = 1_490_116_119_384_765_625;
pub const DEFAULT_COUNT: u64 = 1_000_000;
pub const DEFAULT_CHUNK: u64 = 10_000;
/// Radix exponent of the published scan, `b = 2^64`.
pub const DEFAULT_RADIX_BITS: u32 = 64;

/// One accepted modulus.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModulusCandidate {
    #[serde(with = "crate::decimal")]
    pub offset: Integer,
    #[serde(with = "crate::decimal")]
    pub a: Integer,
    #[serde(with = "crate::decimal")]
    pub m: Integer,
    #[serde(with = "crate::decimal")]
    pub a_lcg: Integer,
}

impl ModulusCandidate {
    /// Test a single offset. `Ok(None)` when the offset is skipped or rejected.
    pub fn check(b: &Integer, offset: &Integer) -> Result<Option<Self>> {
        if offset >= b {
            return Ok(None);
        }
        let a = Integer::from(b - offset);
        let m = Integer::from(b.square_ref()) * &a - 1u32;
        let q = Integer::from(&m - 1u32) >> 1u32;

        if has_small_factor(&m) || has_small_factor(&q) {
            return Ok(None);
        }
        if !is_prime(&m) || !is_prime(&q) {
            return Ok(None);
        }

        let a_lcg = b.clone().invert(&m).map_err(|_| Error::NonInvertible {
            value: b.clone(),
            modulus: m.clone(),
        })?;
        debug!(offset = %offset, m = %m, "safe-prime modulus found");
        Ok(Some(ModulusCandidate {
            offset: offset.clone(),
            a,
            m,
            a_lcg,
        }))
    }

    /// Whether `b · a_lcg ≡ 1 (mod m)`.
    pub fn inverse_holds(&self, b: &Integer) -> bool {
        Integer::from(b * &self.a_lcg) % &self.m == 1u32
    }
}

impl fmt::Display for ModulusCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.offset)?;
        write!(f, "{:#x} {:#x} {:#x}", self.a, self.a_lcg, self.m)
    }
}

/// Lazy scan over `count` offsets starting at `start`.
#[derive(Clone, Debug)]
pub struct CandidateIter {
    b: Integer,
    next: Integer,
    remaining: u64,
    failed: bool,
}

impl CandidateIter {
    /// Next offset to be tested; restart a scan here with the remaining count.
    pub fn position(&self) -> &Integer {
        &self.next
    }

    pub fn remaining(&self) -> u64 {
        self.remaining
    }
}

impl Iterator for CandidateIter {
    type Item = Result<ModulusCandidate>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        while self.remaining > 0 {
            let offset = self.next.clone();
            self.next += 1u32;
            self.remaining -= 1;
            match ModulusCandidate::check(&self.b, &offset) {
                Ok(Some(c)) => return Some(Ok(c)),
                Ok(None) => {}
                Err(e) => {
                    self.failed = true;
                    return Some(Err(e));
                }
            }
        }
        None
    }
}

/// Scan offsets `start .. start + count` for radix `b`, lazily.
pub fn search_candidates(b: &Integer, start: &Integer, count: u64) -> CandidateIter {
    CandidateIter {
        b: b.clone(),
        next: start.clone(),
        remaining: count,
        failed: false,
    }
}

/// Scan `start .. start + count` in chunks of `chunk` offsets on the rayon
/// pool. Results come back in ascending offset order.
pub fn search_parallel(
    b: &Integer,
    start: &Integer,
    count: u64,
    chunk: u64,
    progress: Option<&Arc<Progress>>,
) -> Result<Vec<ModulusCandidate>> {
    let chunk = chunk.max(1);
    let chunks = count.div_ceil(chunk);
    info!(start = %start, count, chunk, chunks, "modulus search started");

    let per_chunk = (0..chunks)
        .into_par_iter()
        .map(|ci| -> Result<Vec<ModulusCandidate>> {
            let lo = Integer::from(start + ci * chunk);
            let len = chunk.min(count - ci * chunk);
            if let Some(p) = progress {
                p.set_current(format!("{}..+{}", lo, len));
            }
            let found = search_candidates(b, &lo, len).collect::<Result<Vec<_>>>()?;
            if let Some(p) = progress {
                p.tested.fetch_add(len, Ordering::Relaxed);
                p.found.fetch_add(found.len() as u64, Ordering::Relaxed);
                p.chunks_done.fetch_add(1, Ordering::Relaxed);
            }
            Ok(found)
        })
        .collect::<Result<Vec<_>>>()?;

    let all: Vec<ModulusCandidate> = per_chunk.into_iter().flatten().collect();
    info!(found = all.len(), "modulus search finished");
    Ok(all)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn radix() -> Integer {
        Integer::from(1u32) << DEFAULT_RADIX_BITS
    }

    fn hex(s: &str) -> Integer {
        Integer::from_str_radix(s, 16).unwrap()
    }

    #[test]
    fn known_hit_after_default_start() {
        let b = radix();
        let i = Integer::from(DEFAULT_START + 1797);
        let c = ModulusCandidate::check(&b, &i).unwrap().unwrap();
        assert_eq!(c.a, hex("eb520b48cdfcc442"));
        assert_eq!(c.m, hex("eb520b48cdfcc441ffffffffffffffffffffffffffffffff"));
        assert_eq!(c.a_lcg, hex("eb520b48cdfcc4420000000000000000"));
        assert!(c.inverse_holds(&b));
    }

    #[test]
    fn third_hit_in_first_window() {
        let b = radix();
        let c = ModulusCandidate::check(&b, &Integer::from(DEFAULT_START + 15972))
            .unwrap()
            .unwrap();
        assert_eq!(c.a, hex("eb520b48cdfc8ce3"));
        assert_eq!(c.m, hex("eb520b48cdfc8ce2ffffffffffffffffffffffffffffffff"));
        assert!(c.inverse_holds(&b));
    }

    #[test]
    fn lazy_scan_finds_first_hit_only() {
        let b = radix();
        let hits: Vec<_> = search_candidates(&b, &Integer::from(DEFAULT_START), 1800)
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].offset, DEFAULT_START + 1797);
    }

    #[test]
    fn scan_is_restartable() {
        let b = radix();
        let mut it = search_candidates(&b, &Integer::from(DEFAULT_START), 16_000);
        let first = it.next().unwrap().unwrap();
        assert_eq!(first.offset, DEFAULT_START + 1797);
        assert_eq!(it.position(), &Integer::from(DEFAULT_START + 1798));

        let resumed: Vec<_> = search_candidates(&b, it.position(), it.remaining())
            .collect::<Result<_>>()
            .unwrap();
        let rest: Vec<_> = it.collect::<Result<_>>().unwrap();
        assert_eq!(resumed, rest);
        let offsets: Vec<u64> = rest.iter().map(|c| c.offset.to_u64().unwrap()).collect();
        assert_eq!(offsets, vec![DEFAULT_START + 15813, DEFAULT_START + 15972]);
    }

    #[test]
    fn parallel_matches_sequential() {
        let b = radix();
        let start = Integer::from(DEFAULT_START);
        let seq: Vec<_> = search_candidates(&b, &start, 16_000)
            .collect::<Result<_>>()
            .unwrap();
        let progress = Progress::new();
        let par = search_parallel(&b, &start, 16_000, 1_000, Some(&progress)).unwrap();
        assert_eq!(par, seq);
        let offsets: Vec<u64> = par.iter().map(|c| c.offset.to_u64().unwrap()).collect();
        assert_eq!(
            offsets,
            vec![DEFAULT_START + 1797, DEFAULT_START + 15813, DEFAULT_START + 15972]
        );

        let snap = progress.snapshot();
        assert_eq!(snap.tested, 16_000);
        assert_eq!(snap.found, 3);
        assert_eq!(snap.chunks_done, 16);
    }

    #[test]
    fn uneven_last_chunk_is_covered() {
        let b = Integer::from(256u32);
        let all = search_parallel(&b, &Integer::from(0), 256, 100, None).unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].offset, 211u32);
        assert_eq!(all[0].a, 45u32);
        assert_eq!(all[0].m, 2949119u32);
        assert!(all[0].inverse_holds(&b));
    }

    #[test]
    fn offsets_at_or_above_radix_are_skipped() {
        let b = Integer::from(256u32);
        assert_eq!(ModulusCandidate::check(&b, &b), Ok(None));
        let hits: Vec<_> = search_candidates(&b, &Integer::from(200), 1000)
            .collect::<Result<_>>()
            .unwrap();
        assert!(hits.iter().all(|c| c.offset < b && c.a > 0u32));
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn zero_count_yields_nothing() {
        let b = radix();
        assert_eq!(search_candidates(&b, &Integer::from(0), 0).count(), 0);
        assert!(search_parallel(&b, &Integer::from(0), 0, 10, None)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn display_uses_hex_like_the_scan_log() {
        let b = radix();
        let c = ModulusCandidate::check(&b, &Integer::from(DEFAULT_START + 1797))
            .unwrap()
            .unwrap();
        assert_eq!(
            c.to_string(),
            "1490116119384767422\n0xeb520b48cdfcc442 0xeb520b48cdfcc4420000000000000000 \
             0xeb520b48cdfcc441ffffffffffffffffffffffffffffffff"
        );
    }

    #[test]
    fn candidate_json_uses_decimal_strings() {
        let b = Integer::from(256u32);
        let c = ModulusCandidate::check(&b, &Integer::from(211)).unwrap().unwrap();
        let json = serde_json::to_string(&c).unwrap();
        assert!(json.contains(r#""m":"2949119""#));
        let back: ModulusCandidate = serde_json::from_str(&json).unwrap();
        assert_eq!(back, c);
    }
}
