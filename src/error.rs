//! # Error — Typed Failures of the Certification Engine
//!
//! Every failure carries the offending value so that a report can name it.
//! The generator engine itself cannot fail once constructed; the only
//! generator error is a degenerate seed rejected at construction time.
//!
//! Big integers are stored as `rug::Integer` and rendered in decimal.

use rug::Integer;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// A value expected to be prime failed the primality oracle.
    #[error("{value} is not prime")]
    NotPrime { value: Integer },

    /// Bounded witness search exhausted without finding a primitive root.
    #[error("no Pratt witness for {value} after {attempts} attempts")]
    WitnessNotFound { value: Integer, attempts: u32 },

    /// Modular inverse requested for a pair that is not coprime.
    #[error("{value} is not invertible modulo {modulus}")]
    NonInvertible { value: Integer, modulus: Integer },

    /// Certificate recursion went deeper than the configured bound.
    #[error("certificate for {value} exceeds maximum depth {depth}")]
    DepthExceeded { value: Integer, depth: u32 },

    /// Factorization gave up before splitting a composite cofactor.
    #[error("could not factor {value} within the iteration bound")]
    FactorizationFailed { value: Integer },

    /// Seed would put the generator on an all-zero xorshift state or an AWC fixed point.
    #[error("seed puts the generator into a degenerate state")]
    DegenerateSeed,

    /// Word width outside the supported range.
    #[error("unsupported word width {width}")]
    InvalidWidth { width: u32 },

    /// Independent certificate check rejected a node.
    #[error("certificate for {value} is invalid: {reason}")]
    InvalidCertificate { value: Integer, reason: String },
}

impl Error {
    pub(crate) fn not_prime(value: &Integer) -> Self {
        Error::NotPrime {
            value: value.clone(),
        }
    }

    pub(crate) fn invalid(value: &Integer, reason: impl Into<String>) -> Self {
        Error::InvalidCertificate {
            value: value.clone(),
            reason: reason.into(),
        }
    }
}
