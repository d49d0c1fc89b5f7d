//! Serde adapters that store big integers as decimal strings, so JSON
//! consumers never see a number wider than 53 bits.

use rug::Integer;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

pub fn serialize<S: Serializer>(n: &Integer, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&n.to_string())
}

pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Integer, D::Error> {
    let text = String::deserialize(d)?;
    parse(&text).map_err(D::Error::custom)
}

fn parse(text: &str) -> Result<Integer, String> {
    Integer::parse(text.trim())
        .map(Integer::from)
        .map_err(|e| format!("invalid integer {:?}: {}", text, e))
}

/// `(prime, exponent)` lists with the prime as a decimal string.
pub mod factors {
    use super::*;
    use serde::de::Error as _;

    #[derive(Serialize, Deserialize)]
    struct Entry {
        prime: String,
        exponent: u32,
    }

    pub fn serialize<S: Serializer>(f: &[(Integer, u32)], s: S) -> Result<S::Ok, S::Error> {
        f.iter()
            .map(|(p, e)| Entry {
                prime: p.to_string(),
                exponent: *e,
            })
            .collect::<Vec<_>>()
            .serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<(Integer, u32)>, D::Error> {
        Vec::<Entry>::deserialize(d)?
            .into_iter()
            .map(|e| Ok((super::parse(&e.prime).map_err(D::Error::custom)?, e.exponent)))
            .collect()
    }
}
