use std::fmt;

use num_bigint::BigUint;
use sha1::{Digest, Sha1};

use crate::config::M;
use crate::error::{Error, Result};

/// A position on the identifier ring, an integer modulo 2^160.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Identifier(BigUint);

impl Identifier {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() > M / 8 {
            return Err(Error::Parse(format!(
                "identifier is {} bytes long, expected at most {}",
                bytes.len(),
                M / 8
            )));
        }
        Ok(Identifier(BigUint::from_bytes_be(bytes)))
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.0.to_bytes_be()
    }

    /// `(self + 2^i) mod 2^160`, the start of the i-th finger interval.
    pub fn offset(&self, i: usize) -> Identifier {
        let step = BigUint::from(1u8) << i;
        Identifier((&self.0 + step) % ring_size())
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:x}", self.0)
    }
}

impl From<u64> for Identifier {
    fn from(value: u64) -> Self {
        Identifier(BigUint::from(value) % ring_size())
    }
}

fn ring_size() -> BigUint {
    BigUint::from(1u8) << M
}

pub fn generate_id_hash(input: &str) -> Identifier {
    let mut hasher = Sha1::new();
    hasher.update(input.as_bytes());
    let hash = hasher.finalize();

    Identifier(BigUint::from_bytes_be(&hash))
}

/// Tests `x` against the circular interval `(l, r]`. `l == r` is the whole ring.
pub fn in_range(l: &Identifier, x: &Identifier, r: &Identifier) -> bool {
    match l.cmp(r) {
        std::cmp::Ordering::Less => l < x && x <= r,
        std::cmp::Ordering::Greater => !(r < x && x <= l),
        std::cmp::Ordering::Equal => true,
    }
}

/// Tests `x` against the circular interval `(l, r)`. `l == r` is the whole ring but `l`.
pub fn in_open_range(l: &Identifier, x: &Identifier, r: &Identifier) -> bool {
    x != r && in_range(l, x, r)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(v: u64) -> Identifier {
        Identifier::from(v)
    }

    #[test]
    fn test_generate_id_hash() -> Result<()> {
        let key = "127.0.0.1:4000";
        let hash = generate_id_hash(key);
        let hash_retry = generate_id_hash(key);

        assert_eq!(hash, hash_retry);
        assert_ne!(hash, generate_id_hash("127.0.0.1:4001"));
        assert!(hash.to_bytes().len() <= 20);
        Ok(())
    }

    #[test]
    fn test_known_digest() {
        // sha1("abc")
        let hash = generate_id_hash("abc");
        assert_eq!(hash.to_string(), "a9993e364706816aba3e25717850c26c9cd0d89d");
    }

    #[test]
    fn test_in_range_plain_interval() {
        assert!(in_range(&id(10), &id(11), &id(20)));
        assert!(in_range(&id(10), &id(20), &id(20)));
        assert!(!in_range(&id(10), &id(10), &id(20)));
        assert!(!in_range(&id(10), &id(21), &id(20)));
    }

    #[test]
    fn test_in_range_wraps_around() {
        assert!(in_range(&id(20), &id(25), &id(10)));
        assert!(in_range(&id(20), &id(3), &id(10)));
        assert!(in_range(&id(20), &id(10), &id(10)));
        assert!(!in_range(&id(20), &id(15), &id(10)));
        assert!(!in_range(&id(20), &id(20), &id(10)));
    }

    #[test]
    fn test_degenerate_interval_is_whole_ring() {
        assert!(in_range(&id(7), &id(7), &id(7)));
        assert!(in_range(&id(7), &id(1), &id(7)));
        assert!(!in_open_range(&id(7), &id(7), &id(7)));
        assert!(in_open_range(&id(7), &id(1), &id(7)));
    }

    #[test]
    fn test_in_open_range_excludes_right_end() {
        assert!(in_open_range(&id(10), &id(19), &id(20)));
        assert!(!in_open_range(&id(10), &id(20), &id(20)));
        assert!(in_open_range(&id(20), &id(0), &id(10)));
        assert!(!in_open_range(&id(20), &id(10), &id(10)));
    }

    #[test]
    fn test_offset_wraps_modulo_ring() -> Result<()> {
        assert_eq!(id(5).offset(0), id(6));
        assert_eq!(id(5).offset(3), id(13));

        let max = Identifier::from_bytes(&[0xff; 20])?;
        assert_eq!(max.offset(0), id(0));
        assert_eq!(max.offset(1), id(1));
        Ok(())
    }

    #[test]
    fn test_from_bytes_rejects_oversized() {
        assert!(Identifier::from_bytes(&[1; 21]).is_err());
        assert!(Identifier::from_bytes(&[]).is_ok());
    }
}
