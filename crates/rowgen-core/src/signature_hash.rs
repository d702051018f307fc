//! Deterministic hash-based function signature identity.
//!
//! [`SignatureHash`] is a 64-bit hash of a function's lowercase name and its
//! ordered argument types. The registry keys overloads by it, so two
//! registrations of the same signature collide regardless of order.
//!
//! ```
//! use rowgen_core::{SignatureHash, SqlType};
//!
//! let a = SignatureHash::from_signature("plus", &[SqlType::Bigint, SqlType::Bigint]);
//! let b = SignatureHash::from_signature("PLUS", &[SqlType::Bigint, SqlType::Bigint]);
//! let c = SignatureHash::from_signature("plus", &[SqlType::Double, SqlType::Double]);
//! assert_eq!(a, b);
//! assert_ne!(a, c);
//! ```

use std::fmt;

use xxhash_rust::xxh64::xxh64;

use crate::SqlType;

/// Domain-specific mixing constants.
mod hash_constants {
    /// Seed for the function name.
    pub const FUNCTION: u64 = 0x5ea77ffbcdf5f302;

    /// Seed for each argument position; the position is added so that
    /// argument order matters.
    pub const ARGUMENT: u64 = 0x9e3779b97f4a7c15;
}

/// A deterministic 64-bit hash of a function signature.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct SignatureHash(pub u64);

impl SignatureHash {
    /// Hash a function name together with its argument types.
    ///
    /// Names are case-insensitive.
    pub fn from_signature(name: &str, argument_types: &[SqlType]) -> Self {
        let name = name.to_ascii_lowercase();
        let mut hash = xxh64(name.as_bytes(), hash_constants::FUNCTION);
        for (position, ty) in argument_types.iter().enumerate() {
            let seed = hash_constants::ARGUMENT.wrapping_add(position as u64);
            let mut bytes = [0u8; 16];
            bytes[..8].copy_from_slice(&hash.to_le_bytes());
            bytes[8..].copy_from_slice(&xxh64(ty.name().as_bytes(), seed).to_le_bytes());
            hash = xxh64(&bytes, seed);
        }
        SignatureHash(hash)
    }
}

impl fmt::Debug for SignatureHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SignatureHash({:#018x})", self.0)
    }
}

impl fmt::Display for SignatureHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn argument_order_matters() {
        let a = SignatureHash::from_signature("f", &[SqlType::Bigint, SqlType::Varchar]);
        let b = SignatureHash::from_signature("f", &[SqlType::Varchar, SqlType::Bigint]);
        assert_ne!(a, b);
    }

    #[test]
    fn arity_matters() {
        let none = SignatureHash::from_signature("f", &[]);
        let one = SignatureHash::from_signature("f", &[SqlType::Bigint]);
        assert_ne!(none, one);
    }

    #[test]
    fn deterministic() {
        let a = SignatureHash::from_signature("concat", &[SqlType::Varchar; 2]);
        let b = SignatureHash::from_signature("concat", &[SqlType::Varchar; 2]);
        assert_eq!(a, b);
    }
}
