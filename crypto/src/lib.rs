//! Byron Wallet Cryptography
//!
//! Extended ed25519 keys, child key derivation, signatures and the
//! hash functions used for address roots and transaction ids.

pub mod hdwallet;

pub use hdwallet::{
    hardened, is_hardened, DerivationIndex, Signature, XPrv, XPub, CHAIN_CODE_SIZE,
    HARDENED_OFFSET, PUBLIC_KEY_SIZE, SIGNATURE_SIZE, XPRV_SIZE, XPUB_SIZE,
};

use blake2::digest::consts::{U28, U32};
use blake2::{Blake2b, Digest};
use sha3::Sha3_256;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    #[error("Invalid key encoding: {0}")]
    InvalidKeyEncoding(String),

    #[error("Invalid signature encoding: expected 64 bytes, got {0}")]
    InvalidSignature(usize),

    #[error("Invalid public key")]
    InvalidPublicKey,

    #[error("Hardened index {0:#010x} cannot be derived from a public key")]
    ExpectedSoftDerivation(DerivationIndex),
}

pub type Blake2b224 = Blake2b<U28>;
pub type Blake2b256 = Blake2b<U32>;

/// Hash data with Blake2b-224 (address roots)
pub fn hash_blake2b224(data: &[u8]) -> [u8; 28] {
    let mut out = [0u8; 28];
    out.copy_from_slice(&Blake2b224::digest(data));
    out
}

/// Hash data with Blake2b-256 (transaction ids)
pub fn hash_blake2b256(data: &[u8]) -> [u8; 32] {
    let mut out = [0u8; 32];
    out.copy_from_slice(&Blake2b256::digest(data));
    out
}

/// Hash data with SHA3-256
pub fn hash_sha3_256(data: &[u8]) -> [u8; 32] {
    let mut out = [0u8; 32];
    out.copy_from_slice(&Sha3_256::digest(data));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blake2b256_empty() {
        assert_eq!(
            hex::encode(hash_blake2b256(b"")),
            "0e5751c026e543b2e8ab2eb06099daa1d1e5df47778f7787faab45cdf12fe3a8"
        );
    }

    #[test]
    fn test_blake2b224_length_and_determinism() {
        let a = hash_blake2b224(b"byron");
        let b = hash_blake2b224(b"byron");
        assert_eq!(a, b);
        assert_ne!(a, hash_blake2b224(b"shelley"));
    }

    #[test]
    fn test_sha3_256_empty() {
        assert_eq!(
            hex::encode(hash_sha3_256(b"")),
            "a7ffc6f8bf1ed76651c14756a061d662f580ff4de43b49fa82d80a4b80f8434a"
        );
    }
}
