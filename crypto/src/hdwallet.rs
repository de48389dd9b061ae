//! BIP32-Ed25519 hierarchical deterministic keys.
//!
//! Keys follow the V2 derivation scheme: child indices are serialized
//! little-endian and the left half of the secret is advanced by
//! `8 * ZL[0..28]`, so every derived scalar keeps the ed25519 clamping
//! properties without re-hashing.

use crate::CryptoError;
use curve25519_dalek::constants::ED25519_BASEPOINT_TABLE;
use curve25519_dalek::edwards::CompressedEdwardsY;
use curve25519_dalek::scalar::Scalar;
use ed25519_dalek::hazmat::{raw_sign, ExpandedSecretKey};
use ed25519_dalek::{Verifier, VerifyingKey};
use hmac::{Hmac, Mac};
use sha2::Sha512;
use std::fmt;
use zeroize::Zeroize;

type HmacSha512 = Hmac<Sha512>;

/// Extended secret key (64 bytes) followed by a chain code (32 bytes)
pub const XPRV_SIZE: usize = 96;
/// Public point (32 bytes) followed by a chain code (32 bytes)
pub const XPUB_SIZE: usize = 64;
pub const PUBLIC_KEY_SIZE: usize = 32;
pub const CHAIN_CODE_SIZE: usize = 32;
pub const SIGNATURE_SIZE: usize = 64;

pub type DerivationIndex = u32;

/// Indices at or above this offset are hardened
pub const HARDENED_OFFSET: DerivationIndex = 0x8000_0000;

pub fn is_hardened(index: DerivationIndex) -> bool {
    index >= HARDENED_OFFSET
}

pub fn hardened(index: DerivationIndex) -> DerivationIndex {
    index | HARDENED_OFFSET
}

/// HD wallet extended private key.
///
/// Effectively an ed25519 extended secret key (`kL || kR`) followed by a
/// chain code. The bytes are wiped when the value is dropped.
#[derive(Clone)]
pub struct XPrv([u8; XPRV_SIZE]);

impl XPrv {
    /// Build a root key from 96 bytes of seed material.
    ///
    /// Clears the lowest three bits and the highest bit of `kL`, sets the
    /// second highest and clears the third highest. The result is always a
    /// valid extended key.
    pub fn normalize_bytes(mut bytes: [u8; XPRV_SIZE]) -> Self {
        bytes[0] &= 0b1111_1000;
        bytes[31] &= 0b0001_1111;
        bytes[31] |= 0b0100_0000;
        let xprv = Self(bytes);
        bytes.zeroize();
        xprv
    }

    /// Import an extended key, checking the scalar bits a derived key keeps.
    pub fn from_bytes(bytes: [u8; XPRV_SIZE]) -> Result<Self, CryptoError> {
        if bytes[0] & 0b0000_0111 != 0 {
            return Err(CryptoError::InvalidKeyEncoding(
                "lowest 3 bits of the scalar must be cleared".to_string(),
            ));
        }
        if bytes[31] & 0b1000_0000 != 0 {
            return Err(CryptoError::InvalidKeyEncoding(
                "highest bit of the scalar must be cleared".to_string(),
            ));
        }
        Ok(Self(bytes))
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, CryptoError> {
        if bytes.len() != XPRV_SIZE {
            return Err(CryptoError::InvalidKeyEncoding(format!(
                "expected {} bytes, got {}",
                XPRV_SIZE,
                bytes.len()
            )));
        }
        let mut buf = [0u8; XPRV_SIZE];
        buf.copy_from_slice(bytes);
        let xprv = Self::from_bytes(buf);
        buf.zeroize();
        xprv
    }

    pub fn as_bytes(&self) -> &[u8; XPRV_SIZE] {
        &self.0
    }

    pub fn chain_code(&self) -> &[u8] {
        &self.0[64..]
    }

    /// Get the associated extended public key
    pub fn public(&self) -> XPub {
        let mut out = [0u8; XPUB_SIZE];
        out[..32].copy_from_slice(&mk_public_key(&self.0[..32]));
        out[32..].copy_from_slice(self.chain_code());
        XPub(out)
    }

    /// Derive the child key at `index`; hardened when `index >= 2^31`.
    pub fn derive(&self, index: DerivationIndex) -> Self {
        let kl = &self.0[..32];
        let kr = &self.0[32..64];
        let cc = self.chain_code();

        let (mut z, i) = if is_hardened(index) {
            let ekey = &self.0[..64];
            (
                hmac_sha512(cc, 0x00, ekey, index),
                hmac_sha512(cc, 0x01, ekey, index),
            )
        } else {
            let pk = mk_public_key(kl);
            (
                hmac_sha512(cc, 0x02, &pk, index),
                hmac_sha512(cc, 0x03, &pk, index),
            )
        };

        let mut out = [0u8; XPRV_SIZE];
        out[..32].copy_from_slice(&add_28_mul8(kl, &z[..32]));
        out[32..64].copy_from_slice(&add_256bits(kr, &z[32..]));
        out[64..].copy_from_slice(&i[32..]);
        z.zeroize();

        let child = Self(out);
        out.zeroize();
        child
    }

    /// Derive along a path of indices, starting from this key.
    pub fn derive_path(&self, path: &[DerivationIndex]) -> Self {
        path.iter()
            .fold(self.clone(), |key, index| key.derive(*index))
    }

    /// Sign a message with the extended secret.
    ///
    /// The nonce prefix is `kR`, so signatures are deterministic and verify
    /// against `self.public()` with plain ed25519.
    pub fn sign(&self, message: &[u8]) -> Signature {
        let mut scalar_bytes = [0u8; 32];
        let mut hash_prefix = [0u8; 32];
        scalar_bytes.copy_from_slice(&self.0[..32]);
        hash_prefix.copy_from_slice(&self.0[32..64]);

        let esk = ExpandedSecretKey {
            scalar: Scalar::from_bytes_mod_order(scalar_bytes),
            hash_prefix,
        };
        scalar_bytes.zeroize();
        hash_prefix.zeroize();

        let verifying_key = VerifyingKey::from(&esk);
        Signature(raw_sign::<Sha512>(&esk, message, &verifying_key).to_bytes())
    }
}

impl Drop for XPrv {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

impl fmt::Debug for XPrv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("XPrv")
            .field("public", &self.public())
            .finish_non_exhaustive()
    }
}

/// Extended public key (point + chain code)
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct XPub([u8; XPUB_SIZE]);

impl XPub {
    pub fn from_bytes(bytes: [u8; XPUB_SIZE]) -> Self {
        Self(bytes)
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, CryptoError> {
        let bytes: [u8; XPUB_SIZE] = bytes.try_into().map_err(|_| {
            CryptoError::InvalidKeyEncoding(format!(
                "expected {} bytes, got {}",
                XPUB_SIZE,
                bytes.len()
            ))
        })?;
        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; XPUB_SIZE] {
        &self.0
    }

    pub fn public_key(&self) -> [u8; PUBLIC_KEY_SIZE] {
        let mut pk = [0u8; PUBLIC_KEY_SIZE];
        pk.copy_from_slice(&self.0[..32]);
        pk
    }

    pub fn chain_code(&self) -> &[u8] {
        &self.0[32..]
    }

    /// Soft derivation from the public key alone.
    ///
    /// Hardened indices need the private key and are rejected.
    pub fn derive(&self, index: DerivationIndex) -> Result<Self, CryptoError> {
        if is_hardened(index) {
            return Err(CryptoError::ExpectedSoftDerivation(index));
        }

        let pk = &self.0[..32];
        let cc = self.chain_code();
        let z = hmac_sha512(cc, 0x02, pk, index);
        let i = hmac_sha512(cc, 0x03, pk, index);

        let parent = CompressedEdwardsY(self.public_key())
            .decompress()
            .ok_or(CryptoError::InvalidPublicKey)?;
        let tweak = Scalar::from_bytes_mod_order(add_28_mul8(&[0u8; 32], &z[..32]));
        let child = parent + &*ED25519_BASEPOINT_TABLE * &tweak;

        let mut out = [0u8; XPUB_SIZE];
        out[..32].copy_from_slice(&child.compress().to_bytes());
        out[32..].copy_from_slice(&i[32..]);
        Ok(Self(out))
    }

    /// Verify an ed25519 signature made with the matching `XPrv`
    pub fn verify(&self, message: &[u8], signature: &Signature) -> bool {
        let Ok(verifying_key) = VerifyingKey::from_bytes(&self.public_key()) else {
            return false;
        };
        let signature = ed25519_dalek::Signature::from_bytes(&signature.0);
        verifying_key.verify(message, &signature).is_ok()
    }
}

impl fmt::Display for XPub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl fmt::Debug for XPub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "XPub({})", hex::encode(self.0))
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Signature([u8; SIGNATURE_SIZE]);

impl Signature {
    pub fn from_bytes(bytes: [u8; SIGNATURE_SIZE]) -> Self {
        Self(bytes)
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, CryptoError> {
        let bytes: [u8; SIGNATURE_SIZE] = bytes
            .try_into()
            .map_err(|_| CryptoError::InvalidSignature(bytes.len()))?;
        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; SIGNATURE_SIZE] {
        &self.0
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({})", hex::encode(self.0))
    }
}

fn hmac_sha512(key: &[u8], tag: u8, material: &[u8], index: DerivationIndex) -> [u8; 64] {
    let mut mac = HmacSha512::new_from_slice(key).expect("HMAC accepts any key length");
    mac.update(&[tag]);
    mac.update(material);
    mac.update(&index.to_le_bytes());

    let mut out = [0u8; 64];
    out.copy_from_slice(&mac.finalize().into_bytes());
    out
}

/// `A = kL * B`, without the SHA-512 expansion of plain ed25519 seeds
fn mk_public_key(kl: &[u8]) -> [u8; PUBLIC_KEY_SIZE] {
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(kl);
    let scalar = Scalar::from_bytes_mod_order(bytes);
    bytes.zeroize();
    (&*ED25519_BASEPOINT_TABLE * &scalar).compress().to_bytes()
}

/// `x + 8 * y[0..28]` as little-endian 256-bit integers
fn add_28_mul8(x: &[u8], y: &[u8]) -> [u8; 32] {
    let mut out = [0u8; 32];
    let mut carry: u16 = 0;
    for (i, byte) in out.iter_mut().enumerate() {
        let shifted = if i < 28 { u16::from(y[i]) << 3 } else { 0 };
        let r = u16::from(x[i]) + shifted + carry;
        *byte = (r & 0xff) as u8;
        carry = r >> 8;
    }
    out
}

/// `x + y mod 2^256` as little-endian integers
fn add_256bits(x: &[u8], y: &[u8]) -> [u8; 32] {
    let mut out = [0u8; 32];
    let mut carry: u16 = 0;
    for (i, byte) in out.iter_mut().enumerate() {
        let r = u16::from(x[i]) + u16::from(y[i]) + carry;
        *byte = (r & 0xff) as u8;
        carry = r >> 8;
    }
    out
}
