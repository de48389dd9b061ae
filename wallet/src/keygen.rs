//! Seed and root key generation

use crate::mnemonic::Entropy;
use byron_crypto::{XPrv, XPRV_SIZE};
use pbkdf2::pbkdf2_hmac;
use sha2::Sha512;
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

pub const SEED_SIZE: usize = XPRV_SIZE;

const PBKDF2_ITERATIONS: u32 = 4096;

/// Root key material stretched from entropy and passphrase
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct Seed([u8; SEED_SIZE]);

impl Seed {
    pub fn as_bytes(&self) -> &[u8; SEED_SIZE] {
        &self.0
    }

    /// Clamp the seed into the root extended private key
    pub fn to_root_key(&self) -> XPrv {
        XPrv::normalize_bytes(self.0)
    }
}

impl fmt::Debug for Seed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Seed(..)")
    }
}

/// PBKDF2-HMAC-SHA512 with the passphrase as key and the entropy as salt
///
/// # Arguments
/// * `entropy` - Wallet entropy, usually recovered from a mnemonic
/// * `passphrase` - Spending password; may be empty
pub fn generate_seed(entropy: &Entropy, passphrase: &[u8]) -> Seed {
    let mut seed = [0u8; SEED_SIZE];
    pbkdf2_hmac::<Sha512>(passphrase, entropy.as_bytes(), PBKDF2_ITERATIONS, &mut seed);
    Seed(seed)
}

pub fn root_key_from_seed(seed: &Seed) -> XPrv {
    seed.to_root_key()
}
