//! Byron Wallet
//!
//! Hierarchical deterministic wallet for Byron-era addresses:
//! - BIP-39 style mnemonics, including legacy 9-word phrases
//! - PBKDF2 seed stretching and `44'/1815'/account'/chain/index` key trees
//! - Transaction building with a linear fee and change output
//! - Positional witness signing into a broadcastable signed transaction

pub mod builder;
pub mod finalize;
pub mod keygen;
pub mod mnemonic;
pub mod wallet;

pub use builder::{Balance, BuildError, TransactionBuilder};
pub use finalize::{FinalizeError, TransactionFinalized};
pub use keygen::{generate_seed, root_key_from_seed, Seed, SEED_SIZE};
pub use mnemonic::{
    entropy_from_mnemonic, entropy_from_random, generate_entropy, mnemonic_from_entropy, Entropy,
    MnemonicError, MnemonicIndex, MnemonicIndexes, MnemonicType,
};
pub use wallet::{Account, AddressChain, Wallet, WalletError, BIP44_COIN_TYPE, BIP44_PURPOSE};
