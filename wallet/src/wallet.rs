//! Wallet and account hierarchy
//!
//! Keys follow `m / 44' / 1815' / account' / chain / index`. The wallet
//! caches the key at `44'/1815'`; accounts are hardened children of it and
//! addresses are soft children of the account public key, so they can be
//! derived without touching private material.

use crate::keygen::generate_seed;
use crate::mnemonic::Entropy;
use byron_core::{ExtendedAddr, NetworkConfig, NetworkMagic};
use byron_crypto::{hardened, CryptoError, DerivationIndex, XPrv, XPub, HARDENED_OFFSET};
use std::collections::HashMap;
use thiserror::Error;

/// BIP-44 purpose `44'`
pub const BIP44_PURPOSE: DerivationIndex = 0x8000_002C;
/// Registered coin type `1815'`
pub const BIP44_COIN_TYPE: DerivationIndex = 0x8000_0717;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WalletError {
    #[error("Key derivation error: {0}")]
    CryptoError(#[from] CryptoError),

    #[error("Address range {from}+{count} reaches hardened indices")]
    IndexOverflow { from: u32, count: u32 },

    #[error("Unknown account: {0}")]
    UnknownAccount(String),
}

/// Which address chain of an account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressChain {
    /// Receiving addresses handed out to others
    External,
    /// Change addresses
    Internal,
}

impl AddressChain {
    pub fn index(self) -> DerivationIndex {
        match self {
            AddressChain::External => 0,
            AddressChain::Internal => 1,
        }
    }
}

/// HD wallet rooted at `44'/1815'`
#[derive(Debug)]
pub struct Wallet {
    root: XPrv,
    network_magic: NetworkMagic,
    accounts: HashMap<String, u32>,
}

impl Wallet {
    /// Create a mainnet wallet from entropy and a spending passphrase
    ///
    /// # Arguments
    /// * `entropy` - Wallet entropy, e.g. recovered from a mnemonic
    /// * `passphrase` - Passphrase mixed into the seed (empty is allowed)
    ///
    /// # Example
    /// ```
    /// use byron_wallet::{entropy_from_mnemonic, AddressChain, Wallet};
    ///
    /// let entropy = entropy_from_mnemonic(
    ///     "abandon abandon abandon abandon abandon abandon \
    ///      abandon abandon abandon abandon abandon about",
    /// )
    /// .unwrap();
    /// let mut wallet = Wallet::new(&entropy, b"");
    /// let account = wallet.create_account("savings", 0);
    /// let addresses = account
    ///     .generate_addresses(AddressChain::External, 0, 3)
    ///     .unwrap();
    /// assert_eq!(addresses.len(), 3);
    /// ```
    pub fn new(entropy: &Entropy, passphrase: &[u8]) -> Self {
        Self::with_network(entropy, passphrase, NetworkMagic::NoMagic)
    }

    /// Create a wallet whose addresses carry `network_magic`
    pub fn with_network(
        entropy: &Entropy,
        passphrase: &[u8],
        network_magic: NetworkMagic,
    ) -> Self {
        let seed = generate_seed(entropy, passphrase);
        let root = seed
            .to_root_key()
            .derive_path(&[BIP44_PURPOSE, BIP44_COIN_TYPE]);

        log::debug!(
            "Created wallet from {}-word entropy, network magic {:?}",
            entropy.mnemonic_type().word_count(),
            network_magic
        );

        Wallet {
            root,
            network_magic,
            accounts: HashMap::new(),
        }
    }

    /// Create a wallet for the network described by `config`
    pub fn from_config(
        entropy: &Entropy,
        passphrase: &[u8],
        config: &NetworkConfig,
    ) -> Self {
        Self::with_network(entropy, passphrase, config.network_magic)
    }

    pub fn network_magic(&self) -> NetworkMagic {
        self.network_magic
    }

    /// Derive the account at hardened `index` and record `alias` for it.
    ///
    /// Aliases are labels only: the same index may be created under several
    /// aliases, and re-using an alias points it at the new index.
    pub fn create_account(&mut self, alias: &str, index: u32) -> Account {
        let account = self.derive_account(alias, index);
        if let Some(previous) = self.accounts.insert(alias.to_string(), index) {
            if previous != index {
                log::debug!(
                    "Account alias '{}' moved from index {} to {}",
                    alias,
                    previous,
                    index
                );
            }
        }
        account
    }

    /// Re-derive a previously created account by alias
    pub fn account(&self, alias: &str) -> Result<Account, WalletError> {
        let index = self
            .accounts
            .get(alias)
            .copied()
            .ok_or_else(|| WalletError::UnknownAccount(alias.to_string()))?;
        Ok(self.derive_account(alias, index))
    }

    /// Known aliases and their account indices
    pub fn accounts(&self) -> impl Iterator<Item = (&str, u32)> + '_ {
        self.accounts
            .iter()
            .map(|(alias, index)| (alias.as_str(), *index))
    }

    fn derive_account(&self, alias: &str, index: u32) -> Account {
        let xprv = self.root.derive(hardened(index));
        log::debug!("Derived account '{}' at index {}'", alias, index);
        Account {
            alias: alias.to_string(),
            index,
            xprv,
            network_magic: self.network_magic,
        }
    }
}

/// One account of a wallet
#[derive(Debug, Clone)]
pub struct Account {
    alias: String,
    index: u32,
    xprv: XPrv,
    network_magic: NetworkMagic,
}

impl Account {
    pub fn alias(&self) -> &str {
        &self.alias
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn public(&self) -> XPub {
        self.xprv.public()
    }

    /// Addresses `from_index..from_index + count` of `chain`, in order.
    ///
    /// Derived from the account public key only; calling twice with the same
    /// arguments yields the same addresses.
    pub fn generate_addresses(
        &self,
        chain: AddressChain,
        from_index: u32,
        count: u32,
    ) -> Result<Vec<ExtendedAddr>, WalletError> {
        let end = check_range(from_index, count)?;
        let chain_key = self.public().derive(chain.index())?;

        (from_index..end)
            .map(|index| -> Result<ExtendedAddr, WalletError> {
                let key = chain_key.derive(index)?;
                let address = ExtendedAddr::new_simple(&key, self.network_magic);
                log::trace!(
                    "Account '{}' {:?}/{}: {}",
                    self.alias,
                    chain,
                    index,
                    address
                );
                Ok(address)
            })
            .collect()
    }

    /// Signing key for the address at `chain/index`
    pub fn address_xprv(&self, chain: AddressChain, index: u32) -> Result<XPrv, WalletError> {
        check_range(index, 1)?;
        Ok(self.xprv.derive_path(&[chain.index(), index]))
    }
}

/// End of a soft index range, which must stay below `2^31`
fn check_range(from: u32, count: u32) -> Result<u32, WalletError> {
    from.checked_add(count)
        .filter(|end| *end <= HARDENED_OFFSET)
        .ok_or(WalletError::IndexOverflow { from, count })
}
