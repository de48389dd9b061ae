//! Network configuration
//!
//! The protocol magic (mixed into every witness), the network magic
//! (address attribute distinguishing test networks) and the fee policy
//! vary by deployment, so they are loaded from a TOML file rather than
//! compiled in.
//!
//! Example:
//! ```toml
//! protocol_magic = 1097911063
//! network_magic = 1097911063
//!
//! [fee]
//! base = 155381
//! per_input = 8100
//! per_output = 3600
//! ```

use crate::cbor::{Encode, Encoder};
use crate::fee::LinearFee;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;
use thiserror::Error;

pub const MAINNET_PROTOCOL_MAGIC: u32 = 764_824_073;
pub const TESTNET_PROTOCOL_MAGIC: u32 = 1_097_911_063;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] toml::ser::Error),
}

/// Network identifier signed into every transaction witness
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProtocolMagic(u32);

impl ProtocolMagic {
    pub fn new(magic: u32) -> Self {
        Self(magic)
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for ProtocolMagic {
    fn default() -> Self {
        Self(MAINNET_PROTOCOL_MAGIC)
    }
}

impl From<u32> for ProtocolMagic {
    fn from(magic: u32) -> Self {
        Self(magic)
    }
}

impl fmt::Display for ProtocolMagic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Encode for ProtocolMagic {
    fn encode(&self, encoder: &mut Encoder) {
        encoder.write_unsigned_integer(u64::from(self.0));
    }
}

/// Address discriminator; mainnet addresses carry no magic at all
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "Option<u32>", into = "Option<u32>")]
pub enum NetworkMagic {
    #[default]
    NoMagic,
    Magic(u32),
}

impl From<Option<u32>> for NetworkMagic {
    fn from(magic: Option<u32>) -> Self {
        match magic {
            Some(magic) => NetworkMagic::Magic(magic),
            None => NetworkMagic::NoMagic,
        }
    }
}

impl From<NetworkMagic> for Option<u32> {
    fn from(magic: NetworkMagic) -> Self {
        match magic {
            NetworkMagic::NoMagic => None,
            NetworkMagic::Magic(magic) => Some(magic),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkConfig {
    #[serde(default)]
    pub protocol_magic: ProtocolMagic,

    #[serde(default)]
    pub network_magic: NetworkMagic,

    #[serde(default)]
    pub fee: LinearFee,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self::mainnet()
    }
}

impl NetworkConfig {
    pub fn mainnet() -> Self {
        NetworkConfig {
            protocol_magic: ProtocolMagic::new(MAINNET_PROTOCOL_MAGIC),
            network_magic: NetworkMagic::NoMagic,
            fee: LinearFee::default(),
        }
    }

    pub fn testnet() -> Self {
        NetworkConfig {
            protocol_magic: ProtocolMagic::new(TESTNET_PROTOCOL_MAGIC),
            network_magic: NetworkMagic::Magic(TESTNET_PROTOCOL_MAGIC),
            fee: LinearFee::default(),
        }
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string(self)?)
    }

    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path.as_ref())?;
        let config = Self::from_toml_str(&contents)?;
        log::debug!(
            "Loaded network config from {}: protocol magic {}",
            path.as_ref().display(),
            config.protocol_magic
        );
        Ok(config)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        fs::write(path, self.to_toml_string()?)?;
        Ok(())
    }
}
