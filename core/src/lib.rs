//! Byron Wallet Core Library
//!
//! Wire types shared by the wallet: the CBOR codec, bounded coin values,
//! network configuration, addresses and transactions.

pub mod address;
pub mod cbor;
pub mod coin;
pub mod config;
pub mod fee;
pub mod transaction;

// Re-export main types
pub use address::{is_valid_address, AddrType, AddressError, Attributes, ExtendedAddr};
pub use cbor::{CborError, Encode};
pub use coin::{sum_coins, Coin, CoinError, MAX_COIN};
pub use config::{
    ConfigError, NetworkConfig, NetworkMagic, ProtocolMagic, MAINNET_PROTOCOL_MAGIC,
    TESTNET_PROTOCOL_MAGIC,
};
pub use fee::LinearFee;
pub use transaction::{
    witness_message, TransactionError, Tx, TxAux, TxId, TxInWitness, TxOut, TxoPointer,
};
