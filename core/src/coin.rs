//! Bounded coin amounts

use crate::cbor::{Encode, Encoder};
use std::fmt;
use thiserror::Error;

/// Maximum number of lovelace that can ever exist (45 billion ADA)
pub const MAX_COIN: u64 = 45_000_000_000_000_000;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoinError {
    #[error("Coin value {0} exceeds maximum 45000000000000000")]
    OutOfBound(u64),

    #[error("Coin arithmetic underflow: {left} - {right}")]
    Negative { left: u64, right: u64 },
}

/// Amount in lovelace; always within `0..=MAX_COIN`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Coin(u64);

impl Coin {
    pub fn new(value: u64) -> Result<Self, CoinError> {
        if value > MAX_COIN {
            return Err(CoinError::OutOfBound(value));
        }
        Ok(Self(value))
    }

    pub fn zero() -> Self {
        Self(0)
    }

    pub fn value(self) -> u64 {
        self.0
    }

    pub fn checked_add(self, other: Coin) -> Result<Coin, CoinError> {
        Coin::new(self.0.saturating_add(other.0))
    }

    pub fn checked_sub(self, other: Coin) -> Result<Coin, CoinError> {
        self.0
            .checked_sub(other.0)
            .map(Coin)
            .ok_or(CoinError::Negative {
                left: self.0,
                right: other.0,
            })
    }

    pub fn checked_mul(self, factor: u64) -> Result<Coin, CoinError> {
        Coin::new(self.0.saturating_mul(factor))
    }
}

impl TryFrom<u64> for Coin {
    type Error = CoinError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        Coin::new(value)
    }
}

impl From<Coin> for u64 {
    fn from(coin: Coin) -> u64 {
        coin.0
    }
}

impl fmt::Display for Coin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:06}", self.0 / 1_000_000, self.0 % 1_000_000)
    }
}

impl Encode for Coin {
    fn encode(&self, encoder: &mut Encoder) {
        encoder.write_unsigned_integer(self.0);
    }
}

/// Sum coins, failing on the first total above `MAX_COIN`
pub fn sum_coins<I>(coins: I) -> Result<Coin, CoinError>
where
    I: IntoIterator<Item = Coin>,
{
    coins
        .into_iter()
        .try_fold(Coin::zero(), |acc, coin| acc.checked_add(coin))
}
