//! Linear fee policy
//!
//! `fee = base + per_input * inputs + per_output * outputs`. The constants
//! are protocol policy and arrive through [`crate::config::NetworkConfig`].

use crate::coin::{Coin, CoinError};
use serde::{Deserialize, Serialize};

/// Fixed overhead of every transaction, in lovelace
pub const DEFAULT_FEE_BASE: u64 = 155_381;
/// Cost of one input together with its witness
pub const DEFAULT_FEE_PER_INPUT: u64 = 8_100;
/// Cost of one output
pub const DEFAULT_FEE_PER_OUTPUT: u64 = 3_600;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinearFee {
    #[serde(default = "default_base")]
    pub base: u64,

    #[serde(default = "default_per_input")]
    pub per_input: u64,

    #[serde(default = "default_per_output")]
    pub per_output: u64,
}

fn default_base() -> u64 {
    DEFAULT_FEE_BASE
}

fn default_per_input() -> u64 {
    DEFAULT_FEE_PER_INPUT
}

fn default_per_output() -> u64 {
    DEFAULT_FEE_PER_OUTPUT
}

impl Default for LinearFee {
    fn default() -> Self {
        LinearFee {
            base: default_base(),
            per_input: default_per_input(),
            per_output: default_per_output(),
        }
    }
}

impl LinearFee {
    pub fn new(base: u64, per_input: u64, per_output: u64) -> Self {
        Self {
            base,
            per_input,
            per_output,
        }
    }

    /// Fee for a transaction with the given number of inputs and outputs
    pub fn estimate(&self, inputs: usize, outputs: usize) -> Result<Coin, CoinError> {
        let base = Coin::new(self.base)?;
        let inputs_cost = Coin::new(self.per_input)?.checked_mul(inputs as u64)?;
        let outputs_cost = Coin::new(self.per_output)?.checked_mul(outputs as u64)?;
        base.checked_add(inputs_cost)?.checked_add(outputs_cost)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_formula() {
        let fee = LinearFee::new(10, 3, 2);
        assert_eq!(fee.estimate(0, 0).unwrap().value(), 10);
        assert_eq!(fee.estimate(2, 3).unwrap().value(), 10 + 6 + 6);
    }

    #[test]
    fn test_default_constants() {
        let fee = LinearFee::default();
        assert_eq!(
            fee.estimate(1, 2).unwrap().value(),
            DEFAULT_FEE_BASE + DEFAULT_FEE_PER_INPUT + 2 * DEFAULT_FEE_PER_OUTPUT
        );
    }

    #[test]
    fn test_overflow_is_error() {
        let fee = LinearFee::new(0, u64::MAX / 2, 0);
        assert!(fee.estimate(3, 0).is_err());
    }
}
