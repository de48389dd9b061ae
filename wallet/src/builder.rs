//! Transaction builder
//!
//! Accumulates inputs and outputs in caller order, prices them with the
//! configured [`LinearFee`] and balances the result with a change output.
//!
//! `add_change_output` is meant to be the last mutation before
//! [`TransactionBuilder::finalize`]. The change value is computed once;
//! inputs or outputs added afterwards are accepted but leave the change
//! stale, and only `finalize` re-checks that the fee is still covered.
//!
//! A change output is never zero. When the leftover after paying the fee
//! for the extra output is exactly zero, `add_change_output` fails with
//! [`BuildError::FeeUnaffordable`] rather than skipping the change: the
//! caller gets no balanced transaction out of that call and should either
//! drop the change or add an input. Only a leftover of zero against the
//! current fee (no change output needed) returns `Ok(None)`.

use byron_core::{sum_coins, Coin, CoinError, ExtendedAddr, LinearFee, Tx, TxOut, TxoPointer};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BuildError {
    #[error("Coin error: {0}")]
    CoinError(#[from] CoinError),

    #[error("Input {0} already added")]
    DuplicateInput(TxoPointer),

    #[error("Insufficient funds: have {available}, need {required}")]
    InsufficientFunds { available: Coin, required: Coin },

    #[error("Leftover {leftover} cannot pay fee {fee} and a change output")]
    FeeUnaffordable { leftover: Coin, fee: Coin },

    #[error("Transaction has no inputs")]
    NoInputs,

    #[error("Transaction has no outputs")]
    NoOutputs,
}

/// Inputs minus outputs minus fee
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Balance {
    /// More input than needed; the surplus would go to the fee
    Positive(Coin),
    Zero,
    /// Missing value
    Negative(Coin),
}

#[derive(Debug, Clone, Default)]
pub struct TransactionBuilder {
    inputs: Vec<(TxoPointer, Coin)>,
    outputs: Vec<TxOut>,
    fee: LinearFee,
    change_added: bool,
}

impl TransactionBuilder {
    pub fn new(fee: LinearFee) -> Self {
        TransactionBuilder {
            inputs: Vec::new(),
            outputs: Vec::new(),
            fee,
            change_added: false,
        }
    }

    /// Spend `pointer`, which holds `value`.
    ///
    /// The value is trusted; it is only checked against the coin bound.
    pub fn add_input(&mut self, pointer: &TxoPointer, value: u64) -> Result<(), BuildError> {
        let value = Coin::new(value)?;
        if self.inputs.iter().any(|(existing, _)| existing == pointer) {
            return Err(BuildError::DuplicateInput(*pointer));
        }
        self.warn_if_balanced("input");
        self.inputs.push((*pointer, value));
        Ok(())
    }

    pub fn add_output(&mut self, output: TxOut) {
        self.warn_if_balanced("output");
        self.outputs.push(output);
    }

    pub fn inputs(&self) -> &[(TxoPointer, Coin)] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[TxOut] {
        &self.outputs
    }

    pub fn fee_policy(&self) -> &LinearFee {
        &self.fee
    }

    pub fn input_total(&self) -> Result<Coin, BuildError> {
        Ok(sum_coins(self.inputs.iter().map(|(_, value)| *value))?)
    }

    pub fn output_total(&self) -> Result<Coin, BuildError> {
        Ok(sum_coins(self.outputs.iter().map(|output| output.value))?)
    }

    /// Fee for the current inputs and outputs
    pub fn compute_fee(&self) -> Result<Coin, BuildError> {
        Ok(self.fee.estimate(self.inputs.len(), self.outputs.len())?)
    }

    pub fn balance(&self) -> Result<Balance, BuildError> {
        let available = self.input_total()?;
        let required = self.output_total()?.checked_add(self.compute_fee()?)?;
        Ok(if available > required {
            Balance::Positive(available.checked_sub(required)?)
        } else if available < required {
            Balance::Negative(required.checked_sub(available)?)
        } else {
            Balance::Zero
        })
    }

    /// Send the leftover value to `address`, paying for the extra output.
    ///
    /// Returns `Ok(None)` without adding anything when inputs already equal
    /// outputs plus fee, and the change value otherwise.
    pub fn add_change_output(&mut self, address: &ExtendedAddr) -> Result<Option<Coin>, BuildError> {
        let available = self.input_total()?;
        let outputs = self.output_total()?;
        let required = outputs.checked_add(self.compute_fee()?)?;

        if available < required {
            return Err(BuildError::InsufficientFunds {
                available,
                required,
            });
        }
        if available == required {
            log::debug!("Transaction already balanced, no change output");
            self.change_added = true;
            return Ok(None);
        }

        let leftover = available.checked_sub(outputs)?;
        let fee = self
            .fee
            .estimate(self.inputs.len(), self.outputs.len() + 1)?;
        let change = match leftover.checked_sub(fee) {
            Ok(change) if change > Coin::zero() => change,
            _ => return Err(BuildError::FeeUnaffordable { leftover, fee }),
        };

        self.outputs.push(TxOut::new(address.clone(), change));
        self.change_added = true;
        log::debug!("Added change output of {} (fee {})", change, fee);
        Ok(Some(change))
    }

    /// Freeze inputs and outputs into a transaction.
    pub fn finalize(self) -> Result<Tx, BuildError> {
        if self.inputs.is_empty() {
            return Err(BuildError::NoInputs);
        }
        if self.outputs.is_empty() {
            return Err(BuildError::NoOutputs);
        }

        let available = self.input_total()?;
        let fee = self.compute_fee()?;
        let required = self.output_total()?.checked_add(fee)?;
        if available < required {
            return Err(BuildError::InsufficientFunds {
                available,
                required,
            });
        }

        let tx = Tx::new(
            self.inputs.into_iter().map(|(pointer, _)| pointer).collect(),
            self.outputs,
        );
        log::debug!(
            "Finalized transaction {} with {} inputs, {} outputs, fee {}",
            tx.id(),
            tx.inputs.len(),
            tx.outputs.len(),
            available.checked_sub(required)?.checked_add(fee)?
        );
        Ok(tx)
    }

    fn warn_if_balanced(&self, what: &str) {
        if self.change_added {
            log::warn!(
                "Adding an {} after the change output; change is not recomputed",
                what
            );
        }
    }
}
