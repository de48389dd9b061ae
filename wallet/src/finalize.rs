//! Witness signing
//!
//! Witnesses are positional: the witness at position `i` authorizes input
//! `i` of the transaction. Nothing here reorders or tags them, so callers
//! must add them in exactly the order the inputs were added to the builder.
//! A witness added for the wrong input still produces a well-formed signed
//! transaction, which the network will then reject.

use byron_core::{ProtocolMagic, Tx, TxAux, TxId, TxInWitness};
use byron_crypto::{CryptoError, XPrv};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FinalizeError {
    #[error("Invalid signing key: {0}")]
    CryptoError(#[from] CryptoError),

    #[error("Transaction has {inputs} inputs and all are already witnessed")]
    TooManyWitnesses { inputs: usize },

    #[error("Expected {expected} witnesses, got {actual}")]
    IncompleteWitnesses { expected: usize, actual: usize },
}

/// A finalized transaction collecting its witnesses
#[derive(Debug, Clone)]
pub struct TransactionFinalized {
    tx: Tx,
    id: TxId,
    witnesses: Vec<TxInWitness>,
}

impl TransactionFinalized {
    pub fn new(tx: Tx) -> Self {
        let id = tx.id();
        let witnesses = Vec::with_capacity(tx.inputs.len());
        TransactionFinalized { tx, id, witnesses }
    }

    pub fn tx(&self) -> &Tx {
        &self.tx
    }

    pub fn id(&self) -> TxId {
        self.id
    }

    pub fn witnesses(&self) -> &[TxInWitness] {
        &self.witnesses
    }

    pub fn is_complete(&self) -> bool {
        self.witnesses.len() == self.tx.inputs.len()
    }

    /// Sign `txid` under `protocol_magic` and append the witness for the
    /// next input.
    ///
    /// # Arguments
    /// * `key` - Private key owning the next unwitnessed input
    /// * `protocol_magic` - Network identifier mixed into the signed message
    /// * `txid` - Id of the transaction being signed, normally `self.id()`
    pub fn add_witness(
        &mut self,
        key: &XPrv,
        protocol_magic: ProtocolMagic,
        txid: &TxId,
    ) -> Result<(), FinalizeError> {
        if self.is_complete() {
            return Err(FinalizeError::TooManyWitnesses {
                inputs: self.tx.inputs.len(),
            });
        }
        if *txid != self.id {
            log::warn!(
                "Witness signs {} but the transaction id is {}",
                txid,
                self.id
            );
        }

        self.witnesses
            .push(TxInWitness::new(key, protocol_magic, txid));
        log::debug!(
            "Added witness {}/{} for {}",
            self.witnesses.len(),
            self.tx.inputs.len(),
            self.id
        );
        Ok(())
    }

    /// Same as [`add_witness`](Self::add_witness) with the key as 96 raw bytes
    pub fn add_witness_bytes(
        &mut self,
        key: &[u8],
        protocol_magic: ProtocolMagic,
        txid: &TxId,
    ) -> Result<(), FinalizeError> {
        let key = XPrv::from_slice(key)?;
        self.add_witness(&key, protocol_magic, txid)
    }

    /// The signed transaction, once every input has its witness
    pub fn output(self) -> Result<TxAux, FinalizeError> {
        if !self.is_complete() {
            return Err(FinalizeError::IncompleteWitnesses {
                expected: self.tx.inputs.len(),
                actual: self.witnesses.len(),
            });
        }
        Ok(TxAux::new(self.tx, self.witnesses))
    }
}
