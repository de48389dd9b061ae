//! Transaction structures and types
//!
//! Layouts follow the Byron wire format:
//!
//! - input: `[0, tag24(cbor([txid, index]))]`
//! - output: `[address, coin]`
//! - tx: `[indef[input...], indef[output...], {}]`
//! - witness: `[0, tag24(cbor([xpub, signature]))]`
//! - signed tx: `[tx, [witness...]]`

use crate::address::{AddressError, ExtendedAddr};
use crate::cbor::{CborError, Decoder, Encode, Encoder, Len};
use crate::coin::{Coin, CoinError};
use crate::config::ProtocolMagic;
use byron_crypto::{hash_blake2b256, Signature, XPrv, XPub};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub const TX_ID_SIZE: usize = 32;

const INPUT_TYPE_UTXO: u64 = 0;
const WITNESS_TYPE_PUBKEY: u64 = 0;
/// Signing tag prepended to every transaction witness message
const SIGN_TAG_TX: u64 = 1;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransactionError {
    #[error("Invalid transaction encoding: {0}")]
    Cbor(#[from] CborError),

    #[error("Invalid address in output: {0}")]
    Address(#[from] AddressError),

    #[error("Invalid output value: {0}")]
    Coin(#[from] CoinError),

    #[error("Invalid transaction id length: {0}")]
    InvalidTxIdLength(usize),

    #[error("Invalid transaction id: {0}")]
    InvalidHex(String),

    #[error("Unsupported input type: {0}")]
    UnsupportedInputType(u64),
}

/// Blake2b-256 hash of a transaction's CBOR encoding
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TxId([u8; TX_ID_SIZE]);

impl TxId {
    pub fn new(bytes: [u8; TX_ID_SIZE]) -> Self {
        TxId(bytes)
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, TransactionError> {
        let bytes: [u8; TX_ID_SIZE] = bytes
            .try_into()
            .map_err(|_| TransactionError::InvalidTxIdLength(bytes.len()))?;
        Ok(TxId(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; TX_ID_SIZE] {
        &self.0
    }
}

impl fmt::Display for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl fmt::Debug for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TxId({})", hex::encode(self.0))
    }
}

impl FromStr for TxId {
    type Err = TransactionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s).map_err(|e| TransactionError::InvalidHex(e.to_string()))?;
        Self::from_slice(&bytes)
    }
}

impl Encode for TxId {
    fn encode(&self, encoder: &mut Encoder) {
        encoder.write_bytes(&self.0);
    }
}

/// Reference to an output of a previous transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TxoPointer {
    pub id: TxId,
    pub index: u32,
}

impl TxoPointer {
    pub fn new(id: TxId, index: u32) -> Self {
        TxoPointer { id, index }
    }

    fn decode(d: &mut Decoder<'_>) -> Result<Self, TransactionError> {
        d.array_of(2)?;
        let input_type = d.unsigned_integer()?;
        if input_type != INPUT_TYPE_UTXO {
            return Err(TransactionError::UnsupportedInputType(input_type));
        }
        let mut inner = Decoder::new(d.encoded_cbor()?);
        inner.array_of(2)?;
        let id = TxId::from_slice(inner.bytes()?)?;
        let index = inner.u32()?;
        inner.finish()?;
        Ok(TxoPointer { id, index })
    }
}

/// The `[txid, index]` body wrapped inside an input
struct PointerBody<'a>(&'a TxoPointer);

impl Encode for PointerBody<'_> {
    fn encode(&self, encoder: &mut Encoder) {
        encoder
            .write_array(Len::Len(2))
            .encode(&self.0.id)
            .write_unsigned_integer(u64::from(self.0.index));
    }
}

impl Encode for TxoPointer {
    fn encode(&self, encoder: &mut Encoder) {
        encoder
            .write_array(Len::Len(2))
            .write_unsigned_integer(INPUT_TYPE_UTXO)
            .write_encoded_cbor(&PointerBody(self));
    }
}

impl fmt::Display for TxoPointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.id, self.index)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TxOut {
    pub address: ExtendedAddr,
    pub value: Coin,
}

impl TxOut {
    pub fn new(address: ExtendedAddr, value: Coin) -> Self {
        TxOut { address, value }
    }

    fn decode(d: &mut Decoder<'_>) -> Result<Self, TransactionError> {
        d.array_of(2)?;
        let address = ExtendedAddr::decode(d)?;
        let value = Coin::new(d.unsigned_integer()?)?;
        Ok(TxOut { address, value })
    }
}

impl Encode for TxOut {
    fn encode(&self, encoder: &mut Encoder) {
        encoder
            .write_array(Len::Len(2))
            .encode(&self.address)
            .encode(&self.value);
    }
}

/// Finalized inputs and outputs, ready to be witnessed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tx {
    pub inputs: Vec<TxoPointer>,
    pub outputs: Vec<TxOut>,
}

impl Tx {
    pub fn new(inputs: Vec<TxoPointer>, outputs: Vec<TxOut>) -> Self {
        Tx { inputs, outputs }
    }

    pub fn id(&self) -> TxId {
        TxId(hash_blake2b256(&self.to_cbor()))
    }

    pub fn from_cbor(bytes: &[u8]) -> Result<Self, TransactionError> {
        let mut d = Decoder::new(bytes);
        let tx = Self::decode(&mut d)?;
        d.finish()?;
        Ok(tx)
    }

    fn decode(d: &mut Decoder<'_>) -> Result<Self, TransactionError> {
        d.array_of(3)?;
        let inputs = decode_list(d, TxoPointer::decode)?;
        let outputs = decode_list(d, TxOut::decode)?;
        match d.map()? {
            Len::Len(0) => {}
            Len::Len(found) => {
                return Err(CborError::WrongLength { expected: 0, found }.into());
            }
            Len::Indefinite => {
                return Err(CborError::UnexpectedIndefinite("attributes").into());
            }
        }
        Ok(Tx { inputs, outputs })
    }
}

/// Decode an array of either length form
fn decode_list<'a, T, F>(d: &mut Decoder<'a>, mut item: F) -> Result<Vec<T>, TransactionError>
where
    F: FnMut(&mut Decoder<'a>) -> Result<T, TransactionError>,
{
    let mut items = Vec::new();
    match d.array()? {
        Len::Len(n) => {
            for _ in 0..n {
                items.push(item(d)?);
            }
        }
        Len::Indefinite => {
            while !d.is_break()? {
                items.push(item(d)?);
            }
            d.consume_break()?;
        }
    }
    Ok(items)
}

impl Encode for Tx {
    fn encode(&self, encoder: &mut Encoder) {
        encoder.write_array(Len::Len(3));

        encoder.write_array(Len::Indefinite);
        for input in &self.inputs {
            encoder.encode(input);
        }
        encoder.write_break();

        encoder.write_array(Len::Indefinite);
        for output in &self.outputs {
            encoder.encode(output);
        }
        encoder.write_break();

        encoder.write_map(Len::Len(0));
    }
}

/// The message a witness signs: `cbor(1) || cbor(protocol_magic) || cbor(txid)`
pub fn witness_message(protocol_magic: ProtocolMagic, txid: &TxId) -> Vec<u8> {
    let mut encoder = Encoder::new();
    encoder
        .write_unsigned_integer(SIGN_TAG_TX)
        .encode(&protocol_magic)
        .encode(txid);
    encoder.finalize()
}

/// Public key and signature authorizing one input
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxInWitness {
    pub xpub: XPub,
    pub signature: Signature,
}

impl TxInWitness {
    pub fn new(key: &XPrv, protocol_magic: ProtocolMagic, txid: &TxId) -> Self {
        TxInWitness {
            xpub: key.public(),
            signature: key.sign(&witness_message(protocol_magic, txid)),
        }
    }

    /// Check the signature against `txid` under `protocol_magic`
    pub fn verify_tx(&self, protocol_magic: ProtocolMagic, txid: &TxId) -> bool {
        self.xpub
            .verify(&witness_message(protocol_magic, txid), &self.signature)
    }
}

struct WitnessBody<'a>(&'a TxInWitness);

impl Encode for WitnessBody<'_> {
    fn encode(&self, encoder: &mut Encoder) {
        encoder
            .write_array(Len::Len(2))
            .write_bytes(self.0.xpub.as_bytes())
            .write_bytes(self.0.signature.as_bytes());
    }
}

impl Encode for TxInWitness {
    fn encode(&self, encoder: &mut Encoder) {
        encoder
            .write_array(Len::Len(2))
            .write_unsigned_integer(WITNESS_TYPE_PUBKEY)
            .write_encoded_cbor(&WitnessBody(self));
    }
}

/// A transaction with one witness per input, in input order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxAux {
    pub tx: Tx,
    pub witnesses: Vec<TxInWitness>,
}

impl TxAux {
    pub fn new(tx: Tx, witnesses: Vec<TxInWitness>) -> Self {
        TxAux { tx, witnesses }
    }

    /// Every input has a witness with a valid signature over this tx
    pub fn verify(&self, protocol_magic: ProtocolMagic) -> bool {
        let txid = self.tx.id();
        self.witnesses.len() == self.tx.inputs.len()
            && self
                .witnesses
                .iter()
                .all(|witness| witness.verify_tx(protocol_magic, &txid))
    }
}

impl Encode for TxAux {
    fn encode(&self, encoder: &mut Encoder) {
        encoder
            .write_array(Len::Len(2))
            .encode(&self.tx)
            .write_array(Len::Len(self.witnesses.len() as u64));
        for witness in &self.witnesses {
            encoder.encode(witness);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NetworkMagic;
    use byron_crypto::{hardened, XPRV_SIZE};

    fn key(seed: u8) -> XPrv {
        XPrv::normalize_bytes([seed; XPRV_SIZE]).derive(hardened(0))
    }

    fn sample_tx() -> Tx {
        let address = ExtendedAddr::new_simple(&key(9).public(), NetworkMagic::NoMagic);
        Tx::new(
            vec![
                TxoPointer::new(TxId::new([1; 32]), 0),
                TxoPointer::new(TxId::new([2; 32]), 7),
            ],
            vec![TxOut::new(address, Coin::new(1_000_000).unwrap())],
        )
    }

    #[test]
    fn test_input_layout() {
        let pointer = TxoPointer::new(TxId::new([0xab; 32]), 1);
        let bytes = pointer.to_cbor();
        // [0, tag24(bytes(36))] where the body is [bytes(32), 1]
        assert_eq!(&bytes[..6], &[0x82, 0x00, 0xd8, 0x18, 0x58, 36]);
        assert_eq!(&bytes[6..9], &[0x82, 0x58, 0x20]);
        assert_eq!(bytes[bytes.len() - 1], 0x01);
    }

    #[test]
    fn test_tx_layout() {
        let tx = sample_tx();
        let bytes = tx.to_cbor();
        assert_eq!(&bytes[..2], &[0x83, 0x9f]);
        assert_eq!(&bytes[bytes.len() - 2..], &[0xff, 0xa0]);

        let empty = Tx::default().to_cbor();
        assert_eq!(empty, vec![0x83, 0x9f, 0xff, 0x9f, 0xff, 0xa0]);
    }

    #[test]
    fn test_known_encoding() {
        let tx = sample_tx();
        assert_eq!(
            hex::encode(tx.to_cbor()),
            "839f8200d818582482582001010101010101010101010101010101010101010101\
             01010101010101010101008200d81858248258200202020202020202020202020202\
             02020202020202020202020202020202020207ff9f8282d818582183581c20f2e891\
             ee102d0bc5be2c0c518f5bb8296eb3bb74d36b83954b3b2fa0001af3b3b8a81a000f\
             4240ffa0"
        );
        assert_eq!(
            tx.id().to_string(),
            "21b5d9cccc733f65c3f70023916ae11403127e6cda7b15ef6ed6b835d4e5e07d"
        );

        let witness = TxInWitness::new(&key(1), ProtocolMagic::new(764_824_073), &tx.id());
        assert_eq!(
            hex::encode(witness.to_cbor()),
            "8200d8185885825840dd69ad82b37b7e3fabc0baecd55a921573dac51f41edaf15\
             8f8395ce9c24e988567cf655acc65e0accf998e8e7e69d52d39dc1d5d69816deb6\
             50b015f6546c5658401228c6e881cccc635471e76c96d8342a91842c8e83b40625\
             60a50d1c22c9a3cbde52b44c7a494829121682f0d50c8390765c35e5c0328a1685\
             d3f1dd97434101"
        );
    }

    #[test]
    fn test_id_is_hash_of_encoding() {
        let tx = sample_tx();
        assert_eq!(tx.id().as_bytes(), &hash_blake2b256(&tx.to_cbor()));

        let mut other = sample_tx();
        other.inputs.swap(0, 1);
        assert_ne!(tx.id(), other.id());
    }

    #[test]
    fn test_decode_tx() {
        let tx = sample_tx();
        assert_eq!(Tx::from_cbor(&tx.to_cbor()).unwrap(), tx);
        assert!(Tx::from_cbor(&[0x83, 0x9f]).is_err());
    }

    #[test]
    fn test_txid_text() {
        let id = TxId::new([0x0f; 32]);
        let text = id.to_string();
        assert_eq!(text.len(), 64);
        assert_eq!(text.parse::<TxId>().unwrap(), id);
        assert!(matches!(
            "0f0f".parse::<TxId>(),
            Err(TransactionError::InvalidTxIdLength(2))
        ));
        assert!("zz".parse::<TxId>().is_err());
    }

    #[test]
    fn test_witness_message_layout() {
        let txid = TxId::new([0x55; 32]);
        let message = witness_message(ProtocolMagic::new(764_824_073), &txid);
        let mut expected = vec![0x01, 0x1a, 0x2d, 0x96, 0x4a, 0x09, 0x58, 0x20];
        expected.extend_from_slice(&[0x55; 32]);
        assert_eq!(message, expected);
    }

    #[test]
    fn test_witness_verify() {
        let tx = sample_tx();
        let txid = tx.id();
        let magic = ProtocolMagic::new(42);
        let witness = TxInWitness::new(&key(1), magic, &txid);

        assert!(witness.verify_tx(magic, &txid));
        assert!(!witness.verify_tx(ProtocolMagic::new(43), &txid));
        assert!(!witness.verify_tx(magic, &TxId::new([0; 32])));
    }

    #[test]
    fn test_txaux_verify() {
        let tx = sample_tx();
        let txid = tx.id();
        let magic = ProtocolMagic::default();
        let witnesses = vec![
            TxInWitness::new(&key(1), magic, &txid),
            TxInWitness::new(&key(2), magic, &txid),
        ];

        let signed = TxAux::new(tx.clone(), witnesses.clone());
        assert!(signed.verify(magic));

        let missing = TxAux::new(tx, witnesses[..1].to_vec());
        assert!(!missing.verify(magic));
    }

    #[test]
    fn test_txaux_layout() {
        let tx = sample_tx();
        let magic = ProtocolMagic::default();
        let witness = TxInWitness::new(&key(1), magic, &tx.id());
        let signed = TxAux::new(tx.clone(), vec![witness.clone(), witness]);
        let bytes = signed.to_cbor();

        let tx_bytes = tx.to_cbor();
        assert_eq!(bytes[0], 0x82);
        assert_eq!(&bytes[1..1 + tx_bytes.len()], &tx_bytes[..]);
        assert_eq!(bytes[1 + tx_bytes.len()], 0x82);
        // first witness: [0, tag24(bytes(133))]
        assert_eq!(
            &bytes[2 + tx_bytes.len()..8 + tx_bytes.len()],
            &[0x82, 0x00, 0xd8, 0x18, 0x58, 0x85]
        );
    }
}
