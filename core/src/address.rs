//! Byron extended addresses
//!
//! An address commits to its spending key through a 28-byte root:
//! `blake2b224(sha3_256(cbor([addr_type, [0, xpub], attributes])))`.
//! On the wire it is `[tag24(cbor([root, attributes, addr_type])), crc32]`
//! and its text form is the base58 encoding of those bytes.

use crate::cbor::{CborError, Decoder, Encode, Encoder, Len};
use crate::config::NetworkMagic;
use byron_crypto::{hash_blake2b224, hash_sha3_256, XPub};
use flate2::Crc;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub const ADDRESS_ROOT_SIZE: usize = 28;

const ATTRIBUTE_DERIVATION_PATH: u64 = 1;
const ATTRIBUTE_NETWORK_MAGIC: u64 = 2;

const SPENDING_DATA_PUBKEY: u64 = 0;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    #[error("Invalid base58: {0}")]
    InvalidBase58(String),

    #[error("Invalid address encoding: {0}")]
    Cbor(#[from] CborError),

    #[error("Checksum mismatch: expected {expected:#010x}, computed {computed:#010x}")]
    CrcMismatch { expected: u32, computed: u32 },

    #[error("Invalid address root length: {0}")]
    InvalidRootLength(usize),

    #[error("Unsupported address attribute: {0}")]
    UnsupportedAttribute(u64),

    #[error("Unknown address type: {0}")]
    UnknownAddressType(u64),
}

/// What kind of spending data the address root commits to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddrType {
    PubKey,
    Script,
    Redeem,
}

impl AddrType {
    fn code(self) -> u64 {
        match self {
            AddrType::PubKey => 0,
            AddrType::Script => 1,
            AddrType::Redeem => 2,
        }
    }

    fn from_code(code: u64) -> Result<Self, AddressError> {
        match code {
            0 => Ok(AddrType::PubKey),
            1 => Ok(AddrType::Script),
            2 => Ok(AddrType::Redeem),
            other => Err(AddressError::UnknownAddressType(other)),
        }
    }
}

/// Bootstrap-era address attributes
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Attributes {
    /// Opaque HD payload of legacy random-index wallets
    pub derivation_path: Option<Vec<u8>>,
    pub network_magic: NetworkMagic,
}

impl Attributes {
    pub fn new_bootstrap_era(derivation_path: Option<Vec<u8>>, network_magic: NetworkMagic) -> Self {
        Attributes {
            derivation_path,
            network_magic,
        }
    }

    fn decode(d: &mut Decoder<'_>) -> Result<Self, AddressError> {
        let mut attributes = Attributes::default();
        let entries = match d.map()? {
            Len::Len(n) => n,
            Len::Indefinite => return Err(CborError::UnexpectedIndefinite("attributes").into()),
        };
        for _ in 0..entries {
            match d.unsigned_integer()? {
                ATTRIBUTE_DERIVATION_PATH => {
                    attributes.derivation_path = Some(d.bytes()?.to_vec());
                }
                ATTRIBUTE_NETWORK_MAGIC => {
                    let mut inner = Decoder::new(d.bytes()?);
                    let magic = inner.u32()?;
                    inner.finish()?;
                    attributes.network_magic = NetworkMagic::Magic(magic);
                }
                other => {
                    return Err(AddressError::UnsupportedAttribute(other));
                }
            }
        }
        Ok(attributes)
    }
}

impl Encode for Attributes {
    fn encode(&self, encoder: &mut Encoder) {
        let magic = match self.network_magic {
            NetworkMagic::Magic(magic) => Some(magic),
            NetworkMagic::NoMagic => None,
        };
        let len = u64::from(self.derivation_path.is_some()) + u64::from(magic.is_some());

        encoder.write_map(Len::Len(len));
        if let Some(path) = &self.derivation_path {
            encoder
                .write_unsigned_integer(ATTRIBUTE_DERIVATION_PATH)
                .write_bytes(path);
        }
        if let Some(magic) = magic {
            encoder
                .write_unsigned_integer(ATTRIBUTE_NETWORK_MAGIC)
                .write_bytes(&magic.to_cbor());
        }
    }
}

/// The structure hashed into the address root
struct SpendingRoot<'a> {
    addr_type: AddrType,
    xpub: &'a XPub,
    attributes: &'a Attributes,
}

impl Encode for SpendingRoot<'_> {
    fn encode(&self, encoder: &mut Encoder) {
        encoder
            .write_array(Len::Len(3))
            .write_unsigned_integer(self.addr_type.code())
            .write_array(Len::Len(2))
            .write_unsigned_integer(SPENDING_DATA_PUBKEY)
            .write_bytes(self.xpub.as_bytes())
            .encode(self.attributes);
    }
}

fn address_root(addr_type: AddrType, xpub: &XPub, attributes: &Attributes) -> [u8; ADDRESS_ROOT_SIZE] {
    let root = SpendingRoot {
        addr_type,
        xpub,
        attributes,
    };
    hash_blake2b224(&hash_sha3_256(&root.to_cbor()))
}

fn crc32(data: &[u8]) -> u32 {
    let mut crc = Crc::new();
    crc.update(data);
    crc.sum()
}

/// Address payload without the checksum envelope
struct AddressPayload<'a>(&'a ExtendedAddr);

impl Encode for AddressPayload<'_> {
    fn encode(&self, encoder: &mut Encoder) {
        encoder
            .write_array(Len::Len(3))
            .write_bytes(&self.0.root)
            .encode(&self.0.attributes)
            .write_unsigned_integer(self.0.addr_type.code());
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExtendedAddr {
    root: [u8; ADDRESS_ROOT_SIZE],
    attributes: Attributes,
    addr_type: AddrType,
}

impl ExtendedAddr {
    pub fn new(addr_type: AddrType, xpub: &XPub, attributes: Attributes) -> Self {
        ExtendedAddr {
            root: address_root(addr_type, xpub, &attributes),
            attributes,
            addr_type,
        }
    }

    /// Public-key address for `xpub` on the network identified by `network_magic`
    pub fn new_simple(xpub: &XPub, network_magic: NetworkMagic) -> Self {
        Self::new(
            AddrType::PubKey,
            xpub,
            Attributes::new_bootstrap_era(None, network_magic),
        )
    }

    pub fn root(&self) -> &[u8; ADDRESS_ROOT_SIZE] {
        &self.root
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    pub fn addr_type(&self) -> AddrType {
        self.addr_type
    }

    pub fn network_magic(&self) -> NetworkMagic {
        self.attributes.network_magic
    }

    /// Check that this address commits to `xpub`
    pub fn identical_with_pubkey(&self, xpub: &XPub) -> bool {
        self.addr_type == AddrType::PubKey
            && address_root(AddrType::PubKey, xpub, &self.attributes) == self.root
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.to_cbor()
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, AddressError> {
        let mut d = Decoder::new(bytes);
        let addr = Self::decode(&mut d)?;
        d.finish()?;
        Ok(addr)
    }

    /// Decode one address from a CBOR stream, checking its crc32
    pub fn decode(d: &mut Decoder<'_>) -> Result<Self, AddressError> {
        d.array_of(2)?;
        let payload = d.encoded_cbor()?;
        let expected = d.u32()?;
        let computed = crc32(payload);
        if expected != computed {
            return Err(AddressError::CrcMismatch { expected, computed });
        }

        let mut inner = Decoder::new(payload);
        inner.array_of(3)?;
        let root_bytes = inner.bytes()?;
        let root: [u8; ADDRESS_ROOT_SIZE] = root_bytes
            .try_into()
            .map_err(|_| AddressError::InvalidRootLength(root_bytes.len()))?;
        let attributes = Attributes::decode(&mut inner)?;
        let addr_type = AddrType::from_code(inner.unsigned_integer()?)?;
        inner.finish()?;

        Ok(ExtendedAddr {
            root,
            attributes,
            addr_type,
        })
    }
}

impl Encode for ExtendedAddr {
    fn encode(&self, encoder: &mut Encoder) {
        let payload = AddressPayload(self).to_cbor();
        encoder
            .write_array(Len::Len(2))
            .write_tag(crate::cbor::TAG_ENCODED_CBOR)
            .write_bytes(&payload)
            .write_unsigned_integer(u64::from(crc32(&payload)));
    }
}

impl fmt::Display for ExtendedAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", bs58::encode(self.to_bytes()).into_string())
    }
}

impl FromStr for ExtendedAddr {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = bs58::decode(s)
            .into_vec()
            .map_err(|e| AddressError::InvalidBase58(e.to_string()))?;
        Self::from_bytes(&bytes)
    }
}

/// Check whether `address` is a well-formed base58 address
pub fn is_valid_address(address: &str) -> bool {
    ExtendedAddr::from_str(address).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use byron_crypto::{hardened, XPrv, XPRV_SIZE};

    fn xpub(seed: u8) -> XPub {
        XPrv::normalize_bytes([seed; XPRV_SIZE])
            .derive(hardened(0))
            .public()
    }

    #[test]
    fn test_export_import_roundtrip() {
        for magic in [NetworkMagic::NoMagic, NetworkMagic::Magic(1_097_911_063)] {
            let addr = ExtendedAddr::new_simple(&xpub(1), magic);
            let text = addr.to_string();
            let imported: ExtendedAddr = text.parse().unwrap();
            assert_eq!(imported, addr);
            assert_eq!(imported.to_string(), text);
        }
    }

    #[test]
    fn test_deterministic_and_key_bound() {
        let a = ExtendedAddr::new_simple(&xpub(1), NetworkMagic::NoMagic);
        let b = ExtendedAddr::new_simple(&xpub(1), NetworkMagic::NoMagic);
        let c = ExtendedAddr::new_simple(&xpub(2), NetworkMagic::NoMagic);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.identical_with_pubkey(&xpub(1)));
        assert!(!a.identical_with_pubkey(&xpub(2)));
    }

    #[test]
    fn test_network_magic_changes_address() {
        let mainnet = ExtendedAddr::new_simple(&xpub(1), NetworkMagic::NoMagic);
        let testnet = ExtendedAddr::new_simple(&xpub(1), NetworkMagic::Magic(42));
        assert_ne!(mainnet.root(), testnet.root());
        assert_eq!(testnet.network_magic(), NetworkMagic::Magic(42));
    }

    #[test]
    fn test_mainnet_layout() {
        let addr = ExtendedAddr::new_simple(&xpub(3), NetworkMagic::NoMagic);
        let bytes = addr.to_bytes();
        // [tag24(bytes(33)), crc]: array(2), tag 24, bytes header with 1-byte length
        assert_eq!(&bytes[..4], &[0x82, 0xd8, 0x18, 0x58]);
        assert_eq!(bytes[4], 33);
        // inner: array(3), bytes(28) root, empty map, type 0
        assert_eq!(&bytes[5..7], &[0x83, 0x58]);
        assert_eq!(bytes[7], 28);
        assert_eq!(&bytes[36..38], &[0xa0, 0x00]);
        assert!(bs58::encode(&bytes).into_string().starts_with("Ae2"));
    }

    #[test]
    fn test_known_addresses() {
        let key = XPrv::normalize_bytes([9; XPRV_SIZE])
            .derive(hardened(0))
            .derive(3)
            .public();

        let mainnet = ExtendedAddr::new_simple(&key, NetworkMagic::NoMagic);
        assert_eq!(
            hex::encode(mainnet.to_bytes()),
            "82d818582183581cc4a85a2232fa7baf04960d98b2c648f48585021669922c8b\
             5cff5928a0001a84a153ec"
        );
        assert_eq!(
            mainnet.to_string(),
            "Ae2tdPwUPEZGRsGfZWgviiXTBAc44vgsWAXh3z2cvpeXCBp1SzVc4Md7pno"
        );

        let testnet = ExtendedAddr::new_simple(&key, NetworkMagic::Magic(1_097_911_063));
        assert_eq!(
            testnet.to_string(),
            "2cWKMJemoBajqseG6VBxEYJuNdWLFMLgSdPtwv2w4j3NAJVLRYtj7qe9Q86UYNim5wwdR"
        );

        let magic_two = ExtendedAddr::new_simple(&key, NetworkMagic::Magic(2));
        assert_eq!(
            magic_two.to_string(),
            "FHnt4NL7yPXuhJe1RCRx5cyZnchzM3qv3BkuQct27UeVzZc5wrfDD32kRMWZWR6"
        );

        for text in [mainnet.to_string(), testnet.to_string(), magic_two.to_string()] {
            let parsed: ExtendedAddr = text.parse().unwrap();
            assert!(parsed.identical_with_pubkey(&key));
        }
    }

    #[test]
    fn test_validate() {
        let text = ExtendedAddr::new_simple(&xpub(4), NetworkMagic::NoMagic).to_string();
        assert!(is_valid_address(&text));
        assert!(!is_valid_address("not an address"));
        assert!(!is_valid_address("0OIl"));
        assert!(!is_valid_address(""));
    }

    #[test]
    fn test_corrupted_crc_rejected() {
        let addr = ExtendedAddr::new_simple(&xpub(5), NetworkMagic::NoMagic);
        let mut bytes = addr.to_bytes();
        let last = bytes.len() - 1;
        bytes[last] ^= 0x01;
        assert!(matches!(
            ExtendedAddr::from_bytes(&bytes),
            Err(AddressError::CrcMismatch { .. })
        ));
    }

    #[test]
    fn test_corrupted_payload_rejected() {
        let addr = ExtendedAddr::new_simple(&xpub(6), NetworkMagic::NoMagic);
        let mut bytes = addr.to_bytes();
        bytes[10] ^= 0xff;
        assert!(!is_valid_address(&bs58::encode(&bytes).into_string()));
    }

    #[test]
    fn test_derivation_path_attribute_roundtrip() {
        let attributes = Attributes::new_bootstrap_era(Some(vec![0x41, 1, 2, 3]), NetworkMagic::NoMagic);
        let addr = ExtendedAddr::new(AddrType::PubKey, &xpub(7), attributes.clone());
        let decoded = ExtendedAddr::from_bytes(&addr.to_bytes()).unwrap();
        assert_eq!(decoded.attributes(), &attributes);
    }
}
