//! BIP-39 style mnemonic codec
//!
//! Converts between wallet entropy and ordered word indices. The
//! dictionary is the standard English list shipped with the `bip39`
//! crate; the bit packing and checksum are done here so that the legacy
//! 9-word size (96 bits of entropy) is supported alongside the BIP-39
//! sizes.

use bip39::Language;
use rand_core::{CryptoRng, RngCore};
use sha2::{Digest, Sha256};
use std::fmt;
use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Number of words in the dictionary
pub const DICTIONARY_SIZE: u16 = 2048;

const BITS_PER_WORD: usize = 11;
const WORD_MASK: u32 = (1 << BITS_PER_WORD) - 1;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MnemonicError {
    #[error("Invalid mnemonic phrase: {0}")]
    InvalidMnemonic(String),

    #[error("Invalid mnemonic checksum")]
    InvalidChecksum,

    #[error("Invalid word count: {0} (must be 9, 12, 15, 18, 21, or 24)")]
    InvalidWordCount(usize),

    #[error("Invalid entropy length: {0} bytes")]
    InvalidEntropyLength(usize),
}

/// Legal mnemonic sizes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MnemonicType {
    Type9Words,
    Type12Words,
    Type15Words,
    Type18Words,
    Type21Words,
    Type24Words,
}

impl MnemonicType {
    pub fn from_word_count(word_count: usize) -> Result<Self, MnemonicError> {
        match word_count {
            9 => Ok(MnemonicType::Type9Words),
            12 => Ok(MnemonicType::Type12Words),
            15 => Ok(MnemonicType::Type15Words),
            18 => Ok(MnemonicType::Type18Words),
            21 => Ok(MnemonicType::Type21Words),
            24 => Ok(MnemonicType::Type24Words),
            _ => Err(MnemonicError::InvalidWordCount(word_count)),
        }
    }

    pub fn from_entropy_size(bytes: usize) -> Result<Self, MnemonicError> {
        match bytes {
            12 => Ok(MnemonicType::Type9Words),
            16 => Ok(MnemonicType::Type12Words),
            20 => Ok(MnemonicType::Type15Words),
            24 => Ok(MnemonicType::Type18Words),
            28 => Ok(MnemonicType::Type21Words),
            32 => Ok(MnemonicType::Type24Words),
            _ => Err(MnemonicError::InvalidEntropyLength(bytes)),
        }
    }

    pub fn word_count(self) -> usize {
        match self {
            MnemonicType::Type9Words => 9,
            MnemonicType::Type12Words => 12,
            MnemonicType::Type15Words => 15,
            MnemonicType::Type18Words => 18,
            MnemonicType::Type21Words => 21,
            MnemonicType::Type24Words => 24,
        }
    }

    /// Entropy bits: 32 for every 3 words
    pub fn entropy_bits(self) -> usize {
        self.word_count() / 3 * 32
    }

    /// Checksum bits: one per 32 bits of entropy
    pub fn checksum_bits(self) -> usize {
        self.entropy_bits() / 32
    }

    pub fn entropy_size(self) -> usize {
        self.entropy_bits() / 8
    }
}

/// Position of a word in the dictionary (`0..2048`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MnemonicIndex(u16);

impl MnemonicIndex {
    pub fn new(index: u16) -> Result<Self, MnemonicError> {
        if index >= DICTIONARY_SIZE {
            return Err(MnemonicError::InvalidMnemonic(format!(
                "word index {} out of range",
                index
            )));
        }
        Ok(MnemonicIndex(index))
    }

    pub fn from_word(word: &str) -> Result<Self, MnemonicError> {
        Language::English
            .find_word(word)
            .map(MnemonicIndex)
            .ok_or_else(|| MnemonicError::InvalidMnemonic(format!("unknown word '{}'", word)))
    }

    pub fn value(self) -> u16 {
        self.0
    }

    pub fn word(self) -> &'static str {
        Language::English.word_list()[usize::from(self.0)]
    }
}

/// Ordered word indices of a mnemonic of legal length
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MnemonicIndexes(Vec<MnemonicIndex>);

impl MnemonicIndexes {
    /// Wrap decoded indices; an illegal count is an `InvalidMnemonic`
    pub fn new(indexes: Vec<MnemonicIndex>) -> Result<Self, MnemonicError> {
        phrase_type(indexes.len())?;
        Ok(MnemonicIndexes(indexes))
    }

    /// Parse a whitespace separated phrase
    ///
    /// The word count is checked before any word is looked up.
    pub fn from_phrase(phrase: &str) -> Result<Self, MnemonicError> {
        let words: Vec<&str> = phrase.split_whitespace().collect();
        phrase_type(words.len())?;
        let indexes = words
            .into_iter()
            .map(MnemonicIndex::from_word)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(MnemonicIndexes(indexes))
    }

    pub fn to_phrase(&self) -> String {
        self.0
            .iter()
            .map(|index| index.word())
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[MnemonicIndex] {
        &self.0
    }
}

/// Size of a phrase being decoded; an illegal count is `InvalidMnemonic`
fn phrase_type(word_count: usize) -> Result<MnemonicType, MnemonicError> {
    MnemonicType::from_word_count(word_count).map_err(|_| {
        MnemonicError::InvalidMnemonic(format!(
            "{} words (must be 9, 12, 15, 18, 21, or 24)",
            word_count
        ))
    })
}

impl fmt::Display for MnemonicIndexes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_phrase())
    }
}

/// Wallet entropy; wiped on drop
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct Entropy {
    #[zeroize(skip)]
    mnemonic_type: MnemonicType,
    bytes: Vec<u8>,
}

impl Entropy {
    pub fn from_slice(bytes: &[u8]) -> Result<Self, MnemonicError> {
        let mnemonic_type = MnemonicType::from_entropy_size(bytes.len())?;
        Ok(Entropy {
            mnemonic_type,
            bytes: bytes.to_vec(),
        })
    }

    /// Fill fresh entropy of the given size from `rng`
    pub fn generate<R>(mnemonic_type: MnemonicType, rng: &mut R) -> Self
    where
        R: RngCore + CryptoRng,
    {
        let mut bytes = vec![0u8; mnemonic_type.entropy_size()];
        rng.fill_bytes(&mut bytes);
        Entropy {
            mnemonic_type,
            bytes,
        }
    }

    /// Recover entropy from word indices, verifying the checksum
    pub fn from_mnemonics(mnemonics: &MnemonicIndexes) -> Result<Self, MnemonicError> {
        let mnemonic_type = phrase_type(mnemonics.len())?;
        let entropy_size = mnemonic_type.entropy_size();

        let mut bytes = Vec::with_capacity(entropy_size);
        let mut acc: u32 = 0;
        let mut acc_bits = 0;
        for index in mnemonics.as_slice() {
            acc = (acc << BITS_PER_WORD) | u32::from(index.value());
            acc_bits += BITS_PER_WORD;
            while acc_bits >= 8 && bytes.len() < entropy_size {
                acc_bits -= 8;
                bytes.push((acc >> acc_bits) as u8);
            }
            acc &= (1 << acc_bits) - 1;
        }
        // the bits left over after the entropy are the checksum
        let checksum = acc;
        let entropy = Entropy {
            mnemonic_type,
            bytes,
        };
        acc.zeroize();

        if checksum != entropy.checksum() {
            return Err(MnemonicError::InvalidChecksum);
        }
        Ok(entropy)
    }

    /// Append the checksum and split into 11-bit word indices
    pub fn to_mnemonics(&self) -> MnemonicIndexes {
        let checksum_bits = self.mnemonic_type.checksum_bits();
        let mut indexes = Vec::with_capacity(self.mnemonic_type.word_count());
        let mut acc: u32 = 0;
        let mut acc_bits = 0;

        for byte in &self.bytes {
            acc = (acc << 8) | u32::from(*byte);
            acc_bits += 8;
            if acc_bits >= BITS_PER_WORD {
                acc_bits -= BITS_PER_WORD;
                indexes.push(MnemonicIndex(((acc >> acc_bits) & WORD_MASK) as u16));
            }
            acc &= (1 << acc_bits) - 1;
        }
        acc = (acc << checksum_bits) | self.checksum();
        indexes.push(MnemonicIndex((acc & WORD_MASK) as u16));
        acc.zeroize();

        MnemonicIndexes(indexes)
    }

    pub fn mnemonic_type(&self) -> MnemonicType {
        self.mnemonic_type
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Leading `ENT / 32` bits of the SHA-256 digest
    fn checksum(&self) -> u32 {
        let digest = Sha256::digest(&self.bytes);
        u32::from(digest[0] >> (8 - self.mnemonic_type.checksum_bits()))
    }
}

impl fmt::Debug for Entropy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Entropy({} bytes)", self.bytes.len())
    }
}

/// Recover entropy from a mnemonic phrase
///
/// # Arguments
/// * `phrase` - Space separated words from the English dictionary
///
/// # Returns
/// * `Result<Entropy, MnemonicError>` - `InvalidMnemonic` for an unknown
///   word or an illegal word count, or `InvalidChecksum`
///
/// # Example
/// ```
/// use byron_wallet::mnemonic::entropy_from_mnemonic;
///
/// let phrase = "abandon abandon abandon abandon abandon abandon \
///               abandon abandon abandon abandon abandon about";
/// let entropy = entropy_from_mnemonic(phrase).unwrap();
/// assert_eq!(entropy.as_bytes(), &[0u8; 16]);
/// ```
pub fn entropy_from_mnemonic(phrase: &str) -> Result<Entropy, MnemonicError> {
    let mnemonics = MnemonicIndexes::from_phrase(phrase)?;
    Entropy::from_mnemonics(&mnemonics)
}

/// Word indices for the given entropy
pub fn mnemonic_from_entropy(entropy: &Entropy) -> MnemonicIndexes {
    entropy.to_mnemonics()
}

/// Generate entropy for a mnemonic of `word_count` words from `rng`
pub fn entropy_from_random<R>(word_count: usize, rng: &mut R) -> Result<Entropy, MnemonicError>
where
    R: RngCore + CryptoRng,
{
    let mnemonic_type = MnemonicType::from_word_count(word_count)?;
    Ok(Entropy::generate(mnemonic_type, rng))
}

/// Generate entropy from the thread-local generator
pub fn generate_entropy(word_count: usize) -> Result<Entropy, MnemonicError> {
    entropy_from_random(word_count, &mut rand::rng())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand_chacha::ChaCha20Rng;
    use rand_core::SeedableRng;

    const ABANDON_ABOUT: &str = "abandon abandon abandon abandon abandon abandon \
                                 abandon abandon abandon abandon abandon about";

    /// Generator that replays a fixed byte
    struct FixedRng(u8);

    impl RngCore for FixedRng {
        fn next_u32(&mut self) -> u32 {
            u32::from_le_bytes([self.0; 4])
        }

        fn next_u64(&mut self) -> u64 {
            u64::from_le_bytes([self.0; 8])
        }

        fn fill_bytes(&mut self, dest: &mut [u8]) {
            dest.fill(self.0);
        }
    }

    impl CryptoRng for FixedRng {}

    #[test]
    fn test_mnemonic_type_table() {
        let table = [(9, 96, 3), (12, 128, 4), (15, 160, 5), (18, 192, 6), (21, 224, 7), (24, 256, 8)];
        for (words, entropy_bits, checksum_bits) in table {
            let mnemonic_type = MnemonicType::from_word_count(words).unwrap();
            assert_eq!(mnemonic_type.entropy_bits(), entropy_bits);
            assert_eq!(mnemonic_type.checksum_bits(), checksum_bits);
            assert_eq!(
                MnemonicType::from_entropy_size(entropy_bits / 8).unwrap(),
                mnemonic_type
            );
        }
    }

    #[test]
    fn test_all_zero_vector() {
        let entropy = Entropy::from_slice(&[0u8; 16]).unwrap();
        let mnemonics = entropy.to_mnemonics();

        let values: Vec<u16> = mnemonics.as_slice().iter().map(|i| i.value()).collect();
        let mut expected = vec![0u16; 11];
        expected.push(3);
        assert_eq!(values, expected);
        assert_eq!(mnemonics.to_phrase(), ABANDON_ABOUT);

        assert_eq!(entropy_from_mnemonic(ABANDON_ABOUT).unwrap(), entropy);
    }

    #[test]
    fn test_known_vectors() {
        let vectors = [
            (
                "7f7f7f7f7f7f7f7f7f7f7f7f7f7f7f7f",
                "legal winner thank year wave sausage worth useful legal winner thank yellow",
            ),
            (
                "ffffffffffffffffffffffffffffffff",
                "zoo zoo zoo zoo zoo zoo zoo zoo zoo zoo zoo wrong",
            ),
            (
                "0000000000000000000000000000000000000000000000000000000000000000",
                "abandon abandon abandon abandon abandon abandon abandon abandon \
                 abandon abandon abandon abandon abandon abandon abandon abandon \
                 abandon abandon abandon abandon abandon abandon abandon art",
            ),
        ];
        for (entropy_hex, phrase) in vectors {
            let entropy = Entropy::from_slice(&hex::decode(entropy_hex).unwrap()).unwrap();
            let expected: Vec<&str> = phrase.split_whitespace().collect();
            assert_eq!(mnemonic_from_entropy(&entropy).to_phrase(), expected.join(" "));
            assert_eq!(entropy_from_mnemonic(phrase).unwrap(), entropy);
        }
    }

    #[test]
    fn test_matches_bip39_crate() {
        let mut rng = ChaCha20Rng::seed_from_u64(7);
        for words in [12, 15, 18, 21, 24] {
            let entropy = entropy_from_random(words, &mut rng).unwrap();
            let reference = bip39::Mnemonic::from_entropy(entropy.as_bytes()).unwrap();
            assert_eq!(entropy.to_mnemonics().to_phrase(), reference.to_string());
        }
    }

    #[test]
    fn test_legacy_nine_words_roundtrip() {
        let entropy = Entropy::from_slice(&[0x5a; 12]).unwrap();
        let mnemonics = entropy.to_mnemonics();
        assert_eq!(mnemonics.len(), 9);
        assert_eq!(Entropy::from_mnemonics(&mnemonics).unwrap(), entropy);
    }

    #[test]
    fn test_invalid_word_count() {
        assert!(matches!(
            entropy_from_mnemonic("abandon abandon abandon"),
            Err(MnemonicError::InvalidMnemonic(_))
        ));
        assert!(matches!(
            entropy_from_mnemonic(""),
            Err(MnemonicError::InvalidMnemonic(_))
        ));
        let thirteen = format!("{} abandon", ABANDON_ABOUT);
        assert!(matches!(
            entropy_from_mnemonic(&thirteen),
            Err(MnemonicError::InvalidMnemonic(_))
        ));
        assert!(matches!(
            MnemonicIndexes::new(vec![MnemonicIndex::new(0).unwrap(); 10]),
            Err(MnemonicError::InvalidMnemonic(_))
        ));
        assert!(matches!(
            entropy_from_random(13, &mut FixedRng(0)),
            Err(MnemonicError::InvalidWordCount(13))
        ));
        assert!(matches!(
            generate_entropy(0),
            Err(MnemonicError::InvalidWordCount(0))
        ));
    }

    #[test]
    fn test_unknown_word() {
        let phrase = ABANDON_ABOUT.replace("about", "bitcoinz");
        assert!(matches!(
            entropy_from_mnemonic(&phrase),
            Err(MnemonicError::InvalidMnemonic(_))
        ));
    }

    #[test]
    fn test_checksum_sensitivity() {
        // "abandon x12" has checksum bits 0000 instead of 0011
        let phrase = ["abandon"; 12].join(" ");
        assert_eq!(
            entropy_from_mnemonic(&phrase),
            Err(MnemonicError::InvalidChecksum)
        );

        let mut rng = ChaCha20Rng::seed_from_u64(11);
        for words in [9, 12, 15, 18, 21, 24] {
            let entropy = entropy_from_random(words, &mut rng).unwrap();
            let mnemonics = entropy.to_mnemonics();
            let checksum_bits = entropy.mnemonic_type().checksum_bits();

            // the checksum is the low bits of the last word
            for bit in 0..checksum_bits {
                let mut flipped: Vec<MnemonicIndex> = mnemonics.as_slice().to_vec();
                let last = flipped.len() - 1;
                flipped[last] = MnemonicIndex::new(flipped[last].value() ^ (1 << bit)).unwrap();
                let flipped = MnemonicIndexes::new(flipped).unwrap();
                assert_eq!(
                    Entropy::from_mnemonics(&flipped),
                    Err(MnemonicError::InvalidChecksum),
                    "{} words, checksum bit {}",
                    words,
                    bit
                );
            }
        }
    }

    #[test]
    fn test_fixed_rng_is_deterministic() {
        let a = entropy_from_random(24, &mut FixedRng(0x42)).unwrap();
        let b = entropy_from_random(24, &mut FixedRng(0x42)).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.as_bytes(), &[0x42; 32]);
    }

    #[test]
    fn test_generated_entropy_sizes() {
        for words in [9, 12, 15, 18, 21, 24] {
            let entropy = generate_entropy(words).unwrap();
            assert_eq!(entropy.as_bytes().len(), words / 3 * 4);
            assert_eq!(entropy.to_mnemonics().len(), words);
        }
    }

    #[test]
    fn test_index_bounds() {
        assert!(MnemonicIndex::new(2047).is_ok());
        assert!(MnemonicIndex::new(2048).is_err());
        assert_eq!(MnemonicIndex::new(2047).unwrap().word(), "zoo");
        assert_eq!(MnemonicIndex::from_word("abandon").unwrap().value(), 0);
    }

    #[test]
    fn test_entropy_length_validation() {
        assert_eq!(
            Entropy::from_slice(&[0u8; 17]),
            Err(MnemonicError::InvalidEntropyLength(17))
        );
    }

    #[test]
    fn test_debug_hides_entropy() {
        let entropy = Entropy::from_slice(&[0xab; 16]).unwrap();
        assert_eq!(format!("{:?}", entropy), "Entropy(16 bytes)");
    }
}
