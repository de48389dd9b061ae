//! CBOR (RFC 7049) encoding for the Byron wire formats.
//!
//! Only the subset the address and transaction layouts use is covered:
//! unsigned integers, byte strings, arrays, maps, tags and the break
//! marker of indefinite-length arrays. Headers are always written in
//! their shortest form, which the network relies on for hashing.

use thiserror::Error;

/// Tag wrapping a byte string that itself holds CBOR
pub const TAG_ENCODED_CBOR: u64 = 24;

const MAJOR_UNSIGNED: u8 = 0;
const MAJOR_BYTES: u8 = 2;
const MAJOR_ARRAY: u8 = 4;
const MAJOR_MAP: u8 = 5;
const MAJOR_TAG: u8 = 6;
const MAJOR_SPECIAL: u8 = 7;

const INDEFINITE: u8 = 31;
const BREAK: u8 = 0xff;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CborError {
    #[error("Unexpected end of input at byte {0}")]
    UnexpectedEof(usize),

    #[error("Expected {expected}, found major type {found}")]
    UnexpectedType { expected: &'static str, found: u8 },

    #[error("Expected {expected} elements, found {found}")]
    WrongLength { expected: u64, found: u64 },

    #[error("Indefinite length not allowed for {0}")]
    UnexpectedIndefinite(&'static str),

    #[error("Unsupported additional info {0}")]
    UnsupportedInfo(u8),

    #[error("Expected tag {expected}, found {found}")]
    UnexpectedTag { expected: u64, found: u64 },

    #[error("Value {value} does not fit in {target}")]
    IntegerOverflow { value: u64, target: &'static str },

    #[error("{0} trailing bytes after value")]
    TrailingBytes(usize),
}

/// Length of an array or map
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Len {
    Len(u64),
    Indefinite,
}

/// Types with a canonical CBOR form
pub trait Encode {
    fn encode(&self, encoder: &mut Encoder);

    fn to_cbor(&self) -> Vec<u8> {
        let mut encoder = Encoder::new();
        self.encode(&mut encoder);
        encoder.finalize()
    }
}

impl Encode for u32 {
    fn encode(&self, encoder: &mut Encoder) {
        encoder.write_unsigned_integer(u64::from(*self));
    }
}

impl Encode for u64 {
    fn encode(&self, encoder: &mut Encoder) {
        encoder.write_unsigned_integer(*self);
    }
}

#[derive(Debug, Default)]
pub struct Encoder {
    buf: Vec<u8>,
}

impl Encoder {
    pub fn new() -> Self {
        Self { buf: Vec::new() }
    }

    fn write_header(&mut self, major: u8, value: u64) -> &mut Self {
        let major = major << 5;
        match value {
            0..=23 => self.buf.push(major | value as u8),
            24..=0xff => {
                self.buf.push(major | 24);
                self.buf.push(value as u8);
            }
            0x100..=0xffff => {
                self.buf.push(major | 25);
                self.buf.extend_from_slice(&(value as u16).to_be_bytes());
            }
            0x1_0000..=0xffff_ffff => {
                self.buf.push(major | 26);
                self.buf.extend_from_slice(&(value as u32).to_be_bytes());
            }
            _ => {
                self.buf.push(major | 27);
                self.buf.extend_from_slice(&value.to_be_bytes());
            }
        }
        self
    }

    pub fn write_unsigned_integer(&mut self, value: u64) -> &mut Self {
        self.write_header(MAJOR_UNSIGNED, value)
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) -> &mut Self {
        self.write_header(MAJOR_BYTES, bytes.len() as u64);
        self.buf.extend_from_slice(bytes);
        self
    }

    pub fn write_array(&mut self, len: Len) -> &mut Self {
        match len {
            Len::Len(n) => self.write_header(MAJOR_ARRAY, n),
            Len::Indefinite => {
                self.buf.push((MAJOR_ARRAY << 5) | INDEFINITE);
                self
            }
        }
    }

    pub fn write_map(&mut self, len: Len) -> &mut Self {
        match len {
            Len::Len(n) => self.write_header(MAJOR_MAP, n),
            Len::Indefinite => {
                self.buf.push((MAJOR_MAP << 5) | INDEFINITE);
                self
            }
        }
    }

    pub fn write_tag(&mut self, tag: u64) -> &mut Self {
        self.write_header(MAJOR_TAG, tag)
    }

    pub fn write_break(&mut self) -> &mut Self {
        self.buf.push(BREAK);
        self
    }

    /// Write `tag 24` around the encoding of `value`
    pub fn write_encoded_cbor(&mut self, value: &impl Encode) -> &mut Self {
        let inner = value.to_cbor();
        self.write_tag(TAG_ENCODED_CBOR).write_bytes(&inner)
    }

    pub fn encode(&mut self, value: &impl Encode) -> &mut Self {
        value.encode(self);
        self
    }

    pub fn finalize(self) -> Vec<u8> {
        self.buf
    }
}

pub struct Decoder<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Decoder<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    fn read_u8(&mut self) -> Result<u8, CborError> {
        let byte = *self
            .data
            .get(self.pos)
            .ok_or(CborError::UnexpectedEof(self.pos))?;
        self.pos += 1;
        Ok(byte)
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], CborError> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|end| *end <= self.data.len())
            .ok_or(CborError::UnexpectedEof(self.data.len()))?;
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    /// Read a header; `None` as the value means indefinite length
    fn read_header(&mut self) -> Result<(u8, Option<u64>), CborError> {
        let initial = self.read_u8()?;
        let major = initial >> 5;
        let info = initial & 0x1f;
        let value = match info {
            0..=23 => Some(u64::from(info)),
            24 => Some(u64::from(self.read_u8()?)),
            25 => {
                let b = self.take(2)?;
                Some(u64::from(u16::from_be_bytes([b[0], b[1]])))
            }
            26 => {
                let b = self.take(4)?;
                Some(u64::from(u32::from_be_bytes([b[0], b[1], b[2], b[3]])))
            }
            27 => {
                let mut b = [0u8; 8];
                b.copy_from_slice(self.take(8)?);
                Some(u64::from_be_bytes(b))
            }
            INDEFINITE => None,
            other => return Err(CborError::UnsupportedInfo(other)),
        };
        Ok((major, value))
    }

    fn expect_major(
        &mut self,
        expected_major: u8,
        expected: &'static str,
    ) -> Result<Option<u64>, CborError> {
        let (major, value) = self.read_header()?;
        if major != expected_major {
            return Err(CborError::UnexpectedType {
                expected,
                found: major,
            });
        }
        Ok(value)
    }

    pub fn unsigned_integer(&mut self) -> Result<u64, CborError> {
        self.expect_major(MAJOR_UNSIGNED, "unsigned integer")?
            .ok_or(CborError::UnexpectedIndefinite("unsigned integer"))
    }

    pub fn u32(&mut self) -> Result<u32, CborError> {
        let value = self.unsigned_integer()?;
        u32::try_from(value).map_err(|_| CborError::IntegerOverflow {
            value,
            target: "u32",
        })
    }

    pub fn bytes(&mut self) -> Result<&'a [u8], CborError> {
        let len = self
            .expect_major(MAJOR_BYTES, "byte string")?
            .ok_or(CborError::UnexpectedIndefinite("byte string"))?;
        let len = usize::try_from(len).map_err(|_| CborError::UnexpectedEof(self.data.len()))?;
        self.take(len)
    }

    pub fn array(&mut self) -> Result<Len, CborError> {
        Ok(match self.expect_major(MAJOR_ARRAY, "array")? {
            Some(n) => Len::Len(n),
            None => Len::Indefinite,
        })
    }

    /// Read a definite array header of exactly `expected` elements
    pub fn array_of(&mut self, expected: u64) -> Result<(), CborError> {
        match self.array()? {
            Len::Len(found) if found == expected => Ok(()),
            Len::Len(found) => Err(CborError::WrongLength { expected, found }),
            Len::Indefinite => Err(CborError::UnexpectedIndefinite("array")),
        }
    }

    pub fn map(&mut self) -> Result<Len, CborError> {
        Ok(match self.expect_major(MAJOR_MAP, "map")? {
            Some(n) => Len::Len(n),
            None => Len::Indefinite,
        })
    }

    pub fn tag(&mut self) -> Result<u64, CborError> {
        self.expect_major(MAJOR_TAG, "tag")?
            .ok_or(CborError::UnexpectedIndefinite("tag"))
    }

    pub fn expect_tag(&mut self, expected: u64) -> Result<(), CborError> {
        let found = self.tag()?;
        if found != expected {
            return Err(CborError::UnexpectedTag { expected, found });
        }
        Ok(())
    }

    /// Check for the break marker without consuming anything else
    pub fn is_break(&self) -> Result<bool, CborError> {
        self.data
            .get(self.pos)
            .map(|b| *b == BREAK)
            .ok_or(CborError::UnexpectedEof(self.pos))
    }

    pub fn consume_break(&mut self) -> Result<(), CborError> {
        let byte = self.read_u8()?;
        if byte != BREAK {
            return Err(CborError::UnexpectedType {
                expected: "break",
                found: byte >> 5,
            });
        }
        Ok(())
    }

    /// Read `tag 24` and return the embedded CBOR bytes
    pub fn encoded_cbor(&mut self) -> Result<&'a [u8], CborError> {
        self.expect_tag(TAG_ENCODED_CBOR)?;
        self.bytes()
    }

    /// Ensure the whole input was consumed
    pub fn finish(&self) -> Result<(), CborError> {
        match self.data.len() - self.pos {
            0 => Ok(()),
            n => Err(CborError::TrailingBytes(n)),
        }
    }
}
