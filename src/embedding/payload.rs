//! Payload bit sequences and their length-header framing.

use serde::{Deserialize, Serialize};

/// Width of the length header that precedes every embedded payload.
///
/// The header holds the body length in bits, big-endian (MSB first).
pub const HEADER_BITS: usize = 32;

/// Declared encoding of a payload's bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayloadKind {
    /// UTF-8 text.
    Text,
    /// Arbitrary bytes.
    #[default]
    Binary,
}

/// An ordered, finite sequence of bits to hide in a carrier.
///
/// Bits are packed MSB-first into bytes; the final byte may be partially
/// used when the payload was built from an explicit bit list. Equality
/// compares the bits only: the declared kind is not embedded, so an
/// extracted payload equals its source regardless of kind.
#[derive(Clone)]
pub struct Payload {
    /// Packed bit data.
    data: Vec<u8>,
    /// Number of meaningful bits in `data`.
    bit_len: usize,
    /// Declared encoding.
    kind: PayloadKind,
}

impl Payload {
    /// Creates a text payload from its UTF-8 bytes.
    pub fn from_text(text: &str) -> Self {
        Self {
            data: text.as_bytes().to_vec(),
            bit_len: text.len() * 8,
            kind: PayloadKind::Text,
        }
    }

    /// Creates a binary payload from raw bytes.
    pub fn from_bytes(data: Vec<u8>) -> Self {
        let bit_len = data.len() * 8;
        Self {
            data,
            bit_len,
            kind: PayloadKind::Binary,
        }
    }

    /// Creates a binary payload from an explicit bit list.
    pub fn from_bits<I>(bits: I) -> Self
    where
        I: IntoIterator<Item = bool>,
    {
        let mut data = Vec::new();
        let mut bit_len = 0usize;
        for bit in bits {
            if bit_len % 8 == 0 {
                data.push(0);
            }
            if bit {
                let last = data.len() - 1;
                data[last] |= 0x80 >> (bit_len % 8);
            }
            bit_len += 1;
        }
        Self {
            data,
            bit_len,
            kind: PayloadKind::Binary,
        }
    }

    /// Returns the number of payload bits (header excluded).
    #[inline]
    pub fn bit_len(&self) -> usize {
        self.bit_len
    }

    /// Returns the number of bits occupied once framed with the header.
    #[inline]
    pub fn framed_len(&self) -> usize {
        HEADER_BITS + self.bit_len
    }

    /// True for a zero-length payload.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bit_len == 0
    }

    /// Declared encoding.
    #[inline]
    pub fn kind(&self) -> PayloadKind {
        self.kind
    }

    /// Returns a copy relabelled with another declared encoding.
    pub fn with_kind(mut self, kind: PayloadKind) -> Self {
        self.kind = kind;
        self
    }

    /// Returns bit `index` (0 = first bit). Panics when out of range.
    #[inline]
    pub fn bit(&self, index: usize) -> bool {
        assert!(index < self.bit_len, "bit index {index} out of range");
        (self.data[index / 8] >> (7 - index % 8)) & 1 == 1
    }

    /// Iterates over the payload bits in order.
    pub fn bits(&self) -> impl Iterator<Item = bool> + '_ {
        (0..self.bit_len).map(move |i| self.bit(i))
    }

    /// Iterates over the header bits followed by the payload bits.
    pub fn framed_bits(&self) -> impl Iterator<Item = bool> + '_ {
        let declared = self.bit_len as u32;
        (0..HEADER_BITS)
            .map(move |i| (declared >> (HEADER_BITS - 1 - i)) & 1 == 1)
            .chain(self.bits())
    }

    /// Returns the packed bytes; a trailing partial byte is zero-padded.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Consumes the payload and returns its packed bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    /// Interprets the payload as UTF-8 text.
    pub fn as_text(&self) -> Result<&str, std::str::Utf8Error> {
        std::str::from_utf8(&self.data)
    }

    /// Counts the number of set bits.
    pub fn popcount(&self) -> usize {
        self.bits().filter(|&b| b).count()
    }
}

impl PartialEq for Payload {
    fn eq(&self, other: &Self) -> bool {
        // Unused trailing bits are always zero, so bytes compare exactly.
        self.bit_len == other.bit_len && self.data == other.data
    }
}

impl Eq for Payload {}

impl std::fmt::Debug for Payload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Payload")
            .field("kind", &self.kind)
            .field("bits", &self.bit_len)
            .field("ones", &self.popcount())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_payload() {
        let payload = Payload::from_text("Hi");

        assert_eq!(payload.bit_len(), 16);
        assert_eq!(payload.kind(), PayloadKind::Text);
        assert_eq!(payload.as_text().unwrap(), "Hi");
        // 'H' = 0x48 = 0100_1000
        let first: Vec<bool> = payload.bits().take(8).collect();
        assert_eq!(
            first,
            vec![false, true, false, false, true, false, false, false]
        );
    }

    #[test]
    fn test_from_bits_partial_byte() {
        let payload = Payload::from_bits([true, false, true]);

        assert_eq!(payload.bit_len(), 3);
        assert_eq!(payload.as_bytes(), &[0b1010_0000]);
        assert_eq!(payload.bits().collect::<Vec<_>>(), vec![true, false, true]);
    }

    #[test]
    fn test_empty_payload() {
        let payload = Payload::from_bits(std::iter::empty());

        assert!(payload.is_empty());
        assert_eq!(payload.framed_len(), HEADER_BITS);
        assert!(payload.framed_bits().all(|b| !b));
    }

    #[test]
    fn test_header_is_big_endian_bit_count() {
        let payload = Payload::from_bytes(vec![0xFF; 3]);
        let header: Vec<bool> = payload.framed_bits().take(HEADER_BITS).collect();

        let value = header.iter().fold(0u32, |acc, &b| (acc << 1) | b as u32);
        assert_eq!(value, 24);
        assert_eq!(payload.framed_bits().count(), HEADER_BITS + 24);
    }

    #[test]
    fn test_binary_not_utf8() {
        let payload = Payload::from_bytes(vec![0xFF, 0xFE]);
        assert!(payload.as_text().is_err());
        assert_eq!(payload.popcount(), 15);
    }
}
