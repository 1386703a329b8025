//! G.192 soft-bit bitstream access
//!
//! Every transmitted bit occupies one 16-bit codeword: `0x007F` for a zero
//! and `0x0081` for a one. Encoders and decoders move a cursor over a slice
//! of codewords; fields are written most significant bit first.
//!
//! The cursor can be repositioned. The layered encoder uses this to fill a
//! header after the payload it depends on, and to place refinement bits in
//! the padding left behind by the multiplexer.

pub mod g192;

pub use g192::{soft_bits_view, G192Frame};

/// G.192 soft bit for a binary zero
pub const G192_ZERO: u16 = 0x007F;
/// G.192 soft bit for a binary one
pub const G192_ONE: u16 = 0x0081;
/// G.192 synchronisation word of a good frame
pub const G192_SYNC_GOOD: u16 = 0x6B21;
/// G.192 synchronisation word of a bad (erased) frame
pub const G192_SYNC_BAD: u16 = 0x6B20;

/// Hard decision threshold between the zero and one codewords
const HARD_DECISION_THRESHOLD: u16 = 0x0080;

/// Convert a soft bit to a hard bit
#[inline]
pub fn soft_to_hard(soft: u16) -> u8 {
    u8::from(soft > HARD_DECISION_THRESHOLD)
}

/// Convert a hard bit to its soft-bit codeword
#[inline]
pub fn hard_to_soft(bit: u8) -> u16 {
    if bit != 0 {
        G192_ONE
    } else {
        G192_ZERO
    }
}

/// Convert hard bits (0/1) to G.192 soft bits
pub fn hard_bits_to_g192(hard_bits: &[u8]) -> Vec<u16> {
    hard_bits.iter().map(|&bit| hard_to_soft(bit)).collect()
}

/// Convert G.192 soft bits to hard bits (0/1)
pub fn g192_to_hard_bits(soft_bits: &[u16]) -> Vec<u8> {
    soft_bits.iter().map(|&soft| soft_to_hard(soft)).collect()
}

/// Cursor writing soft bits into a caller-provided buffer
#[derive(Debug)]
pub struct SoftBitWriter<'a> {
    buf: &'a mut [u16],
    pos: usize,
}

impl<'a> SoftBitWriter<'a> {
    /// Create a writer positioned at the start of `buf`
    pub fn new(buf: &'a mut [u16]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Write a single bit
    ///
    /// Writes past the end of the buffer are dropped; callers size the
    /// buffer for the full layer budget before encoding.
    #[inline]
    pub fn write_bit(&mut self, bit: u8) {
        if let Some(slot) = self.buf.get_mut(self.pos) {
            *slot = hard_to_soft(bit);
        }
        self.pos += 1;
    }

    /// Write the `width` least significant bits of `value`, MSB first
    pub fn write_bits(&mut self, value: u32, width: usize) {
        for i in (0..width).rev() {
            self.write_bit(((value >> i) & 1) as u8);
        }
    }

    /// Write `count` one bits
    pub fn write_ones(&mut self, count: usize) {
        for _ in 0..count {
            self.write_bit(1);
        }
    }

    /// Write zero bits up to absolute position `end`
    pub fn pad_to(&mut self, end: usize) {
        while self.pos < end {
            self.write_bit(0);
        }
    }

    /// Current cursor position in bits
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Move the cursor to an absolute bit position
    pub fn seek(&mut self, pos: usize) {
        self.pos = pos;
    }

    /// Capacity of the underlying buffer in bits
    pub fn capacity(&self) -> usize {
        self.buf.len()
    }
}

/// Cursor reading soft bits from a buffer
#[derive(Debug, Clone)]
pub struct SoftBitReader<'a> {
    buf: &'a [u16],
    pos: usize,
}

impl<'a> SoftBitReader<'a> {
    /// Create a reader positioned at the start of `buf`
    pub fn new(buf: &'a [u16]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Read a single bit (hard decision)
    ///
    /// Reading past the end yields zeros.
    #[inline]
    pub fn read_bit(&mut self) -> u8 {
        let bit = self.buf.get(self.pos).map_or(0, |&soft| soft_to_hard(soft));
        self.pos += 1;
        bit
    }

    /// Read a `width`-bit field, MSB first
    pub fn read_bits(&mut self, width: usize) -> u32 {
        let mut value = 0u32;
        for _ in 0..width {
            value = (value << 1) | u32::from(self.read_bit());
        }
        value
    }

    /// Current cursor position in bits
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Move the cursor to an absolute bit position
    pub fn seek(&mut self, pos: usize) {
        self.pos = pos;
    }

    /// Number of bits in the underlying buffer
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Whether the underlying buffer is empty
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_g192_constants() {
        assert_eq!(G192_ZERO, 0x007F);
        assert_eq!(G192_ONE, 0x0081);
        assert_eq!(G192_SYNC_GOOD, 0x6B21);
        assert_eq!(G192_SYNC_BAD, 0x6B20);
    }

    #[test]
    fn test_soft_bit_conversion() {
        let hard_bits = vec![0, 1, 0, 1, 1, 0];
        let soft_bits = hard_bits_to_g192(&hard_bits);
        let expected = vec![G192_ZERO, G192_ONE, G192_ZERO, G192_ONE, G192_ONE, G192_ZERO];
        assert_eq!(soft_bits, expected);
        assert_eq!(g192_to_hard_bits(&soft_bits), hard_bits);
    }

    #[test]
    fn test_writer_msb_first() {
        let mut buf = [0u16; 8];
        let mut writer = SoftBitWriter::new(&mut buf);
        writer.write_bits(0b1011, 4);
        writer.write_ones(2);
        writer.pad_to(8);
        assert_eq!(writer.position(), 8);
        assert_eq!(g192_to_hard_bits(&buf), vec![1, 0, 1, 1, 1, 1, 0, 0]);
    }

    #[test]
    fn test_writer_seek_overwrites() {
        let mut buf = [0u16; 6];
        let mut writer = SoftBitWriter::new(&mut buf);
        writer.pad_to(6);
        writer.seek(2);
        writer.write_bits(0b11, 2);
        assert_eq!(writer.position(), 4);
        assert_eq!(g192_to_hard_bits(&buf), vec![0, 0, 1, 1, 0, 0]);
    }

    #[test]
    fn test_reader_fields_and_overrun() {
        let soft = hard_bits_to_g192(&[1, 1, 0, 1, 0]);
        let mut reader = SoftBitReader::new(&soft);
        assert_eq!(reader.read_bits(3), 0b110);
        assert_eq!(reader.read_bits(2), 0b10);
        // Past the end reads as zero
        assert_eq!(reader.read_bits(4), 0);
        assert_eq!(reader.position(), 9);
    }

    #[test]
    fn test_hard_decision_on_noisy_codewords() {
        let soft = [0x0000, 0x0080, 0x0090, 0x7FFF];
        let mut reader = SoftBitReader::new(&soft);
        assert_eq!(reader.read_bits(4), 0b0011);
    }
}
