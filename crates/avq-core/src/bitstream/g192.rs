//! G.192 frame framing
//!
//! A G.192 frame is a synchronisation word, a length word and one soft-bit
//! word per payload bit, all 16-bit little-endian on disk and on the wire
//! of the test harnesses.

use bytes::{BufMut, Bytes, BytesMut};

use super::{G192_ONE, G192_SYNC_BAD, G192_SYNC_GOOD, G192_ZERO};
use crate::error::{AvqError, Result};

/// G.192 frame structure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct G192Frame {
    /// Sync header (0x6B21 for good frame, 0x6B20 for bad frame)
    pub sync_header: u16,
    /// Frame length in soft bits
    pub frame_length: u16,
    /// Payload soft bits
    pub data_bits: Vec<u16>,
}

impl G192Frame {
    /// Create a new frame around payload soft bits
    pub fn new(data_bits: Vec<u16>, is_good_frame: bool) -> Self {
        Self {
            sync_header: if is_good_frame {
                G192_SYNC_GOOD
            } else {
                G192_SYNC_BAD
            },
            frame_length: data_bits.len() as u16,
            data_bits,
        }
    }

    /// Whether the frame carries the good-frame sync word
    pub fn is_good_frame(&self) -> bool {
        self.sync_header == G192_SYNC_GOOD
    }

    /// Strictly validate header and payload codewords
    ///
    /// # Errors
    ///
    /// Returns an error for an unknown sync word, a length word that does not
    /// match the payload (or `expected_len` when given), or a payload word
    /// that is not one of the two soft-bit codewords.
    pub fn validate(&self, expected_len: Option<usize>) -> Result<()> {
        if self.sync_header != G192_SYNC_GOOD && self.sync_header != G192_SYNC_BAD {
            return Err(AvqError::InvalidSyncWord {
                value: self.sync_header,
            });
        }

        if usize::from(self.frame_length) != self.data_bits.len() {
            return Err(AvqError::InvalidFrameSize {
                expected: usize::from(self.frame_length),
                actual: self.data_bits.len(),
            });
        }

        if let Some(expected) = expected_len {
            if self.data_bits.len() != expected {
                return Err(AvqError::InvalidFrameSize {
                    expected,
                    actual: self.data_bits.len(),
                });
            }
        }

        if let Some((position, &value)) = self
            .data_bits
            .iter()
            .enumerate()
            .find(|(_, &bit)| bit != G192_ZERO && bit != G192_ONE)
        {
            return Err(AvqError::InvalidSoftBit { position, value });
        }

        Ok(())
    }

    /// Serialise as little-endian 16-bit words
    pub fn to_bytes(&self) -> Bytes {
        let mut out = BytesMut::with_capacity(4 + 2 * self.data_bits.len());
        out.put_u16_le(self.sync_header);
        out.put_u16_le(self.frame_length);
        for &word in &self.data_bits {
            out.put_u16_le(word);
        }
        out.freeze()
    }

    /// Parse one frame from little-endian bytes
    ///
    /// Returns the frame and the number of bytes consumed.
    ///
    /// # Errors
    ///
    /// Returns an error if the buffer is shorter than the header or the
    /// announced payload, or if the sync word is unknown.
    pub fn from_bytes(data: &[u8]) -> Result<(Self, usize)> {
        if data.len() < 4 {
            return Err(AvqError::BufferTooSmall {
                needed: 4,
                actual: data.len(),
            });
        }

        let word = |i: usize| u16::from_le_bytes([data[2 * i], data[2 * i + 1]]);
        let sync_header = word(0);
        if sync_header != G192_SYNC_GOOD && sync_header != G192_SYNC_BAD {
            return Err(AvqError::InvalidSyncWord { value: sync_header });
        }

        let frame_length = word(1);
        let needed = 4 + 2 * usize::from(frame_length);
        if data.len() < needed {
            return Err(AvqError::BufferTooSmall {
                needed,
                actual: data.len(),
            });
        }

        let data_bits = (0..usize::from(frame_length)).map(|i| word(2 + i)).collect();
        Ok((
            Self {
                sync_header,
                frame_length,
                data_bits,
            },
            needed,
        ))
    }
}

/// View a native-endian byte buffer as soft-bit words without copying
///
/// Returns `None` when the buffer is misaligned or has an odd length.
pub fn soft_bits_view(data: &[u8]) -> Option<&[u16]> {
    bytemuck::try_cast_slice(data).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_g192_frame_creation() {
        let data_bits = vec![G192_ZERO, G192_ONE, G192_ZERO, G192_ONE];
        let frame = G192Frame::new(data_bits.clone(), true);
        assert_eq!(frame.sync_header, G192_SYNC_GOOD);
        assert_eq!(frame.frame_length, 4);
        assert!(frame.is_good_frame());

        let bad = G192Frame::new(data_bits, false);
        assert_eq!(bad.sync_header, G192_SYNC_BAD);
        assert!(!bad.is_good_frame());
    }

    #[test]
    fn test_frame_validation() {
        let frame = G192Frame::new(vec![G192_ZERO; 36], true);
        assert!(frame.validate(Some(36)).is_ok());
        assert!(matches!(
            frame.validate(Some(40)),
            Err(AvqError::InvalidFrameSize { expected: 40, actual: 36 })
        ));

        let mut corrupt = frame.clone();
        corrupt.data_bits[5] = 0x1234;
        assert!(matches!(
            corrupt.validate(None),
            Err(AvqError::InvalidSoftBit { position: 5, value: 0x1234 })
        ));

        let mut unsynced = frame;
        unsynced.sync_header = 0x0000;
        assert!(matches!(
            unsynced.validate(None),
            Err(AvqError::InvalidSyncWord { .. })
        ));
    }

    #[test]
    fn test_byte_serialisation() {
        let frame = G192Frame::new(vec![G192_ONE, G192_ZERO, G192_ONE], true);
        let bytes = frame.to_bytes();
        assert_eq!(bytes.len(), 10);
        assert_eq!(&bytes[..4], &[0x21, 0x6B, 0x03, 0x00]);

        let (parsed, consumed) = G192Frame::from_bytes(&bytes).unwrap();
        assert_eq!(consumed, 10);
        assert_eq!(parsed, frame);
    }

    #[test]
    fn test_truncated_bytes() {
        let frame = G192Frame::new(vec![G192_ONE; 8], true);
        let bytes = frame.to_bytes();
        assert!(matches!(
            G192Frame::from_bytes(&bytes[..10]),
            Err(AvqError::BufferTooSmall { .. })
        ));
        assert!(G192Frame::from_bytes(&bytes[..2]).is_err());
    }

    #[test]
    fn test_soft_bits_view() {
        let words: [u16; 3] = [G192_ZERO, G192_ONE, G192_ONE];
        let bytes: &[u8] = bytemuck::cast_slice(&words);
        assert_eq!(soft_bits_view(bytes), Some(&words[..]));
        assert_eq!(soft_bits_view(&bytes[..3]), None);
    }
}
