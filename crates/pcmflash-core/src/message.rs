//! Bus frames
//!
//! A [`Message`] is one VPW frame as handed to the device: priority, target,
//! source, mode and payload. The adapter appends the bus CRC itself, so only
//! block transfers carry a checksum of their own (see [`Message::block`]).

use core::fmt;

/// Offset of the first byte covered by the block checksum (the sub-mode)
pub const BLOCK_CHECKSUM_START: usize = 4;

/// Length of the block header: priority, target, source, mode, sub-mode,
/// 16-bit length, 24-bit address
pub const BLOCK_HEADER_LEN: usize = 10;

/// Length of the block checksum trailer
pub const BLOCK_TRAILER_LEN: usize = 2;

/// An immutable bus frame
#[derive(Clone, PartialEq, Eq)]
pub struct Message {
    bytes: Box<[u8]>,
}

impl Message {
    /// Wrap raw frame bytes
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: bytes.into().into_boxed_slice(),
        }
    }

    /// Build a block transfer frame
    ///
    /// Layout: `header[0..5] | len_hi len_lo | addr2 addr1 addr0 | payload | sum_hi sum_lo`
    /// where `header` is priority, target, source, mode and sub-mode. The
    /// length field and checksum always describe exactly `payload`, so a
    /// short trailing chunk produces a correspondingly shorter frame.
    ///
    /// # Panics
    /// Panics if `payload` is longer than `u16::MAX` bytes or `address`
    /// does not fit in 24 bits.
    pub fn block(header: [u8; 5], address: u32, payload: &[u8]) -> Self {
        assert!(payload.len() <= u16::MAX as usize, "block payload too long");
        assert!(address <= 0x00FF_FFFF, "block address exceeds 24 bits");

        let len = payload.len() as u16;
        let mut bytes = Vec::with_capacity(BLOCK_HEADER_LEN + payload.len() + BLOCK_TRAILER_LEN);
        bytes.extend_from_slice(&header);
        bytes.extend_from_slice(&len.to_be_bytes());
        bytes.extend_from_slice(&address.to_be_bytes()[1..]);
        bytes.extend_from_slice(payload);

        let sum = block_checksum(&bytes[BLOCK_CHECKSUM_START..]);
        bytes.extend_from_slice(&sum.to_be_bytes());

        Self::new(bytes)
    }

    /// Raw frame bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Frame length in bytes
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the frame is empty
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Byte at `index`, if present
    pub fn get(&self, index: usize) -> Option<u8> {
        self.bytes.get(index).copied()
    }

    /// Decode a block transfer frame built by [`Message::block`]
    ///
    /// Returns `None` if the frame is too short, its length field does not
    /// match the frame size, or the checksum is wrong.
    pub fn block_parts(&self) -> Option<BlockParts<'_>> {
        let bytes = self.as_bytes();
        if bytes.len() < BLOCK_HEADER_LEN + BLOCK_TRAILER_LEN {
            return None;
        }

        let len = u16::from_be_bytes([bytes[5], bytes[6]]) as usize;
        if bytes.len() != BLOCK_HEADER_LEN + len + BLOCK_TRAILER_LEN {
            return None;
        }

        let end = BLOCK_HEADER_LEN + len;
        let expected = u16::from_be_bytes([bytes[end], bytes[end + 1]]);
        if block_checksum(&bytes[BLOCK_CHECKSUM_START..end]) != expected {
            return None;
        }

        Some(BlockParts {
            submode: bytes[4],
            address: u32::from_be_bytes([0, bytes[7], bytes[8], bytes[9]]),
            payload: &bytes[BLOCK_HEADER_LEN..end],
        })
    }
}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Message[{}]", HexBytes(&self.bytes))
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", HexBytes(&self.bytes))
    }
}

/// Decoded view of a block transfer frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockParts<'a> {
    /// Sub-mode byte
    pub submode: u8,
    /// 24-bit destination address
    pub address: u32,
    /// Payload bytes
    pub payload: &'a [u8],
}

/// 16-bit wrapping byte sum used as the block checksum
pub fn block_checksum(bytes: &[u8]) -> u16 {
    bytes
        .iter()
        .fold(0u16, |sum, &b| sum.wrapping_add(b as u16))
}

/// Space-separated upper-case hex, for logging frames
pub struct HexBytes<'a>(pub &'a [u8]);

impl fmt::Display for HexBytes<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, b) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{:02X}", b)?;
        }
        Ok(())
    }
}
