//! Entry encoding/decoding with CRC32 checksums
//!
//! ## Frame Format
//!
//! ```text
//! +----------------+----------------+---------------------------+
//! | len: u32 (LE)  | crc32: u32 (LE)| payload: len bytes        |
//! +----------------+----------------+---------------------------+
//! ```
//!
//! The payload is a MessagePack-encoded [`WalEntry`]; the checksum covers the
//! payload only.

use crate::wal::WalEntry;
use byteorder::{ByteOrder, LittleEndian};
use thiserror::Error;

/// Size of the frame header (length + checksum)
pub const FRAME_HEADER_SIZE: usize = 8;

/// Largest payload accepted when decoding
///
/// A length above this is treated as damage rather than an allocation request.
pub const MAX_ENTRY_SIZE: usize = 64 * 1024 * 1024;

/// Frame decoding errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    /// The buffer ends before the frame does (torn write at the tail)
    #[error("incomplete entry at offset {offset}: need {needed} bytes, have {have}")]
    Incomplete {
        /// Offset of the frame
        offset: u64,
        /// Bytes available
        have: usize,
        /// Bytes required
        needed: usize,
    },

    /// Payload bytes do not match the stored checksum
    #[error("checksum mismatch at offset {offset}: expected {expected:#010x}, got {actual:#010x}")]
    ChecksumMismatch {
        /// Offset of the frame
        offset: u64,
        /// Checksum stored in the header
        expected: u32,
        /// Checksum computed over the payload
        actual: u32,
    },

    /// Declared length exceeds [`MAX_ENTRY_SIZE`]
    #[error("entry at offset {offset} declares {len} bytes")]
    Oversized {
        /// Offset of the frame
        offset: u64,
        /// Declared payload length
        len: usize,
    },

    /// Checksum matched but the payload is not a valid entry
    #[error("undecodable entry at offset {offset}: {message}")]
    Payload {
        /// Offset of the frame
        offset: u64,
        /// Decoder message
        message: String,
    },
}

impl DecodeError {
    /// Check if the error could be a write cut short by a crash
    pub fn is_torn_write(&self) -> bool {
        matches!(
            self,
            DecodeError::Incomplete { .. } | DecodeError::ChecksumMismatch { .. }
        )
    }
}

/// Encode an entry into a checksummed frame
pub fn encode_entry(entry: &WalEntry) -> tcc_core::Result<Vec<u8>> {
    let payload = rmp_serde::to_vec(entry)?;
    let len = u32::try_from(payload.len())
        .map_err(|_| tcc_core::Error::Serialization("log entry exceeds 4 GiB".to_string()))?;

    let mut frame = vec![0u8; FRAME_HEADER_SIZE];
    LittleEndian::write_u32(&mut frame[0..4], len);
    LittleEndian::write_u32(&mut frame[4..8], crc32fast::hash(&payload));
    frame.extend_from_slice(&payload);
    Ok(frame)
}

/// Decode one frame from the start of `buf`
///
/// `offset` is the position of `buf` within the log and is only used for
/// error reporting. Returns the entry and the total frame length consumed.
pub fn decode_entry(buf: &[u8], offset: u64) -> Result<(WalEntry, usize), DecodeError> {
    if buf.len() < FRAME_HEADER_SIZE {
        return Err(DecodeError::Incomplete {
            offset,
            have: buf.len(),
            needed: FRAME_HEADER_SIZE,
        });
    }

    let len = LittleEndian::read_u32(&buf[0..4]) as usize;
    let expected = LittleEndian::read_u32(&buf[4..8]);

    if len > MAX_ENTRY_SIZE {
        return Err(DecodeError::Oversized { offset, len });
    }

    let total = FRAME_HEADER_SIZE + len;
    if buf.len() < total {
        return Err(DecodeError::Incomplete {
            offset,
            have: buf.len(),
            needed: total,
        });
    }

    let payload = &buf[FRAME_HEADER_SIZE..total];
    let actual = crc32fast::hash(payload);
    if actual != expected {
        return Err(DecodeError::ChecksumMismatch {
            offset,
            expected,
            actual,
        });
    }

    let entry = rmp_serde::from_slice(payload).map_err(|e| DecodeError::Payload {
        offset,
        message: e.to_string(),
    })?;

    Ok((entry, total))
}
