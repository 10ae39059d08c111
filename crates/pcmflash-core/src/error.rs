//! Error types for pcmflash-core
//!
//! Transport noise and malformed replies are not errors: they are
//! [`Failure`](crate::response::Failure) responses consumed by the retry
//! loops. An [`Error`] is what remains once a step has definitively failed.

use crate::chip::{FlashMemoryType, MemoryRange};
use thiserror::Error;

/// Core error type
#[derive(Debug, Error)]
pub enum Error {
    /// The device driver reported a fault (not ordinary bus noise)
    #[error("device fault: {0}")]
    Device(String),

    /// The PCM explicitly rejected a request
    #[error("{operation} was refused by the PCM")]
    Refused {
        /// What was being requested
        operation: String,
    },

    /// No valid reply was received within the attempt budget
    #[error("no valid {operation} response after {attempts} attempt(s)")]
    NoResponse {
        /// What was being requested
        operation: String,
        /// How many attempts were made
        attempts: u32,
    },

    /// CRC query for a memory range failed
    #[error("unable to get CRC for memory range {0}")]
    CrcUnavailable(MemoryRange),

    /// Flash chip identifier is not in the chip table
    #[error("unsupported flash chip ID 0x{0:08X}")]
    UnsupportedChip(u32),

    /// No memory map is defined for the flash type
    #[error("unsupported flash memory format {0}")]
    UnsupportedMemoryType(FlashMemoryType),

    /// Input image shorter than its declared length
    #[error("input image is {actual} bytes, expected {expected}")]
    ShortRead {
        /// Declared length in bytes
        expected: u64,
        /// Bytes actually read
        actual: u64,
    },

    /// Image does not fit the 24-bit chunk address field
    #[error("image of {0} bytes exceeds the 24-bit address space")]
    ImageTooLarge(usize),

    /// Image has no bytes to write
    #[error("image is empty")]
    EmptyImage,

    /// Cooperative cancellation was observed
    #[error("operation cancelled")]
    Cancelled,

    /// `WriteType::Invalid` was requested
    #[error("invalid write type")]
    InvalidWriteType,

    /// The requested write strategy does not exist yet
    #[error("{0} is not implemented")]
    NotImplemented(&'static str),

    /// Kernel image could not be loaded
    #[error("failed to load kernel {name}: {reason}")]
    KernelLoad {
        /// Kernel file name
        name: String,
        /// Underlying cause
        reason: String,
    },

    /// Kernel upload via block execute failed
    #[error("failed to upload kernel to 0x{0:06X}")]
    KernelUpload(u32),

    /// I/O error while reading the image
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether this error is an unexpected fault rather than a protocol outcome
    ///
    /// Faults during a write leave the module in an unknown state, so the
    /// user gets the "do not power off" warning for these.
    pub fn is_fault(&self) -> bool {
        matches!(self, Self::Device(_))
    }
}

/// Result type alias using the core Error type
pub type Result<T> = std::result::Result<T, Error>;
