//! Flash chip type definitions

use core::fmt;

/// Manufacturer/density classification of the installed flash chip
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum FlashMemoryType {
    /// Unrecognised or unsupported chip
    #[default]
    Unknown,
    /// Intel, 512 KiB
    Intel512,
    /// AMD, 512 KiB
    Amd512,
    /// Intel, 1 MiB
    Intel1024,
    /// AMD, 1 MiB
    Amd1024,
}

impl FlashMemoryType {
    /// Total flash size in bytes, if known
    pub const fn size(self) -> Option<u32> {
        match self {
            Self::Unknown => None,
            Self::Intel512 | Self::Amd512 => Some(512 * 1024),
            Self::Intel1024 | Self::Amd1024 => Some(1024 * 1024),
        }
    }
}

impl fmt::Display for FlashMemoryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Unknown => "Unknown",
            Self::Intel512 => "Intel512",
            Self::Amd512 => "Amd512",
            Self::Intel1024 => "Intel1024",
            Self::Amd1024 => "Amd1024",
        };
        f.write_str(name)
    }
}

/// One contiguous region whose checksum is verified
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryRange {
    /// Start address
    pub address: u32,
    /// Size in bytes
    pub size: u32,
}

impl MemoryRange {
    /// Create a new memory range
    pub const fn new(address: u32, size: u32) -> Self {
        Self { address, size }
    }
}

impl fmt::Display for MemoryRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08X} / {:08X}", self.address, self.size)
    }
}

/// A flash chip identifier known to the tool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KnownChip {
    /// Identifier reported by the kernel's chip query
    pub id: u32,
    /// Part name
    pub name: &'static str,
    /// Classification
    pub memory_type: FlashMemoryType,
}

/// CRC reported for one memory range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeChecksum {
    /// The range that was queried
    pub range: MemoryRange,
    /// CRC returned by the kernel
    pub crc: u32,
}
