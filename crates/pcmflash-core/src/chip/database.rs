//! Chip and memory map tables
//!
//! Pure lookups: no I/O and no retries. Callers must treat `Unknown` and a
//! missing memory map as hard stops rather than guessing.

use super::types::{FlashMemoryType, KnownChip, MemoryRange};

/// Flash chips the write kernel knows how to identify
pub const KNOWN_CHIPS: &[KnownChip] = &[
    // Identifier reported by the stock write kernel for its 512 KiB Intel part
    KnownChip {
        id: 0x1234_1234,
        name: "Intel 512K (kernel id)",
        memory_type: FlashMemoryType::Intel512,
    },
    KnownChip {
        id: 0x0089_4471,
        name: "Intel 28F400B",
        memory_type: FlashMemoryType::Intel512,
    },
    KnownChip {
        id: 0x0001_2223,
        name: "AMD Am29F400BT",
        memory_type: FlashMemoryType::Amd512,
    },
    KnownChip {
        id: 0x0089_889D,
        name: "Intel 28F800B",
        memory_type: FlashMemoryType::Intel1024,
    },
    KnownChip {
        id: 0x0001_2258,
        name: "AMD Am29F800BB",
        memory_type: FlashMemoryType::Amd1024,
    },
];

const INTEL_512_RANGES: &[MemoryRange] = &[MemoryRange::new(0, 0)];

/// Look up a chip identifier in [`KNOWN_CHIPS`]
pub fn find_chip(chip_id: u32) -> Option<&'static KnownChip> {
    KNOWN_CHIPS.iter().find(|chip| chip.id == chip_id)
}

/// Classify a chip identifier
///
/// Unknown identifiers map to [`FlashMemoryType::Unknown`].
pub fn classify_chip(chip_id: u32) -> FlashMemoryType {
    find_chip(chip_id)
        .map(|chip| chip.memory_type)
        .unwrap_or(FlashMemoryType::Unknown)
}

/// Built-in CRC verification ranges for a flash type
///
/// Returns `None` for `Unknown` and for any type without a table.
pub fn memory_ranges_for(memory_type: FlashMemoryType) -> Option<&'static [MemoryRange]> {
    match memory_type {
        FlashMemoryType::Intel512 => Some(INTEL_512_RANGES),
        _ => None,
    }
}

/// Per-vehicle memory map
///
/// Starts out as the built-in tables; entries can be replaced to describe
/// other layouts. Range order is preserved and is the order CRCs are queried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryMap {
    tables: Vec<(FlashMemoryType, Vec<MemoryRange>)>,
}

impl MemoryMap {
    /// Map containing only the built-in tables
    pub fn builtin() -> Self {
        let tables = [
            FlashMemoryType::Intel512,
            FlashMemoryType::Amd512,
            FlashMemoryType::Intel1024,
            FlashMemoryType::Amd1024,
        ]
        .into_iter()
        .filter_map(|t| memory_ranges_for(t).map(|ranges| (t, ranges.to_vec())))
        .collect();
        Self { tables }
    }

    /// Map with no tables at all
    pub fn empty() -> Self {
        Self { tables: Vec::new() }
    }

    /// Set the ranges for a flash type, replacing any existing table
    ///
    /// `Unknown` never gets a table.
    pub fn with_ranges(mut self, memory_type: FlashMemoryType, ranges: &[MemoryRange]) -> Self {
        if memory_type == FlashMemoryType::Unknown {
            return self;
        }
        self.tables.retain(|(t, _)| *t != memory_type);
        self.tables.push((memory_type, ranges.to_vec()));
        self
    }

    /// Ranges for a flash type, in verification order
    pub fn ranges_for(&self, memory_type: FlashMemoryType) -> Option<&[MemoryRange]> {
        self.tables
            .iter()
            .find(|(t, _)| *t == memory_type)
            .map(|(_, ranges)| ranges.as_slice())
    }
}

impl Default for MemoryMap {
    fn default() -> Self {
        Self::builtin()
    }
}
