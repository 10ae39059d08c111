//! Request frame builders
//!
//! Pure functions: every call returns a fresh [`Message`].

use super::*;
use crate::chip::MemoryRange;
use crate::message::Message;

fn kernel_query(submode: u8) -> Message {
    let [p, t, s, m] = tool_header(MODE_KERNEL_QUERY);
    Message::new(vec![p, t, s, m, submode])
}

fn flash_control(submode: u8) -> Message {
    let [p, t, s, m] = tool_header(MODE_FLASH);
    Message::new(vec![p, t, s, m, submode])
}

/// Ask the kernel whether it is alive
pub fn kernel_ping() -> Message {
    kernel_query(SUB_PING)
}

/// Ask the kernel for the flash chip identifier
///
/// The stock operating system refuses this, which is how a running kernel
/// is told apart from stock firmware.
pub fn flash_chip_id() -> Message {
    kernel_query(SUB_FLASH_CHIP_ID)
}

/// Ask the kernel for the CRC of a memory range
///
/// Size and address are sent as 24-bit big-endian values.
pub fn crc(range: MemoryRange) -> Message {
    let [p, t, s, m] = tool_header(MODE_KERNEL_QUERY);
    let size = range.size.to_be_bytes();
    let address = range.address.to_be_bytes();
    Message::new(vec![
        p, t, s, m, SUB_CRC, size[1], size[2], size[3], address[1], address[2], address[3],
    ])
}

/// Tell the kernel to unlock and erase the whole chip
pub fn start_full_flash() -> Message {
    flash_control(SUB_START_FULL_FLASH)
}

/// Build one checksummed data chunk destined for `address`
pub fn data_chunk(address: u32, payload: &[u8]) -> Message {
    let [p, t, s, m] = tool_header(MODE_FLASH);
    Message::block([p, t, s, m, SUB_CHUNK], address, payload)
}

/// Tell the flash kernel to reset the module
pub fn kernel_reset() -> Message {
    flash_control(SUB_KERNEL_RESET)
}

/// Tell the module to resume normal communications
pub fn exit_kernel() -> Message {
    Message::new(tool_header(MODE_EXIT_KERNEL).to_vec())
}
