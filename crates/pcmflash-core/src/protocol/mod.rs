//! VPW wire format
//!
//! [`request`] holds the pure frame builders and [`response`] the parsers
//! that turn a received frame into a [`Response`](crate::Response). Both
//! sides share the constants below, so the emulated module in
//! `pcmflash-dummy` speaks exactly the same dialect.
//!
//! Every frame starts with priority, target and source bytes. Replies use
//! the request mode plus `0x40`; a refusal is mode `0x7F` followed by the
//! refused request mode.

pub mod request;
pub mod response;

/// Priority byte for physically addressed node-to-node frames
pub const PRIORITY: u8 = 0x6C;
/// Physical address of the PCM
pub const PCM: u8 = 0x10;
/// Physical address of the tool
pub const TOOL: u8 = 0xF0;

/// Offset added to a request mode in a positive reply
pub const REPLY_OFFSET: u8 = 0x40;
/// Mode byte of a refusal
pub const MODE_REFUSED: u8 = 0x7F;

/// Kernel query mode (ping, chip id, CRC)
pub const MODE_KERNEL_QUERY: u8 = 0x3D;
/// Flash kernel control mode (chunk, start full flash, reset)
pub const MODE_FLASH: u8 = 0x3C;
/// Return to normal communications; makes a kernel exit
pub const MODE_EXIT_KERNEL: u8 = 0x20;

/// Kernel query sub-mode: ping
pub const SUB_PING: u8 = 0x00;
/// Kernel query sub-mode: flash chip id
pub const SUB_FLASH_CHIP_ID: u8 = 0x01;
/// Kernel query sub-mode: CRC of a range
pub const SUB_CRC: u8 = 0x02;

/// Flash sub-mode: data chunk
pub const SUB_CHUNK: u8 = 0x00;
/// Flash sub-mode: start full flash (unlock and erase)
pub const SUB_START_FULL_FLASH: u8 = 0x01;
/// Flash sub-mode: reset the module and leave the kernel
pub const SUB_KERNEL_RESET: u8 = 0x02;

/// Reply mode for a request mode
pub const fn reply_mode(request_mode: u8) -> u8 {
    request_mode.wrapping_add(REPLY_OFFSET)
}

/// Header of a frame sent by the tool
pub const fn tool_header(mode: u8) -> [u8; 4] {
    [PRIORITY, PCM, TOOL, mode]
}

/// Header of a frame sent by the PCM
pub const fn pcm_header(mode: u8) -> [u8; 4] {
    [PRIORITY, TOOL, PCM, mode]
}
