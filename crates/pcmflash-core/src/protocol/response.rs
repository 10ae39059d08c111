//! Reply parsers
//!
//! Each parser checks the frame header, recognises a refusal of the matching
//! request mode, and otherwise validates the reply shape. Anything else is a
//! [`Failure`] so the caller can retry.

use super::*;
use crate::chip::MemoryRange;
use crate::message::Message;
use crate::response::{Ack, Failure, Response};

const HEADER_LEN: usize = 3;

/// Split a reply into its body (mode byte onwards)
///
/// Succeeds only for a PCM-to-tool frame answering `request_mode`.
fn reply_body(message: &Message, request_mode: u8) -> Response<&[u8]> {
    let bytes = message.as_bytes();
    if bytes.len() < HEADER_LEN + 1 {
        return Response::Failure(Failure::Truncated);
    }
    if bytes[..HEADER_LEN] != pcm_header(0)[..HEADER_LEN] {
        return Response::Failure(Failure::Unexpected);
    }

    let body = &bytes[HEADER_LEN..];
    if body[0] == MODE_REFUSED {
        return match body.get(1) {
            Some(&mode) if mode == request_mode => Response::Refused,
            Some(_) => Response::Failure(Failure::Unexpected),
            None => Response::Failure(Failure::Truncated),
        };
    }
    if body[0] != reply_mode(request_mode) {
        return Response::Failure(Failure::Unexpected);
    }

    Response::Success(body)
}

/// Body after mode and sub-mode, requiring at least `len` bytes
fn sub_body(message: &Message, request_mode: u8, submode: u8, len: usize) -> Response<&[u8]> {
    match reply_body(message, request_mode) {
        Response::Success(body) => {
            if body.len() < 2 + len {
                Response::Failure(Failure::Truncated)
            } else if body[1] != submode {
                Response::Failure(Failure::Unexpected)
            } else {
                Response::Success(&body[2..2 + len])
            }
        }
        Response::Refused => Response::Refused,
        Response::Failure(f) => Response::Failure(f),
    }
}

fn ack(message: &Message, request_mode: u8, submode: u8) -> Ack {
    sub_body(message, request_mode, submode, 0).map(|_| ())
}

fn be24(bytes: &[u8]) -> u32 {
    u32::from_be_bytes([0, bytes[0], bytes[1], bytes[2]])
}

/// Parse the kernel ping acknowledgement
pub fn kernel_ping(message: &Message) -> Ack {
    ack(message, MODE_KERNEL_QUERY, SUB_PING)
}

/// Parse the flash chip identifier
pub fn flash_chip_id(message: &Message) -> Response<u32> {
    sub_body(message, MODE_KERNEL_QUERY, SUB_FLASH_CHIP_ID, 4)
        .map(|id| u32::from_be_bytes([id[0], id[1], id[2], id[3]]))
}

/// Parse a CRC reply, requiring it to echo `range`
///
/// A CRC for a different range is a stale reply and counts as a failure.
pub fn crc(message: &Message, range: MemoryRange) -> Response<u32> {
    match sub_body(message, MODE_KERNEL_QUERY, SUB_CRC, 10) {
        Response::Success(body) => {
            let size = be24(&body[0..3]);
            let address = be24(&body[3..6]);
            if size != range.size & 0x00FF_FFFF || address != range.address & 0x00FF_FFFF {
                return Response::Failure(Failure::Unexpected);
            }
            Response::Success(u32::from_be_bytes([body[6], body[7], body[8], body[9]]))
        }
        other => other.map(|_| 0),
    }
}

/// Parse the start-full-flash acknowledgement
pub fn start_full_flash(message: &Message) -> Ack {
    ack(message, MODE_FLASH, SUB_START_FULL_FLASH)
}

/// Parse a data chunk acknowledgement
pub fn data_chunk(message: &Message) -> Ack {
    ack(message, MODE_FLASH, SUB_CHUNK)
}

/// Parse the kernel reset acknowledgement
pub fn kernel_reset(message: &Message) -> Ack {
    ack(message, MODE_FLASH, SUB_KERNEL_RESET)
}

/// Parse the exit-kernel acknowledgement
pub fn exit_kernel(message: &Message) -> Ack {
    reply_body(message, MODE_EXIT_KERNEL).map(|_| ())
}
