//! Calibration verification

use maybe_async::maybe_async;

use super::Vehicle;
use crate::chip::{classify_chip, FlashMemoryType, MemoryRange, RangeChecksum};
use crate::device::Device;
use crate::error::{Error, Result};
use crate::logger::Logger;
use crate::message::Message;
use crate::protocol::{request, response};
use crate::response::Response;

const SUPPORT_NOTE: &str = "The flash memory in this PCM is not supported by this version of pcmflash.";

impl<D: Device, L: Logger> Vehicle<D, L> {
    /// Identify the flash chip and query the CRC of every range in its map
    ///
    /// Ranges are queried in map order and the first failure stops the
    /// walk. CRC values are returned, not compared.
    #[maybe_async]
    pub async fn verify_calibration(&mut self) -> Result<Vec<RangeChecksum>> {
        let response = self
            .query(request::flash_chip_id, response::flash_chip_id)
            .await?;
        if !response.is_success() {
            self.logger
                .user_message("Unable to determine which flash chip is in this PCM");
        }
        let chip_id =
            response.into_result("flash chip query", self.config.query_policy.max_attempts)?;

        let memory_type = classify_chip(chip_id);
        if memory_type == FlashMemoryType::Unknown {
            self.logger
                .user_message(&format!("Unsupported flash chip ID 0x{:08X}.", chip_id));
            self.logger.user_message(SUPPORT_NOTE);
            return Err(Error::UnsupportedChip(chip_id));
        }
        self.logger
            .debug_message(&format!("Flash chip 0x{:08X} is {}", chip_id, memory_type));

        let ranges: Vec<MemoryRange> = match self.config.memory_map.ranges_for(memory_type) {
            Some(ranges) => ranges.to_vec(),
            None => {
                self.logger
                    .user_message(&format!("Unsupported flash memory format {}.", memory_type));
                self.logger.user_message(SUPPORT_NOTE);
                return Err(Error::UnsupportedMemoryType(memory_type));
            }
        };

        let mut checksums = Vec::with_capacity(ranges.len());
        for range in ranges {
            let response = self
                .query(move || request::crc(range), move |m: &Message| response::crc(m, range))
                .await?;
            let Response::Success(crc) = response else {
                self.logger
                    .user_message(&format!("Unable to get CRC for memory range {}", range));
                return Err(Error::CrcUnavailable(range));
            };
            self.logger
                .user_message(&format!("CRC for {}: {:08X}", range, crc));
            checksums.push(RangeChecksum { range, crc });
        }

        Ok(checksums)
    }
}
