//! Chunked full-flash transfer

use maybe_async::maybe_async;

use super::{Exchange, Vehicle};
use crate::cancel::CancellationToken;
use crate::device::Device;
use crate::error::{Error, Result};
use crate::logger::Logger;
use crate::protocol::{request, response};

/// Size of the 24-bit chunk address space
const MAX_ADDRESS_SPACE: usize = 1 << 24;

impl<D: Device, L: Logger> Vehicle<D, L> {
    /// Erase the chip and stream `image` to it in checksummed chunks
    ///
    /// Each chunk is written at its offset in the image. The last chunk may
    /// be shorter than the configured size. The first chunk that cannot be
    /// confirmed aborts the write.
    #[maybe_async]
    pub async fn full_write(&mut self, image: &[u8], cancel: &CancellationToken) -> Result<()> {
        self.check_full_image(image.len())?;

        let start = Exchange::new("start full flash")
            .success("Full flash starting.")
            .failure("Kernel won't allow a full flash.");
        self.send_and_validate(
            &request::start_full_flash(),
            response::start_full_flash,
            &start,
            cancel,
        )
        .await?;

        let chunk_len = self.config.chunk_len();
        let total = image.len();
        log::debug!(
            "writing {} bytes in {} chunk(s) of {}",
            total,
            total.div_ceil(chunk_len),
            chunk_len
        );

        let mut offset = 0usize;
        for chunk in image.chunks(chunk_len) {
            let end = offset + chunk.len();
            let message = request::data_chunk(offset as u32, chunk);
            let exchange = Exchange::new(format!("data from {} to {}", offset, end))
                .success("Data chunk sent.")
                .failure("Unable to send data chunk.")
                .quiet();

            self.send_and_validate(&message, response::data_chunk, &exchange, cancel)
                .await?;

            self.logger.progress(end, total);
            offset = end;
        }

        self.logger.user_message("Full flash complete.");
        Ok(())
    }

    /// Reject images that would erase the chip without rewriting it
    pub(super) fn check_full_image(&self, len: usize) -> Result<()> {
        if len == 0 {
            self.logger.user_message("The image is empty, nothing to write.");
            return Err(Error::EmptyImage);
        }
        if len > MAX_ADDRESS_SPACE {
            self.logger.user_message("The image is too large for this PCM.");
            return Err(Error::ImageTooLarge(len));
        }
        Ok(())
    }
}
