//! Kernel detection, upload and teardown

use maybe_async::maybe_async;

use super::{Exchange, Vehicle};
use crate::cancel::CancellationToken;
use crate::device::{Device, TimeoutScenario};
use crate::error::{Error, Result};
use crate::loader::KernelLoader;
use crate::logger::Logger;
use crate::protocol::{request, response};
use crate::response::Response;

impl<D: Device, L: Logger> Vehicle<D, L> {
    /// Check whether a flash kernel is already executing
    ///
    /// Stock firmware refuses the chip id query, so a refusal is a definite
    /// "no". A query that never gets a valid reply is also treated as "no".
    #[maybe_async]
    pub async fn is_kernel_running(&mut self) -> Result<bool> {
        let response = self
            .query(request::flash_chip_id, response::flash_chip_id)
            .await?;
        let running = match response {
            Response::Success(chip_id) => {
                log::debug!("kernel answered chip query with 0x{:08X}", chip_id);
                true
            }
            Response::Refused => false,
            Response::Failure(failure) => {
                log::debug!("kernel check gave up: {:?}", failure);
                false
            }
        };
        Ok(running)
    }

    /// Upload a kernel image to `address` and start it
    ///
    /// Nothing is sent if `cancel` is already set.
    #[maybe_async]
    pub async fn upload_kernel(
        &mut self,
        image: &[u8],
        address: u32,
        cancel: &CancellationToken,
    ) -> Result<()> {
        self.device.clear_message_queue();

        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        log::debug!("uploading {} byte kernel to 0x{:06X}", image.len(), address);
        self.device.set_timeout(TimeoutScenario::SendKernel).await?;

        if !self.device.execute_block(image, address).await? {
            self.logger.user_message("Failed to upload kernel to PCM");
            return Err(Error::KernelUpload(address));
        }

        self.logger.user_message("Kernel uploaded to PCM successfully.");
        Ok(())
    }

    /// Load a kernel by name and upload it to the configured address
    #[maybe_async]
    pub async fn load_and_upload_kernel(
        &mut self,
        name: &str,
        loader: &dyn KernelLoader,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let image = match loader.load_kernel(name) {
            Ok(image) => image,
            Err(e) => {
                self.logger.user_message("Failed to load kernel from file.");
                self.logger.debug_message(&e.to_string());
                return Err(e);
            }
        };

        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let address = self.config.kernel_load_address;
        self.upload_kernel(&image, address, cancel).await
    }

    /// Ping the kernel until it answers
    #[maybe_async]
    pub async fn try_wait_for_kernel(
        &mut self,
        cancel: &CancellationToken,
        attempts: u32,
    ) -> Result<()> {
        self.logger.user_message("Waiting for kernel to respond.");
        let exchange = Exchange::new("kernel ping")
            .success("Kernel is responding.")
            .failure("No response received from the flash kernel.")
            .max_attempts(attempts);
        self.send_and_validate(&request::kernel_ping(), response::kernel_ping, &exchange, cancel)
            .await
    }

    /// Ask the flash kernel to reset the PCM
    #[maybe_async]
    pub async fn try_write_kernel_reset(&mut self, cancel: &CancellationToken) -> Result<()> {
        let exchange = Exchange::new("flash-kernel PCM reset request")
            .success("PCM reset.")
            .failure("Unable to reset the PCM.");
        self.send_and_validate(
            &request::kernel_reset(),
            response::kernel_reset,
            &exchange,
            cancel,
        )
        .await
    }

    /// Leave the kernel and put the bus back to normal
    ///
    /// Best effort: failures are logged and otherwise ignored.
    #[maybe_async]
    pub async fn cleanup(&mut self) {
        self.logger.debug_message("Cleaning up flash kernel.");
        self.device.clear_message_queue();

        match self.device.send_message(&request::exit_kernel()).await {
            Ok(true) => {}
            Ok(false) => log::debug!("exit kernel request could not be sent"),
            Err(e) => log::warn!("exit kernel request failed: {}", e),
        }

        if let Err(e) = self.device.set_timeout(TimeoutScenario::ReadProperty).await {
            log::warn!("unable to restore timeout: {}", e);
        }

        self.device.clear_message_queue();
    }
}
