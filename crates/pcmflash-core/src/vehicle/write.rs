//! Write and kernel-test entry points

use std::io::Read;

use maybe_async::maybe_async;

use super::{Vehicle, WriteStage, WriteType};
use crate::cancel::CancellationToken;
use crate::config::ResetPolicy;
use crate::device::{Device, TimeoutScenario};
use crate::error::{Error, Result};
use crate::image::ImageStream;
use crate::loader::KernelLoader;
use crate::logger::Logger;

impl<D: Device, L: Logger> Vehicle<D, L> {
    /// Write an image to the PCM
    ///
    /// `kernel_running` skips the kernel upload. Returns `true` on success;
    /// every failure has already been explained through the logger.
    #[maybe_async]
    pub async fn write<R: Read>(
        &mut self,
        write_type: WriteType,
        kernel_running: bool,
        image: &mut ImageStream<R>,
        loader: &dyn KernelLoader,
        cancel: &CancellationToken,
    ) -> bool {
        let mut stage = WriteStage::Idle;
        match self
            .try_write(write_type, kernel_running, image, loader, cancel, &mut stage)
            .await
        {
            Ok(()) => true,
            Err(e) => {
                self.report_error(&e, stage);
                false
            }
        }
    }

    /// Upload the read kernel to check that kernel bootstrap works
    #[maybe_async]
    pub async fn test_kernel(
        &mut self,
        kernel_running: bool,
        loader: &dyn KernelLoader,
        cancel: &CancellationToken,
    ) -> bool {
        self.device.clear_message_queue();

        let result = if kernel_running {
            Ok(())
        } else {
            let name = self.config.read_kernel.clone();
            self.load_and_upload_kernel(&name, loader, cancel).await
        };

        self.cleanup().await;

        match result {
            Ok(()) => true,
            Err(e) => {
                self.report_error(&e, WriteStage::KernelUpload);
                false
            }
        }
    }

    #[maybe_async]
    async fn try_write<R: Read>(
        &mut self,
        write_type: WriteType,
        kernel_running: bool,
        image: &mut ImageStream<R>,
        loader: &dyn KernelLoader,
        cancel: &CancellationToken,
        stage: &mut WriteStage,
    ) -> Result<()> {
        if write_type == WriteType::Invalid {
            return Err(Error::InvalidWriteType);
        }

        let data = image.read_all()?;
        log::debug!("read {} byte image for {} write", data.len(), write_type);
        if write_type == WriteType::Full {
            self.check_full_image(data.len())?;
        }

        let result = self
            .write_image(write_type, kernel_running, &data, loader, cancel, stage)
            .await;

        let failed_at = *stage;
        self.enter(stage, WriteStage::PostWriteCleanup);
        self.cleanup().await;

        if result.is_ok() {
            self.enter(stage, WriteStage::Done);
        } else {
            *stage = failed_at;
        }
        result
    }

    #[maybe_async]
    async fn write_image(
        &mut self,
        write_type: WriteType,
        kernel_running: bool,
        data: &[u8],
        loader: &dyn KernelLoader,
        cancel: &CancellationToken,
        stage: &mut WriteStage,
    ) -> Result<()> {
        self.enter(stage, WriteStage::KernelCheck);
        self.device.clear_message_queue();

        if !kernel_running {
            self.enter(stage, WriteStage::KernelUpload);
            let name = self.config.write_kernel.clone();
            self.load_and_upload_kernel(&name, loader, cancel).await?;
        }

        self.device.set_timeout(TimeoutScenario::Maximum).await?;

        self.enter(stage, WriteStage::Dispatch);
        match write_type {
            WriteType::Calibration => self.verify_calibration().await.map(|_| ()),
            WriteType::OsAndCalibration => Err(Error::NotImplemented("OS and calibration write")),
            WriteType::Full => {
                let result = self.full_write(data, cancel).await;
                let reset = match self.config.reset_policy {
                    ResetPolicy::AfterSuccess => result.is_ok(),
                    ResetPolicy::Always => true,
                };
                if reset {
                    if let Err(e) = self.try_write_kernel_reset(cancel).await {
                        log::warn!("post-write reset failed: {}", e);
                    }
                }
                result
            }
            WriteType::Invalid => Err(Error::InvalidWriteType),
        }
    }

    fn enter(&self, stage: &mut WriteStage, next: WriteStage) {
        log::debug!("write stage {} -> {}", stage, next);
        *stage = next;
    }

    /// Turn a failure into user messages
    ///
    /// Errors raised by the protocol steps were already explained where they
    /// happened, so only the remaining kinds get a user message here.
    fn report_error(&self, error: &Error, stage: WriteStage) {
        match error {
            Error::ShortRead { .. } | Error::Io(_) => {
                self.logger.user_message("Unable to read input file.");
            }
            Error::Cancelled => self.logger.user_message("Operation cancelled."),
            Error::InvalidWriteType => self.logger.user_message("Invalid write type."),
            Error::NotImplemented(what) => {
                self.logger
                    .user_message(&format!("{} is not supported yet.", what));
            }
            e if e.is_fault() => {
                self.logger
                    .user_message(&format!("Something went wrong. {}", e));
                self.logger
                    .user_message("Do not power off the PCM! Do not exit this program!");
                self.logger
                    .user_message("Try flashing again. If errors continue, seek help online.");
            }
            _ => {}
        }
        self.logger
            .debug_message(&format!("Failed during {}: {:?}", stage, error));
    }
}
