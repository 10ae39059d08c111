//! PCM operations over a bus device
//!
//! A [`Vehicle`] owns the [`Device`] for the length of an operation and
//! reports through a [`Logger`]. The public entry points ([`Vehicle::write`]
//! and [`Vehicle::test_kernel`]) never fail: every error is turned into user
//! messages and a `false` result, and cleanup always runs once the bus has
//! been touched.
//!
//! The steps are split by concern:
//! - `kernel`: kernel detection, upload and cleanup
//! - `exchange`: the validated-send loop
//! - `calibration`: chip identification and CRC queries
//! - `full_write`: chunked flash transfer
//! - `write`: the write state machine

mod calibration;
mod exchange;
mod full_write;
mod kernel;
mod write;

use core::fmt;

use maybe_async::maybe_async;

use crate::config::VehicleConfig;
use crate::device::Device;
use crate::error::Result;
use crate::logger::Logger;
use crate::message::Message;
use crate::query::Query;
use crate::response::Response;

pub use exchange::Exchange;

/// Which write strategy to run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteType {
    /// Never dispatched; rejected before any bus traffic
    Invalid,
    /// Identify the chip and check every calibration range
    Calibration,
    /// Operating system and calibration (not implemented)
    OsAndCalibration,
    /// Erase and rewrite the whole chip
    Full,
}

impl fmt::Display for WriteType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Invalid => "invalid",
            Self::Calibration => "calibration",
            Self::OsAndCalibration => "OS and calibration",
            Self::Full => "full",
        };
        f.write_str(name)
    }
}

/// States of the write state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteStage {
    /// Reading the image
    Idle,
    /// Deciding whether a kernel upload is needed
    KernelCheck,
    /// Loading and uploading the write kernel
    KernelUpload,
    /// Running the selected write strategy
    Dispatch,
    /// Leaving the kernel and restoring the bus
    PostWriteCleanup,
    /// Finished
    Done,
}

impl fmt::Display for WriteStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// A PCM reached through a bus device
pub struct Vehicle<D, L> {
    device: D,
    logger: L,
    config: VehicleConfig,
}

impl<D: Device, L: Logger> Vehicle<D, L> {
    /// Create a vehicle with the default configuration
    pub fn new(device: D, logger: L) -> Self {
        Self::with_config(device, logger, VehicleConfig::default())
    }

    /// Create a vehicle with an explicit configuration
    pub fn with_config(device: D, logger: L, config: VehicleConfig) -> Self {
        Self {
            device,
            logger,
            config,
        }
    }

    /// Configuration in use
    pub fn config(&self) -> &VehicleConfig {
        &self.config
    }

    /// The underlying device
    pub fn device(&self) -> &D {
        &self.device
    }

    /// The underlying device, mutably
    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    /// The logger
    pub fn logger(&self) -> &L {
        &self.logger
    }

    /// Give back the device and logger
    pub fn into_inner(self) -> (D, L) {
        (self.device, self.logger)
    }

    /// Run a single query with the configured retry policy
    #[maybe_async]
    async fn query<T, B, P>(&mut self, build: B, parse: P) -> Result<Response<T>>
    where
        B: Fn() -> Message,
        P: Fn(&Message) -> Response<T>,
    {
        Query::with_policy(build, parse, self.config.query_policy)
            .execute(&mut self.device)
            .await
    }
}
