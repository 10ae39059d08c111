//! pcmflash-core - Core library for reflashing vehicle control modules
//!
//! This crate implements the write orchestration and message-exchange
//! protocol used to reprogram a PCM over a J1850 VPW bus:
//!
//! - uploading a flash kernel into the module's RAM,
//! - identifying the flash chip and querying memory range CRCs,
//! - streaming a firmware image in checksummed chunks,
//! - the retry-with-validation primitives every exchange is built on.
//!
//! The physical adapter is abstracted behind the [`device::Device`] trait.
//! Operations are written with `maybe_async`:
//! - With the `is_sync` feature (default): blocking/synchronous
//! - Without `is_sync`: async, for executor-driven front ends
//!
//! # Example
//!
//! ```ignore
//! use pcmflash_core::{CancellationToken, Device, DirectoryLoader, ImageStream, LogLogger};
//! use pcmflash_core::{Vehicle, WriteType};
//!
//! fn flash<D: Device>(device: D) -> bool {
//!     let mut vehicle = Vehicle::new(device, LogLogger);
//!     let mut image = ImageStream::open("image.bin").unwrap();
//!     let loader = DirectoryLoader::new("kernels");
//!     vehicle.write(WriteType::Full, false, &mut image, &loader, &CancellationToken::new())
//! }
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
// Allow async fn in traits - we use maybe-async for dual sync/async support
#![allow(async_fn_in_trait)]

pub mod cancel;
pub mod chip;
pub mod config;
pub mod device;
pub mod error;
pub mod image;
pub mod loader;
pub mod logger;
pub mod message;
pub mod protocol;
pub mod query;
pub mod response;
pub mod vehicle;

pub use cancel::CancellationToken;
pub use chip::{FlashMemoryType, MemoryMap, MemoryRange, RangeChecksum};
pub use config::{ResetPolicy, VehicleConfig};
pub use device::{Device, TimeoutScenario};
pub use error::{Error, Result};
pub use image::ImageStream;
pub use loader::{DirectoryLoader, KernelLoader};
pub use logger::{LogLogger, Logger};
pub use message::Message;
pub use query::{Query, RetryPolicy};
pub use response::{Failure, Response};
pub use vehicle::{Exchange, Vehicle, WriteStage, WriteType};
