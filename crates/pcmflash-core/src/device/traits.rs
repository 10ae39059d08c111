//! Device trait definitions
//!
//! These traits use `maybe_async` to support both sync and async modes.
//! - With the `is_sync` feature, traits are synchronous
//! - Without it, the bus operations are `async fn`s

use crate::error::Result;
use crate::message::Message;
use maybe_async::maybe_async;

/// Timeout profile applied to the receive side of the adapter
///
/// Drivers map each scenario to concrete timings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeoutScenario {
    /// Shortest wait, used while draining the bus
    Minimum,
    /// Normal request/reply traffic
    ReadProperty,
    /// CRC queries, which make the kernel walk flash
    ReadCrc,
    /// Kernel upload
    SendKernel,
    /// Chunk writes
    WriteMemoryBlock,
    /// Longest wait, used for erase and flashing traffic
    Maximum,
}

/// Bus adapter (sync or async depending on `is_sync` feature)
///
/// A device moves whole frames on and off the bus. It knows nothing about
/// what the frames mean.
///
/// Return values separate bus noise from faults: `Ok(false)` from a send and
/// `Ok(None)` from a receive are normal on a noisy bus and are retried by the
/// caller. `Err` means the adapter itself is broken (unplugged, I/O error)
/// and aborts the current operation.
///
/// ## Example
///
/// ```ignore
/// #[maybe_async]
/// impl Device for MyAdapter {
///     fn clear_message_queue(&mut self) {
///         self.rx.clear();
///     }
///
///     async fn send_message(&mut self, message: &Message) -> Result<bool> {
///         self.port.write_frame(message.as_bytes()).await
///     }
///     // ...
/// }
/// ```
#[maybe_async(AFIT)]
pub trait Device {
    /// Discard any frames received but not yet read
    fn clear_message_queue(&mut self);

    /// Put one frame on the bus
    ///
    /// Returns `Ok(false)` if the adapter could not transmit it.
    async fn send_message(&mut self, message: &Message) -> Result<bool>;

    /// Wait for the next frame, up to the current timeout
    ///
    /// Returns `Ok(None)` when nothing arrived in time.
    async fn receive_message(&mut self) -> Result<Option<Message>>;

    /// Change the receive timeout profile
    async fn set_timeout(&mut self, scenario: TimeoutScenario) -> Result<()>;

    /// Upload `payload` to `address` in module RAM and start executing it
    ///
    /// Returns `Ok(false)` if the module did not accept the upload.
    async fn execute_block(&mut self, payload: &[u8], address: u32) -> Result<bool>;

    /// Delay for the specified number of milliseconds
    async fn delay_ms(&mut self, ms: u32);
}

// Blanket impl for boxed devices to allow trait objects (sync mode only)
// In async mode, traits with async fn are not object-safe
#[cfg(feature = "is_sync")]
impl Device for Box<dyn Device + Send> {
    fn clear_message_queue(&mut self) {
        (**self).clear_message_queue()
    }

    fn send_message(&mut self, message: &Message) -> Result<bool> {
        (**self).send_message(message)
    }

    fn receive_message(&mut self) -> Result<Option<Message>> {
        (**self).receive_message()
    }

    fn set_timeout(&mut self, scenario: TimeoutScenario) -> Result<()> {
        (**self).set_timeout(scenario)
    }

    fn execute_block(&mut self, payload: &[u8], address: u32) -> Result<bool> {
        (**self).execute_block(payload, address)
    }

    fn delay_ms(&mut self, ms: u32) {
        (**self).delay_ms(ms)
    }
}
