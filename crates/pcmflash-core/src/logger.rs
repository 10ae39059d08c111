//! User-facing message stream
//!
//! Operations report to a [`Logger`] rather than printing. User messages are
//! what a person watching the flash needs to see; debug messages carry the
//! detail needed to diagnose a failed run.

/// Sink for operation messages
pub trait Logger {
    /// A message for the person running the tool
    fn user_message(&self, message: &str);

    /// A diagnostic message
    fn debug_message(&self, message: &str);

    /// Transfer progress in bytes
    fn progress(&self, _done: usize, _total: usize) {}
}

impl<L: Logger + ?Sized> Logger for &L {
    fn user_message(&self, message: &str) {
        (**self).user_message(message)
    }

    fn debug_message(&self, message: &str) {
        (**self).debug_message(message)
    }

    fn progress(&self, done: usize, total: usize) {
        (**self).progress(done, total)
    }
}

/// Logger that forwards to the `log` facade
#[derive(Debug, Clone, Copy, Default)]
pub struct LogLogger;

impl Logger for LogLogger {
    fn user_message(&self, message: &str) {
        log::info!("{}", message);
    }

    fn debug_message(&self, message: &str) {
        log::debug!("{}", message);
    }

    fn progress(&self, done: usize, total: usize) {
        log::trace!("progress {}/{}", done, total);
    }
}
