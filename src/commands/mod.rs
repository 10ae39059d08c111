//! CLI command implementations
//!
//! Each command opens its device, builds a `Vehicle` around it and reports
//! through the console logger. A command that the vehicle reports as failed
//! returns an error so the process exits non-zero.

mod list;
mod write;

pub use list::{list_chips, list_devices};
pub use write::{run_kernel_status, run_test_kernel, run_write};
