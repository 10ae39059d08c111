//! pcmflash - reflash vehicle powertrain control modules
//!
//! Talks to the PCM over a J1850 VPW adapter. A small flash kernel is
//! uploaded into the PCM's RAM, and the kernel then identifies the flash
//! chip, verifies calibration CRCs or streams a full image to the chip.
//!
//! # Architecture
//!
//! The protocol lives in `pcmflash-core` and works with any `Device`
//! implementation. This binary selects a device from a device string,
//! wires the core to the terminal and maps failures to the exit status.

mod cli;
mod commands;
mod console;
mod devices;

use clap::Parser;
use cli::{Cli, Commands};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // RUST_LOG still wins over -v
    let default_level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    match cli.command {
        Commands::Write {
            device,
            input,
            write_type,
            reset,
            kernel,
        } => commands::run_write(
            &device,
            &input,
            write_type.into(),
            reset.into(),
            &kernel.kernel_dir,
            kernel.kernel_running,
        ),
        Commands::TestKernel { device, kernel } => {
            commands::run_test_kernel(&device, &kernel.kernel_dir, kernel.kernel_running)
        }
        Commands::KernelStatus { device } => commands::run_kernel_status(&device),
        Commands::ListDevices => {
            commands::list_devices();
            Ok(())
        }
        Commands::ListChips => {
            commands::list_chips();
            Ok(())
        }
    }
}
