//! Write, kernel test and kernel status commands

use std::path::Path;

use pcmflash_core::{
    CancellationToken, DirectoryLoader, ImageStream, ResetPolicy, Vehicle, VehicleConfig,
    WriteType,
};

use crate::console::ConsoleLogger;
use crate::devices::{self, DeviceHandle};

type CommandResult = Result<(), Box<dyn std::error::Error>>;

fn open_vehicle(
    device: &str,
    config: VehicleConfig,
) -> Result<Vehicle<DeviceHandle, ConsoleLogger>, Box<dyn std::error::Error>> {
    let device = devices::open_device(device)?;
    Ok(Vehicle::with_config(device, ConsoleLogger::new(), config))
}

/// Run the write command
pub fn run_write(
    device: &str,
    input: &Path,
    write_type: WriteType,
    reset: ResetPolicy,
    kernel_dir: &Path,
    kernel_running: bool,
) -> CommandResult {
    let mut image = ImageStream::open(input)?;
    log::info!(
        "{} write of {} ({} bytes)",
        write_type,
        input.display(),
        image.len()
    );

    let config = VehicleConfig::default().with_reset_policy(reset);
    let mut vehicle = open_vehicle(device, config)?;
    let loader = DirectoryLoader::new(kernel_dir);
    let cancel = CancellationToken::new();

    let ok = vehicle.write(write_type, kernel_running, &mut image, &loader, &cancel);
    vehicle.logger().finish();

    if ok {
        println!("Write complete.");
        Ok(())
    } else {
        Err(format!("{} write failed", write_type).into())
    }
}

/// Run the kernel test command
pub fn run_test_kernel(device: &str, kernel_dir: &Path, kernel_running: bool) -> CommandResult {
    let mut vehicle = open_vehicle(device, VehicleConfig::default())?;
    let loader = DirectoryLoader::new(kernel_dir);

    if vehicle.test_kernel(kernel_running, &loader, &CancellationToken::new()) {
        println!("Kernel test passed.");
        Ok(())
    } else {
        Err("kernel test failed".into())
    }
}

/// Run the kernel status command
pub fn run_kernel_status(device: &str) -> CommandResult {
    let mut vehicle = open_vehicle(device, VehicleConfig::default())?;
    if vehicle.is_kernel_running()? {
        println!("Flash kernel is running.");
    } else {
        println!("No flash kernel is running.");
    }
    Ok(())
}
