//! CLI argument parsing

use crate::devices;
use clap::{Parser, Subcommand, ValueEnum};
use pcmflash_core::{ResetPolicy, WriteType};
use std::path::PathBuf;

/// Generate dynamic help text for the device argument
fn device_help() -> String {
    format!(
        "Device to use, name[:key=value,...] [available: {}]",
        devices::device_names_short()
    )
}

#[derive(Parser)]
#[command(name = "pcmflash")]
#[command(author, version, about = "PCM reflashing over J1850 VPW", long_about = None)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

/// Kernel options shared across commands
#[derive(clap::Args, Debug, Clone)]
pub struct KernelArgs {
    /// Directory containing the kernel images
    #[arg(long, default_value = ".")]
    pub kernel_dir: PathBuf,

    /// Skip the upload because a kernel is already running
    #[arg(long)]
    pub kernel_running: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write an image to the PCM
    Write {
        /// Device to use
        #[arg(short, long, help = device_help())]
        device: String,

        /// Input file path
        #[arg(short, long)]
        input: PathBuf,

        /// What to write
        #[arg(short = 't', long = "type", value_enum, default_value_t = WriteKind::Calibration)]
        write_type: WriteKind,

        /// When to reset the PCM after a full flash
        #[arg(long, value_enum, default_value_t = ResetKind::AfterSuccess)]
        reset: ResetKind,

        #[command(flatten)]
        kernel: KernelArgs,
    },

    /// Upload the read kernel and exit it again
    TestKernel {
        /// Device to use
        #[arg(short, long, help = device_help())]
        device: String,

        #[command(flatten)]
        kernel: KernelArgs,
    },

    /// Check whether a flash kernel is running
    KernelStatus {
        /// Device to use
        #[arg(short, long, help = device_help())]
        device: String,
    },

    /// List supported devices
    ListDevices,

    /// List supported flash chips
    ListChips,
}

/// Write type as selected on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum WriteKind {
    /// Verify the calibration ranges
    Calibration,
    /// Operating system and calibration
    OsAndCalibration,
    /// Erase and rewrite the whole chip
    Full,
}

impl From<WriteKind> for WriteType {
    fn from(kind: WriteKind) -> Self {
        match kind {
            WriteKind::Calibration => WriteType::Calibration,
            WriteKind::OsAndCalibration => WriteType::OsAndCalibration,
            WriteKind::Full => WriteType::Full,
        }
    }
}

/// Reset policy as selected on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ResetKind {
    /// Reset only after a complete write
    AfterSuccess,
    /// Reset even when the write failed
    Always,
}

impl From<ResetKind> for ResetPolicy {
    fn from(kind: ResetKind) -> Self {
        match kind {
            ResetKind::AfterSuccess => ResetPolicy::AfterSuccess,
            ResetKind::Always => ResetPolicy::Always,
        }
    }
}
