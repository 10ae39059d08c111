//! Device registration and dispatch
//!
//! A device is selected with a string of the form `name` or
//! `name:key1=value1,key2=value2`. Only devices enabled at compile time are
//! listed and can be opened.

use pcmflash_core::Device;
use thiserror::Error;

/// Information about a device
pub struct DeviceInfo {
    /// Primary name (used for matching)
    pub name: &'static str,
    /// Alternative names
    pub aliases: &'static [&'static str],
    /// Short description
    pub description: &'static str,
}

/// Failure to open a device
#[derive(Debug, Error)]
pub enum DeviceOpenError {
    /// The name matches no enabled device
    #[error("unknown device: {0} (available: {1})")]
    Unknown(String, String),
    /// An option was not in `key=value` form
    #[error("invalid option format: '{0}' (expected key=value)")]
    OptionFormat(String),
    /// The device rejected its options
    #[error("invalid options for {device}: {reason}")]
    Options { device: &'static str, reason: String },
}

/// A device opened from a device string
pub type DeviceHandle = Box<dyn Device + Send>;

/// Parsed device string
#[derive(Debug, PartialEq, Eq)]
pub struct DeviceSpec<'a> {
    /// Device name as given
    pub name: &'a str,
    /// Options in the order given
    pub options: Vec<(&'a str, &'a str)>,
}

/// Split a device string into its name and options
pub fn parse_device_string(s: &str) -> Result<DeviceSpec<'_>, DeviceOpenError> {
    let (name, opts) = s.split_once(':').unwrap_or((s, ""));

    let mut options = Vec::new();
    for opt in opts.split(',').filter(|o| !o.is_empty()) {
        let (key, value) = opt
            .split_once('=')
            .ok_or_else(|| DeviceOpenError::OptionFormat(opt.to_string()))?;
        options.push((key.trim(), value.trim()));
    }

    Ok(DeviceSpec {
        name: name.trim(),
        options,
    })
}

/// Every device enabled at compile time
#[allow(unused_mut, clippy::vec_init_then_push)]
pub fn available_devices() -> Vec<DeviceInfo> {
    let mut devices = Vec::new();

    #[cfg(feature = "dummy")]
    devices.push(DeviceInfo {
        name: "dummy",
        aliases: &["emulator"],
        description: "Emulated PCM (chip=<id>,size=<bytes|NK>,kernel=running|stock)",
    });

    devices
}

/// Short list of device names for CLI help
pub fn device_names_short() -> String {
    let names: Vec<&str> = available_devices().iter().map(|d| d.name).collect();
    names.join(", ")
}

/// Open a device from its device string
pub fn open_device(spec: &str) -> Result<DeviceHandle, DeviceOpenError> {
    let spec = parse_device_string(spec)?;
    let info = available_devices()
        .into_iter()
        .find(|d| d.name == spec.name || d.aliases.contains(&spec.name))
        .ok_or_else(|| {
            DeviceOpenError::Unknown(spec.name.to_string(), device_names_short())
        })?;

    match info.name {
        #[cfg(feature = "dummy")]
        "dummy" => open_dummy(&spec.options),
        _ => Err(DeviceOpenError::Unknown(
            spec.name.to_string(),
            device_names_short(),
        )),
    }
}

#[cfg(feature = "dummy")]
fn open_dummy(options: &[(&str, &str)]) -> Result<DeviceHandle, DeviceOpenError> {
    let config = pcmflash_dummy::parse_options(options).map_err(|reason| {
        DeviceOpenError::Options {
            device: "dummy",
            reason,
        }
    })?;
    log::info!(
        "Opening emulated PCM (chip 0x{:08X}, {} bytes, kernel {})",
        config.chip_id,
        config.flash_size,
        if config.kernel_running { "running" } else { "not running" }
    );
    Ok(Box::new(pcmflash_dummy::DummyPcm::new(config)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_name() {
        let spec = parse_device_string("dummy").unwrap();
        assert_eq!(spec.name, "dummy");
        assert!(spec.options.is_empty());
    }

    #[test]
    fn test_parse_options_in_order() {
        let spec = parse_device_string("dummy:chip=0x00894471,kernel=running").unwrap();
        assert_eq!(spec.name, "dummy");
        assert_eq!(
            spec.options,
            vec![("chip", "0x00894471"), ("kernel", "running")]
        );
    }

    #[test]
    fn test_parse_rejects_bare_option() {
        assert!(matches!(
            parse_device_string("dummy:chip"),
            Err(DeviceOpenError::OptionFormat(opt)) if opt == "chip"
        ));
    }

    #[test]
    fn test_unknown_device() {
        assert!(matches!(
            open_device("elm327"),
            Err(DeviceOpenError::Unknown(name, _)) if name == "elm327"
        ));
    }

    #[cfg(feature = "dummy")]
    #[test]
    fn test_open_dummy_alias() {
        assert!(open_device("emulator:kernel=running").is_ok());
        assert!(matches!(
            open_device("dummy:kernel=maybe"),
            Err(DeviceOpenError::Options { device: "dummy", .. })
        ));
    }
}
