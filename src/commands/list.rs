//! List commands implementation

use pcmflash_core::chip::{self, KNOWN_CHIPS};

use crate::devices;

/// List all devices enabled at compile time
pub fn list_devices() {
    let available = devices::available_devices();
    if available.is_empty() {
        println!("No devices available (recompile with device features enabled)");
        return;
    }

    println!("Supported devices:");
    println!();
    for d in &available {
        let aliases = if d.aliases.is_empty() {
            String::new()
        } else {
            format!(" (aliases: {})", d.aliases.join(", "))
        };
        println!("  {:10} - {}{}", d.name, d.description, aliases);
    }
}

/// List the flash chips the kernel can identify
pub fn list_chips() {
    println!("Supported flash chips:");
    println!();
    println!(
        "{:<12} {:<24} {:>10} {:>10}",
        "Chip ID", "Name", "Size", "Ranges"
    );
    println!("{}", "-".repeat(60));

    for known in KNOWN_CHIPS {
        let size = known
            .memory_type
            .size()
            .map(format_size)
            .unwrap_or_else(|| "?".to_string());
        let ranges = match chip::memory_ranges_for(known.memory_type) {
            Some(ranges) => ranges.len().to_string(),
            None => "-".to_string(),
        };

        println!(
            "{:<12} {:<24} {:>10} {:>10}",
            format!("0x{:08X}", known.id),
            known.name,
            size,
            ranges
        );
    }
}

fn format_size(bytes: u32) -> String {
    if bytes >= 1024 * 1024 {
        format!("{} MiB", bytes / (1024 * 1024))
    } else if bytes >= 1024 {
        format!("{} KiB", bytes / 1024)
    } else {
        format!("{} B", bytes)
    }
}
