//! Kernel image loading

use std::path::PathBuf;

use crate::error::{Error, Result};

/// Source of kernel binaries
///
/// Kernels are opaque blobs looked up by file name.
pub trait KernelLoader {
    /// Load the kernel called `name`
    fn load_kernel(&self, name: &str) -> Result<Vec<u8>>;
}

/// Loads kernels from files in a directory
#[derive(Debug, Clone)]
pub struct DirectoryLoader {
    dir: PathBuf,
}

impl DirectoryLoader {
    /// Create a loader reading from `dir`
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl KernelLoader for DirectoryLoader {
    fn load_kernel(&self, name: &str) -> Result<Vec<u8>> {
        let path = self.dir.join(name);
        log::debug!("Loading kernel from {}", path.display());
        let data = std::fs::read(&path).map_err(|e| Error::KernelLoad {
            name: name.to_string(),
            reason: e.to_string(),
        })?;
        if data.is_empty() {
            return Err(Error::KernelLoad {
                name: name.to_string(),
                reason: "file is empty".to_string(),
            });
        }
        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("pcmflash-loader-{}-{}", tag, std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_loads_named_file() {
        let dir = scratch_dir("ok");
        std::fs::write(dir.join("write-kernel.bin"), [0x4E, 0x71]).unwrap();
        let loader = DirectoryLoader::new(&dir);
        assert_eq!(loader.load_kernel("write-kernel.bin").unwrap(), vec![0x4E, 0x71]);
        std::fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn test_missing_and_empty_files() {
        let dir = scratch_dir("bad");
        std::fs::write(dir.join("empty.bin"), b"").unwrap();
        let loader = DirectoryLoader::new(&dir);
        assert!(matches!(
            loader.load_kernel("missing.bin"),
            Err(Error::KernelLoad { name, .. }) if name == "missing.bin"
        ));
        assert!(matches!(
            loader.load_kernel("empty.bin"),
            Err(Error::KernelLoad { .. })
        ));
        std::fs::remove_dir_all(dir).unwrap();
    }
}
