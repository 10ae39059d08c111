//! Firmware image input

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use crate::error::{Error, Result};

/// Largest buffer reserved up front from the declared length
const MAX_PREALLOC: usize = 1 << 24;

/// A reader paired with its declared length
///
/// The whole image is read before any bus traffic, so a truncated file is
/// caught while the module is still untouched.
#[derive(Debug)]
pub struct ImageStream<R> {
    reader: R,
    len: u64,
}

impl ImageStream<BufReader<File>> {
    /// Open a file, taking the declared length from its metadata
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let len = file.metadata()?.len();
        Ok(Self::new(BufReader::new(file), len))
    }
}

impl<R: Read> ImageStream<R> {
    /// Wrap a reader that should yield exactly `len` bytes
    pub fn new(reader: R, len: u64) -> Self {
        Self { reader, len }
    }

    /// Declared length in bytes
    pub fn len(&self) -> u64 {
        self.len
    }

    /// Whether the declared length is zero
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Read the declared number of bytes
    ///
    /// Fails with [`Error::ShortRead`] if the reader ends early. Bytes past
    /// the declared length are ignored.
    pub fn read_all(&mut self) -> Result<Vec<u8>> {
        let hint = usize::try_from(self.len).map_or(MAX_PREALLOC, |len| len.min(MAX_PREALLOC));
        let mut data = Vec::with_capacity(hint);
        (&mut self.reader).take(self.len).read_to_end(&mut data)?;
        if (data.len() as u64) < self.len {
            return Err(Error::ShortRead {
                expected: self.len,
                actual: data.len() as u64,
            });
        }
        Ok(data)
    }
}
