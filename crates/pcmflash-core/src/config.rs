//! Vehicle tunables

use crate::chip::MemoryMap;
use crate::query::RetryPolicy;

/// RAM address the kernels are linked to run from
pub const KERNEL_LOAD_ADDRESS: u32 = 0x00FF_8000;

/// File name of the flash write kernel
pub const WRITE_KERNEL: &str = "write-kernel.bin";

/// File name of the read kernel, used to test kernel bootstrap
pub const READ_KERNEL: &str = "read-kernel.bin";

/// Data bytes carried by each flash chunk
pub const DEFAULT_CHUNK_SIZE: u16 = 192;

/// When the post-write kernel reset is sent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResetPolicy {
    /// Only after every chunk was acknowledged
    #[default]
    AfterSuccess,
    /// After every full write, even a failed one
    Always,
}

/// Settings for one [`Vehicle`](crate::Vehicle)
#[derive(Debug, Clone)]
pub struct VehicleConfig {
    /// Where kernels are uploaded
    pub kernel_load_address: u32,
    /// Kernel used for writes
    pub write_kernel: String,
    /// Kernel used by the bootstrap test
    pub read_kernel: String,
    /// Retry policy for single queries
    pub query_policy: RetryPolicy,
    /// Outer attempts of the validated-send loop
    pub exchange_attempts: u32,
    /// Replies examined per validated-send attempt
    pub response_polls: u32,
    /// Bytes per flash chunk
    pub chunk_size: u16,
    /// Post-write reset gating
    pub reset_policy: ResetPolicy,
    /// CRC verification ranges per flash type
    pub memory_map: MemoryMap,
}

impl Default for VehicleConfig {
    fn default() -> Self {
        Self {
            kernel_load_address: KERNEL_LOAD_ADDRESS,
            write_kernel: WRITE_KERNEL.to_string(),
            read_kernel: READ_KERNEL.to_string(),
            query_policy: RetryPolicy::default(),
            exchange_attempts: 5,
            response_polls: 10,
            chunk_size: DEFAULT_CHUNK_SIZE,
            reset_policy: ResetPolicy::default(),
            memory_map: MemoryMap::builtin(),
        }
    }
}

impl VehicleConfig {
    /// Use a different post-write reset policy
    pub fn with_reset_policy(mut self, policy: ResetPolicy) -> Self {
        self.reset_policy = policy;
        self
    }

    /// Use a different memory map
    pub fn with_memory_map(mut self, map: MemoryMap) -> Self {
        self.memory_map = map;
        self
    }

    /// Use a different retry policy for single queries
    pub fn with_query_policy(mut self, policy: RetryPolicy) -> Self {
        self.query_policy = policy;
        self
    }

    /// Effective chunk size, never zero
    pub fn chunk_len(&self) -> usize {
        self.chunk_size.max(1) as usize
    }
}
