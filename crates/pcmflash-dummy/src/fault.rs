//! Scripted bus faults

/// Which traffic a fault applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultTarget {
    /// Kernel ping
    Ping,
    /// Flash chip id query
    FlashChipId,
    /// Any CRC query
    Crc,
    /// CRC query for one range start address
    CrcAt(u32),
    /// Start full flash
    StartFullFlash,
    /// Any data chunk
    AnyChunk,
    /// Data chunk for one destination address
    ChunkAt(u32),
    /// Flash kernel reset
    KernelReset,
    /// Exit kernel
    ExitKernel,
    /// Kernel upload via block execute
    Upload,
    /// Every frame
    Any,
}

/// What happens to matching traffic
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultAction {
    /// The send reports failure and the frame is lost
    DropSend,
    /// The frame is handled but the reply is lost
    DropReply,
    /// The frame is handled and the reply is corrupted
    Garble,
    /// The PCM refuses the request
    Refuse,
    /// The adapter returns an error
    Fault,
}

/// A fault applied to matching traffic, optionally a limited number of times
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FaultRule {
    /// Traffic this applies to
    pub target: FaultTarget,
    /// What happens
    pub action: FaultAction,
    /// Remaining applications, `None` for unlimited
    pub remaining: Option<u32>,
}

impl FaultRule {
    /// Apply on every matching frame
    pub fn always(target: FaultTarget, action: FaultAction) -> Self {
        Self {
            target,
            action,
            remaining: None,
        }
    }

    /// Apply to the next `count` matching frames only
    pub fn times(target: FaultTarget, action: FaultAction, count: u32) -> Self {
        Self {
            target,
            action,
            remaining: Some(count),
        }
    }

    pub(crate) fn is_active(&self) -> bool {
        self.remaining != Some(0)
    }

    pub(crate) fn consume(&mut self) {
        if let Some(n) = self.remaining.as_mut() {
            *n = n.saturating_sub(1);
        }
    }
}
