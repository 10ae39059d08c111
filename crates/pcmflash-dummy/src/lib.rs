//! pcmflash-dummy - Emulated PCM for testing
//!
//! This crate provides a [`Device`] that answers like a PCM on the other
//! end of a VPW bus. Stock firmware refuses every kernel request; once a
//! kernel has been uploaded the emulator identifies its flash chip, computes
//! CRC32 over its in-memory flash, and accepts checksummed chunks after a
//! start-full-flash request.
//!
//! Faults can be scripted per request type with [`FaultRule`] to exercise
//! the retry and cleanup paths without hardware.

mod fault;

pub use fault::{FaultAction, FaultRule, FaultTarget};

use std::collections::VecDeque;

use crc::{Crc, CRC_32_ISO_HDLC};
use pcmflash_core::device::{Device, TimeoutScenario};
use pcmflash_core::error::{Error, Result};
use pcmflash_core::protocol::*;
use pcmflash_core::{MemoryRange, Message};

const CRC32: Crc<u32> = Crc::<u32>::new(&CRC_32_ISO_HDLC);

/// CRC the emulated kernel reports for a block of flash
pub fn crc32(data: &[u8]) -> u32 {
    CRC32.checksum(data)
}

/// Configuration for the emulated PCM
#[derive(Debug, Clone)]
pub struct DummyConfig {
    /// Identifier returned by the flash chip query
    pub chip_id: u32,
    /// Flash size in bytes
    pub flash_size: usize,
    /// Whether a kernel is already executing at power-up
    pub kernel_running: bool,
}

impl Default for DummyConfig {
    fn default() -> Self {
        Self {
            chip_id: 0x0089_4471, // Intel 28F400B
            flash_size: 512 * 1024,
            kernel_running: false,
        }
    }
}

/// Parse `key=value` device options into a [`DummyConfig`]
///
/// Recognised keys: `chip` (hex or decimal id), `size` (bytes, or with a
/// `K` suffix), `kernel` (`running` or `stock`).
pub fn parse_options(options: &[(&str, &str)]) -> std::result::Result<DummyConfig, String> {
    let mut config = DummyConfig::default();

    for (key, value) in options {
        match *key {
            "chip" => {
                config.chip_id =
                    parse_u32(value).ok_or_else(|| format!("Invalid chip value: {}", value))?;
            }
            "size" => {
                let size = match value.strip_suffix(&['K', 'k'][..]) {
                    Some(kib) => parse_u32(kib).map(|k| k as usize * 1024),
                    None => parse_u32(value).map(|b| b as usize),
                };
                config.flash_size = size.ok_or_else(|| format!("Invalid size value: {}", value))?;
            }
            "kernel" => {
                config.kernel_running = match *value {
                    "running" => true,
                    "stock" => false,
                    _ => return Err(format!("Invalid kernel value: {} (running or stock)", value)),
                };
            }
            _ => {
                log::warn!("dummy: Unknown option: {}={}", key, value);
            }
        }
    }

    Ok(config)
}

fn parse_u32(s: &str) -> Option<u32> {
    match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16).ok(),
        None => s.parse().ok(),
    }
}

/// A tool-to-PCM frame as understood by the emulator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Request {
    /// Kernel ping
    Ping,
    /// Flash chip id query
    FlashChipId,
    /// CRC query
    Crc(MemoryRange),
    /// Start full flash
    StartFullFlash,
    /// Data chunk (as declared in its header)
    Chunk {
        /// Destination address
        address: u32,
        /// Payload length
        len: usize,
    },
    /// Flash kernel reset
    KernelReset,
    /// Exit kernel
    ExitKernel,
    /// Anything else
    Unknown,
}

impl Request {
    /// Classify a frame sent by the tool
    pub fn parse(message: &Message) -> Self {
        let bytes = message.as_bytes();
        if bytes.len() < 4 || bytes[..3] != tool_header(0)[..3] {
            return Self::Unknown;
        }

        let be24 = |b: &[u8]| u32::from_be_bytes([0, b[0], b[1], b[2]]);
        match (bytes[3], bytes.get(4).copied()) {
            (MODE_KERNEL_QUERY, Some(SUB_PING)) => Self::Ping,
            (MODE_KERNEL_QUERY, Some(SUB_FLASH_CHIP_ID)) => Self::FlashChipId,
            (MODE_KERNEL_QUERY, Some(SUB_CRC)) if bytes.len() >= 11 => {
                Self::Crc(MemoryRange::new(be24(&bytes[8..11]), be24(&bytes[5..8])))
            }
            (MODE_FLASH, Some(SUB_CHUNK)) if bytes.len() >= 10 => Self::Chunk {
                address: be24(&bytes[7..10]),
                len: u16::from_be_bytes([bytes[5], bytes[6]]) as usize,
            },
            (MODE_FLASH, Some(SUB_START_FULL_FLASH)) => Self::StartFullFlash,
            (MODE_FLASH, Some(SUB_KERNEL_RESET)) => Self::KernelReset,
            (MODE_EXIT_KERNEL, _) => Self::ExitKernel,
            _ => Self::Unknown,
        }
    }

    fn matches(&self, target: FaultTarget) -> bool {
        match (target, self) {
            (FaultTarget::Any, _) => true,
            (FaultTarget::Ping, Self::Ping) => true,
            (FaultTarget::FlashChipId, Self::FlashChipId) => true,
            (FaultTarget::Crc, Self::Crc(_)) => true,
            (FaultTarget::CrcAt(a), Self::Crc(range)) => range.address == a,
            (FaultTarget::StartFullFlash, Self::StartFullFlash) => true,
            (FaultTarget::AnyChunk, Self::Chunk { .. }) => true,
            (FaultTarget::ChunkAt(a), Self::Chunk { address, .. }) => *address == a,
            (FaultTarget::KernelReset, Self::KernelReset) => true,
            (FaultTarget::ExitKernel, Self::ExitKernel) => true,
            _ => false,
        }
    }
}

fn reply(mode: u8, body: &[u8]) -> Message {
    let mut bytes = pcm_header(mode).to_vec();
    bytes.extend_from_slice(body);
    Message::new(bytes)
}

fn refusal(request: &Message) -> Message {
    let bytes = request.as_bytes();
    let refused = bytes.get(3..bytes.len().min(5)).unwrap_or(&[]);
    reply(MODE_REFUSED, refused)
}

fn garbled() -> Message {
    reply(0x00, &[])
}

/// Emulated PCM
///
/// Records every frame the tool sends, every timeout change and every
/// kernel upload so tests can assert on the exact bus traffic.
pub struct DummyPcm {
    config: DummyConfig,
    flash: Vec<u8>,
    kernel_running: bool,
    flash_unlocked: bool,
    inbox: VecDeque<Message>,
    faults: Vec<FaultRule>,
    requests: Vec<Request>,
    uploads: Vec<(u32, usize)>,
    timeouts: Vec<TimeoutScenario>,
    clears: usize,
    delay_ms: u64,
}

impl DummyPcm {
    /// Create an emulated PCM with erased flash
    pub fn new(config: DummyConfig) -> Self {
        let flash = vec![0xFF; config.flash_size];
        let kernel_running = config.kernel_running;
        Self {
            config,
            flash,
            kernel_running,
            flash_unlocked: false,
            inbox: VecDeque::new(),
            faults: Vec::new(),
            requests: Vec::new(),
            uploads: Vec::new(),
            timeouts: Vec::new(),
            clears: 0,
            delay_ms: 0,
        }
    }

    /// Create an emulated PCM with the default configuration (Intel 28F400B)
    pub fn new_default() -> Self {
        Self::new(DummyConfig::default())
    }

    /// Create an emulated PCM whose flash starts with `data`
    pub fn with_data(config: DummyConfig, data: &[u8]) -> Self {
        let mut pcm = Self::new(config);
        let len = data.len().min(pcm.flash.len());
        pcm.flash[..len].copy_from_slice(&data[..len]);
        pcm
    }

    /// Add a scripted fault; earlier rules take precedence
    pub fn add_fault(&mut self, rule: FaultRule) {
        self.faults.push(rule);
    }

    /// Builder form of [`DummyPcm::add_fault`]
    pub fn with_fault(mut self, rule: FaultRule) -> Self {
        self.add_fault(rule);
        self
    }

    /// Configuration
    pub fn config(&self) -> &DummyConfig {
        &self.config
    }

    /// Flash contents
    pub fn flash(&self) -> &[u8] {
        &self.flash
    }

    /// Whether a kernel is executing
    pub fn is_kernel_running(&self) -> bool {
        self.kernel_running
    }

    /// Every frame the tool attempted to send, in order
    pub fn requests(&self) -> &[Request] {
        &self.requests
    }

    /// Number of send attempts matching `target`
    pub fn count(&self, target: FaultTarget) -> usize {
        self.requests.iter().filter(|r| r.matches(target)).count()
    }

    /// CRC queries in the order they were sent
    pub fn crc_queries(&self) -> Vec<MemoryRange> {
        self.requests
            .iter()
            .filter_map(|r| match r {
                Request::Crc(range) => Some(*range),
                _ => None,
            })
            .collect()
    }

    /// `(address, len)` of every chunk send attempt
    pub fn chunks(&self) -> Vec<(u32, usize)> {
        self.requests
            .iter()
            .filter_map(|r| match r {
                Request::Chunk { address, len } => Some((*address, *len)),
                _ => None,
            })
            .collect()
    }

    /// `(address, len)` of every kernel upload
    pub fn uploads(&self) -> &[(u32, usize)] {
        &self.uploads
    }

    /// Timeout profiles in the order they were set
    pub fn timeouts(&self) -> &[TimeoutScenario] {
        &self.timeouts
    }

    /// Number of times the receive queue was cleared
    pub fn clears(&self) -> usize {
        self.clears
    }

    /// Total time spent in delays
    pub fn total_delay_ms(&self) -> u64 {
        self.delay_ms
    }

    fn take_fault(&mut self, matches: impl Fn(FaultTarget) -> bool) -> Option<FaultAction> {
        let rule = self
            .faults
            .iter_mut()
            .find(|rule| rule.is_active() && matches(rule.target))?;
        rule.consume();
        Some(rule.action)
    }

    /// Handle a request as the PCM would, returning its reply
    fn respond(&mut self, request: Request, message: &Message) -> Option<Message> {
        if !self.kernel_running {
            return match request {
                Request::ExitKernel => Some(reply(reply_mode(MODE_EXIT_KERNEL), &[])),
                Request::Unknown => None,
                _ => Some(refusal(message)),
            };
        }

        match request {
            Request::Ping => Some(reply(reply_mode(MODE_KERNEL_QUERY), &[SUB_PING])),
            Request::FlashChipId => {
                let id = self.config.chip_id.to_be_bytes();
                Some(reply(
                    reply_mode(MODE_KERNEL_QUERY),
                    &[SUB_FLASH_CHIP_ID, id[0], id[1], id[2], id[3]],
                ))
            }
            Request::Crc(range) => {
                let start = (range.address as usize).min(self.flash.len());
                let end = start.saturating_add(range.size as usize).min(self.flash.len());
                let crc = crc32(&self.flash[start..end]).to_be_bytes();
                let mut body = message.as_bytes()[4..11].to_vec();
                body.extend_from_slice(&crc);
                Some(reply(reply_mode(MODE_KERNEL_QUERY), &body))
            }
            Request::StartFullFlash => {
                log::debug!("dummy: erasing {} bytes", self.flash.len());
                self.flash.fill(0xFF);
                self.flash_unlocked = true;
                Some(reply(reply_mode(MODE_FLASH), &[SUB_START_FULL_FLASH]))
            }
            Request::Chunk { .. } => {
                // A frame with a bad checksum never reaches the kernel
                let parts = message.block_parts()?;
                let start = parts.address as usize;
                let end = start + parts.payload.len();
                if !self.flash_unlocked || end > self.flash.len() {
                    return Some(refusal(message));
                }
                self.flash[start..end].copy_from_slice(parts.payload);
                Some(reply(reply_mode(MODE_FLASH), &[SUB_CHUNK]))
            }
            Request::KernelReset => {
                self.kernel_running = false;
                self.flash_unlocked = false;
                Some(reply(reply_mode(MODE_FLASH), &[SUB_KERNEL_RESET]))
            }
            Request::ExitKernel => {
                self.kernel_running = false;
                self.flash_unlocked = false;
                Some(reply(reply_mode(MODE_EXIT_KERNEL), &[]))
            }
            Request::Unknown => None,
        }
    }
}

impl Device for DummyPcm {
    fn clear_message_queue(&mut self) {
        self.clears += 1;
        self.inbox.clear();
    }

    fn send_message(&mut self, message: &Message) -> Result<bool> {
        let request = Request::parse(message);
        self.requests.push(request);
        log::trace!("dummy: <- {} ({:?})", message, request);

        let reply = match self.take_fault(|target| request.matches(target)) {
            None => self.respond(request, message),
            Some(FaultAction::DropSend) => return Ok(false),
            Some(FaultAction::Fault) => {
                return Err(Error::Device(format!("injected fault on {:?}", request)))
            }
            Some(FaultAction::Refuse) => Some(refusal(message)),
            Some(FaultAction::DropReply) => {
                let _ = self.respond(request, message);
                None
            }
            Some(FaultAction::Garble) => {
                let _ = self.respond(request, message);
                Some(garbled())
            }
        };

        if let Some(reply) = reply {
            log::trace!("dummy: -> {}", reply);
            self.inbox.push_back(reply);
        }
        Ok(true)
    }

    fn receive_message(&mut self) -> Result<Option<Message>> {
        Ok(self.inbox.pop_front())
    }

    fn set_timeout(&mut self, scenario: TimeoutScenario) -> Result<()> {
        self.timeouts.push(scenario);
        Ok(())
    }

    fn execute_block(&mut self, payload: &[u8], address: u32) -> Result<bool> {
        match self.take_fault(|target| matches!(target, FaultTarget::Upload | FaultTarget::Any)) {
            None => {}
            Some(FaultAction::Fault) => {
                return Err(Error::Device("injected fault on kernel upload".into()))
            }
            Some(_) => return Ok(false),
        }

        if payload.is_empty() {
            return Ok(false);
        }

        log::debug!("dummy: kernel of {} bytes at 0x{:06X}", payload.len(), address);
        self.uploads.push((address, payload.len()));
        self.kernel_running = true;
        self.flash_unlocked = false;
        Ok(true)
    }

    fn delay_ms(&mut self, ms: u32) {
        self.delay_ms += u64::from(ms);
    }
}

#[cfg(test)]
mod scenarios;
