//! End-to-end write scenarios against the emulated PCM

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::io::Cursor;

use pcmflash_core::error::{Error, Result};
use pcmflash_core::{
    CancellationToken, FlashMemoryType, ImageStream, KernelLoader, Logger, MemoryMap, MemoryRange,
    ResetPolicy, TimeoutScenario, Vehicle, VehicleConfig, WriteType,
};

use crate::{DummyConfig, DummyPcm, FaultAction, FaultRule, FaultTarget};

const UNKNOWN_CHIP: u32 = 0xDEAD_BEEF;
const KERNEL_INTEL_512: u32 = 0x1234_1234;
const AMD_1024: u32 = 0x0001_2258;

#[derive(Default)]
struct RecordingLogger {
    user: RefCell<Vec<String>>,
    debug: RefCell<Vec<String>>,
    progress: Cell<(usize, usize)>,
    cancel_after: Option<(usize, CancellationToken)>,
}

impl RecordingLogger {
    fn has_user(&self, text: &str) -> bool {
        self.user.borrow().iter().any(|m| m.contains(text))
    }
}

impl Logger for RecordingLogger {
    fn user_message(&self, message: &str) {
        self.user.borrow_mut().push(message.to_string());
    }

    fn debug_message(&self, message: &str) {
        self.debug.borrow_mut().push(message.to_string());
    }

    fn progress(&self, done: usize, total: usize) {
        self.progress.set((done, total));
        if let Some((limit, token)) = &self.cancel_after {
            if done >= *limit {
                token.cancel();
            }
        }
    }
}

#[derive(Default)]
struct MemoryLoader {
    kernels: HashMap<String, Vec<u8>>,
}

impl MemoryLoader {
    fn with_kernels() -> Self {
        let mut kernels = HashMap::new();
        kernels.insert("write-kernel.bin".to_string(), vec![0x4E, 0x71, 0x4E, 0x75]);
        kernels.insert("read-kernel.bin".to_string(), vec![0x4E, 0x75]);
        Self { kernels }
    }
}

impl KernelLoader for MemoryLoader {
    fn load_kernel(&self, name: &str) -> Result<Vec<u8>> {
        self.kernels.get(name).cloned().ok_or_else(|| Error::KernelLoad {
            name: name.to_string(),
            reason: "not found".to_string(),
        })
    }
}

fn pcm(chip_id: u32, kernel_running: bool) -> DummyPcm {
    DummyPcm::new(DummyConfig {
        chip_id,
        kernel_running,
        ..Default::default()
    })
}

fn vehicle(pcm: DummyPcm) -> Vehicle<DummyPcm, RecordingLogger> {
    Vehicle::new(pcm, RecordingLogger::default())
}

fn image(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 7 + 3) as u8).collect()
}

fn write(
    vehicle: &mut Vehicle<DummyPcm, RecordingLogger>,
    write_type: WriteType,
    kernel_running: bool,
    data: &[u8],
) -> bool {
    let mut stream = ImageStream::new(Cursor::new(data.to_vec()), data.len() as u64);
    vehicle.write(
        write_type,
        kernel_running,
        &mut stream,
        &MemoryLoader::with_kernels(),
        &CancellationToken::new(),
    )
}

#[test]
fn test_unknown_chip_aborts_before_crc_queries() {
    let mut v = vehicle(pcm(UNKNOWN_CHIP, true));
    assert!(!write(&mut v, WriteType::Calibration, true, &image(16)));
    assert!(v.device().crc_queries().is_empty());
    assert!(v.logger().has_user("Unsupported flash chip ID 0xDEADBEEF"));
    assert_eq!(v.device().count(FaultTarget::ExitKernel), 1);
}

#[test]
fn test_missing_memory_map_names_the_type() {
    let mut v = vehicle(pcm(AMD_1024, true));
    assert!(!write(&mut v, WriteType::Calibration, true, &image(16)));
    assert!(v.device().crc_queries().is_empty());
    assert!(v.logger().has_user("Unsupported flash memory format Amd1024"));
}

#[test]
fn test_invalid_write_type_never_touches_the_bus() {
    let mut v = vehicle(pcm(0x0089_4471, false));
    assert!(!write(&mut v, WriteType::Invalid, false, &image(16)));
    assert!(v.device().requests().is_empty());
    assert!(v.device().uploads().is_empty());
    assert_eq!(v.device().clears(), 0);
    assert!(v.logger().has_user("Invalid write type."));
}

#[test]
fn test_short_read_fails_before_bus_activity() {
    let mut v = vehicle(pcm(0x0089_4471, false));
    let mut stream = ImageStream::new(Cursor::new(vec![0u8; 100]), 576);
    let ok = v.write(
        WriteType::Full,
        false,
        &mut stream,
        &MemoryLoader::with_kernels(),
        &CancellationToken::new(),
    );
    assert!(!ok);
    assert!(v.device().requests().is_empty());
    assert_eq!(v.device().clears(), 0);
    assert!(v.logger().has_user("Unable to read input file."));
}

#[test]
fn test_calibration_with_single_zero_range() {
    let mut v = vehicle(pcm(0x0089_4471, true));
    assert!(write(&mut v, WriteType::Calibration, true, &image(16)));
    assert_eq!(v.device().crc_queries(), vec![MemoryRange::new(0, 0)]);
    assert!(v.device().uploads().is_empty());
    assert_eq!(
        v.device().timeouts(),
        &[TimeoutScenario::Maximum, TimeoutScenario::ReadProperty]
    );
    assert_eq!(v.device().count(FaultTarget::ExitKernel), 1);
}

fn ordered_ranges() -> [MemoryRange; 3] {
    [
        MemoryRange::new(0x8000, 0x100),
        MemoryRange::new(0x0000, 0x100),
        MemoryRange::new(0x4000, 0x100),
    ]
}

fn mapped_vehicle(pcm: DummyPcm) -> Vehicle<DummyPcm, RecordingLogger> {
    let map = MemoryMap::builtin().with_ranges(FlashMemoryType::Intel512, &ordered_ranges());
    let config = VehicleConfig::default().with_memory_map(map);
    Vehicle::with_config(pcm, RecordingLogger::default(), config)
}

#[test]
fn test_crc_queries_follow_map_order() {
    let mut v = mapped_vehicle(pcm(0x0089_4471, true));
    assert!(write(&mut v, WriteType::Calibration, true, &image(16)));
    assert_eq!(v.device().crc_queries(), ordered_ranges().to_vec());
}

#[test]
fn test_refused_range_stops_verification() {
    let ranges = ordered_ranges();
    let pcm = pcm(0x0089_4471, true)
        .with_fault(FaultRule::always(FaultTarget::CrcAt(ranges[1].address), FaultAction::Refuse));
    let mut v = mapped_vehicle(pcm);
    assert!(!write(&mut v, WriteType::Calibration, true, &image(16)));
    assert_eq!(v.device().crc_queries(), vec![ranges[0], ranges[1]]);
    assert!(v
        .logger()
        .has_user("Unable to get CRC for memory range 00000000 / 00000100"));
}

#[test]
fn test_garbled_range_retries_then_stops() {
    let ranges = ordered_ranges();
    let pcm = pcm(0x0089_4471, true)
        .with_fault(FaultRule::always(FaultTarget::CrcAt(ranges[1].address), FaultAction::Garble));
    let mut v = mapped_vehicle(pcm);
    assert!(!write(&mut v, WriteType::Calibration, true, &image(16)));
    let queries = v.device().crc_queries();
    assert_eq!(queries.len(), 1 + 5);
    assert_eq!(queries[0], ranges[0]);
    assert!(queries[1..].iter().all(|r| *r == ranges[1]));
    assert!(!queries.contains(&ranges[2]));
}

#[test]
fn test_full_write_exact_multiple() {
    let data = image(192 * 3);
    let mut v = vehicle(pcm(0x0089_4471, false));
    assert!(write(&mut v, WriteType::Full, false, &data));
    assert_eq!(v.device().chunks(), vec![(0, 192), (192, 192), (384, 192)]);
    assert_eq!(&v.device().flash()[..data.len()], &data[..]);
    assert_eq!(v.logger().progress.get(), (576, 576));
}

#[test]
fn test_full_write_short_trailing_chunk() {
    let data = image(192 * 2 + 50);
    let mut v = vehicle(pcm(0x0089_4471, true));
    assert!(write(&mut v, WriteType::Full, true, &data));
    assert_eq!(v.device().chunks(), vec![(0, 192), (192, 192), (384, 50)]);
    // The emulator drops frames whose checksum does not cover the payload
    assert_eq!(&v.device().flash()[..data.len()], &data[..]);
    assert!(v.device().flash()[data.len()..].iter().all(|&b| b == 0xFF));
}

#[test]
fn test_full_write_uploads_kernel_and_resets() {
    let data = image(576);
    let mut v = vehicle(pcm(0x0089_4471, false));
    assert!(write(&mut v, WriteType::Full, false, &data));
    assert_eq!(v.device().uploads(), &[(0x00FF_8000, 4)]);
    assert_eq!(v.device().count(FaultTarget::KernelReset), 1);
    assert_eq!(v.device().count(FaultTarget::ExitKernel), 1);
    assert_eq!(
        v.device().timeouts(),
        &[
            TimeoutScenario::SendKernel,
            TimeoutScenario::Maximum,
            TimeoutScenario::ReadProperty
        ]
    );
    assert!(v.logger().has_user("Kernel uploaded to PCM successfully."));
    assert!(v.logger().has_user("Full flash starting."));
    assert!(v.logger().has_user("PCM reset."));
}

fn failing_second_chunk(policy: ResetPolicy) -> Vehicle<DummyPcm, RecordingLogger> {
    let pcm = pcm(0x0089_4471, true)
        .with_fault(FaultRule::always(FaultTarget::ChunkAt(192), FaultAction::Garble));
    let config = VehicleConfig::default().with_reset_policy(policy);
    let mut v = Vehicle::with_config(pcm, RecordingLogger::default(), config);
    assert!(!write(&mut v, WriteType::Full, true, &image(576)));
    v
}

#[test]
fn test_failed_chunk_aborts_without_reset() {
    let v = failing_second_chunk(ResetPolicy::AfterSuccess);
    let chunks = v.device().chunks();
    assert_eq!(chunks[0], (0, 192));
    assert_eq!(chunks.iter().filter(|c| c.0 == 192).count(), 5);
    assert!(!chunks.iter().any(|c| c.0 == 384));
    assert_eq!(v.device().count(FaultTarget::KernelReset), 0);
    assert_eq!(v.device().count(FaultTarget::ExitKernel), 1);
    assert!(v.logger().has_user("Unable to send data chunk."));
}

#[test]
fn test_failed_chunk_still_resets_when_always() {
    let v = failing_second_chunk(ResetPolicy::Always);
    assert!(!v.device().chunks().iter().any(|c| c.0 == 384));
    assert_eq!(v.device().count(FaultTarget::KernelReset), 1);
    assert_eq!(v.device().count(FaultTarget::ExitKernel), 1);
}

#[test]
fn test_reset_failure_does_not_fail_the_write() {
    let pcm = pcm(0x0089_4471, true)
        .with_fault(FaultRule::always(FaultTarget::KernelReset, FaultAction::DropReply));
    let mut v = vehicle(pcm);
    assert!(write(&mut v, WriteType::Full, true, &image(200)));
    assert_eq!(v.device().count(FaultTarget::KernelReset), 5);
    assert!(v.logger().has_user("Unable to reset the PCM."));
}

#[test]
fn test_start_refused_sends_no_chunks() {
    let pcm = pcm(0x0089_4471, true)
        .with_fault(FaultRule::always(FaultTarget::StartFullFlash, FaultAction::Refuse));
    let mut v = vehicle(pcm);
    assert!(!write(&mut v, WriteType::Full, true, &image(576)));
    assert_eq!(v.device().count(FaultTarget::StartFullFlash), 1);
    assert!(v.device().chunks().is_empty());
    assert!(v.logger().has_user("Kernel won't allow a full flash."));
}

#[test]
fn test_transient_chunk_loss_is_retried() {
    let pcm = pcm(0x0089_4471, true)
        .with_fault(FaultRule::times(FaultTarget::ChunkAt(192), FaultAction::DropReply, 2))
        .with_fault(FaultRule::times(FaultTarget::ChunkAt(384), FaultAction::DropSend, 3));
    let data = image(576);
    let mut v = vehicle(pcm);
    assert!(write(&mut v, WriteType::Full, true, &data));
    assert_eq!(v.device().chunks().iter().filter(|c| c.0 == 192).count(), 3);
    assert_eq!(v.device().chunks().iter().filter(|c| c.0 == 384).count(), 4);
    assert_eq!(&v.device().flash()[..576], &data[..]);
}

fn assert_faulted_once(v: &Vehicle<DummyPcm, RecordingLogger>) {
    assert_eq!(v.device().count(FaultTarget::ExitKernel), 1);
    assert!(v.logger().has_user("Something went wrong."));
    assert!(v
        .logger()
        .has_user("Do not power off the PCM! Do not exit this program!"));
    assert_eq!(v.device().timeouts().last(), Some(&TimeoutScenario::ReadProperty));
}

#[test]
fn test_cleanup_runs_once_after_upload_fault() {
    let pcm = pcm(0x0089_4471, false)
        .with_fault(FaultRule::always(FaultTarget::Upload, FaultAction::Fault));
    let mut v = vehicle(pcm);
    assert!(!write(&mut v, WriteType::Full, false, &image(576)));
    assert!(v.device().chunks().is_empty());
    assert_faulted_once(&v);
}

#[test]
fn test_cleanup_runs_once_after_chip_query_fault() {
    let pcm = pcm(0x0089_4471, true)
        .with_fault(FaultRule::always(FaultTarget::FlashChipId, FaultAction::Fault));
    let mut v = vehicle(pcm);
    assert!(!write(&mut v, WriteType::Calibration, true, &image(16)));
    assert!(v.device().crc_queries().is_empty());
    assert_faulted_once(&v);
}

#[test]
fn test_cleanup_runs_once_after_chunk_fault() {
    let pcm = pcm(0x0089_4471, true)
        .with_fault(FaultRule::always(FaultTarget::ChunkAt(192), FaultAction::Fault));
    let mut v = vehicle(pcm);
    assert!(!write(&mut v, WriteType::Full, true, &image(576)));
    assert_eq!(v.device().chunks(), vec![(0, 192), (192, 192)]);
    assert_faulted_once(&v);
}

#[test]
fn test_os_and_calibration_is_not_implemented() {
    let mut v = vehicle(pcm(0x0089_4471, true));
    assert!(!write(&mut v, WriteType::OsAndCalibration, true, &image(16)));
    assert!(v
        .logger()
        .has_user("OS and calibration write is not supported yet."));
    assert!(v.device().crc_queries().is_empty());
    assert!(v.device().chunks().is_empty());
    assert_eq!(v.device().count(FaultTarget::ExitKernel), 1);
}

#[test]
fn test_kernel_load_failure() {
    let mut v = vehicle(pcm(0x0089_4471, false));
    let mut stream = ImageStream::new(Cursor::new(image(16)), 16);
    let ok = v.write(
        WriteType::Full,
        false,
        &mut stream,
        &MemoryLoader::default(),
        &CancellationToken::new(),
    );
    assert!(!ok);
    assert!(v.device().uploads().is_empty());
    assert!(v.logger().has_user("Failed to load kernel from file."));
}

#[test]
fn test_kernel_upload_rejected() {
    let pcm = pcm(0x0089_4471, false)
        .with_fault(FaultRule::always(FaultTarget::Upload, FaultAction::DropSend));
    let mut v = vehicle(pcm);
    assert!(!write(&mut v, WriteType::Full, false, &image(16)));
    assert!(v.logger().has_user("Failed to upload kernel to PCM"));
    assert!(!v.logger().has_user("Do not power off"));
    assert_eq!(v.device().count(FaultTarget::StartFullFlash), 0);
}

#[test]
fn test_cancelled_before_upload() {
    let mut v = vehicle(pcm(0x0089_4471, false));
    let cancel = CancellationToken::new();
    cancel.cancel();
    let mut stream = ImageStream::new(Cursor::new(image(16)), 16);
    let ok = v.write(
        WriteType::Full,
        false,
        &mut stream,
        &MemoryLoader::with_kernels(),
        &cancel,
    );
    assert!(!ok);
    assert!(v.device().uploads().is_empty());
    assert!(v.logger().has_user("Operation cancelled."));
    assert_eq!(v.device().count(FaultTarget::ExitKernel), 1);
}

#[test]
fn test_cancelled_between_chunks() {
    let cancel = CancellationToken::new();
    let logger = RecordingLogger {
        cancel_after: Some((192, cancel.clone())),
        ..Default::default()
    };
    let mut v = Vehicle::new(pcm(0x0089_4471, true), logger);
    let data = image(576);
    let mut stream = ImageStream::new(Cursor::new(data.clone()), 576);
    let ok = v.write(
        WriteType::Full,
        true,
        &mut stream,
        &MemoryLoader::with_kernels(),
        &cancel,
    );
    assert!(!ok);
    assert_eq!(v.device().chunks(), vec![(0, 192)]);
    assert_eq!(v.device().count(FaultTarget::KernelReset), 0);
    assert!(v.logger().has_user("Operation cancelled."));
}

#[test]
fn test_kernel_detection() {
    let mut stock = vehicle(pcm(0x0089_4471, false));
    assert!(!stock.is_kernel_running().unwrap());
    assert_eq!(stock.device().count(FaultTarget::FlashChipId), 1);

    let mut running = vehicle(pcm(0x0089_4471, true));
    assert!(running.is_kernel_running().unwrap());

    let silent = pcm(0x0089_4471, true)
        .with_fault(FaultRule::always(FaultTarget::FlashChipId, FaultAction::DropReply));
    let mut silent = vehicle(silent);
    assert!(!silent.is_kernel_running().unwrap());
    assert_eq!(silent.device().count(FaultTarget::FlashChipId), 5);
    assert_eq!(silent.device().total_delay_ms(), 4 * 250);
}

#[test]
fn test_wait_for_kernel() {
    let cancel = CancellationToken::new();
    let mut running = vehicle(pcm(0x0089_4471, true));
    assert!(running.try_wait_for_kernel(&cancel, 3).is_ok());
    assert!(running.logger().has_user("Kernel is responding."));

    let mut stock = vehicle(pcm(0x0089_4471, false));
    assert!(matches!(
        stock.try_wait_for_kernel(&cancel, 3),
        Err(Error::Refused { .. })
    ));
    assert_eq!(stock.device().count(FaultTarget::Ping), 1);
}

#[test]
fn test_kernel_test_uploads_read_kernel() {
    let mut v = vehicle(pcm(0x0089_4471, false));
    assert!(v.test_kernel(false, &MemoryLoader::with_kernels(), &CancellationToken::new()));
    assert_eq!(v.device().uploads(), &[(0x00FF_8000, 2)]);
    assert_eq!(v.device().count(FaultTarget::ExitKernel), 1);
}

#[test]
fn test_kernel_test_cleans_up_after_failure() {
    let mut v = vehicle(pcm(0x0089_4471, false));
    assert!(!v.test_kernel(false, &MemoryLoader::default(), &CancellationToken::new()));
    assert!(v.device().uploads().is_empty());
    assert_eq!(v.device().count(FaultTarget::ExitKernel), 1);
}

#[test]
fn test_kernel_reported_intel_id_verifies_calibration() {
    let mut v = vehicle(pcm(KERNEL_INTEL_512, true));
    assert!(write(&mut v, WriteType::Calibration, true, &image(16)));
    assert_eq!(v.device().crc_queries(), vec![MemoryRange::new(0, 0)]);
    assert!(!v.logger().has_user("Unsupported flash chip ID"));
}

#[test]
fn test_empty_full_image_leaves_flash_alone() {
    let config = DummyConfig {
        kernel_running: true,
        ..Default::default()
    };
    let mut v = vehicle(DummyPcm::with_data(config, &[0xAB; 64]));
    assert!(!write(&mut v, WriteType::Full, true, &[]));
    assert!(v.device().requests().is_empty());
    assert!(v.device().uploads().is_empty());
    assert_eq!(v.device().flash()[0], 0xAB);
    assert!(v.logger().has_user("The image is empty, nothing to write."));
}

#[test]
fn test_huge_declared_length_fails_cleanly() {
    let mut v = vehicle(pcm(0x0089_4471, true));
    let mut stream = ImageStream::new(Cursor::new(vec![0u8; 100]), u64::MAX);
    let ok = v.write(
        WriteType::Full,
        true,
        &mut stream,
        &MemoryLoader::with_kernels(),
        &CancellationToken::new(),
    );
    assert!(!ok);
    assert!(v.device().requests().is_empty());
    assert!(v.logger().has_user("Unable to read input file."));
}
