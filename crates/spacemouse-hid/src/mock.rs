//! In-memory transport for tests.
//!
//! Devices can be added and removed while a driver is live, reports are
//! fed through per-device queues, and failure modes (broken reads, opens
//! that are refused) are switchable at any time.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::transport::{DeviceInfo, HidDeviceIo, HidTransport};

#[derive(Default)]
struct MockState {
    devices: Mutex<Vec<MockDevice>>,
}

struct MockDevice {
    info: DeviceInfo,
    reports: Arc<Mutex<VecDeque<Vec<u8>>>>,
    broken: Arc<AtomicBool>,
    refuse_open: Arc<AtomicBool>,
}

/// Test handle for steering one mock device.
#[derive(Clone)]
pub struct MockDeviceControl {
    reports: Arc<Mutex<VecDeque<Vec<u8>>>>,
    broken: Arc<AtomicBool>,
    refuse_open: Arc<AtomicBool>,
}

impl MockDeviceControl {
    /// Queue one report for the next read.
    pub fn queue_report(&self, report: Vec<u8>) {
        let mut reports = self.reports.lock().unwrap_or_else(|e| e.into_inner());
        reports.push_back(report);
    }

    /// Make every further read fail, as a yanked cable would.
    pub fn break_device(&self) {
        self.broken.store(true, Ordering::SeqCst);
    }

    /// Restore reads after [`MockDeviceControl::break_device`].
    pub fn repair_device(&self) {
        self.broken.store(false, Ordering::SeqCst);
    }

    /// Control whether opens of this device are refused.
    pub fn refuse_opens(&self, refuse: bool) {
        self.refuse_open.store(refuse, Ordering::SeqCst);
    }
}

/// [`HidTransport`] over a mutable in-memory device list.
#[derive(Clone, Default)]
pub struct MockTransport {
    state: Arc<MockState>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a device and return its control handle.
    pub fn add_device(&self, info: DeviceInfo) -> MockDeviceControl {
        let device = MockDevice {
            info,
            reports: Arc::new(Mutex::new(VecDeque::new())),
            broken: Arc::new(AtomicBool::new(false)),
            refuse_open: Arc::new(AtomicBool::new(false)),
        };
        let control = MockDeviceControl {
            reports: Arc::clone(&device.reports),
            broken: Arc::clone(&device.broken),
            refuse_open: Arc::clone(&device.refuse_open),
        };
        let mut devices = self.state.devices.lock().unwrap_or_else(|e| e.into_inner());
        devices.push(device);
        control
    }

    /// Drop a device from enumeration. Open handles keep their queues.
    pub fn remove_device(&self, path: &str) {
        let mut devices = self.state.devices.lock().unwrap_or_else(|e| e.into_inner());
        devices.retain(|d| d.info.path != path);
    }
}

impl HidTransport for MockTransport {
    fn enumerate(&self) -> Vec<DeviceInfo> {
        let devices = self.state.devices.lock().unwrap_or_else(|e| e.into_inner());
        devices.iter().map(|d| d.info.clone()).collect()
    }

    fn open(&self, path: &str) -> Option<Box<dyn HidDeviceIo>> {
        let devices = self.state.devices.lock().unwrap_or_else(|e| e.into_inner());
        let device = devices.iter().find(|d| d.info.path == path)?;
        if device.refuse_open.load(Ordering::SeqCst) {
            return None;
        }
        Some(Box::new(MockDeviceIo {
            reports: Arc::clone(&device.reports),
            broken: Arc::clone(&device.broken),
        }))
    }
}

struct MockDeviceIo {
    reports: Arc<Mutex<VecDeque<Vec<u8>>>>,
    broken: Arc<AtomicBool>,
}

impl HidDeviceIo for MockDeviceIo {
    fn read(&mut self, buf: &mut [u8], timeout_ms: i32) -> i32 {
        if self.broken.load(Ordering::SeqCst) {
            return -1;
        }
        let report = {
            let mut reports = self.reports.lock().unwrap_or_else(|e| e.into_inner());
            reports.pop_front()
        };
        match report {
            Some(report) => {
                let n = report.len().min(buf.len());
                buf[..n].copy_from_slice(&report[..n]);
                n as i32
            }
            None => {
                // Keep callers from spinning, but stay well under the
                // requested timeout so tests run fast.
                std::thread::sleep(Duration::from_millis(timeout_ms.clamp(0, 2) as u64));
                0
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(path: &str) -> DeviceInfo {
        DeviceInfo { path: path.to_owned(), vid: 0x256f, pid: 0xc63a, interface: 0 }
    }

    #[test]
    fn enumerate_tracks_added_and_removed_devices() {
        let transport = MockTransport::new();
        assert!(transport.enumerate().is_empty());

        transport.add_device(info("mock-0"));
        transport.add_device(info("mock-1"));
        assert_eq!(transport.enumerate().len(), 2);

        transport.remove_device("mock-0");
        let remaining = transport.enumerate();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].path, "mock-1");
    }

    #[test]
    fn refused_open_returns_nothing() {
        let transport = MockTransport::new();
        let control = transport.add_device(info("mock-0"));

        control.refuse_opens(true);
        assert!(transport.open("mock-0").is_none());
        control.refuse_opens(false);
        assert!(transport.open("mock-0").is_some());
    }

    #[test]
    fn reads_drain_the_queue_then_time_out() {
        let transport = MockTransport::new();
        let control = transport.add_device(info("mock-0"));
        let mut device = transport.open("mock-0").expect("open");

        control.queue_report(vec![0x01, 0x02, 0x03]);
        let mut buf = [0u8; 8];
        assert_eq!(device.read(&mut buf, 10), 3);
        assert_eq!(device.read(&mut buf, 10), 0);
    }
}
