use std::ffi::CString;
use std::sync::Mutex;

use hidapi::{HidApi, HidError};
use log::{debug, warn};

/// One HID interface as reported by enumeration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    pub path: String,
    pub vid: u16,
    pub pid: u16,
    pub interface: i32,
}

/// Bounded-blocking access to one open HID device.
pub trait HidDeviceIo: Send {
    /// Read one input report.
    ///
    /// Returns a negative value on a hard error, `0` when no report arrived
    /// within `timeout_ms`, or the report length otherwise. The report id is
    /// the first byte of the buffer.
    fn read(&mut self, buf: &mut [u8], timeout_ms: i32) -> i32;
}

/// Enumeration and exclusive opening of raw HID interfaces.
pub trait HidTransport: Send + Sync {
    fn enumerate(&self) -> Vec<DeviceInfo>;

    /// Open a device node exclusively. `None` when the node cannot be
    /// opened (missing, busy, or permission denied).
    fn open(&self, path: &str) -> Option<Box<dyn HidDeviceIo>>;
}

/// The production transport, backed by hidapi.
pub struct HidapiTransport {
    api: Mutex<HidApi>,
}

impl HidapiTransport {
    pub fn new() -> Result<Self, HidError> {
        let api = HidApi::new()?;
        Ok(Self { api: Mutex::new(api) })
    }
}

impl HidTransport for HidapiTransport {
    fn enumerate(&self) -> Vec<DeviceInfo> {
        let mut api = self.api.lock().unwrap_or_else(|e| e.into_inner());
        if let Err(err) = api.refresh_devices() {
            warn!("HID enumeration failed: {err}");
            return Vec::new();
        }
        api.device_list()
            .map(|info| DeviceInfo {
                path: info.path().to_string_lossy().into_owned(),
                vid: info.vendor_id(),
                pid: info.product_id(),
                interface: info.interface_number(),
            })
            .collect()
    }

    fn open(&self, path: &str) -> Option<Box<dyn HidDeviceIo>> {
        let c_path = CString::new(path).ok()?;
        let api = self.api.lock().unwrap_or_else(|e| e.into_inner());
        match api.open_path(&c_path) {
            Ok(device) => Some(Box::new(device)),
            Err(err) => {
                debug!("failed to open {path}: {err}");
                None
            }
        }
    }
}

impl HidDeviceIo for hidapi::HidDevice {
    fn read(&mut self, buf: &mut [u8], timeout_ms: i32) -> i32 {
        match self.read_timeout(buf, timeout_ms) {
            Ok(n) => n as i32,
            Err(_) => -1,
        }
    }
}
