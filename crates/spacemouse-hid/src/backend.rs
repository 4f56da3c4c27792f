use std::sync::{Arc, Mutex};

use hidapi::HidError;
use log::debug;
use spacemouse_protocol::{registry, DeviceConfig};

use crate::claims::ClaimedPaths;
use crate::transport::{DeviceInfo, HidDeviceIo, HidTransport, HidapiTransport};

/// Upper bound on a single blocking read. Bounds shutdown latency of the
/// thread sitting in [`HidBackend::read`].
pub const READ_TIMEOUT_MS: i32 = 100;

/// An open device: the raw transport handle plus its registry entry.
///
/// Closing takes the raw device out of the mutex; a reader still holding
/// the handle afterwards observes a hard read error on its next call.
pub struct DeviceHandle {
    raw: Mutex<Option<Box<dyn HidDeviceIo>>>,
    pub config: &'static DeviceConfig,
    pub path: String,
}

impl DeviceHandle {
    /// Human-readable identity for log lines.
    pub fn name(&self) -> String {
        format!("{} ({})", self.config.model, self.path)
    }

    fn read(&self, buf: &mut [u8], timeout_ms: i32) -> i32 {
        let mut raw = self.raw.lock().unwrap_or_else(|e| e.into_inner());
        match raw.as_mut() {
            Some(device) => device.read(buf, timeout_ms),
            None => -1,
        }
    }

    fn take_raw(&self) -> Option<Box<dyn HidDeviceIo>> {
        self.raw.lock().unwrap_or_else(|e| e.into_inner()).take()
    }
}

impl std::fmt::Debug for DeviceHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceHandle")
            .field("model", &self.config.model)
            .field("path", &self.path)
            .finish()
    }
}

/// Facade over the HID transport shared by every driver in the process.
///
/// All opens go through the claimed-path set, so at most one of two
/// concurrent opens of the same node hands out a handle.
pub struct HidBackend {
    transport: Box<dyn HidTransport>,
    claims: ClaimedPaths,
}

impl HidBackend {
    /// Backend over the real hidapi transport.
    pub fn new() -> Result<Self, HidError> {
        Ok(Self::with_transport(Box::new(HidapiTransport::new()?)))
    }

    /// Backend over a caller-supplied transport (mocks, custom stacks).
    pub fn with_transport(transport: Box<dyn HidTransport>) -> Self {
        Self { transport, claims: ClaimedPaths::new() }
    }

    pub fn enumerate(&self) -> Vec<DeviceInfo> {
        self.transport.enumerate()
    }

    /// Claim and open a device node, resolving its registry entry.
    ///
    /// Any failure releases the claim: an already-claimed path, a node the
    /// transport cannot open, or a `(vid, pid)` the registry does not know.
    pub fn open(&self, path: &str, vid: u16, pid: u16) -> Option<Arc<DeviceHandle>> {
        if !self.claims.claim(path) {
            debug!("device {path} is already claimed");
            return None;
        }
        let Some(raw) = self.transport.open(path) else {
            self.claims.release(path);
            return None;
        };
        let Some(config) = registry::get(vid, pid) else {
            // Dropping the raw device closes the node.
            drop(raw);
            self.claims.release(path);
            return None;
        };
        Some(Arc::new(DeviceHandle {
            raw: Mutex::new(Some(raw)),
            config,
            path: path.to_owned(),
        }))
    }

    /// Bounded blocking read of one report.
    pub fn read(&self, handle: &DeviceHandle, buf: &mut [u8]) -> i32 {
        handle.read(buf, READ_TIMEOUT_MS)
    }

    /// Close the device and release its path claim. Idempotent.
    pub fn close(&self, handle: &DeviceHandle) {
        if handle.take_raw().is_some() {
            self.claims.release(&handle.path);
        }
    }
}
