use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use log::{debug, warn};
use spacemouse_hid::{DeviceHandle, HidBackend};
use spacemouse_protocol::Input;

use crate::buffer::DoubleBuffer;

/// Receives every parsed input; `true` flags a hard read error.
pub(crate) type DataCallback = Arc<dyn Fn(Input, bool) + Send + Sync>;

const READ_BUFFER_SIZE: usize = 64;
const NO_DEVICE_SLEEP: Duration = Duration::from_millis(10);
const READ_ERROR_SLEEP: Duration = Duration::from_millis(100);
const IDLE_SLEEP: Duration = Duration::from_millis(1);

/// Background reader: blocks on the device, parses reports and publishes
/// the latest [`Input`] to a wait-free snapshot.
///
/// Device loss is detected here: a negative read surfaces through the data
/// callback with the error flag set, and the facade reacts by initiating a
/// disconnect.
pub(crate) struct InputProcessor {
    backend: Arc<HidBackend>,
    running: AtomicBool,
    worker: Mutex<Option<JoinHandle<()>>>,
    device: Mutex<Option<Arc<DeviceHandle>>>,
    latest: DoubleBuffer<Input>,
    callback: Mutex<Option<DataCallback>>,
}

impl InputProcessor {
    pub fn new(backend: Arc<HidBackend>) -> Self {
        Self {
            backend,
            running: AtomicBool::new(false),
            worker: Mutex::new(None),
            device: Mutex::new(None),
            latest: DoubleBuffer::new(),
            callback: Mutex::new(None),
        }
    }

    /// Spawn the read thread. Idempotent.
    pub fn start(self: &Arc<Self>) {
        if self.running.swap(true, Ordering::SeqCst) {
            warn!("input processor is already running");
            return;
        }
        let processor = Arc::clone(self);
        let handle = std::thread::spawn(move || processor.process_loop());
        let mut worker = self.worker.lock().unwrap_or_else(|e| e.into_inner());
        *worker = Some(handle);
        debug!("input processor started");
    }

    /// Signal the read thread and join it. Idempotent. The bounded read
    /// timeout keeps the join short.
    pub fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
        }
        let worker = {
            let mut slot = self.worker.lock().unwrap_or_else(|e| e.into_inner());
            slot.take()
        };
        if let Some(handle) = worker {
            let _ = handle.join();
        }
        debug!("input processor stopped");
    }

    /// Hand the read loop an open device.
    pub fn set_device(&self, device: Arc<DeviceHandle>) {
        let mut slot = self.device.lock().unwrap_or_else(|e| e.into_inner());
        *slot = Some(device);
    }

    /// Unset the device and reset the snapshot to all-zero.
    pub fn clear_device(&self) {
        let mut slot = self.device.lock().unwrap_or_else(|e| e.into_inner());
        *slot = None;
        self.latest.write(Input::default());
    }

    pub fn latest_input(&self) -> Input {
        self.latest.read()
    }

    pub fn set_data_callback<F>(&self, callback: F)
    where
        F: Fn(Input, bool) + Send + Sync + 'static,
    {
        let mut slot = self.callback.lock().unwrap_or_else(|e| e.into_inner());
        *slot = Some(Arc::new(callback));
    }

    fn process_loop(&self) {
        let mut buf = [0u8; READ_BUFFER_SIZE];

        while self.running.load(Ordering::SeqCst) {
            let current = {
                let slot = self.device.lock().unwrap_or_else(|e| e.into_inner());
                slot.clone()
            };
            let Some(device) = current else {
                std::thread::sleep(NO_DEVICE_SLEEP);
                continue;
            };

            let res = self.backend.read(&device, &mut buf);

            if res < 0 {
                // Read error means the device is gone.
                debug!("read error from device");
                self.invoke_callback(Input::default(), true);
                std::thread::sleep(READ_ERROR_SLEEP);
                continue;
            }
            if res == 0 {
                std::thread::sleep(IDLE_SLEEP);
                continue;
            }

            let n = (res as usize).min(buf.len());
            let previous = self.latest.read();
            let input = device.config.parse_report(&buf[..n], &previous);
            self.latest.write(input);
            self.invoke_callback(input, false);
        }
    }

    fn invoke_callback(&self, input: Input, error: bool) {
        let callback = {
            let slot = self.callback.lock().unwrap_or_else(|e| e.into_inner());
            slot.clone()
        };
        if let Some(callback) = callback {
            callback(input, error);
        }
    }
}

impl Drop for InputProcessor {
    fn drop(&mut self) {
        self.stop();
    }
}
