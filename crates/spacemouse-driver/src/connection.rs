use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use log::{debug, info, warn};
use spacemouse_hid::{DeviceHandle, HidBackend};
use spacemouse_protocol::Model;

use crate::method::ConnectMethod;

/// Whether the driver currently holds an open device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connected,
}

impl ConnectionState {
    fn from_u8(raw: u8) -> ConnectionState {
        match raw {
            0 => ConnectionState::Disconnected,
            _ => ConnectionState::Connected,
        }
    }
}

pub(crate) type StateCallback =
    Arc<dyn Fn(ConnectionState, Option<Arc<DeviceHandle>>) + Send + Sync>;

const DEFAULT_RETRY_INTERVAL_MS: u64 = 1000;

/// Owns the device handle and the background reconnection loop.
///
/// The loop sleeps on the retry interval, attempts a connection whenever
/// the state is `Disconnected`, and publishes transitions through a single
/// notification callback. Same-state transitions never notify.
pub(crate) struct ConnectionManager {
    backend: Arc<HidBackend>,
    method: ConnectMethod,
    device: Mutex<Option<Arc<DeviceHandle>>>,
    state: AtomicU8,
    callback: Mutex<Option<StateCallback>>,
    retry_interval_ms: AtomicU64,
    worker: Mutex<Option<(Sender<()>, JoinHandle<()>)>>,
}

impl ConnectionManager {
    pub fn new(backend: Arc<HidBackend>, method: ConnectMethod) -> Self {
        Self {
            backend,
            method,
            device: Mutex::new(None),
            state: AtomicU8::new(ConnectionState::Disconnected as u8),
            callback: Mutex::new(None),
            retry_interval_ms: AtomicU64::new(DEFAULT_RETRY_INTERVAL_MS),
            worker: Mutex::new(None),
        }
    }

    /// Spawn the connect thread. Idempotent.
    pub fn start(self: &Arc<Self>) {
        let mut worker = self.worker.lock().unwrap_or_else(|e| e.into_inner());
        if worker.is_some() {
            warn!("connection manager is already running");
            return;
        }
        let (stop_tx, stop_rx) = bounded::<()>(1);
        let manager = Arc::clone(self);
        let handle = std::thread::spawn(move || manager.connect_loop(stop_rx));
        *worker = Some((stop_tx, handle));
        debug!("connection manager started");
    }

    /// Stop and join the connect thread. Idempotent.
    pub fn stop(&self) {
        let worker = {
            let mut slot = self.worker.lock().unwrap_or_else(|e| e.into_inner());
            slot.take()
        };
        if let Some((stop_tx, handle)) = worker {
            let _ = stop_tx.send(());
            let _ = handle.join();
            debug!("connection manager stopped");
        }
    }

    fn connect_loop(&self, stop_rx: Receiver<()>) {
        loop {
            let interval = Duration::from_millis(self.retry_interval_ms.load(Ordering::Relaxed));
            match stop_rx.recv_timeout(interval) {
                Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                Err(RecvTimeoutError::Timeout) => {}
            }
            if self.state() == ConnectionState::Disconnected {
                self.try_connect();
            }
        }
    }

    fn try_connect(&self) -> bool {
        if self.state() == ConnectionState::Connected {
            warn!("already connected to a device");
            return true;
        }

        let Some(device) = self.method.connect(&self.backend) else {
            return false;
        };

        info!("connected to SpaceMouse device: {}", device.name());
        {
            let mut slot = self.device.lock().unwrap_or_else(|e| e.into_inner());
            *slot = Some(device);
        }
        self.change_state(ConnectionState::Connected);
        true
    }

    /// Close the current device, release its claim and notify.
    pub fn disconnect(&self) {
        if self.state() != ConnectionState::Connected {
            warn!("not connected to any device");
            return;
        }

        {
            let mut slot = self.device.lock().unwrap_or_else(|e| e.into_inner());
            if let Some(device) = slot.take() {
                info!("disconnecting from SpaceMouse device: {}", device.name());
                self.backend.close(&device);
            }
        }
        self.change_state(ConnectionState::Disconnected);
    }

    pub fn state(&self) -> ConnectionState {
        ConnectionState::from_u8(self.state.load(Ordering::SeqCst))
    }

    pub fn device(&self) -> Option<Arc<DeviceHandle>> {
        self.device.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn connected_model(&self) -> Option<Model> {
        let device = self.device.lock().unwrap_or_else(|e| e.into_inner());
        device.as_ref().map(|d| d.config.model)
    }

    /// Install the notification callback. The callback is invoked with no
    /// manager lock held, so it may call back into the manager.
    pub fn set_state_callback<F>(&self, callback: F)
    where
        F: Fn(ConnectionState, Option<Arc<DeviceHandle>>) + Send + Sync + 'static,
    {
        let mut slot = self.callback.lock().unwrap_or_else(|e| e.into_inner());
        *slot = Some(Arc::new(callback));
    }

    pub fn set_retry_interval(&self, interval: Duration) {
        self.retry_interval_ms
            .store(interval.as_millis() as u64, Ordering::Relaxed);
    }

    fn change_state(&self, new_state: ConnectionState) {
        let old = self.state.swap(new_state as u8, Ordering::SeqCst);
        if old == new_state as u8 {
            return;
        }
        self.notify_state_change();
    }

    fn notify_state_change(&self) {
        let callback = {
            let slot = self.callback.lock().unwrap_or_else(|e| e.into_inner());
            slot.clone()
        };
        let device = self.device();
        if let Some(callback) = callback {
            callback(self.state(), device);
        }
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        self.stop();
        if self.state() == ConnectionState::Connected {
            self.disconnect();
        }
    }
}
