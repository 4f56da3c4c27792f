use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use ahash::AHashMap;
use log::{debug, warn};
use spacemouse_protocol::{Button, Input, StickInput};

pub(crate) type StickCallback = Arc<dyn Fn(StickInput) + Send + Sync>;
pub(crate) type ButtonCallback = Arc<dyn Fn(bool) + Send + Sync>;

const DEFAULT_CALLBACK_INTERVAL_MS: u64 = 20;

#[derive(Default)]
struct Callbacks {
    stick: Option<StickCallback>,
    buttons: AHashMap<Button, ButtonCallback>,
}

#[derive(Default)]
struct InputSlot {
    current: Input,
    fresh: bool,
}

/// Delivers inputs to user callbacks from a dedicated thread.
///
/// In interval mode (the default) the thread samples the most recent input
/// at a fixed cadence; in instant mode every `process_input` wakes it.
/// Button callbacks fire on edges only, and an all-zero stick is reported
/// exactly once per return to center.
pub(crate) struct CallbackDispatcher {
    running: AtomicBool,
    worker: Mutex<Option<JoinHandle<()>>>,
    callbacks: Mutex<Callbacks>,
    slot: Mutex<InputSlot>,
    available: Condvar,
    interval_ms: AtomicU64,
    instant: AtomicBool,
}

impl CallbackDispatcher {
    pub fn new() -> Self {
        Self {
            running: AtomicBool::new(false),
            worker: Mutex::new(None),
            callbacks: Mutex::new(Callbacks::default()),
            slot: Mutex::new(InputSlot::default()),
            available: Condvar::new(),
            interval_ms: AtomicU64::new(DEFAULT_CALLBACK_INTERVAL_MS),
            instant: AtomicBool::new(false),
        }
    }

    /// Spawn the dispatch thread. Idempotent.
    pub fn start(self: &Arc<Self>) {
        if self.running.swap(true, Ordering::SeqCst) {
            warn!("callback dispatcher is already running");
            return;
        }
        let dispatcher = Arc::clone(self);
        let handle = std::thread::spawn(move || dispatcher.dispatch_loop());
        let mut worker = self.worker.lock().unwrap_or_else(|e| e.into_inner());
        *worker = Some(handle);
        debug!("callback dispatcher started");
    }

    /// Wake the dispatch thread and join it. Idempotent.
    pub fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
        }
        {
            let mut slot = self.slot.lock().unwrap_or_else(|e| e.into_inner());
            slot.fresh = true;
        }
        self.available.notify_all();

        let worker = {
            let mut slot = self.worker.lock().unwrap_or_else(|e| e.into_inner());
            slot.take()
        };
        if let Some(handle) = worker {
            let _ = handle.join();
        }
        debug!("callback dispatcher stopped");
    }

    /// Stage an input for dispatch, overwriting any undelivered one.
    pub fn process_input(&self, input: Input) {
        {
            let mut slot = self.slot.lock().unwrap_or_else(|e| e.into_inner());
            slot.current = input;
            slot.fresh = true;
        }
        if self.instant.load(Ordering::SeqCst) {
            self.available.notify_all();
        }
    }

    pub fn register_stick_callback<F>(&self, callback: F)
    where
        F: Fn(StickInput) + Send + Sync + 'static,
    {
        let mut callbacks = self.callbacks.lock().unwrap_or_else(|e| e.into_inner());
        callbacks.stick = Some(Arc::new(callback));
    }

    pub fn remove_stick_callback(&self) {
        let mut callbacks = self.callbacks.lock().unwrap_or_else(|e| e.into_inner());
        callbacks.stick = None;
    }

    pub fn register_button_callback<F>(&self, button: Button, callback: F)
    where
        F: Fn(bool) + Send + Sync + 'static,
    {
        let mut callbacks = self.callbacks.lock().unwrap_or_else(|e| e.into_inner());
        callbacks.buttons.insert(button, Arc::new(callback));
    }

    pub fn remove_button_callback(&self, button: Button) {
        let mut callbacks = self.callbacks.lock().unwrap_or_else(|e| e.into_inner());
        callbacks.buttons.remove(&button);
    }

    /// Cadence of interval mode. Ignored while instant mode is on.
    pub fn set_callback_interval(&self, interval: Duration) {
        self.interval_ms
            .store(interval.as_millis() as u64, Ordering::Relaxed);
    }

    pub fn set_instant_callbacks(&self, enabled: bool) {
        self.instant.store(enabled, Ordering::SeqCst);
    }

    fn dispatch_loop(&self) {
        let mut previous = Input::default();
        let mut zero_reported = false;

        while self.running.load(Ordering::SeqCst) {
            let interval = Duration::from_millis(self.interval_ms.load(Ordering::Relaxed));
            let slot = self.slot.lock().unwrap_or_else(|e| e.into_inner());
            let (mut slot, _) = self
                .available
                .wait_timeout_while(slot, interval, |s| {
                    self.running.load(Ordering::SeqCst)
                        && !(s.fresh && self.instant.load(Ordering::SeqCst))
                })
                .unwrap_or_else(|e| e.into_inner());

            if !self.running.load(Ordering::SeqCst) {
                break;
            }
            if !slot.fresh {
                continue;
            }
            slot.fresh = false;
            let input = slot.current;
            drop(slot);

            // Buttons: fire only on edges against the previous snapshot.
            for button in input.buttons.changed(previous.buttons).iter() {
                self.invoke_button_callback(button, input.buttons.contains(button));
            }

            // Stick: suppress repeats of the at-rest state, but deliver the
            // return to center exactly once.
            if input.stick.is_zero() {
                if !zero_reported {
                    self.invoke_stick_callback(StickInput::default());
                    zero_reported = true;
                }
            } else {
                self.invoke_stick_callback(input.stick);
                zero_reported = false;
            }

            previous = input;
        }
    }

    fn invoke_stick_callback(&self, input: StickInput) {
        let callback = {
            let callbacks = self.callbacks.lock().unwrap_or_else(|e| e.into_inner());
            callbacks.stick.clone()
        };
        if let Some(callback) = callback {
            callback(input);
        }
    }

    fn invoke_button_callback(&self, button: Button, pressed: bool) {
        let callback = {
            let callbacks = self.callbacks.lock().unwrap_or_else(|e| e.into_inner());
            callbacks.buttons.get(&button).cloned()
        };
        if let Some(callback) = callback {
            callback(pressed);
        }
    }
}

impl Drop for CallbackDispatcher {
    fn drop(&mut self) {
        self.stop();
    }
}
