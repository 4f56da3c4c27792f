use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crossbeam_channel::{unbounded, Sender};
use log::{debug, info, warn};
use spacemouse_hid::HidBackend;
use spacemouse_protocol::{Button, Input, Model, StickInput};

use crate::connection::{ConnectionManager, ConnectionState};
use crate::dispatcher::CallbackDispatcher;
use crate::events::{ConnectionEvent, EventReceiver};
use crate::method::ConnectMethod;
use crate::processor::InputProcessor;

type Subscribers = Arc<Mutex<Vec<Sender<ConnectionEvent>>>>;

/// One driver instance: at most one device at a time, three background
/// threads, user callbacks and an event stream.
///
/// Built through [`DriverManager`](crate::DriverManager); the manager owns
/// the HID backend shared across drivers.
pub struct Driver {
    connection: Arc<ConnectionManager>,
    processor: Arc<InputProcessor>,
    dispatcher: Arc<CallbackDispatcher>,
    subscribers: Subscribers,
    running: AtomicBool,
}

impl Driver {
    pub(crate) fn new(backend: Arc<HidBackend>, method: ConnectMethod) -> Self {
        let connection = Arc::new(ConnectionManager::new(Arc::clone(&backend), method));
        let processor = Arc::new(InputProcessor::new(backend));
        let dispatcher = Arc::new(CallbackDispatcher::new());
        let subscribers: Subscribers = Arc::new(Mutex::new(Vec::new()));

        {
            let processor = Arc::clone(&processor);
            let dispatcher = Arc::clone(&dispatcher);
            let subscribers = Arc::clone(&subscribers);
            connection.set_state_callback(move |state, device| match state {
                ConnectionState::Connected => {
                    let Some(device) = device else {
                        return;
                    };
                    let model = device.config.model;
                    processor.set_device(device);
                    broadcast(&subscribers, ConnectionEvent::Connected(model));
                }
                ConnectionState::Disconnected => {
                    // Release held buttons and recenter the stick before
                    // the device goes away from under the callbacks.
                    dispatcher.process_input(Input::default());
                    processor.clear_device();
                    broadcast(&subscribers, ConnectionEvent::Disconnected);
                }
            });
        }

        {
            let connection = Arc::clone(&connection);
            let dispatcher = Arc::clone(&dispatcher);
            processor.set_data_callback(move |input, error| {
                // A read error while connected means the device is gone.
                if error && connection.state() == ConnectionState::Connected {
                    debug!("failed to read input data from the device, disconnecting");
                    connection.disconnect();
                    return;
                }
                dispatcher.process_input(input);
            });
        }

        debug!("driver initialized");
        Self {
            connection,
            processor,
            dispatcher,
            subscribers,
            running: AtomicBool::new(false),
        }
    }

    /// Start the background threads and begin connecting. Idempotent.
    pub fn run(&self) {
        if self.running.swap(true, Ordering::SeqCst) {
            warn!("driver is already running");
            return;
        }
        self.dispatcher.start();
        self.processor.start();
        self.connection.start();
        info!("driver started");
    }

    /// Stop the background threads and disconnect. Idempotent.
    pub fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            warn!("driver is not running");
            return;
        }
        self.processor.stop();
        self.dispatcher.stop();
        // Join the connect thread before closing the device, otherwise a
        // reconnection can slip in between.
        self.connection.stop();
        if self.connection.state() == ConnectionState::Connected {
            self.connection.disconnect();
        }
        info!("driver stopped");
    }

    /// Most recent device state, without waiting for a callback.
    pub fn read_input(&self) -> Input {
        self.processor.latest_input()
    }

    pub fn register_stick_callback<F>(&self, callback: F)
    where
        F: Fn(StickInput) + Send + Sync + 'static,
    {
        self.dispatcher.register_stick_callback(callback);
    }

    pub fn remove_stick_callback(&self) {
        self.dispatcher.remove_stick_callback();
    }

    pub fn register_button_callback<F>(&self, button: Button, callback: F)
    where
        F: Fn(bool) + Send + Sync + 'static,
    {
        self.dispatcher.register_button_callback(button, callback);
    }

    pub fn remove_button_callback(&self, button: Button) {
        self.dispatcher.remove_button_callback(button);
    }

    /// Deliver callbacks on every input instead of at the fixed cadence.
    pub fn set_instant_callbacks(&self, enabled: bool) {
        self.dispatcher.set_instant_callbacks(enabled);
    }

    /// Cadence of interval-mode callback delivery (default 20 ms).
    pub fn set_callback_interval(&self, interval: Duration) {
        self.dispatcher.set_callback_interval(interval);
    }

    /// Pause between reconnection attempts (default 1 s).
    pub fn set_connection_retry_interval(&self, interval: Duration) {
        self.connection.set_retry_interval(interval);
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.connection.state()
    }

    /// Model of the connected device, if any.
    pub fn connected_model(&self) -> Option<Model> {
        self.connection.connected_model()
    }

    /// Subscribe to connection events. Dropped receivers are pruned on the
    /// next send.
    pub fn subscribe(&self) -> EventReceiver {
        let (tx, rx) = unbounded();
        let mut subscribers = self.subscribers.lock().unwrap_or_else(|e| e.into_inner());
        subscribers.push(tx);
        rx
    }
}

impl Drop for Driver {
    fn drop(&mut self) {
        if self.running.load(Ordering::SeqCst) {
            self.stop();
        }
    }
}

fn broadcast(subscribers: &Subscribers, event: ConnectionEvent) {
    let mut subscribers = subscribers.lock().unwrap_or_else(|e| e.into_inner());
    subscribers.retain(|tx| tx.send(event).is_ok());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;
    use spacemouse_hid::mock::MockTransport;
    use spacemouse_hid::DeviceInfo;
    use spacemouse_protocol::Axis;
    use std::time::Instant;

    fn wireless_info(path: &str) -> DeviceInfo {
        DeviceInfo { path: path.to_owned(), vid: 0x256f, pid: 0xc63a, interface: 0 }
    }

    fn driver_over(transport: MockTransport, method: ConnectMethod) -> Driver {
        let backend = Arc::new(HidBackend::with_transport(Box::new(transport)));
        let driver = Driver::new(backend, method);
        driver.set_connection_retry_interval(Duration::from_millis(10));
        driver.set_callback_interval(Duration::from_millis(5));
        driver
    }

    fn wait_until(deadline: Duration, mut probe: impl FnMut() -> bool) -> bool {
        let start = Instant::now();
        while start.elapsed() < deadline {
            if probe() {
                return true;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        false
    }

    #[test]
    fn connects_after_device_appears_and_streams_input() {
        let transport = MockTransport::new();
        let driver = driver_over(transport.clone(), ConnectMethod::Any);
        let events = driver.subscribe();

        let (stick_tx, stick_rx) = unbounded();
        driver.register_stick_callback(move |stick| {
            let _ = stick_tx.send(stick);
        });

        driver.run();
        // A few empty enumeration rounds first.
        std::thread::sleep(Duration::from_millis(35));
        assert_eq!(driver.connection_state(), ConnectionState::Disconnected);

        let control = transport.add_device(wireless_info("mock-0"));
        assert_eq!(
            events.recv_timeout(Duration::from_secs(2)),
            Ok(ConnectionEvent::Connected(Model::SpaceMouseWireless))
        );
        assert_eq!(driver.connected_model(), Some(Model::SpaceMouseWireless));

        control.queue_report(vec![0x01, 0x2c, 0x01, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0]);
        let stick = stick_rx.recv_timeout(Duration::from_secs(2)).expect("stick");
        assert_eq!(stick[Axis::LinearX], 300.0 / 350.0);

        driver.stop();
    }

    #[test]
    fn read_error_disconnects_then_reconnects() {
        let transport = MockTransport::new();
        let control = transport.add_device(wireless_info("mock-0"));
        let driver = driver_over(transport, ConnectMethod::Any);
        let events = driver.subscribe();

        driver.run();
        assert_eq!(
            events.recv_timeout(Duration::from_secs(2)),
            Ok(ConnectionEvent::Connected(Model::SpaceMouseWireless))
        );

        control.break_device();
        assert_eq!(
            events.recv_timeout(Duration::from_secs(2)),
            Ok(ConnectionEvent::Disconnected)
        );
        assert_eq!(driver.read_input(), Input::default());

        control.repair_device();
        assert_eq!(
            events.recv_timeout(Duration::from_secs(2)),
            Ok(ConnectionEvent::Connected(Model::SpaceMouseWireless))
        );

        driver.stop();
    }

    #[test]
    fn device_loss_releases_held_buttons() {
        let transport = MockTransport::new();
        let control = transport.add_device(wireless_info("mock-0"));
        let driver = driver_over(transport, ConnectMethod::Any);

        let (button_tx, button_rx) = unbounded();
        driver.register_button_callback(Button::Button1, move |pressed| {
            let _ = button_tx.send(pressed);
        });

        driver.run();
        control.queue_report(vec![0x03, 0x01]);
        assert!(button_rx.recv_timeout(Duration::from_secs(2)).expect("press"));

        control.break_device();
        // The all-zero input pushed on disconnect releases the button.
        assert!(!button_rx.recv_timeout(Duration::from_secs(2)).expect("release"));

        driver.stop();
    }

    #[test]
    fn button_edges_pass_through_the_whole_stack() {
        let transport = MockTransport::new();
        let control = transport.add_device(wireless_info("mock-0"));
        let driver = driver_over(transport, ConnectMethod::Any);

        let (button_tx, button_rx) = unbounded();
        driver.register_button_callback(Button::Button2, move |pressed| {
            let _ = button_tx.send(pressed);
        });

        driver.run();
        control.queue_report(vec![0x03, 0x02]);
        assert!(button_rx.recv_timeout(Duration::from_secs(2)).expect("press"));

        control.queue_report(vec![0x03, 0x00]);
        assert!(!button_rx.recv_timeout(Duration::from_secs(2)).expect("release"));

        assert!(button_rx.recv_timeout(Duration::from_millis(100)).is_err());

        driver.stop();
    }

    #[test]
    fn two_drivers_never_share_one_path() {
        let transport = MockTransport::new();
        transport.add_device(wireless_info("mock-0"));
        let backend = Arc::new(HidBackend::with_transport(Box::new(transport)));

        let first = Driver::new(Arc::clone(&backend), ConnectMethod::Path("mock-0".into()));
        let second = Driver::new(backend, ConnectMethod::Path("mock-0".into()));
        first.set_connection_retry_interval(Duration::from_millis(10));
        second.set_connection_retry_interval(Duration::from_millis(10));

        first.run();
        second.run();
        std::thread::sleep(Duration::from_millis(200));

        let connected = [first.connection_state(), second.connection_state()]
            .iter()
            .filter(|s| **s == ConnectionState::Connected)
            .count();
        assert_eq!(connected, 1);

        first.stop();
        second.stop();
    }

    #[test]
    fn run_and_stop_are_idempotent() {
        let driver = driver_over(MockTransport::new(), ConnectMethod::Any);
        driver.run();
        driver.run();
        driver.stop();
        driver.stop();
    }
}
