use std::sync::{Arc, Mutex};

use spacemouse_hid::{HidBackend, HidTransport};
use spacemouse_protocol::{registry, Model};

use crate::driver::Driver;
use crate::error::{Error, Result};
use crate::method::ConnectMethod;

/// Factory for [`Driver`] instances.
///
/// All drivers created by one manager share its HID backend and therefore
/// its claimed-path set, so they can never open the same device node.
///
/// ```no_run
/// use spacemouse_driver::DriverManager;
///
/// let manager = DriverManager::new().expect("HID backend");
/// let driver = manager.create_driver();
/// driver.run();
/// ```
pub struct DriverManager {
    backend: Arc<HidBackend>,
    drivers: Mutex<Vec<Arc<Driver>>>,
}

impl DriverManager {
    /// Manager over the real hidapi transport.
    pub fn new() -> Result<Self> {
        let backend = HidBackend::new().map_err(|e| Error::BackendInit(e.to_string()))?;
        Ok(Self::with_backend(backend))
    }

    /// Manager over a caller-supplied transport (tests, custom stacks).
    pub fn with_transport(transport: Box<dyn HidTransport>) -> Self {
        Self::with_backend(HidBackend::with_transport(transport))
    }

    fn with_backend(backend: HidBackend) -> Self {
        Self {
            backend: Arc::new(backend),
            drivers: Mutex::new(Vec::new()),
        }
    }

    /// Driver for the first SpaceMouse device that can be opened.
    pub fn create_driver(&self) -> Arc<Driver> {
        self.make_driver(ConnectMethod::Any)
    }

    /// Driver preferring models by their position in `models`.
    pub fn create_driver_for_models(&self, models: &[Model]) -> Result<Arc<Driver>> {
        if models.is_empty() {
            return Err(Error::EmptyModelList);
        }
        for model in models {
            if !registry::is_supported(*model) {
                return Err(Error::UnsupportedModel(*model));
            }
        }
        Ok(self.make_driver(ConnectMethod::ModelList(models.to_vec())))
    }

    /// Driver for one specific model.
    pub fn create_driver_for_model(&self, model: Model) -> Result<Arc<Driver>> {
        self.create_driver_for_models(&[model])
    }

    /// Driver bound to one hidraw node.
    pub fn create_driver_for_path(&self, path: &str) -> Result<Arc<Driver>> {
        if path.is_empty() {
            return Err(Error::EmptyDevicePath);
        }
        Ok(self.make_driver(ConnectMethod::Path(path.to_owned())))
    }

    fn make_driver(&self, method: ConnectMethod) -> Arc<Driver> {
        let driver = Arc::new(Driver::new(Arc::clone(&self.backend), method));
        let mut drivers = self.drivers.lock().unwrap_or_else(|e| e.into_inner());
        drivers.push(Arc::clone(&driver));
        driver
    }
}

impl Drop for DriverManager {
    fn drop(&mut self) {
        let drivers = self.drivers.lock().unwrap_or_else(|e| e.into_inner());
        for driver in drivers.iter() {
            driver.stop();
        }
    }
}
