use std::sync::Arc;

use log::{debug, error};
use spacemouse_hid::{DeviceHandle, DeviceInfo, HidBackend};
use spacemouse_protocol::{registry, Model};

/// How a driver picks its device among the enumerated candidates.
///
/// Every variant enumerates fresh on each attempt; a `None` result leaves
/// the reconnection loop to try again on the next tick.
pub enum ConnectMethod {
    /// First supported device that opens.
    Any,
    /// Devices resolving to a listed model, most preferred first.
    ModelList(Vec<Model>),
    /// One specific hidraw node.
    Path(String),
}

impl ConnectMethod {
    pub(crate) fn connect(&self, backend: &HidBackend) -> Option<Arc<DeviceHandle>> {
        match self {
            ConnectMethod::Any => connect_any(backend),
            ConnectMethod::ModelList(models) => connect_model_list(backend, models),
            ConnectMethod::Path(path) => connect_path(backend, path),
        }
    }
}

fn connect_any(backend: &HidBackend) -> Option<Arc<DeviceHandle>> {
    for dev in backend.enumerate() {
        let Some(config) = registry::get(dev.vid, dev.pid) else {
            continue;
        };
        if !config.matches_interface(dev.interface) {
            continue;
        }
        if let Some(handle) = backend.open(&dev.path, dev.vid, dev.pid) {
            return Some(handle);
        }
    }
    debug!("no SpaceMouse devices found");
    None
}

fn connect_model_list(backend: &HidBackend, models: &[Model]) -> Option<Arc<DeviceHandle>> {
    if models.is_empty() {
        error!("no preferred models specified for device connection");
        return None;
    }

    let mut candidates: Vec<(DeviceInfo, usize)> = Vec::new();
    for dev in backend.enumerate() {
        let Some(config) = registry::get(dev.vid, dev.pid) else {
            continue;
        };
        if !config.matches_interface(dev.interface) {
            continue;
        }
        let Some(priority) = models.iter().position(|m| *m == config.model) else {
            continue;
        };
        candidates.push((dev, priority));
    }
    if candidates.is_empty() {
        debug!("no listed SpaceMouse devices found");
        return None;
    }

    // Stable sort keeps enumeration order within one model.
    candidates.sort_by_key(|(_, priority)| *priority);
    for (dev, _) in candidates {
        if let Some(handle) = backend.open(&dev.path, dev.vid, dev.pid) {
            return Some(handle);
        }
    }
    None
}

fn connect_path(backend: &HidBackend, path: &str) -> Option<Arc<DeviceHandle>> {
    for dev in backend.enumerate() {
        if dev.path != path {
            continue;
        }
        if registry::get(dev.vid, dev.pid).is_none() {
            debug!("device at {path} is not a supported SpaceMouse device");
            return None;
        }
        let handle = backend.open(&dev.path, dev.vid, dev.pid);
        if handle.is_none() {
            error!("failed to open device at path: {path}");
        }
        return handle;
    }
    debug!("no device found at path: {path}");
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use spacemouse_hid::mock::MockTransport;

    const ENTERPRISE: (u16, u16) = (0x256f, 0xc633);
    const WIRELESS: (u16, u16) = (0x256f, 0xc63a);
    const WIRELESS_DONGLE: (u16, u16) = (0x256f, 0xc652);

    fn info(path: &str, (vid, pid): (u16, u16), interface: i32) -> DeviceInfo {
        DeviceInfo { path: path.to_owned(), vid, pid, interface }
    }

    #[test]
    fn any_skips_unregistered_devices() {
        let transport = MockTransport::new();
        transport.add_device(info("keyboard", (0x046d, 0xc31c), 0));
        transport.add_device(info("mouse-0", WIRELESS, 0));
        let backend = HidBackend::with_transport(Box::new(transport));

        let handle = ConnectMethod::Any.connect(&backend).expect("connect");
        assert_eq!(handle.path, "mouse-0");
    }

    #[test]
    fn any_honors_interface_restriction() {
        let transport = MockTransport::new();
        // The dongle entry only matches interface 2.
        transport.add_device(info("dongle-if0", WIRELESS_DONGLE, 0));
        transport.add_device(info("dongle-if2", WIRELESS_DONGLE, 2));
        let backend = HidBackend::with_transport(Box::new(transport));

        let handle = ConnectMethod::Any.connect(&backend).expect("connect");
        assert_eq!(handle.path, "dongle-if2");
    }

    #[test]
    fn any_falls_through_refused_opens() {
        let transport = MockTransport::new();
        let first = transport.add_device(info("mouse-0", WIRELESS, 0));
        transport.add_device(info("mouse-1", WIRELESS, 0));
        first.refuse_opens(true);
        let backend = HidBackend::with_transport(Box::new(transport));

        let handle = ConnectMethod::Any.connect(&backend).expect("connect");
        assert_eq!(handle.path, "mouse-1");
    }

    #[test]
    fn model_list_prefers_earlier_entries() {
        let transport = MockTransport::new();
        transport.add_device(info("enterprise-0", ENTERPRISE, 0));
        transport.add_device(info("wireless-0", WIRELESS, 0));
        let backend = HidBackend::with_transport(Box::new(transport));

        let method = ConnectMethod::ModelList(vec![
            Model::SpaceMouseWireless,
            Model::SpaceMouseEnterprise,
        ]);
        let handle = method.connect(&backend).expect("connect");
        assert_eq!(handle.path, "wireless-0");
    }

    #[test]
    fn model_list_excludes_unlisted_models() {
        let transport = MockTransport::new();
        transport.add_device(info("enterprise-0", ENTERPRISE, 0));
        let backend = HidBackend::with_transport(Box::new(transport));

        let method = ConnectMethod::ModelList(vec![Model::SpaceMouseWireless]);
        assert!(method.connect(&backend).is_none());
    }

    #[test]
    fn empty_model_list_connects_nothing() {
        let transport = MockTransport::new();
        transport.add_device(info("wireless-0", WIRELESS, 0));
        let backend = HidBackend::with_transport(Box::new(transport));

        assert!(ConnectMethod::ModelList(Vec::new()).connect(&backend).is_none());
    }

    #[test]
    fn path_rejects_unregistered_device() {
        let transport = MockTransport::new();
        transport.add_device(info("keyboard", (0x046d, 0xc31c), 0));
        let backend = HidBackend::with_transport(Box::new(transport));

        let method = ConnectMethod::Path("keyboard".to_owned());
        assert!(method.connect(&backend).is_none());
    }

    #[test]
    fn path_opens_exact_match_only() {
        let transport = MockTransport::new();
        transport.add_device(info("mouse-0", WIRELESS, 0));
        transport.add_device(info("mouse-1", WIRELESS, 0));
        let backend = HidBackend::with_transport(Box::new(transport));

        let method = ConnectMethod::Path("mouse-1".to_owned());
        let handle = method.connect(&backend).expect("connect");
        assert_eq!(handle.path, "mouse-1");

        let missing = ConnectMethod::Path("mouse-7".to_owned());
        assert!(missing.connect(&backend).is_none());
    }
}
