//! Static table of supported devices.
//!
//! The table is data, not code: adding a model is adding one
//! [`DeviceConfig`] record, the runtime never changes. Lookup is a linear
//! scan keyed by `(vendor id, product id)`.

use crate::input::{Axis, Button, Input};
use crate::mapping::{AxisMapping, BitMaskMapping, ButtonMapping, ByteCodeMapping};

/// SpaceMouse device families the driver can decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Model {
    SpaceMouseEnterprise,
    SpaceMouseWireless,
}

impl Model {
    pub const ALL: [Model; 2] = [Model::SpaceMouseEnterprise, Model::SpaceMouseWireless];
}

impl std::fmt::Display for Model {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Model::SpaceMouseEnterprise => "SpaceMouseEnterprise",
            Model::SpaceMouseWireless => "SpaceMouseWireless",
        };
        f.write_str(name)
    }
}

/// Report layout of one supported device.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeviceConfig {
    pub model: Model,
    pub vid: u16,
    pub pid: u16,
    /// HID interface number to match, `None` for any interface.
    pub interface: Option<i32>,
    /// Divisor normalizing raw 16-bit axis readings. Always positive.
    pub axis_div: i16,
    pub axis_mappings: [AxisMapping; Axis::COUNT],
    pub button_mappings: [Option<ButtonMapping>; Button::COUNT],
}

impl DeviceConfig {
    pub fn axis_mapping(&self, axis: Axis) -> &AxisMapping {
        &self.axis_mappings[axis.index()]
    }

    pub fn button_mapping(&self, button: Button) -> Option<&ButtonMapping> {
        self.button_mappings[button.index()].as_ref()
    }

    /// True when an enumerated interface number satisfies this entry.
    pub fn matches_interface(&self, interface: i32) -> bool {
        self.interface.map_or(true, |wanted| wanted == interface)
    }

    /// Decode one raw report into a full device state.
    ///
    /// Axes reset to zero whenever their report is absent; button states
    /// carry over from `previous` until a report for them arrives. Buttons
    /// the model does not map stay released.
    pub fn parse_report(&self, data: &[u8], previous: &Input) -> Input {
        let mut input = Input::default();

        for mapping in &self.axis_mappings {
            if let Some(raw) = mapping.parse(data) {
                input.stick.axes[mapping.axis.index()] =
                    f64::from(raw) / f64::from(self.axis_div);
            }
        }

        for (slot, button) in self.button_mappings.iter().zip(Button::ALL) {
            let Some(mapping) = slot else {
                continue;
            };
            match mapping.parse(data) {
                Some(pressed) => input.buttons.set(button, pressed),
                None => input.buttons.set(button, previous.buttons.contains(button)),
            }
        }

        input
    }
}

const fn axis(axis: Axis, report_id: u8, byte_low: u8, byte_high: u8, invert: bool) -> AxisMapping {
    AxisMapping { axis, report_id, byte_low, byte_high, invert }
}

const fn byte_code(button: Button, report_id: u8, code: u8) -> Option<ButtonMapping> {
    Some(ButtonMapping::ByteCode(ByteCodeMapping { button, report_id, code }))
}

const fn bit_mask(
    button: Button,
    report_id: u8,
    byte_index: u8,
    bit_index: u8,
) -> Option<ButtonMapping> {
    Some(ButtonMapping::BitMask(BitMaskMapping { button, report_id, byte_index, bit_index }))
}

// Motion layout shared by every supported model: report 0x01, six
// little-endian byte pairs in axis order.
const MOTION_AXES: [AxisMapping; Axis::COUNT] = [
    axis(Axis::LinearX, 0x01, 1, 2, false),
    axis(Axis::LinearY, 0x01, 3, 4, true),
    axis(Axis::LinearZ, 0x01, 5, 6, true),
    axis(Axis::AngularX, 0x01, 7, 8, true),
    axis(Axis::AngularY, 0x01, 9, 10, true),
    axis(Axis::AngularZ, 0x01, 11, 12, false),
];

// The Enterprise reports held keys as a code list in report 0x1c.
const fn enterprise_buttons() -> [Option<ButtonMapping>; Button::COUNT] {
    let mut map = [None; Button::COUNT];
    map[Button::Button1 as usize] = byte_code(Button::Button1, 0x1c, 0x0d);
    map[Button::Button2 as usize] = byte_code(Button::Button2, 0x1c, 0x0e);
    map[Button::Button3 as usize] = byte_code(Button::Button3, 0x1c, 0x0f);
    map[Button::Button4 as usize] = byte_code(Button::Button4, 0x1c, 0x10);
    map[Button::Button5 as usize] = byte_code(Button::Button5, 0x1c, 0x11);
    map[Button::Button6 as usize] = byte_code(Button::Button6, 0x1c, 0x12);
    map[Button::Button7 as usize] = byte_code(Button::Button7, 0x1c, 0x13);
    map[Button::Button8 as usize] = byte_code(Button::Button8, 0x1c, 0x14);
    map[Button::Button9 as usize] = byte_code(Button::Button9, 0x1c, 0x15);
    map[Button::Button10 as usize] = byte_code(Button::Button10, 0x1c, 0x16);
    map[Button::Button11 as usize] = byte_code(Button::Button11, 0x1c, 0x4d);
    map[Button::Button12 as usize] = byte_code(Button::Button12, 0x1c, 0x4e);
    map[Button::Escape as usize] = byte_code(Button::Escape, 0x1c, 0x17);
    map[Button::Enter as usize] = byte_code(Button::Enter, 0x1c, 0x24);
    map[Button::Tab as usize] = byte_code(Button::Tab, 0x1c, 0xaf);
    map[Button::Shift as usize] = byte_code(Button::Shift, 0x1c, 0x19);
    map[Button::Ctrl as usize] = byte_code(Button::Ctrl, 0x1c, 0x1a);
    map[Button::Alt as usize] = byte_code(Button::Alt, 0x1c, 0x18);
    map[Button::Space as usize] = byte_code(Button::Space, 0x1c, 0xb0);
    map[Button::Menu as usize] = byte_code(Button::Menu, 0x1c, 0x01);
    map[Button::Delete as usize] = byte_code(Button::Delete, 0x1c, 0x25);
    map[Button::V1 as usize] = byte_code(Button::V1, 0x1c, 0x67);
    map[Button::V2 as usize] = byte_code(Button::V2, 0x1c, 0x68);
    map[Button::V3 as usize] = byte_code(Button::V3, 0x1c, 0x69);
    map[Button::Rotate as usize] = byte_code(Button::Rotate, 0x1c, 0x09);
    map[Button::Top as usize] = byte_code(Button::Top, 0x1c, 0x03);
    map[Button::Front as usize] = byte_code(Button::Front, 0x1c, 0x06);
    map[Button::Right as usize] = byte_code(Button::Right, 0x1c, 0x05);
    map[Button::Lock as usize] = byte_code(Button::Lock, 0x1c, 0x1b);
    map[Button::Iso as usize] = byte_code(Button::Iso, 0x1c, 0x0b);
    map[Button::Fit as usize] = byte_code(Button::Fit, 0x1c, 0x02);
    map
}

// The Wireless packs its two buttons into bits of report 0x03.
const fn wireless_buttons() -> [Option<ButtonMapping>; Button::COUNT] {
    let mut map = [None; Button::COUNT];
    map[Button::Button1 as usize] = bit_mask(Button::Button1, 0x03, 1, 0);
    map[Button::Button2 as usize] = bit_mask(Button::Button2, 0x03, 1, 1);
    map
}

/// Every device the driver knows how to decode.
pub static DEVICES: [DeviceConfig; 3] = [
    DeviceConfig {
        model: Model::SpaceMouseEnterprise,
        vid: 0x256f,
        pid: 0xc633,
        interface: None,
        axis_div: 350,
        axis_mappings: MOTION_AXES,
        button_mappings: enterprise_buttons(),
    },
    // Wireless behind the Universal Receiver dongle.
    DeviceConfig {
        model: Model::SpaceMouseWireless,
        vid: 0x256f,
        pid: 0xc652,
        interface: Some(2),
        axis_div: 350,
        axis_mappings: MOTION_AXES,
        button_mappings: wireless_buttons(),
    },
    // Wireless over its own USB cable or Bluetooth.
    DeviceConfig {
        model: Model::SpaceMouseWireless,
        vid: 0x256f,
        pid: 0xc63a,
        interface: None,
        axis_div: 350,
        axis_mappings: MOTION_AXES,
        button_mappings: wireless_buttons(),
    },
];

/// Find the registry entry for a `(vendor id, product id)` pair.
pub fn get(vid: u16, pid: u16) -> Option<&'static DeviceConfig> {
    DEVICES.iter().find(|d| d.vid == vid && d.pid == pid)
}

/// True when at least one registry entry carries the model.
pub fn is_supported(model: Model) -> bool {
    DEVICES.iter().any(|d| d.model == model)
}
