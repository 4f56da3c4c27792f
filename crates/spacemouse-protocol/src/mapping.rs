use crate::input::{Axis, Button};

/// Where one axis lives inside a raw HID report.
///
/// The value is read as little-endian signed 16-bit from the two byte
/// positions, optionally negated. Parsing yields nothing when the report id
/// does not match or either byte falls outside the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxisMapping {
    pub axis: Axis,
    pub report_id: u8,
    pub byte_low: u8,
    pub byte_high: u8,
    pub invert: bool,
}

impl AxisMapping {
    pub fn parse(&self, data: &[u8]) -> Option<i16> {
        if data.first() != Some(&self.report_id) {
            return None;
        }
        let low = *data.get(self.byte_low as usize)?;
        let high = *data.get(self.byte_high as usize)?;
        let raw = i16::from_le_bytes([low, high]);
        Some(if self.invert { raw.wrapping_neg() } else { raw })
    }
}

/// Button encoded as a fixed bit of a fixed byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitMaskMapping {
    pub button: Button,
    pub report_id: u8,
    pub byte_index: u8,
    pub bit_index: u8,
}

impl BitMaskMapping {
    pub fn parse(&self, data: &[u8]) -> Option<bool> {
        if data.first() != Some(&self.report_id) {
            return None;
        }
        let byte = *data.get(self.byte_index as usize)?;
        Some(byte & (1 << self.bit_index) != 0)
    }
}

/// Button encoded as a key code listed in the report body.
///
/// The report carries the codes of every currently held button, so several
/// mappings sharing one report id may all parse as pressed from a single
/// report. A matching report without the code means released.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteCodeMapping {
    pub button: Button,
    pub report_id: u8,
    pub code: u8,
}

impl ByteCodeMapping {
    pub fn parse(&self, data: &[u8]) -> Option<bool> {
        if data.first() != Some(&self.report_id) {
            return None;
        }
        Some(data[1..].contains(&self.code))
    }
}

/// The two button encodings used across SpaceMouse models.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonMapping {
    BitMask(BitMaskMapping),
    ByteCode(ByteCodeMapping),
}

impl ButtonMapping {
    pub fn button(&self) -> Button {
        match self {
            ButtonMapping::BitMask(m) => m.button,
            ButtonMapping::ByteCode(m) => m.button,
        }
    }

    pub fn parse(&self, data: &[u8]) -> Option<bool> {
        match self {
            ButtonMapping::BitMask(m) => m.parse(data),
            ButtonMapping::ByteCode(m) => m.parse(data),
        }
    }
}
