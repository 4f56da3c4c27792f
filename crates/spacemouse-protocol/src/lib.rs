mod input;
mod mapping;
pub mod registry;

pub use crate::input::{Axis, Button, ButtonMask, Input, StickInput};
pub use crate::mapping::{AxisMapping, BitMaskMapping, ButtonMapping, ByteCodeMapping};
pub use crate::registry::{DeviceConfig, Model, DEVICES};
