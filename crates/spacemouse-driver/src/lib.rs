mod buffer;
mod connection;
mod dispatcher;
mod driver;
mod error;
mod events;
mod manager;
mod method;
mod processor;

pub use crate::connection::ConnectionState;
pub use crate::driver::Driver;
pub use crate::error::{Error, Result};
pub use crate::events::{ConnectionEvent, EventReceiver};
pub use crate::manager::DriverManager;

pub use spacemouse_protocol::{Axis, Button, ButtonMask, Input, Model, StickInput};
