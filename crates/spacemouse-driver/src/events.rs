use crossbeam_channel::Receiver;

use spacemouse_protocol::Model;

/// Connection lifecycle events, delivered in transition order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionEvent {
    /// A device was opened and its model resolved.
    Connected(Model),
    /// The device was closed or lost.
    Disconnected,
}

/// Receiving end for connection event subscription.
pub type EventReceiver = Receiver<ConnectionEvent>;
