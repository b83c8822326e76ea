//! Control Bus
//!
//! Addressed broadcast messaging between the monitor workers. Every
//! published message is copied into every subscriber's inbox in publish
//! order; each worker decides for itself whether a message is addressed to
//! it. The bus never filters, so adding a worker is a registration call,
//! not a bus change.

mod bus;
mod message;

pub use bus::{ControlBus, ControlInbox};
pub use message::{ControlMessage, PressKind, Target, WorkerId};
