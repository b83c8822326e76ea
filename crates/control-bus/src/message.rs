//! Control Message Types

use serde::{Deserialize, Serialize};

/// Workers that can be addressed on the control bus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WorkerId {
    /// The acquisition loop talking to the ECU
    Acquisition,
    /// Terminal dashboard
    Console,
    /// Character-mode Matrix Orbital LCD
    MatrixLcd,
    /// OLED/SDL graphics head
    Graphics,
}

/// Message destination: a single worker or everyone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Target {
    Worker(WorkerId),
    All,
}

/// How long a button was held
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PressKind {
    Short,
    Long,
    None,
}

/// A button action addressed to one worker or broadcast to all
///
/// Immutable once created; the coordinator copies it verbatim into every
/// worker inbox.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlMessage {
    pub target: Target,
    /// Physical button number that triggered the action
    pub button: u8,
    pub pressed: bool,
    pub press: PressKind,
}

impl ControlMessage {
    /// A short press of `button`, addressed to `target`
    pub fn short_press(target: Target, button: u8) -> Self {
        Self {
            target,
            button,
            pressed: true,
            press: PressKind::Short,
        }
    }

    /// A long press of `button`, addressed to `target`
    pub fn long_press(target: Target, button: u8) -> Self {
        Self {
            target,
            button,
            pressed: true,
            press: PressKind::Long,
        }
    }

    /// Consumer-side address check; the bus itself never filters
    pub fn is_mine(&self, id: WorkerId) -> bool {
        match self.target {
            Target::All => true,
            Target::Worker(worker) => worker == id,
        }
    }
}
