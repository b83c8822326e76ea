//! Button Input Source
//!
//! Keyboard stand-in for the GPIO button panel: reads key lines from stdin
//! and queues the mapped actions for the coordinator to rebroadcast. This
//! worker produces actions only; it never touches the shared ECU state.

use control_bus::{ControlMessage, Target, WorkerId};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// An input line mapped to its effect
enum ButtonAction {
    Control(ControlMessage),
    /// Raw command frame queued for the ECU link
    Command(Vec<u8>),
}

/// Marelli datastream ping request byte
const PING_FRAME: u8 = 0x81;

fn parse_line(line: &str) -> Option<ButtonAction> {
    match line.trim() {
        "d" => Some(ButtonAction::Control(ControlMessage::short_press(
            Target::Worker(WorkerId::Acquisition),
            1,
        ))),
        "r" => Some(ButtonAction::Control(ControlMessage::long_press(
            Target::Worker(WorkerId::Acquisition),
            1,
        ))),
        "c" => Some(ButtonAction::Control(ControlMessage::short_press(
            Target::Worker(WorkerId::Console),
            2,
        ))),
        "a" => Some(ButtonAction::Control(ControlMessage::short_press(
            Target::All,
            0,
        ))),
        "p" => Some(ButtonAction::Command(vec![PING_FRAME])),
        "" => None,
        other => {
            debug!(input = other, "unmapped key");
            None
        }
    }
}

/// Read key lines from stdin until EOF or the stop flag is set
///
/// d = demo toggle, r = link reset, c = console pause, a = broadcast,
/// p = ECU ping.
pub async fn run_buttons(
    action_tx: mpsc::UnboundedSender<ControlMessage>,
    command_tx: mpsc::UnboundedSender<Vec<u8>>,
    stop: Arc<AtomicBool>,
) {
    info!("Button input started (d=demo, r=reset, c=console, p=ping)");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while !stop.load(Ordering::Relaxed) {
        // Stdin has no non-blocking poll; bound the wait so the stop flag
        // is honored within a quantum.
        let next = tokio::time::timeout(Duration::from_millis(250), lines.next_line()).await;
        match next {
            Ok(Ok(Some(line))) => match parse_line(&line) {
                Some(ButtonAction::Control(message)) => {
                    if action_tx.send(message).is_err() {
                        break;
                    }
                }
                Some(ButtonAction::Command(frame)) => {
                    if command_tx.send(frame).is_err() {
                        break;
                    }
                }
                None => {}
            },
            Ok(Ok(None)) => break,
            Ok(Err(e)) => {
                warn!("Stdin read failed: {e}");
                break;
            }
            Err(_) => {} // timeout; re-check the stop flag
        }
    }
    info!("Button input stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use control_bus::PressKind;

    #[test]
    fn test_demo_key_targets_acquisition() {
        let Some(ButtonAction::Control(message)) = parse_line("d") else {
            panic!("expected a control action");
        };
        assert!(message.is_mine(WorkerId::Acquisition));
        assert!(!message.is_mine(WorkerId::Console));
        assert_eq!(message.press, PressKind::Short);
    }

    #[test]
    fn test_reset_key_is_a_long_press() {
        let Some(ButtonAction::Control(message)) = parse_line(" r \n") else {
            panic!("expected a control action");
        };
        assert_eq!(message.press, PressKind::Long);
        assert!(message.is_mine(WorkerId::Acquisition));
    }

    #[test]
    fn test_ping_key_queues_a_command() {
        let Some(ButtonAction::Command(frame)) = parse_line("p") else {
            panic!("expected a command");
        };
        assert_eq!(frame, vec![PING_FRAME]);
    }

    #[test]
    fn test_unmapped_input_is_dropped() {
        assert!(parse_line("").is_none());
        assert!(parse_line("zz").is_none());
    }
}
