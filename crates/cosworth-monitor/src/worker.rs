//! Presentation Workers
//!
//! The capability every display backend implements, the shared polling
//! runner that drives it, and the terminal dashboard worker.

use control_bus::{ControlInbox, ControlMessage, PressKind, WorkerId};
use ecu_state::{EcuSnapshot, SharedEcuState};
use ecu_stream::SensorRegistry;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// A presentation backend
///
/// Implementations read ECU state through snapshots and never write it.
pub trait DisplayWorker {
    /// Address on the control bus
    fn id(&self) -> WorkerId;

    /// Handle a control message already confirmed to be addressed here
    fn on_control(&mut self, message: &ControlMessage);

    /// Render one frame from a consistent snapshot
    fn render(&mut self, snapshot: &EcuSnapshot);
}

/// Bounded-rate polling loop shared by every presentation worker
///
/// Per tick: drain the control inbox without blocking, act only on messages
/// that pass `is_mine`, render from a snapshot, sleep. Exits within one
/// tick interval of the stop flag flipping.
pub async fn run_worker<W: DisplayWorker>(
    mut worker: W,
    state: SharedEcuState,
    mut inbox: ControlInbox,
    tick_interval: Duration,
    stop: Arc<AtomicBool>,
) {
    info!(worker = ?worker.id(), "display worker started");

    while !stop.load(Ordering::Relaxed) {
        while let Some(message) = inbox.try_next() {
            if message.is_mine(worker.id()) {
                debug!(worker = ?worker.id(), ?message, "control message");
                worker.on_control(&message);
            }
        }

        let snapshot = state.snapshot().await;
        worker.render(&snapshot);

        tokio::time::sleep(tick_interval).await;
    }

    info!(worker = ?worker.id(), "display worker stopped");
}

/// Prints the live sensor table to the terminal
pub struct ConsoleWorker {
    /// Registry order, for stable output
    sensor_order: Vec<(String, String, String)>,
    paused: bool,
    /// Emit one JSON snapshot on the next render
    dump_json: bool,
}

impl ConsoleWorker {
    pub fn new(registry: &SensorRegistry) -> Self {
        let sensor_order = registry
            .sensors()
            .iter()
            .map(|s| (s.id.clone(), s.label.clone(), s.unit.clone()))
            .collect();
        Self {
            sensor_order,
            paused: false,
            dump_json: false,
        }
    }

    /// Whether rendering is currently paused
    pub fn is_paused(&self) -> bool {
        self.paused
    }
}

impl DisplayWorker for ConsoleWorker {
    fn id(&self) -> WorkerId {
        WorkerId::Console
    }

    fn on_control(&mut self, message: &ControlMessage) {
        if !message.pressed {
            return;
        }
        match message.press {
            PressKind::Short => {
                self.paused = !self.paused;
                info!(paused = self.paused, "console output toggled");
            }
            PressKind::Long => self.dump_json = true,
            PressKind::None => {}
        }
    }

    fn render(&mut self, snapshot: &EcuSnapshot) {
        if self.dump_json {
            self.dump_json = false;
            match serde_json::to_string(snapshot) {
                Ok(json) => println!("{json}"),
                Err(e) => warn!("Snapshot serialization failed: {e}"),
            }
        }
        if self.paused {
            return;
        }

        println!(
            "sample #{:<10} cycle {:>8.3} ms   errors {}",
            snapshot.sample_counter,
            snapshot.cycle_latency * 1000.0,
            snapshot.errors.len()
        );
        for (id, label, unit) in &self.sensor_order {
            let value = snapshot.values.get(id).copied().unwrap_or_default();
            match (value.current, value.previous) {
                (Some(current), Some(previous)) => {
                    println!("  {label:<18} {current:>10.1} {unit:<5} (prev {previous:.1})");
                }
                (Some(current), None) => {
                    println!("  {label:<18} {current:>10.1} {unit:<5}");
                }
                _ => println!("  {label:<18} {:>10} {unit:<5}", "---"),
            }
        }
    }
}
