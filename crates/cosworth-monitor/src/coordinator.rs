//! Coordinator Loop
//!
//! The top-level loop: drains acquisition output into the shared ECU state,
//! rebroadcasts button actions onto the control bus, and on shutdown joins
//! every worker after a final best-effort drain.

use control_bus::{ControlBus, ControlMessage};
use ecu_state::SharedEcuState;
use ecu_stream::SampleEvent;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Ticks between "still running" heartbeat logs
const HEARTBEAT_TICKS: u64 = 10_000;

/// Drains sample events and button actions every tick
pub struct Coordinator {
    state: SharedEcuState,
    bus: ControlBus,
    sample_rx: mpsc::Receiver<SampleEvent>,
    action_rx: mpsc::UnboundedReceiver<ControlMessage>,
    tick_interval: Duration,
    workers: Vec<JoinHandle<()>>,
}

impl Coordinator {
    pub fn new(
        state: SharedEcuState,
        bus: ControlBus,
        sample_rx: mpsc::Receiver<SampleEvent>,
        action_rx: mpsc::UnboundedReceiver<ControlMessage>,
        tick_interval: Duration,
    ) -> Self {
        Self {
            state,
            bus,
            sample_rx,
            action_rx,
            tick_interval,
            workers: Vec::new(),
        }
    }

    /// Track a worker task to be joined at shutdown
    pub fn add_worker(&mut self, handle: JoinHandle<()>) {
        self.workers.push(handle);
    }

    /// Run until the stop flag is set, then drain, close and join
    pub async fn run(mut self, stop: Arc<AtomicBool>) {
        info!("Coordinator loop started");
        let mut ticks: u64 = 0;

        while !stop.load(Ordering::Relaxed) {
            self.drain_samples().await;
            self.drain_actions();

            ticks += 1;
            if ticks % HEARTBEAT_TICKS == 0 {
                info!(ticks, "Still running");
            }
            tokio::time::sleep(self.tick_interval).await;
        }

        // Final best-effort pass so nothing in flight is lost on the way
        // down.
        self.drain_samples().await;
        self.drain_actions();

        let Self {
            sample_rx,
            action_rx,
            workers,
            ..
        } = self;
        drop(sample_rx);
        drop(action_rx);

        info!("Waiting for {} workers to finish", workers.len());
        for handle in workers {
            if let Err(e) = handle.await {
                warn!("Worker task failed: {e}");
            }
        }
        info!("Coordinator loop stopped");
    }

    /// Apply every pending sample event to the shared state
    async fn drain_samples(&mut self) {
        while let Ok(event) = self.sample_rx.try_recv() {
            match event {
                SampleEvent::Data {
                    sensor_id,
                    value,
                    counter,
                    cycle_latency,
                } => {
                    self.state
                        .set_sample(&sensor_id, value, counter, cycle_latency)
                        .await;
                }
                SampleEvent::Error {
                    sensor_id,
                    code,
                    counter,
                } => {
                    warn!(?sensor_id, code, "ECU error message received");
                    self.state.record_error(code).await;
                    self.state.set_counter(counter).await;
                }
                other => {
                    warn!(?other, "Unknown message type from acquisition, discarding");
                }
            }
        }
    }

    /// Rebroadcast every pending button action to all workers
    fn drain_actions(&mut self) {
        while let Ok(action) = self.action_rx.try_recv() {
            debug!(?action, "distributing control action");
            if self.bus.publish(&action) == 0 {
                warn!("No live subscribers for control action");
            }
        }
    }
}
