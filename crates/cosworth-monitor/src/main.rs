//! Cosworth Datastream Monitor - Main Entry Point

use acquisition::{AcquisitionScheduler, SchedulerConfig};
use control_bus::{ControlBus, WorkerId};
use cosworth_monitor::config::MonitorConfig;
use cosworth_monitor::coordinator::Coordinator;
use cosworth_monitor::worker::{run_worker, ConsoleWorker};
use cosworth_monitor::{buttons, init_logging};
use ecu_state::SharedEcuState;
use ecu_stream::SerialLink;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();

    info!("=== Cosworth Datastream Monitor v{} ===", env!("CARGO_PKG_VERSION"));

    // Configuration problems are fatal before any worker starts.
    let config = MonitorConfig::load()?;
    let registry = config.registry()?;
    info!(
        sensors = registry.len(),
        pacer = registry.pacer_id(),
        "Sensor registry loaded"
    );

    let stop = Arc::new(AtomicBool::new(false));
    {
        let stop = stop.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Shutdown requested");
                stop.store(true, Ordering::Relaxed);
            }
        });
    }

    let mut link = SerialLink::new(&config.serial.device, config.serial.baud);
    if let Err(e) = link.open() {
        // Runs disconnected (or in demo mode) until a long-press reset.
        warn!("Unable to initialise serial port: {e}");
    }

    let mut bus = ControlBus::new();
    let acquisition_inbox = bus.subscribe(WorkerId::Acquisition);
    let console_inbox = config
        .workers
        .console
        .then(|| bus.subscribe(WorkerId::Console));

    let (sample_tx, sample_rx) = mpsc::channel(config.sample_queue_depth);
    let (command_tx, command_rx) = mpsc::unbounded_channel();
    let (action_tx, action_rx) = mpsc::unbounded_channel();

    let state = SharedEcuState::new(&registry, config.max_errors, config.lcd.clone());

    let scheduler = AcquisitionScheduler::new(
        link,
        registry.clone(),
        SchedulerConfig {
            tick_interval: config.acquisition_tick(),
            demo_steps: config.demo_steps,
            start_in_demo: config.demo,
        },
        acquisition_inbox,
        command_rx,
        sample_tx,
    );

    let mut coordinator = Coordinator::new(
        state.clone(),
        bus,
        sample_rx,
        action_rx,
        config.coordinator_tick(),
    );

    coordinator.add_worker(tokio::spawn(scheduler.run(stop.clone())));

    if let Some(inbox) = console_inbox {
        let console = ConsoleWorker::new(&registry);
        coordinator.add_worker(tokio::spawn(run_worker(
            console,
            state.clone(),
            inbox,
            config.display_tick(),
            stop.clone(),
        )));
    }

    if config.workers.buttons {
        coordinator.add_worker(tokio::spawn(buttons::run_buttons(
            action_tx.clone(),
            command_tx.clone(),
            stop.clone(),
        )));
    }
    drop(action_tx);
    drop(command_tx);

    coordinator.run(stop).await;
    info!("Monitor stopped");
    Ok(())
}
