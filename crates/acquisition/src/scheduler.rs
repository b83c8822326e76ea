//! Acquisition Scheduler Implementation

use crate::demo::DemoBank;
use control_bus::{ControlInbox, PressKind, WorkerId};
use ecu_stream::{error_code, EcuLink, SampleEvent, Sensor, SensorRegistry};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Configuration for the acquisition scheduler
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Sleep between polling ticks
    pub tick_interval: Duration,
    /// Steps in each half of the demo ramp
    pub demo_steps: u32,
    /// Start in demo mode instead of live acquisition
    pub start_in_demo: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_millis(5),
            demo_steps: 10,
            start_in_demo: true,
        }
    }
}

struct SensorTimer {
    sensor: Sensor,
    last_sample: Instant,
}

/// Per-sensor polling scheduler over an abstract ECU link
///
/// Each registered sensor runs its own elapsed-time timer and is sampled
/// whenever the timer passes the sensor's refresh interval. The
/// fastest-refreshing sensor paces the global sample counter: the counter
/// increments exactly once per pacer firing no matter how many other
/// sensors fire in the same tick. Demo and live acquisition are mutually
/// exclusive per tick and toggled at runtime over the control bus.
pub struct AcquisitionScheduler<L: EcuLink> {
    link: L,
    registry: SensorRegistry,
    config: SchedulerConfig,
    timers: Vec<SensorTimer>,
    pacer_id: String,
    /// `Some` while demo mode is active
    demo: Option<DemoBank>,
    counter: u64,
    /// Wall time of the most recent pacing cycle, in seconds
    cycle_latency: f64,
    inbox: ControlInbox,
    command_rx: mpsc::UnboundedReceiver<Vec<u8>>,
    sample_tx: mpsc::Sender<SampleEvent>,
}

impl<L: EcuLink> AcquisitionScheduler<L> {
    /// Create a scheduler over the given link and sensor registry
    pub fn new(
        link: L,
        registry: SensorRegistry,
        config: SchedulerConfig,
        inbox: ControlInbox,
        command_rx: mpsc::UnboundedReceiver<Vec<u8>>,
        sample_tx: mpsc::Sender<SampleEvent>,
    ) -> Self {
        let now = Instant::now();
        let timers = registry
            .sensors()
            .iter()
            .map(|sensor| SensorTimer {
                sensor: sensor.clone(),
                last_sample: now,
            })
            .collect();

        let pacer_id = registry.pacer_id().to_string();
        if let Some(pacer) = registry.get(&pacer_id) {
            info!(
                "Pacing sensor is {} at {:.1} Hz",
                pacer_id,
                1.0 / pacer.refresh
            );
        }

        let demo = config
            .start_in_demo
            .then(|| DemoBank::generate(&registry, config.demo_steps));

        Self {
            link,
            registry,
            config,
            timers,
            pacer_id,
            demo,
            counter: 0,
            cycle_latency: 0.0,
            inbox,
            command_rx,
            sample_tx,
        }
    }

    /// Run the polling loop until the stop flag is set
    ///
    /// Exits within one tick interval of the flag flipping.
    pub async fn run(mut self, stop: Arc<AtomicBool>) {
        info!("Acquisition loop started");
        while !stop.load(Ordering::Relaxed) {
            self.tick();
            tokio::time::sleep(self.config.tick_interval).await;
        }
        info!(samples = self.counter, "Acquisition loop stopped");
    }

    /// One scheduler tick: control poll, command drain, sensor sweep
    pub fn tick(&mut self) {
        let tick_start = Instant::now();
        self.poll_control();
        self.drain_command();
        self.poll_sensors(tick_start);
    }

    /// Whether demo mode is active
    pub fn is_demo(&self) -> bool {
        self.demo.is_some()
    }

    /// Global sample counter
    pub fn sample_count(&self) -> u64 {
        self.counter
    }

    /// The underlying link, for diagnostics
    pub fn link(&self) -> &L {
        &self.link
    }

    /// Handle at most one inbound control message per tick
    fn poll_control(&mut self) {
        let Some(message) = self.inbox.try_next() else {
            return;
        };
        if !message.is_mine(WorkerId::Acquisition) {
            return;
        }
        debug!(?message, "control message for acquisition");
        if !message.pressed {
            return;
        }

        match message.press {
            PressKind::Short => self.toggle_demo(),
            PressKind::Long => {
                info!("Resetting ECU link");
                if let Err(e) = self.link.reset() {
                    warn!("Link reset failed: {e}");
                    self.send(SampleEvent::Error {
                        sensor_id: None,
                        code: error_code::LINK_RESET,
                        counter: self.counter,
                    });
                }
            }
            PressKind::None => {}
        }
    }

    fn toggle_demo(&mut self) {
        if self.demo.take().is_some() {
            info!("Stopping demo mode, resuming live acquisition");
        } else {
            info!("Starting demo mode");
            self.demo = Some(DemoBank::generate(&self.registry, self.config.demo_steps));
        }
    }

    /// Forward at most one queued command to the ECU per tick
    fn drain_command(&mut self) {
        let Ok(frame) = self.command_rx.try_recv() else {
            return;
        };
        if self.demo.is_some() {
            debug!("Dropping {} byte command while in demo mode", frame.len());
            return;
        }

        match self.link.write(&frame) {
            Ok(Some(bytes)) => self.send(SampleEvent::Reply { bytes }),
            Ok(None) => {}
            Err(e) => {
                warn!("Command write failed: {e}");
                self.send(SampleEvent::Error {
                    sensor_id: None,
                    code: error_code::LINK_WRITE,
                    counter: self.counter,
                });
            }
        }
    }

    /// Sample every sensor whose timer has expired
    fn poll_sensors(&mut self, tick_start: Instant) {
        for i in 0..self.timers.len() {
            let sensor = self.timers[i].sensor.clone();
            let elapsed = self.timers[i].last_sample.elapsed().as_secs_f64();
            if elapsed < sensor.refresh {
                continue;
            }
            debug!(sensor = %sensor.id, elapsed_s = elapsed, "sensor due");

            if sensor.id == self.pacer_id {
                self.counter += 1;
                self.cycle_latency = tick_start.elapsed().as_secs_f64();
            }

            let event = if let Some(demo) = self.demo.as_mut() {
                demo.next_value(&sensor.id).map(|value| SampleEvent::Data {
                    sensor_id: sensor.id.clone(),
                    value,
                    counter: self.counter,
                    cycle_latency: self.cycle_latency,
                })
            } else if self.link.is_connected() {
                match self.link.read(&sensor) {
                    Ok(Some(value)) => Some(SampleEvent::Data {
                        sensor_id: sensor.id.clone(),
                        value,
                        counter: self.counter,
                        cycle_latency: self.cycle_latency,
                    }),
                    Ok(None) => None,
                    Err(e) => {
                        warn!("Read failed for {}: {e}", sensor.id);
                        Some(SampleEvent::Error {
                            sensor_id: Some(sensor.id.clone()),
                            code: error_code::LINK_READ,
                            counter: self.counter,
                        })
                    }
                }
            } else {
                // Live but disconnected: skip this sensor, try again next
                // time its timer expires.
                None
            };

            if let Some(event) = event {
                self.send(event);
            }

            // The timer restarts whether or not a value was produced.
            self.timers[i].last_sample = Instant::now();
        }
    }

    fn send(&self, event: SampleEvent) {
        use tokio::sync::mpsc::error::TrySendError;
        match self.sample_tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => warn!("Sample queue full, dropping event"),
            Err(TrySendError::Closed(_)) => debug!("Sample queue closed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use control_bus::{ControlBus, ControlMessage, Target};
    use ecu_stream::MockLink;

    fn sensor(id: &str, refresh: f64, min: f64, max: f64) -> Sensor {
        Sensor {
            id: id.to_string(),
            label: id.to_uppercase(),
            unit: String::new(),
            refresh,
            min_value: min,
            max_value: max,
        }
    }

    struct Harness {
        scheduler: AcquisitionScheduler<MockLink>,
        bus: ControlBus,
        sample_rx: mpsc::Receiver<SampleEvent>,
        command_tx: mpsc::UnboundedSender<Vec<u8>>,
    }

    fn harness(sensors: Vec<Sensor>, link: MockLink, demo: bool, steps: u32) -> Harness {
        let registry = SensorRegistry::new(sensors).unwrap();
        let mut bus = ControlBus::new();
        let inbox = bus.subscribe(WorkerId::Acquisition);
        let (sample_tx, sample_rx) = mpsc::channel(1024);
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let config = SchedulerConfig {
            tick_interval: Duration::from_millis(5),
            demo_steps: steps,
            start_in_demo: demo,
        };
        let scheduler =
            AcquisitionScheduler::new(link, registry, config, inbox, command_rx, sample_tx);
        Harness {
            scheduler,
            bus,
            sample_rx,
            command_tx,
        }
    }

    fn drain(rx: &mut mpsc::Receiver<SampleEvent>) -> Vec<SampleEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    async fn step(h: &mut Harness, advance: Duration) {
        tokio::time::advance(advance).await;
        h.scheduler.tick();
    }

    #[tokio::test(start_paused = true)]
    async fn test_pacer_counts_exactly_per_second() {
        let mut h = harness(
            vec![
                sensor("a", 0.01, 0.0, 100.0),
                sensor("b", 0.1, 0.0, 100.0),
            ],
            MockLink::disconnected(),
            true,
            4,
        );

        // One simulated second in 5ms ticks.
        for _ in 0..200 {
            step(&mut h, Duration::from_millis(5)).await;
        }

        assert_eq!(h.scheduler.sample_count(), 100);

        let events = drain(&mut h.sample_rx);
        let a_count = events
            .iter()
            .filter(|e| matches!(e, SampleEvent::Data { sensor_id, .. } if sensor_id == "a"))
            .count();
        let b_count = events
            .iter()
            .filter(|e| matches!(e, SampleEvent::Data { sensor_id, .. } if sensor_id == "b"))
            .count();
        assert_eq!(a_count, 100);
        assert_eq!(b_count, 10);

        // B's firings never bump the counter on their own.
        let max_counter = events
            .iter()
            .filter_map(|e| match e {
                SampleEvent::Data { counter, .. } => Some(*counter),
                _ => None,
            })
            .max();
        assert_eq!(max_counter, Some(100));
    }

    #[tokio::test(start_paused = true)]
    async fn test_demo_ramp_first_four_values() {
        let mut h = harness(
            vec![sensor("rpm", 0.05, 0.0, 8000.0)],
            MockLink::disconnected(),
            true,
            4,
        );

        let mut values = Vec::new();
        for _ in 0..4 {
            step(&mut h, Duration::from_millis(50)).await;
            for event in drain(&mut h.sample_rx) {
                if let SampleEvent::Data { value, .. } = event {
                    values.push(value);
                }
            }
        }
        assert_eq!(values, vec![0.0, 2000.0, 4000.0, 6000.0]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_demo_toggle_resets_ramp_cursor() {
        let mut h = harness(
            vec![sensor("rpm", 0.05, 0.0, 8000.0)],
            MockLink::disconnected(),
            true,
            4,
        );

        // Consume the first two ramp values.
        step(&mut h, Duration::from_millis(50)).await;
        step(&mut h, Duration::from_millis(50)).await;
        drain(&mut h.sample_rx);

        // Short press: demo off.
        h.bus
            .publish(&ControlMessage::short_press(Target::Worker(WorkerId::Acquisition), 1));
        h.scheduler.tick();
        assert!(!h.scheduler.is_demo());

        // Disconnected live mode emits nothing.
        step(&mut h, Duration::from_millis(50)).await;
        assert!(drain(&mut h.sample_rx).is_empty());

        // Short press: demo back on, sequences regenerated.
        h.bus
            .publish(&ControlMessage::short_press(Target::Worker(WorkerId::Acquisition), 1));
        h.scheduler.tick();
        assert!(h.scheduler.is_demo());

        step(&mut h, Duration::from_millis(50)).await;
        let events = drain(&mut h.sample_rx);
        assert!(
            matches!(events.as_slice(), [SampleEvent::Data { value, .. }] if *value == 0.0),
            "ramp should restart at index 0, got {events:?}"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_long_press_resets_link() {
        let mut h = harness(
            vec![sensor("rpm", 0.05, 0.0, 8000.0)],
            MockLink::disconnected(),
            true,
            4,
        );

        h.bus
            .publish(&ControlMessage::long_press(Target::Worker(WorkerId::Acquisition), 1));
        h.scheduler.tick();
        assert_eq!(h.scheduler.link().reset_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_message_for_other_worker_is_ignored() {
        let mut h = harness(
            vec![sensor("rpm", 0.05, 0.0, 8000.0)],
            MockLink::disconnected(),
            true,
            4,
        );

        h.bus
            .publish(&ControlMessage::short_press(Target::Worker(WorkerId::Console), 2));
        h.scheduler.tick();
        // Still in demo mode: the message was not ours.
        assert!(h.scheduler.is_demo());
    }

    #[tokio::test(start_paused = true)]
    async fn test_live_reads_from_link() {
        let mut link = MockLink::connected();
        link.push_value("rpm", 850.0);
        link.push_value("rpm", 920.0);
        let mut h = harness(vec![sensor("rpm", 0.05, 0.0, 8000.0)], link, false, 4);

        step(&mut h, Duration::from_millis(50)).await;
        step(&mut h, Duration::from_millis(50)).await;
        // Script exhausted: due again but no value, so nothing is emitted.
        step(&mut h, Duration::from_millis(50)).await;

        let values: Vec<f64> = drain(&mut h.sample_rx)
            .into_iter()
            .filter_map(|e| match e {
                SampleEvent::Data { value, .. } => Some(value),
                _ => None,
            })
            .collect();
        assert_eq!(values, vec![850.0, 920.0]);
        // The pacer kept counting even when no value was available.
        assert_eq!(h.scheduler.sample_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_failure_becomes_error_event() {
        let mut link = MockLink::connected();
        link.fail_reads();
        let mut h = harness(vec![sensor("rpm", 0.05, 0.0, 8000.0)], link, false, 4);

        step(&mut h, Duration::from_millis(50)).await;

        let events = drain(&mut h.sample_rx);
        assert!(matches!(
            events.as_slice(),
            [SampleEvent::Error { sensor_id: Some(id), code, .. }]
                if id == "rpm" && *code == error_code::LINK_READ
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_command_forwarded_with_reply() {
        let mut link = MockLink::connected();
        link.set_reply(vec![0x55, 0xAA]);
        let mut h = harness(vec![sensor("rpm", 1.0, 0.0, 8000.0)], link, false, 4);

        h.command_tx.send(vec![0x81]).unwrap();
        h.scheduler.tick();

        assert_eq!(h.scheduler.link().writes(), &[vec![0x81]]);
        let events = drain(&mut h.sample_rx);
        assert!(matches!(
            events.as_slice(),
            [SampleEvent::Reply { bytes }] if bytes == &[0x55, 0xAA]
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_command_dropped_in_demo_mode() {
        let mut h = harness(
            vec![sensor("rpm", 1.0, 0.0, 8000.0)],
            MockLink::connected(),
            true,
            4,
        );

        h.command_tx.send(vec![0x81]).unwrap();
        h.scheduler.tick();

        assert!(h.scheduler.link().writes().is_empty());
    }
}
