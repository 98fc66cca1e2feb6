use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use time::OffsetDateTime;
use tokio::time::MissedTickBehavior;
use vitals_api::{SensorType, SensorValues};

use crate::configs::Simulator;
use crate::errors::ApiError;
use crate::services::{DeviceMonitor, IngestService};

/// Operator switch shared between the HTTP layer and the simulator task.
#[derive(Clone)]
pub struct SimulatorControl {
    active: Arc<AtomicBool>,
}

impl SimulatorControl {
    pub fn new(active: bool) -> Self {
        Self {
            active: Arc::new(AtomicBool::new(active)),
        }
    }

    pub fn start(&self) {
        self.active.store(true, Ordering::SeqCst);
    }

    pub fn stop(&self) {
        self.active.store(false, Ordering::SeqCst);
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HandOffState {
    Simulating,
    Standby { quiet_ticks: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickDecision {
    Produce,
    Skip,
}

/// Yields to a real device and resumes after `resume_after` quiet ticks.
#[derive(Debug, Clone)]
pub struct HandOff {
    resume_after: u32,
    state: HandOffState,
}

impl HandOff {
    pub fn new(resume_after: u32) -> Self {
        Self {
            resume_after,
            state: HandOffState::Simulating,
        }
    }

    pub fn on_tick(&mut self, device_connected: bool) -> TickDecision {
        if device_connected {
            if self.state == HandOffState::Simulating {
                tracing::info!("real device connected, simulator standing by");
            }
            self.state = HandOffState::Standby { quiet_ticks: 0 };
            return TickDecision::Skip;
        }

        match self.state {
            HandOffState::Simulating => TickDecision::Produce,
            HandOffState::Standby { quiet_ticks } => {
                let quiet_ticks = quiet_ticks + 1;
                if quiet_ticks >= self.resume_after {
                    tracing::info!(quiet_ticks, "real device silent, simulator resuming");
                    self.state = HandOffState::Simulating;
                    TickDecision::Produce
                } else {
                    self.state = HandOffState::Standby { quiet_ticks };
                    TickDecision::Skip
                }
            }
        }
    }

    pub fn is_standing_by(&self) -> bool {
        matches!(self.state, HandOffState::Standby { .. })
    }
}

/// Center and half width of the band a simulated sensor wanders in.
pub fn baseline(sensor_type: SensorType) -> (f64, f64) {
    match sensor_type {
        SensorType::HeartRate => (75.0, 15.0),
        SensorType::BloodPressure => (120.0, 20.0),
        SensorType::OxygenSaturation => (97.0, 2.0),
        SensorType::Temperature => (36.6, 0.6),
        SensorType::Gsr => (400.0, 150.0),
    }
}

const MEAN_REVERSION: f64 = 0.1;
const STEP_FRACTION: f64 = 0.1;

/// Bounded random walk per sensor.
pub struct VitalsGenerator {
    rng: StdRng,
    current: [f64; 5],
    anomaly_probability: f64,
}

impl VitalsGenerator {
    pub fn new(rng: StdRng, anomaly_probability: f64) -> Self {
        Self {
            rng,
            current: SensorType::ALL.map(|sensor_type| baseline(sensor_type).0),
            anomaly_probability: anomaly_probability.clamp(0.0, 1.0),
        }
    }

    pub fn seeded(seed: u64, anomaly_probability: f64) -> Self {
        Self::new(StdRng::seed_from_u64(seed), anomaly_probability)
    }

    pub fn next_values(&mut self) -> SensorValues {
        let mut values = SensorValues::default();

        for (index, sensor_type) in SensorType::ALL.into_iter().enumerate() {
            let (center, spread) = baseline(sensor_type);
            let step = Normal::new(0.0, spread * STEP_FRACTION)
                .map(|normal| normal.sample(&mut self.rng))
                .unwrap_or(0.0);

            let previous = self.current[index];
            let next = previous + MEAN_REVERSION * (center - previous) + step;
            let next = round_tenth(next.clamp(center - spread, center + spread));

            self.current[index] = next;
            values.set(sensor_type, next);
        }

        if self.anomaly_probability > 0.0 && self.rng.random_bool(self.anomaly_probability) {
            let sensor_type = SensorType::ALL[self.rng.random_range(0..SensorType::ALL.len())];
            let spike = anomaly_value(sensor_type);

            tracing::debug!(%sensor_type, spike, "injecting anomaly");
            values.set(sensor_type, spike);
        }

        values
    }
}

/// Out-of-band value for one tick, not fed back into the walk.
fn anomaly_value(sensor_type: SensorType) -> f64 {
    let (center, spread) = baseline(sensor_type);

    match sensor_type {
        SensorType::OxygenSaturation => center - spread * 5.0,
        _ => center + spread * 5.0,
    }
}

fn round_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

pub struct SimulatorService {
    ingest_service: Arc<IngestService>,
    monitor: Arc<DeviceMonitor>,
    control: SimulatorControl,
    settings: Simulator,
}

impl SimulatorService {
    pub fn new(
        ingest_service: Arc<IngestService>,
        monitor: Arc<DeviceMonitor>,
        control: SimulatorControl,
        settings: Simulator,
    ) -> Self {
        Self {
            ingest_service,
            monitor,
            control,
            settings,
        }
    }

    pub fn start(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move { self.run().await })
    }

    async fn run(&self) {
        let mut interval = tokio::time::interval(self.settings.interval());
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut hand_off = HandOff::new(self.settings.resume_after_ticks);
        let mut generator =
            VitalsGenerator::new(StdRng::from_os_rng(), self.settings.anomaly_probability);

        tracing::info!(
            device_id = %self.settings.device_id,
            interval_secs = self.settings.interval_secs,
            "simulator started"
        );

        loop {
            interval.tick().await;

            if !self.control.is_active() {
                continue;
            }

            // The next tick supersedes a failed one
            if let Err(e) = self.tick(&mut hand_off, &mut generator).await {
                tracing::warn!("simulator tick failed: {}", e);
            }
        }
    }

    /// One simulator step. Returns the number of readings written.
    pub async fn tick(
        &self,
        hand_off: &mut HandOff,
        generator: &mut VitalsGenerator,
    ) -> Result<usize, ApiError> {
        let connected = self.monitor.is_connected(OffsetDateTime::now_utc()).await;

        match hand_off.on_tick(connected) {
            TickDecision::Skip => Ok(0),
            TickDecision::Produce => {
                let values = generator.next_values();
                let outcome = self
                    .ingest_service
                    .ingest(&values, Some(&self.settings.device_id), None)
                    .await?;

                Ok(outcome.readings.len())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use tokio::sync::broadcast;

    use crate::configs::Ingest;
    use crate::repositories::ReadingRepository;
    use crate::tests::*;

    use super::*;

    #[test]
    fn test_hand_off_waits_for_quiet_ticks() {
        let mut hand_off = HandOff::new(2);

        assert_eq!(hand_off.on_tick(false), TickDecision::Produce);
        assert_eq!(hand_off.on_tick(true), TickDecision::Skip);
        assert_eq!(hand_off.on_tick(true), TickDecision::Skip);
        assert!(hand_off.is_standing_by());

        assert_eq!(hand_off.on_tick(false), TickDecision::Skip);
        assert_eq!(hand_off.on_tick(false), TickDecision::Produce);
        assert_eq!(hand_off.on_tick(false), TickDecision::Produce);
        assert!(!hand_off.is_standing_by());
    }

    #[test]
    fn test_hand_off_restarts_count_when_device_returns() {
        let mut hand_off = HandOff::new(3);

        assert_eq!(hand_off.on_tick(true), TickDecision::Skip);
        assert_eq!(hand_off.on_tick(false), TickDecision::Skip);
        assert_eq!(hand_off.on_tick(false), TickDecision::Skip);
        assert_eq!(hand_off.on_tick(true), TickDecision::Skip);
        assert_eq!(hand_off.on_tick(false), TickDecision::Skip);
        assert_eq!(hand_off.on_tick(false), TickDecision::Skip);
        assert_eq!(hand_off.on_tick(false), TickDecision::Produce);
    }

    #[test]
    fn test_generated_values_stay_in_band() {
        let mut generator = VitalsGenerator::seeded(7, 0.0);

        for _ in 0..500 {
            let values = generator.next_values();

            for sensor_type in SensorType::ALL {
                let (center, spread) = baseline(sensor_type);
                let value = values.get(sensor_type).unwrap();

                assert!(
                    value >= center - spread && value <= center + spread,
                    "{sensor_type} value {value} left its band"
                );
            }
        }
    }

    #[test]
    fn test_generated_values_move_smoothly() {
        let mut generator = VitalsGenerator::seeded(11, 0.0);
        let mut previous = generator.next_values();

        for _ in 0..200 {
            let values = generator.next_values();
            let (_, spread) = baseline(SensorType::HeartRate);
            let jump = (values.bpm.unwrap() - previous.bpm.unwrap()).abs();

            assert!(jump <= spread, "heart rate jumped by {jump}");
            previous = values;
        }
    }

    #[test]
    fn test_anomaly_injection_leaves_band() {
        let mut generator = VitalsGenerator::seeded(3, 1.0);
        let values = generator.next_values();

        let out_of_band = SensorType::ALL.into_iter().any(|sensor_type| {
            let (center, spread) = baseline(sensor_type);
            let value = values.get(sensor_type).unwrap();
            value < center - spread || value > center + spread
        });

        assert!(out_of_band);
    }

    #[tokio::test]
    async fn test_tick_defers_to_real_device() {
        let storage = setup_test_db().await;
        let repository = Arc::new(ReadingRepository::new(storage));
        let monitor = Arc::new(DeviceMonitor::new("esp32_demo", std::time::Duration::from_secs(30)));
        let (sender, _) = broadcast::channel(16);
        let ingest = Arc::new(IngestService::new(
            repository.clone(),
            monitor.clone(),
            sender,
            Ingest::default(),
        ));

        let service = SimulatorService::new(
            ingest,
            monitor.clone(),
            SimulatorControl::new(true),
            Simulator::default(),
        );
        let mut hand_off = HandOff::new(2);
        let mut generator = VitalsGenerator::seeded(1, 0.0);

        assert_eq!(service.tick(&mut hand_off, &mut generator).await.unwrap(), 5);
        // Simulated readings must not make the simulator yield to itself
        assert!(!monitor.is_connected(OffsetDateTime::now_utc()).await);

        monitor.record("esp32_real", OffsetDateTime::now_utc()).await;
        assert_eq!(service.tick(&mut hand_off, &mut generator).await.unwrap(), 0);
        assert_eq!(service.tick(&mut hand_off, &mut generator).await.unwrap(), 0);

        monitor.reset().await;
        assert_eq!(service.tick(&mut hand_off, &mut generator).await.unwrap(), 0);
        assert_eq!(service.tick(&mut hand_off, &mut generator).await.unwrap(), 5);

        assert_eq!(repository.count().await.unwrap(), 10);
    }

    #[test]
    fn test_control_toggle() {
        let control = SimulatorControl::new(false);
        let shared = control.clone();

        shared.start();
        assert!(control.is_active());
        shared.stop();
        assert!(!control.is_active());
    }
}
