use std::env;
use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use vitals_api::SensorType;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Server {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Logger {
    pub level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Database {
    pub url: String,
    #[serde(default)]
    pub clean_start: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Ingest {
    /// Device id applied when a payload carries none
    pub default_device_id: String,
    /// Devices whose own timestamps are accepted
    pub trusted_devices: Vec<String>,
    /// A real device counts as connected for this long after its last reading
    pub recency_window_secs: u64,
}

impl Ingest {
    pub fn recency_window(&self) -> Duration {
        Duration::from_secs(self.recency_window_secs)
    }

    pub fn is_trusted(&self, device_id: &str) -> bool {
        self.trusted_devices.iter().any(|trusted| trusted == device_id)
    }
}

impl Default for Ingest {
    fn default() -> Self {
        Self {
            default_device_id: String::from("esp32_real"),
            trusted_devices: vec![String::from("esp32_real")],
            recency_window_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Simulator {
    pub enabled: bool,
    /// Device id stamped on simulated readings
    pub device_id: String,
    pub interval_secs: u64,
    /// Quiet ticks required before simulation resumes after a real device
    pub resume_after_ticks: u32,
    /// Chance per tick of an out-of-band spike on one sensor
    pub anomaly_probability: f64,
}

impl Simulator {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.max(1))
    }
}

impl Default for Simulator {
    fn default() -> Self {
        Self {
            enabled: true,
            device_id: String::from("esp32_demo"),
            interval_secs: 3,
            resume_after_ticks: 2,
            anomaly_probability: 0.0,
        }
    }
}

/// Inclusive bands for one sensor. Each band is `(min, max)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensorThreshold {
    #[serde(default)]
    pub normal: Option<(f64, f64)>,
    pub soft: (f64, f64),
    pub hard: (f64, f64),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    pub heart_rate: SensorThreshold,
    pub blood_pressure: SensorThreshold,
    pub oxygen_saturation: SensorThreshold,
    pub temperature: SensorThreshold,
    pub gsr: SensorThreshold,
}

impl Thresholds {
    pub fn get(&self, sensor_type: SensorType) -> &SensorThreshold {
        match sensor_type {
            SensorType::HeartRate => &self.heart_rate,
            SensorType::BloodPressure => &self.blood_pressure,
            SensorType::OxygenSaturation => &self.oxygen_saturation,
            SensorType::Temperature => &self.temperature,
            SensorType::Gsr => &self.gsr,
        }
    }
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            heart_rate: SensorThreshold {
                normal: Some((60.0, 100.0)),
                soft: (50.0, 120.0),
                hard: (40.0, 150.0),
            },
            blood_pressure: SensorThreshold {
                normal: Some((90.0, 140.0)),
                soft: (80.0, 160.0),
                hard: (70.0, 180.0),
            },
            oxygen_saturation: SensorThreshold {
                normal: Some((95.0, 100.0)),
                soft: (90.0, 100.0),
                hard: (85.0, 100.0),
            },
            temperature: SensorThreshold {
                normal: Some((36.0, 37.5)),
                soft: (35.0, 38.5),
                hard: (34.0, 40.0),
            },
            gsr: SensorThreshold {
                normal: Some((200.0, 800.0)),
                soft: (100.0, 1000.0),
                hard: (50.0, 1500.0),
            },
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Alerting {
    pub thresholds: Thresholds,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Analysis {
    pub enabled: bool,
    /// Base URL of a `generateContent` compatible API
    pub endpoint: String,
    pub api_key: Option<String>,
    pub model: String,
    pub timeout_secs: u64,
}

impl Analysis {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

impl Default for Analysis {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: String::from("https://generativelanguage.googleapis.com/v1beta"),
            api_key: None,
            model: String::from("gemini-1.5-flash"),
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub server: Server,
    pub logger: Logger,
    pub database: Database,
    #[serde(default)]
    pub ingest: Ingest,
    #[serde(default)]
    pub simulator: Simulator,
    #[serde(default)]
    pub alerting: Alerting,
    #[serde(default)]
    pub analysis: Analysis,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or("development".into());

        let mut settings: Settings = Config::builder()
            .add_source(File::with_name("configs/default"))
            .add_source(File::with_name(&format!("configs/{run_mode}")).required(false))
            .add_source(Environment::with_prefix("VITALS").separator("__"))
            .build()?
            .try_deserialize()?;

        if settings.analysis.api_key.is_none() {
            settings.analysis.api_key = env::var("GEMINI_API_KEY").ok();
        }

        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use config::FileFormat;

    use super::*;

    #[test]
    fn test_default_toml_deserializes() {
        let settings: Settings = Config::builder()
            .add_source(File::from_str(
                include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/../configs/default.toml")),
                FileFormat::Toml,
            ))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(settings.server.port, 8001);
        assert_eq!(settings.simulator.resume_after_ticks, 2);
        assert_eq!(settings.ingest.recency_window(), Duration::from_secs(30));
        assert_eq!(settings.alerting.thresholds, Thresholds::default());
        assert_eq!(
            settings.alerting.thresholds.get(SensorType::HeartRate).hard,
            (40.0, 150.0)
        );
    }

    #[test]
    fn test_sections_fall_back_to_defaults() {
        let settings: Settings = Config::builder()
            .add_source(File::from_str(
                r#"
                [server]
                host = "127.0.0.1"
                port = 3000

                [logger]
                level = "debug"

                [database]
                url = "sqlite::memory:"
                "#,
                FileFormat::Toml,
            ))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert!(!settings.database.clean_start);
        assert!(settings.simulator.enabled);
        assert!(!settings.analysis.enabled);
        assert!(settings.ingest.is_trusted("esp32_real"));
        assert!(!settings.ingest.is_trusted("esp32_demo"));
    }
}
