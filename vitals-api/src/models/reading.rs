use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::Id;

#[cfg_attr(feature = "docs", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorType {
    /// Heart rate in beats per minute
    HeartRate,
    /// Systolic blood pressure in mmHg
    BloodPressure,
    /// Peripheral oxygen saturation percentage
    OxygenSaturation,
    /// Body temperature in Celsius
    Temperature,
    /// Galvanic skin response in ohms
    Gsr,
}

impl SensorType {
    pub const ALL: [SensorType; 5] = [
        SensorType::HeartRate,
        SensorType::BloodPressure,
        SensorType::OxygenSaturation,
        SensorType::Temperature,
        SensorType::Gsr,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SensorType::HeartRate => "heart_rate",
            SensorType::BloodPressure => "blood_pressure",
            SensorType::OxygenSaturation => "oxygen_saturation",
            SensorType::Temperature => "temperature",
            SensorType::Gsr => "gsr",
        }
    }

    pub fn unit(&self) -> &'static str {
        match self {
            SensorType::HeartRate => "bpm",
            SensorType::BloodPressure => "mmHg",
            SensorType::OxygenSaturation => "%",
            SensorType::Temperature => "°C",
            SensorType::Gsr => "Ω",
        }
    }

    /// Human readable name used in alert titles.
    pub fn label(&self) -> &'static str {
        match self {
            SensorType::HeartRate => "Heart rate",
            SensorType::BloodPressure => "Blood pressure",
            SensorType::OxygenSaturation => "Oxygen saturation",
            SensorType::Temperature => "Temperature",
            SensorType::Gsr => "Skin response",
        }
    }
}

impl fmt::Display for SensorType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownSensorType(pub String);

impl fmt::Display for UnknownSensorType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "unknown sensor type: {}", self.0)
    }
}

impl std::error::Error for UnknownSensorType {}

impl FromStr for SensorType {
    type Err = UnknownSensorType;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        SensorType::ALL
            .into_iter()
            .find(|sensor_type| sensor_type.as_str() == value)
            .ok_or_else(|| UnknownSensorType(value.to_string()))
    }
}

impl TryFrom<String> for SensorType {
    type Error = UnknownSensorType;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[cfg_attr(feature = "docs", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// Reading identifier
    pub id: Id,
    /// Kind of measurement
    pub sensor_type: SensorType,
    /// Measured value
    pub value: f64,
    /// Unit of the value
    pub unit: String,
    /// Measurement time (UTC)
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    /// Source device
    pub device_id: String,
}

/// Most recent reading per sensor type. Sensor types without data are absent.
pub type LatestReadings = BTreeMap<SensorType, Reading>;

/// Sensor fields as sent by the device bridge. Every field is optional.
#[cfg_attr(feature = "docs", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SensorValues {
    /// Heart rate in bpm
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bpm: Option<f64>,
    /// Oxygen saturation in %
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spo2: Option<f64>,
    /// Body temperature in Celsius
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    /// Blood pressure in mmHg
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pressure: Option<f64>,
    /// Galvanic skin response in ohms
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gsr: Option<f64>,
}

impl SensorValues {
    pub fn get(&self, sensor_type: SensorType) -> Option<f64> {
        match sensor_type {
            SensorType::HeartRate => self.bpm,
            SensorType::BloodPressure => self.pressure,
            SensorType::OxygenSaturation => self.spo2,
            SensorType::Temperature => self.temperature,
            SensorType::Gsr => self.gsr,
        }
    }

    pub fn set(&mut self, sensor_type: SensorType, value: f64) {
        let slot = match sensor_type {
            SensorType::HeartRate => &mut self.bpm,
            SensorType::BloodPressure => &mut self.pressure,
            SensorType::OxygenSaturation => &mut self.spo2,
            SensorType::Temperature => &mut self.temperature,
            SensorType::Gsr => &mut self.gsr,
        };
        *slot = Some(value);
    }

    /// Present values that pass [`SensorValues::is_valid`], in sensor order.
    pub fn valid_readings(&self) -> Vec<(SensorType, f64)> {
        SensorType::ALL
            .into_iter()
            .filter_map(|sensor_type| {
                self.get(sensor_type)
                    .filter(|value| Self::is_valid(sensor_type, *value))
                    .map(|value| (sensor_type, value))
            })
            .collect()
    }

    /// Optical sensors report 0 when nothing is attached, so those must be positive.
    pub fn is_valid(sensor_type: SensorType, value: f64) -> bool {
        if !value.is_finite() {
            return false;
        }

        match sensor_type {
            SensorType::HeartRate | SensorType::OxygenSaturation => value > 0.0,
            _ => true,
        }
    }
}

#[cfg_attr(feature = "docs", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Esp32DataRequest {
    #[serde(flatten)]
    pub values: SensorValues,
    /// Source device, defaults to the configured real device
    #[serde(default)]
    pub device_id: Option<String>,
    /// Client clock reading, RFC 3339 or ISO 8601 without offset (assumed UTC)
    #[serde(default)]
    pub timestamp: Option<String>,
}

#[cfg_attr(feature = "docs", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateReadingRequest {
    pub sensor_type: SensorType,
    pub value: f64,
    #[serde(default)]
    pub device_id: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

#[cfg_attr(feature = "docs", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestResponse {
    pub message: String,
    /// Number of readings written
    pub readings_saved: usize,
    /// Timestamp applied to the readings
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

#[cfg_attr(feature = "docs", derive(utoipa::IntoParams))]
#[cfg_attr(feature = "docs", into_params(parameter_in = Query))]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VitalSignsQuery {
    /// Maximum number of readings (default 50, capped at 1000)
    pub limit: Option<i64>,
    /// Look-back window in hours (default 24)
    pub hours: Option<i64>,
}

#[cfg_attr(feature = "docs", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VitalSignsResponse {
    /// Readings, newest first
    pub vital_signs: Vec<Reading>,
    pub count: usize,
    pub period_hours: i64,
}
