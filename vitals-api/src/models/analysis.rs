use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::{AlertLevel, Id};

/// Overall assessment. Variants are ordered from least to most severe.
#[cfg_attr(feature = "docs", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    NoData,
    Normal,
    Attention,
    Critical,
}

impl HealthStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            HealthStatus::NoData => "no_data",
            HealthStatus::Normal => "normal",
            HealthStatus::Attention => "attention",
            HealthStatus::Critical => "critical",
        }
    }

    /// Status implied by the most severe alert of a rule pass.
    pub fn from_alert_level(level: Option<AlertLevel>) -> Self {
        match level {
            Some(AlertLevel::Critical) => HealthStatus::Critical,
            Some(AlertLevel::Warning) => HealthStatus::Attention,
            Some(AlertLevel::Info) | None => HealthStatus::Normal,
        }
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HealthStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "no_data" => Ok(HealthStatus::NoData),
            "normal" => Ok(HealthStatus::Normal),
            "attention" => Ok(HealthStatus::Attention),
            "critical" => Ok(HealthStatus::Critical),
            other => Err(format!("unknown health status: {other}")),
        }
    }
}

#[cfg_attr(feature = "docs", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisSource {
    /// Threshold rules only
    Rules,
    /// Threshold rules combined with the external model
    Model,
}

impl AnalysisSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisSource::Rules => "rules",
            AnalysisSource::Model => "model",
        }
    }
}

impl From<String> for AnalysisSource {
    fn from(value: String) -> Self {
        match value.as_str() {
            "model" => AnalysisSource::Model,
            _ => AnalysisSource::Rules,
        }
    }
}

#[cfg_attr(feature = "docs", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Analysis {
    /// Analysis identifier
    pub id: Id,
    pub health_status: HealthStatus,
    /// Narrative summary
    pub summary: String,
    pub source: AnalysisSource,
    /// Number of alerts written by this analysis
    pub alerts_generated: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

#[cfg_attr(feature = "docs", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunAnalysisResponse {
    pub message: String,
    /// Stored analysis, absent when there was no data
    pub analysis_id: Option<Id>,
    pub health_status: HealthStatus,
    pub alerts_generated: usize,
}
