//! Data models for mfapi.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::timestamp::TimestampPrecision;

/// Application name used when the caller gives none.
pub const DEFAULT_APPLICATION: &str = "_all";
/// Job id used when the caller gives none.
pub const DEFAULT_JOB_ID: &str = "mf_api";

/// Identity a session is created with.
///
/// Empty strings are treated the same as absent values.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SessionConfig {
    /// Base URL of the backend (e.g. "http://localhost:3030")
    pub server: String,
    /// User the metrics are filed under; lowercased
    pub user: String,
    /// Application/task name; lowercased, defaults to "_all"
    pub application: Option<String>,
    /// Experiment id to reuse; the backend assigns one when absent
    pub experiment_id: Option<String>,
    /// Job id; defaults to "mf_api"
    pub job_id: Option<String>,
    /// Skip hostname resolution and report this host instead
    pub hostname: Option<String>,
    pub precision: TimestampPrecision,
}

impl SessionConfig {
    pub fn new(server: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            server: server.into(),
            user: user.into(),
            ..Default::default()
        }
    }

    pub fn with_application(mut self, application: impl Into<String>) -> Self {
        self.application = Some(application.into());
        self
    }

    pub fn with_experiment_id(mut self, experiment_id: impl Into<String>) -> Self {
        self.experiment_id = Some(experiment_id.into());
        self
    }

    pub fn with_job_id(mut self, job_id: impl Into<String>) -> Self {
        self.job_id = Some(job_id.into());
        self
    }

    pub fn with_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = Some(hostname.into());
        self
    }

    pub fn with_precision(mut self, precision: TimestampPrecision) -> Self {
        self.precision = precision;
        self
    }

    /// Load a config from a YAML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&content)?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, serde_yaml::to_string(self)?)?;
        Ok(())
    }
}

/// Returns `None` for absent or empty values.
pub(crate) fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

/// A single metric value — supports float, int, bool or string.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum MetricValue {
    Float(f64),
    Int(i64),
    Bool(bool),
    Text(String),
}

impl From<f64> for MetricValue {
    fn from(v: f64) -> Self {
        MetricValue::Float(v)
    }
}
impl From<f32> for MetricValue {
    fn from(v: f32) -> Self {
        MetricValue::Float(v as f64)
    }
}
impl From<i64> for MetricValue {
    fn from(v: i64) -> Self {
        MetricValue::Int(v)
    }
}
impl From<i32> for MetricValue {
    fn from(v: i32) -> Self {
        MetricValue::Int(v as i64)
    }
}
impl From<bool> for MetricValue {
    fn from(v: bool) -> Self {
        MetricValue::Bool(v)
    }
}
impl From<String> for MetricValue {
    fn from(v: String) -> Self {
        MetricValue::Text(v)
    }
}
impl From<&str> for MetricValue {
    fn from(v: &str) -> Self {
        MetricValue::Text(v.to_string())
    }
}

/// One observation reported for the active session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Metric {
    /// Wire timestamp; stamped at submission when `None`
    pub timestamp: Option<String>,
    #[serde(rename = "type")]
    pub metric_type: String,
    /// Used as the JSON key of the value, so any string is allowed
    pub name: String,
    pub value: MetricValue,
}

impl Metric {
    pub fn new(
        metric_type: impl Into<String>,
        name: impl Into<String>,
        value: impl Into<MetricValue>,
    ) -> Self {
        Self {
            timestamp: None,
            metric_type: metric_type.into(),
            name: name.into(),
            value: value.into(),
        }
    }

    pub fn with_timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.timestamp = Some(timestamp.into());
        self
    }
}
