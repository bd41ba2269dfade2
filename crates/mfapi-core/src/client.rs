//! Session lifecycle and metric submission.
//!
//! `MfClient::new_session()` registers the identity with the backend, and
//! every `update()` afterwards is filed under the experiment id the backend
//! returned. The client is owned by the caller; there is no global state.

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, error, info, warn};

use crate::error::{MfError, Result};
use crate::hostname::resolve_hostname;
use crate::models::{
    non_empty, Metric, MetricValue, SessionConfig, DEFAULT_APPLICATION, DEFAULT_JOB_ID,
};
use crate::publisher::Publisher;
use crate::timestamp::{current_timestamp_with, TimestampPrecision};

/// Resource metrics are posted to.
pub const METRICS_RESOURCE: &str = "v1/mf/metrics";

/// Registration document sent when a session is created.
#[derive(Debug, Serialize)]
struct Registration<'a> {
    host: &'a str,
    #[serde(rename = "@timestamp")]
    timestamp: String,
    user: &'a str,
    application: &'a str,
    job_id: &'a str,
}

/// State of an established session.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub server: String,
    pub user: String,
    pub application: String,
    /// Id confirmed by the backend
    pub experiment_id: String,
    pub job_id: String,
    pub hostname: String,
    pub precision: TimestampPrecision,
}

impl Session {
    /// `{server}/v1/mf/metrics/{user}/{experiment_id}?task={application}`
    pub fn metrics_url(&self) -> String {
        format!(
            "{}/{}/{}/{}?task={}",
            self.server.trim_end_matches('/'),
            METRICS_RESOURCE,
            self.user,
            self.experiment_id,
            self.application
        )
    }

    /// Builds the JSON document for `metric`. The metric's name becomes a
    /// key of its own and overrides a fixed field of the same name.
    ///
    /// NaN and infinite floats have no JSON encoding and are rejected.
    pub fn metric_payload(&self, metric: &Metric, timestamp: &str) -> Result<Value> {
        if let MetricValue::Float(v) = metric.value {
            if !v.is_finite() {
                error!(metric = %metric.name, value = v, "non-finite metric value");
                return Err(MfError::InvalidArgument(format!(
                    "metric '{}' has non-finite value {}",
                    metric.name, v
                )));
            }
        }
        let mut doc = Map::new();
        doc.insert("@timestamp".to_string(), Value::from(timestamp));
        doc.insert("host".to_string(), Value::from(self.hostname.as_str()));
        doc.insert("task".to_string(), Value::from(self.application.as_str()));
        doc.insert("type".to_string(), Value::from(metric.metric_type.as_str()));
        doc.insert(metric.name.clone(), serde_json::to_value(&metric.value)?);
        Ok(Value::Object(doc))
    }
}

/// Client for one backend session at a time.
pub struct MfClient {
    publisher: Publisher,
    session: Option<Session>,
}

impl MfClient {
    /// Create a client with its own publisher. No session is active yet.
    pub fn new() -> Result<Self> {
        Ok(Self::with_publisher(Publisher::new()?))
    }

    pub fn with_publisher(publisher: Publisher) -> Self {
        Self {
            publisher,
            session: None,
        }
    }

    pub fn publisher(&self) -> &Publisher {
        &self.publisher
    }

    /// Register `config` with the backend and make it the active session.
    ///
    /// Returns the experiment id assigned by the backend. That id always
    /// replaces a caller-supplied one. On failure the previously active
    /// session, if any, is kept.
    pub fn new_session(&mut self, config: &SessionConfig) -> Result<&str> {
        if config.server.is_empty() {
            error!("parameter 'server' is not set");
            return Err(MfError::InvalidArgument("parameter 'server' is not set".to_string()));
        }
        if config.user.is_empty() {
            error!("parameter 'user' is not set");
            return Err(MfError::InvalidArgument("parameter 'user' is not set".to_string()));
        }

        let user = config.user.to_ascii_lowercase();
        let application = non_empty(config.application.as_deref())
            .map(str::to_ascii_lowercase)
            .unwrap_or_else(|| DEFAULT_APPLICATION.to_string());
        let requested_id = non_empty(config.experiment_id.as_deref());
        let job_id = non_empty(config.job_id.as_deref())
            .unwrap_or(DEFAULT_JOB_ID)
            .to_string();
        let hostname = match non_empty(config.hostname.as_deref()) {
            Some(h) => h.to_string(),
            None => resolve_hostname()?,
        };

        let registration = Registration {
            host: &hostname,
            timestamp: current_timestamp_with(config.precision),
            user: &user,
            application: &application,
            job_id: &job_id,
        };
        let message = serde_json::to_string(&registration)?;

        let response = self
            .publisher
            .create_user(&config.server, &user, requested_id, &message)?;
        let experiment_id = response.trim();
        if experiment_id.is_empty() {
            error!(user = %user, "backend returned no experiment id");
            return Err(MfError::EmptyExperimentId);
        }
        if let Some(requested) = requested_id {
            if requested != experiment_id {
                warn!(
                    requested,
                    assigned = experiment_id,
                    "backend replaced the requested experiment id"
                );
            }
        }

        info!(
            user = %user,
            application = %application,
            experiment_id,
            job_id = %job_id,
            "session created"
        );

        let session = self.session.insert(Session {
            server: config.server.clone(),
            user,
            application,
            experiment_id: experiment_id.to_string(),
            job_id,
            hostname,
            precision: config.precision,
        });
        Ok(&session.experiment_id)
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn server(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.server.as_str())
    }

    pub fn experiment_id(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.experiment_id.as_str())
    }

    pub fn user(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.user.as_str())
    }

    pub fn application(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.application.as_str())
    }

    pub fn job_id(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.job_id.as_str())
    }

    pub fn hostname(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.hostname.as_str())
    }

    /// Submit one metric under the active session.
    ///
    /// A metric without a timestamp is stamped with the current time, and
    /// the stamp is written back into `metric`. Returns the response body.
    pub fn update(&self, metric: &mut Metric) -> Result<String> {
        let Some(session) = self.session.as_ref() else {
            error!("update called without an active session");
            return Err(MfError::NoSession);
        };

        let timestamp = metric
            .timestamp
            .get_or_insert_with(|| current_timestamp_with(session.precision))
            .clone();
        let body = session.metric_payload(metric, &timestamp)?;
        let url = session.metrics_url();
        debug!(url = %url, metric = %metric.name, "submitting metric");

        self.publisher.post_json(&url, &body.to_string())
    }

    /// Drop the active session. Accessors report `None` afterwards.
    pub fn clear(&mut self) {
        if let Some(session) = self.session.take() {
            debug!(experiment_id = %session.experiment_id, "session cleared");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> Session {
        Session {
            server: "http://host:3030".to_string(),
            user: "u".to_string(),
            application: "a".to_string(),
            experiment_id: "e".to_string(),
            job_id: DEFAULT_JOB_ID.to_string(),
            hostname: "node01".to_string(),
            precision: TimestampPrecision::Micros,
        }
    }

    #[test]
    fn test_metrics_url() {
        assert_eq!(session().metrics_url(), "http://host:3030/v1/mf/metrics/u/e?task=a");
    }

    #[test]
    fn test_metric_payload_uses_name_as_key() {
        let metric = Metric::new("foobar", "progress (%)", "20");
        let doc = session()
            .metric_payload(&metric, "2016-03-07T09:04:05.000042")
            .unwrap();
        assert_eq!(
            doc,
            serde_json::json!({
                "@timestamp": "2016-03-07T09:04:05.000042",
                "host": "node01",
                "task": "a",
                "type": "foobar",
                "progress (%)": "20",
            })
        );
    }

    #[test]
    fn test_metric_name_overrides_fixed_field() {
        let metric = Metric::new("foobar", "host", 3);
        let doc = session().metric_payload(&metric, "t").unwrap();
        assert_eq!(doc["host"], serde_json::json!(3));
    }

    #[test]
    fn test_non_finite_metric_value_is_rejected() {
        for v in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let metric = Metric::new("training", "loss", v);
            let err = session().metric_payload(&metric, "t").unwrap_err();
            assert!(matches!(err, MfError::InvalidArgument(_)), "accepted {v}");
        }
        let metric = Metric::new("training", "loss", 0.5);
        assert_eq!(session().metric_payload(&metric, "t").unwrap()["loss"], 0.5);
    }

    #[test]
    fn test_update_without_session_fails() {
        let client = MfClient::new().unwrap();
        let mut metric = Metric::new("foobar", "progress", 1);
        assert!(matches!(client.update(&mut metric), Err(MfError::NoSession)));
        assert!(metric.timestamp.is_none());
    }

    #[test]
    fn test_new_session_validates_before_network() {
        let mut client = MfClient::new().unwrap();
        let err = client
            .new_session(&SessionConfig::new("", "user"))
            .unwrap_err();
        assert!(err.is_validation());
        let err = client
            .new_session(&SessionConfig::new("http://localhost:1", ""))
            .unwrap_err();
        assert!(err.is_validation());
        assert!(client.session().is_none());
    }
}
