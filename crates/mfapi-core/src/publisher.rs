//! HTTP transport: posts JSON documents to the monitoring backend.
//!
//! `Publisher` exposes a blocking API. Internally it owns a dedicated tokio
//! runtime and a `reqwest::Client` that is built on first use and reused for
//! every request. Per-request settings live on the request builder, so they
//! never carry over into the next call.

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::Method;
use tokio::runtime::Runtime;
use tracing::{debug, error};

use crate::error::{MfError, Result};

/// Resource under which users/sessions and workflows live.
pub const USERS_RESOURCE: &str = "v1/mf/users";
/// Resource for experiment records.
pub const EXPERIMENTS_RESOURCE: &str = "v1/dreamcloud/mf/experiments";

fn join(server: &str, path: &str) -> String {
    format!("{}/{}", server.trim_end_matches('/'), path)
}

/// `{server}/v1/mf/users/{resource}`
pub fn users_url(server: &str, resource: &str) -> String {
    join(server, &format!("{USERS_RESOURCE}/{resource}"))
}

/// `{server}/v1/mf/users/{user}[/{experiment_id}]/create`
pub fn create_user_url(server: &str, user: &str, experiment_id: Option<&str>) -> String {
    match experiment_id.filter(|id| !id.is_empty()) {
        Some(id) => users_url(server, &format!("{user}/{id}/create")),
        None => users_url(server, &format!("{user}/create")),
    }
}

/// `{server}/v1/dreamcloud/mf/experiments/{workflow}`
pub fn experiment_url(server: &str, workflow: &str) -> String {
    join(server, &format!("{EXPERIMENTS_RESOURCE}/{workflow}"))
}

fn check_url(url: &str) -> Result<()> {
    if url.is_empty() {
        error!("publish: URL not set.");
        return Err(MfError::InvalidArgument("URL not set".to_string()));
    }
    Ok(())
}

fn check_message(message: &str) -> Result<()> {
    if message.is_empty() {
        error!("publish: message not set.");
        return Err(MfError::InvalidArgument("message not set".to_string()));
    }
    Ok(())
}

/// Blocking JSON publisher.
///
/// Must not be used from inside another tokio runtime: every call blocks on
/// the publisher's own runtime. Share it across threads behind an `Arc`.
pub struct Publisher {
    client: OnceLock<reqwest::Client>,
    timeout: Option<Duration>,
    /// Keep the runtime alive as long as the publisher exists.
    runtime: Arc<Runtime>,
}

impl Publisher {
    pub fn new() -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("mfapi-io")
            .enable_all()
            .build()
            .map_err(|e| MfError::Runtime(e.to_string()))?;

        Ok(Self {
            client: OnceLock::new(),
            timeout: None,
            runtime: Arc::new(runtime),
        })
    }

    /// Limit each request to `timeout`. Without it requests wait indefinitely.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    fn client(&self) -> Result<&reqwest::Client> {
        if let Some(client) = self.client.get() {
            return Ok(client);
        }
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build()?;
        Ok(self.client.get_or_init(|| client))
    }

    /// POST `message` to `url`; returns the response body.
    pub fn post_json(&self, url: &str, message: &str) -> Result<String> {
        check_url(url)?;
        check_message(message)?;
        self.execute(Method::POST, url, Some(message), "publish")
    }

    /// PUT `message` to `{url}/v1/mf/users/{workflow}`.
    pub fn register_workflow(&self, url: &str, workflow: &str, message: &str) -> Result<String> {
        check_url(url)?;
        if workflow.is_empty() {
            error!("register_workflow: workflow not set.");
            return Err(MfError::InvalidArgument("workflow not set".to_string()));
        }
        check_message(message)?;
        let target = users_url(url, workflow);
        self.execute(Method::PUT, &target, Some(message), "register_workflow")
    }

    /// GET `url`; returns the response body.
    pub fn get(&self, url: &str) -> Result<String> {
        check_url(url)?;
        self.execute(Method::GET, url, None, "query")
    }

    /// Connectivity check. True if the server could be reached at all,
    /// whatever status it answered with.
    pub fn head(&self, url: &str) -> bool {
        if check_url(url).is_err() {
            return false;
        }
        let client = match self.client() {
            Ok(c) => c,
            Err(e) => {
                error!("head: {}", e);
                return false;
            }
        };
        match self.runtime.block_on(client.head(url).send()) {
            Ok(resp) => {
                debug!(url, status = resp.status().as_u16(), "head");
                true
            }
            Err(e) => {
                error!("head({}): {}", url, e);
                false
            }
        }
    }

    /// Create a session for `username`, or fetch the existing one when
    /// `experiment_id` is given. Returns the backend's experiment id body.
    ///
    /// An empty `message` is replaced by `{"user": username}`.
    pub fn create_user(
        &self,
        server: &str,
        username: &str,
        experiment_id: Option<&str>,
        message: &str,
    ) -> Result<String> {
        check_url(server)?;
        if username.is_empty() {
            error!("create_user: user not set.");
            return Err(MfError::InvalidArgument("user not set".to_string()));
        }
        let url = create_user_url(server, username, experiment_id);
        if message.is_empty() {
            let body = serde_json::json!({ "user": username }).to_string();
            self.post_json(&url, &body)
        } else {
            self.post_json(&url, message)
        }
    }

    /// POST an experiment record for `workflow`.
    pub fn create_experiment(&self, server: &str, workflow: &str, message: &str) -> Result<String> {
        check_url(server)?;
        if workflow.is_empty() {
            error!("create_experiment: workflow not set.");
            return Err(MfError::InvalidArgument("workflow not set".to_string()));
        }
        let url = experiment_url(server, workflow);
        debug!(url = %url, "create experiment");
        self.post_json(&url, message)
    }

    fn execute(&self, method: Method, url: &str, body: Option<&str>, op: &str) -> Result<String> {
        let client = self.client()?;
        let mut request = client
            .request(method, url)
            .header(ACCEPT, "application/json")
            .header(CONTENT_TYPE, "application/json")
            .header("charsets", "utf-8");
        if let Some(body) = body {
            request = request.body(body.to_owned());
        }

        let result = self.runtime.block_on(async move {
            let resp = request.send().await?;
            let status = resp.status();
            let text = resp.text().await?;
            Ok::<_, reqwest::Error>((status, text))
        });

        match result {
            Ok((status, text)) if status.is_success() => {
                debug!(url, response = %text, "{} succeeded", op);
                Ok(text)
            }
            Ok((status, text)) => {
                error!("{}({}): server returned {}", op, url, status);
                Err(MfError::Status {
                    status: status.as_u16(),
                    body: text,
                })
            }
            Err(e) => {
                error!("{}({}): {}", op, url, e);
                Err(MfError::Transport(e))
            }
        }
    }
}
