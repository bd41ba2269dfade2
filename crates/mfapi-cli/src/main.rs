//! mf CLI: report experiment metrics to a monitoring backend.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use comfy_table::{presets::UTF8_FULL, Table};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use mfapi::publisher::Publisher;
use mfapi::timestamp::current_timestamp_with;
use mfapi::{Metric, MfClient, SessionConfig, TimestampPrecision};

#[derive(Parser)]
#[command(
    name = "mf",
    about = "mf: report experiment metrics to a monitoring backend",
    version,
    author
)]
struct Cli {
    /// Log debug output
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create (or look up) a session and print its experiment id
    New {
        #[command(flatten)]
        session: SessionArgs,
    },
    /// Submit a metric under a session
    Update {
        #[command(flatten)]
        session: SessionArgs,
        /// Metric type
        #[arg(long = "type")]
        metric_type: String,
        /// Metric name (used as the JSON key)
        #[arg(long)]
        name: String,
        /// Metric value
        #[arg(long)]
        value: String,
        /// Number of times to submit the metric
        #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u64).range(1..))]
        count: u64,
        /// Delay between submissions in milliseconds
        #[arg(long, default_value_t = 1000)]
        interval_ms: u64,
    },
    /// Check whether a server is reachable
    Probe {
        /// Server URL
        url: String,
    },
    /// Register a workflow (PUT /v1/mf/users/<workflow>)
    RegisterWorkflow {
        #[arg(long)]
        server: String,
        #[arg(long)]
        workflow: String,
        /// JSON file with the workflow description
        #[arg(long)]
        body: PathBuf,
    },
    /// Create an experiment record for a workflow
    CreateExperiment {
        #[arg(long)]
        server: String,
        #[arg(long)]
        workflow: String,
        /// JSON file with the experiment description
        #[arg(long)]
        body: PathBuf,
    },
    /// Print the current timestamp in wire format
    Timestamp {
        /// Millisecond instead of microsecond precision
        #[arg(long)]
        millis: bool,
    },
}

#[derive(Args)]
struct SessionArgs {
    /// YAML file with session settings; flags override its values
    #[arg(long)]
    config: Option<PathBuf>,
    /// Backend URL (e.g. http://localhost:3030)
    #[arg(long)]
    server: Option<String>,
    #[arg(long)]
    user: Option<String>,
    #[arg(long)]
    application: Option<String>,
    /// Reuse an existing experiment
    #[arg(long)]
    experiment_id: Option<String>,
    #[arg(long)]
    job_id: Option<String>,
    /// Report this host instead of resolving it
    #[arg(long)]
    hostname: Option<String>,
    /// Millisecond timestamps
    #[arg(long)]
    millis: bool,
}

impl SessionArgs {
    fn into_config(self) -> Result<SessionConfig> {
        let mut config = match &self.config {
            Some(path) => SessionConfig::load(path)
                .with_context(|| format!("Failed to load config {}", path.display()))?,
            None => SessionConfig::default(),
        };
        if let Some(server) = self.server {
            config.server = server;
        }
        if let Some(user) = self.user {
            config.user = user;
        }
        if self.application.is_some() {
            config.application = self.application;
        }
        if self.experiment_id.is_some() {
            config.experiment_id = self.experiment_id;
        }
        if self.job_id.is_some() {
            config.job_id = self.job_id;
        }
        if self.hostname.is_some() {
            config.hostname = self.hostname;
        }
        if self.millis {
            config.precision = TimestampPrecision::Millis;
        }
        Ok(config)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    match cli.command {
        Commands::New { session } => {
            cmd_new(session)?;
        }
        Commands::Update {
            session,
            metric_type,
            name,
            value,
            count,
            interval_ms,
        } => {
            cmd_update(session, metric_type, name, value, count, interval_ms)?;
        }
        Commands::Probe { url } => {
            cmd_probe(url)?;
        }
        Commands::RegisterWorkflow {
            server,
            workflow,
            body,
        } => {
            let message = read_body(&body)?;
            let response = Publisher::new()?.register_workflow(&server, &workflow, &message)?;
            println!("{}", response);
        }
        Commands::CreateExperiment {
            server,
            workflow,
            body,
        } => {
            let message = read_body(&body)?;
            let response = Publisher::new()?.create_experiment(&server, &workflow, &message)?;
            println!("{}", response);
        }
        Commands::Timestamp { millis } => {
            let precision = if millis {
                TimestampPrecision::Millis
            } else {
                TimestampPrecision::Micros
            };
            println!("{}", current_timestamp_with(precision));
        }
    }

    Ok(())
}

// ─── Command implementations ──────────────────────────────────────────────────

fn cmd_new(session: SessionArgs) -> Result<()> {
    let config = session.into_config()?;
    let mut client = MfClient::new()?;
    let experiment_id = client.new_session(&config)?;
    info!(experiment_id, "session ready");

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(["Field", "Value"]);
    if let Some(s) = client.session() {
        table.add_row(["server", s.server.as_str()]);
        table.add_row(["user", s.user.as_str()]);
        table.add_row(["application", s.application.as_str()]);
        table.add_row(["experiment_id", s.experiment_id.as_str()]);
        table.add_row(["job_id", s.job_id.as_str()]);
        table.add_row(["host", s.hostname.as_str()]);
    }
    println!("{}", table);
    Ok(())
}

fn cmd_update(
    session: SessionArgs,
    metric_type: String,
    name: String,
    value: String,
    count: u64,
    interval_ms: u64,
) -> Result<()> {
    let config = session.into_config()?;
    let mut client = MfClient::new()?;
    let experiment_id = client.new_session(&config)?;
    info!(experiment_id, count, "submitting metric {}", name);

    let bar = if count > 1 {
        let bar = ProgressBar::new(count);
        bar.set_style(
            ProgressStyle::with_template("{bar:40} {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        Some(bar)
    } else {
        None
    };

    let mut last = String::new();
    for i in 0..count {
        let mut metric = Metric::new(metric_type.as_str(), name.as_str(), value.as_str());
        last = client.update(&mut metric)?;
        debug!(n = i + 1, timestamp = ?metric.timestamp, "metric submitted");
        if let Some(bar) = &bar {
            bar.inc(1);
        }
        if i + 1 < count {
            std::thread::sleep(Duration::from_millis(interval_ms));
        }
    }
    if let Some(bar) = bar {
        bar.finish_and_clear();
    }

    println!("{}", last);
    Ok(())
}

fn cmd_probe(url: String) -> Result<()> {
    debug!(url = %url, "checking server");
    if Publisher::new()?.head(&url) {
        println!("{} is reachable", url);
        Ok(())
    } else {
        anyhow::bail!("{} is not reachable", url);
    }
}

// ─── Utilities ────────────────────────────────────────────────────────────────

fn read_body(path: &Path) -> Result<String> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    // Reject malformed JSON before anything is sent.
    serde_json::from_str::<serde_json::Value>(&content)
        .with_context(|| format!("{} is not valid JSON", path.display()))?;
    Ok(content)
}
