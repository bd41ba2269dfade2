//! Example of reporting progress metrics from Rust.
//!
//! Expects a backend on http://localhost:3030 (override with the first
//! argument).

use mfapi_core::{Metric, MfClient, SessionConfig};
use std::thread;
use std::time::Duration;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().with_target(false).compact().init();

    let server = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "http://localhost:3030".to_string());

    // 1. Register the session
    let config = SessionConfig::new(server, "test_user")
        .with_application("myApp")
        .with_job_id("report_progress");
    let mut client = MfClient::new()?;
    let experiment_id = client.new_session(&config)?.to_string();
    println!("Reporting to experiment: {}", experiment_id);

    // 2. Submit metrics, leaving the timestamp to the client
    for i in 0..50 {
        let mut metric = Metric::new("foobar", "progress (%)", (i * 2).to_string());
        let response = client.update(&mut metric)?;
        if response.contains("error") {
            eprintln!("Backend rejected metric: {}", response);
            break;
        }
        thread::sleep(Duration::from_millis(200));
    }

    // 3. Done
    client.clear();
    Ok(())
}
