//! Local hostname resolution.
//!
//! The canonical (DNS) name is preferred. If the lookup fails the `hostname`
//! command is asked instead.

use std::process::Command;

use dns_lookup::AddrInfoHints;
use tracing::{debug, warn};

use crate::error::{MfError, Result};

/// `AI_CANONNAME` from `<netdb.h>`; same value on Linux, macOS and Windows.
const AI_CANONNAME: i32 = 0x0002;

/// Resolves the name this process reports as `host`.
pub fn resolve_hostname() -> Result<String> {
    match canonical_hostname() {
        Ok(name) => {
            debug!(hostname = %name, "resolved canonical hostname");
            Ok(name)
        }
        Err(e) => {
            warn!("Canonical hostname lookup failed ({}), asking `hostname`", e);
            command_hostname()
        }
    }
}

fn canonical_hostname() -> Result<String> {
    let local = dns_lookup::get_hostname()?;
    let hints = AddrInfoHints {
        flags: AI_CANONNAME,
        ..AddrInfoHints::default()
    };
    let infos = dns_lookup::getaddrinfo(Some(&local), None, Some(hints))
        .map_err(|e| MfError::HostnameResolution(format!("getaddrinfo({local}): {e:?}")))?;

    infos
        .filter_map(|info| info.ok())
        .filter_map(|info| info.canonname)
        .map(|name| strip_line_ending(&name).to_string())
        .find(|name| !name.is_empty())
        .ok_or_else(|| MfError::HostnameResolution(format!("no canonical name for {local}")))
}

fn command_hostname() -> Result<String> {
    let output = Command::new("hostname")
        .output()
        .map_err(|e| MfError::HostnameResolution(format!("failed to run `hostname`: {e}")))?;
    if !output.status.success() {
        return Err(MfError::HostnameResolution(format!(
            "`hostname` exited with {}",
            output.status
        )));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let name = strip_line_ending(&stdout);
    if name.is_empty() {
        return Err(MfError::HostnameResolution("`hostname` printed nothing".to_string()));
    }
    Ok(name.to_string())
}

fn strip_line_ending(s: &str) -> &str {
    s.trim_end_matches(['\n', '\r'])
}
