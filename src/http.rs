//! Blocking JSON transport for the package index.
//!
//! Requests are issued one at a time through a single agent. Non-success
//! statuses are returned to the caller instead of raised, so each call site
//! can word its own fatal error (index vs. search) around the status code.
use anyhow::{Context, Result};
use serde_json::Value;
use std::time::{Duration, Instant};

/// Client identification sent with every outbound request.
pub const USER_AGENT: &str = concat!("nuget-trends/", env!("CARGO_PKG_VERSION"));

/// Search pages with full version lists run to several megabytes.
const MAX_BODY_BYTES: u64 = 64 * 1024 * 1024;

/// Result of a GET that reached the server.
#[derive(Debug, Clone, PartialEq)]
pub enum JsonReply {
    /// 2xx response with a parsed JSON body.
    Body(Value),
    /// Any other status code.
    Status(u16),
}

/// Source of JSON documents addressed by URL.
pub trait JsonSource {
    /// Issue a GET for `url`. Transport and parse failures are errors.
    fn get_json(&self, url: &str) -> Result<JsonReply>;
}

/// `ureq`-backed source used by the CLI.
pub struct UreqSource {
    agent: ureq::Agent,
}

impl UreqSource {
    /// Create an agent with a global per-request timeout.
    pub fn new(timeout: Duration) -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .http_status_as_error(false)
            .build();
        Self {
            agent: config.into(),
        }
    }
}

impl JsonSource for UreqSource {
    fn get_json(&self, url: &str) -> Result<JsonReply> {
        let start = Instant::now();
        let mut response = self
            .agent
            .get(url)
            .header("User-Agent", USER_AGENT)
            .header("Accept", "application/json")
            .call()
            .with_context(|| format!("GET {url}"))?;
        let status = response.status();
        let elapsed_ms = start.elapsed().as_millis();

        tracing::debug!(
            elapsed_ms,
            status = status.as_u16(),
            url,
            "http get complete"
        );

        if !status.is_success() {
            return Ok(JsonReply::Status(status.as_u16()));
        }
        let bytes = response
            .body_mut()
            .with_config()
            .limit(MAX_BODY_BYTES)
            .read_to_vec()
            .with_context(|| format!("read body from {url}"))?;
        let value: Value =
            serde_json::from_slice(&bytes).with_context(|| format!("parse JSON from {url}"))?;
        Ok(JsonReply::Body(value))
    }
}
