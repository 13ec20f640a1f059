//! # pret-cli — PRET Registry Command-Line Interface
//!
//! ## Subcommands
//!
//! - `simulate`: run a scenario of compliance statements through the mock
//!   prover, the submission pipeline, and an in-process ledger
//! - `replay`: rebuild the mirror and aggregate from an event log and check
//!   every root in the chain
//! - `stats`: global compliance counters and percentage from an event log
//! - `root`: the map root an event log commits to
//!
//! Argument parsing lives in `main.rs`; handlers here return an exit code
//! and delegate the work to the library crates.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use pret_client::ClientConfig;
use pret_state::TransitionEvent;

pub mod replay;
pub mod simulate;
pub mod stats;

/// Load client configuration from `path`, or defaults plus environment
/// overrides when no path is given.
pub fn load_config(path: Option<&Path>) -> Result<ClientConfig> {
    match path {
        Some(path) => ClientConfig::load(path)
            .with_context(|| format!("failed to load config: {}", path.display())),
        None => {
            let mut config = ClientConfig::default();
            config
                .apply_env_overrides()
                .context("invalid PRET_* environment override")?;
            Ok(config)
        }
    }
}

/// Read a JSON-lines event log.
pub fn load_events(path: &Path) -> Result<Vec<TransitionEvent>> {
    let events = pret_client::read_events(path)
        .with_context(|| format!("failed to read event log: {}", path.display()))?;
    tracing::debug!(path = %path.display(), events = events.len(), "event log loaded");
    Ok(events)
}

/// RFC 3339 rendering of a Unix timestamp; `None` for 0 or out-of-range.
pub fn format_timestamp(secs: u64) -> Option<String> {
    if secs == 0 {
        return None;
    }
    let secs = i64::try_from(secs).ok()?;
    DateTime::<Utc>::from_timestamp(secs, 0).map(|t| t.to_rfc3339())
}

/// Print `value` as pretty JSON on stdout.
pub fn print_json(value: &impl serde::Serialize) -> Result<()> {
    let text = serde_json::to_string_pretty(value).context("failed to encode output")?;
    println!("{text}");
    Ok(())
}
