//! # Replay Subcommand
//!
//! Rebuilds the mirror and the aggregate from an event log, independently,
//! and checks that they agree. A log that does not chain, or whose events
//! do not reproduce their own roots, fails with exit code 1.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use pret_client::MirrorRegistry;
use pret_core::Digest;
use pret_state::{RegistryAggregate, TransitionEvent};
use serde::Serialize;

use crate::{load_events, print_json};

/// Arguments for the `pret replay` subcommand.
#[derive(Args, Debug)]
pub struct ReplayArgs {
    /// Path to the JSON-lines event log.
    #[arg(value_name = "EVENTS_JSONL")]
    pub events: PathBuf,
}

/// Result of a successful replay.
#[derive(Debug, Clone, Serialize)]
pub struct ReplaySummary {
    pub events: usize,
    pub entities: usize,
    pub map_root: Digest,
    pub aggregate: RegistryAggregate,
}

/// Replay `events` into a fresh mirror and aggregate.
pub fn replay_events(events: &[TransitionEvent]) -> Result<ReplaySummary> {
    let aggregate = RegistryAggregate::replay(events)?;
    let mirror = MirrorRegistry::from_events(events)?;
    if mirror.root() != aggregate.map_root {
        anyhow::bail!(
            "mirror root {} disagrees with aggregate root {}",
            mirror.root(),
            aggregate.map_root
        );
    }
    Ok(ReplaySummary {
        events: events.len(),
        entities: mirror.len(),
        map_root: mirror.root(),
        aggregate,
    })
}

/// Execute the replay subcommand.
///
/// Returns exit code: 0 if the log replays cleanly, 1 otherwise.
pub fn run_replay(args: &ReplayArgs) -> Result<u8> {
    let events = load_events(&args.events)?;
    match replay_events(&events) {
        Ok(summary) => {
            tracing::info!(
                events = summary.events,
                root = %summary.map_root,
                "event log replayed"
            );
            print_json(&summary)?;
            Ok(0)
        }
        Err(e) => {
            tracing::error!("replay failed: {e:#}");
            Ok(1)
        }
    }
}
