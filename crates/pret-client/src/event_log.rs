//! # JSON-Lines Event Log
//!
//! One [`TransitionEvent`] per line, in sequence order. Blank lines are
//! ignored on read. The file format carries no sequencing of its own;
//! chaining is checked by whoever replays it.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use pret_state::TransitionEvent;

use crate::error::EventLogError;

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> EventLogError + '_ {
    move |source| EventLogError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Parse events from any line-oriented reader.
pub fn parse_events(reader: impl BufRead) -> Result<Vec<TransitionEvent>, EventLogError> {
    let mut events = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line.map_err(|source| EventLogError::Io {
            path: "<reader>".into(),
            source,
        })?;
        if line.trim().is_empty() {
            continue;
        }
        let event = serde_json::from_str(&line).map_err(|source| EventLogError::Parse {
            line: index + 1,
            source,
        })?;
        events.push(event);
    }
    Ok(events)
}

/// Read every event from a JSON-lines file.
pub fn read_events(path: &Path) -> Result<Vec<TransitionEvent>, EventLogError> {
    let file = File::open(path).map_err(io_error(path))?;
    parse_events(BufReader::new(file))
}

fn write_to(file: File, path: &Path, events: &[TransitionEvent]) -> Result<(), EventLogError> {
    let mut writer = BufWriter::new(file);
    for event in events {
        let line = serde_json::to_string(event).map_err(|source| EventLogError::Encode {
            sequence: event.sequence,
            source,
        })?;
        writeln!(writer, "{line}").map_err(io_error(path))?;
    }
    writer.flush().map_err(io_error(path))
}

/// Replace `path` with the given events.
pub fn write_events(path: &Path, events: &[TransitionEvent]) -> Result<(), EventLogError> {
    let file = File::create(path).map_err(io_error(path))?;
    write_to(file, path, events)?;
    tracing::debug!(path = %path.display(), events = events.len(), "event log written");
    Ok(())
}

/// Append events to `path`, creating it if needed.
pub fn append_events(path: &Path, events: &[TransitionEvent]) -> Result<(), EventLogError> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(io_error(path))?;
    write_to(file, path, events)
}
