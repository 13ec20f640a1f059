//! # pret-client — Registry Client
//!
//! Everything a submitter runs outside the executor:
//!
//! - **Mirror** (`mirror.rs`): plaintext replica of the map, witness
//!   construction, previous-record disclosure, rebuild and snapshot bootstrap.
//! - **Ledger** (`ledger.rs`): the `Ledger` trait over the executor, with an
//!   in-process implementation.
//! - **Pipeline** (`pipeline.rs`): prove, sync, submit, and retry stale-view
//!   rejections with bounded exponential backoff.
//! - **Event log** (`event_log.rs`): JSON-lines persistence of confirmed events.
//! - **Config** (`config.rs`): YAML client configuration with env overrides.
//! - **Report** (`report.rs`): caller-side derived figures such as the
//!   compliance percentage.

pub mod config;
pub mod error;
pub mod event_log;
pub mod ledger;
pub mod mirror;
pub mod pipeline;
pub mod report;

pub use config::{ClientConfig, RetryPolicy, ENV_EVENT_LOG, ENV_MAX_ATTEMPTS};
pub use error::{ConfigError, EventLogError, MirrorError, PipelineError};
pub use event_log::{append_events, parse_events, read_events, write_events};
pub use ledger::{InMemoryLedger, Ledger};
pub use mirror::{MirrorRegistry, MirrorSnapshot};
pub use pipeline::SubmissionPipeline;
pub use report::{compliance_percentage, ComplianceReport};
