//! # Simulate Subcommand
//!
//! Runs a scenario file through the full client path against an
//! in-process ledger and reports the resulting registry state.
//!
//! ```yaml
//! submissions:
//!   - lei: 5493001KJTIIGC8Y1R12
//!     legal_name: ACME Corp
//!     jurisdiction: US-DE
//!     is_compliant: true
//!     compliance_score: 92
//!     verified_at: 2024-01-15T09:30:00Z
//!   - lei: 5493001KJTIIGC8Y1R12
//!     legal_name: ACME Corp
//!     jurisdiction: US-DE
//!     is_compliant: false
//!     compliance_score: 41
//!     verified_at: 2024-02-15T09:30:00Z
//!     expect: accepted
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use clap::Args;
use pret_client::{
    write_events, ClientConfig, ComplianceReport, InMemoryLedger, Ledger, PipelineError,
    SubmissionPipeline,
};
use pret_core::Digest;
use pret_zkp::{ComplianceStatement, MockProofSystem};
use serde::{Deserialize, Serialize};

use crate::{format_timestamp, print_json};

/// Arguments for the `pret simulate` subcommand.
#[derive(Args, Debug)]
pub struct SimulateArgs {
    /// Path to the scenario YAML file.
    #[arg(value_name = "SCENARIO_YAML")]
    pub scenario: PathBuf,

    /// Write the accepted-event log here (overrides `event_log_path`).
    #[arg(long, value_name = "EVENTS_JSONL")]
    pub events: Option<PathBuf>,
}

/// Whether a scenario step should be confirmed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expectation {
    #[default]
    Accepted,
    Rejected,
}

/// One compliance check in a scenario.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioStep {
    pub lei: String,
    pub legal_name: String,
    pub jurisdiction: String,
    pub is_compliant: bool,
    pub compliance_score: u8,
    pub verified_at: DateTime<Utc>,
    #[serde(default)]
    pub expect: Expectation,
}

impl ScenarioStep {
    fn statement(&self) -> Result<ComplianceStatement> {
        let verification_timestamp = u64::try_from(self.verified_at.timestamp())
            .with_context(|| format!("verified_at {} is before 1970", self.verified_at))?;
        Ok(ComplianceStatement {
            lei: self.lei.clone(),
            legal_name: self.legal_name.clone(),
            jurisdiction: self.jurisdiction.clone(),
            is_compliant: self.is_compliant,
            compliance_score: self.compliance_score,
            verification_timestamp,
        })
    }
}

/// A scenario file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    pub submissions: Vec<ScenarioStep>,
}

impl Scenario {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read scenario: {}", path.display()))?;
        serde_yaml::from_str(&text)
            .with_context(|| format!("failed to parse scenario YAML: {}", path.display()))
    }
}

/// Outcome of one scenario step.
#[derive(Debug, Clone, Serialize)]
pub struct StepResult {
    pub step: usize,
    pub accepted: bool,
    pub expected: Expectation,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sequence: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StepResult {
    fn matches_expectation(&self) -> bool {
        self.accepted == (self.expected == Expectation::Accepted)
    }
}

/// Summary printed after a simulation.
#[derive(Debug, Clone, Serialize)]
pub struct SimulationSummary {
    pub steps: Vec<StepResult>,
    pub map_root: Digest,
    pub report: ComplianceReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_verification_at: Option<String>,
}

/// Run every step of `scenario` and return the summary with the ledger.
pub async fn simulate(
    scenario: &Scenario,
    config: &ClientConfig,
) -> Result<(SimulationSummary, Arc<InMemoryLedger<MockProofSystem>>)> {
    let system = MockProofSystem::new(&config.mock_verifier_key);
    let ledger = Arc::new(InMemoryLedger::new(system.clone()));
    let mut pipeline =
        SubmissionPipeline::new(Arc::new(system), Arc::clone(&ledger), config.retry.clone());

    let mut steps = Vec::with_capacity(scenario.submissions.len());
    for (index, step) in scenario.submissions.iter().enumerate() {
        let statement = step
            .statement()
            .with_context(|| format!("scenario step {}", index + 1))?;
        let result = match pipeline.submit(&statement).await {
            Ok(event) => StepResult {
                step: index + 1,
                accepted: true,
                expected: step.expect,
                sequence: Some(event.sequence),
                error: None,
            },
            Err(err @ (PipelineError::Rejected(_) | PipelineError::InvalidStatement(_))) => {
                StepResult {
                    step: index + 1,
                    accepted: false,
                    expected: step.expect,
                    sequence: None,
                    error: Some(err.to_string()),
                }
            }
            Err(err) => {
                return Err(err).with_context(|| format!("scenario step {}", index + 1));
            }
        };
        if !result.matches_expectation() {
            tracing::warn!(
                step = result.step,
                expected = ?result.expected,
                error = result.error.as_deref().unwrap_or(""),
                "step outcome differs from expectation"
            );
        }
        steps.push(result);
    }

    let stats = ledger.stats();
    let summary = SimulationSummary {
        steps,
        map_root: ledger.confirmed_root(),
        report: ComplianceReport::from(stats),
        last_verification_at: format_timestamp(stats.last_verification_time),
    };
    Ok((summary, ledger))
}

/// Execute the simulate subcommand.
///
/// Returns exit code: 0 if every step matched its expectation, 1 otherwise.
pub fn run_simulate(args: &SimulateArgs, config: &ClientConfig) -> Result<u8> {
    let scenario = Scenario::load(&args.scenario)?;
    if scenario.submissions.is_empty() {
        bail!("scenario has no submissions: {}", args.scenario.display());
    }

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;
    let (summary, ledger) = runtime.block_on(simulate(&scenario, config))?;

    let events_path = args.events.as_ref().or(config.event_log_path.as_ref());
    if let Some(path) = events_path {
        write_events(path, &ledger.events_since(0))
            .with_context(|| format!("failed to write event log: {}", path.display()))?;
        tracing::info!(path = %path.display(), "event log written");
    }

    print_json(&summary)?;
    let all_matched = summary.steps.iter().all(StepResult::matches_expectation);
    Ok(if all_matched { 0 } else { 1 })
}
