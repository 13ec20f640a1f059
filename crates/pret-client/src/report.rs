//! # Compliance Report
//!
//! Derived figures the registry deliberately does not compute. The
//! registry exposes integer counters only; ratios are taken here.

use pret_state::GlobalComplianceStats;
use serde::{Deserialize, Serialize};

/// Global counters plus the derived compliance percentage.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ComplianceReport {
    #[serde(flatten)]
    pub stats: GlobalComplianceStats,
    /// `compliant / total * 100`, or `None` while no company is tracked.
    pub compliance_percentage: Option<f64>,
}

impl From<GlobalComplianceStats> for ComplianceReport {
    fn from(stats: GlobalComplianceStats) -> Self {
        Self {
            stats,
            compliance_percentage: compliance_percentage(&stats),
        }
    }
}

/// Share of tracked companies whose latest verification passed.
pub fn compliance_percentage(stats: &GlobalComplianceStats) -> Option<f64> {
    (stats.total_companies > 0)
        .then(|| stats.compliant_companies as f64 * 100.0 / stats.total_companies as f64)
}
