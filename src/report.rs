//! Analysis report envelope
//!
//! Composes the two independent pipelines (limiter diagnosis -> plan, and
//! phenotype -> cross-correlation) over the shared read-only inputs and
//! bundles their artifacts for the rendering layer. Everything here is a
//! plain serializable record with no cycles.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::crosscorr::{CrossCorrelationAnalyzer, CrossCorrelationReport};
use crate::engines::{EngineResultSet, EngineResults};
use crate::kinetics::{KineticPhenotype, KineticPhenotypeClassifier};
use crate::limiters::{Limiter, LimiterScorer};
use crate::models::{SignalTable, TrainingProfile};
use crate::plan::{PlanGenerator, TrainingPlan};
use crate::snapshot::{PhysioSnapshot, PhysioSnapshotBuilder};

/// Complete per-test analysis artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub generated_at: DateTime<Utc>,
    pub tool_version: String,
    pub snapshot: PhysioSnapshot,
    pub limiters: Vec<Limiter>,
    pub plan: TrainingPlan,
    pub phenotype: KineticPhenotype,
    pub cross_correlation: CrossCorrelationReport,
}

/// Run both pipelines over the shared inputs.
pub fn run_full_analysis(
    table: &SignalTable,
    result_set: &EngineResultSet,
    profile: &TrainingProfile,
) -> AnalysisReport {
    let results = EngineResults::from_result_set(result_set);
    let snapshot = PhysioSnapshotBuilder::build(&results);

    // Limiter/plan pipeline.
    let limiters = LimiterScorer::score_limiters(&snapshot, profile);
    let plan = PlanGenerator::generate(&snapshot, profile, limiters.clone());

    // Phenotype/cross-correlation pipeline.
    let phenotype = KineticPhenotypeClassifier::classify(&results, &snapshot);
    let cross_correlation =
        CrossCorrelationAnalyzer::analyze(table, &results, &snapshot, Some(&phenotype), profile);

    info!(
        limiters = limiters.len(),
        phenotype_status = ?phenotype.status,
        "analysis complete"
    );

    AnalysisReport {
        generated_at: Utc::now(),
        tool_version: env!("CARGO_PKG_VERSION").to_string(),
        snapshot,
        limiters,
        plan,
        phenotype,
        cross_correlation,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_inputs_still_produce_a_report() {
        let report = run_full_analysis(
            &SignalTable::default(),
            &EngineResultSet::new(),
            &TrainingProfile::default(),
        );
        assert!(report.limiters.is_empty());
        assert_eq!(report.plan.philosophy, "General endurance development");
        // Must serialize cleanly for the rendering layer.
        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("NO_KINETICS_DATA"));
        assert!(json.contains("NO_DATA"));
    }
}
