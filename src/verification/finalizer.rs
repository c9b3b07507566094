//! Normalizes the pruned response into its delivery shape and stamps
//! verification/optimization metadata.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::scoring::{DimensionScores, QualityDimension};

use super::{
    CandidateResponse, DimensionFailure, ParetoAnalysis, PruningOutcome, ResponseComponent,
    VerificationReport,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FinalizerConfig {
    pub include_summary: bool,
    pub include_optimization_metrics: bool,
    pub include_verification_metadata: bool,
}

impl Default for FinalizerConfig {
    fn default() -> Self {
        Self {
            include_summary: true,
            include_optimization_metrics: true,
            include_verification_metadata: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    Passed,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseMetadata {
    pub generated_at: DateTime<Utc>,
    pub verification_status: VerificationStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseSummary {
    pub verification_result: bool,
    pub overall_quality_score: f32,
    pub quality_dimensions: DimensionScores,
    pub pareto_frontier_size: usize,
    pub efficiency_gain: f32,
    pub failing_dimensions: Vec<QualityDimension>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizationMetrics {
    pub pareto_frontier_size: usize,
    pub dominated_components_count: usize,
    pub efficiency_gain: f32,
    pub frontier_quality: BTreeMap<QualityDimension, f32>,
    pub pruning: PruningOutcome,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationMetadata {
    pub status: VerificationStatus,
    pub overall_score: f32,
    pub dimension_scores: DimensionScores,
    pub tolerance: f32,
    pub failures: BTreeMap<QualityDimension, DimensionFailure>,
}

/// The finalized delivery object, transport-agnostic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinalResponse {
    pub content: String,
    pub metadata: ResponseMetadata,
    pub components: Vec<ResponseComponent>,
    pub quality_metrics: DimensionScores,
    pub summary: Option<ResponseSummary>,
    pub optimization: Option<OptimizationMetrics>,
    pub verification: Option<VerificationMetadata>,
    pub final_quality_score: f32,
    pub status: String,
}

pub struct ResponseFinalizer {
    config: FinalizerConfig,
}

impl ResponseFinalizer {
    pub fn new(config: FinalizerConfig) -> Self {
        Self { config }
    }

    pub fn finalize(
        &self,
        response: CandidateResponse,
        report: &VerificationReport,
        pareto: &ParetoAnalysis,
        pruning: PruningOutcome,
    ) -> FinalResponse {
        let status = if report.passes {
            VerificationStatus::Passed
        } else {
            VerificationStatus::Failed
        };

        let summary = self.config.include_summary.then(|| ResponseSummary {
            verification_result: report.passes,
            overall_quality_score: report.overall_score,
            quality_dimensions: report.dimension_scores,
            pareto_frontier_size: pareto.summary.frontier_size,
            efficiency_gain: pareto.summary.overall_efficiency_gain,
            failing_dimensions: report.dimension_failures.keys().copied().collect(),
        });

        let optimization = self
            .config
            .include_optimization_metrics
            .then(|| OptimizationMetrics {
                pareto_frontier_size: pareto.summary.frontier_size,
                dominated_components_count: pareto.summary.dominated_size,
                efficiency_gain: pareto.summary.overall_efficiency_gain,
                frontier_quality: pareto.summary.frontier_avg_scores.clone(),
                pruning,
            });

        let verification = self
            .config
            .include_verification_metadata
            .then(|| VerificationMetadata {
                status,
                overall_score: report.overall_score,
                dimension_scores: report.dimension_scores,
                tolerance: report.tolerance,
                failures: report.dimension_failures.clone(),
            });

        let final_quality_score = Self::final_quality_score(report);
        info!(final_quality_score, passed = report.passes, "Response finalized");

        FinalResponse {
            content: response.content,
            metadata: ResponseMetadata {
                generated_at: Utc::now(),
                verification_status: status,
            },
            components: response.components,
            quality_metrics: response.quality_metrics,
            summary,
            optimization,
            verification,
            final_quality_score,
            status: "completed".to_string(),
        }
    }

    /// Verification failures shave up to 0.2 off the overall score, 0.05 per
    /// failing dimension.
    fn final_quality_score(report: &VerificationReport) -> f32 {
        if report.passes {
            return report.overall_score;
        }
        let penalty = (report.dimension_failures.len() as f32 * 0.05).min(0.2);
        (report.overall_score - penalty).max(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::verification::VerifierConfig;

    fn passing_report(score: f32) -> VerificationReport {
        VerificationReport {
            passes: true,
            dimension_scores: DimensionScores::default(),
            dimension_failures: BTreeMap::new(),
            overall_score: score,
            tolerance: 0.05,
        }
    }

    fn failing_report(score: f32, failing: &[QualityDimension]) -> VerificationReport {
        let mut failures = BTreeMap::new();
        for dimension in failing {
            failures.insert(
                *dimension,
                DimensionFailure {
                    score: 0.1,
                    threshold: 0.8,
                    gap: 0.7,
                },
            );
        }
        VerificationReport {
            passes: false,
            dimension_scores: DimensionScores::default(),
            dimension_failures: failures,
            overall_score: score,
            tolerance: VerifierConfig::default().tolerance,
        }
    }

    fn empty_response() -> CandidateResponse {
        CandidateResponse {
            content: String::new(),
            components: Vec::new(),
            component_order: Vec::new(),
            quality_metrics: DimensionScores::default(),
        }
    }

    #[test]
    fn passing_report_keeps_overall_score() {
        let finalizer = ResponseFinalizer::new(FinalizerConfig::default());
        let final_response = finalizer.finalize(
            empty_response(),
            &passing_report(0.84),
            &ParetoAnalysis::empty(vec![QualityDimension::Accuracy]),
            PruningOutcome::default(),
        );
        assert!((final_response.final_quality_score - 0.84).abs() < 1e-6);
        assert_eq!(
            final_response.metadata.verification_status,
            VerificationStatus::Passed
        );
        assert_eq!(final_response.status, "completed");
    }

    #[test]
    fn failures_apply_a_capped_penalty() {
        let finalizer = ResponseFinalizer::new(FinalizerConfig::default());
        let two_failures = failing_report(
            0.6,
            &[QualityDimension::Accuracy, QualityDimension::Relevance],
        );
        let response = finalizer.finalize(
            empty_response(),
            &two_failures,
            &ParetoAnalysis::empty(vec![QualityDimension::Accuracy]),
            PruningOutcome::default(),
        );
        assert!((response.final_quality_score - 0.5).abs() < 1e-6);

        let all_failures = failing_report(0.1, &QualityDimension::ALL);
        let response = finalizer.finalize(
            empty_response(),
            &all_failures,
            &ParetoAnalysis::empty(vec![QualityDimension::Accuracy]),
            PruningOutcome::default(),
        );
        // Five failures would be 0.25 but the penalty caps at 0.2, and the
        // score floors at zero.
        assert_eq!(response.final_quality_score, 0.0);
    }

    #[test]
    fn optional_sections_honor_config_flags() {
        let finalizer = ResponseFinalizer::new(FinalizerConfig {
            include_summary: false,
            include_optimization_metrics: false,
            include_verification_metadata: false,
        });
        let response = finalizer.finalize(
            empty_response(),
            &passing_report(0.9),
            &ParetoAnalysis::empty(vec![QualityDimension::Accuracy]),
            PruningOutcome::default(),
        );
        assert!(response.summary.is_none());
        assert!(response.optimization.is_none());
        assert!(response.verification.is_none());
    }
}
