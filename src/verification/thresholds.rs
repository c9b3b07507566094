//! Hard quality gate: dimension scores against configured thresholds with
//! tolerance. A pure function of its inputs; repeated runs are bit-identical.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::scoring::{DimensionScores, DimensionThresholds, DimensionWeights, QualityDimension};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VerifierConfig {
    pub quality_thresholds: DimensionThresholds,
    /// Scores may fall this far below a threshold without failing.
    pub tolerance: f32,
    pub weights: DimensionWeights,
    pub use_weighted_scoring: bool,
    pub required_dimensions: Vec<QualityDimension>,
    /// In strict mode a failed verification short-circuits optimization and
    /// produces a structured failure payload instead.
    pub strict: bool,
    pub enable_pruning: bool,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            quality_thresholds: DimensionThresholds::default(),
            tolerance: 0.05,
            weights: DimensionWeights {
                accuracy: 1.0,
                completeness: 0.9,
                consistency: 0.8,
                relevance: 1.0,
                novelty: 0.6,
            },
            use_weighted_scoring: true,
            required_dimensions: vec![
                QualityDimension::Accuracy,
                QualityDimension::Completeness,
                QualityDimension::Consistency,
                QualityDimension::Relevance,
            ],
            strict: true,
            enable_pruning: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DimensionFailure {
    pub score: f32,
    pub threshold: f32,
    pub gap: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationReport {
    pub passes: bool,
    pub dimension_scores: DimensionScores,
    pub dimension_failures: BTreeMap<QualityDimension, DimensionFailure>,
    pub overall_score: f32,
    pub tolerance: f32,
}

impl VerificationReport {
    pub fn summary(&self) -> String {
        if self.passes {
            format!(
                "Verification PASSED with overall score {:.2}",
                self.overall_score
            )
        } else {
            let failing: Vec<&str> = self
                .dimension_failures
                .keys()
                .map(QualityDimension::as_str)
                .collect();
            format!(
                "Verification FAILED on {} with overall score {:.2}",
                failing.join(", "),
                self.overall_score
            )
        }
    }
}

pub struct ThresholdVerifier {
    config: VerifierConfig,
}

impl ThresholdVerifier {
    pub fn new(config: VerifierConfig) -> Self {
        Self { config }
    }

    pub fn verify(&self, scores: &DimensionScores) -> VerificationReport {
        let mut dimension_failures = BTreeMap::new();
        for dimension in &self.config.required_dimensions {
            let threshold = self.config.quality_thresholds.get(*dimension);
            let score = scores.get(*dimension);
            if score < threshold - self.config.tolerance {
                dimension_failures.insert(
                    *dimension,
                    DimensionFailure {
                        score,
                        threshold,
                        gap: threshold - score,
                    },
                );
            }
        }

        let overall_score = if self.config.use_weighted_scoring {
            self.weighted_score(scores)
        } else {
            scores.mean()
        };

        let report = VerificationReport {
            passes: dimension_failures.is_empty(),
            dimension_scores: *scores,
            dimension_failures,
            overall_score,
            tolerance: self.config.tolerance,
        };
        debug!(passes = report.passes, overall_score, "Threshold verification complete");
        report
    }

    fn weighted_score(&self, scores: &DimensionScores) -> f32 {
        let mut weighted_sum = 0.0;
        let mut weight_sum = 0.0;
        for dimension in QualityDimension::ALL {
            let weight = self.config.weights.get(dimension);
            weighted_sum += scores.get(dimension) * weight;
            weight_sum += weight;
        }
        if weight_sum > 0.0 {
            weighted_sum / weight_sum
        } else {
            0.0
        }
    }

    /// Gap-parameterized recommendation for each failing dimension, attached
    /// to strict-failure payloads.
    pub fn improvement_recommendation(dimension: QualityDimension, failure: &DimensionFailure) -> String {
        let gap = failure.gap;
        match dimension {
            QualityDimension::Accuracy => format!(
                "Increase factual accuracy by validating key statements against domain knowledge. Current gap: {gap:.2}"
            ),
            QualityDimension::Completeness => format!(
                "Add missing information on key topics identified in the query. Current gap: {gap:.2}"
            ),
            QualityDimension::Consistency => format!(
                "Resolve logical contradictions between response components. Current gap: {gap:.2}"
            ),
            QualityDimension::Relevance => format!(
                "Improve alignment with the original query intent. Current gap: {gap:.2}"
            ),
            QualityDimension::Novelty => format!(
                "Incorporate more unique insights beyond common knowledge. Current gap: {gap:.2}"
            ),
        }
    }
}
