//! Turns dimension scores and uncertainty into an accept/refine decision with
//! prioritized, actionable feedback.

use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{
    DimensionScores, DimensionThresholds, DimensionWeights, QualityDimension, UncertaintyReport,
};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RefinementConfig {
    pub thresholds: DimensionThresholds,
    pub weights: DimensionWeights,
    pub uncertainty_penalty: f32,
    pub max_refinement_items: usize,
    /// Weighted scores below this trigger refinement even without a critical
    /// dimension failure.
    pub accept_threshold: f32,
}

impl Default for RefinementConfig {
    fn default() -> Self {
        Self {
            thresholds: DimensionThresholds::default(),
            weights: DimensionWeights::default(),
            uncertainty_penalty: 0.1,
            max_refinement_items: 3,
            accept_threshold: 0.75,
        }
    }
}

/// Per-dimension view of how the score compares to its threshold once the
/// uncertainty penalty is applied.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DimensionAnalysis {
    pub score: f32,
    pub effective_score: f32,
    pub threshold: f32,
    pub weight: f32,
    pub confidence: f32,
    pub needs_refinement: bool,
    pub is_critical: bool,
    pub threshold_gap: f32,
    pub uncertainty_adjustment: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefinementPriority {
    pub dimension: QualityDimension,
    pub priority_score: f32,
    pub impact: f32,
    pub feasibility: f32,
    pub threshold_gap: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefinementSuggestion {
    /// None marks the generic whole-response suggestion.
    pub dimension: Option<QualityDimension>,
    pub severity: Severity,
    pub message: String,
    pub expected_improvement: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefinementAnalysis {
    pub needs_refinement: bool,
    pub weighted_score: f32,
    pub accept_threshold: f32,
    pub dimension_analysis: BTreeMap<QualityDimension, DimensionAnalysis>,
    pub critical_failures: Vec<QualityDimension>,
    pub priority: Vec<RefinementPriority>,
    pub suggestions: Vec<RefinementSuggestion>,
}

pub struct RefinementAnalyzer {
    config: RefinementConfig,
}

impl RefinementAnalyzer {
    pub fn new(config: RefinementConfig) -> Self {
        Self { config }
    }

    pub fn analyze(
        &self,
        scores: &DimensionScores,
        uncertainty: &UncertaintyReport,
    ) -> RefinementAnalysis {
        let dimension_analysis = self.analyze_dimensions(scores, uncertainty);
        let weighted_score = self.weighted_score(scores);

        let critical_failures: Vec<QualityDimension> = QualityDimension::ALL
            .iter()
            .copied()
            .filter(|d| {
                dimension_analysis
                    .get(d)
                    .map(|a| a.is_critical && a.needs_refinement)
                    .unwrap_or(false)
            })
            .collect();

        let needs_refinement =
            weighted_score < self.config.accept_threshold || !critical_failures.is_empty();

        let priority = self.prioritize(&dimension_analysis);
        let suggestions = self.suggestions(&priority, scores);

        debug!(
            needs_refinement,
            weighted_score,
            critical = critical_failures.len(),
            "Refinement analysis complete"
        );

        RefinementAnalysis {
            needs_refinement,
            weighted_score,
            accept_threshold: self.config.accept_threshold,
            dimension_analysis,
            critical_failures,
            priority,
            suggestions,
        }
    }

    fn analyze_dimensions(
        &self,
        scores: &DimensionScores,
        uncertainty: &UncertaintyReport,
    ) -> BTreeMap<QualityDimension, DimensionAnalysis> {
        let mut analysis = BTreeMap::new();
        for dimension in QualityDimension::ALL {
            let score = scores.get(dimension);
            let threshold = self.config.thresholds.get(dimension);
            let weight = self.config.weights.get(dimension);
            let confidence = uncertainty.confidence_for(dimension);

            let uncertainty_adjustment = self.config.uncertainty_penalty * (1.0 - confidence);
            let effective_score = (score - uncertainty_adjustment).max(0.0);
            let needs_refinement = effective_score < threshold;
            let is_critical = weight >= 0.25 && needs_refinement;
            let threshold_gap = if needs_refinement {
                threshold - effective_score
            } else {
                0.0
            };

            analysis.insert(
                dimension,
                DimensionAnalysis {
                    score,
                    effective_score,
                    threshold,
                    weight,
                    confidence,
                    needs_refinement,
                    is_critical,
                    threshold_gap,
                    uncertainty_adjustment,
                },
            );
        }
        analysis
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

    /// Impact (weight x gap) scaled by feasibility (assessment confidence),
    /// highest priority first, capped at the configured item count.
    fn prioritize(
        &self,
        analysis: &BTreeMap<QualityDimension, DimensionAnalysis>,
    ) -> Vec<RefinementPriority> {
        let mut prioritized: Vec<RefinementPriority> = analysis
            .iter()
            .filter(|(_, a)| a.needs_refinement)
            .map(|(dimension, a)| {
                let impact = a.weight * a.threshold_gap;
                // Low confidence dampens but never eliminates a dimension.
                let feasibility = 0.5 + 0.5 * a.confidence;
                RefinementPriority {
                    dimension: *dimension,
                    priority_score: impact * feasibility,
                    impact,
                    feasibility,
                    threshold_gap: a.threshold_gap,
                }
            })
            .collect();

        prioritized.sort_by(|a, b| {
            b.priority_score
                .partial_cmp(&a.priority_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        prioritized.truncate(self.config.max_refinement_items);
        prioritized
    }

    fn suggestions(
        &self,
        priority: &[RefinementPriority],
        scores: &DimensionScores,
    ) -> Vec<RefinementSuggestion> {
        let mut suggestions: Vec<RefinementSuggestion> = priority
            .iter()
            .map(|item| Self::suggestion_for(item.dimension, item.threshold_gap))
            .collect();

        if suggestions.is_empty() && scores.mean() < 0.7 {
            suggestions.push(RefinementSuggestion {
                dimension: None,
                severity: Severity::Medium,
                message: "Improve overall quality by restructuring and enriching the response"
                    .to_string(),
                expected_improvement: 0.15,
            });
        }
        suggestions
    }

    fn suggestion_for(dimension: QualityDimension, gap: f32) -> RefinementSuggestion {
        let (severity, message, expected_improvement) = match dimension {
            QualityDimension::Accuracy => (
                if gap > 0.2 { Severity::High } else { Severity::Medium },
                "Verify factual correctness and align statements with domain knowledge",
                (gap * 1.5).min(0.3),
            ),
            QualityDimension::Completeness => (
                if gap > 0.15 { Severity::High } else { Severity::Medium },
                "Include missing information elements and address all aspects of the query",
                (gap * 1.3).min(0.25),
            ),
            QualityDimension::Consistency => (
                Severity::Medium,
                "Resolve logical contradictions and improve structural coherence",
                (gap * 1.2).min(0.2),
            ),
            QualityDimension::Relevance => (
                if gap > 0.15 { Severity::High } else { Severity::Medium },
                "Focus more directly on the specific query intent and user needs",
                (gap * 1.4).min(0.3),
            ),
            QualityDimension::Novelty => (
                Severity::Low,
                "Add non-obvious insights and connections between domain concepts",
                (gap * 1.1).min(0.15),
            ),
        };
        RefinementSuggestion {
            dimension: Some(dimension),
            severity,
            message: message.to_string(),
            expected_improvement,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::{BayesianMetrics, UncertaintyConfig, UncertaintyQuantifier};
    use crate::solution::SolutionCandidate;

    fn report_for(scores: &DimensionScores) -> UncertaintyReport {
        UncertaintyQuantifier::new(UncertaintyConfig::default()).quantify(
            &SolutionCandidate::default(),
            scores,
            &BayesianMetrics::default(),
        )
    }

    #[test]
    fn high_scores_are_accepted() {
        let scores = DimensionScores {
            accuracy: 0.9,
            completeness: 0.9,
            consistency: 0.9,
            relevance: 0.9,
            novelty: 0.9,
        };
        let analysis =
            RefinementAnalyzer::new(RefinementConfig::default()).analyze(&scores, &report_for(&scores));
        assert!(!analysis.needs_refinement);
        assert!(analysis.critical_failures.is_empty());
        assert!(analysis.priority.is_empty());
    }

    #[test]
    fn critical_dimension_forces_refinement_despite_weighted_pass() {
        // Accuracy fails badly but the rest are high enough that the weighted
        // score clears the accept threshold.
        let scores = DimensionScores {
            accuracy: 0.4,
            completeness: 0.95,
            consistency: 0.95,
            relevance: 0.95,
            novelty: 0.9,
        };
        let analyzer = RefinementAnalyzer::new(RefinementConfig::default());
        let analysis = analyzer.analyze(&scores, &report_for(&scores));
        assert!(analysis.weighted_score >= 0.75);
        assert!(analysis.needs_refinement);
        assert_eq!(analysis.critical_failures, vec![QualityDimension::Accuracy]);
    }

    #[test]
    fn priority_is_sorted_and_capped() {
        let scores = DimensionScores {
            accuracy: 0.1,
            completeness: 0.1,
            consistency: 0.1,
            relevance: 0.1,
            novelty: 0.1,
        };
        let analyzer = RefinementAnalyzer::new(RefinementConfig::default());
        let analysis = analyzer.analyze(&scores, &report_for(&scores));
        assert_eq!(analysis.priority.len(), 3);
        for pair in analysis.priority.windows(2) {
            assert!(pair[0].priority_score >= pair[1].priority_score);
        }
        // Accuracy has the highest weight and a large gap.
        assert_eq!(analysis.priority[0].dimension, QualityDimension::Accuracy);
    }

    #[test]
    fn generic_suggestion_when_no_dimension_flags_but_mean_is_low() {
        // Lenient thresholds: every dimension passes individually, yet the
        // unweighted mean stays under 0.7.
        let scores = DimensionScores {
            accuracy: 0.6,
            completeness: 0.6,
            consistency: 0.6,
            relevance: 0.6,
            novelty: 0.6,
        };
        let config = RefinementConfig {
            thresholds: DimensionThresholds {
                accuracy: 0.5,
                completeness: 0.5,
                consistency: 0.5,
                relevance: 0.5,
                novelty: 0.1,
            },
            accept_threshold: 0.5,
            ..Default::default()
        };
        let analysis = RefinementAnalyzer::new(config).analyze(&scores, &report_for(&scores));
        assert!(!analysis.needs_refinement);
        assert!(analysis.priority.is_empty());
        assert_eq!(analysis.suggestions.len(), 1);
        assert!(analysis.suggestions[0].dimension.is_none());
    }

    #[test]
    fn uncertainty_penalty_lowers_effective_score() {
        let scores = DimensionScores {
            novelty: 0.31,
            ..Default::default()
        };
        let analyzer = RefinementAnalyzer::new(RefinementConfig::default());
        let analysis = analyzer.analyze(&scores, &report_for(&scores));
        let novelty = &analysis.dimension_analysis[&QualityDimension::Novelty];
        assert!(novelty.effective_score < novelty.score);
        assert!(novelty.uncertainty_adjustment > 0.0);
    }
}
