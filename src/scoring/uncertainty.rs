//! Uncertainty quantification for dimension scores: variance estimates,
//! confidence intervals, and an aggregate confidence derived from the
//! Bayesian posterior.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::solution::SolutionCandidate;

use super::{BayesianMetrics, DimensionScores, QualityDimension};

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct VariancePriors {
    pub accuracy: f32,
    pub completeness: f32,
    pub consistency: f32,
    pub relevance: f32,
    pub novelty: f32,
}

impl Default for VariancePriors {
    fn default() -> Self {
        Self {
            accuracy: 0.04,
            completeness: 0.06,
            consistency: 0.03,
            relevance: 0.05,
            novelty: 0.08,
        }
    }
}

impl VariancePriors {
    pub fn get(&self, dimension: QualityDimension) -> f32 {
        match dimension {
            QualityDimension::Accuracy => self.accuracy,
            QualityDimension::Completeness => self.completeness,
            QualityDimension::Consistency => self.consistency,
            QualityDimension::Relevance => self.relevance,
            QualityDimension::Novelty => self.novelty,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UncertaintyConfig {
    pub confidence_level: f32,
    pub min_confidence_margin: f32,
    pub max_confidence_margin: f32,
    pub variance_priors: VariancePriors,
}

impl Default for UncertaintyConfig {
    fn default() -> Self {
        Self {
            confidence_level: 0.95,
            min_confidence_margin: 0.05,
            max_confidence_margin: 0.2,
            variance_priors: VariancePriors::default(),
        }
    }
}

/// Uncertainty estimate for a single dimension score.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DimensionUncertainty {
    pub score: f32,
    /// Clamped to [0.01, 0.25].
    pub variance: f32,
    pub lower_bound: f32,
    pub upper_bound: f32,
    /// Clamped to [0.1, 0.99].
    pub confidence: f32,
}

impl DimensionUncertainty {
    pub fn interval_width(&self) -> f32 {
        self.upper_bound - self.lower_bound
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UncertaintyReport {
    pub dimensions: BTreeMap<QualityDimension, DimensionUncertainty>,
    pub overall_confidence: f32,
    pub average_interval_width: f32,
    pub highest_uncertainty_dimension: Option<QualityDimension>,
    pub confidence_level: f32,
}

impl UncertaintyReport {
    pub fn confidence_for(&self, dimension: QualityDimension) -> f32 {
        self.dimensions
            .get(&dimension)
            .map(|u| u.confidence)
            .unwrap_or(0.8)
    }
}

pub struct UncertaintyQuantifier {
    config: UncertaintyConfig,
}

impl UncertaintyQuantifier {
    pub fn new(config: UncertaintyConfig) -> Self {
        Self { config }
    }

    pub fn quantify(
        &self,
        candidate: &SolutionCandidate,
        scores: &DimensionScores,
        bayesian: &BayesianMetrics,
    ) -> UncertaintyReport {
        let complexity = self.solution_complexity(candidate);

        let mut dimensions = BTreeMap::new();
        for dimension in QualityDimension::ALL {
            dimensions.insert(
                dimension,
                self.quantify_dimension(dimension, scores.get(dimension), complexity, bayesian),
            );
        }

        let average_interval_width = if dimensions.is_empty() {
            0.0
        } else {
            dimensions
                .values()
                .map(DimensionUncertainty::interval_width)
                .sum::<f32>()
                / dimensions.len() as f32
        };

        let highest_uncertainty_dimension = dimensions
            .iter()
            .fold(None::<(QualityDimension, f32)>, |acc, (dim, u)| match acc {
                Some((_, v)) if u.variance <= v => acc,
                _ => Some((*dim, u.variance)),
            })
            .map(|(dim, _)| dim);

        let report = UncertaintyReport {
            dimensions,
            overall_confidence: self.overall_confidence(bayesian.posterior),
            average_interval_width,
            highest_uncertainty_dimension,
            confidence_level: self.config.confidence_level,
        };
        debug!(
            overall_confidence = report.overall_confidence,
            average_interval_width = report.average_interval_width,
            "Uncertainty quantification complete"
        );
        report
    }

    fn quantify_dimension(
        &self,
        dimension: QualityDimension,
        score: f32,
        complexity: f32,
        bayesian: &BayesianMetrics,
    ) -> DimensionUncertainty {
        let prior = self.config.variance_priors.get(dimension);
        let strength = self.evidence_strength(dimension, bayesian);

        // Variance grows with complexity and shrinks with evidence strength.
        let variance = (prior * (complexity / strength)).clamp(0.01, 0.25);

        let margin = self.confidence_margin(variance);
        DimensionUncertainty {
            score,
            variance,
            lower_bound: (score - margin).max(0.0),
            upper_bound: (score + margin).min(1.0),
            confidence: (1.0 - variance * 2.0).clamp(0.1, 0.99),
        }
    }

    /// Complexity factor in [0.5, 2.0], normalized against reference counts of
    /// 10 elements, 4 sections, and 3 element kinds.
    fn solution_complexity(&self, candidate: &SolutionCandidate) -> f32 {
        if candidate.content.elements.is_empty() {
            return 1.0;
        }

        let element_factor = (candidate.element_count() as f32 / 10.0).min(2.0);
        let section_factor = (candidate.section_count() as f32 / 4.0).min(1.5);
        let type_factor = (candidate.kind_variety() as f32 / 3.0).min(1.5);

        (0.5 * element_factor + 0.3 * section_factor + 0.2 * type_factor).clamp(0.5, 2.0)
    }

    /// Evidence strength in [0.5, 2.0]; dimension-specific Bayesian coupling.
    fn evidence_strength(&self, dimension: QualityDimension, bayesian: &BayesianMetrics) -> f32 {
        let strength = match dimension {
            QualityDimension::Accuracy => 0.5 + bayesian.likelihood,
            QualityDimension::Completeness => 0.5 + bayesian.evidence_factor,
            QualityDimension::Consistency => 0.8,
            QualityDimension::Relevance => 0.7 + bayesian.mutual_information * 0.6,
            QualityDimension::Novelty => 0.7,
        };
        strength.clamp(0.5, 2.0)
    }

    fn confidence_margin(&self, variance: f32) -> f32 {
        let z = if self.config.confidence_level >= 0.95 {
            2.0
        } else {
            1.65
        };
        (z * variance.sqrt()).clamp(
            self.config.min_confidence_margin,
            self.config.max_confidence_margin,
        )
    }

    /// A decisive posterior (far from 0.5) means the evaluation as a whole can
    /// be trusted more.
    fn overall_confidence(&self, posterior: f32) -> f32 {
        let certainty = (posterior - 0.5).abs() * 2.0;
        0.5 + certainty * 0.5
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solution::{ElementKind, SolutionContent, SolutionElement};

    fn quantifier() -> UncertaintyQuantifier {
        UncertaintyQuantifier::new(UncertaintyConfig::default())
    }

    fn candidate_with_elements(n: usize) -> SolutionCandidate {
        SolutionCandidate {
            content: SolutionContent {
                elements: (0..n)
                    .map(|i| SolutionElement::new(format!("e{i}"), ElementKind::Fact, "content"))
                    .collect(),
                sections: Vec::new(),
            },
            insights: Vec::new(),
        }
    }

    #[test]
    fn variance_and_confidence_stay_in_bounds() {
        let report = quantifier().quantify(
            &candidate_with_elements(25),
            &DimensionScores::default(),
            &BayesianMetrics::default(),
        );
        for uncertainty in report.dimensions.values() {
            assert!(uncertainty.variance >= 0.01 && uncertainty.variance <= 0.25);
            assert!(uncertainty.confidence >= 0.1 && uncertainty.confidence <= 0.99);
            assert!(uncertainty.lower_bound >= 0.0);
            assert!(uncertainty.upper_bound <= 1.0);
            assert!(uncertainty.lower_bound <= uncertainty.upper_bound);
        }
    }

    #[test]
    fn empty_candidate_has_neutral_complexity() {
        let complexity = quantifier().solution_complexity(&SolutionCandidate::default());
        assert!((complexity - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn decisive_posterior_raises_overall_confidence() {
        let q = quantifier();
        let neutral = q.overall_confidence(0.5);
        let decisive = q.overall_confidence(0.95);
        assert!((neutral - 0.5).abs() < f32::EPSILON);
        assert!(decisive > neutral);
        assert!(decisive <= 1.0);
    }

    #[test]
    fn highest_uncertainty_dimension_tracks_largest_variance() {
        let bayesian = BayesianMetrics {
            likelihood: 0.5,
            evidence_factor: 0.5,
            mutual_information: 0.5,
            ..Default::default()
        };
        let report = quantifier().quantify(
            &candidate_with_elements(10),
            &DimensionScores::default(),
            &bayesian,
        );
        // Novelty carries the largest variance prior and a weak evidence
        // multiplier, so it should surface as the most uncertain dimension.
        assert_eq!(
            report.highest_uncertainty_dimension,
            Some(QualityDimension::Novelty)
        );
    }

    #[test]
    fn stronger_evidence_shrinks_variance() {
        let q = quantifier();
        let weak = BayesianMetrics {
            likelihood: 0.0,
            ..Default::default()
        };
        let strong = BayesianMetrics {
            likelihood: 1.0,
            ..Default::default()
        };
        let candidate = candidate_with_elements(10);
        let scores = DimensionScores::default();
        let v_weak = q
            .quantify(&candidate, &scores, &weak)
            .dimensions[&QualityDimension::Accuracy]
            .variance;
        let v_strong = q
            .quantify(&candidate, &scores, &strong)
            .dimensions[&QualityDimension::Accuracy]
            .variance;
        assert!(v_strong < v_weak);
    }
}
