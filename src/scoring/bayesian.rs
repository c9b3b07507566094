//! Bayesian framework for rating a candidate against domain knowledge and
//! query intent.
//!
//! The metrics are heuristic coverage ratios, not calibrated probability
//! estimates. Downstream scoring depends on the exact arithmetic, so keep it
//! stable.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::solution::{DomainKnowledge, QueryIntent, SolutionCandidate};
use crate::utils::text::{contains_any_ci, contains_ci};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BayesianConfig {
    pub prior_weight: f32,
    pub smoothing_factor: f32,
    pub information_gain_weight: f32,
    pub mutual_information_threshold: f32,
}

impl Default for BayesianConfig {
    fn default() -> Self {
        Self {
            prior_weight: 0.3,
            smoothing_factor: 0.05,
            information_gain_weight: 0.5,
            mutual_information_threshold: 0.1,
        }
    }
}

/// Output of a Bayesian evaluation pass. All values lie in [0, 1];
/// `evidence_factor` is floored at 0.1 so the posterior division upstream of
/// smoothing can never blow up.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct BayesianMetrics {
    pub posterior: f32,
    pub likelihood: f32,
    pub prior: f32,
    pub evidence_factor: f32,
    pub information_gain: f32,
    pub mutual_information: f32,
}

pub struct BayesianEvaluator {
    config: BayesianConfig,
}

impl BayesianEvaluator {
    pub fn new(config: BayesianConfig) -> Self {
        Self { config }
    }

    pub fn evaluate(
        &self,
        candidate: &SolutionCandidate,
        knowledge: &DomainKnowledge,
        intent: &QueryIntent,
    ) -> BayesianMetrics {
        let prior = self.prior(candidate, intent);
        let likelihood = self.likelihood(candidate, knowledge);
        let evidence_factor = self.evidence_factor(knowledge, intent);

        let raw_posterior = if evidence_factor > 0.0 {
            likelihood * prior / evidence_factor
        } else {
            0.0
        };
        let posterior = self.smooth(raw_posterior);

        let metrics = BayesianMetrics {
            posterior,
            likelihood,
            prior,
            evidence_factor,
            information_gain: self.information_gain(candidate, knowledge),
            mutual_information: self.mutual_information(candidate, intent),
        };
        debug!(
            posterior = metrics.posterior,
            likelihood = metrics.likelihood,
            prior = metrics.prior,
            "Bayesian evaluation complete"
        );
        metrics
    }

    /// P(R|Q): alignment of the candidate with the query intent, before any
    /// domain knowledge is considered.
    fn prior(&self, candidate: &SolutionCandidate, intent: &QueryIntent) -> f32 {
        let elements = &candidate.content.elements;
        if elements.is_empty() || intent.components.is_empty() {
            return 0.5;
        }

        let total = intent.components.len();
        let addressed = intent
            .components
            .values()
            .filter(|component| {
                elements
                    .iter()
                    .any(|e| contains_any_ci(&e.content, &component.key_terms))
            })
            .count();

        let coverage = addressed as f32 / total as f32;
        self.config.prior_weight + (1.0 - self.config.prior_weight) * coverage
    }

    /// P(D|R,Q): the fraction of important domain concepts and formulas
    /// represented somewhere in the candidate.
    fn likelihood(&self, candidate: &SolutionCandidate, knowledge: &DomainKnowledge) -> f32 {
        let elements = &candidate.content.elements;
        if elements.is_empty() || knowledge.elements.is_empty() {
            return 0.5;
        }

        let concepts = knowledge.key_concepts(0.7);
        let formulas = knowledge.formula_texts();

        let denominator = concepts.len() + formulas.len();
        if denominator == 0 {
            return 0.5;
        }

        let covered = concepts
            .iter()
            .chain(formulas.iter())
            .filter(|needle| elements.iter().any(|e| contains_ci(&e.content, needle)))
            .count();

        covered as f32 / denominator as f32
    }

    /// P(D|Q): fraction of domain elements relevant to the query, floored at
    /// 0.1 so it can serve as a divisor.
    fn evidence_factor(&self, knowledge: &DomainKnowledge, intent: &QueryIntent) -> f32 {
        if knowledge.elements.is_empty() || intent.components.is_empty() {
            return 0.5;
        }

        let terms = intent.all_key_terms();
        let relevant = knowledge
            .elements
            .iter()
            .filter(|e| contains_any_ci(&e.content, &terms))
            .count();

        let ratio = relevant as f32 / knowledge.elements.len() as f32;
        ratio.max(0.1)
    }

    /// Pulls the posterior away from 0 and 1 into the
    /// [smoothing_factor, 1 - smoothing_factor] band.
    fn smooth(&self, probability: f32) -> f32 {
        let s = self.config.smoothing_factor;
        (s + (1.0 - 2.0 * s) * probability).clamp(0.0, 1.0)
    }

    /// Information the candidate adds beyond the raw domain knowledge,
    /// estimated from its explicit insights.
    fn information_gain(&self, candidate: &SolutionCandidate, knowledge: &DomainKnowledge) -> f32 {
        if candidate.content.elements.is_empty() {
            return 0.0;
        }
        let domain_size = knowledge.elements.len().max(1);
        let ratio = candidate.insights.len() as f32 / domain_size as f32;
        (ratio * self.config.information_gain_weight).min(1.0)
    }

    /// Fraction of intent components addressed by section titles; kept only
    /// when it clears the significance threshold. Counts each component at
    /// most once no matter how many sections address it.
    fn mutual_information(&self, candidate: &SolutionCandidate, intent: &QueryIntent) -> f32 {
        let sections = &candidate.content.sections;
        if sections.is_empty() || intent.components.is_empty() {
            return 0.5;
        }

        let addressed = intent
            .components
            .values()
            .filter(|component| {
                sections
                    .iter()
                    .any(|s| contains_any_ci(&s.title, &component.key_terms))
            })
            .count();

        let ratio = addressed as f32 / intent.components.len() as f32;
        if ratio > self.config.mutual_information_threshold {
            ratio
        } else {
            0.0
        }
    }
}
