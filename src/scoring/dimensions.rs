//! Five-dimension quality assessment of a solution candidate.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::solution::{DomainKnowledge, ElementKind, QueryIntent, SolutionCandidate};
use crate::utils::text::{contains_any_ci, contains_ci, formula_similarity, word_jaccard};

use super::BayesianMetrics;

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum QualityDimension {
    Accuracy,
    Completeness,
    Consistency,
    Relevance,
    Novelty,
}

impl QualityDimension {
    pub const ALL: [QualityDimension; 5] = [
        Self::Accuracy,
        Self::Completeness,
        Self::Consistency,
        Self::Relevance,
        Self::Novelty,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Accuracy => "accuracy",
            Self::Completeness => "completeness",
            Self::Consistency => "consistency",
            Self::Relevance => "relevance",
            Self::Novelty => "novelty",
        }
    }
}

impl std::fmt::Display for QualityDimension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-dimension score vector. Scores stay in [0, 1]; the neutral default is
/// 0.5 so missing upstream data never surfaces as an absent entry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DimensionScores {
    pub accuracy: f32,
    pub completeness: f32,
    pub consistency: f32,
    pub relevance: f32,
    pub novelty: f32,
}

impl Default for DimensionScores {
    fn default() -> Self {
        Self {
            accuracy: 0.5,
            completeness: 0.5,
            consistency: 0.5,
            relevance: 0.5,
            novelty: 0.5,
        }
    }
}

impl DimensionScores {
    pub fn get(&self, dimension: QualityDimension) -> f32 {
        match dimension {
            QualityDimension::Accuracy => self.accuracy,
            QualityDimension::Completeness => self.completeness,
            QualityDimension::Consistency => self.consistency,
            QualityDimension::Relevance => self.relevance,
            QualityDimension::Novelty => self.novelty,
        }
    }

    pub fn set(&mut self, dimension: QualityDimension, score: f32) {
        match dimension {
            QualityDimension::Accuracy => self.accuracy = score,
            QualityDimension::Completeness => self.completeness = score,
            QualityDimension::Consistency => self.consistency = score,
            QualityDimension::Relevance => self.relevance = score,
            QualityDimension::Novelty => self.novelty = score,
        }
    }

    /// Unweighted mean across the five dimensions.
    pub fn mean(&self) -> f32 {
        QualityDimension::ALL
            .iter()
            .map(|d| self.get(*d))
            .sum::<f32>()
            / QualityDimension::ALL.len() as f32
    }
}

/// Per-dimension weight table.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct DimensionWeights {
    pub accuracy: f32,
    pub completeness: f32,
    pub consistency: f32,
    pub relevance: f32,
    pub novelty: f32,
}

impl Default for DimensionWeights {
    fn default() -> Self {
        Self {
            accuracy: 0.30,
            completeness: 0.25,
            consistency: 0.15,
            relevance: 0.25,
            novelty: 0.05,
        }
    }
}

impl DimensionWeights {
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

/// Per-dimension threshold table.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct DimensionThresholds {
    pub accuracy: f32,
    pub completeness: f32,
    pub consistency: f32,
    pub relevance: f32,
    pub novelty: f32,
}

impl Default for DimensionThresholds {
    fn default() -> Self {
        Self {
            accuracy: 0.80,
            completeness: 0.75,
            consistency: 0.85,
            relevance: 0.75,
            novelty: 0.30,
        }
    }
}

impl DimensionThresholds {
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
pub struct AssessorConfig {
    /// Word-Jaccard cutoff above which a candidate fact counts as supported.
    pub fact_similarity_threshold: f32,
    /// Novelty scores at or below this are zeroed as insignificant.
    pub novelty_threshold: f32,
}

impl Default for AssessorConfig {
    fn default() -> Self {
        Self {
            fact_similarity_threshold: 0.7,
            novelty_threshold: 0.3,
        }
    }
}

pub struct DimensionAssessor {
    config: AssessorConfig,
}

impl DimensionAssessor {
    pub fn new(config: AssessorConfig) -> Self {
        Self { config }
    }

    pub fn assess(
        &self,
        candidate: &SolutionCandidate,
        knowledge: &DomainKnowledge,
        intent: &QueryIntent,
        bayesian: &BayesianMetrics,
    ) -> DimensionScores {
        let scores = DimensionScores {
            accuracy: self.accuracy(candidate, knowledge, bayesian),
            completeness: self.completeness(candidate, knowledge, intent),
            consistency: self.consistency(candidate),
            relevance: self.relevance(candidate, intent, bayesian),
            novelty: self.novelty(candidate, knowledge),
        };
        debug!(
            accuracy = scores.accuracy,
            completeness = scores.completeness,
            consistency = scores.consistency,
            relevance = scores.relevance,
            novelty = scores.novelty,
            "Dimension assessment complete"
        );
        scores
    }

    /// Average match score over fact and formula elements; falls back to the
    /// Bayesian likelihood when no such element produced a score.
    fn accuracy(
        &self,
        candidate: &SolutionCandidate,
        knowledge: &DomainKnowledge,
        bayesian: &BayesianMetrics,
    ) -> f32 {
        let elements = &candidate.content.elements;
        if elements.is_empty() || knowledge.elements.is_empty() {
            return 0.5;
        }

        let domain_facts = knowledge.fact_contents();
        let domain_formulas = knowledge.named_formulas();

        let mut scores = Vec::new();
        for element in elements {
            match element.kind {
                ElementKind::Fact => {
                    let supported = domain_facts.iter().any(|fact| {
                        word_jaccard(&element.content, fact) > self.config.fact_similarity_threshold
                    });
                    scores.push(if supported { 1.0 } else { 0.0 });
                }
                ElementKind::Formula => {
                    if let Some(name) = element.name.as_deref() {
                        if let Some(reference) = domain_formulas.get(name) {
                            scores.push(formula_similarity(&element.content, reference));
                        }
                    }
                }
                _ => {}
            }
        }

        if scores.is_empty() {
            return bayesian.likelihood;
        }
        scores.iter().sum::<f32>() / scores.len() as f32
    }

    /// Coverage of required metrics when the intent names them, otherwise
    /// coverage of high-importance domain concepts.
    fn completeness(
        &self,
        candidate: &SolutionCandidate,
        knowledge: &DomainKnowledge,
        intent: &QueryIntent,
    ) -> f32 {
        let elements = &candidate.content.elements;
        if elements.is_empty() {
            return 0.0;
        }

        if !intent.required_metrics.is_empty() {
            let covered = intent
                .required_metrics
                .iter()
                .filter(|metric| elements.iter().any(|e| contains_ci(&e.content, metric)))
                .count();
            return covered as f32 / intent.required_metrics.len() as f32;
        }

        let key_concepts = knowledge.key_concepts(0.7);
        if key_concepts.is_empty() {
            return 0.5;
        }
        let covered = key_concepts
            .iter()
            .filter(|concept| elements.iter().any(|e| contains_ci(&e.content, concept)))
            .count();
        covered as f32 / key_concepts.len() as f32
    }

    /// Mean of structural consistency (section references resolving to real
    /// elements) and logical consistency (calculations appearing after facts).
    fn consistency(&self, candidate: &SolutionCandidate) -> f32 {
        let elements = &candidate.content.elements;
        if elements.is_empty() {
            return 0.5;
        }

        let sections = &candidate.content.sections;
        let structural = if sections.is_empty() {
            0.5
        } else {
            let element_ids: std::collections::HashSet<&str> =
                elements.iter().map(|e| e.id.as_str()).collect();
            let referenced: Vec<&str> = sections
                .iter()
                .flat_map(|s| s.element_ids.iter().map(String::as_str))
                .collect();
            if referenced.is_empty() {
                0.0
            } else {
                let valid = referenced
                    .iter()
                    .filter(|id| element_ids.contains(*id))
                    .count();
                valid as f32 / referenced.len() as f32
            }
        };

        let factual_count = elements.iter().filter(|e| e.kind.is_factual()).count();
        let logical = if factual_count > 1 {
            let first_fact = elements.iter().position(|e| e.kind == ElementKind::Fact);
            let first_calc = elements
                .iter()
                .position(|e| e.kind == ElementKind::Calculation);
            let ordered = match (first_fact, first_calc) {
                (Some(fact), Some(calc)) => calc > fact,
                _ => true,
            };
            if ordered {
                0.8
            } else {
                0.5
            }
        } else {
            0.7
        };

        (structural + logical) / 2.0
    }

    /// Blend of direct term coverage, focus on the query vocabulary, and the
    /// Bayesian mutual-information signal.
    fn relevance(
        &self,
        candidate: &SolutionCandidate,
        intent: &QueryIntent,
        bayesian: &BayesianMetrics,
    ) -> f32 {
        let mutual_information = bayesian.mutual_information;
        let elements = &candidate.content.elements;
        if intent.components.is_empty() || elements.is_empty() {
            return mutual_information;
        }

        let terms = intent.all_key_terms();
        if terms.is_empty() {
            return mutual_information;
        }

        let relevant = elements
            .iter()
            .filter(|e| contains_any_ci(&e.content, &terms))
            .count();

        let direct = relevant as f32 / elements.len() as f32;
        let distinct_terms = intent.distinct_key_terms().len();
        let focused = (relevant as f32 / distinct_terms as f32).min(1.0);

        0.3 * direct + 0.3 * focused + 0.4 * mutual_information
    }

    /// Explicit insights plus elements connecting two or more domain
    /// concepts. Insignificant totals are zeroed outright.
    fn novelty(&self, candidate: &SolutionCandidate, knowledge: &DomainKnowledge) -> f32 {
        let elements = &candidate.content.elements;
        if elements.is_empty() {
            return 0.0;
        }

        let explicit = if candidate.insights.is_empty() {
            0.0
        } else {
            (candidate.insights.len() as f32 / 5.0).min(1.0) * 0.7
        };

        let connection = if knowledge.elements.is_empty() {
            0.0
        } else {
            let concepts = knowledge.concepts();
            let dual = elements
                .iter()
                .filter(|e| {
                    let hits = concepts
                        .iter()
                        .filter(|c| contains_ci(&e.content, c))
                        .count();
                    hits >= 2
                })
                .count();
            let reference = (elements.len() as f32 / 4.0).max(1.0);
            (dual as f32 / reference).min(1.0) * 0.3
        };

        let score = explicit + connection;
        if score > self.config.novelty_threshold {
            score
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::solution::{
        IntentComponent, KnowledgeElement, Section, SolutionContent, SolutionElement,
    };

    fn assessor() -> DimensionAssessor {
        DimensionAssessor::new(AssessorConfig::default())
    }

    fn fact_element(id: &str, content: &str) -> SolutionElement {
        SolutionElement::new(id, ElementKind::Fact, content)
    }

    #[test]
    fn accuracy_scores_supported_facts() {
        let candidate = SolutionCandidate {
            content: SolutionContent {
                elements: vec![
                    fact_element("e1", "maximal oxygen uptake rises with training"),
                    fact_element("e2", "the moon is made of cheese entirely"),
                ],
                sections: Vec::new(),
            },
            insights: Vec::new(),
        };
        let knowledge = DomainKnowledge {
            elements: vec![KnowledgeElement::fact(
                "maximal oxygen uptake rises with training",
            )],
        };
        let score = assessor().accuracy(&candidate, &knowledge, &BayesianMetrics::default());
        assert!((score - 0.5).abs() < 1e-6);
    }

    #[test]
    fn accuracy_falls_back_to_likelihood_without_typed_elements() {
        let candidate = SolutionCandidate {
            content: SolutionContent {
                elements: vec![SolutionElement::new("e1", ElementKind::Other, "prose")],
                sections: Vec::new(),
            },
            insights: Vec::new(),
        };
        let knowledge = DomainKnowledge {
            elements: vec![KnowledgeElement::fact("anything")],
        };
        let bayesian = BayesianMetrics {
            likelihood: 0.42,
            ..Default::default()
        };
        let score = assessor().accuracy(&candidate, &knowledge, &bayesian);
        assert!((score - 0.42).abs() < 1e-6);
    }

    #[test]
    fn completeness_prefers_required_metrics() {
        let candidate = SolutionCandidate {
            content: SolutionContent {
                elements: vec![fact_element("e1", "the vo2 max reading was high")],
                sections: Vec::new(),
            },
            insights: Vec::new(),
        };
        let intent = QueryIntent {
            required_metrics: vec!["vo2 max".into(), "lactate threshold".into()],
            ..Default::default()
        };
        let score = assessor().completeness(&candidate, &DomainKnowledge::default(), &intent);
        assert!((score - 0.5).abs() < 1e-6);
    }

    #[test]
    fn consistency_penalizes_calculations_before_facts() {
        let ordered = SolutionCandidate {
            content: SolutionContent {
                elements: vec![
                    fact_element("e1", "baseline fact"),
                    SolutionElement::new("e2", ElementKind::Calculation, "derived value"),
                ],
                sections: Vec::new(),
            },
            insights: Vec::new(),
        };
        let inverted = SolutionCandidate {
            content: SolutionContent {
                elements: vec![
                    SolutionElement::new("e1", ElementKind::Calculation, "derived value"),
                    fact_element("e2", "baseline fact"),
                ],
                sections: Vec::new(),
            },
            insights: Vec::new(),
        };
        // No sections: structural stays at 0.5 in both cases.
        assert!((assessor().consistency(&ordered) - 0.65).abs() < 1e-6);
        assert!((assessor().consistency(&inverted) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn consistency_checks_section_references() {
        let candidate = SolutionCandidate {
            content: SolutionContent {
                elements: vec![fact_element("e1", "fact")],
                sections: vec![Section {
                    id: "s1".into(),
                    title: "Overview".into(),
                    element_ids: vec!["e1".into(), "missing".into()],
                }],
            },
            insights: Vec::new(),
        };
        // structural 0.5 (1 of 2 resolves), logical 0.7 (single factual element)
        assert!((assessor().consistency(&candidate) - 0.6).abs() < 1e-6);
    }

    #[test]
    fn novelty_zeroed_below_threshold() {
        let candidate = SolutionCandidate {
            content: SolutionContent {
                elements: vec![fact_element("e1", "plain restatement")],
                sections: Vec::new(),
            },
            insights: vec!["one insight".into()],
        };
        // explicit = 0.2 * 0.7 = 0.14, below the 0.3 cutoff
        let score = assessor().novelty(&candidate, &DomainKnowledge::default());
        assert_eq!(score, 0.0);
    }

    #[test]
    fn novelty_counts_concept_connections() {
        let candidate = SolutionCandidate {
            content: SolutionContent {
                elements: vec![fact_element(
                    "e1",
                    "stroke volume interacts with heart rate under load",
                )],
                sections: Vec::new(),
            },
            insights: vec!["a".into(), "b".into(), "c".into(), "d".into(), "e".into()],
        };
        let knowledge = DomainKnowledge {
            elements: vec![
                KnowledgeElement::fact("x").with_concept("stroke volume"),
                KnowledgeElement::fact("y").with_concept("heart rate"),
            ],
        };
        let score = assessor().novelty(&candidate, &knowledge);
        // explicit 0.7 + connection 0.3 (1 dual element / max(1, 0.25))
        assert!((score - 1.0).abs() < 1e-6);
    }

    #[test]
    fn relevance_blends_direct_focused_and_mutual_information() {
        let mut components = BTreeMap::new();
        components.insert(
            "power".to_string(),
            IntentComponent {
                key_terms: vec!["watts".into(), "output".into()],
            },
        );
        let intent = QueryIntent {
            components,
            ..Default::default()
        };
        let candidate = SolutionCandidate {
            content: SolutionContent {
                elements: vec![
                    fact_element("e1", "sustained 300 watts"),
                    fact_element("e2", "unrelated remark"),
                ],
                sections: Vec::new(),
            },
            insights: Vec::new(),
        };
        let bayesian = BayesianMetrics {
            mutual_information: 0.5,
            ..Default::default()
        };
        let score = assessor().relevance(&candidate, &intent, &bayesian);
        // direct 0.5, focused 0.5, mi 0.5
        assert!((score - 0.5).abs() < 1e-6);
    }
}
