use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::scoring::{DimensionScores, QualityDimension};
use crate::solution::SolutionCandidate;

/// Unit of the verification stage: one element of the response (or the whole
/// response synthesized into a single component) plus its objective scores.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseComponent {
    pub id: String,
    pub content: String,
    pub objective_scores: BTreeMap<QualityDimension, f32>,
}

impl ResponseComponent {
    pub fn score(&self, objective: QualityDimension) -> f32 {
        self.objective_scores.get(&objective).copied().unwrap_or(0.0)
    }
}

/// The scored response as it enters verification: full text, ordered
/// components, and the response-level quality metrics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateResponse {
    pub content: String,
    pub components: Vec<ResponseComponent>,
    pub component_order: Vec<String>,
    pub quality_metrics: DimensionScores,
}

impl CandidateResponse {
    /// Assemble from a scored candidate. Components inherit the
    /// response-level dimension scores projected onto the objective set;
    /// element-level scoring is a future upstream concern.
    pub fn from_candidate(
        candidate: &SolutionCandidate,
        scores: &DimensionScores,
        objectives: &[QualityDimension],
    ) -> Self {
        let objective_scores: BTreeMap<QualityDimension, f32> = objectives
            .iter()
            .map(|o| (*o, scores.get(*o)))
            .collect();

        let components: Vec<ResponseComponent> = candidate
            .content
            .elements
            .iter()
            .map(|element| ResponseComponent {
                id: element.id.clone(),
                content: element.content.clone(),
                objective_scores: objective_scores.clone(),
            })
            .collect();

        let component_order = components.iter().map(|c| c.id.clone()).collect();

        Self {
            content: candidate.joined_content(),
            components,
            component_order,
            quality_metrics: *scores,
        }
    }

    pub fn component_count(&self) -> usize {
        self.components.len()
    }
}
