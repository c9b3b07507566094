//! Removes dominated and low-quality components under safety limits, then
//! restructures the remaining content.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::scoring::{DimensionWeights, QualityDimension};
use crate::utils::text::{contains_ci, word_jaccard};

use super::{CandidateResponse, ParetoAnalysis, ResponseComponent};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PrunerConfig {
    /// Components below this weighted quality are pruning candidates even
    /// when not dominated.
    pub min_quality_threshold: f32,
    /// Upper bound on the fraction of components removed in one pass.
    pub max_pruning_fraction: f32,
    pub conservative: bool,
    /// Token-Jaccard overlap at which a protected component counts as
    /// redundant with retained content and becomes safe to prune.
    pub content_overlap_threshold: f32,
    pub protected_keywords: Vec<String>,
}

impl Default for PrunerConfig {
    fn default() -> Self {
        Self {
            min_quality_threshold: 0.4,
            max_pruning_fraction: 0.5,
            conservative: true,
            content_overlap_threshold: 0.7,
            protected_keywords: [
                "conclusion",
                "summary",
                "recommendation",
                "diagnosis",
                "analysis",
                "key finding",
                "critical",
                "essential",
                "vital",
                "crucial",
            ]
            .iter()
            .map(|k| k.to_string())
            .collect(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PruningOutcome {
    pub pruned_ids: Vec<String>,
    pub original_count: usize,
    pub remaining_count: usize,
    pub pruning_ratio: f32,
}

pub struct ComponentPruner {
    config: PrunerConfig,
    weights: DimensionWeights,
}

impl ComponentPruner {
    pub fn new(config: PrunerConfig, weights: DimensionWeights) -> Self {
        Self { config, weights }
    }

    pub fn prune(
        &self,
        response: &CandidateResponse,
        pareto: &ParetoAnalysis,
    ) -> (CandidateResponse, PruningOutcome) {
        let total = response.component_count();
        if total == 0 {
            return (response.clone(), PruningOutcome::default());
        }

        let low_quality: BTreeSet<String> = response
            .components
            .iter()
            .filter(|c| self.overall_quality(c) < self.config.min_quality_threshold)
            .map(|c| c.id.clone())
            .collect();

        let mut candidates: BTreeSet<String> =
            pareto.dominated.union(&low_quality).cloned().collect();

        candidates = self.apply_fraction_cap(&response.components, candidates, total);

        if self.config.conservative {
            candidates = self.rescue_protected(&response.components, candidates);
        }

        if candidates.is_empty() {
            debug!("No components selected for pruning");
            return (
                response.clone(),
                PruningOutcome {
                    pruned_ids: Vec::new(),
                    original_count: total,
                    remaining_count: total,
                    pruning_ratio: 0.0,
                },
            );
        }

        let pruned = self.remove_components(response, &candidates);
        let outcome = PruningOutcome {
            pruned_ids: response
                .components
                .iter()
                .filter(|c| candidates.contains(&c.id))
                .map(|c| c.id.clone())
                .collect(),
            original_count: total,
            remaining_count: pruned.component_count(),
            pruning_ratio: candidates.len() as f32 / total as f32,
        };
        info!(
            pruned = outcome.pruned_ids.len(),
            remaining = outcome.remaining_count,
            "Component pruning complete"
        );
        (pruned, outcome)
    }

    /// Weighted mean of the component's objective scores.
    fn overall_quality(&self, component: &ResponseComponent) -> f32 {
        let mut weighted_sum = 0.0;
        let mut weight_sum = 0.0;
        for (dimension, score) in &component.objective_scores {
            let weight = self.weights.get(*dimension);
            weighted_sum += score * weight;
            weight_sum += weight;
        }
        if weight_sum > 0.0 {
            weighted_sum / weight_sum
        } else {
            0.0
        }
    }

    /// When candidates exceed the pruning budget, keep only the
    /// lowest-quality ones up to the cap.
    fn apply_fraction_cap(
        &self,
        components: &[ResponseComponent],
        candidates: BTreeSet<String>,
        total: usize,
    ) -> BTreeSet<String> {
        if candidates.len() as f32 / total as f32 <= self.config.max_pruning_fraction {
            return candidates;
        }
        info!(
            candidates = candidates.len(),
            "Too many components selected for pruning, limiting to the budget"
        );

        let max_to_prune = (total as f32 * self.config.max_pruning_fraction) as usize;
        let mut ranked: Vec<(usize, &ResponseComponent)> = components
            .iter()
            .enumerate()
            .filter(|(_, c)| candidates.contains(&c.id))
            .collect();
        ranked.sort_by(|(ia, a), (ib, b)| {
            self.overall_quality(a)
                .partial_cmp(&self.overall_quality(b))
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(ia.cmp(ib))
        });
        ranked
            .into_iter()
            .take(max_to_prune)
            .map(|(_, c)| c.id.clone())
            .collect()
    }

    /// Conservative mode: protected components (keyword or high relevance)
    /// survive unless their content is redundant with something already
    /// retained.
    fn rescue_protected(
        &self,
        components: &[ResponseComponent],
        mut candidates: BTreeSet<String>,
    ) -> BTreeSet<String> {
        let mut retained: Vec<&ResponseComponent> = components
            .iter()
            .filter(|c| !candidates.contains(&c.id))
            .collect();

        for component in components {
            if !candidates.contains(&component.id) {
                continue;
            }
            let protected = self.contains_protected_keyword(component)
                || component.score(QualityDimension::Relevance) > 0.8;
            if !protected {
                continue;
            }

            let redundant = retained.iter().any(|r| {
                word_jaccard(&component.content, &r.content)
                    >= self.config.content_overlap_threshold
            });
            if !redundant {
                debug!(component = %component.id, "Preserving protected component");
                candidates.remove(&component.id);
                retained.push(component);
            }
        }
        candidates
    }

    fn contains_protected_keyword(&self, component: &ResponseComponent) -> bool {
        self.config
            .protected_keywords
            .iter()
            .any(|keyword| contains_ci(&component.content, keyword))
    }

    fn remove_components(
        &self,
        response: &CandidateResponse,
        to_prune: &BTreeSet<String>,
    ) -> CandidateResponse {
        let components: Vec<ResponseComponent> = response
            .components
            .iter()
            .filter(|c| !to_prune.contains(&c.id))
            .cloned()
            .collect();

        // Rebuild the full text from surviving components in original order.
        let content = components
            .iter()
            .map(|c| c.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");

        let component_order = response
            .component_order
            .iter()
            .filter(|id| !to_prune.contains(*id))
            .cloned()
            .collect();

        CandidateResponse {
            content,
            components,
            component_order,
            quality_metrics: response.quality_metrics,
        }
    }
}
