//! Pareto analysis of response components: partitions them into a
//! non-dominated frontier and a dominated set across the configured
//! objectives.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::scoring::QualityDimension;

use super::ResponseComponent;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ParetoConfig {
    pub objectives: Vec<QualityDimension>,
    /// Tolerance band for dominance comparisons.
    pub dominance_threshold: f32,
}

impl Default for ParetoConfig {
    fn default() -> Self {
        Self {
            objectives: vec![
                QualityDimension::Accuracy,
                QualityDimension::Completeness,
                QualityDimension::Consistency,
                QualityDimension::Relevance,
            ],
            dominance_threshold: 0.1,
        }
    }
}

/// One proven dominance pair, with the mean positive advantage and the
/// objectives that produced it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DominanceRelation {
    pub dominant: String,
    pub dominated: String,
    pub strength: f32,
    pub objectives: Vec<QualityDimension>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParetoSummary {
    pub frontier_size: usize,
    pub dominated_size: usize,
    pub frontier_avg_scores: BTreeMap<QualityDimension, f32>,
    pub dominated_avg_scores: BTreeMap<QualityDimension, f32>,
    /// Per-objective relative gain of frontier over dominated components;
    /// `f32::INFINITY` marks a zero dominated mean against a nonzero frontier
    /// mean. The `overall` value averages the finite gains.
    pub efficiency_gain: BTreeMap<QualityDimension, f32>,
    pub overall_efficiency_gain: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParetoAnalysis {
    pub frontier: BTreeSet<String>,
    pub dominated: BTreeSet<String>,
    pub relationships: Vec<DominanceRelation>,
    pub objectives: Vec<QualityDimension>,
    pub summary: ParetoSummary,
}

impl ParetoAnalysis {
    /// Explicit marker for "nothing to analyze". Never an error.
    pub fn empty(objectives: Vec<QualityDimension>) -> Self {
        Self {
            frontier: BTreeSet::new(),
            dominated: BTreeSet::new(),
            relationships: Vec::new(),
            objectives,
            summary: ParetoSummary::default(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.frontier.is_empty() && self.dominated.is_empty()
    }
}

pub struct ParetoOptimizer {
    config: ParetoConfig,
}

impl ParetoOptimizer {
    pub fn new(config: ParetoConfig) -> Self {
        Self { config }
    }

    pub fn objectives(&self) -> &[QualityDimension] {
        &self.config.objectives
    }

    pub fn analyze(&self, components: &[ResponseComponent]) -> ParetoAnalysis {
        if components.is_empty() {
            warn!("No components available for Pareto analysis");
            return ParetoAnalysis::empty(self.config.objectives.clone());
        }

        let (frontier, dominated) = self.partition(components);
        let relationships = self.relationships(components);
        let summary = self.summarize(components, &frontier, &dominated);

        debug!(
            frontier = frontier.len(),
            dominated = dominated.len(),
            "Pareto analysis complete"
        );

        ParetoAnalysis {
            frontier,
            dominated,
            relationships,
            objectives: self.config.objectives.clone(),
            summary,
        }
    }

    /// True when `a` is at least as good as `b` on every objective (within
    /// the tolerance band) and strictly better on at least one.
    pub fn dominates(&self, a: &ResponseComponent, b: &ResponseComponent) -> bool {
        let eps = self.config.dominance_threshold;
        let mut strictly_better = false;
        for objective in &self.config.objectives {
            let score_a = a.score(*objective);
            let score_b = b.score(*objective);
            if score_a < score_b - eps {
                return false;
            }
            if score_a > score_b + eps {
                strictly_better = true;
            }
        }
        strictly_better
    }

    fn partition(
        &self,
        components: &[ResponseComponent],
    ) -> (BTreeSet<String>, BTreeSet<String>) {
        let mut frontier: BTreeSet<String> =
            components.iter().map(|c| c.id.clone()).collect();
        let mut dominated = BTreeSet::new();

        if components.len() <= 1 {
            return (frontier, dominated);
        }

        for candidate in components {
            if dominated.contains(&candidate.id) {
                continue;
            }
            for other in components {
                if other.id == candidate.id {
                    continue;
                }
                if self.dominates(other, candidate) {
                    dominated.insert(candidate.id.clone());
                    frontier.remove(&candidate.id);
                    break;
                }
            }
        }

        // Self-repair: anything proven neither way lands in the frontier so
        // the partition always covers every component exactly once.
        for component in components {
            if !frontier.contains(&component.id) && !dominated.contains(&component.id) {
                frontier.insert(component.id.clone());
            }
        }

        (frontier, dominated)
    }

    fn relationships(&self, components: &[ResponseComponent]) -> Vec<DominanceRelation> {
        let eps = self.config.dominance_threshold;
        let mut relationships = Vec::new();

        for a in components {
            for b in components {
                if a.id == b.id || !self.dominates(a, b) {
                    continue;
                }
                let mut advantage_sum = 0.0;
                let mut objectives = Vec::new();
                for objective in &self.config.objectives {
                    let advantage = a.score(*objective) - b.score(*objective);
                    advantage_sum += advantage.max(0.0);
                    if advantage > eps {
                        objectives.push(*objective);
                    }
                }
                let strength = advantage_sum / self.config.objectives.len().max(1) as f32;
                relationships.push(DominanceRelation {
                    dominant: a.id.clone(),
                    dominated: b.id.clone(),
                    strength,
                    objectives,
                });
            }
        }

        relationships.sort_by(|a, b| {
            b.strength
                .partial_cmp(&a.strength)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        relationships
    }

    fn summarize(
        &self,
        components: &[ResponseComponent],
        frontier: &BTreeSet<String>,
        dominated: &BTreeSet<String>,
    ) -> ParetoSummary {
        let mut frontier_avg = BTreeMap::new();
        let mut dominated_avg = BTreeMap::new();

        for objective in &self.config.objectives {
            let frontier_mean = Self::mean_score(components, frontier, *objective);
            let dominated_mean = Self::mean_score(components, dominated, *objective);
            frontier_avg.insert(*objective, frontier_mean);
            dominated_avg.insert(*objective, dominated_mean);
        }

        let mut efficiency_gain = BTreeMap::new();
        for objective in &self.config.objectives {
            let frontier_mean = frontier_avg[objective];
            let dominated_mean = dominated_avg[objective];
            let gain = if dominated_mean > 0.0 {
                frontier_mean / dominated_mean - 1.0
            } else if frontier_mean == 0.0 {
                0.0
            } else {
                f32::INFINITY
            };
            efficiency_gain.insert(*objective, gain);
        }

        let finite: Vec<f32> = efficiency_gain
            .values()
            .copied()
            .filter(|g| g.is_finite())
            .collect();
        let overall_efficiency_gain = if finite.is_empty() {
            0.0
        } else {
            finite.iter().sum::<f32>() / finite.len() as f32
        };

        ParetoSummary {
            frontier_size: frontier.len(),
            dominated_size: dominated.len(),
            frontier_avg_scores: frontier_avg,
            dominated_avg_scores: dominated_avg,
            efficiency_gain,
            overall_efficiency_gain,
        }
    }

    fn mean_score(
        components: &[ResponseComponent],
        ids: &BTreeSet<String>,
        objective: QualityDimension,
    ) -> f32 {
        if ids.is_empty() {
            return 0.0;
        }
        let sum: f32 = components
            .iter()
            .filter(|c| ids.contains(&c.id))
            .map(|c| c.score(objective))
            .sum();
        sum / ids.len() as f32
    }
}
