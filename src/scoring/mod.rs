//! Response scoring: Bayesian evaluation, dimension assessment, uncertainty
//! quantification, and refinement analysis, composed into one pipeline stage.

mod bayesian;
mod dimensions;
mod refinement;
mod uncertainty;

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

pub use bayesian::{BayesianConfig, BayesianEvaluator, BayesianMetrics};
pub use dimensions::{
    AssessorConfig, DimensionAssessor, DimensionScores, DimensionThresholds, DimensionWeights,
    QualityDimension,
};
pub use refinement::{
    DimensionAnalysis, RefinementAnalysis, RefinementAnalyzer, RefinementConfig,
    RefinementPriority, RefinementSuggestion, Severity,
};
pub use uncertainty::{
    DimensionUncertainty, UncertaintyConfig, UncertaintyQuantifier, UncertaintyReport,
    VariancePriors,
};

use crate::config::EngineConfig;
use crate::error::Result;
use crate::pipeline::{PipelineStage, SessionContext, StageOutput};
use crate::solution::{DomainKnowledge, QueryIntent, SolutionCandidate};

pub const SCORING_STAGE_ID: &str = "response_scoring";

/// Score deltas between two assessments of the same session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImprovementDeltas {
    pub dimensions: BTreeMap<QualityDimension, f32>,
    pub average: f32,
}

impl ImprovementDeltas {
    pub fn between(previous: &DimensionScores, current: &DimensionScores) -> Self {
        let dimensions: BTreeMap<QualityDimension, f32> = QualityDimension::ALL
            .iter()
            .map(|d| (*d, current.get(*d) - previous.get(*d)))
            .collect();
        let average = dimensions.values().sum::<f32>() / dimensions.len() as f32;
        Self {
            dimensions,
            average,
        }
    }
}

/// Full quality assessment of one solution candidate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityAssessment {
    pub bayesian: BayesianMetrics,
    pub scores: DimensionScores,
    pub uncertainty: UncertaintyReport,
    pub refinement: RefinementAnalysis,
    pub overall_score: f32,
    pub needs_refinement: bool,
    /// Present only on re-evaluations after a refinement round.
    pub improvement: Option<ImprovementDeltas>,
}

/// Pipeline stage running the scoring chain. The chain itself is pure and
/// synchronous; the stage boundary adapts it to the pipeline contract.
pub struct ScoringService {
    evaluator: BayesianEvaluator,
    assessor: DimensionAssessor,
    quantifier: UncertaintyQuantifier,
    analyzer: RefinementAnalyzer,
}

impl ScoringService {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            evaluator: BayesianEvaluator::new(config.bayesian.clone()),
            assessor: DimensionAssessor::new(config.assessor.clone()),
            quantifier: UncertaintyQuantifier::new(config.uncertainty.clone()),
            analyzer: RefinementAnalyzer::new(config.refinement.clone()),
        }
    }

    /// Run the full scoring chain on one candidate.
    pub fn evaluate(
        &self,
        candidate: &SolutionCandidate,
        knowledge: &DomainKnowledge,
        intent: &QueryIntent,
    ) -> QualityAssessment {
        let bayesian = self.evaluator.evaluate(candidate, knowledge, intent);
        let scores = self.assessor.assess(candidate, knowledge, intent, &bayesian);
        let uncertainty = self.quantifier.quantify(candidate, &scores, &bayesian);
        let refinement = self.analyzer.analyze(&scores, &uncertainty);

        let overall_score = refinement.weighted_score;
        let needs_refinement = refinement.needs_refinement;
        info!(
            overall_score,
            needs_refinement,
            posterior = bayesian.posterior,
            "Solution evaluation complete"
        );

        QualityAssessment {
            bayesian,
            scores,
            uncertainty,
            refinement,
            overall_score,
            needs_refinement,
            improvement: None,
        }
    }

    fn assess_from_context(&self, ctx: &SessionContext) -> QualityAssessment {
        let candidate = ctx.candidate().cloned().unwrap_or_else(|| {
            warn!("No candidate in session context; scoring an empty solution");
            SolutionCandidate::default()
        });
        let knowledge = ctx.knowledge().cloned().unwrap_or_default();
        let intent = ctx.intent().cloned().unwrap_or_default();
        self.evaluate(&candidate, &knowledge, &intent)
    }
}

#[async_trait]
impl PipelineStage for ScoringService {
    fn stage_id(&self) -> &'static str {
        SCORING_STAGE_ID
    }

    async fn process(&self, _prompt: &str, ctx: &mut SessionContext) -> Result<StageOutput> {
        let assessment = self.assess_from_context(ctx);
        Ok(StageOutput::Assessment(Box::new(assessment)))
    }

    /// Re-evaluate after a refinement round, attaching per-dimension deltas
    /// against the previous assessment.
    async fn refine(
        &self,
        _prompt: &str,
        ctx: &mut SessionContext,
        previous: &StageOutput,
    ) -> Result<StageOutput> {
        let mut assessment = self.assess_from_context(ctx);
        if let Ok(previous) = previous.as_assessment() {
            let deltas = ImprovementDeltas::between(&previous.scores, &assessment.scores);
            info!(
                average_improvement = deltas.average,
                "Refined solution re-evaluated"
            );
            assessment.improvement = Some(deltas);
        }
        Ok(StageOutput::Assessment(Box::new(assessment)))
    }
}
