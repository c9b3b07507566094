//! Multi-objective verification: threshold gate, Pareto pruning of redundant
//! content, and final response assembly.

mod finalizer;
mod pareto;
mod pruner;
mod response;
mod thresholds;

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

pub use finalizer::{
    FinalResponse, FinalizerConfig, OptimizationMetrics, ResponseFinalizer, ResponseMetadata,
    ResponseSummary, VerificationMetadata, VerificationStatus,
};
pub use pareto::{
    DominanceRelation, ParetoAnalysis, ParetoConfig, ParetoOptimizer, ParetoSummary,
};
pub use pruner::{ComponentPruner, PrunerConfig, PruningOutcome};
pub use response::{CandidateResponse, ResponseComponent};
pub use thresholds::{DimensionFailure, ThresholdVerifier, VerificationReport, VerifierConfig};

use crate::config::EngineConfig;
use crate::error::{Result, VeritorError};
use crate::pipeline::{PipelineStage, SessionContext, StageOutput};
use crate::scoring::{QualityDimension, SCORING_STAGE_ID};

pub const VERIFICATION_STAGE_ID: &str = "threshold_verification";

/// Structured payload for a strict-mode verification failure. A first-class
/// branch of the pipeline, not an error: the orchestrator decides whether to
/// stop or force another refinement round.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationFailure {
    pub response: CandidateResponse,
    pub report: VerificationReport,
    pub recommendations: BTreeMap<QualityDimension, String>,
}

/// Outcome of the verification stage: either a finalized response or a
/// structured strict-mode failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "outcome", content = "value")]
pub enum VerificationOutcome {
    Finalized(FinalResponse),
    Failed(VerificationFailure),
}

impl VerificationOutcome {
    pub fn passed(&self) -> bool {
        matches!(self, Self::Finalized(r) if r.metadata.verification_status == VerificationStatus::Passed)
    }

    pub fn overall_score(&self) -> f32 {
        match self {
            Self::Finalized(r) => r.final_quality_score,
            Self::Failed(f) => f.report.overall_score,
        }
    }
}

/// Pipeline stage chaining threshold verification, Pareto optimization,
/// pruning, and finalization.
pub struct VerificationService {
    verifier: ThresholdVerifier,
    optimizer: ParetoOptimizer,
    pruner: ComponentPruner,
    finalizer: ResponseFinalizer,
    strict: bool,
    enable_pruning: bool,
}

impl VerificationService {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            verifier: ThresholdVerifier::new(config.verifier.clone()),
            optimizer: ParetoOptimizer::new(config.pareto.clone()),
            pruner: ComponentPruner::new(config.pruner.clone(), config.verifier.weights),
            finalizer: ResponseFinalizer::new(config.finalizer.clone()),
            strict: config.verifier.strict,
            enable_pruning: config.verifier.enable_pruning,
        }
    }

    /// Run the full verification chain on an assembled response.
    pub fn verify(&self, response: CandidateResponse) -> VerificationOutcome {
        let report = self.verifier.verify(&response.quality_metrics);

        if !report.passes && self.strict {
            warn!(summary = %report.summary(), "Response failed strict verification");
            let recommendations = report
                .dimension_failures
                .iter()
                .map(|(dimension, failure)| {
                    (
                        *dimension,
                        ThresholdVerifier::improvement_recommendation(*dimension, failure),
                    )
                })
                .collect();
            return VerificationOutcome::Failed(VerificationFailure {
                response,
                report,
                recommendations,
            });
        }

        let pareto = self.optimizer.analyze(&response.components);

        let (pruned, pruning) = if self.enable_pruning {
            self.pruner.prune(&response, &pareto)
        } else {
            (response, PruningOutcome::default())
        };

        let final_response = self.finalizer.finalize(pruned, &report, &pareto, pruning);
        info!(
            passed = report.passes,
            score = final_response.final_quality_score,
            "Verification chain complete"
        );
        VerificationOutcome::Finalized(final_response)
    }

    fn response_from_context(&self, ctx: &SessionContext) -> Result<CandidateResponse> {
        let assessment = ctx
            .assessment()
            .ok_or_else(|| VeritorError::StageOutputNotFound(SCORING_STAGE_ID.to_string()))?;
        let candidate = ctx.candidate().cloned().unwrap_or_default();
        Ok(CandidateResponse::from_candidate(
            &candidate,
            &assessment.scores,
            self.optimizer.objectives(),
        ))
    }
}

#[async_trait]
impl PipelineStage for VerificationService {
    fn stage_id(&self) -> &'static str {
        VERIFICATION_STAGE_ID
    }

    async fn process(&self, _prompt: &str, ctx: &mut SessionContext) -> Result<StageOutput> {
        let response = self.response_from_context(ctx)?;
        Ok(StageOutput::Final(Box::new(self.verify(response))))
    }

    async fn refine(
        &self,
        prompt: &str,
        ctx: &mut SessionContext,
        _previous: &StageOutput,
    ) -> Result<StageOutput> {
        // Verification is deterministic; refinement is a plain re-run against
        // whatever candidate is now in the session.
        self.process(prompt, ctx).await
    }
}
