use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{Result, VeritorError};
use crate::scoring::QualityAssessment;
use crate::solution::{DomainKnowledge, QueryIntent, SolutionCandidate};
use crate::verification::VerificationOutcome;

use super::SessionContext;

/// Output of a pipeline stage. A closed set: stages exchange typed values,
/// not free-form maps.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "value")]
pub enum StageOutput {
    Candidate(SolutionCandidate),
    Knowledge(DomainKnowledge),
    Intent(QueryIntent),
    Assessment(Box<QualityAssessment>),
    Final(Box<VerificationOutcome>),
}

impl StageOutput {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Candidate(_) => "candidate",
            Self::Knowledge(_) => "knowledge",
            Self::Intent(_) => "intent",
            Self::Assessment(_) => "assessment",
            Self::Final(_) => "final",
        }
    }

    pub fn as_candidate(&self) -> Result<&SolutionCandidate> {
        match self {
            Self::Candidate(candidate) => Ok(candidate),
            other => Err(VeritorError::UnexpectedStageOutput {
                expected: "candidate".to_string(),
                actual: other.kind().to_string(),
            }),
        }
    }

    pub fn as_assessment(&self) -> Result<&QualityAssessment> {
        match self {
            Self::Assessment(assessment) => Ok(assessment),
            other => Err(VeritorError::UnexpectedStageOutput {
                expected: "assessment".to_string(),
                actual: other.kind().to_string(),
            }),
        }
    }
}

/// Contract every pipeline stage implements. `process` runs the stage from
/// scratch; `refine` re-runs it with feedback and access to the previous
/// output. The evaluation core's own stages are synchronous inside; the async
/// boundary exists for stages that call external collaborators.
#[async_trait]
pub trait PipelineStage: Send + Sync {
    fn stage_id(&self) -> &'static str;

    async fn process(&self, prompt: &str, ctx: &mut SessionContext) -> Result<StageOutput>;

    async fn refine(
        &self,
        prompt: &str,
        ctx: &mut SessionContext,
        previous: &StageOutput,
    ) -> Result<StageOutput>;
}
