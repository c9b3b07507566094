//! Bounded refinement loop: score the candidate, send it back to generation
//! with feedback while it falls short, then always run the verification
//! chain on whatever candidate the loop settled on.

use std::collections::BTreeMap;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{Result, VeritorError};
use crate::scoring::{
    QualityAssessment, QualityDimension, RefinementAnalysis, ScoringService, SCORING_STAGE_ID,
};
use crate::solution::SolutionCandidate;
use crate::verification::{VerificationOutcome, VerificationService};

use super::{PipelineStage, SessionContext, StageOutput};

/// Wall-clock duration of one stage invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageMetrics {
    pub stage_id: String,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefinementRound {
    pub iteration: u32,
    pub weighted_score: f32,
    pub needs_refinement: bool,
    pub feedback: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ScoreChange {
    pub previous: f32,
    pub current: f32,
    pub change: f32,
}

/// Before/after deltas across the whole refinement loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefinementChanges {
    pub dimension_changes: BTreeMap<QualityDimension, ScoreChange>,
    pub overall_score_change: f32,
    pub improvement_summary: String,
}

impl RefinementChanges {
    fn between(first: &QualityAssessment, last: &QualityAssessment) -> Self {
        let dimension_changes: BTreeMap<QualityDimension, ScoreChange> = QualityDimension::ALL
            .iter()
            .map(|d| {
                let previous = first.scores.get(*d);
                let current = last.scores.get(*d);
                (
                    *d,
                    ScoreChange {
                        previous,
                        current,
                        change: current - previous,
                    },
                )
            })
            .collect();

        let improvement_summary = Self::summarize(&dimension_changes);

        Self {
            dimension_changes,
            overall_score_change: last.overall_score - first.overall_score,
            improvement_summary,
        }
    }

    fn summarize(changes: &BTreeMap<QualityDimension, ScoreChange>) -> String {
        let improvements: Vec<String> = changes
            .iter()
            .filter(|(_, c)| c.change > 0.05)
            .map(|(d, c)| format!("{} (+{:.2})", d, c.change))
            .collect();
        let regressions: Vec<String> = changes
            .iter()
            .filter(|(_, c)| c.change < -0.05)
            .map(|(d, c)| format!("{} ({:.2})", d, c.change))
            .collect();

        match (improvements.is_empty(), regressions.is_empty()) {
            (false, true) => format!("Improved in {}", improvements.join(", ")),
            (true, false) => format!("Regressed in {}", regressions.join(", ")),
            (false, false) => format!(
                "Mixed changes: Improved in {}; Regressed in {}",
                improvements.join(", "),
                regressions.join(", ")
            ),
            (true, true) => "No significant changes in quality dimensions".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefinementHistory {
    pub rounds: Vec<RefinementRound>,
    pub changes: RefinementChanges,
}

/// Everything one pipeline run produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineResult {
    pub outcome: VerificationOutcome,
    pub assessment: QualityAssessment,
    /// Present when the loop executed at least one refinement round.
    pub history: Option<RefinementHistory>,
    pub metrics: Vec<StageMetrics>,
}

/// Orchestrates generation, scoring, and verification for one request.
pub struct ControlLoop {
    generation: Box<dyn PipelineStage>,
    scoring: ScoringService,
    verification: VerificationService,
    max_iterations: u32,
}

impl ControlLoop {
    pub fn new(
        generation: Box<dyn PipelineStage>,
        scoring: ScoringService,
        verification: VerificationService,
        max_iterations: u32,
    ) -> Self {
        Self {
            generation,
            scoring,
            verification,
            max_iterations,
        }
    }

    pub async fn run(&self, prompt: &str, ctx: &mut SessionContext) -> Result<PipelineResult> {
        self.run_with_deadline(prompt, ctx, None).await
    }

    /// Run with an optional wall-clock deadline. The deadline is checked at
    /// loop boundaries only: a running scoring pass is never interrupted, and
    /// the current candidate is always pushed through verification.
    pub async fn run_with_deadline(
        &self,
        prompt: &str,
        ctx: &mut SessionContext,
        deadline: Option<Instant>,
    ) -> Result<PipelineResult> {
        let mut metrics = Vec::new();

        // Generation failures become a degraded candidate instead of
        // crashing the loop; the scoring chain handles it like any other.
        let gen_start = Instant::now();
        let candidate_output = match self.generation.process(prompt, ctx).await {
            Ok(output) if output.as_candidate().is_ok() => output,
            Ok(output) => {
                warn!(kind = output.kind(), "Generation stage produced unexpected output");
                StageOutput::Candidate(SolutionCandidate::degraded(format!(
                    "generation produced {} output",
                    output.kind()
                )))
            }
            Err(e) => {
                warn!(error = %e, "Generation stage failed; scoring degraded candidate");
                StageOutput::Candidate(SolutionCandidate::degraded(e.to_string()))
            }
        };
        Self::record(&mut metrics, self.generation.stage_id(), gen_start);
        ctx.insert_output(self.generation.stage_id(), candidate_output);

        let score_start = Instant::now();
        let mut assessment_output = self.scoring.process(prompt, ctx).await?;
        Self::record(&mut metrics, SCORING_STAGE_ID, score_start);
        let mut assessment = assessment_output.as_assessment()?.clone();
        ctx.insert_output(SCORING_STAGE_ID, assessment_output.clone());

        let first_assessment = assessment.clone();
        let mut rounds = Vec::new();

        while assessment.needs_refinement {
            if ctx.iteration_count >= self.max_iterations {
                info!(
                    iterations = ctx.iteration_count,
                    "Refinement iteration cap reached; proceeding to verification"
                );
                break;
            }
            if let Some(deadline) = deadline {
                if Instant::now() >= deadline {
                    warn!("Deadline reached; finalizing current candidate as best effort");
                    break;
                }
            }

            let feedback = build_refinement_prompt(&assessment.refinement);
            debug!(iteration = ctx.iteration_count + 1, "Requesting refinement");

            let previous_candidate = ctx
                .output(self.generation.stage_id())
                .cloned()
                .ok_or_else(|| {
                    VeritorError::StageOutputNotFound(self.generation.stage_id().to_string())
                })?;

            let gen_start = Instant::now();
            let refined = match self.generation.refine(&feedback, ctx, &previous_candidate).await {
                Ok(output) if output.as_candidate().is_ok() => output,
                Ok(output) => {
                    warn!(
                        kind = output.kind(),
                        "Refinement produced unexpected output; keeping current candidate"
                    );
                    break;
                }
                Err(e) => {
                    warn!(error = %e, "Refinement failed; keeping current candidate");
                    break;
                }
            };
            Self::record(&mut metrics, self.generation.stage_id(), gen_start);

            ctx.iteration_count += 1;
            ctx.insert_output(self.generation.stage_id(), refined);

            let score_start = Instant::now();
            let rescored = self.scoring.refine(prompt, ctx, &assessment_output).await?;
            Self::record(&mut metrics, SCORING_STAGE_ID, score_start);
            assessment = rescored.as_assessment()?.clone();
            ctx.insert_output(SCORING_STAGE_ID, rescored.clone());
            assessment_output = rescored;

            rounds.push(RefinementRound {
                iteration: ctx.iteration_count,
                weighted_score: assessment.overall_score,
                needs_refinement: assessment.needs_refinement,
                feedback,
            });
        }

        // Verification, pruning, and finalization run regardless of whether
        // the candidate was ever accepted.
        let verify_start = Instant::now();
        let final_output = self.verification.process(prompt, ctx).await?;
        Self::record(&mut metrics, self.verification.stage_id(), verify_start);

        let outcome = match final_output {
            StageOutput::Final(outcome) => *outcome,
            other => {
                return Err(VeritorError::UnexpectedStageOutput {
                    expected: "final".to_string(),
                    actual: other.kind().to_string(),
                })
            }
        };

        let history = (ctx.iteration_count > 0).then(|| RefinementHistory {
            changes: RefinementChanges::between(&first_assessment, &assessment),
            rounds,
        });

        info!(
            session = %ctx.session_id,
            iterations = ctx.iteration_count,
            accepted = !assessment.needs_refinement,
            passed_verification = outcome.passed(),
            "Pipeline run complete"
        );

        Ok(PipelineResult {
            outcome,
            assessment,
            history,
            metrics,
        })
    }

    fn record(metrics: &mut Vec<StageMetrics>, stage_id: &str, start: Instant) {
        metrics.push(StageMetrics {
            stage_id: stage_id.to_string(),
            duration_ms: start.elapsed().as_millis() as u64,
        });
    }
}

/// Renders the analyzer's suggestions into the feedback prompt handed to the
/// generation stage's `refine`.
pub fn build_refinement_prompt(analysis: &RefinementAnalysis) -> String {
    let mut lines =
        vec!["Refine the previous answer to address the following quality issues:".to_string()];
    for suggestion in &analysis.suggestions {
        let target = suggestion
            .dimension
            .map(|d| d.as_str())
            .unwrap_or("overall");
        lines.push(format!(
            "- [{target}] {} (expected improvement {:.2})",
            suggestion.message, suggestion.expected_improvement
        ));
    }
    lines.push(format!(
        "Current weighted quality score: {:.2} (acceptance threshold {:.2})",
        analysis.weighted_score, analysis.accept_threshold
    ));
    lines.join("\n")
}
