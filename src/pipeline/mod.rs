//! Stage contract and the refinement control loop.

mod context;
mod control;
mod stage;

pub use context::SessionContext;
pub use control::{
    build_refinement_prompt, ControlLoop, PipelineResult, RefinementChanges, RefinementHistory,
    RefinementRound, ScoreChange, StageMetrics,
};
pub use stage::{PipelineStage, StageOutput};
