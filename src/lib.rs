pub mod config;
pub mod error;
pub mod pipeline;
pub mod scoring;
pub mod solution;
pub mod utils;
pub mod verification;

pub use config::EngineConfig;
pub use error::{Result, VeritorError};
pub use pipeline::{ControlLoop, PipelineResult, PipelineStage, SessionContext, StageOutput};
pub use scoring::{
    BayesianMetrics, DimensionScores, QualityAssessment, QualityDimension, ScoringService,
};
pub use solution::{DomainKnowledge, QueryIntent, SolutionCandidate};
pub use verification::{
    FinalResponse, ParetoAnalysis, VerificationOutcome, VerificationReport, VerificationService,
};
