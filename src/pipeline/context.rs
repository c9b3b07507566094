use std::collections::HashMap;
use std::sync::Arc;

use uuid::Uuid;

use crate::config::EngineConfig;
use crate::scoring::QualityAssessment;
use crate::solution::{DomainKnowledge, QueryIntent, SolutionCandidate};

use super::StageOutput;

/// Per-request working memory. Owned exclusively by one in-flight request;
/// a new context is created at request start and discarded at request end.
#[derive(Debug)]
pub struct SessionContext {
    pub session_id: Uuid,
    pub config: Arc<EngineConfig>,
    pub iteration_count: u32,
    stage_outputs: HashMap<String, StageOutput>,
}

impl SessionContext {
    pub fn new(config: Arc<EngineConfig>) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            config,
            iteration_count: 0,
            stage_outputs: HashMap::new(),
        }
    }

    pub fn insert_output(&mut self, stage_id: impl Into<String>, output: StageOutput) {
        self.stage_outputs.insert(stage_id.into(), output);
    }

    pub fn output(&self, stage_id: &str) -> Option<&StageOutput> {
        self.stage_outputs.get(stage_id)
    }

    /// The current solution candidate, wherever the generation stage stored
    /// it. At most one stage produces candidates per session.
    pub fn candidate(&self) -> Option<&SolutionCandidate> {
        self.stage_outputs.values().find_map(|o| match o {
            StageOutput::Candidate(c) => Some(c),
            _ => None,
        })
    }

    pub fn knowledge(&self) -> Option<&DomainKnowledge> {
        self.stage_outputs.values().find_map(|o| match o {
            StageOutput::Knowledge(k) => Some(k),
            _ => None,
        })
    }

    pub fn intent(&self) -> Option<&QueryIntent> {
        self.stage_outputs.values().find_map(|o| match o {
            StageOutput::Intent(i) => Some(i),
            _ => None,
        })
    }

    pub fn assessment(&self) -> Option<&QualityAssessment> {
        self.stage_outputs.values().find_map(|o| match o {
            StageOutput::Assessment(a) => Some(a),
            _ => None,
        }).map(|v| &**v)
    }
}
