use std::collections::HashSet;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum ElementKind {
    Fact,
    Formula,
    Calculation,
    Assertion,
    #[default]
    Other,
}

impl ElementKind {
    /// Fact-bearing kinds participate in logical-consistency ordering checks.
    pub fn is_factual(&self) -> bool {
        matches!(self, Self::Fact | Self::Assertion | Self::Calculation)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolutionElement {
    pub id: String,
    #[serde(default)]
    pub kind: ElementKind,
    /// Formula elements carry the formula name used for domain matching.
    #[serde(default)]
    pub name: Option<String>,
    pub content: String,
}

impl SolutionElement {
    pub fn new(id: impl Into<String>, kind: ElementKind, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind,
            name: None,
            content: content.into(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Section {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub element_ids: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SolutionContent {
    #[serde(default)]
    pub elements: Vec<SolutionElement>,
    #[serde(default)]
    pub sections: Vec<Section>,
}

/// A candidate answer produced by the upstream generation stage.
/// Immutable once handed to the evaluation core; each refinement round
/// replaces it wholesale.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SolutionCandidate {
    #[serde(default)]
    pub content: SolutionContent,
    #[serde(default)]
    pub insights: Vec<String>,
}

impl SolutionCandidate {
    /// Best-effort stand-in for a failed generation call. Enters the scoring
    /// chain like any other candidate and scores accordingly low.
    pub fn degraded(reason: impl Into<String>) -> Self {
        Self {
            content: SolutionContent {
                elements: vec![SolutionElement::new(
                    "degraded",
                    ElementKind::Other,
                    reason,
                )],
                sections: Vec::new(),
            },
            insights: Vec::new(),
        }
    }

    pub fn element_count(&self) -> usize {
        self.content.elements.len()
    }

    pub fn section_count(&self) -> usize {
        self.content.sections.len()
    }

    /// Number of distinct element kinds present.
    pub fn kind_variety(&self) -> usize {
        self.content
            .elements
            .iter()
            .map(|e| e.kind)
            .collect::<HashSet<_>>()
            .len()
    }

    /// Element contents joined in original order.
    pub fn joined_content(&self) -> String {
        self.content
            .elements
            .iter()
            .map(|e| e.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}
