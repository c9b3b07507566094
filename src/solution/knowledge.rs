use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::ElementKind;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeElement {
    pub content: String,
    /// Importance weight assigned by the knowledge stage.
    #[serde(default = "default_importance")]
    pub importance: f32,
    #[serde(default)]
    pub kind: ElementKind,
    #[serde(default)]
    pub concept: Option<String>,
    /// Formula text for formula-kind elements.
    #[serde(default)]
    pub formula: Option<String>,
    /// Formula name for formula-kind elements.
    #[serde(default)]
    pub name: Option<String>,
}

fn default_importance() -> f32 {
    0.5
}

impl KnowledgeElement {
    pub fn fact(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            importance: default_importance(),
            kind: ElementKind::Fact,
            concept: None,
            formula: None,
            name: None,
        }
    }

    pub fn with_importance(mut self, importance: f32) -> Self {
        self.importance = importance;
        self
    }

    pub fn with_concept(mut self, concept: impl Into<String>) -> Self {
        self.concept = Some(concept.into());
        self
    }
}

/// Read-only domain knowledge supplied by the upstream knowledge stage.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DomainKnowledge {
    #[serde(default)]
    pub elements: Vec<KnowledgeElement>,
}

impl DomainKnowledge {
    /// Concepts carried by elements above the importance cutoff.
    pub fn key_concepts(&self, min_importance: f32) -> Vec<&str> {
        self.elements
            .iter()
            .filter(|e| e.importance > min_importance)
            .filter_map(|e| e.concept.as_deref())
            .collect()
    }

    /// All concepts regardless of importance.
    pub fn concepts(&self) -> Vec<&str> {
        self.elements
            .iter()
            .filter_map(|e| e.concept.as_deref())
            .collect()
    }

    /// Formula texts of formula-kind elements.
    pub fn formula_texts(&self) -> Vec<&str> {
        self.elements
            .iter()
            .filter(|e| e.kind == ElementKind::Formula)
            .filter_map(|e| e.formula.as_deref())
            .collect()
    }

    /// Named formulas of formula-kind elements, keyed by name.
    pub fn named_formulas(&self) -> BTreeMap<&str, &str> {
        self.elements
            .iter()
            .filter(|e| e.kind == ElementKind::Formula)
            .filter_map(|e| match (e.name.as_deref(), e.formula.as_deref()) {
                (Some(name), Some(formula)) => Some((name, formula)),
                _ => None,
            })
            .collect()
    }

    /// Fact contents.
    pub fn fact_contents(&self) -> Vec<&str> {
        self.elements
            .iter()
            .filter(|e| e.kind == ElementKind::Fact)
            .map(|e| e.content.as_str())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_concepts_filters_by_importance() {
        let knowledge = DomainKnowledge {
            elements: vec![
                KnowledgeElement::fact("vo2 max is aerobic capacity")
                    .with_importance(0.9)
                    .with_concept("vo2 max"),
                KnowledgeElement::fact("minor detail")
                    .with_importance(0.3)
                    .with_concept("trivia"),
            ],
        };
        assert_eq!(knowledge.key_concepts(0.7), vec!["vo2 max"]);
        assert_eq!(knowledge.concepts().len(), 2);
    }

    #[test]
    fn named_formulas_require_name_and_text() {
        let mut element = KnowledgeElement::fact("formula");
        element.kind = ElementKind::Formula;
        element.formula = Some("vo2 = q * (a - v)".into());
        let knowledge = DomainKnowledge {
            elements: vec![element],
        };
        // Missing name keeps it out of the named map but not the text list.
        assert!(knowledge.named_formulas().is_empty());
        assert_eq!(knowledge.formula_texts().len(), 1);
    }
}
