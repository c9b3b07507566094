use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IntentComponent {
    #[serde(default)]
    pub key_terms: Vec<String>,
}

/// Parsed intent of the user query, produced by the query-processing stage.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryIntent {
    #[serde(default)]
    pub components: BTreeMap<String, IntentComponent>,
    #[serde(default)]
    pub required_metrics: Vec<String>,
    #[serde(default)]
    pub constraints: Vec<String>,
}

impl QueryIntent {
    /// Every key term across all components, in component order.
    pub fn all_key_terms(&self) -> Vec<String> {
        self.components
            .values()
            .flat_map(|c| c.key_terms.iter().cloned())
            .collect()
    }

    /// Key terms deduplicated case-insensitively, preserving first occurrence.
    pub fn distinct_key_terms(&self) -> Vec<String> {
        let mut seen = std::collections::HashSet::new();
        let mut terms = Vec::new();
        for term in self.all_key_terms() {
            if seen.insert(term.to_lowercase()) {
                terms.push(term);
            }
        }
        terms
    }

    pub fn component_count(&self) -> usize {
        self.components.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distinct_key_terms_dedupes_case_insensitively() {
        let mut components = BTreeMap::new();
        components.insert(
            "a".to_string(),
            IntentComponent {
                key_terms: vec!["VO2".into(), "endurance".into()],
            },
        );
        components.insert(
            "b".to_string(),
            IntentComponent {
                key_terms: vec!["vo2".into(), "threshold".into()],
            },
        );
        let intent = QueryIntent {
            components,
            ..Default::default()
        };
        assert_eq!(intent.all_key_terms().len(), 4);
        assert_eq!(intent.distinct_key_terms().len(), 3);
    }
}
