//! Input data model for the evaluation core.
//!
//! A solution candidate arrives from the upstream generation stage; domain
//! knowledge and query intent arrive from their own upstream stages. All three
//! are read-only once evaluation starts.

mod candidate;
mod intent;
mod knowledge;

pub use candidate::{ElementKind, Section, SolutionCandidate, SolutionContent, SolutionElement};
pub use intent::{IntentComponent, QueryIntent};
pub use knowledge::{DomainKnowledge, KnowledgeElement};
