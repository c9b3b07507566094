use std::collections::BTreeMap;

use veritor::config::EngineConfig;
use veritor::scoring::{DimensionScores, QualityDimension};
use veritor::verification::{
    CandidateResponse, ResponseComponent, VerificationOutcome, VerificationService,
    VerificationStatus,
};

fn component(id: &str, content: &str, level: f32) -> ResponseComponent {
    let objectives = [
        QualityDimension::Accuracy,
        QualityDimension::Completeness,
        QualityDimension::Consistency,
        QualityDimension::Relevance,
    ];
    let objective_scores: BTreeMap<QualityDimension, f32> =
        objectives.iter().map(|o| (*o, level)).collect();
    ResponseComponent {
        id: id.to_string(),
        content: content.to_string(),
        objective_scores,
    }
}

fn passing_metrics() -> DimensionScores {
    DimensionScores {
        accuracy: 0.9,
        completeness: 0.9,
        consistency: 0.9,
        relevance: 0.9,
        novelty: 0.5,
    }
}

fn response(components: Vec<ResponseComponent>) -> CandidateResponse {
    let component_order = components.iter().map(|c| c.id.clone()).collect();
    let content = components
        .iter()
        .map(|c| c.content.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");
    CandidateResponse {
        content,
        components,
        component_order,
        quality_metrics: passing_metrics(),
    }
}

#[test]
fn dominated_component_is_pruned_and_content_rebuilt() {
    let service = VerificationService::new(&EngineConfig::default());
    let outcome = service.verify(response(vec![
        component("a", "the main analysis holds", 0.9),
        component("b", "a weaker restatement", 0.5),
    ]));

    match outcome {
        VerificationOutcome::Finalized(final_response) => {
            assert_eq!(
                final_response.metadata.verification_status,
                VerificationStatus::Passed
            );
            assert_eq!(final_response.components.len(), 1);
            assert_eq!(final_response.components[0].id, "a");
            assert_eq!(final_response.content, "the main analysis holds");

            let optimization = final_response.optimization.unwrap();
            assert_eq!(optimization.pareto_frontier_size, 1);
            assert_eq!(optimization.dominated_components_count, 1);
            assert_eq!(optimization.pruning.pruned_ids, vec!["b".to_string()]);
            assert_eq!(optimization.pruning.original_count, 2);
            assert_eq!(optimization.pruning.remaining_count, 1);
        }
        VerificationOutcome::Failed(failure) => {
            panic!("expected finalized response: {}", failure.report.summary())
        }
    }
}

#[test]
fn equivalent_components_all_survive() {
    let service = VerificationService::new(&EngineConfig::default());
    let outcome = service.verify(response(vec![
        component("a", "first angle on the question", 0.8),
        component("b", "second angle on the question", 0.8),
    ]));

    match outcome {
        VerificationOutcome::Finalized(final_response) => {
            assert_eq!(final_response.components.len(), 2);
            let optimization = final_response.optimization.unwrap();
            assert_eq!(optimization.pareto_frontier_size, 2);
            assert_eq!(optimization.dominated_components_count, 0);
            assert!(optimization.pruning.pruned_ids.is_empty());
        }
        VerificationOutcome::Failed(_) => panic!("expected finalized response"),
    }
}

#[test]
fn pruning_can_be_disabled() {
    let mut config = EngineConfig::default();
    config.verifier.enable_pruning = false;
    let service = VerificationService::new(&config);

    let outcome = service.verify(response(vec![
        component("a", "the main analysis holds", 0.9),
        component("b", "a weaker restatement", 0.5),
    ]));

    match outcome {
        VerificationOutcome::Finalized(final_response) => {
            // Dominated but untouched: pruning is off.
            assert_eq!(final_response.components.len(), 2);
            let optimization = final_response.optimization.unwrap();
            assert_eq!(optimization.dominated_components_count, 1);
            assert!(optimization.pruning.pruned_ids.is_empty());
        }
        VerificationOutcome::Failed(_) => panic!("expected finalized response"),
    }
}

#[test]
fn empty_component_set_still_finalizes() {
    let service = VerificationService::new(&EngineConfig::default());
    let outcome = service.verify(response(Vec::new()));

    match outcome {
        VerificationOutcome::Finalized(final_response) => {
            assert!(final_response.components.is_empty());
            let optimization = final_response.optimization.unwrap();
            assert_eq!(optimization.pareto_frontier_size, 0);
            assert_eq!(optimization.dominated_components_count, 0);
        }
        VerificationOutcome::Failed(_) => panic!("expected finalized response"),
    }
}
