use std::path::Path;

use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::error::{Result, VeritorError};
use crate::scoring::{
    AssessorConfig, BayesianConfig, QualityDimension, RefinementConfig, UncertaintyConfig,
};
use crate::verification::{FinalizerConfig, ParetoConfig, PrunerConfig, VerifierConfig};

fn validate_ratio(errors: &mut Vec<String>, value: f32, name: &str) {
    if !(0.0..=1.0).contains(&value) {
        errors.push(format!("{} must be between 0.0 and 1.0, got {}", name, value));
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Hard cap on refinement rounds per request. The loop always terminates:
    /// once the cap is reached the current candidate proceeds to verification
    /// as a best-effort result.
    pub max_refinement_iterations: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_refinement_iterations: 3,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub bayesian: BayesianConfig,
    pub assessor: AssessorConfig,
    pub uncertainty: UncertaintyConfig,
    pub refinement: RefinementConfig,
    pub verifier: VerifierConfig,
    pub pareto: ParetoConfig,
    pub pruner: PrunerConfig,
    pub finalizer: FinalizerConfig,
    pub pipeline: PipelineConfig,
}

impl EngineConfig {
    pub async fn load(config_dir: &Path) -> Result<Self> {
        let config_path = config_dir.join("veritor.toml");
        let config = if config_path.exists() {
            let content = fs::read_to_string(&config_path).await?;
            toml::from_str(&content)?
        } else {
            Self::default()
        };
        config.validate()?;
        Ok(config)
    }

    pub async fn save(&self, config_dir: &Path) -> Result<()> {
        self.validate()?;
        let config_path = config_dir.join("veritor.toml");
        let content =
            toml::to_string_pretty(self).map_err(|e| VeritorError::Config(e.to_string()))?;
        fs::write(&config_path, content).await?;
        Ok(())
    }

    /// Validate configuration values for consistency and safety.
    pub fn validate(&self) -> Result<()> {
        let mut errors = Vec::new();

        validate_ratio(&mut errors, self.bayesian.prior_weight, "bayesian.prior_weight");
        if !(0.0..0.5).contains(&self.bayesian.smoothing_factor) {
            errors.push(format!(
                "bayesian.smoothing_factor must be in [0.0, 0.5), got {}",
                self.bayesian.smoothing_factor
            ));
        }
        validate_ratio(
            &mut errors,
            self.bayesian.information_gain_weight,
            "bayesian.information_gain_weight",
        );
        validate_ratio(
            &mut errors,
            self.bayesian.mutual_information_threshold,
            "bayesian.mutual_information_threshold",
        );

        validate_ratio(
            &mut errors,
            self.assessor.fact_similarity_threshold,
            "assessor.fact_similarity_threshold",
        );
        validate_ratio(
            &mut errors,
            self.assessor.novelty_threshold,
            "assessor.novelty_threshold",
        );

        if !(0.0..=1.0).contains(&self.uncertainty.confidence_level) {
            errors.push("uncertainty.confidence_level must be between 0.0 and 1.0".to_string());
        }
        if self.uncertainty.min_confidence_margin > self.uncertainty.max_confidence_margin {
            errors.push(
                "uncertainty.min_confidence_margin must not exceed max_confidence_margin"
                    .to_string(),
            );
        }
        for dimension in QualityDimension::ALL {
            let prior = self.uncertainty.variance_priors.get(dimension);
            if !(0.0..=0.25).contains(&prior) || prior == 0.0 {
                errors.push(format!(
                    "uncertainty.variance_priors.{} must be in (0.0, 0.25], got {}",
                    dimension, prior
                ));
            }
        }

        for dimension in QualityDimension::ALL {
            validate_ratio(
                &mut errors,
                self.refinement.thresholds.get(dimension),
                &format!("refinement.thresholds.{dimension}"),
            );
            if self.refinement.weights.get(dimension) < 0.0 {
                errors.push(format!("refinement.weights.{dimension} must not be negative"));
            }
            validate_ratio(
                &mut errors,
                self.verifier.quality_thresholds.get(dimension),
                &format!("verifier.quality_thresholds.{dimension}"),
            );
        }
        validate_ratio(
            &mut errors,
            self.refinement.uncertainty_penalty,
            "refinement.uncertainty_penalty",
        );
        validate_ratio(
            &mut errors,
            self.refinement.accept_threshold,
            "refinement.accept_threshold",
        );
        if self.refinement.max_refinement_items == 0 {
            errors.push("refinement.max_refinement_items must be greater than 0".to_string());
        }

        validate_ratio(&mut errors, self.verifier.tolerance, "verifier.tolerance");
        if self.verifier.required_dimensions.is_empty() {
            errors.push("verifier.required_dimensions must not be empty".to_string());
        }

        if self.pareto.objectives.is_empty() {
            errors.push("pareto.objectives must not be empty".to_string());
        }
        validate_ratio(
            &mut errors,
            self.pareto.dominance_threshold,
            "pareto.dominance_threshold",
        );

        validate_ratio(
            &mut errors,
            self.pruner.min_quality_threshold,
            "pruner.min_quality_threshold",
        );
        validate_ratio(
            &mut errors,
            self.pruner.max_pruning_fraction,
            "pruner.max_pruning_fraction",
        );
        validate_ratio(
            &mut errors,
            self.pruner.content_overlap_threshold,
            "pruner.content_overlap_threshold",
        );

        if self.pipeline.max_refinement_iterations == 0 {
            errors.push("pipeline.max_refinement_iterations must be greater than 0".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(VeritorError::Config(errors.join("; ")))
        }
    }
}
