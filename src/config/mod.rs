//! Configuration types and loading.
//!
//! Component-specific configs live next to their components; this module
//! aggregates them into `EngineConfig` with validation and toml load/save.

mod settings;

pub use settings::{EngineConfig, PipelineConfig};
