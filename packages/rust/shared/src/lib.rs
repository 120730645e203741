//! Shared types, error model, and configuration for Leadscout.
//!
//! This crate is the foundation depended on by all other Leadscout crates.
//! It provides:
//! - [`LeadscoutError`] — the unified error type
//! - Domain types ([`EventDescription`], [`CandidateProfile`], [`ScoredCandidate`], [`RunId`])
//! - Configuration ([`AppConfig`], [`PipelineConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, GeminiConfig, LinkdConfig, PipelineConfig, PipelineSettings, config_dir,
    config_file_path, init_config, load_config, load_config_from, resolve_api_key,
    validate_api_keys,
};
pub use error::{LeadscoutError, Result};
pub use types::{
    CandidateProfile, EventDescription, KeywordSet, QualityVerdict, RunId, ScoredCandidate,
};
