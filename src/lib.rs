//! Hybrid anime recommendation engine.
//!
//! Blends collaborative filtering (users close in a learned embedding
//! space) with content-based expansion (anime close in the same space) into
//! a single weighted ranking. The engine consumes four read-only artifacts
//! produced by an external training pipeline: a user embedding table, an
//! anime embedding table, a processed rating log, and the anime metadata /
//! synopsis catalog.

pub mod catalog;
pub mod collaborative;
pub mod config;
pub mod content_based;
pub mod embedding;
pub mod error;
pub mod preferences;
pub mod ratings;
pub mod recommendation;
pub mod types;

// Re-export key types
pub use catalog::AnimeCatalog;
pub use collaborative::{find_similar_users, user_based_candidates};
pub use config::{ArtifactPaths, ConfigLoader, EngineConfig, ServiceSettings};
pub use content_based::{content_expansion, find_similar_animes, find_similar_by_name};
pub use embedding::{EmbeddingStore, EmbeddingTableArtifact, EntityKind};
pub use error::{Error, Result};
pub use preferences::{user_preferences, DEFAULT_PERCENTILE};
pub use ratings::{IdEncoding, RatingTable, DEFAULT_MIN_RATINGS_PER_USER};
pub use recommendation::RecommenderEngine;
pub use types::*;

#[cfg(test)]
mod tests;
