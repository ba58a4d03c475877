//! Core domain types shared across the engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// External user identifier from the rating log.
pub type UserId = u32;

/// External anime identifier from the catalog (MAL id).
pub type AnimeId = u32;

/// Catalog entry for a single title.
///
/// Built once from the metadata and synopsis tables and immutable afterwards.
/// Source fields equal to the literal string `"Unknown"` are read as missing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Anime {
    pub anime_id: AnimeId,
    /// Display name: the English title when present, the original title otherwise.
    pub name: String,
    pub genres: Vec<String>,
    /// Community score; missing titles sort last in the catalog.
    pub score: Option<f32>,
    pub episodes: Option<u32>,
    /// The dataset's "Type" column (TV, Movie, OVA, ...).
    pub kind: Option<String>,
    pub premiered: Option<String>,
    pub members: Option<u64>,
    pub synopsis: Option<String>,
}

/// One row of the processed rating table.
///
/// Ratings are min-max normalized to [0, 1] by the preprocessing pass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RatingRecord {
    pub user_id: UserId,
    pub anime_id: AnimeId,
    pub rating: f32,
}

/// A user ranked by embedding similarity to the queried user.
#[derive(Debug, Clone, Serialize)]
pub struct SimilarUser {
    pub user_id: UserId,
    pub similarity: f32,
}

/// An anime ranked by embedding similarity, joined against the catalog
/// for display.
#[derive(Debug, Clone, Serialize)]
pub struct SimilarAnime {
    pub anime_id: AnimeId,
    pub name: String,
    pub similarity: f32,
    pub genres: Vec<String>,
    pub synopsis: Option<String>,
}

/// Final hybrid recommendation payload returned by the service.
#[derive(Debug, Clone, Serialize)]
pub struct RecommendationResponse {
    pub user_id: UserId,
    /// Display names, most recommended first, at most `top_k` entries.
    pub recommendations: Vec<String>,
    pub user_weight: f32,
    pub content_weight: f32,
    pub generated_at: DateTime<Utc>,
}
