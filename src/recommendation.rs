//! Hybrid recommendation pipeline.
//!
//! Three stages per request: user-based candidate generation over the user
//! embedding table, content-based expansion of those candidates over the
//! anime embedding table, and a weighted additive merge of both name lists.
//! The merge is the scoring core: every user-based occurrence adds
//! `user_weight`, every content-based occurrence adds `content_weight`, and
//! the accumulated totals are ranked with ties broken by first insertion
//! order.

use std::collections::HashMap;
use std::path::Path;

use tracing::{debug, info, instrument};

use crate::catalog::AnimeCatalog;
use crate::collaborative::{find_similar_users, user_based_candidates};
use crate::config::{ArtifactPaths, EngineConfig};
use crate::content_based::{content_expansion, find_similar_animes};
use crate::embedding::{EmbeddingStore, EntityKind};
use crate::error::Result;
use crate::preferences::user_preferences;
use crate::ratings::RatingTable;
use crate::types::{AnimeId, SimilarAnime, SimilarUser, UserId};

/// Weighted additive merge of the two candidate lists.
///
/// The score table is freshly allocated per call; nothing is shared between
/// requests. No normalization is applied: a name seen once in the user list
/// and three times in the content list scores
/// `user_weight + 3 * content_weight`, so repetition acts as a density
/// signal.
fn merge_candidates(
    user_names: &[String],
    content_names: &[String],
    user_weight: f32,
    content_weight: f32,
    top_k: usize,
) -> Vec<String> {
    // name -> (accumulated score, first insertion rank)
    let mut scores: HashMap<&str, (f32, usize)> = HashMap::new();
    let mut next_rank = 0usize;

    for (names, weight) in [(user_names, user_weight), (content_names, content_weight)] {
        for name in names {
            scores
                .entry(name.as_str())
                .and_modify(|(score, _)| *score += weight)
                .or_insert_with(|| {
                    let rank = next_rank;
                    next_rank += 1;
                    (weight, rank)
                });
        }
    }

    let mut ranked: Vec<(&str, (f32, usize))> = scores.into_iter().collect();
    // Score descending; equal scores keep first insertion order.
    ranked.sort_by(|a, b| {
        b.1 .0
            .partial_cmp(&a.1 .0)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.1 .1.cmp(&b.1 .1))
    });
    ranked.truncate(top_k);

    ranked.into_iter().map(|(name, _)| name.to_string()).collect()
}

/// The assembled engine: read-only embedding tables, rating log, and
/// catalog behind one request interface.
///
/// Construction happens once at process start; afterwards every method is a
/// pure function of its arguments and the immutable tables, so the engine
/// can be shared across threads without locking.
pub struct RecommenderEngine {
    config: EngineConfig,
    user_store: EmbeddingStore,
    anime_store: EmbeddingStore,
    ratings: RatingTable,
    catalog: AnimeCatalog,
}

impl RecommenderEngine {
    pub fn new(
        config: EngineConfig,
        user_store: EmbeddingStore,
        anime_store: EmbeddingStore,
        ratings: RatingTable,
        catalog: AnimeCatalog,
    ) -> Self {
        Self {
            config,
            user_store,
            anime_store,
            ratings,
            catalog,
        }
    }

    /// Load every artifact named by `paths` and assemble the engine.
    /// Any failure here is fatal for the process, not for a request.
    pub fn load(paths: &ArtifactPaths, config: EngineConfig) -> Result<Self> {
        let user_store = EmbeddingStore::load(EntityKind::User, &paths.user_embeddings)?;
        let anime_store = EmbeddingStore::load(EntityKind::Anime, &paths.anime_embeddings)?;
        let ratings = RatingTable::load_csv(&paths.ratings_csv)?;
        let catalog = AnimeCatalog::load(&paths.anime_csv, &paths.synopsis_csv)?;

        info!(
            users = user_store.len(),
            animes = anime_store.len(),
            ratings = ratings.len(),
            titles = catalog.len(),
            "recommendation engine assembled"
        );

        Ok(Self::new(config, user_store, anime_store, ratings, catalog))
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn catalog(&self) -> &AnimeCatalog {
        &self.catalog
    }

    /// Convenience loader for a conventional artifact directory layout.
    pub fn load_from_dir(dir: &Path, config: EngineConfig) -> Result<Self> {
        Self::load(&ArtifactPaths::from_dir(dir), config)
    }

    /// The full three-stage hybrid pipeline.
    ///
    /// The only fatal condition is `user_id` missing from the user
    /// embedding table; every interior miss degrades to an empty
    /// contribution. An empty result is a valid outcome, distinct from
    /// not-found.
    #[instrument(skip(self))]
    pub fn hybrid_recommendations(
        &self,
        user_id: UserId,
        user_weight: f32,
        content_weight: f32,
        top_k: usize,
    ) -> Result<Vec<String>> {
        // Stage A: user-based candidates.
        let user_names = user_based_candidates(
            &self.user_store,
            &self.ratings,
            &self.catalog,
            user_id,
            self.config.similar_users,
            self.config.preference_percentile,
            self.config.max_candidates,
        )?;

        // Stage B: content expansion of every Stage A name, in order.
        let content_names = content_expansion(
            &self.anime_store,
            &self.catalog,
            &user_names,
            self.config.similar_animes,
        );

        // Stage C: weighted merge.
        let merged = merge_candidates(
            &user_names,
            &content_names,
            user_weight,
            content_weight,
            top_k,
        );

        debug!(
            user_id,
            user_candidates = user_names.len(),
            content_candidates = content_names.len(),
            merged = merged.len(),
            "hybrid recommendation complete"
        );

        Ok(merged)
    }

    /// Hybrid pipeline with the configured default weights and size.
    pub fn recommend(&self, user_id: UserId) -> Result<Vec<String>> {
        self.hybrid_recommendations(
            user_id,
            self.config.default_user_weight,
            self.config.default_content_weight,
            self.config.default_top_k,
        )
    }

    pub fn similar_users(&self, user_id: UserId, n: usize) -> Result<Vec<SimilarUser>> {
        find_similar_users(&self.user_store, user_id, n)
    }

    pub fn similar_animes(&self, anime_id: AnimeId, n: usize) -> Result<Vec<SimilarAnime>> {
        find_similar_animes(&self.anime_store, &self.catalog, anime_id, n)
    }

    /// The querying user's own preference list (see [`crate::preferences`]).
    pub fn user_preferences(&self, user_id: UserId) -> Vec<String> {
        user_preferences(
            user_id,
            &self.ratings,
            &self.catalog,
            self.config.preference_percentile,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_merge_is_exactly_additive() {
        // "Y" once in the user list, three times in the content list.
        let merged = merge_candidates(
            &names(&["Y"]),
            &names(&["Y", "Y", "Y", "W"]),
            0.5,
            0.25,
            10,
        );
        assert_eq!(merged[0], "Y");

        // Verify the accumulated totals through ordering: Y = 0.5 + 3*0.25
        // = 1.25 beats W = 0.25.
        let merged = merge_candidates(&names(&["W"]), &names(&["Y", "Y", "Y"]), 0.5, 0.25, 10);
        // W = 0.5, Y = 0.75 -> Y first.
        assert_eq!(merged, names(&["Y", "W"]));
    }

    #[test]
    fn test_merge_blends_both_sources() {
        // A name in both lists accumulates both weights and overtakes a
        // name seen only once in either.
        let merged = merge_candidates(
            &names(&["A", "B"]),
            &names(&["B", "C"]),
            0.5,
            0.5,
            10,
        );
        assert_eq!(merged, names(&["B", "A", "C"]));
    }

    #[test]
    fn test_merge_ties_break_by_first_insertion() {
        let merged = merge_candidates(&names(&["A", "B"]), &names(&["C"]), 0.5, 0.5, 10);
        assert_eq!(merged, names(&["A", "B", "C"]));
    }

    #[test]
    fn test_merge_truncates_and_never_pads() {
        let merged = merge_candidates(&names(&["A", "B", "C"]), &names(&[]), 0.5, 0.5, 2);
        assert_eq!(merged.len(), 2);

        let merged = merge_candidates(&names(&["A", "B", "C"]), &names(&[]), 0.5, 0.5, 10);
        assert_eq!(merged.len(), 3);
    }

    #[test]
    fn test_merge_zero_weights() {
        // All-zero scores still produce a deterministic first-seen order.
        let merged = merge_candidates(&names(&["A"]), &names(&["B"]), 0.0, 0.0, 10);
        assert_eq!(merged, names(&["A", "B"]));
    }

    #[test]
    fn test_merge_empty_inputs() {
        assert!(merge_candidates(&[], &[], 0.5, 0.5, 10).is_empty());
    }
}
