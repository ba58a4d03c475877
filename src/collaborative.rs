//! User-based candidate generation.
//!
//! Finds the users closest to the querying user in the embedding space and
//! aggregates their preference lists into a ranked candidate slate: titles
//! the querying user already likes are excluded, and the remaining names are
//! ranked by how many similar users listed them.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::catalog::AnimeCatalog;
use crate::embedding::EmbeddingStore;
use crate::error::Result;
use crate::preferences::user_preferences;
use crate::ratings::RatingTable;
use crate::types::{SimilarUser, UserId};

/// The `n` users most similar to `user_id`, descending by cosine
/// similarity. Unknown users are a typed error for the caller to surface.
pub fn find_similar_users(
    store: &EmbeddingStore,
    user_id: UserId,
    n: usize,
) -> Result<Vec<SimilarUser>> {
    let ranked = store.similar_to(user_id, n, true)?;
    Ok(ranked
        .into_iter()
        .map(|(user_id, similarity)| SimilarUser {
            user_id,
            similarity,
        })
        .collect())
}

/// Stage A of the hybrid pipeline: deduplicated candidate names ranked by
/// how many similar users prefer them, ties broken by first-seen order,
/// truncated to `limit`.
///
/// Unknown `user_id` propagates as the request's only fatal error. Similar
/// users with no usable preferences simply contribute nothing.
pub fn user_based_candidates(
    store: &EmbeddingStore,
    ratings: &RatingTable,
    catalog: &AnimeCatalog,
    user_id: UserId,
    n_similar: usize,
    percentile: f64,
    limit: usize,
) -> Result<Vec<String>> {
    let similar_users = store.similar_to(user_id, n_similar, true)?;

    let own: HashSet<String> = user_preferences(user_id, ratings, catalog, percentile)
        .into_iter()
        .collect();

    // name -> (contributor count, first-seen rank)
    let mut counts: HashMap<String, (usize, usize)> = HashMap::new();
    let mut next_rank = 0usize;

    for (similar_id, _similarity) in &similar_users {
        for name in user_preferences(*similar_id, ratings, catalog, percentile) {
            if own.contains(&name) {
                continue;
            }
            counts
                .entry(name)
                .and_modify(|(count, _)| *count += 1)
                .or_insert_with(|| {
                    let rank = next_rank;
                    next_rank += 1;
                    (1, rank)
                });
        }
    }

    let mut ranked: Vec<(String, (usize, usize))> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1 .0.cmp(&a.1 .0).then(a.1 .1.cmp(&b.1 .1)));
    ranked.truncate(limit);

    debug!(
        user_id,
        similar_users = similar_users.len(),
        candidates = ranked.len(),
        "user-based candidate generation"
    );

    Ok(ranked.into_iter().map(|(name, _)| name).collect())
}
