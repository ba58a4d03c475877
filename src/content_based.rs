//! Content-based similarity and expansion.
//!
//! Ranks anime by closeness in the content embedding space and joins the
//! results against the catalog for display. Stage B of the hybrid pipeline
//! expands every user-based candidate into its content neighbors, keeping
//! duplicates so titles reachable from several seeds weigh more in the
//! merge.

use tracing::{debug, warn};

use crate::catalog::AnimeCatalog;
use crate::embedding::EmbeddingStore;
use crate::error::{Error, Result};
use crate::types::{AnimeId, SimilarAnime};

/// The `n` titles most similar to `anime_id`, joined against the catalog.
///
/// Neighbors without catalog metadata are dropped with a warning; the
/// caller still gets the remaining ranked titles.
pub fn find_similar_animes(
    store: &EmbeddingStore,
    catalog: &AnimeCatalog,
    anime_id: AnimeId,
    n: usize,
) -> Result<Vec<SimilarAnime>> {
    let ranked = store.similar_to(anime_id, n, true)?;

    let mut results = Vec::with_capacity(ranked.len());
    for (id, similarity) in ranked {
        match catalog.get(id) {
            Some(anime) => results.push(SimilarAnime {
                anime_id: id,
                name: anime.name.clone(),
                similarity,
                genres: anime.genres.clone(),
                synopsis: anime.synopsis.clone(),
            }),
            None => {
                warn!(anime_id = id, "similar anime missing from catalog, dropping");
            }
        }
    }
    Ok(results)
}

/// Same lookup keyed by display name, the form the hybrid pipeline uses.
pub fn find_similar_by_name(
    store: &EmbeddingStore,
    catalog: &AnimeCatalog,
    name: &str,
    n: usize,
) -> Result<Vec<SimilarAnime>> {
    let anime_id = catalog
        .id_for_name(name)
        .ok_or_else(|| Error::UnknownAnimeName {
            name: name.to_string(),
        })?;
    find_similar_animes(store, catalog, anime_id, n)
}

/// Stage B of the hybrid pipeline: content neighbors of every seed, in seed
/// order, as one flat name list with duplicates preserved.
///
/// A seed that cannot be resolved or yields no neighbors is logged and
/// skipped; expansion never fails the request.
pub fn content_expansion(
    store: &EmbeddingStore,
    catalog: &AnimeCatalog,
    seeds: &[String],
    n_per_seed: usize,
) -> Vec<String> {
    let mut names = Vec::new();

    for seed in seeds {
        match find_similar_by_name(store, catalog, seed, n_per_seed) {
            Ok(similar) if similar.is_empty() => {
                debug!(seed = %seed, "no similar anime found, skipping seed");
            }
            Ok(similar) => {
                names.extend(similar.into_iter().map(|s| s.name));
            }
            Err(err) => {
                warn!(seed = %seed, error = %err, "content expansion failed for seed, skipping");
            }
        }
    }
    names
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::{EmbeddingStore, EmbeddingTableArtifact, EntityKind};
    use crate::types::Anime;

    fn anime_store(entries: &[(u32, Vec<f32>)]) -> EmbeddingStore {
        let dim = entries[0].1.len();
        EmbeddingStore::from_artifact(
            EntityKind::Anime,
            EmbeddingTableArtifact {
                dim,
                ids: entries.iter().map(|(id, _)| *id).collect(),
                values: entries.iter().flat_map(|(_, v)| v.clone()).collect(),
            },
        )
        .unwrap()
    }

    fn catalog_of(entries: &[(AnimeId, &str, &[&str])]) -> AnimeCatalog {
        AnimeCatalog::from_animes(
            entries
                .iter()
                .map(|&(anime_id, name, genres)| Anime {
                    anime_id,
                    name: name.to_string(),
                    genres: genres.iter().map(|g| g.to_string()).collect(),
                    score: None,
                    episodes: None,
                    kind: None,
                    premiered: None,
                    members: None,
                    synopsis: Some(format!("About {name}.")),
                })
                .collect(),
        )
    }

    #[test]
    fn test_similar_animes_joined_with_metadata() {
        let store = anime_store(&[
            (1, vec![1.0, 0.0]),
            (2, vec![0.9, 0.1]),
            (3, vec![0.0, 1.0]),
        ]);
        let catalog = catalog_of(&[
            (1, "Seed", &["Action"]),
            (2, "Close", &["Action", "Drama"]),
            (3, "Far", &["Comedy"]),
        ]);

        let similar = find_similar_animes(&store, &catalog, 1, 5).unwrap();
        assert_eq!(similar[0].name, "Close");
        assert_eq!(similar[0].genres, vec!["Action", "Drama"]);
        assert_eq!(similar[0].synopsis.as_deref(), Some("About Close."));
        assert_eq!(similar[1].name, "Far");
    }

    #[test]
    fn test_neighbors_missing_metadata_are_dropped() {
        // Id 2 is in the embedding table but not in the catalog.
        let store = anime_store(&[(1, vec![1.0, 0.0]), (2, vec![0.9, 0.1])]);
        let catalog = catalog_of(&[(1, "Seed", &[])]);

        let similar = find_similar_animes(&store, &catalog, 1, 5).unwrap();
        assert!(similar.is_empty());
    }

    #[test]
    fn test_lookup_by_unknown_name() {
        let store = anime_store(&[(1, vec![1.0, 0.0])]);
        let catalog = catalog_of(&[(1, "Seed", &[])]);

        assert!(matches!(
            find_similar_by_name(&store, &catalog, "Nope", 5),
            Err(Error::UnknownAnimeName { .. })
        ));
    }

    #[test]
    fn test_expansion_preserves_duplicates_and_skips_bad_seeds() {
        let store = anime_store(&[
            (1, vec![1.0, 0.0]),
            (2, vec![0.9, 0.1]),
            (3, vec![0.8, 0.2]),
        ]);
        let catalog = catalog_of(&[(1, "A", &[]), (2, "B", &[]), (3, "C", &[])]);

        let seeds = vec![
            "A".to_string(),
            "Missing".to_string(),
            "B".to_string(),
        ];
        let names = content_expansion(&store, &catalog, &seeds, 1);

        // A's closest is B, B's closest is A; the unknown seed is skipped.
        assert_eq!(names, vec!["B", "A"]);
    }

    #[test]
    fn test_expansion_with_no_seeds_is_empty() {
        let store = anime_store(&[(1, vec![1.0, 0.0])]);
        let catalog = catalog_of(&[(1, "A", &[])]);
        assert!(content_expansion(&store, &catalog, &[], 5).is_empty());
    }
}
