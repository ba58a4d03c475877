//! Per-user preference extraction.
//!
//! A user's preferences are the titles they rated at or above a percentile
//! of their own rating distribution. The threshold is computed per user, so
//! a harsh rater and a generous rater both contribute their relative
//! favorites.

use tracing::{debug, warn};

use crate::catalog::AnimeCatalog;
use crate::ratings::RatingTable;
use crate::types::UserId;

/// Default cut: keep ratings at or above the user's 75th percentile.
pub const DEFAULT_PERCENTILE: f64 = 0.75;

/// Linear-interpolation percentile over an unsorted sample, matching the
/// numpy default the training stage uses.
fn percentile(values: &[f32], p: f64) -> f32 {
    debug_assert!(!values.is_empty());
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    if sorted.len() == 1 {
        return sorted[0];
    }

    let rank = p.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let fraction = (rank - lo as f64) as f32;
    sorted[lo] + (sorted[hi] - sorted[lo]) * fraction
}

/// Display names of the titles `user_id` rated at or above the `p`
/// percentile of their own distribution, ordered by rating descending
/// (ties keep table order).
///
/// A user with no ratings yields an empty list, not an error. Ids that do
/// not resolve against the catalog are dropped with a warning.
pub fn user_preferences(
    user_id: UserId,
    ratings: &RatingTable,
    catalog: &AnimeCatalog,
    p: f64,
) -> Vec<String> {
    let user_rows = ratings.user_ratings(user_id);
    if user_rows.is_empty() {
        debug!(user_id, "no ratings on record, empty preference list");
        return Vec::new();
    }

    let values: Vec<f32> = user_rows.iter().map(|r| r.rating).collect();
    let threshold = percentile(&values, p);

    let mut liked: Vec<_> = user_rows
        .into_iter()
        .filter(|r| r.rating >= threshold)
        .collect();
    liked.sort_by(|a, b| {
        b.rating
            .partial_cmp(&a.rating)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut names = Vec::with_capacity(liked.len());
    for record in liked {
        match catalog.name_of(record.anime_id) {
            Some(name) => names.push(name.to_string()),
            None => {
                warn!(
                    user_id,
                    anime_id = record.anime_id,
                    "rated anime missing from catalog, dropping from preferences"
                );
            }
        }
    }
    names
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Anime, AnimeId, RatingRecord};

    fn catalog_of(names: &[(AnimeId, &str)]) -> AnimeCatalog {
        AnimeCatalog::from_animes(
            names
                .iter()
                .map(|&(anime_id, name)| Anime {
                    anime_id,
                    name: name.to_string(),
                    genres: Vec::new(),
                    score: None,
                    episodes: None,
                    kind: None,
                    premiered: None,
                    members: None,
                    synopsis: None,
                })
                .collect(),
        )
    }

    fn table_of(rows: &[(UserId, AnimeId, f32)]) -> RatingTable {
        RatingTable::from_records(
            rows.iter()
                .map(|&(user_id, anime_id, rating)| RatingRecord {
                    user_id,
                    anime_id,
                    rating,
                })
                .collect(),
        )
    }

    #[test]
    fn test_percentile_linear_interpolation() {
        let values = vec![1.0, 2.0, 3.0, 4.0];
        // rank = 0.75 * 3 = 2.25 -> 3.0 + 0.25 * (4.0 - 3.0)
        assert!((percentile(&values, 0.75) - 3.25).abs() < 1e-6);
        assert!((percentile(&values, 0.0) - 1.0).abs() < 1e-6);
        assert!((percentile(&values, 1.0) - 4.0).abs() < 1e-6);
        assert!((percentile(&[5.0], 0.75) - 5.0).abs() < 1e-6);
    }

    #[test]
    fn test_preferences_keep_top_quartile() {
        let catalog = catalog_of(&[(1, "A"), (2, "B"), (3, "C"), (4, "D")]);
        let ratings = table_of(&[(7, 1, 0.2), (7, 2, 0.4), (7, 3, 0.8), (7, 4, 1.0)]);

        // threshold = 0.8 + 0.25 * 0.2 = 0.85 -> only D survives.
        let names = user_preferences(7, &ratings, &catalog, 0.75);
        assert_eq!(names, vec!["D"]);
    }

    #[test]
    fn test_preferences_ordered_by_rating_descending() {
        let catalog = catalog_of(&[(1, "A"), (2, "B"), (3, "C")]);
        let ratings = table_of(&[(7, 1, 0.9), (7, 2, 1.0), (7, 3, 0.95)]);

        let names = user_preferences(7, &ratings, &catalog, 0.0);
        assert_eq!(names, vec!["B", "C", "A"]);
    }

    #[test]
    fn test_unknown_user_is_empty_not_error() {
        let catalog = catalog_of(&[(1, "A")]);
        let ratings = table_of(&[(7, 1, 0.5)]);
        assert!(user_preferences(99, &ratings, &catalog, 0.75).is_empty());
    }

    #[test]
    fn test_unresolvable_ids_are_dropped() {
        let catalog = catalog_of(&[(1, "A")]);
        let ratings = table_of(&[(7, 1, 1.0), (7, 999, 1.0)]);

        let names = user_preferences(7, &ratings, &catalog, 0.0);
        assert_eq!(names, vec!["A"]);
    }

    #[test]
    fn test_per_user_threshold_is_independent() {
        let catalog = catalog_of(&[(1, "A"), (2, "B")]);
        // User 7 rates everything low, user 8 rates everything high; both
        // still get their own relative favorite.
        let ratings = table_of(&[(7, 1, 0.1), (7, 2, 0.3), (8, 1, 0.8), (8, 2, 1.0)]);

        assert_eq!(user_preferences(7, &ratings, &catalog, 0.75), vec!["B"]);
        assert_eq!(user_preferences(8, &ratings, &catalog, 0.75), vec!["B"]);
    }
}
