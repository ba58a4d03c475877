//! Processed rating table.
//!
//! Holds the (user, anime, rating) log the engine scores against, with a
//! per-user row index. `from_raw_csv` reproduces the preprocessing pass the
//! training stage runs: drop sparse users, min-max scale ratings to [0, 1]
//! with the global min/max observed in that pass, and derive first-seen-order
//! id<->index encodings for artifact producers.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{bail, Context, Result as AnyResult};
use serde::Deserialize;
use tracing::info;

use crate::types::{AnimeId, RatingRecord, UserId};

/// Users with fewer ratings than this are dropped by the preprocessing pass.
pub const DEFAULT_MIN_RATINGS_PER_USER: usize = 400;

#[derive(Debug, Deserialize)]
struct RatingRow {
    user_id: UserId,
    anime_id: AnimeId,
    rating: f32,
}

/// First-seen-order bijection between domain ids and dense indices.
#[derive(Debug, Clone)]
pub struct IdEncoding {
    encode: HashMap<u32, usize>,
    decode: Vec<u32>,
}

impl IdEncoding {
    fn from_ids(ids: impl Iterator<Item = u32>) -> Self {
        let mut encode = HashMap::new();
        let mut decode = Vec::new();
        for id in ids {
            encode.entry(id).or_insert_with(|| {
                decode.push(id);
                decode.len() - 1
            });
        }
        Self { encode, decode }
    }

    pub fn encode(&self, id: u32) -> Option<usize> {
        self.encode.get(&id).copied()
    }

    pub fn decode(&self, index: usize) -> Option<u32> {
        self.decode.get(index).copied()
    }

    pub fn len(&self) -> usize {
        self.decode.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decode.is_empty()
    }

    /// Ids in encoding (first-seen) order.
    pub fn ids(&self) -> &[u32] {
        &self.decode
    }
}

/// Read-only rating log with a per-user index.
pub struct RatingTable {
    records: Vec<RatingRecord>,
    by_user: HashMap<UserId, Vec<usize>>,
    min_rating: f32,
    max_rating: f32,
}

impl RatingTable {
    /// Build a table from already-normalized records.
    pub fn from_records(records: Vec<RatingRecord>) -> Self {
        let mut by_user: HashMap<UserId, Vec<usize>> = HashMap::new();
        let mut min_rating = f32::INFINITY;
        let mut max_rating = f32::NEG_INFINITY;

        for (idx, record) in records.iter().enumerate() {
            by_user.entry(record.user_id).or_default().push(idx);
            min_rating = min_rating.min(record.rating);
            max_rating = max_rating.max(record.rating);
        }
        if records.is_empty() {
            min_rating = 0.0;
            max_rating = 0.0;
        }

        Self {
            records,
            by_user,
            min_rating,
            max_rating,
        }
    }

    /// Load the processed rating table (ratings already in [0, 1]).
    pub fn load_csv(path: &Path) -> AnyResult<Self> {
        let records = read_rows(path)?;
        let table = Self::from_records(records);
        info!(
            rows = table.len(),
            users = table.user_count(),
            path = %path.display(),
            "loaded rating table"
        );
        Ok(table)
    }

    /// Load a raw rating log and run the preprocessing pass over it:
    /// users with fewer than `min_ratings_per_user` rows are dropped, then
    /// ratings are min-max scaled with the global min/max observed across
    /// the surviving rows.
    pub fn from_raw_csv(path: &Path, min_ratings_per_user: usize) -> AnyResult<Self> {
        let rows = read_rows(path)?;
        if rows.is_empty() {
            bail!("rating log {} contains no rows", path.display());
        }

        let mut counts: HashMap<UserId, usize> = HashMap::new();
        for row in &rows {
            *counts.entry(row.user_id).or_insert(0) += 1;
        }

        let mut kept: Vec<RatingRecord> = rows
            .into_iter()
            .filter(|row| counts[&row.user_id] >= min_ratings_per_user)
            .collect();
        if kept.is_empty() {
            bail!(
                "no user in {} has at least {} ratings",
                path.display(),
                min_ratings_per_user
            );
        }

        let min = kept.iter().map(|r| r.rating).fold(f32::INFINITY, f32::min);
        let max = kept
            .iter()
            .map(|r| r.rating)
            .fold(f32::NEG_INFINITY, f32::max);
        let span = max - min;
        for record in &mut kept {
            // A constant-rating log would divide by zero; everything maps to 0.
            record.rating = if span > 0.0 {
                (record.rating - min) / span
            } else {
                0.0
            };
        }

        let table = Self::from_records(kept);
        info!(
            rows = table.len(),
            users = table.user_count(),
            min_rating = min,
            max_rating = max,
            "preprocessed raw rating log"
        );
        Ok(table)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn user_count(&self) -> usize {
        self.by_user.len()
    }

    /// Observed rating bounds after normalization.
    pub fn rating_bounds(&self) -> (f32, f32) {
        (self.min_rating, self.max_rating)
    }

    /// All ratings by one user, in table order. Empty for unknown users.
    pub fn user_ratings(&self, user_id: UserId) -> Vec<&RatingRecord> {
        self.by_user
            .get(&user_id)
            .map(|rows| rows.iter().map(|&idx| &self.records[idx]).collect())
            .unwrap_or_default()
    }

    /// First-seen-order user id encoding over the table.
    pub fn user_encoding(&self) -> IdEncoding {
        IdEncoding::from_ids(self.records.iter().map(|r| r.user_id))
    }

    /// First-seen-order anime id encoding over the table.
    pub fn anime_encoding(&self) -> IdEncoding {
        IdEncoding::from_ids(self.records.iter().map(|r| r.anime_id))
    }
}

fn read_rows(path: &Path) -> AnyResult<Vec<RatingRecord>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("failed to open rating table {}", path.display()))?;

    let mut records = Vec::new();
    for row in reader.deserialize() {
        let row: RatingRow = row.context("failed to parse rating row")?;
        records.push(RatingRecord {
            user_id: row.user_id,
            anime_id: row.anime_id,
            rating: row.rating,
        });
    }
    Ok(records)
}
