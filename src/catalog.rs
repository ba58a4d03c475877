//! Anime metadata catalog.
//!
//! Joins the metadata table with the synopsis table, resolves display names
//! with English-name fallback, and exposes id -> record and name -> id
//! lookups. The catalog is ordered by community score descending with
//! missing scores last, so when two titles share a display name the
//! higher-scored one wins the name lookup.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result as AnyResult};
use serde::Deserialize;
use tracing::{info, warn};

use crate::types::{Anime, AnimeId};

/// Raw metadata row. Extra columns in the source CSV are ignored.
#[derive(Debug, Deserialize)]
struct AnimeRow {
    #[serde(rename = "MAL_ID")]
    mal_id: AnimeId,
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "English name")]
    english_name: Option<String>,
    #[serde(rename = "Score")]
    score: Option<String>,
    #[serde(rename = "Genres")]
    genres: Option<String>,
    #[serde(rename = "Type")]
    kind: Option<String>,
    #[serde(rename = "Episodes")]
    episodes: Option<String>,
    #[serde(rename = "Premiered")]
    premiered: Option<String>,
    #[serde(rename = "Members")]
    members: Option<String>,
}

/// Raw synopsis row. The upstream dataset ships the misspelled
/// `sypnopsis` header.
#[derive(Debug, Deserialize)]
struct SynopsisRow {
    #[serde(rename = "MAL_ID")]
    mal_id: AnimeId,
    #[serde(rename = "sypnopsis")]
    synopsis: Option<String>,
}

/// Treat empty cells and the literal "Unknown" as missing.
fn scrub(value: Option<String>) -> Option<String> {
    value.and_then(|v| {
        let v = v.trim().to_string();
        if v.is_empty() || v == "Unknown" {
            None
        } else {
            Some(v)
        }
    })
}

fn split_genres(raw: Option<String>) -> Vec<String> {
    scrub(raw)
        .map(|genres| {
            genres
                .split(',')
                .map(|g| g.trim().to_string())
                .filter(|g| !g.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

impl AnimeRow {
    fn into_anime(self, synopsis: Option<String>) -> Anime {
        // English title when present, original title otherwise.
        let name = scrub(self.english_name).unwrap_or_else(|| self.name.trim().to_string());

        Anime {
            anime_id: self.mal_id,
            name,
            genres: split_genres(self.genres),
            score: scrub(self.score).and_then(|s| s.parse().ok()),
            episodes: scrub(self.episodes).and_then(|s| s.parse().ok()),
            kind: scrub(self.kind),
            premiered: scrub(self.premiered),
            members: scrub(self.members).and_then(|s| s.parse().ok()),
            synopsis,
        }
    }
}

/// Read-only catalog of anime metadata.
pub struct AnimeCatalog {
    animes: Vec<Anime>,
    by_id: HashMap<AnimeId, usize>,
    by_name: HashMap<String, usize>,
}

impl AnimeCatalog {
    /// Build a catalog from already-parsed records (used by tests and by
    /// callers that assemble metadata themselves).
    pub fn from_animes(mut animes: Vec<Anime>) -> Self {
        // Score descending, missing scores last; stable within ties.
        animes.sort_by(|a, b| match (a.score, b.score) {
            (Some(x), Some(y)) => y.partial_cmp(&x).unwrap_or(Ordering::Equal),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        });

        let mut by_id = HashMap::with_capacity(animes.len());
        let mut by_name = HashMap::with_capacity(animes.len());
        for (idx, anime) in animes.iter().enumerate() {
            if by_id.insert(anime.anime_id, idx).is_some() {
                warn!(anime_id = anime.anime_id, "duplicate anime id in catalog, keeping last");
            }
            // First wins: the catalog is score-ordered, so the highest-scored
            // title keeps an ambiguous name.
            by_name.entry(anime.name.clone()).or_insert(idx);
        }

        Self {
            animes,
            by_id,
            by_name,
        }
    }

    /// Load the catalog from the metadata CSV and the synopsis CSV.
    pub fn load(anime_csv: &Path, synopsis_csv: &Path) -> AnyResult<Self> {
        let mut synopses: HashMap<AnimeId, String> = HashMap::new();
        let mut reader = csv::Reader::from_path(synopsis_csv)
            .with_context(|| format!("failed to open synopsis table {}", synopsis_csv.display()))?;
        for row in reader.deserialize() {
            let row: SynopsisRow = row.context("failed to parse synopsis row")?;
            if let Some(synopsis) = scrub(row.synopsis) {
                synopses.insert(row.mal_id, synopsis);
            }
        }

        let mut animes = Vec::new();
        let mut reader = csv::Reader::from_path(anime_csv)
            .with_context(|| format!("failed to open anime table {}", anime_csv.display()))?;
        for row in reader.deserialize() {
            let row: AnimeRow = row.context("failed to parse anime row")?;
            let synopsis = synopses.remove(&row.mal_id);
            animes.push(row.into_anime(synopsis));
        }

        let catalog = Self::from_animes(animes);
        info!(
            titles = catalog.len(),
            path = %anime_csv.display(),
            "loaded anime catalog"
        );
        Ok(catalog)
    }

    pub fn len(&self) -> usize {
        self.animes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.animes.is_empty()
    }

    pub fn get(&self, anime_id: AnimeId) -> Option<&Anime> {
        self.by_id.get(&anime_id).map(|&idx| &self.animes[idx])
    }

    pub fn name_of(&self, anime_id: AnimeId) -> Option<&str> {
        self.get(anime_id).map(|anime| anime.name.as_str())
    }

    pub fn id_for_name(&self, name: &str) -> Option<AnimeId> {
        self.by_name.get(name).map(|&idx| self.animes[idx].anime_id)
    }

    /// Titles in catalog order (score descending, missing last).
    pub fn iter(&self) -> impl Iterator<Item = &Anime> {
        self.animes.iter()
    }
}
