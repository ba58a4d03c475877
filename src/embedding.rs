//! Embedding tables and similarity lookup.
//!
//! An [`EmbeddingStore`] holds one learned embedding table (users or anime)
//! as a row-major matrix plus the id<->row encodings derived from the
//! artifact's id list. Rows are L2-normalized on construction, so the dot
//! product of any two rows is their cosine similarity and every score lands
//! in [-1, 1].

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result as AnyResult};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};

/// Which domain a store indexes. Picks the right not-found error and shows
/// up in log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    User,
    Anime,
}

impl EntityKind {
    pub fn label(self) -> &'static str {
        match self {
            EntityKind::User => "user",
            EntityKind::Anime => "anime",
        }
    }

    fn not_found(self, id: u32) -> Error {
        match self {
            EntityKind::User => Error::UserNotFound { user_id: id },
            EntityKind::Anime => Error::AnimeNotFound { anime_id: id },
        }
    }
}

/// On-disk representation of an embedding table.
///
/// `ids` lists the domain ids in row order; `values` is the row-major
/// flattened matrix with `ids.len() * dim` entries. Serialized with bincode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingTableArtifact {
    pub dim: usize,
    pub ids: Vec<u32>,
    pub values: Vec<f32>,
}

impl EmbeddingTableArtifact {
    pub fn read(path: &Path) -> AnyResult<Self> {
        let bytes = fs::read(path)
            .with_context(|| format!("failed to read embedding artifact {}", path.display()))?;
        let artifact: Self = bincode::deserialize(&bytes)
            .with_context(|| format!("failed to decode embedding artifact {}", path.display()))?;
        Ok(artifact)
    }

    pub fn write(&self, path: &Path) -> AnyResult<()> {
        let bytes = bincode::serialize(self).context("failed to encode embedding artifact")?;
        fs::write(path, bytes)
            .with_context(|| format!("failed to write embedding artifact {}", path.display()))?;
        Ok(())
    }
}

/// In-memory embedding table with id<->row encodings.
pub struct EmbeddingStore {
    kind: EntityKind,
    encode: HashMap<u32, usize>,
    decode: Vec<u32>,
    rows: Array2<f32>,
}

impl EmbeddingStore {
    /// Build a store from a decoded artifact.
    ///
    /// Validates the shape, derives the encode/decode maps from the id list,
    /// and re-normalizes every row to unit L2 norm (a no-op when the
    /// producer already normalized at extraction time).
    pub fn from_artifact(kind: EntityKind, artifact: EmbeddingTableArtifact) -> AnyResult<Self> {
        let EmbeddingTableArtifact { dim, ids, values } = artifact;

        if dim == 0 {
            bail!("{} embedding table has zero dimension", kind.label());
        }
        if values.len() != ids.len() * dim {
            bail!(
                "{} embedding table shape mismatch: {} ids x {} dims but {} values",
                kind.label(),
                ids.len(),
                dim,
                values.len()
            );
        }

        let mut encode = HashMap::with_capacity(ids.len());
        for (row, &id) in ids.iter().enumerate() {
            if encode.insert(id, row).is_some() {
                bail!("{} embedding table has duplicate id {}", kind.label(), id);
            }
        }

        let mut rows = Array2::from_shape_vec((ids.len(), dim), values)
            .context("failed to shape embedding matrix")?;

        let mut zero_rows = 0usize;
        for mut row in rows.rows_mut() {
            let norm = row.iter().map(|v| v * v).sum::<f32>().sqrt();
            if norm > 0.0 {
                row.mapv_inplace(|v| v / norm);
            } else {
                zero_rows += 1;
            }
        }
        if zero_rows > 0 {
            debug!(
                entity = kind.label(),
                zero_rows, "embedding table contains zero-norm rows"
            );
        }

        Ok(Self {
            kind,
            encode,
            decode: ids,
            rows,
        })
    }

    /// Load a store from a bincode artifact on disk.
    pub fn load(kind: EntityKind, path: &Path) -> AnyResult<Self> {
        let artifact = EmbeddingTableArtifact::read(path)?;
        let store = Self::from_artifact(kind, artifact)?;
        info!(
            entity = kind.label(),
            rows = store.len(),
            dim = store.dim(),
            path = %path.display(),
            "loaded embedding table"
        );
        Ok(store)
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    pub fn len(&self) -> usize {
        self.decode.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decode.is_empty()
    }

    pub fn dim(&self) -> usize {
        self.rows.ncols()
    }

    pub fn contains(&self, id: u32) -> bool {
        self.encode.contains_key(&id)
    }

    /// Rank all other ids by cosine similarity to `target`.
    ///
    /// Scores are dot products over the unit-normalized rows, sorted
    /// descending; ties keep ascending row order. The target itself is
    /// dropped when `exclude_self` and the result is truncated to `n`.
    ///
    /// An id absent from the encoding map is a typed not-found error:
    /// top-level callers surface it, pipeline interiors log and skip.
    pub fn similar_to(&self, target: u32, n: usize, exclude_self: bool) -> Result<Vec<(u32, f32)>> {
        let row = *self
            .encode
            .get(&target)
            .ok_or_else(|| self.kind.not_found(target))?;

        let target_row = self.rows.row(row);
        let scores = self.rows.dot(&target_row);

        let mut ranked: Vec<(usize, f32)> = scores
            .iter()
            .enumerate()
            .filter(|&(idx, _)| !(exclude_self && idx == row))
            .map(|(idx, &score)| (idx, score))
            .collect();

        // Stable sort: equal scores keep ascending row order.
        ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
        ranked.truncate(n);

        Ok(ranked
            .into_iter()
            .map(|(idx, score)| (self.decode[idx], score))
            .collect())
    }
}
