//! Cross-module tests exercising the assembled engine against small
//! hand-built embedding spaces.


use crate::catalog::AnimeCatalog;
use crate::config::EngineConfig;
use crate::embedding::{EmbeddingStore, EmbeddingTableArtifact, EntityKind};
use crate::ratings::RatingTable;
use crate::recommendation::RecommenderEngine;
use crate::types::{Anime, AnimeId, RatingRecord, UserId};

pub(crate) fn store(kind: EntityKind, entries: &[(u32, Vec<f32>)]) -> EmbeddingStore {
    let dim = entries[0].1.len();
    EmbeddingStore::from_artifact(
        kind,
        EmbeddingTableArtifact {
            dim,
            ids: entries.iter().map(|(id, _)| *id).collect(),
            values: entries.iter().flat_map(|(_, v)| v.clone()).collect(),
        },
    )
    .unwrap()
}

pub(crate) fn catalog(entries: &[(AnimeId, &str)]) -> AnimeCatalog {
    AnimeCatalog::from_animes(
        entries
            .iter()
            .map(|&(anime_id, name)| Anime {
                anime_id,
                name: name.to_string(),
                genres: vec!["Action".to_string()],
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

pub(crate) fn ratings(rows: &[(UserId, AnimeId, f32)]) -> RatingTable {
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

/// The scenario the pipeline tests share.
///
/// User 1 (the querying user) already likes "X". Users 2 and 3 sit next to
/// them in the user space; user 2 likes "Y", user 3 likes "Y" and "Z". In
/// the anime space "Y" neighbors "W" plus an id that has no catalog entry,
/// while "Z" has no embedding row at all.
pub(crate) fn scenario_engine() -> RecommenderEngine {
    let user_store = store(
        EntityKind::User,
        &[
            (1, vec![1.0, 0.0]),
            (2, vec![0.9, 0.1]),
            (3, vec![0.85, 0.15]),
        ],
    );
    let anime_store = store(
        EntityKind::Anime,
        &[
            (20, vec![1.0, 0.0]),
            (40, vec![0.9, 0.1]),
            (99, vec![0.8, 0.2]),
        ],
    );
    let catalog = catalog(&[(10, "X"), (20, "Y"), (30, "Z"), (40, "W")]);
    let ratings = ratings(&[
        (1, 10, 1.0),
        (2, 20, 1.0),
        (3, 20, 1.0),
        (3, 30, 1.0),
    ]);

    let config = EngineConfig {
        similar_users: 10,
        similar_animes: 2,
        ..EngineConfig::default()
    };

    RecommenderEngine::new(config, user_store, anime_store, ratings, catalog)
}
