//! Error taxonomy for the recommendation engine.
//!
//! Request-time lookups fail with typed variants that the service layer maps
//! to HTTP statuses. Artifact problems are fatal at process init; the loaders
//! build them with `anyhow` context and they are converted at the engine
//! boundary.

use thiserror::Error;

use crate::types::{AnimeId, UserId};

#[derive(Debug, Error)]
pub enum Error {
    /// The queried user has no row in the user-embedding table.
    #[error("user {user_id} not found in the user embedding table")]
    UserNotFound { user_id: UserId },

    /// The queried anime has no row in the anime-embedding table.
    #[error("anime {anime_id} not found in the anime embedding table")]
    AnimeNotFound { anime_id: AnimeId },

    /// A display name could not be resolved to a catalog id.
    #[error("anime name {name:?} not present in the catalog")]
    UnknownAnimeName { name: String },

    /// An embedding table, rating table, or catalog failed to load.
    #[error("artifact error: {message}")]
    Artifact { message: String },

    /// An environment variable was missing, unparseable, or out of range.
    #[error("configuration error: {message}")]
    Configuration {
        message: String,
        key: Option<String>,
    },
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        // "{:#}" flattens the context chain into one line.
        Error::Artifact {
            message: format!("{err:#}"),
        }
    }
}

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, Error>;
