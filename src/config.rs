//! Configuration loading and validation.
//!
//! Every knob loads from environment variables with the `ANIME_REC_` prefix
//! (a `.env` file is honored by the binary) and validates before use.
//! Defaults: ten similar users, ten content neighbors per seed, the 75th
//! preference percentile, and an even 0.5/0.5 blend.

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

fn config_error(message: impl Into<String>, key: Option<&str>) -> Error {
    Error::Configuration {
        message: message.into(),
        key: key.map(|k| k.to_string()),
    }
}

/// Parse an environment variable, falling back to `default` when unset.
fn parse_env_var<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(value) => value
            .parse::<T>()
            .map_err(|e| config_error(format!("failed to parse {key}: {e}"), Some(key))),
        Err(_) => Ok(default),
    }
}

/// Loader contract shared by the configuration structs.
pub trait ConfigLoader: Sized {
    /// Read the struct from environment variables, using defaults for
    /// anything unset.
    fn from_env() -> Result<Self>;

    /// Reject out-of-range values with a pointed message.
    fn validate(&self) -> Result<()>;
}

/// Tuning knobs for the recommendation pipeline.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Similar users consulted in Stage A.
    pub similar_users: usize,
    /// Content neighbors fetched per Stage A seed.
    pub similar_animes: usize,
    /// Per-user preference percentile cut, in (0, 1].
    pub preference_percentile: f64,
    /// Stage A output truncation.
    pub max_candidates: usize,
    pub default_user_weight: f32,
    pub default_content_weight: f32,
    pub default_top_k: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            similar_users: 10,
            similar_animes: 10,
            preference_percentile: 0.75,
            max_candidates: 10,
            default_user_weight: 0.5,
            default_content_weight: 0.5,
            default_top_k: 10,
        }
    }
}

impl ConfigLoader for EngineConfig {
    fn from_env() -> Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            similar_users: parse_env_var("ANIME_REC_SIMILAR_USERS", defaults.similar_users)?,
            similar_animes: parse_env_var("ANIME_REC_SIMILAR_ANIMES", defaults.similar_animes)?,
            preference_percentile: parse_env_var(
                "ANIME_REC_PREFERENCE_PERCENTILE",
                defaults.preference_percentile,
            )?,
            max_candidates: parse_env_var(
                "ANIME_REC_MAX_CANDIDATES",
                defaults.max_candidates,
            )?,
            default_user_weight: parse_env_var(
                "ANIME_REC_USER_WEIGHT",
                defaults.default_user_weight,
            )?,
            default_content_weight: parse_env_var(
                "ANIME_REC_CONTENT_WEIGHT",
                defaults.default_content_weight,
            )?,
            default_top_k: parse_env_var("ANIME_REC_TOP_K", defaults.default_top_k)?,
        })
    }

    fn validate(&self) -> Result<()> {
        if self.similar_users == 0 {
            return Err(config_error(
                "similar_users must be greater than 0",
                Some("ANIME_REC_SIMILAR_USERS"),
            ));
        }
        if self.similar_animes == 0 {
            return Err(config_error(
                "similar_animes must be greater than 0",
                Some("ANIME_REC_SIMILAR_ANIMES"),
            ));
        }
        if !(self.preference_percentile > 0.0 && self.preference_percentile <= 1.0) {
            return Err(config_error(
                format!(
                    "preference_percentile must be in (0, 1], got {}",
                    self.preference_percentile
                ),
                Some("ANIME_REC_PREFERENCE_PERCENTILE"),
            ));
        }
        if self.max_candidates == 0 {
            return Err(config_error(
                "max_candidates must be greater than 0",
                Some("ANIME_REC_MAX_CANDIDATES"),
            ));
        }
        for (weight, key) in [
            (self.default_user_weight, "ANIME_REC_USER_WEIGHT"),
            (self.default_content_weight, "ANIME_REC_CONTENT_WEIGHT"),
        ] {
            if !weight.is_finite() || weight < 0.0 {
                return Err(config_error(
                    format!("blend weights must be finite and non-negative, got {weight}"),
                    Some(key),
                ));
            }
        }
        if self.default_top_k == 0 {
            return Err(config_error(
                "top_k must be greater than 0",
                Some("ANIME_REC_TOP_K"),
            ));
        }
        Ok(())
    }
}

/// Locations of the four artifacts the engine consumes.
#[derive(Debug, Clone)]
pub struct ArtifactPaths {
    pub user_embeddings: PathBuf,
    pub anime_embeddings: PathBuf,
    pub ratings_csv: PathBuf,
    pub anime_csv: PathBuf,
    pub synopsis_csv: PathBuf,
}

impl ArtifactPaths {
    /// Conventional layout under one artifact directory.
    pub fn from_dir(dir: &Path) -> Self {
        Self {
            user_embeddings: dir.join("user_embeddings.bin"),
            anime_embeddings: dir.join("anime_embeddings.bin"),
            ratings_csv: dir.join("ratings.csv"),
            anime_csv: dir.join("anime.csv"),
            synopsis_csv: dir.join("anime_with_synopsis.csv"),
        }
    }
}

impl ConfigLoader for ArtifactPaths {
    fn from_env() -> Result<Self> {
        let dir = std::env::var("ANIME_REC_ARTIFACT_DIR").unwrap_or_else(|_| "artifacts".into());
        let mut paths = Self::from_dir(Path::new(&dir));

        // Individual overrides beat the directory convention.
        for (slot, key) in [
            (&mut paths.user_embeddings, "ANIME_REC_USER_EMBEDDINGS"),
            (&mut paths.anime_embeddings, "ANIME_REC_ANIME_EMBEDDINGS"),
            (&mut paths.ratings_csv, "ANIME_REC_RATINGS_CSV"),
            (&mut paths.anime_csv, "ANIME_REC_ANIME_CSV"),
            (&mut paths.synopsis_csv, "ANIME_REC_SYNOPSIS_CSV"),
        ] {
            if let Ok(value) = std::env::var(key) {
                *slot = PathBuf::from(value);
            }
        }
        Ok(paths)
    }

    fn validate(&self) -> Result<()> {
        for (path, key) in [
            (&self.user_embeddings, "ANIME_REC_USER_EMBEDDINGS"),
            (&self.anime_embeddings, "ANIME_REC_ANIME_EMBEDDINGS"),
            (&self.ratings_csv, "ANIME_REC_RATINGS_CSV"),
            (&self.anime_csv, "ANIME_REC_ANIME_CSV"),
            (&self.synopsis_csv, "ANIME_REC_SYNOPSIS_CSV"),
        ] {
            if !path.is_file() {
                return Err(config_error(
                    format!("artifact {} does not exist", path.display()),
                    Some(key),
                ));
            }
        }
        Ok(())
    }
}

/// HTTP service settings.
#[derive(Debug, Clone)]
pub struct ServiceSettings {
    pub host: String,
    pub port: u16,
    /// Log level: trace, debug, info, warn, or error.
    pub log_level: String,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            log_level: "info".to_string(),
        }
    }
}

impl ConfigLoader for ServiceSettings {
    fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let host = std::env::var("ANIME_REC_SERVICE_HOST")
            .or_else(|_| std::env::var("HOST"))
            .unwrap_or(defaults.host);

        let port = parse_env_var("ANIME_REC_SERVICE_PORT", defaults.port)
            .or_else(|_| parse_env_var("PORT", defaults.port))?;

        let log_level = std::env::var("ANIME_REC_SERVICE_LOG_LEVEL")
            .or_else(|_| std::env::var("RUST_LOG"))
            .unwrap_or(defaults.log_level);

        Ok(Self {
            host,
            port,
            log_level,
        })
    }

    fn validate(&self) -> Result<()> {
        if self.port == 0 {
            return Err(config_error(
                "port must be greater than 0",
                Some("ANIME_REC_SERVICE_PORT"),
            ));
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&self.log_level.to_lowercase().as_str()) {
            return Err(config_error(
                format!(
                    "invalid log_level '{}', must be one of: {}",
                    self.log_level,
                    valid_log_levels.join(", ")
                ),
                Some("ANIME_REC_SERVICE_LOG_LEVEL"),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_config_defaults_are_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.similar_users, 10);
        assert_eq!(config.default_top_k, 10);
        assert!((config.preference_percentile - 0.75).abs() < 1e-9);
    }

    #[test]
    fn test_engine_config_rejects_bad_percentile() {
        let mut config = EngineConfig::default();
        config.preference_percentile = 1.5;
        assert!(config.validate().is_err());

        config.preference_percentile = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_engine_config_rejects_negative_weight() {
        let mut config = EngineConfig::default();
        config.default_user_weight = -0.1;
        assert!(config.validate().is_err());

        config.default_user_weight = f32::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_engine_config_rejects_zero_top_k() {
        let mut config = EngineConfig::default();
        config.default_top_k = 0;
        assert!(config.validate().is_err());
    }

    // Environment overrides run in one test to keep env mutation serial.
    #[test]
    fn test_engine_config_from_env() {
        std::env::set_var("ANIME_REC_SIMILAR_USERS", "25");
        let config = EngineConfig::from_env().unwrap();
        std::env::remove_var("ANIME_REC_SIMILAR_USERS");

        assert_eq!(config.similar_users, 25);
        assert_eq!(config.similar_animes, 10);

        std::env::set_var("ANIME_REC_TOP_K", "lots");
        let result = EngineConfig::from_env();
        std::env::remove_var("ANIME_REC_TOP_K");

        assert!(matches!(result, Err(Error::Configuration { .. })));
    }

    #[test]
    fn test_artifact_paths_from_dir() {
        let paths = ArtifactPaths::from_dir(Path::new("/data/artifacts"));
        assert_eq!(
            paths.user_embeddings,
            PathBuf::from("/data/artifacts/user_embeddings.bin")
        );
        assert_eq!(
            paths.synopsis_csv,
            PathBuf::from("/data/artifacts/anime_with_synopsis.csv")
        );
    }

    #[test]
    fn test_artifact_paths_validate_missing_file() {
        let paths = ArtifactPaths::from_dir(Path::new("/definitely/not/here"));
        assert!(matches!(
            paths.validate(),
            Err(Error::Configuration { .. })
        ));
    }

    #[test]
    fn test_service_settings_defaults() {
        let settings = ServiceSettings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.port, 8080);
    }

    #[test]
    fn test_service_settings_rejects_bad_log_level() {
        let mut settings = ServiceSettings::default();
        settings.log_level = "loud".to_string();
        assert!(settings.validate().is_err());
    }
}
