//! Runtime settings for the indexer process.
//!
//! The binary fills these from the environment; everything downstream
//! receives the validated struct and never reads the environment itself.

use std::path::{Path, PathBuf};
use std::time::Duration;

use secrecy::SecretString;

use crate::descriptor::SourceKind;
use crate::error::ConfigError;

pub const DEFAULT_TMDB_BASE_URL: &str = "https://api.themoviedb.org/3";

/// Settings for the external metadata service.
#[derive(Debug)]
pub struct TmdbSettings {
    pub api_key: SecretString,
    pub base_url: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    /// How long a lookup result stays cached.
    pub cache_ttl: Duration,
}

impl TmdbSettings {
    pub fn new(api_key: SecretString) -> Self {
        Self {
            api_key,
            base_url: DEFAULT_TMDB_BASE_URL.to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            cache_ttl: Duration::from_secs(60 * 60),
        }
    }
}

#[derive(Debug)]
pub struct Settings {
    pub base_watch_path: PathBuf,
    /// Sub-path of `base_watch_path` fed by the movie download manager.
    pub movie_source: String,
    /// Sub-path of `base_watch_path` fed by the series download manager.
    pub series_source: String,
    pub content_mount: PathBuf,
    pub database_path: PathBuf,
    pub tmdb: TmdbSettings,
    pub reconcile_workers: usize,
    pub ingest_concurrency: usize,
    pub poll_interval: Duration,
}

impl Settings {
    /// Checks the settings and makes every path absolute.
    pub fn validate(mut self) -> Result<Self, ConfigError> {
        if self.base_watch_path.as_os_str().is_empty() {
            return Err(ConfigError::Missing {
                name: "base_watch_path",
            });
        }
        if self.content_mount.as_os_str().is_empty() {
            return Err(ConfigError::Missing {
                name: "content_mount",
            });
        }
        if self.movie_source.trim().is_empty() {
            return Err(ConfigError::Missing {
                name: "movie_source",
            });
        }
        if self.series_source.trim().is_empty() {
            return Err(ConfigError::Missing {
                name: "series_source",
            });
        }
        if self.movie_source == self.series_source {
            return Err(ConfigError::Validation {
                message: format!(
                    "movie and series sources must differ (both are '{}')",
                    self.movie_source
                ),
            });
        }
        for name in [&self.movie_source, &self.series_source] {
            if name == "processing" || name == "completed" {
                return Err(ConfigError::Validation {
                    message: format!("source name '{}' is reserved", name),
                });
            }
        }
        if self.reconcile_workers == 0 {
            return Err(ConfigError::Validation {
                message: "reconcile_workers must be > 0".to_string(),
            });
        }
        if self.ingest_concurrency == 0 {
            return Err(ConfigError::Validation {
                message: "ingest_concurrency must be > 0".to_string(),
            });
        }

        self.base_watch_path = make_absolute(&self.base_watch_path)?;
        self.content_mount = make_absolute(&self.content_mount)?;
        self.database_path = make_absolute(&self.database_path)?;

        Ok(self)
    }

    /// Intake root for one upstream source: `<base>/<source>`.
    pub fn source_root(&self, kind: SourceKind) -> PathBuf {
        let name = match kind {
            SourceKind::Movie => &self.movie_source,
            SourceKind::Series => &self.series_source,
        };
        self.base_watch_path.join(name)
    }
}

fn make_absolute(path: &Path) -> Result<PathBuf, ConfigError> {
    std::path::absolute(path).map_err(|e| ConfigError::ResolvePath {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Returns the default catalog path: `~/.udindexer/data/catalog.db`.
pub fn default_database_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".udindexer").join("data").join("catalog.db"))
}

pub fn default_reconcile_workers() -> usize {
    num_cpus::get().clamp(1, 4)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(base: &str, mount: &str) -> Settings {
        Settings {
            base_watch_path: PathBuf::from(base),
            movie_source: "radarr".to_string(),
            series_source: "sonarr".to_string(),
            content_mount: PathBuf::from(mount),
            database_path: PathBuf::from("catalog.db"),
            tmdb: TmdbSettings::new(SecretString::from("key".to_string())),
            reconcile_workers: 2,
            ingest_concurrency: 4,
            poll_interval: Duration::from_secs(2),
        }
    }

    #[test]
    fn test_validate_makes_paths_absolute() {
        let settings = settings("watch", "mount").validate().unwrap();
        assert!(settings.base_watch_path.is_absolute());
        assert!(settings.content_mount.is_absolute());
        assert!(settings.database_path.is_absolute());
        assert!(settings.base_watch_path.ends_with("watch"));
    }

    #[test]
    fn test_validate_rejects_empty_base() {
        let err = settings("", "/mnt/ud").validate().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Missing {
                name: "base_watch_path"
            }
        ));
    }

    #[test]
    fn test_validate_rejects_identical_sources() {
        let mut s = settings("/watch", "/mnt/ud");
        s.series_source = "radarr".to_string();
        assert!(matches!(
            s.validate().unwrap_err(),
            ConfigError::Validation { .. }
        ));
    }

    #[test]
    fn test_validate_rejects_reserved_source_name() {
        let mut s = settings("/watch", "/mnt/ud");
        s.movie_source = "processing".to_string();
        assert!(s.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_workers() {
        let mut s = settings("/watch", "/mnt/ud");
        s.reconcile_workers = 0;
        assert!(s.validate().is_err());

        let mut s = settings("/watch", "/mnt/ud");
        s.ingest_concurrency = 0;
        assert!(s.validate().is_err());
    }

    #[test]
    fn test_source_root() {
        let s = settings("/watch", "/mnt/ud").validate().unwrap();
        assert_eq!(s.source_root(SourceKind::Movie), PathBuf::from("/watch/radarr"));
        assert_eq!(s.source_root(SourceKind::Series), PathBuf::from("/watch/sonarr"));
    }

    #[test]
    fn test_default_database_path() {
        let path = default_database_path().unwrap();
        assert!(path.ends_with("catalog.db"));
        assert!(path.to_string_lossy().contains(".udindexer"));
    }
}
