use crate::cache::CacheConfig;
use crate::retry::RetryConfig;
use crate::sources::LocalFileConfig;
use crate::sources::RemoteConfig;
use serde::Deserialize;
use std::io::ErrorKind;
use std::path::PathBuf;
use thiserror::Error;
use tracing::debug;
use url::Url;

pub const HOME_ENV: &str = "AUCTIONDASH_HOME";
pub const CONFIG_FILE: &str = "config.toml";
const DEFAULT_HOME_DIR: &str = ".auctiondash";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config file: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("could not determine a home directory; set AUCTIONDASH_HOME")]
    NoHome,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Data home; holds `config.toml` and the cache.
    #[serde(skip)]
    pub home: PathBuf,
    pub remote: RemoteConfig,
    pub local_file: LocalFileConfig,
    pub cache: CacheConfig,
    pub retry: RetryConfig,
}

/// Command-line values that win over the file.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub home: Option<PathBuf>,
    pub config_path: Option<PathBuf>,
    pub database_url: Option<Url>,
    pub local_base: Option<String>,
    pub disable_remote: bool,
}

impl Config {
    /// Read `config.toml` from the data home (or `overrides.config_path`),
    /// falling back to defaults when the file does not exist.
    pub fn load(overrides: ConfigOverrides) -> Result<Self, ConfigError> {
        let home = match overrides.home.clone() {
            Some(home) => home,
            None => find_home()?,
        };
        let path = overrides
            .config_path
            .clone()
            .unwrap_or_else(|| home.join(CONFIG_FILE));

        let mut config = match std::fs::read_to_string(&path) {
            Ok(contents) => Self::from_toml_str(&contents)?,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!(path = %path.display(), "no config file, using defaults");
                Self::default()
            }
            Err(source) => return Err(ConfigError::Io { path, source }),
        };
        config.home = home;
        config.apply(overrides);
        Ok(config)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    /// Where the sled cache lives when `[cache] path` is unset.
    pub fn cache_path(&self) -> PathBuf {
        self.cache
            .path
            .clone()
            .unwrap_or_else(|| crate::cache::backend::default_cache_path(&self.home))
    }

    fn apply(&mut self, overrides: ConfigOverrides) {
        if let Some(url) = overrides.database_url {
            self.remote.database_url = Some(url);
        }
        if let Some(base) = overrides.local_base {
            self.local_file.base = Some(base);
        }
        if overrides.disable_remote {
            self.remote.database_url = None;
            self.remote.subscribe = false;
        }
    }
}

/// `$AUCTIONDASH_HOME`, else `~/.auctiondash`.
pub fn find_home() -> Result<PathBuf, ConfigError> {
    if let Some(home) = std::env::var_os(HOME_ENV).filter(|value| !value.is_empty()) {
        return Ok(PathBuf::from(home));
    }
    dirs::home_dir()
        .map(|home| home.join(DEFAULT_HOME_DIR))
        .ok_or(ConfigError::NoHome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    #[test]
    fn missing_file_means_defaults() {
        let home = tempdir().expect("tempdir");
        let config = Config::load(ConfigOverrides {
            home: Some(home.path().to_path_buf()),
            ..ConfigOverrides::default()
        })
        .expect("load");

        assert_eq!(config.home, home.path());
        assert_eq!(config.remote.node, "auction_data");
        assert_eq!(config.remote.watchdog_ms, 10_000);
        assert_eq!(config.local_file.file_name, "dashboard_data.json");
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.cache_path(), home.path().join("cache"));
    }

    #[test]
    fn file_values_and_overrides_combine() {
        let home = tempdir().expect("tempdir");
        std::fs::write(
            home.path().join(CONFIG_FILE),
            r#"
[remote]
database_url = "https://auction-demo.firebasedatabase.app/"
watchdog_ms = 2500
subscribe = true

[local_file]
file_name = "export.json"

[retry]
base_delay_ms = 200
"#,
        )
        .expect("write");

        let config = Config::load(ConfigOverrides {
            home: Some(home.path().to_path_buf()),
            local_base: Some("/srv/dashboard".to_string()),
            ..ConfigOverrides::default()
        })
        .expect("load");
        assert_eq!(
            config.remote.database_url.as_ref().map(Url::as_str),
            Some("https://auction-demo.firebasedatabase.app/")
        );
        assert_eq!(config.remote.watchdog_ms, 2500);
        assert!(config.remote.subscribe);
        assert_eq!(config.local_file.file_name, "export.json");
        assert_eq!(config.local_file.base.as_deref(), Some("/srv/dashboard"));
        assert_eq!(config.retry.base_delay_ms, 200);
        assert_eq!(config.retry.max_attempts, 3);
    }

    #[test]
    fn disable_remote_wins_over_file() {
        let config_dir = tempdir().expect("tempdir");
        let path = config_dir.path().join("custom.toml");
        std::fs::write(
            &path,
            "[remote]\ndatabase_url = \"https://x.firebaseio.com\"\nsubscribe = true\n",
        )
        .expect("write");

        let config = Config::load(ConfigOverrides {
            home: Some(config_dir.path().join("home")),
            config_path: Some(path),
            disable_remote: true,
            ..ConfigOverrides::default()
        })
        .expect("load");
        assert!(config.remote.database_url.is_none());
        assert!(!config.remote.subscribe);
    }

    #[test]
    fn malformed_file_is_an_error() {
        assert_matches!(
            Config::from_toml_str("[retry]\nmax_attempts = \"three\""),
            Err(ConfigError::Toml(_))
        );
    }
}
