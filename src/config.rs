use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub listen: ListenConfig,
    #[serde(default)]
    pub secret_key: Option<String>,
    #[serde(default)]
    pub dbdir: Option<String>,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub debug: bool,
    #[serde(default)]
    pub testing: bool,
    #[serde(default)]
    pub json_logs: bool,
    #[serde(default = "default_registration")]
    pub registration: bool,
    #[serde(default)]
    pub tmdb: Option<TmdbConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ListenConfig {
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default = "default_port")]
    pub port: String,
    #[serde(default)]
    pub tlscert: Option<String>,
    #[serde(default)]
    pub tlskey: Option<String>,
}

impl Default for ListenConfig {
    fn default() -> Self {
        Self {
            address: None,
            port: default_port(),
            tlscert: None,
            tlskey: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub sqlite: Option<SqliteConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SqliteConfig {
    pub filename: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TmdbConfig {
    #[serde(alias = "apikey")]
    pub api_key: String,
    #[serde(alias = "baseurl", default = "default_tmdb_base_url")]
    pub base_url: String,
    #[serde(default = "default_tmdb_timeout")]
    pub timeout_secs: u64,
}

fn default_port() -> String {
    "5000".to_string()
}

fn default_registration() -> bool {
    true
}

fn default_tmdb_base_url() -> String {
    "https://api.themoviedb.org/3".to_string()
}

fn default_tmdb_timeout() -> u64 {
    10
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen: ListenConfig::default(),
            secret_key: None,
            dbdir: None,
            database: DatabaseConfig::default(),
            debug: false,
            testing: false,
            json_logs: false,
            registration: default_registration(),
            tmdb: None,
        }
    }
}

impl Config {
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadError(path.to_string(), e))?;

        Self::from_yaml(&content).map_err(|e| ConfigError::ParseError(path.to_string(), e))
    }

    pub fn from_yaml(content: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(content)
    }

    /// Local development: file-backed database next to the binary, debug logging.
    pub fn development() -> Self {
        Self {
            database: DatabaseConfig {
                sqlite: Some(SqliteConfig {
                    filename: "movies.db".to_string(),
                }),
            },
            debug: true,
            ..Self::default()
        }
    }

    /// In-memory database and cheap password hashing.
    pub fn testing() -> Self {
        Self {
            secret_key: Some("test-secret-key".to_string()),
            database: DatabaseConfig {
                sqlite: Some(SqliteConfig {
                    filename: ":memory:".to_string(),
                }),
            },
            testing: true,
            ..Self::default()
        }
    }

    pub fn get_database_path(&self) -> Option<String> {
        if let Some(ref sqlite) = self.database.sqlite {
            return Some(sqlite.filename.clone());
        }

        if let Some(ref dbdir) = self.dbdir {
            let path = PathBuf::from(dbdir).join("movies.db");
            return Some(path.to_string_lossy().to_string());
        }

        None
    }

    pub fn has_tls(&self) -> bool {
        self.listen.tlscert.is_some() && self.listen.tlskey.is_some()
    }

    pub fn password_cost(&self) -> u32 {
        if self.testing {
            4
        } else {
            bcrypt::DEFAULT_COST
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {0}: {1}")]
    ReadError(String, std::io::Error),
    #[error("Failed to parse config file {0}: {1}")]
    ParseError(String, serde_yaml::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let yaml = r#"
listen:
  address: 0.0.0.0
  port: "8080"
secret_key: s3cret
database:
  sqlite:
    filename: /var/lib/movies/movies.db
debug: true
registration: false
tmdb:
  apikey: abc123
"#;
        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(config.listen.address.as_deref(), Some("0.0.0.0"));
        assert_eq!(config.listen.port, "8080");
        assert_eq!(config.secret_key.as_deref(), Some("s3cret"));
        assert_eq!(
            config.get_database_path().as_deref(),
            Some("/var/lib/movies/movies.db")
        );
        assert!(config.debug);
        assert!(!config.registration);
        let tmdb = config.tmdb.unwrap();
        assert_eq!(tmdb.api_key, "abc123");
        assert_eq!(tmdb.base_url, "https://api.themoviedb.org/3");
        assert_eq!(tmdb.timeout_secs, 10);
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_yaml("{}").unwrap();
        assert_eq!(config.listen.port, "5000");
        assert!(config.registration);
        assert!(!config.testing);
        assert!(!config.has_tls());
        assert_eq!(config.get_database_path(), None);
        assert_eq!(config.password_cost(), bcrypt::DEFAULT_COST);
    }

    #[test]
    fn test_dbdir_fallback() {
        let config = Config::from_yaml("dbdir: /tmp/watchlist").unwrap();
        assert_eq!(
            config.get_database_path().as_deref(),
            Some("/tmp/watchlist/movies.db")
        );
    }

    #[test]
    fn test_testing_profile() {
        let config = Config::testing();
        assert_eq!(config.get_database_path().as_deref(), Some(":memory:"));
        assert_eq!(config.password_cost(), 4);
        assert!(config.secret_key.is_some());
    }
}
