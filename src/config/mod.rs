//! Configuration management for `todoika`.
//!
//! Configuration sources and precedence (highest wins):
//! 1. Environment variables (`TODOIKA_DB_*`)
//! 2. Config file given with `--config` / `TODOIKA_CONFIG`
//! 3. User config (~/.config/todoika/config.toml), when no file was given
//! 4. Defaults (SQLite file `todoika.db`)
//!
//! The file is TOML with a single `[database]` table:
//!
//! ```toml
//! [database]
//! db_type = "SQLite"   # or "PSQL"
//! name = "todoika.db"
//! ```

use crate::error::{Result, TodoError};
use crate::storage::{SqliteStorage, Storage};
use serde::Deserialize;
use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

#[cfg(feature = "postgres")]
use crate::storage::{PostgresConfig, PostgresStorage, postgres::DEFAULT_PORT};

/// Default database filename used when nothing is configured.
pub const DEFAULT_DB_FILENAME: &str = "todoika.db";

const ENV_PREFIX: &str = "TODOIKA_DB_";

/// Parsed config file.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct FileConfig {
    #[serde(default)]
    pub database: DatabaseSection,
}

/// The `[database]` table. Every key is optional until a backend is resolved.
#[derive(Clone, Default, Deserialize, PartialEq, Eq)]
pub struct DatabaseSection {
    pub db_type: Option<String>,
    /// SQLite file path.
    pub name: Option<String>,
    pub host: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub db_name: Option<String>,
    pub port: Option<u16>,
}

impl fmt::Debug for DatabaseSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseSection")
            .field("db_type", &self.db_type)
            .field("name", &self.name)
            .field("host", &self.host)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("db_name", &self.db_name)
            .field("port", &self.port)
            .finish()
    }
}

/// A fully resolved storage backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Backend {
    Sqlite { path: PathBuf },
    #[cfg(feature = "postgres")]
    Postgres(PostgresConfig),
}

impl FileConfig {
    /// Load a config file.
    ///
    /// # Errors
    ///
    /// Returns `Config` if the file is missing, or a parse error.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(TodoError::Config(format!(
                "config file not found: {}",
                path.display()
            )));
        }
        let contents = fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// # Errors
    ///
    /// Returns an error if the text is not valid TOML for this schema.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }
}

impl DatabaseSection {
    /// Overlay `TODOIKA_DB_*` variables.
    ///
    /// # Errors
    ///
    /// Returns `Config` if `TODOIKA_DB_PORT` is not a port number.
    pub fn apply_env<I>(&mut self, vars: I) -> Result<()>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (key, value) in vars {
            let Some(field) = key.strip_prefix(ENV_PREFIX) else {
                continue;
            };
            if value.trim().is_empty() {
                continue;
            }
            match field {
                "TYPE" => self.db_type = Some(value),
                "NAME" => self.name = Some(value),
                "HOST" => self.host = Some(value),
                "USER" => self.user = Some(value),
                "PASSWORD" => self.password = Some(value),
                "DB_NAME" => self.db_name = Some(value),
                "PORT" => {
                    let port = value.trim().parse::<u16>().map_err(|_| {
                        TodoError::Config(format!("{key} is not a valid port: '{value}'"))
                    })?;
                    self.port = Some(port);
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Resolve the backend. Relative SQLite paths are taken relative to
    /// `base_dir` (the config file's directory).
    ///
    /// # Errors
    ///
    /// Returns `Config` for an unknown `db_type` or a missing networked field.
    pub fn backend(&self, base_dir: &Path) -> Result<Backend> {
        let db_type = self.db_type.as_deref().unwrap_or("SQLite");
        match db_type.trim().to_ascii_lowercase().as_str() {
            "sqlite" => {
                let name = self.name.as_deref().unwrap_or(DEFAULT_DB_FILENAME);
                let candidate = PathBuf::from(name);
                let path = if candidate.is_absolute() {
                    candidate
                } else {
                    base_dir.join(candidate)
                };
                Ok(Backend::Sqlite { path })
            }
            "psql" | "postgres" | "postgresql" => self.postgres_backend(),
            _ => Err(TodoError::Config(format!("unknown storage: {db_type}"))),
        }
    }

    #[cfg(feature = "postgres")]
    fn postgres_backend(&self) -> Result<Backend> {
        Ok(Backend::Postgres(PostgresConfig {
            host: required(self.host.as_ref(), "host")?,
            user: required(self.user.as_ref(), "user")?,
            password: self.password.clone().unwrap_or_default(),
            db_name: required(self.db_name.as_ref(), "db_name")?,
            port: self.port.unwrap_or(DEFAULT_PORT),
        }))
    }

    #[cfg(not(feature = "postgres"))]
    #[allow(clippy::unused_self)]
    fn postgres_backend(&self) -> Result<Backend> {
        Err(TodoError::Config(
            "todoika was built without PostgreSQL support".to_string(),
        ))
    }
}

#[cfg(feature = "postgres")]
fn required(value: Option<&String>, field: &str) -> Result<String> {
    value
        .filter(|v| !v.trim().is_empty())
        .cloned()
        .ok_or_else(|| TodoError::Config(format!("database.{field} is required for PSQL")))
}

/// User config path (~/.config/todoika/config.toml), if HOME is set.
#[must_use]
pub fn user_config_path() -> Option<PathBuf> {
    let home = env::var_os("HOME")?;
    Some(
        Path::new(&home)
            .join(".config")
            .join("todoika")
            .join("config.toml"),
    )
}

/// Resolve the backend from an optional explicit config path plus the
/// process environment.
///
/// # Errors
///
/// Returns `Config` if the file is unreadable or the settings are invalid.
pub fn load_backend(config_path: Option<&Path>) -> Result<Backend> {
    let user_path = user_config_path().filter(|p| p.is_file());
    load_backend_with_env(config_path, user_path.as_deref(), env::vars())
}

fn load_backend_with_env<I>(
    config_path: Option<&Path>,
    user_path: Option<&Path>,
    vars: I,
) -> Result<Backend>
where
    I: IntoIterator<Item = (String, String)>,
{
    let (mut section, base_dir) = match config_path.or(user_path) {
        Some(path) => {
            debug!(path = %path.display(), "Loading config file");
            let base = path.parent().map(Path::to_path_buf).unwrap_or_default();
            (FileConfig::load(path)?.database, base)
        }
        None => (DatabaseSection::default(), PathBuf::new()),
    };
    section.apply_env(vars)?;
    debug!(?section, "Resolved database settings");
    section.backend(&base_dir)
}

/// Open storage for a resolved backend. The schema must already exist.
///
/// # Errors
///
/// Returns `StorageUnavailable` if the backend cannot be reached or is not
/// provisioned.
pub fn open_storage(backend: &Backend) -> Result<Box<dyn Storage>> {
    match backend {
        Backend::Sqlite { path } => Ok(Box::new(SqliteStorage::open(path)?)),
        #[cfg(feature = "postgres")]
        Backend::Postgres(config) => Ok(Box::new(PostgresStorage::open(config)?)),
    }
}

/// Provision the schema for a resolved backend and return the opened storage.
///
/// # Errors
///
/// Returns an error if the backend cannot be reached or the DDL fails.
pub fn provision_storage(backend: &Backend) -> Result<Box<dyn Storage>> {
    match backend {
        Backend::Sqlite { path } => Ok(Box::new(SqliteStorage::create(path)?)),
        #[cfg(feature = "postgres")]
        Backend::Postgres(config) => Ok(Box::new(PostgresStorage::create(config)?)),
    }
}
