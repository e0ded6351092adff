//! Migration set configuration: `dbconf.toml` loading and dialect resolution.
//!
//! Each migration set directory (`create/`, `schema/`) carries a `dbconf.toml`
//! with one table per environment:
//!
//! ```toml
//! [development]
//! driver = "postgres"
//! open = "user=postgres dbname=postgres sslmode=disable"
//! # dialect = "postgres"   # optional, overrides the dialect name
//! # migrations = "."       # optional, relative to the set directory
//! ```
//!
//! `$VAR` and `${VAR}` inside `open` are expanded from the process environment.
//!
//! Entrypoints:
//! - Raw config for one environment: [`DbConf::load`]
//! - Config + dialect check + parsed parameters: [`MigrationSet::load`]

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::Deserialize;
use shared_utils::env::expand_env;
use tracing::debug;

use crate::conn_string::{self, ParameterMapping};
use crate::dialect::Dialect;
use crate::error::{ConfigFailure, Error, Result};

/// File name looked up inside every migration set directory.
pub const CONFIG_FILE: &str = "dbconf.toml";

/// One environment table of `dbconf.toml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EnvConf {
    /// Driver name (e.g. "postgres").
    pub driver: String,
    /// Connection string handed to the driver (keyword or URL form).
    pub open: String,
    /// Optional dialect name; defaults to `driver`.
    pub dialect: Option<String>,
    /// Optional migrations directory relative to the set directory.
    pub migrations: Option<PathBuf>,
}

/// Resolved configuration of one migration set for one environment.
#[derive(Debug, Clone)]
pub struct DbConf {
    /// Environment the config was loaded for.
    pub env: String,
    /// Dialect name (explicit `dialect` or `driver`).
    pub dialect_name: String,
    /// Open string after environment expansion.
    pub open: String,
    /// Directory holding the numbered scripts.
    pub migrations_dir: PathBuf,
}

impl DbConf {
    /// Reads `<dir>/dbconf.toml` and selects the `env` table.
    ///
    /// Errors:
    /// - [`Error::ConfigLoad`] for an unreadable file, bad TOML, unknown keys,
    ///   a missing environment, or an unset variable in `open`
    pub fn load(dir: impl AsRef<Path>, env: &str) -> Result<Self> {
        let dir = dir.as_ref();
        let path = dir.join(CONFIG_FILE);
        let fail = |source: ConfigFailure| Error::ConfigLoad {
            path: path.clone(),
            source,
        };

        let text = std::fs::read_to_string(&path).map_err(|e| fail(e.into()))?;
        let mut envs: IndexMap<String, EnvConf> =
            toml::from_str(&text).map_err(|e| fail(e.into()))?;

        let conf = envs.swap_remove(env).ok_or_else(|| {
            fail(ConfigFailure::MissingEnvironment {
                env: env.to_string(),
                available: envs.keys().cloned().collect(),
            })
        })?;

        let open = expand_env(&conf.open).map_err(|e| fail(e.into()))?;
        let migrations_dir = match &conf.migrations {
            Some(rel) => dir.join(rel),
            None => dir.to_path_buf(),
        };

        Ok(DbConf {
            env: env.to_string(),
            dialect_name: conf.dialect.unwrap_or(conf.driver),
            open,
            migrations_dir,
        })
    }
}

/// One logical migration target (`create` or `schema`), immutable once loaded.
#[derive(Debug, Clone)]
pub struct MigrationSet {
    conf: DbConf,
    dialect: Dialect,
    parameters: ParameterMapping,
}

impl MigrationSet {
    /// Loads the set in `dir` for `env`, resolves its dialect and parses its
    /// open string.
    ///
    /// Errors:
    /// - [`Error::ConfigLoad`] (see [`DbConf::load`])
    /// - [`Error::UnsupportedDialect`] when the dialect is not Postgres
    /// - [`Error::Parse`] for a malformed open string
    pub fn load(dir: impl AsRef<Path>, env: &str) -> Result<Self> {
        let conf = DbConf::load(dir, env)?;
        Self::from_conf(conf)
    }

    /// Builds a set from an already loaded [`DbConf`].
    pub fn from_conf(conf: DbConf) -> Result<Self> {
        let dialect = Dialect::from_name(&conf.dialect_name)?;
        let parameters = match dialect {
            Dialect::Postgres => conn_string::parse(&conf.open)?,
        };
        debug!(
            env = %conf.env,
            %dialect,
            dir = %conf.migrations_dir.display(),
            params = %parameters.redacted(),
            "loaded migration set"
        );
        Ok(MigrationSet {
            conf,
            dialect,
            parameters,
        })
    }

    /// Dialect of the set.
    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Raw open string (after environment expansion).
    pub fn connection_string(&self) -> &str {
        &self.conf.open
    }

    /// Directory holding the set's numbered scripts.
    pub fn migrations_dir(&self) -> &Path {
        &self.conf.migrations_dir
    }

    /// Parameters parsed from the open string.
    pub fn parameters(&self) -> &ParameterMapping {
        &self.parameters
    }
}
