//! Error types for configuration, rendering, and migration failures.

use std::path::PathBuf;

use shared_utils::env::MissingEnvVarError;
use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// The unified error type for the `blueprint` crate.
#[derive(Debug, Error)]
pub enum Error {
    /// The `dbconf.toml` of a migration set could not be loaded.
    #[error("failed to load migration config {}", path.display())]
    ConfigLoad {
        /// Path of the config file that was read.
        path: PathBuf,
        /// What went wrong.
        #[source]
        source: ConfigFailure,
    },

    /// The config names a dialect other than Postgres.
    #[error("unsupported dialect {dialect}")]
    UnsupportedDialect {
        /// Dialect name found in the config.
        dialect: String,
    },

    /// A connection string token is not of the form `key=value`.
    #[error("malformed connection string token {token:?}, expected key=value")]
    Parse {
        /// The offending token.
        token: String,
    },

    /// A required parameter is absent from the schema connection string.
    #[error("schema connection string has no {key:?} parameter")]
    MissingParameter {
        /// Name of the missing parameter.
        key: String,
    },

    /// A migration template could not be rendered or written.
    #[error("failed to render template {}", path.display())]
    TemplateRender {
        /// Template source path.
        path: PathBuf,
        /// What went wrong.
        #[source]
        source: RenderFailure,
    },

    /// The ephemeral script directory could not be created or removed.
    #[error("scoped directory {name} failed")]
    ScopedDir {
        /// Scope name the directory was created for.
        name: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// No numbered migration scripts could be found.
    #[error("no migrations found in {}", dir.display())]
    NoMigrations {
        /// Directory that was scanned.
        dir: PathBuf,
        /// Set when the directory itself could not be read.
        #[source]
        source: Option<std::io::Error>,
    },

    /// A migration script is malformed.
    #[error("invalid migration script {}: {reason}", path.display())]
    InvalidScript {
        /// Path of the script.
        path: PathBuf,
        /// Why it was rejected.
        reason: String,
    },

    /// The migration engine failed to connect or to apply a script.
    #[error("migration failed in {}", dir.display())]
    MigrationExecution {
        /// Scripts directory being applied.
        dir: PathBuf,
        /// Engine error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The create phase of a build failed.
    #[error("failed to create database")]
    CreateDatabase(#[source] Box<Error>),
}

/// Reasons a `dbconf.toml` could not be loaded.
#[derive(Debug, Error)]
pub enum ConfigFailure {
    /// The file could not be read.
    #[error("cannot read file")]
    Io(#[from] std::io::Error),

    /// The file is not valid TOML or has unexpected keys.
    #[error("invalid TOML")]
    Toml(#[from] toml::de::Error),

    /// The requested environment has no table in the file.
    #[error("environment {env:?} not found (available: {})", available.join(", "))]
    MissingEnvironment {
        /// Requested environment.
        env: String,
        /// Environments present in the file, in file order.
        available: Vec<String>,
    },

    /// The open string references an unset environment variable.
    #[error(transparent)]
    Env(#[from] MissingEnvVarError),
}

/// Reasons a single template could not be rendered.
#[derive(Debug, Error)]
pub enum RenderFailure {
    /// Template syntax error or an unresolved placeholder.
    #[error(transparent)]
    Template(#[from] tera::Error),

    /// Reading the template or writing the rendered file failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn execution<E>(dir: impl Into<PathBuf>, err: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Error::MigrationExecution {
            dir: dir.into(),
            source: err.into(),
        }
    }
}
