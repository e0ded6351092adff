//! Supported database dialects.

use crate::error::{Error, Result};

/// Database technology a migration set targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// PostgreSQL, addressed with libpq connection strings.
    Postgres,
}

impl Dialect {
    /// Resolves a dialect from its configured name (case-insensitive).
    ///
    /// Any name other than `postgres`/`postgresql` is rejected with
    /// [`Error::UnsupportedDialect`] carrying the name as written.
    pub fn from_name(name: &str) -> Result<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(Dialect::Postgres),
            _ => Err(Error::UnsupportedDialect {
                dialect: name.to_string(),
            }),
        }
    }

    /// Canonical lowercase name.
    pub fn name(self) -> &'static str {
        match self {
            Dialect::Postgres => "postgres",
        }
    }
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
