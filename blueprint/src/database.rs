//! Two-phase database provisioning over a paired `create`/`schema` layout.
//!
//! ```text
//! <root>/
//!   create/  dbconf.toml + 0001_create.sql ...   (templates, run against a maintenance db)
//!   schema/  dbconf.toml + 0001_init.sql ...     (plain scripts, run against the new db)
//! ```
//!
//! [`Database::build`] renders the `create` scripts with the `schema`
//! connection parameters, migrates them up, then migrates `schema` up.
//! [`Database::destroy`] renders the same `create` scripts and migrates them
//! down to zero. The `schema` set is never reverted on its own; its down path
//! is whatever the `create` down scripts drop.

use std::path::Path;

use tracing::info;

use crate::config::MigrationSet;
use crate::error::{Error, Result};
use crate::migrate::pg::PgEngine;
use crate::migrate::{MigrationEngine, apply_down, apply_up};
use crate::render::{ScriptRenderer, TeraRenderer, render_into};
use crate::scoped::{ScopedDirs, TempDirs};

/// Directory holding the create scripts, relative to the root.
pub const CREATE_DIR: &str = "create";
/// Directory holding the schema scripts, relative to the root.
pub const SCHEMA_DIR: &str = "schema";
/// Prefix of the scoped directory holding rendered create scripts.
pub const SCOPE_PREFIX: &str = "schema_";

/// External services a [`Database`] delegates to.
pub struct Collaborators {
    /// Source of ephemeral script directories.
    pub dirs: Box<dyn ScopedDirs>,
    /// Template renderer for create scripts.
    pub renderer: Box<dyn ScriptRenderer>,
    /// Migration engine for both sets.
    pub engine: Box<dyn MigrationEngine>,
}

impl Default for Collaborators {
    fn default() -> Self {
        Collaborators {
            dirs: Box::new(TempDirs::new()),
            renderer: Box::new(TeraRenderer),
            engine: Box::new(PgEngine),
        }
    }
}

/// One provisioning session: a `create` set and a `schema` set.
pub struct Database {
    create: MigrationSet,
    schema: MigrationSet,
    collab: Collaborators,
}

impl Database {
    /// Loads `<dir>/create` and `<dir>/schema` for `env` with the default
    /// collaborators (temp dirs, Tera, Postgres).
    pub fn open(dir: impl AsRef<Path>, env: &str) -> Result<Self> {
        Self::open_with(dir, env, Collaborators::default())
    }

    /// Like [`Database::open`] with explicit collaborators.
    pub fn open_with(dir: impl AsRef<Path>, env: &str, collab: Collaborators) -> Result<Self> {
        let dir = dir.as_ref();
        let create = MigrationSet::load(dir.join(CREATE_DIR), env)?;
        let schema = MigrationSet::load(dir.join(SCHEMA_DIR), env)?;
        Ok(Self::new(create, schema, collab))
    }

    /// Assembles a session from loaded sets.
    pub fn new(create: MigrationSet, schema: MigrationSet, collab: Collaborators) -> Self {
        Database {
            create,
            schema,
            collab,
        }
    }

    /// The `create` set.
    pub fn create_set(&self) -> &MigrationSet {
        &self.create
    }

    /// The `schema` set.
    pub fn schema_set(&self) -> &MigrationSet {
        &self.schema
    }

    /// Name of the target database (`dbname` of the schema set).
    ///
    /// Errors:
    /// - [`Error::MissingParameter`] when the schema open string has no `dbname`
    pub fn dbname(&self) -> Result<&str> {
        self.schema
            .parameters()
            .get("dbname")
            .ok_or_else(|| Error::MissingParameter {
                key: "dbname".to_string(),
            })
    }

    /// Creates the database, then applies its schema.
    ///
    /// A create-phase failure comes back as [`Error::CreateDatabase`]; a
    /// schema-phase failure is returned as-is.
    pub fn build(&self) -> Result<()> {
        let dbname = self.dbname()?;
        info!("creating {dbname}");
        self.templated(dbname, &mut |dir| {
            apply_up(self.collab.engine.as_ref(), &self.create, dir)
        })
        .map_err(|e| Error::CreateDatabase(Box::new(e)))?;

        info!("applying schema for {dbname}");
        apply_up(
            self.collab.engine.as_ref(),
            &self.schema,
            self.schema.migrations_dir(),
        )
    }

    /// Reverts the create set to zero (e.g. `DROP DATABASE`).
    pub fn destroy(&self) -> Result<()> {
        let dbname = self.dbname()?;
        info!("destroying {dbname}");
        self.templated(dbname, &mut |dir| {
            apply_down(self.collab.engine.as_ref(), &self.create, dir)
        })
    }

    fn templated(&self, dbname: &str, f: &mut dyn FnMut(&Path) -> Result<()>) -> Result<()> {
        render_into(
            self.collab.dirs.as_ref(),
            self.collab.renderer.as_ref(),
            self.create.migrations_dir(),
            &format!("{SCOPE_PREFIX}{dbname}"),
            self.schema.parameters(),
            f,
        )
    }
}
