//! Postgres migration engine on top of Diesel's migration harness.
//!
//! Scripts are read from disk on every run (they may have just been rendered
//! into a scoped directory), wrapped as Diesel [`Migration`]s, and applied one
//! by one through [`MigrationHarness`], which also records applied versions in
//! its bookkeeping table.

use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;

use diesel::connection::{BoxableConnection, SimpleConnection};
use diesel::migration::{self, Migration, MigrationMetadata, MigrationName, MigrationVersion};
use diesel::pg::Pg;
use diesel::{Connection, PgConnection};
use diesel_migrations::MigrationHarness;
use tracing::{info, warn};

use crate::config::MigrationSet;
use crate::dialect::Dialect;
use crate::error::{Error, Result};
use crate::migrate::{MigrationEngine, Plan, RevertStep, plan};
use crate::migrate::scripts::{self, ParsedScript, ScriptFile};

/// Diesel-backed engine; opens one connection per run.
#[derive(Debug, Default, Clone, Copy)]
pub struct PgEngine;

impl MigrationEngine for PgEngine {
    fn run_migrations(&self, set: &MigrationSet, scripts_dir: &Path, target: i64) -> Result<()> {
        let files = scripts::discover(scripts_dir)?;
        let mut conn = match set.dialect() {
            Dialect::Postgres => PgConnection::establish(set.connection_string())
                .map_err(|e| Error::execution(scripts_dir, e))?,
        };

        let applied = applied_versions(&mut conn).map_err(|e| Error::execution(scripts_dir, e))?;

        match plan(&files, &applied, target) {
            Plan::Apply(pending) => {
                for file in pending {
                    let script = SqlScript::load(file)?;
                    conn.run_migration(&script)
                        .map_err(|e| Error::execution(scripts_dir, e))?;
                    info!(version = file.version, script = %file.file_name(), "applied");
                }
            }
            Plan::Revert(steps) => {
                for step in steps {
                    let file = match step {
                        RevertStep::Script(file) => file,
                        RevertStep::Missing(version) => {
                            warn!(version, dir = %scripts_dir.display(), "applied version has no script, skipping");
                            continue;
                        }
                    };
                    let script = SqlScript::load(file)?;
                    conn.revert_migration(&script)
                        .map_err(|e| Error::execution(scripts_dir, e))?;
                    info!(version = file.version, script = %file.file_name(), "reverted");
                }
            }
        }
        Ok(())
    }
}

/// Applied versions that parse as integers, ascending.
fn applied_versions(conn: &mut PgConnection) -> migration::Result<BTreeSet<i64>> {
    Ok(conn
        .applied_migrations()?
        .iter()
        .filter_map(|v| v.to_string().parse::<i64>().ok())
        .collect())
}

struct ScriptName {
    version: String,
    file_name: String,
}

impl fmt::Display for ScriptName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.file_name)
    }
}

impl MigrationName for ScriptName {
    fn version(&self) -> MigrationVersion<'_> {
        MigrationVersion::from(self.version.clone())
    }
}

struct SqlScript {
    name: ScriptName,
    body: ParsedScript,
}

impl SqlScript {
    fn load(file: &ScriptFile) -> Result<Self> {
        let text = std::fs::read_to_string(&file.path).map_err(|e| Error::InvalidScript {
            path: file.path.clone(),
            reason: format!("cannot read: {e}"),
        })?;
        Ok(SqlScript {
            name: ScriptName {
                version: file.version.to_string(),
                file_name: file.file_name(),
            },
            body: scripts::parse_script(&file.path, &text)?,
        })
    }
}

impl MigrationMetadata for SqlScript {
    fn run_in_transaction(&self) -> bool {
        self.body.in_transaction
    }
}

impl Migration<Pg> for SqlScript {
    fn run(&self, conn: &mut dyn BoxableConnection<Pg>) -> migration::Result<()> {
        execute(conn, &self.body.up)
    }

    fn revert(&self, conn: &mut dyn BoxableConnection<Pg>) -> migration::Result<()> {
        execute(conn, &self.body.down)
    }

    fn metadata(&self) -> &dyn MigrationMetadata {
        self
    }

    fn name(&self) -> &dyn MigrationName {
        &self.name
    }
}

// One round trip per statement: CREATE/DROP DATABASE refuse to share a
// multi-statement query string.
fn execute(conn: &mut dyn BoxableConnection<Pg>, statements: &[String]) -> migration::Result<()> {
    for stmt in statements {
        conn.batch_execute(stmt)?;
    }
    Ok(())
}
