//! Migration application: the engine seam plus forward/backward appliers.
//!
//! This module provides:
//! - [`MigrationEngine`]: version discovery and "run to version N" over a
//!   directory of numbered scripts.
//! - [`pg::PgEngine`]: the Diesel-backed Postgres engine.
//! - [`apply_up`] / [`apply_down`]: migrate a set to its latest version or
//!   back to zero.
//! - [`plan`]: which scripts a run to a given version touches.

pub mod pg;
pub mod scripts;

use std::collections::BTreeSet;
use std::path::Path;

use tracing::debug;

use crate::config::MigrationSet;
use crate::error::Result;
use crate::migrate::scripts::ScriptFile;

/// Executes numbered migration scripts against a set's database.
pub trait MigrationEngine {
    /// Highest script version available in `scripts_dir`.
    ///
    /// Fails with [`crate::Error::NoMigrations`] for an empty or unreadable directory.
    fn most_recent_version(&self, scripts_dir: &Path) -> Result<i64> {
        scripts::most_recent_version(scripts_dir)
    }

    /// Brings the database of `set` to `target` using the scripts in
    /// `scripts_dir`, applying upward or reverting downward as needed.
    fn run_migrations(&self, set: &MigrationSet, scripts_dir: &Path, target: i64) -> Result<()>;
}

/// Applies every pending script in `scripts_dir` up to the latest version.
pub fn apply_up(engine: &dyn MigrationEngine, set: &MigrationSet, scripts_dir: &Path) -> Result<()> {
    let target = engine.most_recent_version(scripts_dir)?;
    debug!(dir = %scripts_dir.display(), target, "migrating up");
    engine.run_migrations(set, scripts_dir, target)
}

/// Reverts every applied script in `scripts_dir` down to version zero.
pub fn apply_down(
    engine: &dyn MigrationEngine,
    set: &MigrationSet,
    scripts_dir: &Path,
) -> Result<()> {
    debug!(dir = %scripts_dir.display(), "migrating down to 0");
    engine.run_migrations(set, scripts_dir, 0)
}

/// Work for one run towards a target version.
#[derive(Debug, PartialEq, Eq)]
pub enum Plan<'a> {
    /// Unapplied scripts at or below the target, ascending.
    Apply(Vec<&'a ScriptFile>),
    /// Applied versions above the target, newest first.
    Revert(Vec<RevertStep<'a>>),
}

/// One version to revert.
#[derive(Debug, PartialEq, Eq)]
pub enum RevertStep<'a> {
    /// The script that applied it.
    Script(&'a ScriptFile),
    /// Recorded as applied, but no script carries this version any more.
    Missing(i64),
}

/// Decides what a run to `target` does, given `files` in ascending version
/// order and the versions already `applied`.
///
/// A target at or above the highest applied version applies every missing
/// script up to it, including lower versions that arrived late. A lower target
/// reverts.
pub fn plan<'a>(files: &'a [ScriptFile], applied: &BTreeSet<i64>, target: i64) -> Plan<'a> {
    let current = applied.last().copied().unwrap_or(0);
    if target >= current {
        return Plan::Apply(
            files
                .iter()
                .filter(|f| f.version <= target && !applied.contains(&f.version))
                .collect(),
        );
    }

    Plan::Revert(
        applied
            .iter()
            .rev()
            .filter(|v| **v > target)
            .map(|v| match files.iter().find(|f| f.version == *v) {
                Some(file) => RevertStep::Script(file),
                None => RevertStep::Missing(*v),
            })
            .collect(),
    )
}
