#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use blueprint::Collaborators;
use blueprint::config::MigrationSet;
use blueprint::error::{Error, Result};
use blueprint::migrate::{MigrationEngine, Plan, RevertStep, plan};
use blueprint::migrate::scripts;
use blueprint::render::TeraRenderer;
use blueprint::scoped::TempDirs;
use tempfile::TempDir;

pub const ENV: &str = "test";

pub const CREATE_CONF: &str = r#"
[test]
driver = "postgres"
open = "user=postgres dbname=postgres sslmode=disable"
"#;

pub const SCHEMA_CONF: &str = r#"
[test]
driver = "postgres"
open = "postgres://app@localhost:5432/testdb?sslmode=disable"
"#;

pub const CREATE_SQL: &str = "\
-- +goose NO TRANSACTION
-- +goose Up
CREATE DATABASE {{dbname}};

-- +goose Down
DROP DATABASE {{dbname}};
";

pub const OWNER_SQL: &str = "\
-- +goose NO TRANSACTION
-- +goose Up
ALTER DATABASE {{dbname}} OWNER TO {{user}};
";

pub const INIT_SQL: &str = "\
-- +goose Up
CREATE TABLE accounts (id serial PRIMARY KEY, email text NOT NULL);

-- +goose Down
DROP TABLE accounts;
";

/// Root with `create/` and `schema/`, plus an empty scratch dir for scoped dirs.
pub struct Fixture {
    pub root: TempDir,
    pub scratch: TempDir,
}

impl Fixture {
    pub fn create_dir(&self) -> PathBuf {
        self.root.path().join("create")
    }

    pub fn schema_dir(&self) -> PathBuf {
        self.root.path().join("schema")
    }

    /// Number of entries left in the scratch dir.
    pub fn leftover_scoped_dirs(&self) -> usize {
        std::fs::read_dir(self.scratch.path()).unwrap().count()
    }
}

pub fn fixture() -> Fixture {
    let root = TempDir::new().expect("tempdir");
    let create = root.path().join("create");
    let schema = root.path().join("schema");
    std::fs::create_dir_all(&create).unwrap();
    std::fs::create_dir_all(&schema).unwrap();

    std::fs::write(create.join("dbconf.toml"), CREATE_CONF).unwrap();
    std::fs::write(create.join("0001_create.sql"), CREATE_SQL).unwrap();
    std::fs::write(create.join("0002_owner.sql"), OWNER_SQL).unwrap();
    std::fs::write(schema.join("dbconf.toml"), SCHEMA_CONF).unwrap();
    std::fs::write(schema.join("0001_init.sql"), INIT_SQL).unwrap();

    Fixture {
        root,
        scratch: TempDir::new().expect("scratch"),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

/// One script applied or reverted by [`RecordingEngine`].
#[derive(Debug, Clone)]
pub struct Event {
    /// `dbname` of the set the script ran against.
    pub set: String,
    pub direction: Direction,
    pub version: i64,
    pub file: String,
    /// Script text as it was on disk when it ran.
    pub body: String,
    pub scripts_dir: PathBuf,
}

#[derive(Default)]
pub struct Log {
    pub events: Vec<Event>,
    applied: BTreeMap<String, BTreeSet<i64>>,
    fail: Option<(String, Direction)>,
}

/// In-memory engine that tracks applied versions per set and records every
/// script it runs. Script selection goes through [`plan`], like `PgEngine`.
#[derive(Clone, Default)]
pub struct RecordingEngine {
    pub log: Rc<RefCell<Log>>,
}

impl RecordingEngine {
    /// Makes runs against the set with `dbname` fail in `direction`.
    pub fn fail_on(&self, dbname: &str, direction: Direction) {
        self.log.borrow_mut().fail = Some((dbname.to_string(), direction));
    }

    pub fn events(&self) -> Vec<Event> {
        self.log.borrow().events.clone()
    }
}

impl MigrationEngine for RecordingEngine {
    fn run_migrations(&self, set: &MigrationSet, scripts_dir: &Path, target: i64) -> Result<()> {
        let files = scripts::discover(scripts_dir)?;
        let name = set.parameters().get("dbname").unwrap_or_default().to_string();
        let mut log = self.log.borrow_mut();

        let applied = log.applied.get(&name).cloned().unwrap_or_default();
        let (direction, todo): (Direction, Vec<&scripts::ScriptFile>) =
            match plan(&files, &applied, target) {
                Plan::Apply(pending) => (Direction::Up, pending),
                Plan::Revert(steps) => (
                    Direction::Down,
                    steps
                        .into_iter()
                        .filter_map(|step| match step {
                            RevertStep::Script(file) => Some(file),
                            RevertStep::Missing(_) => None,
                        })
                        .collect(),
                ),
            };

        if log.fail.as_ref() == Some(&(name.clone(), direction)) {
            return Err(Error::MigrationExecution {
                dir: scripts_dir.to_path_buf(),
                source: format!("injected {direction:?} failure for {name}").into(),
            });
        }

        for file in todo {
            log.events.push(Event {
                set: name.clone(),
                direction,
                version: file.version,
                file: file.file_name(),
                body: std::fs::read_to_string(&file.path).unwrap(),
                scripts_dir: scripts_dir.to_path_buf(),
            });
            let versions = log.applied.entry(name.clone()).or_default();
            match direction {
                Direction::Up => versions.insert(file.version),
                Direction::Down => versions.remove(&file.version),
            };
        }
        Ok(())
    }
}

/// Collaborators wired to `engine`, with scoped dirs under the fixture scratch dir.
pub fn collaborators(fx: &Fixture, engine: &RecordingEngine) -> Collaborators {
    Collaborators {
        dirs: Box::new(TempDirs::in_dir(fx.scratch.path())),
        renderer: Box::new(TeraRenderer),
        engine: Box::new(engine.clone()),
    }
}
