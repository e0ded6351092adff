//! Numbered migration scripts: discovery and annotation parsing.
//!
//! Script files are named `<version>_<description>.sql` where `<version>` is a
//! positive integer. Their bodies use goose-style annotations:
//!
//! ```sql
//! -- +goose NO TRANSACTION
//! -- +goose Up
//! CREATE DATABASE app;
//!
//! -- +goose Down
//! DROP DATABASE app;
//! ```
//!
//! Statements end at a line whose trimmed text ends with `;`. A body wrapped in
//! `-- +goose StatementBegin` / `-- +goose StatementEnd` is kept as one
//! statement regardless of the semicolons inside it.

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

const ANNOTATION: &str = "-- +goose";

/// A script file found on disk, not yet read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptFile {
    /// Version parsed from the file name prefix.
    pub version: i64,
    /// Full path of the file.
    pub path: PathBuf,
}

impl ScriptFile {
    /// File name for logs.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Lists the numbered `.sql` scripts of `dir` in ascending version order.
///
/// Files without a numeric `<version>_` prefix or without the `sql`
/// extension are ignored.
///
/// Errors:
/// - [`Error::NoMigrations`] if `dir` cannot be read or holds no scripts
/// - [`Error::InvalidScript`] if two files share a version
pub fn discover(dir: &Path) -> Result<Vec<ScriptFile>> {
    let entries = std::fs::read_dir(dir).map_err(|e| Error::NoMigrations {
        dir: dir.to_path_buf(),
        source: Some(e),
    })?;

    let mut scripts = Vec::new();
    for entry in entries {
        let path = entry
            .map_err(|e| Error::NoMigrations {
                dir: dir.to_path_buf(),
                source: Some(e),
            })?
            .path();
        if !path.is_file() || path.extension().is_none_or(|ext| ext != "sql") {
            continue;
        }
        if let Some(version) = version_of(&path) {
            scripts.push(ScriptFile { version, path });
        }
    }

    scripts.sort_by(|a, b| a.version.cmp(&b.version).then_with(|| a.path.cmp(&b.path)));
    if let Some(pair) = scripts.windows(2).find(|w| w[0].version == w[1].version) {
        return Err(Error::InvalidScript {
            path: pair[1].path.clone(),
            reason: format!(
                "version {} is also used by {}",
                pair[1].version,
                pair[0].file_name()
            ),
        });
    }
    if scripts.is_empty() {
        return Err(Error::NoMigrations {
            dir: dir.to_path_buf(),
            source: None,
        });
    }
    Ok(scripts)
}

/// Highest script version in `dir`.
pub fn most_recent_version(dir: &Path) -> Result<i64> {
    let scripts = discover(dir)?;
    Ok(scripts.last().map(|s| s.version).unwrap_or_default())
}

fn version_of(path: &Path) -> Option<i64> {
    let name = path.file_name()?.to_str()?;
    let (prefix, _) = name.split_once('_')?;
    prefix.parse::<i64>().ok().filter(|v| *v > 0)
}

/// A script body split into its up and down statements.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedScript {
    /// Statements applied when migrating up.
    pub up: Vec<String>,
    /// Statements applied when migrating down.
    pub down: Vec<String>,
    /// False when annotated with `NO TRANSACTION`.
    pub in_transaction: bool,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Section {
    Preamble,
    Up,
    Down,
}

/// Splits an annotated script body into statements.
///
/// Errors:
/// - [`Error::InvalidScript`] without an `Up` annotation, or with an
///   unterminated `StatementBegin`
pub fn parse_script(path: &Path, body: &str) -> Result<ParsedScript> {
    let invalid = |reason: &str| Error::InvalidScript {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    };

    let mut parsed = ParsedScript {
        in_transaction: true,
        ..ParsedScript::default()
    };
    let mut section = Section::Preamble;
    let mut seen_up = false;
    let mut in_block = false;
    let mut buf = String::new();

    for line in body.lines() {
        let trimmed = line.trim();

        if let Some(cmd) = trimmed.strip_prefix(ANNOTATION) {
            match cmd.trim().to_ascii_uppercase().as_str() {
                "UP" => {
                    flush(&mut buf, section, &mut parsed);
                    section = Section::Up;
                    seen_up = true;
                }
                "DOWN" => {
                    flush(&mut buf, section, &mut parsed);
                    section = Section::Down;
                }
                "NO TRANSACTION" => parsed.in_transaction = false,
                "STATEMENTBEGIN" => in_block = true,
                "STATEMENTEND" => {
                    in_block = false;
                    flush(&mut buf, section, &mut parsed);
                }
                _ => {}
            }
            continue;
        }

        if section == Section::Preamble {
            continue;
        }

        buf.push_str(line);
        buf.push('\n');
        if !in_block && trimmed.ends_with(';') {
            flush(&mut buf, section, &mut parsed);
        }
    }

    if in_block {
        return Err(invalid("StatementBegin without StatementEnd"));
    }
    if !seen_up {
        return Err(invalid("missing `-- +goose Up` annotation"));
    }
    flush(&mut buf, section, &mut parsed);
    Ok(parsed)
}

fn flush(buf: &mut String, section: Section, parsed: &mut ParsedScript) {
    let stmt = std::mem::take(buf);
    if is_blank(&stmt) {
        return;
    }
    match section {
        Section::Up => parsed.up.push(stmt.trim().to_string()),
        Section::Down => parsed.down.push(stmt.trim().to_string()),
        Section::Preamble => {}
    }
}

/// True for text holding nothing but whitespace and `--` comments.
fn is_blank(stmt: &str) -> bool {
    stmt.lines().all(|l| {
        let l = l.trim();
        l.is_empty() || l.starts_with("--")
    })
}
