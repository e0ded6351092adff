//! Ephemeral directories bound to the dynamic extent of a callback.

use std::path::{Path, PathBuf};

use tempfile::Builder;
use tracing::debug;

use crate::error::{Error, Result};

/// Provides a directory that only lives for the duration of `f`.
pub trait ScopedDirs {
    /// Creates a fresh directory tagged `name`, runs `f` with its path, and
    /// removes the directory with its contents before returning, whatever `f`
    /// returned.
    fn with_scoped_dir(
        &self,
        name: &str,
        f: &mut dyn FnMut(&Path) -> Result<()>,
    ) -> Result<()>;
}

/// [`ScopedDirs`] backed by [`tempfile::TempDir`].
///
/// Directories are created under `root` (the system temp dir by default) as
/// `<name>.<random>`. The guard also removes the directory while unwinding
/// from a panic.
#[derive(Debug, Clone, Default)]
pub struct TempDirs {
    root: Option<PathBuf>,
}

impl TempDirs {
    /// Scoped directories under the system temp dir.
    pub fn new() -> Self {
        Self::default()
    }

    /// Scoped directories under `root`.
    pub fn in_dir(root: impl Into<PathBuf>) -> Self {
        TempDirs {
            root: Some(root.into()),
        }
    }
}

impl ScopedDirs for TempDirs {
    fn with_scoped_dir(
        &self,
        name: &str,
        f: &mut dyn FnMut(&Path) -> Result<()>,
    ) -> Result<()> {
        let scoped_err = |source| Error::ScopedDir {
            name: name.to_string(),
            source,
        };

        let prefix = format!("{name}.");
        let mut builder = Builder::new();
        builder.prefix(&prefix);
        let dir = match &self.root {
            Some(root) => builder.tempdir_in(root),
            None => builder.tempdir(),
        }
        .map_err(scoped_err)?;
        debug!(dir = %dir.path().display(), "created scoped directory");

        let outcome = f(dir.path());

        let path = dir.path().to_path_buf();
        let removed = dir.close();
        debug!(dir = %path.display(), "removed scoped directory");

        // A callback failure outranks a cleanup failure.
        outcome?;
        removed.map_err(scoped_err)
    }
}
