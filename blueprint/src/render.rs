//! Rendering `*.sql` migration templates into a scoped directory.
//!
//! Templates use Tera syntax; connection parameters are exposed by name, so a
//! create script reads `CREATE DATABASE {{dbname}};`. Rendering is strict: a
//! placeholder without a matching parameter fails instead of rendering blank.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tera::{Context, Tera};
use tracing::debug;

use crate::conn_string::ParameterMapping;
use crate::error::{Error, RenderFailure, Result};
use crate::scoped::ScopedDirs;

/// Extension of the files picked up as templates.
pub const TEMPLATE_EXTENSION: &str = "sql";

/// Renders a directory of templates into another directory.
pub trait ScriptRenderer {
    /// Renders every `*.sql` file of `source_dir` into `dest_dir` under the same
    /// file name. Returns the source path → rendered path mapping.
    fn render_all(
        &self,
        source_dir: &Path,
        dest_dir: &Path,
        params: &ParameterMapping,
    ) -> Result<BTreeMap<PathBuf, PathBuf>>;
}

/// [`ScriptRenderer`] using Tera one-off templates.
#[derive(Debug, Default, Clone, Copy)]
pub struct TeraRenderer;

impl ScriptRenderer for TeraRenderer {
    fn render_all(
        &self,
        source_dir: &Path,
        dest_dir: &Path,
        params: &ParameterMapping,
    ) -> Result<BTreeMap<PathBuf, PathBuf>> {
        let mut context = Context::new();
        for (key, value) in params {
            context.insert(key.as_str(), value);
        }

        let mut rendered = BTreeMap::new();
        for source in templates_in(source_dir).map_err(|e| render_err(source_dir, e.into()))? {
            let Some(file_name) = source.file_name() else {
                continue;
            };
            let text =
                std::fs::read_to_string(&source).map_err(|e| render_err(&source, e.into()))?;
            let out = Tera::one_off(&text, &context, false)
                .map_err(|e| render_err(&source, e.into()))?;

            let dest = dest_dir.join(file_name);
            std::fs::write(&dest, out).map_err(|e| render_err(&source, e.into()))?;
            debug!(from = %source.display(), to = %dest.display(), "rendered template");
            rendered.insert(source, dest);
        }
        Ok(rendered)
    }
}

fn render_err(path: &Path, source: RenderFailure) -> Error {
    Error::TemplateRender {
        path: path.to_path_buf(),
        source,
    }
}

/// Sorted `*.sql` regular files directly inside `dir`.
fn templates_in(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == TEMPLATE_EXTENSION) {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

/// Renders the templates of `source_dir` into a scoped directory named after
/// `scope_name`, then runs `and_then` on that directory.
///
/// The directory is removed before this returns, also when rendering or
/// `and_then` fails; their error is returned after cleanup.
pub fn render_into(
    dirs: &dyn ScopedDirs,
    renderer: &dyn ScriptRenderer,
    source_dir: &Path,
    scope_name: &str,
    params: &ParameterMapping,
    and_then: &mut dyn FnMut(&Path) -> Result<()>,
) -> Result<()> {
    dirs.with_scoped_dir(scope_name, &mut |dir| {
        let rendered = renderer.render_all(source_dir, dir, params)?;
        debug!(scope = scope_name, count = rendered.len(), "templates rendered");
        and_then(dir)
    })
}
