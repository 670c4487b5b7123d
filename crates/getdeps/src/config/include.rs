//! Expansion of `includes` directives.
//!
//! Includes are expanded depth-first, pre-order: each included document is
//! fully resolved before being merged into the accumulator, later includes
//! override earlier ones, and the including document's own entries are
//! merged last so they win over everything it includes.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::{Config, merge_configs};
use crate::error::{Error, Result};

/// Hard bound on include nesting. Cycles are only caught by running into it.
pub const MAX_INCLUDE_DEPTH: usize = 512;

/// Parses `data` and expands its includes. Relative include paths are
/// resolved against `base_dir`, at every nesting level.
pub fn resolve(data: &[u8], base_dir: &Path) -> Result<Config> {
    resolve_document(Config::parse(data)?, base_dir)
}

pub fn resolve_file(path: &Path, base_dir: &Path) -> Result<Config> {
    let data = fs::read(path).map_err(|e| {
        Error::io(path, e).context(format!(
            "failed to read configuration file '{}'",
            path.display()
        ))
    })?;
    resolve(&data, base_dir)
}

fn include_path(base_dir: &Path, include: &str) -> PathBuf {
    let p = PathBuf::from(include);
    if p.is_absolute() { p } else { base_dir.join(p) }
}

/// One document being expanded: its own fields, the includes merged so far,
/// and the file it was loaded from (`None` for the root document).
struct Frame {
    doc: Config,
    next: usize,
    acc: Config,
    origin: Option<PathBuf>,
}

impl Frame {
    fn new(doc: Config, origin: Option<PathBuf>) -> Self {
        Self {
            doc,
            next: 0,
            acc: Config::default(),
            origin,
        }
    }

    fn finish(self) -> Result<(Config, Option<PathBuf>)> {
        let merged = merge_configs(&self.acc, &self.doc)
            .map_err(|e| e.context("failed to merge top config into the configuration"));
        match (merged, self.origin) {
            (Ok(merged), origin) => Ok((merged, origin)),
            (Err(e), Some(path)) => Err(loading(&path)(e)),
            (Err(e), None) => Err(e),
        }
    }
}

fn load(path: &Path) -> Result<Config> {
    let data = fs::read(path).map_err(|e| Error::io(path, e))?;
    Config::parse(&data)
}

fn loading(path: &Path) -> impl FnOnce(Error) -> Error + '_ {
    move |e| e.context(format!("failed to load '{}'", path.display()))
}

// Expansion runs on an explicit stack of frames so that even the deepest
// permitted nesting costs heap, not call stack.
fn resolve_document(root: Config, base_dir: &Path) -> Result<Config> {
    let mut stack = vec![Frame::new(root, None)];

    loop {
        let depth = stack.len();
        let Some(frame) = stack.last_mut() else {
            return Err(Error::msg("include stack underflow"));
        };

        if let Some(include) = frame.doc.includes.get(frame.next) {
            frame.next += 1;
            let path = include_path(base_dir, include);
            if depth >= MAX_INCLUDE_DEPTH {
                return Err(loading(&path)(Error::RecursionLimit(MAX_INCLUDE_DEPTH)));
            }
            debug!("including {} (depth {})", path.display(), depth + 1);
            let doc = load(&path).map_err(loading(&path))?;
            stack.push(Frame::new(doc, Some(path)));
            continue;
        }

        let Some(done) = stack.pop() else {
            return Err(Error::msg("include stack underflow"));
        };
        let (resolved, origin) = done.finish()?;
        let (Some(path), Some(parent)) = (origin, stack.last_mut()) else {
            return Ok(resolved);
        };
        parent.acc = merge_configs(&parent.acc, &resolved).map_err(|e| {
            e.context(format!(
                "failed to merge file '{}' into the configuration",
                path.display()
            ))
        })?;
    }
}
