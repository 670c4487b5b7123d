use std::fs;
use std::path::{Component as PathComponent, Path, PathBuf};

use crate::config::Component;
use crate::error::{Error, Result};

/// Directory that relative includes resolve against.
///
/// An explicit `basedir` is used verbatim. Otherwise it is the absolute
/// directory holding `config_file` (a trailing `/` marks the path itself as
/// that directory), falling back to `cwd`.
pub fn get_base_dir(basedir: Option<&Path>, config_file: &Path, cwd: &Path) -> PathBuf {
    if let Some(b) = basedir.filter(|b| !b.as_os_str().is_empty()) {
        return b.to_path_buf();
    }
    let raw = config_file.to_string_lossy();
    let dir = if raw.ends_with('/') {
        config_file.to_path_buf()
    } else {
        config_file.parent().map(Path::to_path_buf).unwrap_or_default()
    };
    absolutize(cwd, &dir)
}

fn absolutize(cwd: &Path, p: &Path) -> PathBuf {
    if p.as_os_str().is_empty() {
        return cwd.to_path_buf();
    }
    let joined = if p.is_absolute() { p.to_path_buf() } else { cwd.join(p) };
    let mut out = PathBuf::new();
    for c in joined.components() {
        match c {
            PathComponent::CurDir => {}
            PathComponent::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Recreates `<project_dir>/<component>` as an empty directory.
pub fn prepare_staging_dir(project_dir: &Path, component: Component) -> Result<PathBuf> {
    let dir = project_dir.join(component.as_str());
    safe_remove_dir_all(project_dir, &dir)?;
    fs::create_dir_all(&dir).map_err(|e| {
        Error::io(&dir, e).context(format!("failed to create {component} working directory"))
    })?;
    Ok(dir)
}

fn safe_remove_dir_all(root: &Path, dir: &Path) -> Result<()> {
    if !dir.exists() {
        return Ok(());
    }
    let root_can = root.canonicalize().unwrap_or_else(|_| root.to_path_buf());
    let dir_can = dir.canonicalize().unwrap_or_else(|_| dir.to_path_buf());
    if !dir_can.starts_with(&root_can) || dir_can == root_can {
        return Err(Error::msg(format!(
            "refusing to remove '{}' (outside project dir '{}')",
            dir_can.display(),
            root_can.display()
        )));
    }
    fs::remove_dir_all(&dir_can).map_err(|e| Error::io(&dir_can, e))
}

/// Output paths are taken relative to the project directory.
pub fn resolve_output_path(project_dir: &Path, raw: &Path) -> PathBuf {
    if raw.is_absolute() {
        raw.to_path_buf()
    } else {
        project_dir.join(raw)
    }
}
