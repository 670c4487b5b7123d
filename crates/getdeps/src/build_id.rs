use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::debug;

use crate::exec::capture;

/// Set by Buck to the directory the build was invoked from.
pub const CLIENT_PWD_ENV: &str = "BUCK_CLIENT_PWD";
pub const UNKNOWN_BUILD_ID: &str = "???";

/// `git describe` (or `hg identify`) output for the checkout containing `dir`.
pub fn identify_repo(dir: &Path) -> Option<String> {
    let mut git = Command::new("git");
    git.args(["describe", "--dirty", "--tags", "--always"])
        .current_dir(dir);
    if let Ok(id) = capture(&mut git) {
        return Some(id);
    }
    let mut hg = Command::new("hg");
    hg.arg("identify").current_dir(dir);
    match capture(&mut hg) {
        Ok(id) => Some(id),
        Err(e) => {
            debug!("{} is not a git or hg checkout: {e}", dir.display());
            None
        }
    }
}

/// Candidate directories, in the order they are tried.
pub fn candidate_dirs(client_pwd: Option<PathBuf>, config_file: &Path, project_dir: &Path) -> Vec<PathBuf> {
    let mut out = Vec::new();
    out.extend(client_pwd.filter(|p| !p.as_os_str().is_empty()));
    let config_abs = if config_file.is_absolute() {
        config_file.to_path_buf()
    } else {
        project_dir.join(config_file)
    };
    if let Some(parent) = config_abs.parent() {
        out.push(parent.to_path_buf());
    }
    out.push(project_dir.to_path_buf());
    out
}

pub fn resolve_with<F>(candidates: &[PathBuf], identify: F) -> String
where
    F: Fn(&Path) -> Option<String>,
{
    candidates
        .iter()
        .find_map(|dir| identify(dir).filter(|id| !id.is_empty()))
        .unwrap_or_else(|| UNKNOWN_BUILD_ID.to_string())
}

pub fn resolve_build_id(config_file: &Path, project_dir: &Path) -> String {
    let client_pwd = std::env::var_os(CLIENT_PWD_ENV).map(PathBuf::from);
    resolve_with(
        &candidate_dirs(client_pwd, config_file, project_dir),
        identify_repo,
    )
}
