use std::fs;
use std::path::Path;
use std::process::Command;

use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::exec::{capture, run_cmd};

/// One checkout of a repository into `dest`.
#[derive(Debug, Clone)]
pub struct Checkout<'a> {
    pub label: &'a str,
    pub repo: &'a str,
    pub branch: &'a str,
    /// Commit to check out; `None` means the tip of `branch`.
    pub pin: Option<&'a str>,
    pub dest: &'a Path,
    /// Whether `dest` was created for this checkout alone and may be removed
    /// wholesale on failure, as opposed to a shared staging directory.
    pub owns_dest: bool,
}

/// Clones and checks out repositories, returning the commit that ended up at HEAD.
pub trait Vcs {
    fn checkout(&self, req: &Checkout<'_>) -> Result<String>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct GitCli;

fn git(dest: &Path) -> Command {
    let mut cmd = Command::new("git");
    cmd.arg("-C").arg(dest);
    cmd
}

impl GitCli {
    // Needs `uploadpack.allowReachableSHA1InWant` on the server when fetching
    // by commit hash, which is not the default.
    fn shallow(&self, req: &Checkout<'_>, reference: &str) -> Result<()> {
        fs::create_dir_all(req.dest).map_err(|e| Error::io(req.dest, e))?;
        let steps: [&[&str]; 4] = [
            &["init", "-q"],
            &["remote", "add", "origin", req.repo],
            &["fetch", "-q", "--depth=1", "origin", reference],
            &["checkout", "-q", "FETCH_HEAD"],
        ];
        for args in steps {
            let mut cmd = git(req.dest);
            cmd.args(args);
            run_cmd(req.label, cmd)?;
        }
        Ok(())
    }

    fn discard_partial(&self, req: &Checkout<'_>) {
        let target = if req.owns_dest {
            req.dest.to_path_buf()
        } else {
            req.dest.join(".git")
        };
        if let Err(e) = fs::remove_dir_all(&target) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!("{}: failed to clean up {}: {e}", req.label, target.display());
            }
        }
    }

    fn full(&self, req: &Checkout<'_>) -> Result<()> {
        let mut clone = Command::new("git");
        clone
            .args(["clone", "-q", "-b", req.branch, req.repo])
            .arg(req.dest);
        run_cmd(req.label, clone)?;
        if let Some(pin) = req.pin {
            let mut co = git(req.dest);
            co.args(["checkout", "-q", pin]);
            run_cmd(req.label, co)?;
        }
        Ok(())
    }
}

impl Vcs for GitCli {
    fn checkout(&self, req: &Checkout<'_>) -> Result<String> {
        let reference = req.pin.unwrap_or(req.branch);
        if let Err(e) = self.shallow(req, reference) {
            self.discard_partial(req);
            warn!(
                "{}: shallow clone failed: {e}; falling back to a full clone \
                 (the server likely lacks uploadpack.allowReachableSHA1InWant)",
                req.label
            );
            self.full(req).map_err(|e| e.context(req.label.to_string()))?;
        }

        let mut rev = git(req.dest);
        rev.args(["rev-parse", "HEAD"]);
        let head = capture(&mut rev).map_err(|e| e.context(req.label.to_string()))?;
        info!("{}: current hash is {head}", req.label);
        Ok(head)
    }
}
