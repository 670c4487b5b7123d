//! Per-entry drivers that fetch, verify and stage a resolved configuration.
//!
//! Every driver works relative to an explicit staging directory. Content
//! pins (commit hashes, archive digests) are written back into the entries,
//! so the configuration afterwards describes exactly what was fetched.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{info, warn};
use url::Url;

use crate::config::{Component, Config, DEFAULT_BRANCH, Files, Git, Gopkg, Node, Setting, Untar};
use crate::error::{Error, Result};
use crate::fetch::{Transport, archive, fetch_with_retry};
use crate::hash::{HashMode, verify_hash};
use crate::log_sanitize::redact_url_credentials;
use crate::overrides::{UrlOverrides, url_base_name};
use crate::vcs::{Checkout, Vcs};
use crate::workspace::prepare_staging_dir;

/// Whole-download retries when a fetched blob does not match its pin.
/// Some mirrors briefly serve half-written files after an update.
pub const VERIFY_ATTEMPTS: usize = 3;

pub struct Fetcher<'a> {
    pub transport: &'a dyn Transport,
    pub vcs: &'a dyn Vcs,
    /// Root for `file://` sources.
    pub base_dir: &'a Path,
    pub overrides: Option<&'a UrlOverrides>,
    pub hash_mode: HashMode,
}

impl Fetcher<'_> {
    fn override_url(&self, url: &str) -> String {
        match self.overrides {
            Some(o) => o.apply(url),
            None => url.to_string(),
        }
    }

    /// Fetches `components` in order, each into a fresh
    /// `<project_dir>/<component>` directory. Stops at the first failure.
    pub fn fetch_all(
        &self,
        config: &mut Config,
        components: &[Component],
        project_dir: &Path,
    ) -> Result<()> {
        for &component in components {
            let staging = prepare_staging_dir(project_dir, component)?;
            info!("{component}: staging into {}", staging.display());
            self.fetch_component(config, component, &staging)?;
        }
        Ok(())
    }

    pub fn fetch_component(
        &self,
        config: &mut Config,
        component: Component,
        staging: &Path,
    ) -> Result<()> {
        self.get_node(config.node_mut(component), staging)
            .map_err(|e| e.context(component.to_string()))
    }

    pub fn get_node(&self, node: &mut Node, staging: &Path) -> Result<()> {
        for (i, g) in node.git.iter_mut().enumerate() {
            self.get_git(g, staging)
                .map_err(|e| e.context(format!("error processing git entry {i}")))?;
        }
        for (i, p) in node.goget.iter_mut().enumerate() {
            self.get_gopkg(p, staging)
                .map_err(|e| e.context(format!("error processing goget entry {i}")))?;
        }
        for (i, u) in node.untar.iter_mut().enumerate() {
            self.get_untar(u, staging)
                .map_err(|e| e.context(format!("error processing untar entry {i}")))?;
        }
        if let Some(files) = node.files.as_mut() {
            self.get_files(files, staging)
                .map_err(|e| e.context("error processing files entry"))?;
        }
        Ok(())
    }

    pub fn get_git(&self, g: &mut Git, staging: &Path) -> Result<()> {
        let (dest, owns_dest) = if g.dest.is_empty() {
            (staging.to_path_buf(), false)
        } else {
            (staging.join(&g.dest), true)
        };
        let branch = resolve_branch(&mut g.branch);
        let head = self.checkout(&g.label, &g.url, &branch, &g.hash, &dest, owns_dest)?;
        g.hash = Setting::Value(head);
        Ok(())
    }

    pub fn get_gopkg(&self, p: &mut Gopkg, staging: &Path) -> Result<()> {
        let dest = go_package_dir(staging, &p.pkg)?;
        fs::create_dir_all(&dest).map_err(|e| Error::io(&dest, e))?;
        let repo = p.pkg.replacen("golang.org/x", "go.googlesource.com", 1);
        let branch = resolve_branch(&mut p.branch);
        let head = self.checkout(&p.label, &repo, &branch, &p.hash, &dest, true)?;
        p.hash = Setting::Value(head);
        Ok(())
    }

    fn checkout(
        &self,
        label: &str,
        repo: &str,
        branch: &str,
        pin: &Setting,
        dest: &Path,
        owns_dest: bool,
    ) -> Result<String> {
        let repo = self.override_url(repo);
        let pin = match self.hash_mode {
            HashMode::Update => None,
            HashMode::Strict | HashMode::Permissive => pin.value(),
        };
        info!(
            "{label}: cloning {} ({branch} {})",
            redact_url_credentials(&repo),
            pin.unwrap_or("")
        );

        let head = self.vcs.checkout(&Checkout {
            label,
            repo: &repo,
            branch,
            pin,
            dest,
            owns_dest,
        })?;

        if self.hash_mode == HashMode::Strict && pin.is_none() {
            return Err(Error::validation(format!(
                "{label}: {}: hash mode is strict and no hash supplied (current is {head})",
                redact_url_credentials(&repo)
            )));
        }
        Ok(head)
    }

    pub fn get_untar(&self, u: &mut Untar, staging: &Path) -> Result<()> {
        let data = self.fetch_and_verify(&u.label, &u.url, &mut u.hash)?;
        info!("{}: uncompressing into {}...", u.label, staging.display());
        archive::extract(&data, staging).map_err(|e| e.context(u.label.clone()))
    }

    pub fn get_files(&self, files: &mut Files, staging: &Path) -> Result<()> {
        let dest = staging.join(&files.dest);
        for f in files.filelist.iter_mut() {
            let name = url_base_name(&f.url);
            let data = self
                .fetch_and_verify(&files.label, &f.url, &mut f.hash)
                .map_err(|e| e.context(format!("{}: {name}", files.label)))?;
            fs::create_dir_all(&dest).map_err(|e| Error::io(&dest, e))?;
            let path = dest.join(&name);
            fs::write(&path, &data).map_err(|e| Error::io(&path, e))?;
        }
        Ok(())
    }

    /// Fetches `raw_url` (after overrides) and enforces the hash mode
    /// against `hash`, which is updated in place when it gets computed.
    ///
    /// `file://` sources are read from under `base_dir` and are not verified.
    pub fn fetch_and_verify(&self, label: &str, raw_url: &str, hash: &mut String) -> Result<Vec<u8>> {
        let url = self.override_url(raw_url);
        let shown = redact_url_credentials(&url);
        let parsed = Url::parse(&url)
            .map_err(|e| Error::validation(format!("{label}: invalid URL {shown:?}: {e}")))?;

        if parsed.scheme().eq_ignore_ascii_case("file") {
            let path = local_source_path(self.base_dir, &parsed);
            info!("{label}: reading {}", path.display());
            return fs::read(&path).map_err(|e| Error::io(&path, e).context(label.to_string()));
        }

        match self.hash_mode {
            HashMode::Strict if hash.is_empty() => {
                return Err(Error::validation(format!(
                    "{label}: {shown}: hash mode is strict and no hash supplied"
                )));
            }
            HashMode::Update => hash.clear(),
            HashMode::Strict | HashMode::Permissive => {}
        }

        let mut last = None;
        for attempt in 1..=VERIFY_ATTEMPTS {
            let data = fetch_with_retry(self.transport, label, &url)?;
            match verify_hash(&data, hash) {
                Ok(actual) if hash.is_empty() => {
                    info!("{label}: hash {actual}");
                    *hash = actual;
                    return Ok(data);
                }
                Ok(actual) => {
                    info!("{label}: hash {actual} (verified)");
                    return Ok(data);
                }
                Err(e) if e.is_hash_mismatch() => {
                    warn!(
                        "{label}: hash validation failed on attempt {attempt}/{VERIFY_ATTEMPTS}, downloading again: {e}"
                    );
                    last = Some(e);
                }
                Err(e) => return Err(e.context(label.to_string())),
            }
        }
        Err(last
            .unwrap_or_else(|| Error::msg("no download attempt was made"))
            .context(format!("{label}: {shown}")))
    }
}

// Unset or empty branches fall back to the default, which is written back.
fn resolve_branch(branch: &mut Setting) -> String {
    match branch.value() {
        Some(b) => b.to_string(),
        None => {
            *branch = Setting::from(DEFAULT_BRANCH);
            DEFAULT_BRANCH.to_string()
        }
    }
}

/// `<staging>/gopath/src/<host>/<path...>` for a package locator such as
/// `https://github.com/u-root/u-root` or `golang.org/x/sys`.
pub fn go_package_dir(staging: &Path, pkg: &str) -> Result<PathBuf> {
    let import_path = match Url::parse(pkg) {
        Ok(u) if u.has_host() => format!("{}{}", u.host_str().unwrap_or_default(), u.path()),
        _ => pkg.to_string(),
    };
    let mut dir = staging.join("gopath").join("src");
    for seg in import_path.split('/').filter(|s| !s.is_empty()) {
        if seg == ".." || seg == "." {
            return Err(Error::validation(format!(
                "package path {pkg:?} contains '{seg}'"
            )));
        }
        dir.push(seg);
    }
    Ok(dir)
}

fn local_source_path(base_dir: &Path, url: &Url) -> PathBuf {
    let mut path = base_dir.to_path_buf();
    if let Some(host) = url.host_str().filter(|h| !h.is_empty()) {
        path.push(host);
    }
    path.join(url.path().trim_start_matches('/'))
}
