//! Label-keyed merging of configuration layers.
//!
//! Entries in a patch replace fields of the base entry carrying the same
//! label; entries with new labels are appended after every base entry.
//! A field left at its empty value in the patch is not an override, except
//! for nullable fields where an explicit `""` clears the base value.

use crate::config::{Component, Config, Files, Git, Gopkg, Node, Setting, Untar};
use crate::error::{Error, Result};

/// Field-by-field override of one entry by another with the same label.
pub trait Overlay: Clone {
    fn label(&self) -> &str;
    /// Source locator, used to name entries that have no label.
    fn locator(&self) -> &str;
    fn overlay(&mut self, patch: &Self);
}

fn overlay_string(dst: &mut String, src: &str) {
    if !src.is_empty() {
        *dst = src.to_string();
    }
}

fn overlay_setting(dst: &mut Setting, src: &Setting) {
    match src {
        Setting::Unset => {}
        Setting::Value(v) if !v.is_empty() => *dst = Setting::Value(v.clone()),
        Setting::Value(_) | Setting::Cleared => *dst = Setting::Unset,
    }
}

impl Overlay for Git {
    fn label(&self) -> &str {
        &self.label
    }

    fn locator(&self) -> &str {
        &self.url
    }

    fn overlay(&mut self, patch: &Self) {
        overlay_string(&mut self.label, &patch.label);
        overlay_string(&mut self.url, &patch.url);
        overlay_string(&mut self.dest, &patch.dest);
        overlay_setting(&mut self.branch, &patch.branch);
        overlay_setting(&mut self.hash, &patch.hash);
    }
}

impl Overlay for Gopkg {
    fn label(&self) -> &str {
        &self.label
    }

    fn locator(&self) -> &str {
        &self.pkg
    }

    fn overlay(&mut self, patch: &Self) {
        overlay_string(&mut self.label, &patch.label);
        overlay_string(&mut self.pkg, &patch.pkg);
        overlay_setting(&mut self.branch, &patch.branch);
        overlay_setting(&mut self.hash, &patch.hash);
    }
}

impl Overlay for Untar {
    fn label(&self) -> &str {
        &self.label
    }

    fn locator(&self) -> &str {
        &self.url
    }

    fn overlay(&mut self, patch: &Self) {
        overlay_string(&mut self.label, &patch.label);
        overlay_string(&mut self.url, &patch.url);
        overlay_string(&mut self.hash, &patch.hash);
    }
}

fn merge_entries<T: Overlay>(base: &[T], patch: &[T]) -> Result<Vec<T>> {
    let mut out = base.to_vec();
    for p in patch {
        if p.label().is_empty() {
            return Err(Error::validation(format!(
                "label for {} cannot be empty",
                p.locator()
            )));
        }
        match out.iter_mut().find(|e| e.label() == p.label()) {
            Some(existing) => existing.overlay(p),
            None => out.push(p.clone()),
        }
    }
    Ok(out)
}

// The file list is a single object: one present in the patch wins whole.
fn merge_files(base: &Option<Files>, patch: &Option<Files>) -> Option<Files> {
    patch.as_ref().or(base.as_ref()).cloned()
}

pub fn merge_nodes(base: &Node, patch: &Node) -> Result<Node> {
    Ok(Node {
        git: merge_entries(&base.git, &patch.git)?,
        goget: merge_entries(&base.goget, &patch.goget)?,
        untar: merge_entries(&base.untar, &patch.untar)?,
        files: merge_files(&base.files, &patch.files),
    })
}

/// Merges every component tree of `patch` onto `base`.
///
/// The result carries neither a build id nor includes; both only have
/// meaning on a single parsed document.
pub fn merge_configs(base: &Config, patch: &Config) -> Result<Config> {
    let mut out = Config::default();
    for c in Component::ALL {
        *out.node_mut(c) = merge_nodes(base.node(c), patch.node(c))
            .map_err(|e| e.context(format!("error merging {c} config")))?;
    }
    Ok(out)
}
