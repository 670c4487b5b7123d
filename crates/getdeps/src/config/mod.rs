//! Configuration documents: parsing, merging and include expansion.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub mod entry;
pub mod include;
pub mod merge;

pub use entry::{FileEntry, Files, Git, Gopkg, Setting, Untar};
pub use include::{MAX_INCLUDE_DEPTH, resolve, resolve_file};
pub use merge::{merge_configs, merge_nodes};

pub const DEFAULT_BRANCH: &str = "master";

/// Everything one component needs fetched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub git: Vec<Git>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub goget: Vec<Gopkg>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub untar: Vec<Untar>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub files: Option<Files>,
}

impl Node {
    pub fn is_empty(&self) -> bool {
        self.git.is_empty() && self.goget.is_empty() && self.untar.is_empty() && self.files.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// `git describe` / `hg identify` of the tree the build ran from.
    /// Ignored on input; the manifest writer always refreshes it.
    #[serde(default)]
    pub build_id: String,
    /// Later includes override earlier ones.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub includes: Vec<String>,
    #[serde(default)]
    pub initramfs: Node,
    #[serde(default)]
    pub kernel: Node,
    #[serde(default)]
    pub coreboot: Node,
}

impl Config {
    /// Parses a single document without expanding its includes.
    pub fn parse(data: &[u8]) -> Result<Self> {
        serde_json::from_slice(data)
            .map_err(|e| Error::Parse(format!("failed to unmarshal configuration: {e}")))
    }

    pub fn node(&self, component: Component) -> &Node {
        match component {
            Component::Initramfs => &self.initramfs,
            Component::Kernel => &self.kernel,
            Component::Coreboot => &self.coreboot,
        }
    }

    pub fn node_mut(&mut self, component: Component) -> &mut Node {
        match component {
            Component::Initramfs => &mut self.initramfs,
            Component::Kernel => &mut self.kernel,
            Component::Coreboot => &mut self.coreboot,
        }
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| Error::msg(format!("failed to marshal configuration: {e}")))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Component {
    Initramfs,
    Kernel,
    Coreboot,
}

impl Component {
    pub const ALL: [Component; 3] = [Component::Initramfs, Component::Kernel, Component::Coreboot];

    pub fn as_str(self) -> &'static str {
        match self {
            Component::Initramfs => "initramfs",
            Component::Kernel => "kernel",
            Component::Coreboot => "coreboot",
        }
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Component {
    type Err = Error;

    fn from_str(raw: &str) -> Result<Self> {
        let name = raw.trim().to_ascii_lowercase();
        Component::ALL
            .into_iter()
            .find(|c| c.as_str() == name)
            .ok_or_else(|| Error::validation(format!("unsupported component '{name}'")))
    }
}

/// Expands a comma-separated component list. Empty means every component.
/// Duplicates are dropped, keeping the first occurrence.
pub fn expand_components(raw: &str) -> Result<Vec<Component>> {
    if raw.trim().is_empty() {
        return Ok(Component::ALL.to_vec());
    }
    let mut out = Vec::new();
    for part in raw.split(',') {
        let c: Component = part.parse()?;
        if !out.contains(&c) {
            out.push(c);
        }
    }
    Ok(out)
}
