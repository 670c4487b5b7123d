//! The versions manifest: the resolved configuration as fetched, with every
//! pin filled in, suitable for storing as build provenance.

use std::fmt;
use std::fs;
use std::path::Path;

use tracing::{debug, info};

use crate::config::{Component, Config};
use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestAction {
    /// No usable manifest existed; a fresh one was written.
    Wrote,
    /// An existing manifest was updated in place for the fetched components.
    Updated,
}

impl fmt::Display for ManifestAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ManifestAction::Wrote => "Wrote",
            ManifestAction::Updated => "Updated",
        })
    }
}

/// Builds the manifest content. Sections of `previous` that were not
/// fetched this run are kept; an unparsable `previous` is ignored.
pub fn build_manifest(
    previous: Option<&[u8]>,
    resolved: &Config,
    components: &[Component],
    build_id: &str,
) -> (Config, ManifestAction) {
    let prior = previous.and_then(|data| match Config::parse(data) {
        Ok(c) => Some(c),
        Err(e) => {
            debug!("ignoring existing manifest: {e}");
            None
        }
    });
    let (mut out, action) = match prior {
        Some(c) => (c, ManifestAction::Updated),
        None => (Config::default(), ManifestAction::Wrote),
    };

    out.build_id = build_id.to_string();
    for &c in components {
        *out.node_mut(c) = resolved.node(c).clone();
    }
    (out, action)
}

pub fn write_manifest(
    path: &Path,
    resolved: &Config,
    components: &[Component],
    build_id: &str,
) -> Result<ManifestAction> {
    let previous = fs::read(path).ok();
    let (manifest, action) = build_manifest(previous.as_deref(), resolved, components, build_id);
    let body = manifest.to_json_pretty()?;
    fs::write(path, body).map_err(|e| {
        Error::io(path, e).context(format!(
            "failed to write generated versions to file '{}'",
            path.display()
        ))
    })?;
    info!("{action} {}", path.display());
    Ok(action)
}
