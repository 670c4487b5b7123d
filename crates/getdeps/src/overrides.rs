use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use url::Url;

use crate::error::{Error, Result};

/// Replacement URLs, keyed by full URL or by the URL's file name.
/// Used to point selected entries at private mirrors.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct UrlOverrides(BTreeMap<String, String>);

impl UrlOverrides {
    pub fn parse(data: &[u8]) -> Result<Self> {
        serde_json::from_slice(data)
            .map_err(|e| Error::Parse(format!("failed to unmarshal URL overrides JSON: {e}")))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let data = fs::read(path).map_err(|e| {
            Error::io(path, e).context(format!(
                "failed to open URL overrides file '{}'",
                path.display()
            ))
        })?;
        Self::parse(&data)
    }

    pub fn insert(&mut self, from: impl Into<String>, to: impl Into<String>) {
        self.0.insert(from.into(), to.into());
    }

    /// Returns the override for `url`: an exact match first, then a match on
    /// the last path segment. Unmatched URLs come back unchanged.
    pub fn apply(&self, url: &str) -> String {
        if let Some(o) = self.0.get(url) {
            return o.clone();
        }
        if let Some(o) = self.0.get(url_base_name(url).as_str()) {
            return o.clone();
        }
        url.to_string()
    }
}

/// Last segment of a URL's path, ignoring trailing slashes. Strings that do
/// not parse as absolute URLs are treated as bare paths.
pub fn url_base_name(raw: &str) -> String {
    let path = match Url::parse(raw) {
        Ok(u) => u.path().to_string(),
        Err(_) => raw
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .to_string(),
    };
    path_base(&path)
}

fn path_base(path: &str) -> String {
    if path.is_empty() {
        return ".".into();
    }
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        return "/".into();
    }
    trimmed.rsplit('/').next().unwrap_or(trimmed).to_string()
}
