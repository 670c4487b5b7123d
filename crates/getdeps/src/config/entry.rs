use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A nullable string field that remembers whether it was explicitly emptied.
///
/// JSON `null` or a missing key is `Unset`; `""` is `Cleared`, which an
/// override document uses to drop a value set by an earlier layer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Setting {
    #[default]
    Unset,
    Cleared,
    Value(String),
}

impl Setting {
    pub fn is_unset(&self) -> bool {
        matches!(self, Setting::Unset)
    }

    /// The non-empty value, if any.
    pub fn value(&self) -> Option<&str> {
        match self {
            Setting::Value(v) if !v.is_empty() => Some(v.as_str()),
            _ => None,
        }
    }
}

impl From<&str> for Setting {
    fn from(raw: &str) -> Self {
        if raw.is_empty() {
            Setting::Cleared
        } else {
            Setting::Value(raw.to_string())
        }
    }
}

impl From<String> for Setting {
    fn from(raw: String) -> Self {
        if raw.is_empty() {
            Setting::Cleared
        } else {
            Setting::Value(raw)
        }
    }
}

impl Serialize for Setting {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Setting::Unset => serializer.serialize_none(),
            Setting::Cleared => serializer.serialize_str(""),
            Setting::Value(v) => serializer.serialize_str(v),
        }
    }
}

impl<'de> Deserialize<'de> for Setting {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match Option::<String>::deserialize(deserializer)? {
            None => Setting::Unset,
            Some(s) => Setting::from(s),
        })
    }
}

/// A git repository checked out into the component's staging directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Git {
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub url: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub dest: String,
    #[serde(default, skip_serializing_if = "Setting::is_unset")]
    pub branch: Setting,
    #[serde(default, skip_serializing_if = "Setting::is_unset")]
    pub hash: Setting,
}

/// A Go package, checked out under `gopath/src/<import path>`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gopkg {
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub pkg: String,
    #[serde(default, skip_serializing_if = "Setting::is_unset")]
    pub branch: Setting,
    #[serde(default, skip_serializing_if = "Setting::is_unset")]
    pub hash: Setting,
}

/// A compressed tarball unpacked into the staging directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Untar {
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub url: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub hash: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    #[serde(default)]
    pub url: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub hash: String,
}

/// Plain files downloaded as-is into `dest`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Files {
    #[serde(default)]
    pub label: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub dest: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub filelist: Vec<FileEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn setting_distinguishes_missing_null_and_empty() {
        let missing: Git = serde_json::from_str(r#"{"label":"a"}"#).expect("parse");
        assert_eq!(missing.hash, Setting::Unset);

        let null: Git = serde_json::from_str(r#"{"label":"a","hash":null}"#).expect("parse");
        assert_eq!(null.hash, Setting::Unset);

        let empty: Git = serde_json::from_str(r#"{"label":"a","hash":""}"#).expect("parse");
        assert_eq!(empty.hash, Setting::Cleared);

        let set: Git = serde_json::from_str(r#"{"label":"a","hash":"abc"}"#).expect("parse");
        assert_eq!(set.hash, Setting::Value("abc".into()));
    }

    #[test]
    fn unset_fields_are_omitted_on_output() {
        let g = Git {
            label: "coreboot".into(),
            url: "https://review.coreboot.org/coreboot".into(),
            branch: Setting::from("main"),
            ..Default::default()
        };
        let v = serde_json::to_value(&g).expect("encode");
        assert_eq!(
            v,
            serde_json::json!({
                "label": "coreboot",
                "url": "https://review.coreboot.org/coreboot",
                "branch": "main",
            })
        );
    }

    #[test]
    fn cleared_value_is_written_as_empty_string() {
        let g = Gopkg {
            label: "uroot".into(),
            hash: Setting::Cleared,
            ..Default::default()
        };
        let v = serde_json::to_value(&g).expect("encode");
        assert_eq!(v["hash"], serde_json::json!(""));
        assert_eq!(g.hash.value(), None);
    }
}
