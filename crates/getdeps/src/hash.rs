use std::fmt;
use std::str::FromStr;

use sha2::{Digest, Sha256};

use crate::error::{Error, Result};

/// How content pins (commit hashes, archive digests) are enforced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum HashMode {
    /// Require pins for repos and blobs; check out repos at the pin and verify blobs.
    #[default]
    Strict,
    /// Use pins that are present but don't require them.
    Permissive,
    /// Drop all pins up front and record whatever gets fetched.
    Update,
}

impl HashMode {
    pub fn as_str(self) -> &'static str {
        match self {
            HashMode::Strict => "strict",
            HashMode::Permissive => "permissive",
            HashMode::Update => "update",
        }
    }
}

impl fmt::Display for HashMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HashMode {
    type Err = Error;

    fn from_str(raw: &str) -> Result<Self> {
        match raw {
            "strict" => Ok(HashMode::Strict),
            "permissive" => Ok(HashMode::Permissive),
            "update" => Ok(HashMode::Update),
            other => Err(Error::validation(format!("unsupported hash mode {other:?}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashAlgorithm {
    Sha256,
}

impl HashAlgorithm {
    pub fn as_str(self) -> &'static str {
        match self {
            HashAlgorithm::Sha256 => "sha256",
        }
    }

    fn digest_hex(self, data: &[u8]) -> String {
        match self {
            HashAlgorithm::Sha256 => hex::encode(Sha256::digest(data)),
        }
    }
}

/// `<algorithm>:<lowercase hex digest>`, e.g. `sha256:87b5...`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentHash {
    pub algorithm: HashAlgorithm,
    pub digest: String,
}

impl ContentHash {
    pub fn parse(raw: &str) -> Result<Self> {
        let lowered = raw.to_ascii_lowercase();
        let parts: Vec<&str> = lowered.split(':').collect();
        let [algorithm, digest] = parts.as_slice() else {
            return Err(Error::validation(format!("unsupported hash format {raw:?}")));
        };
        let algorithm = match *algorithm {
            "sha256" => HashAlgorithm::Sha256,
            other => return Err(Error::validation(format!("unsupported hash type {other:?}"))),
        };
        Ok(Self {
            algorithm,
            digest: digest.to_string(),
        })
    }

    pub fn of(data: &[u8]) -> Self {
        Self::compute(HashAlgorithm::Sha256, data)
    }

    pub fn compute(algorithm: HashAlgorithm, data: &[u8]) -> Self {
        Self {
            algorithm,
            digest: algorithm.digest_hex(data),
        }
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.algorithm.as_str(), self.digest)
    }
}

/// Hashes `data` and checks it against `expected`, returning the computed
/// hash string. An empty `expected` only computes (sha256).
pub fn verify_hash(data: &[u8], expected: &str) -> Result<String> {
    if expected.is_empty() {
        return Ok(ContentHash::of(data).to_string());
    }
    let want = ContentHash::parse(expected)?;
    let got = ContentHash::compute(want.algorithm, data);
    if got != want {
        return Err(Error::HashMismatch {
            expected: want.to_string(),
            actual: got.to_string(),
        });
    }
    Ok(got.to_string())
}
