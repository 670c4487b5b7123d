use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Bad input: empty labels, malformed hashes, unknown components or modes.
    #[error("{0}")]
    Validation(String),

    #[error("unsupported compression type")]
    UnsupportedCompression,

    #[error("failed to access {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Network failure worth another attempt (timeout, reset, truncated body).
    #[error("{0}")]
    Transient(String),

    #[error("{0}")]
    Http(String),

    #[error("hash mismatch: expected {expected:?}, got {actual:?}")]
    HashMismatch { expected: String, actual: String },

    #[error("maximum recursion depth of {0} reached")]
    RecursionLimit(usize),

    #[error("{0}")]
    Parse(String),

    #[error("{context}: {source}")]
    Context {
        context: String,
        #[source]
        source: Box<Error>,
    },

    #[error("{0}")]
    Msg(String),
}

impl Error {
    pub fn msg<M: Into<String>>(msg: M) -> Self {
        Self::Msg(msg.into())
    }

    pub fn validation<M: Into<String>>(msg: M) -> Self {
        Self::Validation(msg.into())
    }

    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Wraps the error with the label, URL or path it surfaced through.
    pub fn context<C: Into<String>>(self, context: C) -> Self {
        Self::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// The innermost error once every context layer is peeled off.
    pub fn root(&self) -> &Error {
        let mut cur = self;
        while let Error::Context { source, .. } = cur {
            cur = source.as_ref();
        }
        cur
    }

    pub fn is_transient(&self) -> bool {
        matches!(self.root(), Error::Transient(_))
    }

    pub fn is_hash_mismatch(&self) -> bool {
        matches!(self.root(), Error::HashMismatch { .. })
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
