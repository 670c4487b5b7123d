pub mod build_id;
pub mod config;
pub mod error;
pub mod exec;
pub mod fetch;
pub mod hash;
pub mod log_sanitize;
pub mod manifest;
pub mod orchestrator;
pub mod overrides;
pub mod vcs;
pub mod workspace;

pub use error::{Error, Result};
