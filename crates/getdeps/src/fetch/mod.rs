//! Network fetch with bounded retries, plus archive handling.

use std::time::Duration;

use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::log_sanitize::redact_url_credentials;

pub mod archive;

/// Attempts per download before a transient failure becomes fatal.
pub const FETCH_ATTEMPTS: usize = 3;

/// Fetches the full body behind a URL.
///
/// Implementations report retryable failures as [`Error::Transient`];
/// anything else aborts the download immediately.
pub trait Transport {
    fn get(&self, url: &str) -> Result<Vec<u8>>;
}

pub struct HttpTransport {
    client: reqwest::blocking::Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self> {
        // Some mirrors misbehave when a redirected request still carries a
        // Referer, so none is ever sent.
        let client = reqwest::blocking::Client::builder()
            .referer(false)
            .connect_timeout(Duration::from_secs(30))
            .timeout(None::<Duration>)
            .build()
            .map_err(|e| Error::msg(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

fn classify(url: &str, e: reqwest::Error) -> Error {
    let shown = redact_url_credentials(url);
    if e.is_timeout() || e.is_connect() || e.is_body() || e.is_decode() {
        Error::Transient(format!("GET {shown}: {e}"))
    } else {
        Error::Http(format!("GET {shown}: {e}"))
    }
}

impl Transport for HttpTransport {
    fn get(&self, url: &str) -> Result<Vec<u8>> {
        let res = self.client.get(url).send().map_err(|e| classify(url, e))?;
        let status = res.status();
        info!("status code is {status}");
        if !status.is_success() {
            return Err(Error::Http(format!(
                "GET {} failed with status {status}",
                redact_url_credentials(url)
            )));
        }
        let body = res.bytes().map_err(|e| classify(url, e))?;
        Ok(body.to_vec())
    }
}

/// Downloads `url`, retrying transient failures up to [`FETCH_ATTEMPTS`] times.
pub fn fetch_with_retry(transport: &dyn Transport, label: &str, url: &str) -> Result<Vec<u8>> {
    let shown = redact_url_credentials(url);
    info!("{label}: downloading {shown}...");

    let mut last = None;
    for attempt in 1..=FETCH_ATTEMPTS {
        match transport.get(url) {
            Ok(data) => return Ok(data),
            Err(e) if e.is_transient() => {
                warn!("{label}: download attempt {attempt}/{FETCH_ATTEMPTS} failed: {e}");
                last = Some(e);
            }
            Err(e) => return Err(e.context(format!("{label}: error while downloading {shown}"))),
        }
    }
    let err = last.unwrap_or_else(|| Error::Transient("no download attempt was made".into()));
    Err(err.context(format!(
        "{label}: every download attempt for {shown} has failed"
    )))
}
