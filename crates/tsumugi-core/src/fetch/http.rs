//! Plain HTTP(S) GET transport.

use std::time::Duration;

use reqwest::blocking::Client;

use super::{Download, Transport};
use crate::error::{Result, TsumugiError};

/// Blocking `reqwest` transport. The timeout bounds connecting and every
/// read of the response body, so a stalled server cannot hang a run.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("tsumugi/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| TsumugiError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    fn open(&self, url: &str) -> Result<Download> {
        let response = self
            .client
            .get(url)
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(|e| TsumugiError::Fetch {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        Ok(Download {
            total: response.content_length(),
            reader: Box::new(response),
        })
    }
}
