//! Content fetching from URLs, files, and stdin.
//!
//! Network access goes through the [`Fetcher`] trait so the pipeline and the
//! image localizer can run against any transport. [`ReqwestFetcher`] is the
//! default HTTP implementation, available with the `fetch` feature.

use std::fs;
use std::future::Future;
use std::path::PathBuf;
#[cfg(feature = "fetch")]
use std::time::Duration;

#[cfg(feature = "fetch")]
use reqwest::Client;
use serde::{Deserialize, Serialize};
#[cfg(feature = "fetch")]
use url::Url;

use crate::{Result, VaultclipError};

/// HTTP client configuration for fetching pages and images.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Request timeout in seconds.
    pub timeout: u64,
    /// Custom User-Agent string.
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout: 30,
            user_agent: "Mozilla/5.0 (compatible; Vaultclip/0.1; +https://github.com/stormlightlabs/vaultclip)"
                .to_string(),
        }
    }
}

/// A downloaded resource.
#[derive(Debug, Clone)]
pub struct FetchedResource {
    /// Final URL after redirects.
    pub url: String,
    pub bytes: Vec<u8>,
}

impl FetchedResource {
    /// The body decoded as UTF-8, with invalid sequences replaced.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }
}

/// Retrieves remote resources by absolute URL.
pub trait Fetcher {
    fn fetch(&self, url: &str) -> impl Future<Output = Result<FetchedResource>> + Send;
}

/// [`Fetcher`] over a shared `reqwest` client.
///
/// Non-success status codes are errors.
#[cfg(feature = "fetch")]
#[derive(Debug, Clone)]
pub struct ReqwestFetcher {
    client: Client,
    config: FetchConfig,
}

#[cfg(feature = "fetch")]
impl ReqwestFetcher {
    pub fn new(config: FetchConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(VaultclipError::HttpError)?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    fn map_error(&self, e: reqwest::Error) -> VaultclipError {
        if e.is_timeout() { VaultclipError::Timeout { timeout: self.config.timeout } } else { VaultclipError::HttpError(e) }
    }
}

#[cfg(feature = "fetch")]
impl Fetcher for ReqwestFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedResource> {
        let parsed_url = Url::parse(url).map_err(|e| VaultclipError::InvalidUrl(format!("{url}: {e}")))?;

        if !matches!(parsed_url.scheme(), "http" | "https") {
            return Err(VaultclipError::InvalidUrl(format!(
                "{url}: URL must use http:// or https://"
            )));
        }

        let response = self
            .client
            .get(parsed_url)
            .header(
                "Accept",
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/*;q=0.8,*/*;q=0.5",
            )
            .header("Accept-Language", "en-US,en;q=0.9")
            .send()
            .await
            .map_err(|e| self.map_error(e))?
            .error_for_status()?;

        let final_url = response.url().to_string();
        let bytes = response.bytes().await.map_err(|e| self.map_error(e))?;

        Ok(FetchedResource { url: final_url, bytes: bytes.to_vec() })
    }
}

/// Reads HTML content from a local file.
///
/// Callers should validate and sanitize the path when accepting user input.
pub fn fetch_file(path: &str) -> Result<String> {
    let path_buf = PathBuf::from(path);

    if !path_buf.exists() {
        Err(VaultclipError::FileNotFound(path_buf))
    } else {
        fs::read_to_string(&path_buf).map_err(VaultclipError::from)
    }
}

/// Reads HTML content from standard input until EOF.
pub fn fetch_stdin() -> Result<String> {
    use std::io::{self, Read};

    let mut buffer = String::new();
    io::stdin().read_to_string(&mut buffer).map_err(VaultclipError::from)?;

    Ok(buffer)
}
