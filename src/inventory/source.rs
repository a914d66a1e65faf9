//! Workbook retrieval from a Yandex Disk public share.
//!
//! A fetch is one resolve + download + parse cycle. Nothing is retried:
//! a timeout or bad status fails the whole cycle and the caller decides
//! what to show the user.

use super::workbook::Workbook;
use crate::config::Settings;
use async_trait::async_trait;
use reqwest::{Client as HttpClient, StatusCode};
use serde::Deserialize;
use std::error::Error as StdError;
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info};

/// Public resources download endpoint of the Yandex Disk REST API
pub const DEFAULT_RESOLVER_URL: &str =
    "https://cloud-api.yandex.net/v1/disk/public/resources/download";
/// Timeout for the link resolution call
pub const DEFAULT_RESOLVE_TIMEOUT_SECS: u64 = 10;
/// Timeout for the file download call
pub const DEFAULT_DOWNLOAD_TIMEOUT_SECS: u64 = 15;

/// Step of the fetch cycle that produced an HTTP error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStage {
    /// Share link resolution
    Resolve,
    /// File download
    Download,
}

impl fmt::Display for FetchStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Resolve => f.write_str("Link resolution"),
            Self::Download => f.write_str("Download"),
        }
    }
}

/// Errors that can occur while loading the spreadsheet
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// Connection failure or timeout
    #[error("Network error: {0}")]
    Network(String),
    /// Server answered with a non-success status
    #[error("{stage} failed with HTTP {status}")]
    Status {
        /// Step that failed
        stage: FetchStage,
        /// HTTP status code
        status: u16,
    },
    /// Resolver body could not be decoded
    #[error("Invalid resolver response: {0}")]
    InvalidResponse(String),
    /// Resolver answered without a download link
    #[error("Resolver response has no download link")]
    MissingLink,
    /// Downloaded bytes are not a readable workbook
    #[error("Spreadsheet parse error: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        // Download links carry signed query strings; keep them out of replies
        Self::Network(describe_network_error(&err.without_url()))
    }
}

/// Joins the error with its causes, e.g.
/// `error sending request: client error (Connect): tcp connect error: Connection refused`.
fn describe_network_error(err: &reqwest::Error) -> String {
    let mut message = err.to_string();
    let mut cause = StdError::source(err);
    while let Some(inner) = cause {
        let text = inner.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        cause = inner.source();
    }
    message
}

/// Anything that can produce a fresh copy of the workbook
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait WorkbookSource: Send + Sync {
    /// Runs one full fetch cycle.
    async fn fetch(&self) -> Result<Workbook, FetchError>;
}

#[derive(Debug, Deserialize)]
struct DownloadLink {
    href: Option<String>,
}

/// Extracts the direct download URL from a resolver response body.
///
/// # Errors
///
/// Returns `FetchError::InvalidResponse` if the body is not JSON and
/// `FetchError::MissingLink` if it has no non-empty `href`.
pub fn parse_download_link(body: &str) -> Result<String, FetchError> {
    let link: DownloadLink =
        serde_json::from_str(body).map_err(|e| FetchError::InvalidResponse(e.to_string()))?;
    link.href
        .filter(|href| !href.trim().is_empty())
        .ok_or(FetchError::MissingLink)
}

fn check_status(stage: FetchStage, status: StatusCode) -> Result<(), FetchError> {
    if status.is_success() {
        Ok(())
    } else {
        Err(FetchError::Status {
            stage,
            status: status.as_u16(),
        })
    }
}

/// Workbook source backed by a Yandex Disk public share link
#[derive(Debug, Clone)]
pub struct YandexDiskSource {
    http: HttpClient,
    resolver_url: String,
    public_url: String,
    resolve_timeout: Duration,
    download_timeout: Duration,
}

impl YandexDiskSource {
    /// Creates a source for the given public share URL with default endpoint and timeouts.
    #[must_use]
    pub fn new(public_url: impl Into<String>) -> Self {
        Self {
            http: HttpClient::new(),
            resolver_url: DEFAULT_RESOLVER_URL.to_string(),
            public_url: public_url.into(),
            resolve_timeout: Duration::from_secs(DEFAULT_RESOLVE_TIMEOUT_SECS),
            download_timeout: Duration::from_secs(DEFAULT_DOWNLOAD_TIMEOUT_SECS),
        }
    }

    /// Creates a source from application settings.
    #[must_use]
    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.spreadsheet_url.clone())
            .with_resolver_url(settings.resolver_url.clone())
            .with_timeouts(settings.resolve_timeout(), settings.download_timeout())
    }

    /// Overrides the resolver endpoint.
    #[must_use]
    pub fn with_resolver_url(mut self, resolver_url: impl Into<String>) -> Self {
        self.resolver_url = resolver_url.into();
        self
    }

    /// Overrides the per-call timeouts.
    #[must_use]
    pub fn with_timeouts(mut self, resolve: Duration, download: Duration) -> Self {
        self.resolve_timeout = resolve;
        self.download_timeout = download;
        self
    }

    async fn resolve_download_url(&self) -> Result<String, FetchError> {
        debug!(resolver = %self.resolver_url, "Resolving download link");
        let response = self
            .http
            .get(&self.resolver_url)
            .query(&[("public_key", self.public_url.as_str())])
            .timeout(self.resolve_timeout)
            .send()
            .await?;
        check_status(FetchStage::Resolve, response.status())?;
        let body = response.text().await?;
        parse_download_link(&body)
    }

    async fn download(&self, url: &str) -> Result<Workbook, FetchError> {
        debug!("Downloading spreadsheet");
        let response = self
            .http
            .get(url)
            .timeout(self.download_timeout)
            .send()
            .await?;
        check_status(FetchStage::Download, response.status())?;
        let bytes = response.bytes().await?;
        debug!(size = bytes.len(), "Spreadsheet downloaded");
        Workbook::from_xlsx(&bytes)
    }
}

#[async_trait]
impl WorkbookSource for YandexDiskSource {
    async fn fetch(&self) -> Result<Workbook, FetchError> {
        let result = match self.resolve_download_url().await {
            Ok(url) => self.download(&url).await,
            Err(e) => Err(e),
        };
        match &result {
            Ok(workbook) => info!(sheets = workbook.sheet_count(), "Spreadsheet loaded"),
            Err(e) => error!(error = %e, "Failed to load spreadsheet"),
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_download_link() {
        let body = r#"{"href":"https://downloader.disk.yandex.ru/disk/abc","method":"GET","templated":false}"#;
        assert_eq!(
            parse_download_link(body),
            Ok("https://downloader.disk.yandex.ru/disk/abc".to_string())
        );
    }

    #[test]
    fn test_parse_download_link_missing_href() {
        let body = r#"{"message":"Не удалось найти запрошенный ресурс.","error":"DiskNotFoundError"}"#;
        assert_eq!(parse_download_link(body), Err(FetchError::MissingLink));
        assert_eq!(
            parse_download_link(r#"{"href":""}"#),
            Err(FetchError::MissingLink)
        );
    }

    #[test]
    fn test_parse_download_link_not_json() {
        assert!(matches!(
            parse_download_link("<html>502</html>"),
            Err(FetchError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_check_status() {
        assert!(check_status(FetchStage::Resolve, StatusCode::OK).is_ok());
        let err = check_status(FetchStage::Download, StatusCode::NOT_FOUND);
        assert_eq!(
            err,
            Err(FetchError::Status {
                stage: FetchStage::Download,
                status: 404
            })
        );
    }

    #[test]
    fn test_error_messages() {
        let err = FetchError::Status {
            stage: FetchStage::Resolve,
            status: 503,
        };
        assert_eq!(err.to_string(), "Link resolution failed with HTTP 503");
        assert_eq!(
            FetchError::MissingLink.to_string(),
            "Resolver response has no download link"
        );
    }

    #[test]
    fn test_builder_overrides() {
        let source = YandexDiskSource::new("https://disk.yandex.ru/i/abc")
            .with_resolver_url("http://localhost:9/resolve")
            .with_timeouts(Duration::from_secs(1), Duration::from_secs(2));

        assert_eq!(source.public_url, "https://disk.yandex.ru/i/abc");
        assert_eq!(source.resolver_url, "http://localhost:9/resolve");
        assert_eq!(source.resolve_timeout, Duration::from_secs(1));
        assert_eq!(source.download_timeout, Duration::from_secs(2));
    }

    fn network_message(result: Result<Workbook, FetchError>) -> String {
        match result {
            Err(FetchError::Network(message)) => message,
            other => panic!("expected a network error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_refused_connection_names_the_cause() -> std::io::Result<()> {
        // Bind then drop to get a local port nobody listens on
        let port = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await?
            .local_addr()?
            .port();
        let source = YandexDiskSource::new("https://disk.yandex.ru/i/abc")
            .with_resolver_url(format!("http://127.0.0.1:{port}/resolve"))
            .with_timeouts(Duration::from_secs(2), Duration::from_secs(2));

        let message = network_message(source.fetch().await);

        assert!(message.starts_with("error sending request: "), "{message}");
        assert!(message.to_lowercase().contains("connect"), "{message}");
        assert!(!message.contains("127.0.0.1"), "{message}");
        Ok(())
    }

    #[tokio::test]
    async fn test_timeout_names_the_cause() -> std::io::Result<()> {
        // Connections are queued by the OS but never answered
        let silent = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let port = silent.local_addr()?.port();
        let source = YandexDiskSource::new("https://disk.yandex.ru/i/abc")
            .with_resolver_url(format!("http://127.0.0.1:{port}/resolve"))
            .with_timeouts(Duration::from_millis(300), Duration::from_millis(300));

        let message = network_message(source.fetch().await);

        assert!(message.contains("timed out"), "{message}");
        drop(silent);
        Ok(())
    }
}
