//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the pipeline:
//! - Building the shared HTTP client with the configured user agent
//! - Opening the listing page as a body stream
//! - Streaming archive downloads straight to a local file
//!
//! There are no request timeouts and no retries; a failed request is reported
//! to the caller as-is.

use crate::config::UserAgentConfig;
use crate::IngestError;
use futures_util::StreamExt;
use reqwest::{Client, Response};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::debug;
use url::Url;

/// Builds an HTTP client with proper configuration
///
/// # Example
///
/// ```no_run
/// use zip_ingest::config::UserAgentConfig;
/// use zip_ingest::crawler::build_http_client;
///
/// let client = build_http_client(&UserAgentConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &UserAgentConfig) -> Result<Client, reqwest::Error> {
    // Format: CrawlerName/Version (+ContactURL)
    let user_agent = match &config.contact_url {
        Some(contact) => format!(
            "{}/{} (+{})",
            config.crawler_name, config.crawler_version, contact
        ),
        None => format!("{}/{}", config.crawler_name, config.crawler_version),
    };

    Client::builder()
        .user_agent(user_agent)
        .gzip(true)
        .brotli(true)
        .build()
}

/// Sends a GET and returns the response once its status is known to be a
/// success; the body has not been read yet
pub async fn open_stream(client: &Client, url: &Url) -> Result<Response, IngestError> {
    let response = client
        .get(url.as_str())
        .send()
        .await
        .map_err(|source| IngestError::Http {
            url: url.to_string(),
            source,
        })?;

    let status = response.status();
    if !status.is_success() {
        return Err(IngestError::Status {
            url: url.to_string(),
            status,
        });
    }

    Ok(response)
}

/// Downloads `url` into `sink` chunk by chunk
///
/// The payload size is unknown up front, so the body is never held in memory
/// as a whole.
///
/// # Returns
///
/// The number of bytes written
pub async fn download_to<W>(client: &Client, url: &Url, sink: &mut W) -> Result<u64, IngestError>
where
    W: AsyncWrite + Unpin,
{
    let response = open_stream(client, url).await?;
    let mut body = response.bytes_stream();
    let mut written: u64 = 0;

    while let Some(chunk) = body.next().await {
        let chunk = chunk.map_err(|source| IngestError::Http {
            url: url.to_string(),
            source,
        })?;
        sink.write_all(&chunk).await.map_err(IngestError::Scratch)?;
        written += chunk.len() as u64;
    }
    sink.flush().await.map_err(IngestError::Scratch)?;

    debug!(url = %url, bytes = written, "Download finished");
    Ok(written)
}
