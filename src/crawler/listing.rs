//! Listing page crawler
//!
//! Fetches the listing page once, tokenizes its body as it arrives and emits
//! every archive link onto the link queue. The tokenizer runs on a blocking
//! thread fed through a small chunk channel, so a full link queue pauses
//! body reading as well.

use crate::config::ListingConfig;
use crate::crawler::fetcher::open_stream;
use crate::crawler::links::{LinkExtractor, LinkFilter};
use crate::pipeline::LinkSender;
use crate::IngestError;
use bytes::Bytes;
use futures_util::StreamExt;
use reqwest::Client;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};
use url::Url;

/// Body chunks buffered between the network reader and the tokenizer thread
const CHUNK_BUFFER: usize = 4;

enum BodyEvent {
    Chunk(Bytes),
    End,
}

/// Crawler for one listing page
#[derive(Debug, Clone)]
pub struct LinkCrawler {
    client: Client,
    listing_url: Url,
    filter: LinkFilter,
}

impl LinkCrawler {
    /// Creates a crawler for `listing_url`
    pub fn new(client: Client, listing_url: Url, filter: LinkFilter) -> Self {
        Self {
            client,
            listing_url,
            filter,
        }
    }

    /// Creates a crawler from the listing section of the configuration
    pub fn from_config(client: Client, config: &ListingConfig) -> Result<Self, IngestError> {
        let listing_url = Url::parse(&config.url).map_err(|source| IngestError::InvalidLink {
            link: config.url.clone(),
            source,
        })?;
        let filter = LinkFilter::new(config.min_link_length, config.archive_suffix.clone());
        Ok(Self::new(client, listing_url, filter))
    }

    /// The listing page URL, which is also the base for relative links
    pub fn listing_url(&self) -> &Url {
        &self.listing_url
    }

    /// Crawls the listing page, sending archive links to `links`
    ///
    /// Blocks whenever the link queue is full. Returns the number of links
    /// emitted once the page is exhausted; any transport error ends the crawl
    /// immediately and no link is emitted after it. The crawler never retries.
    pub async fn crawl(&self, links: LinkSender) -> Result<usize, IngestError> {
        info!(url = %self.listing_url, "Fetching listing page");
        let response = open_stream(&self.client, &self.listing_url).await?;
        debug!("Listing page connected, tokenizing body");

        let (events_tx, events_rx) = mpsc::channel(CHUNK_BUFFER);
        let stop = CancellationToken::new();
        let filter = self.filter.clone();
        let emitter_stop = stop.clone();
        let emitter = tokio::task::spawn_blocking(move || {
            emit_archive_links(events_rx, &filter, &links, &emitter_stop)
        });

        let mut body = response.bytes_stream();
        while let Some(chunk) = body.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(source) => {
                    warn!(url = %self.listing_url, "Listing body failed, discarding buffered chunks");
                    stop.cancel();
                    drop(events_tx);
                    let _ = emitter.await;
                    return Err(IngestError::Http {
                        url: self.listing_url.to_string(),
                        source,
                    });
                }
            };
            if events_tx.send(BodyEvent::Chunk(chunk)).await.is_err() {
                // The emitter stopped early because the link queue closed
                break;
            }
        }
        let _ = events_tx.send(BodyEvent::End).await;
        drop(events_tx);

        let emitted = emitter.await??;
        info!(links = emitted, "Listing page exhausted");
        Ok(emitted)
    }
}

/// Tokenizer side of [`LinkCrawler::crawl`]; runs on a blocking thread
///
/// Returns without finishing the tokenizer if the body ends without
/// [`BodyEvent::End`]. Once `stop` fires, buffered chunks are discarded and
/// nothing further is emitted.
fn emit_archive_links(
    mut events: mpsc::Receiver<BodyEvent>,
    filter: &LinkFilter,
    links: &LinkSender,
    stop: &CancellationToken,
) -> Result<usize, IngestError> {
    let mut extractor = LinkExtractor::new();
    let mut emitted = 0;

    while let Some(event) = events.blocking_recv() {
        if stop.is_cancelled() {
            break;
        }
        let (hrefs, done) = match event {
            BodyEvent::Chunk(chunk) => (extractor.feed(&chunk), false),
            BodyEvent::End => (extractor.finish(), true),
        };

        for href in hrefs {
            if !filter.accepts(&href) {
                trace!(link = %href, "Dropping non-archive link");
                continue;
            }
            if stop.is_cancelled() {
                return Ok(emitted);
            }
            debug!(link = %href, "Discovered archive link");
            links.blocking_send(href)?;
            emitted += 1;
        }

        if done {
            break;
        }
    }

    Ok(emitted)
}

/// Resolves a discovered link against the listing URL
///
/// Absolute links are kept as they are. Anything else is appended to the
/// listing URL as `base + "/" + link`, with the slashes at the seam collapsed
/// to one.
pub fn resolve_link(base: &Url, link: &str) -> Result<Url, IngestError> {
    let invalid = |source| IngestError::InvalidLink {
        link: link.to_string(),
        source,
    };

    match Url::parse(link) {
        Ok(url) => Ok(url),
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            let joined = format!(
                "{}/{}",
                base.as_str().trim_end_matches('/'),
                link.trim_start_matches('/')
            );
            Url::parse(&joined).map_err(invalid)
        }
        Err(source) => Err(invalid(source)),
    }
}
