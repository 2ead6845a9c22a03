//! Link hand-off queue and coordinator signals

use crate::IngestError;
use std::fmt;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};

/// Creates a bounded link queue
///
/// The crawler holds the sending half; every worker holds a clone of the
/// receiving half. The queue closes once all senders are dropped and the
/// buffered links have been taken.
pub fn link_queue(capacity: usize) -> (LinkSender, LinkReceiver) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (
        LinkSender { inner: tx },
        LinkReceiver {
            inner: Arc::new(Mutex::new(rx)),
        },
    )
}

/// Sending half of the link queue
#[derive(Debug, Clone)]
pub struct LinkSender {
    inner: mpsc::Sender<String>,
}

impl LinkSender {
    /// Sends a link, waiting while the queue is full
    pub async fn send(&self, link: String) -> Result<(), IngestError> {
        self.inner
            .send(link)
            .await
            .map_err(|_| IngestError::QueueClosed)
    }

    /// Blocking variant of [`send`](Self::send) for use off the async runtime
    pub fn blocking_send(&self, link: String) -> Result<(), IngestError> {
        self.inner
            .blocking_send(link)
            .map_err(|_| IngestError::QueueClosed)
    }
}

/// Receiving half of the link queue, shared by all workers
#[derive(Debug, Clone)]
pub struct LinkReceiver {
    inner: Arc<Mutex<mpsc::Receiver<String>>>,
}

impl LinkReceiver {
    /// Takes the next link, or `None` once the queue is closed and empty
    ///
    /// Cancel safe: dropping the future never loses a link.
    pub async fn recv(&self) -> Option<String> {
        self.inner.lock().await.recv().await
    }
}

/// A worker failure tagged with the link it happened on
#[derive(Debug)]
pub struct LinkFailure {
    pub link: String,
    pub error: IngestError,
}

impl fmt::Display for LinkFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "while handling {}: {}", self.link, self.error)
    }
}

impl std::error::Error for LinkFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

/// Events reported to the coordinator
#[derive(Debug)]
pub enum Signal {
    /// The crawler reached the end of the listing page
    CrawlDone { links: usize },
    /// The crawler could not fetch or read the listing page
    CrawlFailed(IngestError),
    /// A worker failed on one link
    WorkerFailed(LinkFailure),
}
