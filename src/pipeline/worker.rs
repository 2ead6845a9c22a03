//! Download worker
//!
//! A worker takes links off the shared queue one at a time. For each link it
//! checks the archive ledger, downloads the archive to a scratch file,
//! processes it, and only then marks the link downloaded. A crash before the
//! mark makes the next run fetch the archive again; the record ledger keeps
//! the already-pushed entries from being pushed twice.

use crate::crawler::{download_to, resolve_link};
use crate::pipeline::archive::{process_archive, ArchiveReport};
use crate::pipeline::queue::{LinkFailure, LinkReceiver, Signal};
use crate::pipeline::scratch::ScratchFile;
use crate::pipeline::stats::PipelineStats;
use crate::storage::{Ledger, Namespace};
use crate::IngestError;
use reqwest::Client;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use url::Url;

/// What a worker did with one link
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkOutcome {
    /// The archive ledger already had the link; nothing was fetched
    AlreadyDownloaded,
    /// The archive was downloaded and processed
    Processed(ArchiveReport),
}

/// Everything a worker shares with its siblings
#[derive(Debug, Clone)]
pub struct WorkerContext {
    pub client: Client,
    /// Base for resolving relative links
    pub base_url: Url,
    pub scratch_dir: Option<PathBuf>,
    pub stats: Arc<PipelineStats>,
}

/// One member of the download pool, owning its store connection
pub struct DownloadWorker<L> {
    id: usize,
    context: WorkerContext,
    ledger: L,
}

impl<L: Ledger + 'static> DownloadWorker<L> {
    pub fn new(id: usize, context: WorkerContext, ledger: L) -> Self {
        Self {
            id,
            context,
            ledger,
        }
    }

    /// Runs until the link queue is closed and empty, or `cancel` fires
    ///
    /// Failures are tagged with their link and reported on `signals`; the
    /// worker then moves on to the next link and leaves the decision to stop
    /// to the coordinator.
    pub async fn run(
        mut self,
        links: LinkReceiver,
        signals: mpsc::Sender<Signal>,
        cancel: CancellationToken,
    ) {
        debug!(worker = self.id, "Worker started");

        loop {
            let link = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                link = links.recv() => match link {
                    Some(link) => link,
                    None => break,
                },
            };

            if let Err(error) = self.handle_link(&link).await {
                let failure = LinkFailure { link, error };
                if signals.send(Signal::WorkerFailed(failure)).await.is_err() {
                    break;
                }
            }
        }

        debug!(worker = self.id, "Worker stopped");
    }

    /// Handles a single link end to end
    ///
    /// The scratch file is removed on every path out of this function.
    pub async fn handle_link(&mut self, link: &str) -> Result<LinkOutcome, IngestError> {
        if self.ledger.is_marked(Namespace::Downloaded, link).await? {
            info!(worker = self.id, link = %link, "Archive already processed");
            self.context.stats.record_already_handled();
            return Ok(LinkOutcome::AlreadyDownloaded);
        }

        let url = resolve_link(&self.context.base_url, link)?;
        let scratch = ScratchFile::create(self.context.scratch_dir.as_deref())?;

        info!(worker = self.id, link = %link, "Downloading archive");
        let mut writer = scratch.writer()?;
        let bytes = download_to(&self.context.client, &url, &mut writer).await?;
        drop(writer);
        debug!(worker = self.id, link = %link, bytes, "Archive stored in scratch file");

        let report = process_archive(scratch.path(), link, &mut self.ledger).await?;
        self.ledger.mark(Namespace::Downloaded, link).await?;
        scratch.release()?;

        self.context.stats.record_archive(&report);
        Ok(LinkOutcome::Processed(report))
    }
}
