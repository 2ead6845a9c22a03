//! Pipeline coordinator
//!
//! Starts the download pool and one crawler, then waits for whichever comes
//! first: the crawler finishing, a failure the policy says to halt on, or an
//! external shutdown request.

use crate::config::{Config, FailurePolicy};
use crate::crawler::{build_http_client, LinkCrawler};
use crate::pipeline::queue::{link_queue, LinkFailure, Signal};
use crate::pipeline::stats::{PipelineStats, RunSummary};
use crate::pipeline::worker::{DownloadWorker, WorkerContext};
use crate::storage::Store;
use crate::{ErrorClass, IngestError};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// How a run ended without a fatal error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// The crawler reached the end of the listing page
    Completed(RunSummary),
    /// The run was stopped from outside
    Cancelled(RunSummary),
}

impl RunOutcome {
    pub fn summary(&self) -> &RunSummary {
        match self {
            Self::Completed(summary) | Self::Cancelled(summary) => summary,
        }
    }
}

/// Main pipeline coordinator
pub struct Coordinator<S> {
    config: Config,
    store: S,
    crawler: LinkCrawler,
    context: WorkerContext,
    stats: Arc<PipelineStats>,
}

impl<S: Store> Coordinator<S> {
    /// Creates a coordinator for a validated configuration
    ///
    /// # Arguments
    ///
    /// * `config` - The pipeline configuration
    /// * `store` - Connection factory for the ledger and output queue
    pub fn new(config: Config, store: S) -> Result<Self, IngestError> {
        let client =
            build_http_client(&config.user_agent).map_err(|source| IngestError::Http {
                url: config.listing.url.clone(),
                source,
            })?;
        let crawler = LinkCrawler::from_config(client.clone(), &config.listing)?;
        let stats = Arc::new(PipelineStats::default());
        let context = WorkerContext {
            client,
            base_url: crawler.listing_url().clone(),
            scratch_dir: config.workers.scratch_dir.clone(),
            stats: Arc::clone(&stats),
        };

        Ok(Self {
            config,
            store,
            crawler,
            context,
            stats,
        })
    }

    /// Current counters of this run
    pub fn stats(&self) -> RunSummary {
        self.stats.snapshot()
    }

    /// Runs the pipeline to completion
    pub async fn run(self) -> Result<RunOutcome, IngestError> {
        self.run_until(CancellationToken::new()).await
    }

    /// Runs the pipeline until it completes, fails, or `shutdown` fires
    ///
    /// Every worker connects to the store before any link is crawled, so an
    /// unreachable store fails the run up front. When the run ends for any
    /// reason, in-flight downloads are abandoned; their links stay unmarked
    /// and are picked up again by the next run.
    pub async fn run_until(self, shutdown: CancellationToken) -> Result<RunOutcome, IngestError> {
        let workers_config = &self.config.workers;
        info!(
            listing = %self.crawler.listing_url(),
            workers = workers_config.count,
            policy = ?workers_config.on_error,
            "Starting ingestion run"
        );

        let (link_tx, link_rx) = link_queue(workers_config.queue_capacity);
        let (signal_tx, mut signal_rx) = mpsc::channel(workers_config.count + 1);
        let cancel = shutdown.child_token();

        let mut workers = JoinSet::new();
        for id in 0..workers_config.count {
            let ledger = self.store.connect().await?;
            let worker = DownloadWorker::new(id, self.context.clone(), ledger);
            workers.spawn(worker.run(link_rx.clone(), signal_tx.clone(), cancel.clone()));
        }
        drop(link_rx);

        let crawler = self.crawler.clone();
        let crawl_signals = signal_tx;
        let crawl = tokio::spawn(async move {
            let signal = match crawler.crawl(link_tx).await {
                Ok(links) => Signal::CrawlDone { links },
                Err(e) => Signal::CrawlFailed(e),
            };
            let _ = crawl_signals.send(signal).await;
        });

        let result = self
            .supervise(&mut signal_rx, &mut workers, &shutdown)
            .await;

        cancel.cancel();
        crawl.abort();
        workers.abort_all();

        match &result {
            Ok(RunOutcome::Completed(summary)) => info!("Run complete: {}", summary),
            Ok(RunOutcome::Cancelled(summary)) => info!("Run cancelled: {}", summary),
            Err(e) => error!("Run failed: {}", e),
        }
        result
    }

    async fn supervise(
        &self,
        signals: &mut mpsc::Receiver<Signal>,
        workers: &mut JoinSet<()>,
        shutdown: &CancellationToken,
    ) -> Result<RunOutcome, IngestError> {
        loop {
            let signal = tokio::select! {
                biased;
                _ = shutdown.cancelled() => {
                    info!("Shutdown requested, abandoning in-flight downloads");
                    return Ok(RunOutcome::Cancelled(self.stats.snapshot()));
                }
                signal = signals.recv() => signal,
            };

            match signal {
                Some(Signal::CrawlDone { links }) => {
                    self.stats.set_links_discovered(links);
                    if !self.config.workers.drain_on_complete {
                        return Ok(RunOutcome::Completed(self.stats.snapshot()));
                    }
                    info!("Listing exhausted, waiting for queued links");
                }
                Some(Signal::CrawlFailed(e)) => return Err(e),
                Some(Signal::WorkerFailed(failure)) => self.apply_policy(failure)?,
                None => {
                    // The crawler and every worker have exited
                    while let Some(joined) = workers.join_next().await {
                        joined?;
                    }
                    return Ok(RunOutcome::Completed(self.stats.snapshot()));
                }
            }
        }
    }

    /// Decides whether one link failure ends the run
    fn apply_policy(&self, failure: LinkFailure) -> Result<(), IngestError> {
        let class = failure.error.class();
        let halt = matches!(class, ErrorClass::Store | ErrorClass::Internal)
            || self.config.workers.on_error == FailurePolicy::Halt;

        if halt {
            return Err(IngestError::Link(Box::new(failure)));
        }

        warn!(
            link = %failure.link,
            class = ?class,
            "Skipping link after failure: {}",
            failure.error
        );
        self.stats.record_skipped_failure();
        Ok(())
    }
}
