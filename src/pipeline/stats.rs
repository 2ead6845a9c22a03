//! Run statistics shared by the workers

use crate::pipeline::archive::ArchiveReport;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Counters updated concurrently by the crawler and workers
#[derive(Debug, Default)]
pub struct PipelineStats {
    links_discovered: AtomicUsize,
    archives_downloaded: AtomicUsize,
    archives_already_handled: AtomicUsize,
    records_pushed: AtomicUsize,
    records_already_processed: AtomicUsize,
    failures_skipped: AtomicUsize,
}

impl PipelineStats {
    pub fn set_links_discovered(&self, links: usize) {
        self.links_discovered.store(links, Ordering::Relaxed);
    }

    pub fn record_archive(&self, report: &ArchiveReport) {
        self.archives_downloaded.fetch_add(1, Ordering::Relaxed);
        self.records_pushed.fetch_add(report.pushed, Ordering::Relaxed);
        self.records_already_processed
            .fetch_add(report.skipped, Ordering::Relaxed);
    }

    pub fn record_already_handled(&self) {
        self.archives_already_handled.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_skipped_failure(&self) {
        self.failures_skipped.fetch_add(1, Ordering::Relaxed);
    }

    /// Point-in-time copy of the counters
    pub fn snapshot(&self) -> RunSummary {
        RunSummary {
            links_discovered: self.links_discovered.load(Ordering::Relaxed),
            archives_downloaded: self.archives_downloaded.load(Ordering::Relaxed),
            archives_already_handled: self.archives_already_handled.load(Ordering::Relaxed),
            records_pushed: self.records_pushed.load(Ordering::Relaxed),
            records_already_processed: self.records_already_processed.load(Ordering::Relaxed),
            failures_skipped: self.failures_skipped.load(Ordering::Relaxed),
        }
    }
}

/// Totals for one pipeline run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Archive links emitted by the crawler
    pub links_discovered: usize,
    /// Archives downloaded and fully processed
    pub archives_downloaded: usize,
    /// Links skipped because the archive ledger already had them
    pub archives_already_handled: usize,
    /// Records pushed to the output queue
    pub records_pushed: usize,
    /// Entries skipped because the record ledger already had them
    pub records_already_processed: usize,
    /// Link failures logged and skipped under the `skip` policy
    pub failures_skipped: usize,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} links discovered, {} archives downloaded ({} already handled), \
             {} records pushed ({} already processed), {} failures skipped",
            self.links_discovered,
            self.archives_downloaded,
            self.archives_already_handled,
            self.records_pushed,
            self.records_already_processed,
            self.failures_skipped
        )
    }
}
