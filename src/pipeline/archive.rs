//! Archive processor
//!
//! Walks the entries of one downloaded archive in the archive's own listing
//! order and forwards every entry not yet in the record ledger to the output
//! queue.
//!
//! # Delivery
//!
//! Pushing a record and marking its entry processed are two separate store
//! writes. A crash between them re-pushes that entry on the next run, so the
//! output queue is at-least-once and consumers must dedup on entry name.

use crate::storage::{Ledger, Namespace};
use crate::IngestError;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, info};
use zip::ZipArchive;

/// Upper bound on the buffer reserved from an entry's declared size
const MAX_ENTRY_PREALLOC: u64 = 1 << 20;

/// Outcome of processing one archive
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ArchiveReport {
    /// Entries pushed to the output queue
    pub pushed: usize,
    /// Entries skipped because they were already processed
    pub skipped: usize,
}

/// Read handle over a local zip file
///
/// All file access happens on blocking threads.
struct ArchiveReader {
    name: String,
    archive: Arc<Mutex<ZipArchive<File>>>,
    len: usize,
}

/// Name and kind of one archive entry
struct EntryInfo {
    name: String,
    is_dir: bool,
}

impl ArchiveReader {
    async fn open(path: PathBuf, name: &str) -> Result<Self, IngestError> {
        let archive_name = name.to_string();
        let archive = tokio::task::spawn_blocking(move || {
            let file = File::open(&path)?;
            ZipArchive::new(file).map_err(|source| IngestError::Archive {
                name: archive_name,
                source,
            })
        })
        .await??;

        Ok(Self {
            name: name.to_string(),
            len: archive.len(),
            archive: Arc::new(Mutex::new(archive)),
        })
    }

    fn len(&self) -> usize {
        self.len
    }

    async fn entry_info(&self, index: usize) -> Result<EntryInfo, IngestError> {
        self.with_archive(move |archive| {
            let entry = archive.by_index_raw(index)?;
            Ok(EntryInfo {
                name: entry.name().to_string(),
                is_dir: entry.is_dir(),
            })
        })
        .await
    }

    /// Reads one entry fully into memory
    async fn read_entry(&self, index: usize) -> Result<Vec<u8>, IngestError> {
        self.with_archive(move |archive| {
            let mut entry = archive.by_index(index)?;
            // The declared size comes from the archive itself and may be forged
            let mut buf = Vec::with_capacity(entry.size().min(MAX_ENTRY_PREALLOC) as usize);
            entry.read_to_end(&mut buf)?;
            Ok(buf)
        })
        .await
    }

    async fn with_archive<T, F>(&self, op: F) -> Result<T, IngestError>
    where
        T: Send + 'static,
        F: FnOnce(&mut ZipArchive<File>) -> zip::result::ZipResult<T> + Send + 'static,
    {
        let archive = Arc::clone(&self.archive);
        let name = self.name.clone();
        tokio::task::spawn_blocking(move || {
            let mut archive = archive.lock().map_err(|_| IngestError::Archive {
                name: name.clone(),
                source: zip::result::ZipError::InvalidArchive("reader poisoned"),
            })?;
            op(&mut *archive).map_err(|source| IngestError::Archive { name, source })
        })
        .await?
    }
}

/// Processes the archive stored at `path`
///
/// For each entry: look it up in the record ledger, skip it if marked,
/// otherwise read it fully, push it to the output queue and mark it. A store
/// error aborts the whole archive; entries after it are not attempted.
/// Directory entries carry no record and are ignored.
///
/// # Arguments
///
/// * `path` - Local archive file
/// * `name` - Display name of the archive (its link)
/// * `ledger` - The calling worker's store connection
pub async fn process_archive<L>(
    path: &Path,
    name: &str,
    ledger: &mut L,
) -> Result<ArchiveReport, IngestError>
where
    L: Ledger + ?Sized,
{
    info!(archive = %name, "Processing archive");
    let reader = ArchiveReader::open(path.to_path_buf(), name).await?;
    let mut report = ArchiveReport::default();

    for index in 0..reader.len() {
        let entry = reader.entry_info(index).await?;
        if entry.is_dir {
            continue;
        }

        if ledger.is_marked(Namespace::Processed, &entry.name).await? {
            debug!(archive = %name, entry = %entry.name, "Entry already processed");
            report.skipped += 1;
            continue;
        }

        let payload = reader.read_entry(index).await?;
        debug!(archive = %name, entry = %entry.name, bytes = payload.len(), "Pushing record");
        ledger.push_record(&payload).await?;
        ledger.mark(Namespace::Processed, &entry.name).await?;
        report.pushed += 1;
    }

    info!(
        archive = %name,
        pushed = report.pushed,
        skipped = report.skipped,
        "Archive processed"
    );
    Ok(report)
}
