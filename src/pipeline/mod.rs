//! Download pipeline: link queue, workers, archive processing and the
//! coordinator that ties them together

pub mod archive;
pub mod coordinator;
pub mod queue;
pub mod scratch;
pub mod stats;
pub mod worker;

pub use archive::{process_archive, ArchiveReport};
pub use coordinator::{Coordinator, RunOutcome};
pub use queue::{link_queue, LinkFailure, LinkReceiver, LinkSender, Signal};
pub use scratch::ScratchFile;
pub use stats::{PipelineStats, RunSummary};
pub use worker::{DownloadWorker, LinkOutcome, WorkerContext};
